use crate::entities;
use crate::errors::GateError;
use crate::settings::Database as DbCfg;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const RULE_TYPE_ALLOW: &str = "allow";
pub const RULE_TYPE_DENY: &str = "deny";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub phone: String,
    pub name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserGroup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i32,
    pub operation: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
    pub operation: String,
    pub kind: String,
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

fn default_rule_type() -> String {
    RULE_TYPE_ALLOW.to_string()
}

/// A rule together with the users and groups linked to it.
#[derive(Debug, Clone, Serialize)]
pub struct RuleDetails {
    #[serde(flatten)]
    pub rule: Rule,
    pub users: Vec<User>,
    pub groups: Vec<UserGroup>,
}

/// A user together with its group memberships and directly linked rules.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub groups: Vec<UserGroup>,
    pub rules: Vec<Rule>,
}

/// A group together with its members and linked rules.
#[derive(Debug, Clone, Serialize)]
pub struct UserGroupDetails {
    #[serde(flatten)]
    pub group: UserGroup,
    pub users: Vec<User>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBundle {
    pub id: i32,
    pub name: String,
    pub bundle_path: String,
    pub status: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFilter {
    pub operation: Option<String>,
    pub kind: Option<String>,
    #[serde(rename = "type")]
    pub rule_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub phone: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserGroupFilter {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleFilter {
    pub name: Option<String>,
    pub status: Option<bool>,
}

impl From<entities::user::Model> for User {
    fn from(model: entities::user::Model) -> Self {
        Self {
            id: model.id,
            phone: model.phone,
            name: model.name,
            role: model.role,
        }
    }
}

impl From<entities::user_group::Model> for UserGroup {
    fn from(model: entities::user_group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<entities::rule::Model> for Rule {
    fn from(model: entities::rule::Model) -> Self {
        Self {
            id: model.id,
            operation: model.operation,
            kind: model.kind,
            rule_type: model.rule_type,
            role: model.role,
            protocol: model.protocol,
            domain: model.domain,
        }
    }
}

impl From<entities::operation_bundle::Model> for OperationBundle {
    fn from(model: entities::operation_bundle::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            bundle_path: model.bundle_path,
            status: model.status,
        }
    }
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, GateError> {
    let db = Database::connect(&cfg.url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

fn validate_rule(operation: &str, rule_type: &str) -> Result<(), GateError> {
    if operation.trim().is_empty() {
        return Err(GateError::BadRequest(
            "rule operation must not be empty".to_string(),
        ));
    }
    if rule_type != RULE_TYPE_ALLOW && rule_type != RULE_TYPE_DENY {
        return Err(GateError::BadRequest(format!(
            "unknown rule type `{rule_type}` (expected \"allow\" or \"deny\")"
        )));
    }
    Ok(())
}

// ---------- Rules ----------

pub async fn add_rule(db: &DatabaseConnection, input: NewRule) -> Result<Rule, GateError> {
    validate_rule(&input.operation, &input.rule_type)?;

    let rule = entities::rule::ActiveModel {
        operation: Set(input.operation),
        kind: Set(input.kind),
        rule_type: Set(input.rule_type),
        role: Set(input.role),
        protocol: Set(input.protocol),
        domain: Set(input.domain),
        ..Default::default()
    };

    let model = rule.insert(db).await?;
    Ok(model.into())
}

pub async fn update_rule(db: &DatabaseConnection, rule: Rule) -> Result<Rule, GateError> {
    use entities::rule::Entity;

    validate_rule(&rule.operation, &rule.rule_type)?;

    let existing = Entity::find_by_id(rule.id)
        .one(db)
        .await?
        .ok_or_else(|| GateError::NotFound(format!("rule {}", rule.id)))?;

    let mut active: entities::rule::ActiveModel = existing.into();
    active.operation = Set(rule.operation);
    active.kind = Set(rule.kind);
    active.rule_type = Set(rule.rule_type);
    active.role = Set(rule.role);
    active.protocol = Set(rule.protocol);
    active.domain = Set(rule.domain);

    let model = active.update(db).await?;
    Ok(model.into())
}

pub async fn remove_rule(db: &DatabaseConnection, id: i32) -> Result<(), GateError> {
    use entities::rule::Entity;

    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(GateError::NotFound(format!("rule {id}")));
    }
    Ok(())
}

pub async fn get_rule(db: &DatabaseConnection, id: i32) -> Result<Option<RuleDetails>, GateError> {
    use entities::rule::Entity;

    match Entity::find_by_id(id).one(db).await? {
        Some(model) => Ok(Some(rule_details(db, model.into()).await?)),
        None => Ok(None),
    }
}

pub async fn list_rules(
    db: &DatabaseConnection,
    filter: RuleFilter,
) -> Result<Vec<RuleDetails>, GateError> {
    use entities::rule::{Column, Entity};

    let mut query = Entity::find();
    if let Some(operation) = filter.operation {
        query = query.filter(Column::Operation.eq(operation));
    }
    if let Some(kind) = filter.kind {
        query = query.filter(Column::Kind.eq(kind));
    }
    if let Some(rule_type) = filter.rule_type {
        query = query.filter(Column::RuleType.eq(rule_type));
    }

    let models = query.order_by_asc(Column::Id).all(db).await?;
    let mut rules = Vec::with_capacity(models.len());
    for model in models {
        rules.push(rule_details(db, model.into()).await?);
    }
    Ok(rules)
}

async fn rule_details(db: &DatabaseConnection, rule: Rule) -> Result<RuleDetails, GateError> {
    let user_ids = user_ids_for_rule(db, rule.id).await?;
    let group_ids = list_group_ids_for_rule(db, rule.id).await?;
    Ok(RuleDetails {
        users: users_by_ids(db, &user_ids).await?,
        groups: groups_by_ids(db, &group_ids).await?,
        rule,
    })
}

/// All rules guarding `operation`, in insertion order.
pub async fn list_rules_for_operation(
    db: &DatabaseConnection,
    operation: &str,
) -> Result<Vec<Rule>, GateError> {
    use entities::rule::{Column, Entity};

    let models = Entity::find()
        .filter(Column::Operation.eq(operation))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    Ok(models.into_iter().map(Rule::from).collect())
}

async fn user_ids_for_rule(db: &DatabaseConnection, rule_id: i32) -> Result<Vec<i32>, GateError> {
    use entities::user_rule_relation::{Column, Entity};

    let relations = Entity::find()
        .filter(Column::RuleId.eq(rule_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    Ok(relations.into_iter().map(|r| r.user_id).collect())
}

/// Phone identifiers of the users linked to a rule, in relation order.
pub async fn list_user_phones_for_rule(
    db: &DatabaseConnection,
    rule_id: i32,
) -> Result<Vec<String>, GateError> {
    let user_ids = user_ids_for_rule(db, rule_id).await?;
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let phones: HashMap<i32, String> = users_by_ids(db, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.phone))
        .collect();

    Ok(user_ids
        .iter()
        .filter_map(|id| phones.get(id).cloned())
        .collect())
}

pub async fn list_group_ids_for_rule(
    db: &DatabaseConnection,
    rule_id: i32,
) -> Result<Vec<i32>, GateError> {
    use entities::group_rule_relation::{Column, Entity};

    let relations = Entity::find()
        .filter(Column::RuleId.eq(rule_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    Ok(relations.into_iter().map(|r| r.user_group_id).collect())
}

pub async fn membership_exists(
    db: &DatabaseConnection,
    user_id: i32,
    user_group_id: i32,
) -> Result<bool, GateError> {
    use entities::user_group_relation::{Column, Entity};

    let relation = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::UserGroupId.eq(user_group_id))
        .one(db)
        .await?;

    Ok(relation.is_some())
}

// ---------- Users ----------

pub async fn add_user(db: &DatabaseConnection, input: NewUser) -> Result<User, GateError> {
    if input.phone.trim().is_empty() {
        return Err(GateError::BadRequest("user phone must not be empty".to_string()));
    }

    let user = entities::user::ActiveModel {
        phone: Set(input.phone),
        name: Set(input.name),
        role: Set(input.role),
        ..Default::default()
    };

    let model = user.insert(db).await?;
    Ok(model.into())
}

pub async fn update_user(db: &DatabaseConnection, user: User) -> Result<User, GateError> {
    use entities::user::Entity;

    let existing = Entity::find_by_id(user.id)
        .one(db)
        .await?
        .ok_or_else(|| GateError::NotFound(format!("user {}", user.id)))?;

    let mut active: entities::user::ActiveModel = existing.into();
    active.phone = Set(user.phone);
    active.name = Set(user.name);
    active.role = Set(user.role);

    let model = active.update(db).await?;
    Ok(model.into())
}

pub async fn remove_user(db: &DatabaseConnection, id: i32) -> Result<(), GateError> {
    use entities::user::Entity;

    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(GateError::NotFound(format!("user {id}")));
    }
    Ok(())
}

pub async fn get_user_by_phone(
    db: &DatabaseConnection,
    phone: &str,
) -> Result<Option<User>, GateError> {
    use entities::user::{Column, Entity};

    let model = Entity::find()
        .filter(Column::Phone.eq(phone))
        .one(db)
        .await?;

    Ok(model.map(User::from))
}

pub async fn get_user(
    db: &DatabaseConnection,
    phone: &str,
) -> Result<Option<UserDetails>, GateError> {
    match get_user_by_phone(db, phone).await? {
        Some(user) => Ok(Some(user_details(db, user).await?)),
        None => Ok(None),
    }
}

pub async fn list_users(
    db: &DatabaseConnection,
    filter: UserFilter,
) -> Result<Vec<UserDetails>, GateError> {
    use entities::user::{Column, Entity};

    let mut query = Entity::find();
    if let Some(phone) = filter.phone {
        query = query.filter(Column::Phone.eq(phone));
    }
    if let Some(role) = filter.role {
        query = query.filter(Column::Role.eq(role));
    }

    let models = query.order_by_asc(Column::Id).all(db).await?;
    let mut users = Vec::with_capacity(models.len());
    for model in models {
        users.push(user_details(db, model.into()).await?);
    }
    Ok(users)
}

async fn user_details(db: &DatabaseConnection, user: User) -> Result<UserDetails, GateError> {
    let group_ids: Vec<i32> = {
        use entities::user_group_relation::{Column, Entity};
        Entity::find()
            .filter(Column::UserId.eq(user.id))
            .order_by_asc(Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.user_group_id)
            .collect()
    };
    let rule_ids: Vec<i32> = {
        use entities::user_rule_relation::{Column, Entity};
        Entity::find()
            .filter(Column::UserId.eq(user.id))
            .order_by_asc(Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.rule_id)
            .collect()
    };

    Ok(UserDetails {
        groups: groups_by_ids(db, &group_ids).await?,
        rules: rules_by_ids(db, &rule_ids).await?,
        user,
    })
}

// ---------- User groups ----------

pub async fn add_user_group(
    db: &DatabaseConnection,
    input: NewUserGroup,
) -> Result<UserGroup, GateError> {
    let group = entities::user_group::ActiveModel {
        name: Set(input.name),
        ..Default::default()
    };

    let model = group.insert(db).await?;
    Ok(model.into())
}

pub async fn update_user_group(
    db: &DatabaseConnection,
    group: UserGroup,
) -> Result<UserGroup, GateError> {
    use entities::user_group::Entity;

    let existing = Entity::find_by_id(group.id)
        .one(db)
        .await?
        .ok_or_else(|| GateError::NotFound(format!("user group {}", group.id)))?;

    let mut active: entities::user_group::ActiveModel = existing.into();
    active.name = Set(group.name);

    let model = active.update(db).await?;
    Ok(model.into())
}

pub async fn remove_user_group(db: &DatabaseConnection, id: i32) -> Result<(), GateError> {
    use entities::user_group::Entity;

    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(GateError::NotFound(format!("user group {id}")));
    }
    Ok(())
}

pub async fn get_user_group(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<UserGroupDetails>, GateError> {
    use entities::user_group::Entity;

    match Entity::find_by_id(id).one(db).await? {
        Some(model) => Ok(Some(user_group_details(db, model.into()).await?)),
        None => Ok(None),
    }
}

pub async fn list_user_groups(
    db: &DatabaseConnection,
    filter: UserGroupFilter,
) -> Result<Vec<UserGroupDetails>, GateError> {
    use entities::user_group::{Column, Entity};

    let mut query = Entity::find();
    if let Some(name) = filter.name {
        query = query.filter(Column::Name.eq(name));
    }

    let models = query.order_by_asc(Column::Id).all(db).await?;
    let mut groups = Vec::with_capacity(models.len());
    for model in models {
        groups.push(user_group_details(db, model.into()).await?);
    }
    Ok(groups)
}

async fn user_group_details(
    db: &DatabaseConnection,
    group: UserGroup,
) -> Result<UserGroupDetails, GateError> {
    let user_ids: Vec<i32> = {
        use entities::user_group_relation::{Column, Entity};
        Entity::find()
            .filter(Column::UserGroupId.eq(group.id))
            .order_by_asc(Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect()
    };
    let rule_ids: Vec<i32> = {
        use entities::group_rule_relation::{Column, Entity};
        Entity::find()
            .filter(Column::UserGroupId.eq(group.id))
            .order_by_asc(Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.rule_id)
            .collect()
    };

    Ok(UserGroupDetails {
        users: users_by_ids(db, &user_ids).await?,
        rules: rules_by_ids(db, &rule_ids).await?,
        group,
    })
}

async fn users_by_ids(db: &DatabaseConnection, ids: &[i32]) -> Result<Vec<User>, GateError> {
    use entities::user::{Column, Entity};

    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let models = Entity::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(User::from).collect())
}

async fn groups_by_ids(db: &DatabaseConnection, ids: &[i32]) -> Result<Vec<UserGroup>, GateError> {
    use entities::user_group::{Column, Entity};

    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let models = Entity::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(UserGroup::from).collect())
}

async fn rules_by_ids(db: &DatabaseConnection, ids: &[i32]) -> Result<Vec<Rule>, GateError> {
    use entities::rule::{Column, Entity};

    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let models = Entity::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(Rule::from).collect())
}

// ---------- Relations ----------

pub async fn connect_user_to_group(
    db: &DatabaseConnection,
    user_id: i32,
    user_group_id: i32,
) -> Result<(), GateError> {
    let relation = entities::user_group_relation::ActiveModel {
        user_id: Set(user_id),
        user_group_id: Set(user_group_id),
        ..Default::default()
    };
    relation.insert(db).await?;
    Ok(())
}

pub async fn connect_user_to_rule(
    db: &DatabaseConnection,
    user_id: i32,
    rule_id: i32,
) -> Result<(), GateError> {
    let relation = entities::user_rule_relation::ActiveModel {
        user_id: Set(user_id),
        rule_id: Set(rule_id),
        ..Default::default()
    };
    relation.insert(db).await?;
    Ok(())
}

pub async fn connect_user_group_to_rule(
    db: &DatabaseConnection,
    user_group_id: i32,
    rule_id: i32,
) -> Result<(), GateError> {
    let relation = entities::group_rule_relation::ActiveModel {
        user_group_id: Set(user_group_id),
        rule_id: Set(rule_id),
        ..Default::default()
    };
    relation.insert(db).await?;
    Ok(())
}

pub async fn disconnect_user_from_group(
    db: &DatabaseConnection,
    user_id: i32,
    user_group_id: i32,
) -> Result<(), GateError> {
    use entities::user_group_relation::{Column, Entity};

    Entity::delete_many()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::UserGroupId.eq(user_group_id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn disconnect_user_from_rule(
    db: &DatabaseConnection,
    user_id: i32,
    rule_id: i32,
) -> Result<(), GateError> {
    use entities::user_rule_relation::{Column, Entity};

    Entity::delete_many()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::RuleId.eq(rule_id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn disconnect_user_group_from_rule(
    db: &DatabaseConnection,
    user_group_id: i32,
    rule_id: i32,
) -> Result<(), GateError> {
    use entities::group_rule_relation::{Column, Entity};

    Entity::delete_many()
        .filter(Column::UserGroupId.eq(user_group_id))
        .filter(Column::RuleId.eq(rule_id))
        .exec(db)
        .await?;

    Ok(())
}

// ---------- Operation bundles ----------

/// Record a bundle by path. An existing bundle is reactivated, or returned
/// untouched when `pass_if_exist` is set.
pub async fn save_bundle(
    db: &DatabaseConnection,
    name: &str,
    bundle_path: &str,
    pass_if_exist: bool,
) -> Result<OperationBundle, GateError> {
    use entities::operation_bundle::{Column, Entity};

    if let Some(existing) = Entity::find()
        .filter(Column::BundlePath.eq(bundle_path))
        .one(db)
        .await?
    {
        if pass_if_exist {
            return Ok(existing.into());
        }
        let mut active: entities::operation_bundle::ActiveModel = existing.into();
        active.status = Set(true);
        let model = active.update(db).await?;
        return Ok(model.into());
    }

    let bundle = entities::operation_bundle::ActiveModel {
        name: Set(name.to_string()),
        bundle_path: Set(bundle_path.to_string()),
        status: Set(true),
        ..Default::default()
    };
    let model = bundle.insert(db).await?;
    Ok(model.into())
}

pub async fn update_bundle(
    db: &DatabaseConnection,
    bundle: OperationBundle,
) -> Result<OperationBundle, GateError> {
    use entities::operation_bundle::Entity;

    let existing = Entity::find_by_id(bundle.id)
        .one(db)
        .await?
        .ok_or_else(|| GateError::NotFound(format!("operation bundle {}", bundle.id)))?;

    let mut active: entities::operation_bundle::ActiveModel = existing.into();
    active.name = Set(bundle.name);
    active.bundle_path = Set(bundle.bundle_path);
    active.status = Set(bundle.status);

    let model = active.update(db).await?;
    Ok(model.into())
}

pub async fn list_bundles(
    db: &DatabaseConnection,
    filter: BundleFilter,
) -> Result<Vec<OperationBundle>, GateError> {
    use entities::operation_bundle::{Column, Entity};

    let mut query = Entity::find();
    if let Some(name) = filter.name {
        query = query.filter(Column::Name.eq(name));
    }
    if let Some(status) = filter.status {
        query = query.filter(Column::Status.eq(status));
    }

    let models = query.order_by_asc(Column::Id).all(db).await?;
    Ok(models.into_iter().map(OperationBundle::from).collect())
}

pub async fn remove_bundle(db: &DatabaseConnection, id: i32) -> Result<(), GateError> {
    use entities::operation_bundle::Entity;

    let result = Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(GateError::NotFound(format!("operation bundle {id}")));
    }
    Ok(())
}
