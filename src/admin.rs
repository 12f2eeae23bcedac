//! Administrative operations over rules, users, groups, their relations and
//! operation bundles. They are registered as ordinary operations, so the
//! rules middleware guards them like any other.

use std::future::Future;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GateError;
use crate::registry::{register_bundle, BundleLoader, OperationRegistry};
use crate::storage::{
    self, BundleFilter, NewRule, NewUser, NewUserGroup, OperationBundle, Rule, RuleFilter, User,
    UserFilter, UserGroup, UserGroupFilter,
};

#[derive(Debug, Deserialize)]
pub struct IdInput {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct PhoneInput {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupLink {
    pub user_id: i32,
    pub user_group_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRuleLink {
    pub user_id: i32,
    pub rule_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRuleLink {
    pub user_group_id: i32,
    pub rule_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBundleInput {
    pub name: String,
    pub module_path: String,
    #[serde(default)]
    pub pass_if_exist: bool,
}

/// Names of every administrative operation, in registration order.
pub const ADMIN_OPERATIONS: &[&str] = &[
    "addRule",
    "updateRule",
    "removeRule",
    "getRule",
    "listRule",
    "addUser",
    "updateUser",
    "removeUser",
    "getUser",
    "listUser",
    "addUserGroup",
    "updateUserGroup",
    "removeUserGroup",
    "getUserGroup",
    "listUserGroup",
    "connectUserToGroup",
    "connectUserToRule",
    "connectUserGroupToRule",
    "disconnectUserToGroup",
    "disconnectUserToRule",
    "disconnectUserGroupToRule",
    "saveBundle",
    "listBundle",
    "updateBundle",
    "removeBundle",
];

/// Register a typed operation: the JSON body is decoded into `I` and the
/// result encoded back to JSON.
fn register_op<I, O, F, Fut>(registry: &OperationRegistry, name: &str, db: &DatabaseConnection, f: F)
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(DatabaseConnection, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, GateError>> + Send + 'static,
{
    let db = db.clone();
    registry.register(name, move |args: Value| {
        let call = serde_json::from_value::<I>(args).map(|input| f(db.clone(), input));
        async move {
            let output = call?.await?;
            Ok::<Value, GateError>(serde_json::to_value(output)?)
        }
    });
}

/// Register every administrative operation. Bundles saved through
/// `saveBundle` are loaded with `loader` and registered immediately.
pub fn register_admin_operations(
    registry: &Arc<OperationRegistry>,
    db: &DatabaseConnection,
    loader: Arc<dyn BundleLoader>,
) {
    // rules
    register_op(registry, "addRule", db, |db, input: NewRule| async move {
        storage::add_rule(&db, input).await
    });
    register_op(registry, "updateRule", db, |db, rule: Rule| async move {
        storage::update_rule(&db, rule).await
    });
    register_op(registry, "removeRule", db, |db, input: IdInput| async move {
        storage::remove_rule(&db, input.id).await
    });
    register_op(registry, "getRule", db, |db, input: IdInput| async move {
        storage::get_rule(&db, input.id).await
    });
    register_op(registry, "listRule", db, |db, filter: Option<RuleFilter>| async move {
        storage::list_rules(&db, filter.unwrap_or_default()).await
    });

    // users
    register_op(registry, "addUser", db, |db, input: NewUser| async move {
        storage::add_user(&db, input).await
    });
    register_op(registry, "updateUser", db, |db, user: User| async move {
        storage::update_user(&db, user).await
    });
    register_op(registry, "removeUser", db, |db, input: IdInput| async move {
        storage::remove_user(&db, input.id).await
    });
    register_op(registry, "getUser", db, |db, input: PhoneInput| async move {
        storage::get_user(&db, &input.phone).await
    });
    register_op(registry, "listUser", db, |db, filter: Option<UserFilter>| async move {
        storage::list_users(&db, filter.unwrap_or_default()).await
    });

    // groups
    register_op(registry, "addUserGroup", db, |db, input: NewUserGroup| async move {
        storage::add_user_group(&db, input).await
    });
    register_op(registry, "updateUserGroup", db, |db, group: UserGroup| async move {
        storage::update_user_group(&db, group).await
    });
    register_op(registry, "removeUserGroup", db, |db, input: IdInput| async move {
        storage::remove_user_group(&db, input.id).await
    });
    register_op(registry, "getUserGroup", db, |db, input: IdInput| async move {
        storage::get_user_group(&db, input.id).await
    });
    register_op(
        registry,
        "listUserGroup",
        db,
        |db, filter: Option<UserGroupFilter>| async move {
            storage::list_user_groups(&db, filter.unwrap_or_default()).await
        },
    );

    // relations
    register_op(registry, "connectUserToGroup", db, |db, l: UserGroupLink| async move {
        storage::connect_user_to_group(&db, l.user_id, l.user_group_id).await
    });
    register_op(registry, "connectUserToRule", db, |db, l: UserRuleLink| async move {
        storage::connect_user_to_rule(&db, l.user_id, l.rule_id).await
    });
    register_op(registry, "connectUserGroupToRule", db, |db, l: GroupRuleLink| async move {
        storage::connect_user_group_to_rule(&db, l.user_group_id, l.rule_id).await
    });
    register_op(registry, "disconnectUserToGroup", db, |db, l: UserGroupLink| async move {
        storage::disconnect_user_from_group(&db, l.user_id, l.user_group_id).await
    });
    register_op(registry, "disconnectUserToRule", db, |db, l: UserRuleLink| async move {
        storage::disconnect_user_from_rule(&db, l.user_id, l.rule_id).await
    });
    register_op(
        registry,
        "disconnectUserGroupToRule",
        db,
        |db, l: GroupRuleLink| async move {
            storage::disconnect_user_group_from_rule(&db, l.user_group_id, l.rule_id).await
        },
    );

    // bundles
    let operations = Arc::downgrade(registry);
    register_op(registry, "saveBundle", db, move |db, input: SaveBundleInput| {
        let operations = operations.clone();
        let loader = Arc::clone(&loader);
        async move {
            let bundle =
                storage::save_bundle(&db, &input.name, &input.module_path, input.pass_if_exist)
                    .await?;
            if let (true, Some(operations)) = (bundle.status, operations.upgrade()) {
                if let Err(e) = register_bundle(&operations, loader.as_ref(), &bundle).await {
                    tracing::error!(
                        bundle = %bundle.name,
                        path = %bundle.bundle_path,
                        error = %e,
                        "Bundle register error"
                    );
                }
            }
            Ok::<_, GateError>(bundle)
        }
    });
    register_op(registry, "listBundle", db, |db, filter: Option<BundleFilter>| async move {
        storage::list_bundles(&db, filter.unwrap_or_default()).await
    });
    register_op(registry, "updateBundle", db, |db, bundle: OperationBundle| async move {
        storage::update_bundle(&db, bundle).await
    });
    register_op(registry, "removeBundle", db, |db, input: IdInput| async move {
        storage::remove_bundle(&db, input.id).await
    });

    tracing::debug!(operations = ADMIN_OPERATIONS.len(), "Registered administrative operations");
}
