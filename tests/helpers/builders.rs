use rulegate::storage::{self, NewRule, NewUser, NewUserGroup, Rule, User, UserGroup};
use sea_orm::DatabaseConnection;

/// Builder for creating test users
pub struct UserBuilder {
    phone: String,
    name: Option<String>,
    role: String,
}

impl UserBuilder {
    pub fn new(phone: &str) -> Self {
        Self {
            phone: phone.to_string(),
            name: None,
            role: "user".to_string(),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> User {
        storage::add_user(
            db,
            NewUser {
                phone: self.phone,
                name: self.name,
                role: self.role,
            },
        )
        .await
        .expect("Failed to create test user")
    }
}

/// Builder for creating test user groups
pub struct GroupBuilder {
    name: String,
    members: Vec<i32>,
}

impl GroupBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, user: &User) -> Self {
        self.members.push(user.id);
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> UserGroup {
        let group = storage::add_user_group(db, NewUserGroup { name: self.name })
            .await
            .expect("Failed to create test group");
        for user_id in self.members {
            storage::connect_user_to_group(db, user_id, group.id)
                .await
                .expect("Failed to add group member");
        }
        group
    }
}

/// Builder for creating test rules with their relations
pub struct RuleBuilder {
    input: NewRule,
    users: Vec<i32>,
    groups: Vec<i32>,
}

impl RuleBuilder {
    pub fn new(operation: &str, kind: &str) -> Self {
        Self {
            input: NewRule {
                operation: operation.to_string(),
                kind: kind.to_string(),
                rule_type: "allow".to_string(),
                role: None,
                protocol: None,
                domain: None,
            },
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn deny(mut self) -> Self {
        self.input.rule_type = "deny".to_string();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.input.role = Some(role.to_string());
        self
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.input.protocol = Some(protocol.to_string());
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.input.domain = Some(domain.to_string());
        self
    }

    pub fn with_user(mut self, user: &User) -> Self {
        self.users.push(user.id);
        self
    }

    pub fn with_group(mut self, group: &UserGroup) -> Self {
        self.groups.push(group.id);
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> Rule {
        let rule = storage::add_rule(db, self.input)
            .await
            .expect("Failed to create test rule");
        for user_id in self.users {
            storage::connect_user_to_rule(db, user_id, rule.id)
                .await
                .expect("Failed to link user to rule");
        }
        for group_id in self.groups {
            storage::connect_user_group_to_rule(db, group_id, rule.id)
                .await
                .expect("Failed to link group to rule");
        }
        rule
    }
}
