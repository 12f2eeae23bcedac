use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::errors::GateError;
use crate::storage::{self, Rule, User};

/// Read-only lookups the evaluator needs from the rule store.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn list_rules_for_operation(&self, operation: &str) -> Result<Vec<Rule>, GateError>;

    async fn get_user_by_identity(&self, phone: &str) -> Result<Option<User>, GateError>;

    /// Phone identifiers of users linked to the rule.
    async fn list_user_ids_for_rule(&self, rule_id: i32) -> Result<Vec<String>, GateError>;

    async fn list_group_ids_for_rule(&self, rule_id: i32) -> Result<Vec<i32>, GateError>;

    async fn membership_exists(&self, user_id: i32, group_id: i32) -> Result<bool, GateError>;
}

#[async_trait]
impl RuleStore for DatabaseConnection {
    async fn list_rules_for_operation(&self, operation: &str) -> Result<Vec<Rule>, GateError> {
        storage::list_rules_for_operation(self, operation).await
    }

    async fn get_user_by_identity(&self, phone: &str) -> Result<Option<User>, GateError> {
        storage::get_user_by_phone(self, phone).await
    }

    async fn list_user_ids_for_rule(&self, rule_id: i32) -> Result<Vec<String>, GateError> {
        storage::list_user_phones_for_rule(self, rule_id).await
    }

    async fn list_group_ids_for_rule(&self, rule_id: i32) -> Result<Vec<i32>, GateError> {
        storage::list_group_ids_for_rule(self, rule_id).await
    }

    async fn membership_exists(&self, user_id: i32, group_id: i32) -> Result<bool, GateError> {
        storage::membership_exists(self, user_id, group_id).await
    }
}
