use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::authz::store::RuleStore;
use crate::errors::GateError;
use crate::storage::{Rule, User};

pub fn rule(id: i32, operation: &str, kind: &str, rule_type: &str) -> Rule {
    Rule {
        id,
        operation: operation.into(),
        kind: kind.into(),
        rule_type: rule_type.into(),
        role: None,
        protocol: None,
        domain: None,
    }
}

pub fn user(id: i32, phone: &str, role: &str) -> User {
    User {
        id,
        phone: phone.into(),
        name: None,
        role: role.into(),
    }
}

/// In-memory rule store that records how often it is queried.
#[derive(Clone, Default)]
pub struct FakeStore {
    rules: Vec<Rule>,
    users: Vec<User>,
    rule_users: HashMap<i32, Vec<String>>,
    rule_groups: HashMap<i32, Vec<i32>>,
    memberships: HashSet<(i32, i32)>,
    unavailable: bool,
    queries: Arc<AtomicUsize>,
    probes: Arc<Mutex<Vec<i32>>>,
}

impl FakeStore {
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_rule_users(mut self, rule_id: i32, phones: &[&str]) -> Self {
        self.rule_users
            .insert(rule_id, phones.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_rule_groups(mut self, rule_id: i32, groups: &[i32]) -> Self {
        self.rule_groups.insert(rule_id, groups.to_vec());
        self
    }

    pub fn with_membership(mut self, user_id: i32, group_id: i32) -> Self {
        self.memberships.insert((user_id, group_id));
        self
    }

    /// Every lookup fails as if the database were down.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Group ids passed to `membership_exists`, in call order.
    pub fn membership_probes(&self) -> Vec<i32> {
        self.probes.lock().unwrap().clone()
    }

    fn hit(&self) -> Result<(), GateError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(GateError::Other("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for FakeStore {
    async fn list_rules_for_operation(&self, operation: &str) -> Result<Vec<Rule>, GateError> {
        self.hit()?;
        Ok(self
            .rules
            .iter()
            .filter(|r| r.operation == operation)
            .cloned()
            .collect())
    }

    async fn get_user_by_identity(&self, phone: &str) -> Result<Option<User>, GateError> {
        self.hit()?;
        Ok(self.users.iter().find(|u| u.phone == phone).cloned())
    }

    async fn list_user_ids_for_rule(&self, rule_id: i32) -> Result<Vec<String>, GateError> {
        self.hit()?;
        Ok(self.rule_users.get(&rule_id).cloned().unwrap_or_default())
    }

    async fn list_group_ids_for_rule(&self, rule_id: i32) -> Result<Vec<i32>, GateError> {
        self.hit()?;
        Ok(self.rule_groups.get(&rule_id).cloned().unwrap_or_default())
    }

    async fn membership_exists(&self, user_id: i32, group_id: i32) -> Result<bool, GateError> {
        self.hit()?;
        self.probes.lock().unwrap().push(group_id);
        Ok(self.memberships.contains(&(user_id, group_id)))
    }
}
