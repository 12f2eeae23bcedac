//! Resolves the comparison data a rule's predicate is applied to.
//!
//! Relational kinds (`user`, `userGroup`) are read from the store on every
//! call; scalar kinds come straight from the rule row.

use crate::authz::store::RuleStore;
use crate::authz::types::{Condition, RuleKind};
use crate::errors::GateError;
use crate::storage::Rule;

pub async fn resolve<S>(store: &S, rule: &Rule) -> Result<Condition, GateError>
where
    S: RuleStore + ?Sized,
{
    let condition = match RuleKind::parse(&rule.kind) {
        Some(RuleKind::User) => Condition::User(store.list_user_ids_for_rule(rule.id).await?),
        Some(RuleKind::UserGroup) => {
            Condition::UserGroup(store.list_group_ids_for_rule(rule.id).await?)
        }
        Some(RuleKind::RequestProtocol) => Condition::RequestProtocol(rule.protocol.clone()),
        Some(RuleKind::UserRole) => Condition::UserRole(rule.role.clone()),
        Some(RuleKind::Domain) => Condition::Domain(rule.domain.clone()),
        Some(RuleKind::Any) => Condition::Any,
        None => Condition::Unrecognized(rule.kind.clone()),
    };
    Ok(condition)
}
