use futures::future::try_join_all;

use crate::authz::condition;
use crate::authz::errors::AuthzError;
use crate::authz::predicate;
use crate::authz::store::RuleStore;
use crate::authz::types::{Decision, Protocol, RuleKind, RuleType};
use crate::errors::GateError;
use crate::storage::{Rule, User};

/// Decide whether `caller` may invoke `operation` over `protocol`.
///
/// An operation without rules is unrestricted. Otherwise every rule guarding
/// it must yield a true verdict. Rules are evaluated concurrently and every
/// verdict is awaited before they are combined; the first store failure
/// aborts the remaining lookups and surfaces as an error.
pub async fn evaluate<S>(
    store: &S,
    operation: &str,
    caller: Option<&User>,
    protocol: Protocol,
) -> Result<Decision, AuthzError>
where
    S: RuleStore + ?Sized,
{
    let rules = store.list_rules_for_operation(operation).await?;
    if rules.is_empty() {
        tracing::debug!(operation, "No rules guard operation");
        return Ok(Decision::Permit);
    }

    let verdicts = try_join_all(
        rules
            .iter()
            .map(|rule| verdict(store, rule, caller, protocol)),
    )
    .await?;

    if verdicts.into_iter().all(|v| v) {
        Ok(Decision::Permit)
    } else {
        Ok(Decision::Deny)
    }
}

/// Verdict of a single rule. A `deny` rule of kind `any` is a blanket deny;
/// every other rule is judged by its predicate regardless of type.
pub async fn verdict<S>(
    store: &S,
    rule: &Rule,
    caller: Option<&User>,
    protocol: Protocol,
) -> Result<bool, GateError>
where
    S: RuleStore + ?Sized,
{
    if RuleType::parse(&rule.rule_type) == Some(RuleType::Deny)
        && RuleKind::parse(&rule.kind) == Some(RuleKind::Any)
    {
        tracing::debug!(rule_id = rule.id, "Blanket deny rule");
        return Ok(false);
    }

    let condition = condition::resolve(store, rule).await?;
    let result = predicate::holds(store, &condition, protocol, caller).await?;
    tracing::debug!(rule_id = rule.id, kind = %rule.kind, verdict = result, "Evaluated rule");
    Ok(result)
}
