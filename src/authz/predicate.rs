use crate::authz::store::RuleStore;
use crate::authz::types::{Condition, Protocol, PROTOCOL_ANY, PROTOCOL_ANY_REST};
use crate::errors::GateError;
use crate::storage::User;

/// Apply the predicate for a resolved condition.
///
/// Every predicate except `userGroup` is a pure function of its inputs.
/// `userGroup` probes membership one group at a time, in list order, and
/// stops at the first hit.
pub async fn holds<S>(
    store: &S,
    condition: &Condition,
    protocol: Protocol,
    caller: Option<&User>,
) -> Result<bool, GateError>
where
    S: RuleStore + ?Sized,
{
    let verdict = match condition {
        Condition::Any => true,
        Condition::User(phones) => caller.is_some_and(|u| phones.iter().any(|p| *p == u.phone)),
        Condition::UserRole(role) => {
            caller.is_some_and(|u| role.as_deref() == Some(u.role.as_str()))
        }
        Condition::RequestProtocol(value) => {
            value.as_deref().is_some_and(|v| protocol_matches(v, protocol))
        }
        Condition::Domain(value) => value.as_deref() == Some(protocol.as_str()),
        Condition::UserGroup(groups) => match caller {
            Some(user) => member_of_any(store, user.id, groups).await?,
            None => false,
        },
        Condition::Unrecognized(_) => false,
    };
    Ok(verdict)
}

pub fn protocol_matches(value: &str, protocol: Protocol) -> bool {
    match value {
        PROTOCOL_ANY => true,
        PROTOCOL_ANY_REST if protocol.is_rest() => true,
        _ => value == protocol.as_str(),
    }
}

async fn member_of_any<S>(store: &S, user_id: i32, groups: &[i32]) -> Result<bool, GateError>
where
    S: RuleStore + ?Sized,
{
    for group_id in groups {
        if store.membership_exists(user_id, *group_id).await? {
            return Ok(true);
        }
    }
    Ok(false)
}
