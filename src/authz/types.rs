use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule value accepting every protocol.
pub const PROTOCOL_ANY: &str = "any";
/// Rule value accepting both plain and end-to-end encrypted REST.
pub const PROTOCOL_ANY_REST: &str = "anyRest";

/// Transport classification of an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "rest")]
    Rest,
    #[serde(rename = "e2eRest")]
    E2eRest,
    #[serde(rename = "wss")]
    Wss,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Rest => "rest",
            Protocol::E2eRest => "e2eRest",
            Protocol::Wss => "wss",
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Protocol::Rest | Protocol::E2eRest)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule checks. Stored as its camelCase name on the rule row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Any,
    User,
    UserGroup,
    UserRole,
    RequestProtocol,
    Domain,
}

impl RuleKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "any" => Some(RuleKind::Any),
            "user" => Some(RuleKind::User),
            "userGroup" => Some(RuleKind::UserGroup),
            "userRole" => Some(RuleKind::UserRole),
            "requestProtocol" => Some(RuleKind::RequestProtocol),
            "domain" => Some(RuleKind::Domain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Any => "any",
            RuleKind::User => "user",
            RuleKind::UserGroup => "userGroup",
            RuleKind::UserRole => "userRole",
            RuleKind::RequestProtocol => "requestProtocol",
            RuleKind::Domain => "domain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Allow,
    Deny,
}

impl RuleType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(RuleType::Allow),
            "deny" => Some(RuleType::Deny),
            _ => None,
        }
    }
}

/// A rule's comparison data, resolved from the rule row and its relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Any,
    /// Phone identifiers of the directly linked users
    User(Vec<String>),
    /// Ids of the linked user groups
    UserGroup(Vec<i32>),
    UserRole(Option<String>),
    RequestProtocol(Option<String>),
    Domain(Option<String>),
    /// Kind name with no predicate; never matches
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

/// Outcome annotation recorded on a request that must not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthzFailure {
    MissingSender,
    MissingOperation,
    PermissionDenied,
    StoreUnavailable,
}

impl AuthzFailure {
    /// Malformed requests are rejected before any rule is consulted.
    pub fn is_malformed(&self) -> bool {
        matches!(self, AuthzFailure::MissingSender | AuthzFailure::MissingOperation)
    }
}

impl fmt::Display for AuthzFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthzFailure::MissingSender => "sender not found",
            AuthzFailure::MissingOperation => "operation not found",
            AuthzFailure::PermissionDenied => "permission denied",
            AuthzFailure::StoreUnavailable => "permission denied",
        };
        f.write_str(s)
    }
}
