pub mod group_rule_relation;
pub mod operation_bundle;
pub mod rule;
pub mod user;
pub mod user_group;
pub mod user_group_relation;
pub mod user_rule_relation;

pub use group_rule_relation::Entity as GroupRuleRelation;
pub use operation_bundle::Entity as OperationBundle;
pub use rule::Entity as Rule;
pub use user::Entity as User;
pub use user_group::Entity as UserGroup;
pub use user_group_relation::Entity as UserGroupRelation;
pub use user_rule_relation::Entity as UserRuleRelation;
