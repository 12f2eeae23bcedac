use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub operation: String,
    /// "any" | "user" | "userGroup" | "userRole" | "requestProtocol" | "domain"
    pub kind: String,
    /// "allow" | "deny"
    #[sea_orm(column_name = "type")]
    pub rule_type: String,
    pub role: Option<String>,
    pub protocol: Option<String>,
    pub domain: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
