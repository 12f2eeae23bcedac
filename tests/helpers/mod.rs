pub mod builders;
pub mod db;

pub use builders::{GroupBuilder, RuleBuilder, UserBuilder};
pub use db::TestDb;
