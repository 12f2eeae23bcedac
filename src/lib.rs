//! rulegate - rule-based authorization for named operations
//!
//! This library provides the rules evaluator, its relational rule store and
//! the operation registry it guards. It exposes all modules for testing purposes.

pub mod admin;
pub mod authz;
pub mod entities;
pub mod errors;
pub mod registry;
pub mod settings;
pub mod storage;
pub mod web;
