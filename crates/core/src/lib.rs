//! `portal-core`: shared domain building blocks for the portal.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, first_duplicate_id};
pub use error::{DomainError, DomainResult};
pub use id::{ApplicationId, FunctionId, RuleId, SubjectId, TenantId};
