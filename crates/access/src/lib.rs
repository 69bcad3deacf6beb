//! `portal-access`: access-policy evaluation for the portal.
//!
//! Pipeline: identity record → [`PolicyEvaluator`] → [`AccessGrant`] →
//! [`IdentityProjector`] → [`User`] → [`catalog::filter`] → visible catalog.
//!
//! Everything here is pure and synchronous: no IO, no shared mutable state.
//! Rule sets and overrides come in as snapshots.

pub mod authorize;
pub mod catalog;
pub mod conditions;
pub mod config;
pub mod evaluator;
pub mod grant;
pub mod identity;
pub mod overrides;
pub mod permissions;
pub mod reference;
pub mod report;
pub mod roles;
pub mod rules;
pub mod store;
pub mod user;

pub use authorize::{AuthzError, authorize, authorize_role, explain_authorization, has_permission, has_role};
pub use catalog::{AccessRequirements, AppFunction, Application, filter};
pub use conditions::{CategoryClause, ConditionMatcher, Conditions, MissingAttributePolicy};
pub use config::ConfigError;
pub use evaluator::{EvaluatorConfig, PolicyEvaluator, evaluate};
pub use grant::{AccessGrant, GrantedAccess, merge};
pub use identity::IdentityRecord;
pub use overrides::{CatalogOverride, CatalogOverrides, apply_overrides};
pub use permissions::{FunctionRef, Permission};
pub use report::AccessReport;
pub use roles::{RequiredRole, Role, at_least};
pub use rules::{AccessRule, RuleSet};
pub use store::{InMemoryOverrideStore, InMemoryRuleSetStore, OverrideStore, RuleSetProvider, StaticRuleSet};
pub use user::{IdentityProjector, ProjectorConfig, User, project};
