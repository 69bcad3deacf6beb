//! Loading rule sets, catalogs and settings.
//!
//! Documents are JSON. Settings come from environment variables; invalid
//! values are logged and replaced with the default.

use std::collections::BTreeSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use portal_core::{DomainError, TenantId};

use crate::catalog::{self, Application};
use crate::conditions::MissingAttributePolicy;
use crate::evaluator::EvaluatorConfig;
use crate::overrides::CatalogOverrides;
use crate::rules::RuleSet;
use crate::user::ProjectorConfig;

pub const ENV_MISSING_ATTRIBUTE_POLICY: &str = "PORTAL_MISSING_ATTRIBUTE_POLICY";
pub const ENV_ACTIVE_STATUSES: &str = "PORTAL_ACTIVE_STATUSES";
pub const ENV_DEFAULT_TENANT: &str = "PORTAL_DEFAULT_TENANT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, ConfigError> {
    serde_json::from_str(json).map_err(|source| ConfigError::Json {
        what: what.to_string(),
        source,
    })
}

/// Parse and validate a rule-set document.
pub fn parse_rule_set(json: &str) -> Result<RuleSet, ConfigError> {
    let rule_set: RuleSet = parse("rule set", json)?;
    rule_set.validate()?;
    Ok(rule_set)
}

pub fn load_rule_set(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
    let path = path.as_ref();
    let rule_set = parse_rule_set(&read(path)?)?;
    tracing::info!(path = %path.display(), rules = rule_set.rules.len(), "rule set loaded");
    Ok(rule_set)
}

/// Parse and validate a catalog document.
pub fn parse_catalog(json: &str) -> Result<Vec<Application>, ConfigError> {
    let catalog: Vec<Application> = parse("catalog", json)?;
    catalog::validate(&catalog)?;
    Ok(catalog)
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<Application>, ConfigError> {
    parse_catalog(&read(path.as_ref())?)
}

pub fn parse_overrides(json: &str) -> Result<CatalogOverrides, ConfigError> {
    parse("catalog overrides", json)
}

pub fn load_overrides(path: impl AsRef<Path>) -> Result<CatalogOverrides, ConfigError> {
    parse_overrides(&read(path.as_ref())?)
}

impl EvaluatorConfig {
    /// Read `PORTAL_MISSING_ATTRIBUTE_POLICY` (`deny` | `vacuous`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let missing_attribute = match lookup(ENV_MISSING_ATTRIBUTE_POLICY) {
            None => MissingAttributePolicy::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{ENV_MISSING_ATTRIBUTE_POLICY}: {err}; using default");
                MissingAttributePolicy::default()
            }),
        };

        if missing_attribute == MissingAttributePolicy::Vacuous {
            tracing::warn!("missing identity attributes satisfy rule conditions (vacuous policy)");
        }

        Self { missing_attribute }
    }
}

impl ProjectorConfig {
    /// Read `PORTAL_ACTIVE_STATUSES` (comma separated) and `PORTAL_DEFAULT_TENANT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ProjectorConfig::default();

        if let Some(raw) = lookup(ENV_ACTIVE_STATUSES) {
            let statuses: BTreeSet<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if statuses.is_empty() {
                tracing::warn!("{ENV_ACTIVE_STATUSES} is empty; using default");
            } else {
                config.active_statuses = statuses;
            }
        }

        if let Some(raw) = lookup(ENV_DEFAULT_TENANT) {
            match raw.parse::<TenantId>() {
                Ok(tenant_id) => config.tenant_id = tenant_id,
                Err(err) => tracing::warn!("{ENV_DEFAULT_TENANT}: {err}; using default"),
            }
        }

        config
    }
}
