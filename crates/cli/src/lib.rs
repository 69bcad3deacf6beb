//! Input loading for the `portal-access` binary.
//!
//! Rules, catalog and overrides come from `PORTAL_RULES_PATH`,
//! `PORTAL_CATALOG_PATH` and `PORTAL_OVERRIDES_PATH`; unset variables fall
//! back to the built-in configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use portal_access::{Application, CatalogOverrides, IdentityRecord, RuleSet, config, reference};

pub const ENV_RULES_PATH: &str = "PORTAL_RULES_PATH";
pub const ENV_CATALOG_PATH: &str = "PORTAL_CATALOG_PATH";
pub const ENV_OVERRIDES_PATH: &str = "PORTAL_OVERRIDES_PATH";

/// An identity file holds one record or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdentityFile {
    Many(Vec<IdentityRecord>),
    One(Box<IdentityRecord>),
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn load_rule_set() -> anyhow::Result<RuleSet> {
    match env_path(ENV_RULES_PATH) {
        Some(path) => config::load_rule_set(&path)
            .with_context(|| format!("loading rules from {}", path.display())),
        None => {
            tracing::info!("{ENV_RULES_PATH} not set; using built-in rules");
            Ok(reference::rule_set())
        }
    }
}

pub fn load_catalog() -> anyhow::Result<Vec<Application>> {
    match env_path(ENV_CATALOG_PATH) {
        Some(path) => config::load_catalog(&path)
            .with_context(|| format!("loading catalog from {}", path.display())),
        None => {
            tracing::info!("{ENV_CATALOG_PATH} not set; using built-in catalog");
            Ok(reference::catalog())
        }
    }
}

pub fn load_overrides() -> anyhow::Result<CatalogOverrides> {
    match env_path(ENV_OVERRIDES_PATH) {
        Some(path) => config::load_overrides(&path)
            .with_context(|| format!("loading overrides from {}", path.display())),
        None => Ok(CatalogOverrides::new()),
    }
}

/// Read every identity file, in argument order.
pub fn load_identities<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<IdentityRecord>> {
    let mut identities = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let parsed: IdentityFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing identities in {}", path.display()))?;
        match parsed {
            IdentityFile::Many(many) => identities.extend(many),
            IdentityFile::One(one) => identities.push(*one),
        }
    }
    Ok(identities)
}
