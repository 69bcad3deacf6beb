//! `portal-access`: evaluate directory identities against the portal's
//! access rules and print who sees which applications.
//!
//! Usage: `portal-access <identity.json>...`

use std::path::PathBuf;

use anyhow::{Context, bail};
use serde::Serialize;

use portal_access::{
    AccessReport, Application, EvaluatorConfig, IdentityProjector, PolicyEvaluator,
    ProjectorConfig, User, apply_overrides, filter,
};
use portal_cli::{load_catalog, load_identities, load_overrides, load_rule_set};

#[derive(Serialize)]
struct UserView {
    user: User,
    catalog: Vec<Application>,
}

#[derive(Serialize)]
struct Output {
    report: AccessReport,
    users: Vec<UserView>,
}

fn main() -> anyhow::Result<()> {
    portal_observability::init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: portal-access <identity.json>...");
    }

    let rule_set = load_rule_set()?;
    let overrides = load_overrides()?;
    let catalog = apply_overrides(&load_catalog()?, &overrides);
    let identities = load_identities(&paths[..])?;

    let evaluator = PolicyEvaluator::new(EvaluatorConfig::from_env());
    let projector = IdentityProjector::new(ProjectorConfig::from_env());

    let users = identities
        .iter()
        .map(|identity| {
            let user = projector.project(identity, &evaluator.evaluate(identity, &rule_set));
            let catalog = filter(&catalog, &user);
            UserView { user, catalog }
        })
        .collect();
    let report = AccessReport::build(&identities, &rule_set, &evaluator, &projector);

    tracing::info!(
        identities = identities.len(),
        rules = rule_set.rules.len(),
        applications = catalog.len(),
        "evaluation finished"
    );

    let output = Output { report, users };
    let json = serde_json::to_string_pretty(&output).context("serializing output")?;
    println!("{json}");
    Ok(())
}
