//! Batch evaluation report (who gets what, and why).

use serde::Serialize;

use portal_core::{ApplicationId, RuleId, SubjectId};

use crate::evaluator::PolicyEvaluator;
use crate::identity::IdentityRecord;
use crate::roles::Role;
use crate::rules::RuleSet;
use crate::user::IdentityProjector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub subject: Option<SubjectId>,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub applications: Vec<ApplicationId>,
    pub applied_rules: Vec<RuleId>,
    pub has_access: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_users: usize,
    pub with_access: usize,
    pub active: usize,
    pub admins: usize,
    pub users: usize,
    pub guests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessReport {
    pub entries: Vec<ReportEntry>,
    pub summary: ReportSummary,
}

impl AccessReport {
    /// Evaluate and project every identity against one rule-set snapshot.
    pub fn build<'a, I>(
        identities: I,
        rule_set: &RuleSet,
        evaluator: &PolicyEvaluator,
        projector: &IdentityProjector,
    ) -> Self
    where
        I: IntoIterator<Item = &'a IdentityRecord>,
    {
        let mut report = AccessReport::default();

        for identity in identities {
            let grant = evaluator.evaluate(identity, rule_set);
            let user = projector.project(identity, &grant);

            let entry = ReportEntry {
                subject: user.id,
                email: user.email,
                name: user.name,
                role: user.role,
                is_active: user.is_active,
                has_access: grant.has_access(),
                applications: grant.applications.into_iter().collect(),
                applied_rules: grant.applied_rules,
            };
            report.record(entry);
        }

        report
    }

    fn record(&mut self, entry: ReportEntry) {
        let summary = &mut self.summary;
        summary.total_users += 1;
        if entry.has_access {
            summary.with_access += 1;
        }
        if entry.is_active {
            summary.active += 1;
        }
        match entry.role {
            Role::Admin => summary.admins += 1,
            Role::User => summary.users += 1,
            Role::Guest => summary.guests += 1,
        }
        self.entries.push(entry);
    }
}
