use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use portal_core::SubjectId;

/// Identity record as supplied by the external directory.
///
/// Field names follow the identity provider's attribute names. Every field may
/// be missing; attributes without a dedicated field are collected into
/// `custom_fields` so rules can still constrain on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(default)]
    pub sub: Option<SubjectId>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub given_name: Option<String>,

    #[serde(default)]
    pub family_name: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: BTreeSet<String>,

    /// Directory roles (opaque strings, not platform [`crate::Role`]s).
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    #[serde(default)]
    pub user_status: Option<String>,

    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, Value>,
}

impl IdentityRecord {
    pub fn new(sub: impl Into<SubjectId>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, given: impl Into<String>, family: impl Into<String>) -> Self {
        self.given_name = Some(given.into());
        self.family_name = Some(family.into());
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.user_status = Some(status.into());
        self
    }

    pub fn with_custom_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(field.into(), value.into());
        self
    }

    /// Email, if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    /// The part of the email after the first `@`.
    pub fn email_domain(&self) -> Option<&str> {
        self.email()
            .and_then(|email| email.split('@').nth(1))
            .filter(|domain| !domain.is_empty())
    }

    pub fn subscription(&self) -> Option<&str> {
        non_blank(self.subscription.as_deref())
    }

    pub fn status(&self) -> Option<&str> {
        non_blank(self.user_status.as_deref())
    }

    /// Look up an attribute by name for custom-field conditions.
    ///
    /// Collected custom fields take precedence; the well-known scalar
    /// attributes are reachable by their wire names as well. JSON `null`
    /// counts as absent.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.custom_fields.get(name) {
            return (!value.is_null()).then(|| value.clone());
        }

        let scalar = match name {
            "sub" => self.sub.as_ref().map(|s| s.as_str()),
            "email" => self.email.as_deref(),
            "given_name" => self.given_name.as_deref(),
            "family_name" => self.family_name.as_deref(),
            "subscription" => self.subscription.as_deref(),
            "user_status" => self.user_status.as_deref(),
            _ => None,
        };
        scalar.map(|s| Value::String(s.to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
