//! Permission and function grants.
//!
//! Rules may list `"*"` in their `permissions` or `functions`. On the wire that
//! is a plain string; in memory it is the explicit [`Permission::All`] /
//! [`FunctionRef::All`] tag.
//!
//! The tag carries **no implicit meaning**. Holding `Permission::All` does not
//! satisfy any other permission; it only matches a requirement that is itself
//! `"*"`. Full access is realized in exactly one place: the admin-role bypass
//! in [`crate::authorize::has_permission`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use portal_core::FunctionId;

const WILDCARD: &str = "*";

/// Permission identifier (e.g. `"csrd.access"`), or the `"*"` tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    All,
    Named(String),
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == WILDCARD {
            Permission::All
        } else {
            Permission::Named(name)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Permission::All => WILDCARD,
            Permission::Named(name) => name,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Permission::All)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Permission::new(value)
    }
}

/// Function grant: a specific function id, or the `"*"` tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunctionRef {
    All,
    Function(FunctionId),
}

impl FunctionRef {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == WILDCARD {
            FunctionRef::All
        } else {
            FunctionRef::Function(FunctionId::new(id))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FunctionRef::All => WILDCARD,
            FunctionRef::Function(id) => id.as_str(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FunctionRef::All)
    }
}

impl core::fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FunctionRef {
    fn from(value: &str) -> Self {
        FunctionRef::new(value)
    }
}

macro_rules! impl_wildcard_serde {
    ($t:ty) => {
        impl Serialize for $t {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(<$t>::new(raw))
            }
        }
    };
}

impl_wildcard_serde!(Permission);
impl_wildcard_serde!(FunctionRef);
