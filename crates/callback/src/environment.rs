//! Payconiq environments.
//!
//! Production and the external test environment behave identically; they
//! differ only in the hosts they live on. Everything environment-specific is
//! data on [`Environment`] so a single verifier and a single key cache type
//! serve both.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A Payconiq environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Live payments.
    #[default]
    #[serde(rename = "PROD", alias = "production")]
    Production,
    /// Payconiq's external integration environment.
    #[serde(rename = "EXT", alias = "external")]
    External,
}

impl Environment {
    /// URL of the published signing key set.
    #[must_use]
    pub fn certificates_url(&self) -> &'static str {
        match self {
            Self::Production => "https://payconiq.com/certificates",
            Self::External => "https://ext.payconiq.com/certificates",
        }
    }

    /// Endpoint for creating point-of-sale payments.
    #[must_use]
    pub fn pos_payments_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.payconiq.com/v3/payments/pos",
            Self::External => "https://api.ext.payconiq.com/v3/payments/pos",
        }
    }

    /// Short name (`PROD` or `EXT`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "PROD",
            Self::External => "EXT",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown environment name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROD" | "PRODUCTION" => Ok(Self::Production),
            "EXT" | "EXTERNAL" => Ok(Self::External),
            _ => Err(UnknownEnvironment(s.to_owned())),
        }
    }
}
