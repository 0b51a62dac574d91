//! Company identification number (IČO) normalization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AresError, Result};

/// Canonical numeric form of a company identification number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(u32);

impl CompanyId {
    /// Coerce user input into the canonical form.
    ///
    /// Surrounding and inner whitespace is ignored ("270 74 358"), leading
    /// zeros are dropped. Anything that is not a run of ASCII digits fitting
    /// into `u32` is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        if compact.is_empty() || !compact.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AresError::InvalidInput(format!(
                "company identification number must be a number, got '{}'",
                input
            )));
        }

        compact.parse::<u32>().map(Self).map_err(|_| {
            AresError::InvalidInput(format!(
                "company identification number is out of range: '{}'",
                input
            ))
        })
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Numeric comparison against an identifier read from a document.
    pub fn matches(self, raw: &str) -> bool {
        raw.trim().parse::<u64>().ok() == Some(u64::from(self.0))
    }
}

impl From<u32> for CompanyId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for CompanyId {
    type Err = AresError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
