//! Converter options
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Switches for the optional parts of a conversion.
///
/// Deserializes from JSON; missing fields take their defaults:
///
/// ```json
/// { "sanitize": true, "balance_tags": true, "email_autolinks": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Drop every tag outside the whitelist from the output.
    pub sanitize: bool,
    /// Drop opening and closing tags that have no partner.
    pub balance_tags: bool,
    /// Turn `<someone@example.com>` into a `mailto:` link.
    pub email_autolinks: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        ConverterOptions {
            sanitize: false,
            balance_tags: false,
            email_autolinks: true,
        }
    }
}

impl ConverterOptions {
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options suited to untrusted input: sanitize, then balance.
    pub fn untrusted() -> Self {
        ConverterOptions {
            sanitize: true,
            balance_tags: true,
            ..Self::default()
        }
    }
}
