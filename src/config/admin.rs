//! Admin bootstrap configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::Email;

/// Admin configuration
///
/// When `bootstrap_email` is set, startup ensures an active admin member
/// with that email exists.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub bootstrap_email: Option<String>,

    #[serde(default = "default_first_name")]
    pub bootstrap_first_name: String,

    #[serde(default = "default_last_name")]
    pub bootstrap_last_name: String,
}

impl AdminConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.bootstrap_email {
            Email::parse(email).map_err(|_| ValidationError::InvalidAdminEmail)?;
        }
        Ok(())
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bootstrap_email: None,
            bootstrap_first_name: default_first_name(),
            bootstrap_last_name: default_last_name(),
        }
    }
}

fn default_first_name() -> String {
    "Club".to_string()
}

fn default_last_name() -> String {
    "Admin".to_string()
}
