//! Invitation configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Invitation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InvitationConfig {
    /// Days an invitation stays redeemable
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
}

impl InvitationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=90).contains(&self.validity_days) {
            return Err(ValidationError::InvalidInvitationValidity);
        }
        Ok(())
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
        }
    }
}

fn default_validity_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_one_week() {
        let config = InvitationConfig::default();
        assert_eq!(config.validity_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_and_huge() {
        for days in [0, -1, 91] {
            let config = InvitationConfig { validity_days: days };
            assert_eq!(config.validate(), Err(ValidationError::InvalidInvitationValidity));
        }
    }
}
