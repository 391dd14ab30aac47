//! Dues configuration: defaults for new billing cycles

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::dues::FiscalCalendar;
use crate::domain::foundation::Currency;

/// Dues configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DuesConfig {
    /// ISO 4217 code used when a cycle is created without one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Days after cycle start before unpaid dues are overdue
    #[serde(default = "default_grace_days")]
    pub default_grace_days: u32,

    /// First month of the fiscal year (1-12)
    #[serde(default = "default_fiscal_year_start_month")]
    pub fiscal_year_start_month: u32,
}

impl DuesConfig {
    pub fn currency(&self) -> Result<Currency, ValidationError> {
        Currency::parse(&self.default_currency).map_err(|_| ValidationError::InvalidCurrency)
    }

    pub fn calendar(&self) -> Result<FiscalCalendar, ValidationError> {
        FiscalCalendar::starting_in(self.fiscal_year_start_month)
            .map_err(|_| ValidationError::InvalidFiscalMonth)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.currency()?;
        self.calendar()?;
        if self.default_grace_days > 365 {
            return Err(ValidationError::InvalidGraceDays);
        }
        Ok(())
    }
}

impl Default for DuesConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            default_grace_days: default_grace_days(),
            fiscal_year_start_month: default_fiscal_year_start_month(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_grace_days() -> u32 {
    30
}

fn default_fiscal_year_start_month() -> u32 {
    7
}
