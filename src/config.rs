use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    pub receipts: ReceiptConfig,
    pub charges: ChargeConfig,
    pub sync: SyncConfig,
}

/// receipt numbering, e.g. REC-000042
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub prefix: String,
    pub width: usize,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            prefix: "REC-".to_string(),
            width: 6,
        }
    }
}

/// periodic charge generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// leading word of generated rent concepts ("Renta MARCH 2025")
    pub rent_concept_prefix: String,
    /// due day used when a contract does not define one
    pub default_due_day: u32,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            rent_concept_prefix: "Renta".to_string(),
            default_due_day: 1,
        }
    }
}

/// delinquency synchronizer schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// utc hour from which the daily run may start
    pub daily_run_hour: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { daily_run_hour: 6 }
    }
}

impl LedgerConfig {
    /// parse from json; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| {
            LedgerError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.receipts.width == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "receipt width must be at least 1".to_string(),
            });
        }
        if !(1..=31).contains(&self.charges.default_due_day) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("default due day {} outside 1..=31", self.charges.default_due_day),
            });
        }
        if self.sync.daily_run_hour > 23 {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("daily run hour {} outside 0..=23", self.sync.daily_run_hour),
            });
        }
        Ok(())
    }
}
