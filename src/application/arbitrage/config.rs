//! Arbitrage scan configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{QuoteSelectionPolicy, SolverConfig};
use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    /// Cash split across the legs of each opportunity.
    #[serde(default = "default_budget")]
    pub budget: Decimal,

    /// Tie-break between quotes sharing a timestamp.
    #[serde(default)]
    pub quote_policy: QuoteSelectionPolicy,

    /// Only quotes from open markets take part in detection.
    #[serde(default = "default_open_markets_only")]
    pub open_markets_only: bool,

    #[serde(flatten)]
    pub solver: SolverConfig,
}

fn default_budget() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_open_markets_only() -> bool {
    true
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            quote_policy: QuoteSelectionPolicy::default(),
            open_markets_only: default_open_markets_only(),
            solver: SolverConfig::default(),
        }
    }
}

impl ArbitrageConfig {
    /// Validate ranges.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.budget",
                reason: "must be greater than 0".into(),
            });
        }
        if self.solver.share_lot < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.share_lot",
                reason: "must not be negative".into(),
            });
        }
        if self.solver.min_total_stake < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.min_total_stake",
                reason: "must not be negative".into(),
            });
        }
        if self.solver.min_total_stake > self.budget {
            return Err(ConfigError::InvalidValue {
                field: "arbitrage.min_total_stake",
                reason: "must not exceed the budget".into(),
            });
        }
        Ok(())
    }
}
