use serde::{Deserialize, Serialize};

use crate::contracts::ContractTerms;
use crate::decimal::{Money, Rate};

/// late penalty terms of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// flat amount per overdue day
    pub daily_amount: Money,
    /// days past due before penalties apply
    pub grace_period_days: u32,
}

impl PenaltyConfig {
    pub fn new(daily_amount: Money, grace_period_days: u32) -> Self {
        Self {
            daily_amount,
            grace_period_days,
        }
    }

    /// None when the contract defines no positive daily penalty
    pub fn from_contract(terms: &ContractTerms) -> Option<Self> {
        terms
            .daily_penalty
            .filter(|amount| amount.is_positive())
            .map(|amount| Self::new(amount, terms.grace_period_days))
    }
}

/// engine for calculating late penalties
pub struct PenaltyEngine {
    pub config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    /// daily amount x days beyond the grace period
    pub fn calculate_penalty(&self, days_overdue: u32) -> PenaltyCalculation {
        if days_overdue <= self.config.grace_period_days {
            return PenaltyCalculation {
                penalty_amount: Money::ZERO,
                daily_amount: self.config.daily_amount,
                days_charged: 0,
                grace_applied: true,
            };
        }

        let days_charged = days_overdue - self.config.grace_period_days;
        PenaltyCalculation {
            penalty_amount: self.config.daily_amount.times_days(days_charged),
            daily_amount: self.config.daily_amount,
            days_charged,
            grace_applied: false,
        }
    }
}

/// penalty calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCalculation {
    pub penalty_amount: Money,
    pub daily_amount: Money,
    pub days_charged: u32,
    pub grace_applied: bool,
}

/// pending x percentage / 100, rounded half-up to cents
pub fn percentage_penalty(pending: Money, rate: Rate) -> Money {
    pending.percentage(rate)
}
