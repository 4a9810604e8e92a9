use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// multi-company partition key; every record lives under exactly one
pub type TenantId = Uuid;
pub type ContractId = Uuid;
pub type ChargeId = Uuid;
pub type PaymentId = Uuid;
pub type AllocationId = Uuid;
pub type ReceivableId = Uuid;
/// a person in the party catalog (lessee, payer)
pub type PartyId = Uuid;
pub type PropertyId = Uuid;

/// kind of billable obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeKind {
    Rent,
    Deposit,
    Penalty,
    Maintenance,
    Service,
    Other,
}

/// charge lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    /// nothing paid yet
    Pending,
    /// some amount paid, balance remaining
    Partial,
    /// fully settled
    Paid,
    /// due date passed while still open; query marker only
    Overdue,
    /// voided before any payment
    Cancelled,
}

impl ChargeStatus {
    /// still accepts allocations
    pub fn is_open(&self) -> bool {
        matches!(self, ChargeStatus::Pending | ChargeStatus::Partial | ChargeStatus::Overdue)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeStatus::Paid | ChargeStatus::Cancelled)
    }
}

/// how the money was received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    DebitCard,
    CreditCard,
    BankDeposit,
}

/// payment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// received, nothing allocated
    Pending,
    /// partly allocated
    Partial,
    /// fully allocated
    Applied,
    Rejected,
    /// allocations reversed; terminal
    Cancelled,
}

/// collections workflow status of a receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Pending,
    InProgress,
    Promised,
    PartiallyPaid,
    Paid,
    Uncollectible,
}

/// aging classification by days overdue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "VIGENTE")]
    Current,
    #[serde(rename = "VENCIDO_1_30")]
    Overdue1To30,
    #[serde(rename = "VENCIDO_31_60")]
    Overdue31To60,
    #[serde(rename = "VENCIDO_61_90")]
    Overdue61To90,
    #[serde(rename = "VENCIDO_MAS_90")]
    OverdueOver90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Overdue1To30,
        AgingBucket::Overdue31To60,
        AgingBucket::Overdue61To90,
        AgingBucket::OverdueOver90,
    ];

    pub fn from_days(days_overdue: i64) -> Self {
        match days_overdue {
            d if d <= 0 => AgingBucket::Current,
            1..=30 => AgingBucket::Overdue1To30,
            31..=60 => AgingBucket::Overdue31To60,
            61..=90 => AgingBucket::Overdue61To90,
            _ => AgingBucket::OverdueOver90,
        }
    }
}

/// a billing month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(LedgerError::InvalidPeriod { month, year });
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MIN)
    }

    /// day of this month, clamped to the month's last day
    pub fn day_clamped(&self, day: u32) -> NaiveDate {
        let last = self.last_day();
        let day = day.clamp(1, last.day());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or(last)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// upper-case english month name, e.g. "MARCH"
    pub fn month_name(&self) -> String {
        Month::try_from(self.month as u8)
            .map(|m| m.name().to_uppercase())
            .unwrap_or_default()
    }
}
