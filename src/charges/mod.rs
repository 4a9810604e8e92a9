pub mod generation;

pub use generation::FixedChargeGenerator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{BillingPeriod, ChargeId, ChargeKind, ChargeStatus, ContractId, TenantId};

/// a single billable obligation on a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub kind: ChargeKind,
    pub concept: String,

    // amount triangle: paid + pending == original
    pub original_amount: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,

    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: ChargeStatus,

    /// generated by the periodic fixed-charge run
    pub is_fixed: bool,
    pub period: Option<BillingPeriod>,
    pub notes: Option<String>,
}

/// request to create a charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharge {
    pub contract_id: ContractId,
    pub kind: ChargeKind,
    pub concept: String,
    pub amount: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub is_fixed: bool,
    pub period: Option<BillingPeriod>,
    pub notes: Option<String>,
}

impl NewCharge {
    pub fn new(
        contract_id: ContractId,
        kind: ChargeKind,
        concept: impl Into<String>,
        amount: Money,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            contract_id,
            kind,
            concept: concept.into(),
            amount,
            issue_date,
            due_date,
            is_fixed: false,
            period: None,
            notes: None,
        }
    }
}

impl Charge {
    /// validate a request and build a pending charge
    pub fn create(tenant_id: TenantId, request: NewCharge) -> Result<Self> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount,
            });
        }
        if request.due_date < request.issue_date {
            return Err(LedgerError::InvalidDate {
                message: format!(
                    "due date {} precedes issue date {}",
                    request.due_date, request.issue_date
                ),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            contract_id: request.contract_id,
            kind: request.kind,
            concept: request.concept,
            original_amount: request.amount,
            paid_amount: Money::ZERO,
            pending_amount: request.amount,
            issue_date: request.issue_date,
            due_date: request.due_date,
            status: ChargeStatus::Pending,
            is_fixed: request.is_fixed,
            period: request.period,
            notes: request.notes,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// open and past its due date
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }

    /// record money applied to this charge.
    /// the caller clamps `amount` to the pending balance beforehand.
    pub fn apply_payment(&mut self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if !self.is_open() {
            return Err(LedgerError::InvalidState {
                current: format!("{:?}", self.status),
                expected: "Pending, Partial or Overdue".to_string(),
            });
        }

        self.paid_amount += amount;
        self.pending_amount = self.original_amount.saturating_sub(self.paid_amount);
        debug_assert!(self.paid_amount <= self.original_amount);

        self.status = if self.pending_amount.is_zero() {
            ChargeStatus::Paid
        } else if self.status == ChargeStatus::Overdue {
            ChargeStatus::Overdue
        } else if self.paid_amount.is_positive() {
            ChargeStatus::Partial
        } else {
            self.status
        };
        Ok(())
    }

    /// undo a previous application of `amount`
    pub fn reverse_application(&mut self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        if amount > self.paid_amount {
            return Err(LedgerError::ReversalExceedsPaid {
                paid: self.paid_amount,
                requested: amount,
            });
        }

        self.paid_amount -= amount;
        self.pending_amount = self.original_amount.saturating_sub(self.paid_amount);

        self.status = if self.status == ChargeStatus::Overdue {
            ChargeStatus::Overdue
        } else if self.paid_amount.is_zero() {
            ChargeStatus::Pending
        } else {
            ChargeStatus::Partial
        };
        Ok(())
    }

    /// void the charge; only allowed while nothing has been paid
    pub fn cancel(&mut self) -> Result<()> {
        if self.paid_amount.is_positive() {
            return Err(LedgerError::ChargeHasPayments {
                id: self.id,
                paid: self.paid_amount,
            });
        }
        if self.status == ChargeStatus::Cancelled {
            return Err(LedgerError::InvalidState {
                current: "Cancelled".to_string(),
                expected: "Pending".to_string(),
            });
        }
        self.status = ChargeStatus::Cancelled;
        Ok(())
    }

    /// flag a pending/partial charge as overdue; returns whether it changed
    pub fn mark_overdue(&mut self, today: NaiveDate) -> bool {
        let eligible = matches!(self.status, ChargeStatus::Pending | ChargeStatus::Partial);
        if eligible && self.due_date < today {
            self.status = ChargeStatus::Overdue;
            true
        } else {
            false
        }
    }
}
