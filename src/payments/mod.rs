pub mod allocation;

pub use allocation::{Allocation, AllocationEngine, AllocationOutcome, CancellationOutcome};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ReceiptConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{
    ChargeId, ContractId, PartyId, PaymentId, PaymentMethod, PaymentStatus, TenantId,
};

/// a money receipt, allocated to charges independently of its creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub payer_id: PartyId,
    pub receipt_number: String,

    pub amount: Money,
    /// never exceeds `amount`
    pub allocated_amount: Money,

    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: NaiveDate,
    /// stamped when the payment becomes fully allocated
    pub allocated_on: Option<NaiveDate>,

    pub reference: Option<String>,
    pub bank: Option<String>,
    pub notes: Option<String>,
}

/// what to do with a payment right after it is recorded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationDirective {
    /// leave it unallocated
    #[default]
    None,
    /// oldest due date first
    Automatic,
    /// the given charges, in order
    Explicit(Vec<ChargeId>),
}

/// request to record a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub contract_id: ContractId,
    pub payer_id: PartyId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub bank: Option<String>,
    pub notes: Option<String>,
    pub allocation: AllocationDirective,
}

impl NewPayment {
    pub fn new(
        contract_id: ContractId,
        payer_id: PartyId,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            contract_id,
            payer_id,
            amount,
            method,
            payment_date,
            reference: None,
            bank: None,
            notes: None,
            allocation: AllocationDirective::None,
        }
    }

    pub fn with_allocation(mut self, directive: AllocationDirective) -> Self {
        self.allocation = directive;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

impl Payment {
    /// validate a request and build a pending payment under `receipt_number`
    pub fn create(
        tenant_id: TenantId,
        request: &NewPayment,
        receipt_number: String,
    ) -> Result<Self> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            contract_id: request.contract_id,
            payer_id: request.payer_id,
            receipt_number,
            amount: request.amount,
            allocated_amount: Money::ZERO,
            method: request.method,
            status: PaymentStatus::Pending,
            payment_date: request.payment_date,
            allocated_on: None,
            reference: request.reference.clone(),
            bank: request.bank.clone(),
            notes: request.notes.clone(),
        })
    }

    /// amount still free to allocate
    pub fn available(&self) -> Money {
        self.amount.saturating_sub(self.allocated_amount)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PaymentStatus::Cancelled
    }

    pub fn ensure_allocatable(&self) -> Result<()> {
        match self.status {
            PaymentStatus::Cancelled => Err(LedgerError::PaymentCancelled { id: self.id }),
            PaymentStatus::Rejected => Err(LedgerError::InvalidState {
                current: "Rejected".to_string(),
                expected: "Pending or Partial".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// count `amount` as allocated and refresh the status
    pub fn record_allocation(&mut self, amount: Money, today: NaiveDate) -> Result<()> {
        self.ensure_allocatable()?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        let available = self.available();
        if amount > available {
            return Err(LedgerError::ExceedsPaymentAvailable {
                available,
                requested: amount,
            });
        }

        self.allocated_amount += amount;
        if self.available().is_zero() {
            self.status = PaymentStatus::Applied;
            self.allocated_on = Some(today);
        } else {
            self.status = PaymentStatus::Partial;
        }
        Ok(())
    }

    /// give back `amount` of a reversed allocation
    pub fn release_allocation(&mut self, amount: Money) -> Result<()> {
        if amount > self.allocated_amount {
            return Err(LedgerError::ReversalExceedsPaid {
                paid: self.allocated_amount,
                requested: amount,
            });
        }
        self.allocated_amount -= amount;
        self.allocated_on = None;
        if !self.is_cancelled() {
            self.status = if self.allocated_amount.is_zero() {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Partial
            };
        }
        Ok(())
    }

    /// terminal: allocations are gone, nothing is allocated
    pub fn mark_cancelled(&mut self) {
        self.allocated_amount = Money::ZERO;
        self.allocated_on = None;
        self.status = PaymentStatus::Cancelled;
    }
}

/// next receipt number: highest numeric suffix already issued + 1
pub fn next_receipt_number<'a>(
    issued: impl IntoIterator<Item = &'a str>,
    config: &ReceiptConfig,
) -> String {
    let last = issued
        .into_iter()
        .filter_map(|r| r.strip_prefix(config.prefix.as_str()))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:0width$}", config.prefix, last + 1, width = config.width)
}
