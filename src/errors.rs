use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{AllocationId, ChargeId, ContractId, PaymentId, ReceivableId, TenantId};

/// coarse classification used by callers to map failures onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Synchronization,
    Configuration,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("amount exceeds payment available balance: available {available}, requested {requested}")]
    ExceedsPaymentAvailable {
        available: Money,
        requested: Money,
    },

    #[error("amount exceeds charge pending balance: pending {pending}, requested {requested}")]
    ExceedsChargePending {
        pending: Money,
        requested: Money,
    },

    #[error("invalid billing period: {month}/{year}")]
    InvalidPeriod {
        month: u32,
        year: i32,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("charge not found: {id}")]
    ChargeNotFound {
        id: ChargeId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("allocation not found: {id}")]
    AllocationNotFound {
        id: AllocationId,
    },

    #[error("receivable not found: {id}")]
    ReceivableNotFound {
        id: ReceivableId,
    },

    #[error("charge {id} has payments applied ({paid}) and cannot be cancelled")]
    ChargeHasPayments {
        id: ChargeId,
        paid: Money,
    },

    #[error("payment {id} is cancelled")]
    PaymentCancelled {
        id: PaymentId,
    },

    #[error("reversal exceeds paid amount: paid {paid}, requested {requested}")]
    ReversalExceedsPaid {
        paid: Money,
        requested: Money,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("charge already exists for contract {contract_id}, concept '{concept}', due {due_date}")]
    DuplicateCharge {
        contract_id: ContractId,
        concept: String,
        due_date: NaiveDate,
    },

    #[error("receivable already exists for contract {contract_id}, concept '{concept}', due {due_date}")]
    DuplicateReceivable {
        contract_id: ContractId,
        concept: String,
        due_date: NaiveDate,
    },

    #[error("receipt number already issued: {receipt_number}")]
    DuplicateReceipt {
        receipt_number: String,
    },

    #[error("delinquency sync failed for tenant {tenant_id}: {message}")]
    SyncFailed {
        tenant_id: TenantId,
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::ExceedsPaymentAvailable { .. }
            | LedgerError::ExceedsChargePending { .. }
            | LedgerError::InvalidPeriod { .. }
            | LedgerError::InvalidDate { .. } => ErrorKind::Validation,

            LedgerError::ChargeNotFound { .. }
            | LedgerError::PaymentNotFound { .. }
            | LedgerError::ContractNotFound { .. }
            | LedgerError::AllocationNotFound { .. }
            | LedgerError::ReceivableNotFound { .. } => ErrorKind::NotFound,

            LedgerError::ChargeHasPayments { .. }
            | LedgerError::PaymentCancelled { .. }
            | LedgerError::ReversalExceedsPaid { .. }
            | LedgerError::InvalidState { .. }
            | LedgerError::DuplicateCharge { .. }
            | LedgerError::DuplicateReceivable { .. }
            | LedgerError::DuplicateReceipt { .. } => ErrorKind::Conflict,

            LedgerError::SyncFailed { .. } => ErrorKind::Synchronization,

            LedgerError::InvalidConfiguration { .. } => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
