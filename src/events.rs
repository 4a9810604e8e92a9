use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    AllocationId, BillingPeriod, ChargeId, CollectionStatus, ContractId, PaymentId, PaymentStatus,
    ReceivableId, TenantId,
};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // charge events
    ChargeCreated {
        tenant_id: TenantId,
        charge_id: ChargeId,
        contract_id: ContractId,
        amount: Money,
        due_date: NaiveDate,
    },
    ChargeCancelled {
        tenant_id: TenantId,
        charge_id: ChargeId,
        timestamp: DateTime<Utc>,
    },
    ChargesMarkedOverdue {
        tenant_id: TenantId,
        count: usize,
        as_of: NaiveDate,
    },
    FixedChargesGenerated {
        tenant_id: TenantId,
        period: BillingPeriod,
        count: usize,
    },

    // payment events
    PaymentReceived {
        tenant_id: TenantId,
        payment_id: PaymentId,
        receipt_number: String,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentAllocated {
        tenant_id: TenantId,
        payment_id: PaymentId,
        allocation_id: AllocationId,
        charge_id: ChargeId,
        amount: Money,
        payment_status: PaymentStatus,
    },
    AllocationReversed {
        tenant_id: TenantId,
        payment_id: PaymentId,
        charge_id: ChargeId,
        amount: Money,
    },
    PaymentCancelled {
        tenant_id: TenantId,
        payment_id: PaymentId,
        reversed_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // receivable events
    ReceivableOpened {
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        contract_id: ContractId,
        pending_amount: Money,
        due_date: NaiveDate,
    },
    ReceivableUpdated {
        tenant_id: TenantId,
        receivable_id: ReceivableId,
        pending_amount: Money,
        collection_status: CollectionStatus,
    },
    ReceivableSettled {
        tenant_id: TenantId,
        receivable_id: ReceivableId,
    },
    ReceivableWrittenOff {
        tenant_id: TenantId,
        receivable_id: ReceivableId,
    },
    DelinquencySyncCompleted {
        tenant_id: TenantId,
        created: usize,
        updated: usize,
        unchanged: usize,
        deactivated: usize,
        as_of: NaiveDate,
    },
    DelinquencySyncFailed {
        tenant_id: TenantId,
        reason: String,
        as_of: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LedgerEvent>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
