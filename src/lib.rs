pub mod charges;
pub mod config;
pub mod contracts;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod payments;
pub mod receivables;
pub mod reports;
pub mod store;
pub mod types;

// re-export key types
pub use charges::{Charge, FixedChargeGenerator, NewCharge};
pub use config::{ChargeConfig, LedgerConfig, ReceiptConfig, SyncConfig};
pub use contracts::{ContractSource, ContractTerms, InMemoryContracts};
pub use decimal::{Money, Rate};
pub use engine::BillingEngine;
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{EventStore, LedgerEvent};
pub use payments::{
    Allocation, AllocationDirective, AllocationEngine, AllocationOutcome, CancellationOutcome,
    NewPayment, Payment,
};
pub use receivables::{
    AgingSummary, BatchSyncReport, DelinquencySynchronizer, NewReceivable, PenaltyConfig,
    PenaltyEngine, Receivable, ReceivableFilter, SyncReport,
};
pub use reports::{ContractStatement, PaymentStatistics};
pub use store::{LedgerStore, LedgerTables};
pub use types::{
    AgingBucket, AllocationId, BillingPeriod, ChargeId, ChargeKind, ChargeStatus,
    CollectionStatus, ContractId, PartyId, PaymentId, PaymentMethod, PaymentStatus, PropertyId,
    ReceivableId, TenantId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
