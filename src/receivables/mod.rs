pub mod penalty;
pub mod summary;
pub mod sync;

pub use penalty::{PenaltyCalculation, PenaltyConfig, PenaltyEngine};
pub use summary::{AgingSummary, BucketTotals};
pub use sync::{BatchSyncReport, DelinquencySynchronizer, SyncFailure, SyncReport};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::charges::Charge;
use crate::contracts::ContractTerms;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{
    AgingBucket, ChargeId, ChargeStatus, CollectionStatus, ContractId, PartyId, PropertyId,
    ReceivableId, TenantId,
};

/// aged collections record derived from an overdue charge.
/// natural key within a tenant scope: (contract, concept, due date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    pub id: ReceivableId,
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub party_id: PartyId,
    pub property_id: PropertyId,
    /// source charge, when opened by the synchronizer
    pub charge_id: Option<ChargeId>,
    pub concept: String,

    pub original_amount: Money,
    pub pending_amount: Money,
    pub penalty_amount: Money,
    pub penalty_rate: Rate,

    pub due_date: NaiveDate,
    // derived from due_date on every write
    pub days_overdue: u32,
    pub aging_bucket: AgingBucket,

    pub collection_status: CollectionStatus,
    pub active: bool,
    pub notes: Option<String>,
}

/// request to open a receivable by hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReceivable {
    pub contract_id: ContractId,
    pub party_id: PartyId,
    pub property_id: PropertyId,
    pub concept: String,
    pub original_amount: Money,
    pub pending_amount: Money,
    pub due_date: NaiveDate,
    pub penalty_rate: Option<Rate>,
    pub notes: Option<String>,
}

/// read filters over a tenant's receivables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivableFilter {
    All,
    Active,
    Party(PartyId),
    Property(PropertyId),
    Contract(ContractId),
    Status(CollectionStatus),
    /// active receivables in the bucket
    Bucket(AgingBucket),
}

impl ReceivableFilter {
    pub fn matches(&self, r: &Receivable) -> bool {
        match *self {
            ReceivableFilter::All => true,
            ReceivableFilter::Active => r.active,
            ReceivableFilter::Party(id) => r.party_id == id,
            ReceivableFilter::Property(id) => r.property_id == id,
            ReceivableFilter::Contract(id) => r.contract_id == id,
            ReceivableFilter::Status(status) => r.collection_status == status,
            ReceivableFilter::Bucket(bucket) => r.active && r.aging_bucket == bucket,
        }
    }
}

impl Receivable {
    pub fn create(tenant_id: TenantId, request: NewReceivable, today: NaiveDate) -> Result<Self> {
        if !request.original_amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.original_amount,
            });
        }
        if request.pending_amount.is_negative()
            || request.pending_amount > request.original_amount
        {
            return Err(LedgerError::InvalidAmount {
                amount: request.pending_amount,
            });
        }

        let mut receivable = Self {
            id: Uuid::new_v4(),
            tenant_id,
            contract_id: request.contract_id,
            party_id: request.party_id,
            property_id: request.property_id,
            charge_id: None,
            concept: request.concept,
            original_amount: request.original_amount,
            pending_amount: request.pending_amount,
            penalty_amount: Money::ZERO,
            penalty_rate: request.penalty_rate.unwrap_or(Rate::ZERO),
            due_date: request.due_date,
            days_overdue: 0,
            aging_bucket: AgingBucket::Current,
            collection_status: CollectionStatus::Pending,
            active: true,
            notes: request.notes,
        };
        receivable.refresh_aging(today);
        Ok(receivable)
    }

    /// seed a receivable from an overdue charge and its contract terms
    pub fn from_charge(charge: &Charge, terms: &ContractTerms, today: NaiveDate) -> Self {
        let mut receivable = Self {
            id: Uuid::new_v4(),
            tenant_id: charge.tenant_id,
            contract_id: charge.contract_id,
            party_id: terms.lessee_id,
            property_id: terms.property_id,
            charge_id: Some(charge.id),
            concept: charge.concept.clone(),
            original_amount: charge.original_amount,
            pending_amount: charge.pending_amount,
            penalty_amount: Money::ZERO,
            penalty_rate: Rate::ZERO,
            due_date: charge.due_date,
            days_overdue: 0,
            aging_bucket: AgingBucket::Current,
            collection_status: if charge.paid_amount.is_positive() {
                CollectionStatus::PartiallyPaid
            } else {
                CollectionStatus::Pending
            },
            active: true,
            notes: None,
        };
        receivable.refresh_aging(today);

        if let Some(config) = PenaltyConfig::from_contract(terms) {
            let calculation = PenaltyEngine::new(config).calculate_penalty(receivable.days_overdue);
            receivable.penalty_amount = calculation.penalty_amount;
        }
        receivable
    }

    /// recompute days overdue (floored at 0) and the aging bucket
    pub fn refresh_aging(&mut self, today: NaiveDate) {
        let days = (today - self.due_date).num_days().max(0);
        self.days_overdue = u32::try_from(days).unwrap_or(u32::MAX);
        self.aging_bucket = AgingBucket::from_days(days);
    }

    /// pending plus penalty
    pub fn total_due(&self) -> Money {
        self.pending_amount + self.penalty_amount
    }

    /// follow the source charge; returns whether pending or status changed
    pub fn sync_from_charge(&mut self, charge: &Charge, today: NaiveDate) -> bool {
        self.refresh_aging(today);
        // a cancelled charge re-issued under the same key
        let replaced = self.charge_id.is_some_and(|id| id != charge.id);

        if !self.active {
            // settled whose charge reopened, or written off whose charge was re-issued
            let reopen =
                charge.is_open() && (self.collection_status == CollectionStatus::Paid || replaced);
            if !reopen {
                return false;
            }
            self.active = true;
            self.charge_id = Some(charge.id);
            self.original_amount = charge.original_amount;
            self.pending_amount = charge.pending_amount;
            self.collection_status = if charge.paid_amount.is_positive() {
                CollectionStatus::PartiallyPaid
            } else {
                CollectionStatus::Pending
            };
            return true;
        }

        if replaced {
            self.charge_id = Some(charge.id);
            self.original_amount = charge.original_amount;
        } else if self.pending_amount == charge.pending_amount {
            return false;
        }
        self.pending_amount = charge.pending_amount;
        if charge.status == ChargeStatus::Paid {
            self.settle(today);
        } else if charge.paid_amount.is_positive() {
            self.collection_status = CollectionStatus::PartiallyPaid;
        } else if self.collection_status == CollectionStatus::PartiallyPaid {
            self.collection_status = CollectionStatus::Pending;
        }
        true
    }

    /// underlying debt fully paid
    pub fn settle(&mut self, today: NaiveDate) {
        self.pending_amount = Money::ZERO;
        self.collection_status = CollectionStatus::Paid;
        self.active = false;
        self.refresh_aging(today);
    }

    /// source charge cancelled; nothing is left to collect
    pub fn write_off(&mut self, today: NaiveDate) {
        self.pending_amount = Money::ZERO;
        self.collection_status = CollectionStatus::Uncollectible;
        self.active = false;
        self.refresh_aging(today);
    }

    pub fn set_collection_status(&mut self, status: CollectionStatus, today: NaiveDate) {
        self.collection_status = status;
        self.refresh_aging(today);
    }

    /// money collected directly against the receivable
    pub fn register_collection_payment(&mut self, amount: Money, today: NaiveDate) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        self.pending_amount = self.pending_amount.saturating_sub(amount);
        if self.pending_amount.is_zero() {
            self.collection_status = CollectionStatus::Paid;
        } else if self.pending_amount < self.original_amount {
            self.collection_status = CollectionStatus::PartiallyPaid;
        }
        self.refresh_aging(today);
        Ok(())
    }

    /// penalty = pending x rate, only when a rate is set
    pub fn apply_percentage_penalty(&mut self, today: NaiveDate) -> Money {
        if self.penalty_rate > Rate::ZERO {
            self.penalty_amount =
                penalty::percentage_penalty(self.pending_amount, self.penalty_rate);
        }
        self.refresh_aging(today);
        self.penalty_amount
    }

    /// soft delete
    pub fn deactivate(&mut self, today: NaiveDate) {
        self.active = false;
        self.refresh_aging(today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::NewCharge;
    use crate::types::ChargeKind;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> NewReceivable {
        NewReceivable {
            contract_id: Uuid::new_v4(),
            party_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            concept: "Renta JANUARY 2025".to_string(),
            original_amount: Money::from_major(1000),
            pending_amount: Money::from_major(1000),
            due_date: date(2025, 1, 5),
            penalty_rate: Some(Rate::from_percentage(dec!(2.5))),
            notes: None,
        }
    }

    #[test]
    fn test_create_derives_aging() {
        let r = Receivable::create(Uuid::new_v4(), request(), date(2025, 3, 1)).unwrap();
        assert_eq!(r.days_overdue, 55);
        assert_eq!(r.aging_bucket, AgingBucket::Overdue31To60);

        let early = Receivable::create(Uuid::new_v4(), request(), date(2025, 1, 1)).unwrap();
        assert_eq!(early.days_overdue, 0);
        assert_eq!(early.aging_bucket, AgingBucket::Current);
    }

    #[test]
    fn test_create_validates_amounts() {
        let mut bad = request();
        bad.pending_amount = Money::from_major(1001);
        assert!(Receivable::create(Uuid::new_v4(), bad, date(2025, 3, 1)).is_err());

        let mut bad = request();
        bad.original_amount = Money::ZERO;
        assert!(Receivable::create(Uuid::new_v4(), bad, date(2025, 3, 1)).is_err());
    }

    #[test]
    fn test_collection_payment() {
        let mut r = Receivable::create(Uuid::new_v4(), request(), date(2025, 3, 1)).unwrap();

        r.register_collection_payment(Money::from_major(400), date(2025, 3, 2)).unwrap();
        assert_eq!(r.pending_amount, Money::from_major(600));
        assert_eq!(r.collection_status, CollectionStatus::PartiallyPaid);
        assert_eq!(r.days_overdue, 56);

        r.register_collection_payment(Money::from_major(700), date(2025, 3, 2)).unwrap();
        assert_eq!(r.pending_amount, Money::ZERO);
        assert_eq!(r.collection_status, CollectionStatus::Paid);

        assert!(r.register_collection_payment(Money::ZERO, date(2025, 3, 2)).is_err());
    }

    #[test]
    fn test_percentage_penalty() {
        let mut r = Receivable::create(Uuid::new_v4(), request(), date(2025, 3, 1)).unwrap();
        assert_eq!(r.apply_percentage_penalty(date(2025, 3, 1)), Money::from_major(25));
        assert_eq!(r.total_due(), Money::from_major(1025));

        let mut no_rate = request();
        no_rate.penalty_rate = None;
        let mut r = Receivable::create(Uuid::new_v4(), no_rate, date(2025, 3, 1)).unwrap();
        assert_eq!(r.apply_percentage_penalty(date(2025, 3, 1)), Money::ZERO);
    }

    #[test]
    fn test_from_charge_with_penalty() {
        let tenant = Uuid::new_v4();
        let contract = Uuid::new_v4();
        let charge = Charge::create(
            tenant,
            NewCharge::new(
                contract,
                ChargeKind::Rent,
                "Renta JANUARY 2025",
                Money::from_major(1000),
                date(2025, 1, 1),
                date(2025, 1, 5),
            ),
        )
        .unwrap();
        let terms = ContractTerms::new(
            tenant,
            contract,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1000),
        )
        .with_grace_period(10)
        .with_daily_penalty(Money::from_decimal(dec!(5.00)));

        // 35 days overdue
        let r = Receivable::from_charge(&charge, &terms, date(2025, 2, 9));
        assert_eq!(r.days_overdue, 35);
        assert_eq!(r.penalty_amount, Money::from_decimal(dec!(125.00)));
        assert_eq!(r.aging_bucket, AgingBucket::Overdue31To60);
        assert_eq!(r.party_id, terms.lessee_id);
        assert_eq!(r.charge_id, Some(charge.id));
    }

    fn open_charge(contract: ContractId, amount: i64) -> Charge {
        Charge::create(
            Uuid::new_v4(),
            NewCharge::new(
                contract,
                ChargeKind::Maintenance,
                "Mantenimiento",
                Money::from_major(amount),
                date(2025, 1, 1),
                date(2025, 1, 5),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_settled_receivable_reopens_with_its_charge() {
        let charge = open_charge(Uuid::new_v4(), 1000);
        let terms = ContractTerms::new(
            charge.tenant_id,
            charge.contract_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1000),
        );
        let mut r = Receivable::from_charge(&charge, &terms, date(2025, 2, 1));
        r.settle(date(2025, 2, 2));

        assert!(r.sync_from_charge(&charge, date(2025, 2, 3)));
        assert!(r.active);
        assert_eq!(r.pending_amount, Money::from_major(1000));
        assert_eq!(r.collection_status, CollectionStatus::Pending);
        assert!(!r.sync_from_charge(&charge, date(2025, 2, 3)));
    }

    #[test]
    fn test_written_off_receivable_follows_reissued_charge() {
        let cancelled = open_charge(Uuid::new_v4(), 1000);
        let terms = ContractTerms::new(
            cancelled.tenant_id,
            cancelled.contract_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1000),
        );
        let mut r = Receivable::from_charge(&cancelled, &terms, date(2025, 2, 1));
        r.write_off(date(2025, 2, 2));
        assert!(!r.active);
        assert_eq!(r.pending_amount, Money::ZERO);
        assert_eq!(r.collection_status, CollectionStatus::Uncollectible);

        // the written-off charge itself never revives it
        assert!(!r.sync_from_charge(&cancelled, date(2025, 2, 3)));

        let reissued = open_charge(cancelled.contract_id, 700);
        assert!(r.sync_from_charge(&reissued, date(2025, 2, 3)));
        assert!(r.active);
        assert_eq!(r.charge_id, Some(reissued.id));
        assert_eq!(r.original_amount, Money::from_major(700));
        assert_eq!(r.pending_amount, Money::from_major(700));
        assert!(!r.sync_from_charge(&reissued, date(2025, 2, 3)));
    }

    #[test]
    fn test_filters() {
        let mut r = Receivable::create(Uuid::new_v4(), request(), date(2025, 3, 1)).unwrap();
        assert!(ReceivableFilter::Bucket(AgingBucket::Overdue31To60).matches(&r));
        assert!(ReceivableFilter::Party(r.party_id).matches(&r));

        r.deactivate(date(2025, 3, 1));
        assert!(!ReceivableFilter::Active.matches(&r));
        assert!(!ReceivableFilter::Bucket(AgingBucket::Overdue31To60).matches(&r));
        assert!(ReceivableFilter::All.matches(&r));
    }
}
