use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::decimal::Money;
use crate::types::{AgingBucket, CollectionStatus, TenantId};

use super::Receivable;

/// count and pending amount of one aging bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketTotals {
    pub count: usize,
    pub amount: Money,
}

/// aging report over a tenant's active receivables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingSummary {
    pub tenant_id: TenantId,
    pub as_of: NaiveDate,
    pub total_pending: Money,
    pub total_penalty: Money,
    /// pending + penalty
    pub total_due: Money,
    pub count: usize,
    pub by_bucket: BTreeMap<AgingBucket, BucketTotals>,
    pub by_status: BTreeMap<CollectionStatus, usize>,
}

impl AgingSummary {
    /// inactive receivables are ignored; every bucket is always present
    pub fn from_receivables<'a>(
        tenant_id: TenantId,
        as_of: NaiveDate,
        receivables: impl IntoIterator<Item = &'a Receivable>,
    ) -> Self {
        let mut summary = Self {
            tenant_id,
            as_of,
            total_pending: Money::ZERO,
            total_penalty: Money::ZERO,
            total_due: Money::ZERO,
            count: 0,
            by_bucket: AgingBucket::ALL
                .iter()
                .map(|b| (*b, BucketTotals::default()))
                .collect(),
            by_status: BTreeMap::new(),
        };

        for r in receivables.into_iter().filter(|r| r.active) {
            summary.total_pending += r.pending_amount;
            summary.total_penalty += r.penalty_amount;
            summary.count += 1;

            let bucket = summary.by_bucket.entry(r.aging_bucket).or_default();
            bucket.count += 1;
            bucket.amount += r.pending_amount;

            *summary.by_status.entry(r.collection_status).or_insert(0) += 1;
        }
        summary.total_due = summary.total_pending + summary.total_penalty;
        summary
    }

    pub fn bucket(&self, bucket: AgingBucket) -> BucketTotals {
        self.by_bucket.get(&bucket).copied().unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::receivables::NewReceivable;
    use uuid::Uuid;

    fn receivable(tenant: TenantId, pending: i64, due: NaiveDate, today: NaiveDate) -> Receivable {
        Receivable::create(
            tenant,
            NewReceivable {
                contract_id: Uuid::new_v4(),
                party_id: Uuid::new_v4(),
                property_id: Uuid::new_v4(),
                concept: format!("cargo {}", due),
                original_amount: Money::from_major(pending),
                pending_amount: Money::from_major(pending),
                due_date: due,
                penalty_rate: Some(Rate::from_percentage(rust_decimal::Decimal::TEN)),
                notes: None,
            },
            today,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_groups_active_receivables() {
        let tenant = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();

        let mut with_penalty = receivable(tenant, 100, d(6, 20), today);
        with_penalty.apply_percentage_penalty(today);
        let old = receivable(tenant, 300, d(1, 31), today);
        let mut gone = receivable(tenant, 999, d(6, 1), today);
        gone.deactivate(today);

        let all = vec![with_penalty, old, gone];
        let summary = AgingSummary::from_receivables(tenant, today, &all);

        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_pending, Money::from_major(400));
        assert_eq!(summary.total_penalty, Money::from_major(10));
        assert_eq!(summary.total_due, Money::from_major(410));
        assert_eq!(summary.bucket(AgingBucket::Overdue1To30).count, 1);
        assert_eq!(summary.bucket(AgingBucket::OverdueOver90).amount, Money::from_major(300));
        assert_eq!(summary.bucket(AgingBucket::Current).count, 0);
        assert_eq!(summary.by_status.get(&CollectionStatus::Pending), Some(&2));
        assert_eq!(summary.by_bucket.len(), 5);

        let json = summary.to_json_pretty().unwrap();
        assert!(json.contains("VENCIDO_MAS_90"));
    }
}
