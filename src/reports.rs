//! read-only views for statements and dashboards
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::charges::Charge;
use crate::decimal::Money;
use crate::payments::{Allocation, Payment};
use crate::store::LedgerTables;
use crate::types::{ChargeStatus, ContractId, PaymentStatus, TenantId};

/// sum of pending amounts over the contract's non-cancelled charges
pub fn balance_pending_for_contract(
    tables: &LedgerTables,
    tenant_id: TenantId,
    contract_id: ContractId,
) -> Money {
    tables
        .charges_for_contract(tenant_id, contract_id)
        .filter(|c| c.status != ChargeStatus::Cancelled)
        .map(|c| c.pending_amount)
        .sum()
}

/// dashboard figures for a tenant scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatistics {
    pub tenant_id: TenantId,
    pub as_of: NaiveDate,
    /// applied payments dated in the current month
    pub collected_this_month: Money,
    pub payments_this_month: usize,
    /// pending over open charges
    pub total_pending: Money,
    pub open_charges: usize,
    pub overdue_charges: usize,
}

impl PaymentStatistics {
    pub fn compute(tables: &LedgerTables, tenant_id: TenantId, today: NaiveDate) -> Self {
        let this_month = |d: NaiveDate| d.year() == today.year() && d.month() == today.month();

        let mut collected_this_month = Money::ZERO;
        let mut payments_this_month = 0;
        for payment in tables.payments(tenant_id).filter(|p| this_month(p.payment_date)) {
            payments_this_month += 1;
            if payment.status == PaymentStatus::Applied {
                collected_this_month += payment.amount;
            }
        }

        let open: Vec<&Charge> = tables.charges(tenant_id).filter(|c| c.is_open()).collect();

        Self {
            tenant_id,
            as_of: today,
            collected_this_month,
            payments_this_month,
            total_pending: open.iter().map(|c| c.pending_amount).sum(),
            open_charges: open.len(),
            overdue_charges: open
                .iter()
                .filter(|c| c.status == ChargeStatus::Overdue)
                .count(),
        }
    }
}

/// everything billed, received and applied on one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractStatement {
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub as_of: NaiveDate,
    pub charges: Vec<Charge>,
    pub payments: Vec<Payment>,
    pub allocations: Vec<Allocation>,
    pub total_billed: Money,
    pub total_received: Money,
    pub balance_pending: Money,
}

impl ContractStatement {
    pub fn build(
        tables: &LedgerTables,
        tenant_id: TenantId,
        contract_id: ContractId,
        today: NaiveDate,
    ) -> Self {
        let mut charges: Vec<Charge> = tables
            .charges_for_contract(tenant_id, contract_id)
            .cloned()
            .collect();
        charges.sort_by_key(|c| c.due_date);

        let mut payments: Vec<Payment> = tables
            .payments(tenant_id)
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_date);

        let allocations: Vec<Allocation> = payments
            .iter()
            .flat_map(|p| tables.allocations_for_payment(tenant_id, p.id).cloned())
            .collect();

        Self {
            tenant_id,
            contract_id,
            as_of: today,
            total_billed: charges
                .iter()
                .filter(|c| c.status != ChargeStatus::Cancelled)
                .map(|c| c.original_amount)
                .sum(),
            total_received: payments
                .iter()
                .filter(|p| !p.is_cancelled())
                .map(|p| p.amount)
                .sum(),
            balance_pending: balance_pending_for_contract(tables, tenant_id, contract_id),
            charges,
            payments,
            allocations,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charges::NewCharge;
    use crate::payments::{AllocationEngine, NewPayment};
    use crate::store::LedgerStore;
    use crate::types::{ChargeKind, PaymentMethod};
    use uuid::Uuid;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn seed(store: &LedgerStore, tenant: TenantId, contract: ContractId) {
        store
            .transaction(|t| {
                for (month, amount) in [(1, 500), (2, 500), (3, 200)] {
                    t.insert_charge(Charge::create(
                        tenant,
                        NewCharge::new(
                            contract,
                            ChargeKind::Rent,
                            format!("cargo {}", month),
                            Money::from_major(amount),
                            date(month, 1),
                            date(month, 5),
                        ),
                    )?)?;
                }
                let request = NewPayment::new(
                    contract,
                    Uuid::new_v4(),
                    Money::from_major(600),
                    PaymentMethod::Cash,
                    date(3, 10),
                );
                t.insert_payment(Payment::create(tenant, &request, "REC-000001".to_string())?)?;
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_balance_ignores_cancelled_charges() {
        let store = LedgerStore::new();
        let tenant = Uuid::new_v4();
        let contract = Uuid::new_v4();
        seed(&store, tenant, contract);

        assert_eq!(
            store.read(|t| balance_pending_for_contract(t, tenant, contract)),
            Money::from_major(1200)
        );

        store
            .transaction(|t| {
                let id = t
                    .charges_for_contract(tenant, contract)
                    .find(|c| c.original_amount == Money::from_major(200))
                    .map(|c| c.id)
                    .unwrap();
                t.charge_mut(tenant, id)?.cancel()
            })
            .unwrap();
        assert_eq!(
            store.read(|t| balance_pending_for_contract(t, tenant, contract)),
            Money::from_major(1000)
        );
    }

    #[test]
    fn test_statistics_and_statement() {
        let store = LedgerStore::new();
        let tenant = Uuid::new_v4();
        let contract = Uuid::new_v4();
        seed(&store, tenant, contract);

        let payment = store.read(|t| t.payments(tenant).next().map(|p| p.id)).unwrap();
        AllocationEngine::new(&store)
            .allocate_automatic(tenant, payment, date(3, 10))
            .unwrap();
        store
            .transaction(|t| {
                for charge in t.charges_mut(tenant) {
                    charge.mark_overdue(date(3, 20));
                }
                Ok(())
            })
            .unwrap();

        let stats = store.read(|t| PaymentStatistics::compute(t, tenant, date(3, 20)));
        assert_eq!(stats.payments_this_month, 1);
        assert_eq!(stats.collected_this_month, Money::from_major(600));
        assert_eq!(stats.open_charges, 2);
        assert_eq!(stats.overdue_charges, 2);
        assert_eq!(stats.total_pending, Money::from_major(600));

        let statement = store.read(|t| ContractStatement::build(t, tenant, contract, date(3, 20)));
        assert_eq!(statement.charges.len(), 3);
        assert_eq!(statement.allocations.len(), 2);
        assert_eq!(statement.total_billed, Money::from_major(1200));
        assert_eq!(statement.total_received, Money::from_major(600));
        assert_eq!(statement.balance_pending, Money::from_major(600));
        assert!(statement.to_json_pretty().unwrap().contains("REC-000001"));
    }
}
