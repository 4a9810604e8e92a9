use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::{LedgerStore, LedgerTables};
use crate::types::{AllocationId, ChargeId, PaymentId, PaymentStatus, TenantId};

/// one transfer of money from a payment to a charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub charge_id: ChargeId,
    pub amount: Money,
    pub allocated_on: NaiveDate,
}

/// result of an allocation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub payment_id: PaymentId,
    pub allocations: Vec<Allocation>,
    /// applied by this call
    pub allocated: Money,
    /// left free on the payment afterwards
    pub unallocated: Money,
    pub payment_status: PaymentStatus,
}

/// result of cancelling a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub payment_id: PaymentId,
    pub reversed: Vec<Allocation>,
    pub reversed_amount: Money,
}

/// the only component that moves balances between payments and charges
pub struct AllocationEngine<'a> {
    store: &'a LedgerStore,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    /// apply the payment's available balance to the contract's open charges,
    /// oldest due date first. leftover stays unallocated on the payment.
    pub fn allocate_automatic(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        today: NaiveDate,
    ) -> Result<AllocationOutcome> {
        self.store.transaction(|tables| {
            let payment = tables.payment(tenant_id, payment_id)?;
            payment.ensure_allocatable()?;
            let mut remaining = payment.available();
            let contract_id = payment.contract_id;

            let mut candidates: Vec<(ChargeId, NaiveDate, Money)> = tables
                .charges_for_contract(tenant_id, contract_id)
                .filter(|c| c.is_open() && c.pending_amount.is_positive())
                .map(|c| (c.id, c.due_date, c.pending_amount))
                .collect();
            candidates.sort_by_key(|(_, due_date, _)| *due_date);

            let mut allocations = Vec::new();
            for (charge_id, _, pending) in candidates {
                if !remaining.is_positive() {
                    break;
                }
                let to_apply = remaining.min(pending);
                allocations.push(apply_step(
                    tables, tenant_id, payment_id, charge_id, to_apply, today,
                )?);
                remaining -= to_apply;
            }

            outcome(tables, tenant_id, payment_id, allocations)
        })
    }

    /// apply the payment to the given charges in the order given.
    ///
    /// each step commits on its own: when a charge id is unknown the call
    /// fails with `ChargeNotFound`, but allocations made for earlier ids in
    /// the same call stay applied. closed charges are skipped.
    pub fn allocate_explicit(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        charge_ids: &[ChargeId],
        today: NaiveDate,
    ) -> Result<AllocationOutcome> {
        self.store
            .read(|t| t.payment(tenant_id, payment_id).and_then(|p| p.ensure_allocatable()))?;

        let mut allocations = Vec::new();
        for &charge_id in charge_ids {
            let available = self
                .store
                .read(|t| t.payment(tenant_id, payment_id).map(|p| p.available()))?;
            if !available.is_positive() {
                break;
            }

            let step = self.store.transaction(|tables| {
                let available = tables.payment(tenant_id, payment_id)?.available();
                let charge = tables.charge(tenant_id, charge_id)?;
                if !charge.is_open() || !available.is_positive() {
                    return Ok(None);
                }
                let to_apply = available.min(charge.pending_amount);
                apply_step(tables, tenant_id, payment_id, charge_id, to_apply, today).map(Some)
            });

            match step {
                Ok(Some(allocation)) => allocations.push(allocation),
                Ok(None) => debug!(%charge_id, "charge closed, skipped"),
                Err(err) => {
                    warn!(
                        %payment_id,
                        %charge_id,
                        committed = allocations.len(),
                        error = %err,
                        "explicit allocation stopped"
                    );
                    return Err(err);
                }
            }
        }

        self.store
            .read(|t| outcome(t, tenant_id, payment_id, allocations))
    }

    /// apply exactly `amount` from the payment to one charge
    pub fn allocate_manual(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
        charge_id: ChargeId,
        amount: Money,
        today: NaiveDate,
    ) -> Result<AllocationOutcome> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        self.store.transaction(|tables| {
            let payment = tables.payment(tenant_id, payment_id)?;
            payment.ensure_allocatable()?;
            let available = payment.available();
            if amount > available {
                return Err(LedgerError::ExceedsPaymentAvailable {
                    available,
                    requested: amount,
                });
            }

            let charge = tables.charge(tenant_id, charge_id)?;
            if !charge.is_open() {
                return Err(LedgerError::InvalidState {
                    current: format!("{:?}", charge.status),
                    expected: "Pending, Partial or Overdue".to_string(),
                });
            }
            if amount > charge.pending_amount {
                return Err(LedgerError::ExceedsChargePending {
                    pending: charge.pending_amount,
                    requested: amount,
                });
            }

            let allocation = apply_step(tables, tenant_id, payment_id, charge_id, amount, today)?;
            outcome(tables, tenant_id, payment_id, vec![allocation])
        })
    }

    /// undo a single allocation, restoring both sides
    pub fn reverse_allocation(
        &self,
        tenant_id: TenantId,
        allocation_id: AllocationId,
    ) -> Result<Allocation> {
        self.store.transaction(|tables| {
            let allocation = tables
                .allocations(tenant_id)
                .find(|a| a.id == allocation_id)
                .cloned()
                .ok_or(LedgerError::AllocationNotFound { id: allocation_id })?;

            tables
                .charge_mut(tenant_id, allocation.charge_id)?
                .reverse_application(allocation.amount)?;
            tables
                .payment_mut(tenant_id, allocation.payment_id)?
                .release_allocation(allocation.amount)?;
            tables.remove_allocation(tenant_id, allocation.id);

            debug!(
                payment_id = %allocation.payment_id,
                charge_id = %allocation.charge_id,
                amount = %allocation.amount,
                "allocation reversed"
            );
            Ok(allocation)
        })
    }

    /// reverse every allocation of the payment and cancel it for good
    pub fn cancel_payment(
        &self,
        tenant_id: TenantId,
        payment_id: PaymentId,
    ) -> Result<CancellationOutcome> {
        let outcome = self.store.transaction(|tables| {
            if tables.payment(tenant_id, payment_id)?.is_cancelled() {
                return Err(LedgerError::PaymentCancelled { id: payment_id });
            }

            let allocations: Vec<Allocation> = tables
                .allocations_for_payment(tenant_id, payment_id)
                .cloned()
                .collect();
            for allocation in &allocations {
                tables
                    .charge_mut(tenant_id, allocation.charge_id)?
                    .reverse_application(allocation.amount)?;
                tables.remove_allocation(tenant_id, allocation.id);
            }
            tables.payment_mut(tenant_id, payment_id)?.mark_cancelled();

            Ok(CancellationOutcome {
                payment_id,
                reversed_amount: allocations.iter().map(|a| a.amount).sum(),
                reversed: allocations,
            })
        })?;

        info!(
            %tenant_id,
            %payment_id,
            reversed = outcome.reversed.len(),
            amount = %outcome.reversed_amount,
            "payment cancelled"
        );
        Ok(outcome)
    }
}

/// one allocation as a unit: payment counter, charge balance, join record
fn apply_step(
    tables: &mut LedgerTables,
    tenant_id: TenantId,
    payment_id: PaymentId,
    charge_id: ChargeId,
    amount: Money,
    today: NaiveDate,
) -> Result<Allocation> {
    tables
        .payment_mut(tenant_id, payment_id)?
        .record_allocation(amount, today)?;
    tables.charge_mut(tenant_id, charge_id)?.apply_payment(amount)?;

    let allocation = Allocation {
        id: Uuid::new_v4(),
        tenant_id,
        payment_id,
        charge_id,
        amount,
        allocated_on: today,
    };
    tables.insert_allocation(allocation.clone());

    debug!(%payment_id, %charge_id, amount = %amount, "allocation committed");
    Ok(allocation)
}

fn outcome(
    tables: &LedgerTables,
    tenant_id: TenantId,
    payment_id: PaymentId,
    allocations: Vec<Allocation>,
) -> Result<AllocationOutcome> {
    let payment = tables.payment(tenant_id, payment_id)?;
    Ok(AllocationOutcome {
        payment_id,
        allocated: allocations.iter().map(|a| a.amount).sum(),
        unallocated: payment.available(),
        payment_status: payment.status,
        allocations,
    })
}
