use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::charges::Charge;
use crate::contracts::ContractSource;
use crate::errors::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::store::{LedgerStore, LedgerTables};
use crate::types::{ChargeStatus, ReceivableId, TenantId};

use super::Receivable;

/// counts for one tenant scope's run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub tenant_id: TenantId,
    pub as_of: NaiveDate,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deactivated: usize,
}

impl SyncReport {
    fn new(tenant_id: TenantId, as_of: NaiveDate) -> Self {
        Self {
            tenant_id,
            as_of,
            created: 0,
            updated: 0,
            unchanged: 0,
            deactivated: 0,
        }
    }

    /// nothing created, updated or deactivated
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deactivated == 0
    }
}

/// a tenant scope that failed during a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub tenant_id: TenantId,
    pub error: LedgerError,
}

/// result of a run over every tenant scope
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSyncReport {
    pub as_of: NaiveDate,
    pub reports: Vec<SyncReport>,
    pub failures: Vec<SyncFailure>,
}

impl BatchSyncReport {
    pub fn created(&self) -> usize {
        self.reports.iter().map(|r| r.created).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// re-derives the receivables ledger from current charge state
pub struct DelinquencySynchronizer<'a, C: ContractSource> {
    store: &'a LedgerStore,
    contracts: &'a C,
}

impl<'a, C: ContractSource> DelinquencySynchronizer<'a, C> {
    pub fn new(store: &'a LedgerStore, contracts: &'a C) -> Self {
        Self { store, contracts }
    }

    /// reconcile one tenant scope as of `today`.
    ///
    /// the run holds the tenant's sync guard and executes in a single store
    /// transaction, so a failure leaves the receivables untouched. running
    /// it twice without payment activity in between changes nothing.
    pub fn sync_tenant(
        &self,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<(SyncReport, Vec<LedgerEvent>)> {
        let guard = self.store.sync_guard(tenant_id);
        let _running = guard.lock();

        info!(%tenant_id, as_of = %today, "delinquency sync started");
        let result = self
            .store
            .transaction(|tables| self.reconcile(tables, tenant_id, today));

        match result {
            Ok((report, mut events)) => {
                info!(
                    %tenant_id,
                    created = report.created,
                    updated = report.updated,
                    unchanged = report.unchanged,
                    deactivated = report.deactivated,
                    "delinquency sync finished"
                );
                events.push(LedgerEvent::DelinquencySyncCompleted {
                    tenant_id,
                    created: report.created,
                    updated: report.updated,
                    unchanged: report.unchanged,
                    deactivated: report.deactivated,
                    as_of: today,
                });
                Ok((report, events))
            }
            Err(err) => Err(match err {
                LedgerError::SyncFailed { .. } => err,
                other => LedgerError::SyncFailed {
                    tenant_id,
                    message: other.to_string(),
                },
            }),
        }
    }

    /// reconcile every known tenant scope; a failing scope is logged and
    /// recorded without stopping the others
    pub fn sync_all(&self, today: NaiveDate) -> (BatchSyncReport, Vec<LedgerEvent>) {
        let mut tenants = self.store.read(|t| t.tenant_ids());
        tenants.extend(self.contracts.tenant_scopes());

        let mut batch = BatchSyncReport {
            as_of: today,
            reports: Vec::new(),
            failures: Vec::new(),
        };
        let mut events = Vec::new();

        for tenant_id in tenants {
            match self.sync_tenant(tenant_id, today) {
                Ok((report, tenant_events)) => {
                    batch.reports.push(report);
                    events.extend(tenant_events);
                }
                Err(err) => {
                    error!(%tenant_id, error = %err, "delinquency sync failed");
                    events.push(LedgerEvent::DelinquencySyncFailed {
                        tenant_id,
                        reason: err.to_string(),
                        as_of: today,
                    });
                    batch.failures.push(SyncFailure {
                        tenant_id,
                        error: err,
                    });
                }
            }
        }
        (batch, events)
    }

    fn reconcile(
        &self,
        tables: &mut LedgerTables,
        tenant_id: TenantId,
        today: NaiveDate,
    ) -> Result<(SyncReport, Vec<LedgerEvent>)> {
        let mut report = SyncReport::new(tenant_id, today);
        let mut events = Vec::new();

        // overdue candidates: open and due strictly before today
        let candidates: Vec<Charge> = tables
            .charges(tenant_id)
            .filter(|c| c.is_past_due(today))
            .cloned()
            .collect();

        for charge in &candidates {
            let existing = tables
                .receivable_by_key(
                    tenant_id,
                    charge.contract_id,
                    &charge.concept,
                    charge.due_date,
                )
                .map(|r| r.id);

            match existing {
                Some(id) => {
                    let receivable = tables.receivable_mut(tenant_id, id)?;
                    if receivable.sync_from_charge(charge, today) {
                        report.updated += 1;
                        events.push(LedgerEvent::ReceivableUpdated {
                            tenant_id,
                            receivable_id: id,
                            pending_amount: receivable.pending_amount,
                            collection_status: receivable.collection_status,
                        });
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    let terms = self
                        .contracts
                        .contract(tenant_id, charge.contract_id)
                        .ok_or(LedgerError::ContractNotFound {
                            id: charge.contract_id,
                        })?;
                    let receivable = Receivable::from_charge(charge, &terms, today);
                    events.push(LedgerEvent::ReceivableOpened {
                        tenant_id,
                        receivable_id: receivable.id,
                        contract_id: receivable.contract_id,
                        pending_amount: receivable.pending_amount,
                        due_date: receivable.due_date,
                    });
                    tables.insert_receivable(receivable)?;
                    report.created += 1;
                }
            }
        }

        // retire active receivables whose charge has since been paid or cancelled
        let active: Vec<ReceivableId> = tables
            .receivables(tenant_id)
            .filter(|r| r.active)
            .map(|r| r.id)
            .collect();

        for id in active {
            let receivable = tables.receivable(tenant_id, id)?;
            let linked = receivable.charge_id.is_some();
            let source = tables
                .charge_by_key(
                    tenant_id,
                    receivable.contract_id,
                    &receivable.concept,
                    receivable.due_date,
                )
                .map(|c| c.status);

            match source {
                Some(ChargeStatus::Paid) => {
                    tables.receivable_mut(tenant_id, id)?.settle(today);
                    report.deactivated += 1;
                    events.push(LedgerEvent::ReceivableSettled {
                        tenant_id,
                        receivable_id: id,
                    });
                }
                // no live charge left behind a synchronized receivable
                None if linked => {
                    tables.receivable_mut(tenant_id, id)?.write_off(today);
                    report.deactivated += 1;
                    events.push(LedgerEvent::ReceivableWrittenOff {
                        tenant_id,
                        receivable_id: id,
                    });
                }
                _ => {}
            }
        }

        Ok((report, events))
    }
}
