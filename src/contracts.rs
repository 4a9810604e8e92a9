use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::decimal::Money;
use crate::types::{ContractId, PartyId, PropertyId, TenantId};

/// billing terms of a lease contract, as read from the contract catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub lessee_id: PartyId,
    pub property_id: PropertyId,
    /// monthly rent
    pub rent_amount: Money,
    /// day of month rent falls due; None uses the configured default
    pub due_day: Option<u32>,
    pub grace_period_days: u32,
    /// flat amount accrued per overdue day once grace has elapsed
    pub daily_penalty: Option<Money>,
    pub active: bool,
}

impl ContractTerms {
    pub fn new(
        tenant_id: TenantId,
        contract_id: ContractId,
        lessee_id: PartyId,
        property_id: PropertyId,
        rent_amount: Money,
    ) -> Self {
        Self {
            tenant_id,
            contract_id,
            lessee_id,
            property_id,
            rent_amount,
            due_day: None,
            grace_period_days: 0,
            daily_penalty: None,
            active: true,
        }
    }

    pub fn with_due_day(mut self, day: u32) -> Self {
        self.due_day = Some(day);
        self
    }

    pub fn with_grace_period(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    pub fn with_daily_penalty(mut self, amount: Money) -> Self {
        self.daily_penalty = Some(amount);
        self
    }
}

/// read access to the contract catalog
pub trait ContractSource: Send + Sync {
    /// contract terms within a tenant scope
    fn contract(&self, tenant_id: TenantId, contract_id: ContractId) -> Option<ContractTerms>;

    /// all active contracts of a tenant scope
    fn active_contracts(&self, tenant_id: TenantId) -> Vec<ContractTerms>;

    /// every tenant scope the catalog knows about
    fn tenant_scopes(&self) -> Vec<TenantId>;
}

/// contract catalog held in memory
#[derive(Debug, Default)]
pub struct InMemoryContracts {
    contracts: RwLock<BTreeMap<(TenantId, ContractId), ContractTerms>>,
}

impl InMemoryContracts {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert or replace a contract
    pub fn upsert(&self, terms: ContractTerms) {
        self.contracts
            .write()
            .insert((terms.tenant_id, terms.contract_id), terms);
    }

    pub fn remove(&self, tenant_id: TenantId, contract_id: ContractId) -> Option<ContractTerms> {
        self.contracts.write().remove(&(tenant_id, contract_id))
    }
}

impl ContractSource for InMemoryContracts {
    fn contract(&self, tenant_id: TenantId, contract_id: ContractId) -> Option<ContractTerms> {
        self.contracts.read().get(&(tenant_id, contract_id)).cloned()
    }

    fn active_contracts(&self, tenant_id: TenantId) -> Vec<ContractTerms> {
        self.contracts
            .read()
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.active)
            .cloned()
            .collect()
    }

    fn tenant_scopes(&self) -> Vec<TenantId> {
        let scopes: BTreeSet<TenantId> = self.contracts.read().keys().map(|(t, _)| *t).collect();
        scopes.into_iter().collect()
    }
}
