use tracing::{debug, warn};

use crate::config::ChargeConfig;
use crate::contracts::{ContractSource, ContractTerms};
use crate::errors::{LedgerError, Result};
use crate::store::{LedgerStore, LedgerTables};
use crate::types::{BillingPeriod, ChargeKind, ContractId, TenantId};

use super::{Charge, NewCharge};

/// periodic rent charge generation from contract terms
pub struct FixedChargeGenerator<'a, C: ContractSource> {
    store: &'a LedgerStore,
    contracts: &'a C,
    config: &'a ChargeConfig,
}

impl<'a, C: ContractSource> FixedChargeGenerator<'a, C> {
    pub fn new(store: &'a LedgerStore, contracts: &'a C, config: &'a ChargeConfig) -> Self {
        Self {
            store,
            contracts,
            config,
        }
    }

    /// create the period's rent charge for one contract, or for every active
    /// contract of the tenant scope. contracts that already have a rent
    /// charge for the period are skipped, so repeated runs create nothing.
    pub fn generate(
        &self,
        tenant_id: TenantId,
        period: BillingPeriod,
        contract_id: Option<ContractId>,
    ) -> Result<Vec<Charge>> {
        let period = BillingPeriod::new(period.year, period.month)?;

        let contracts = match contract_id {
            Some(id) => vec![self
                .contracts
                .contract(tenant_id, id)
                .ok_or(LedgerError::ContractNotFound { id })?],
            None => self.contracts.active_contracts(tenant_id),
        };

        self.store.transaction(|tables| {
            let mut created = Vec::new();
            for terms in &contracts {
                if let Some(charge) = self.generate_for(tables, tenant_id, period, terms)? {
                    created.push(charge);
                }
            }
            Ok(created)
        })
    }

    fn generate_for(
        &self,
        tables: &mut LedgerTables,
        tenant_id: TenantId,
        period: BillingPeriod,
        terms: &ContractTerms,
    ) -> Result<Option<Charge>> {
        if !terms.rent_amount.is_positive() {
            warn!(
                contract_id = %terms.contract_id,
                rent = %terms.rent_amount,
                "contract without rent amount, skipped"
            );
            return Ok(None);
        }

        let exists = tables
            .charges_for_contract(tenant_id, terms.contract_id)
            .any(|c| c.kind == ChargeKind::Rent && c.period == Some(period));
        if exists {
            debug!(contract_id = %terms.contract_id, "rent already generated for period");
            return Ok(None);
        }

        let due_day = terms.due_day.unwrap_or(self.config.default_due_day);
        let concept = format!(
            "{} {} {}",
            self.config.rent_concept_prefix,
            period.month_name(),
            period.year
        );
        let due_date = period.day_clamped(due_day);
        if tables
            .charge_by_key(tenant_id, terms.contract_id, &concept, due_date)
            .is_some()
        {
            warn!(
                contract_id = %terms.contract_id,
                %concept,
                %due_date,
                "charge with the same concept and due date exists, skipped"
            );
            return Ok(None);
        }

        let mut request = NewCharge::new(
            terms.contract_id,
            ChargeKind::Rent,
            concept,
            terms.rent_amount,
            period.first_day(),
            due_date,
        );
        request.is_fixed = true;
        request.period = Some(period);

        let charge = Charge::create(tenant_id, request)?;
        tables.insert_charge(charge.clone())?;
        Ok(Some(charge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::InMemoryContracts;
    use crate::decimal::Money;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn setup() -> (LedgerStore, InMemoryContracts, TenantId) {
        (LedgerStore::new(), InMemoryContracts::new(), Uuid::new_v4())
    }

    fn terms(tenant: TenantId, rent: i64) -> ContractTerms {
        ContractTerms::new(
            tenant,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(rent),
        )
    }

    #[test]
    fn test_generates_rent_for_active_contracts() {
        let (store, contracts, tenant) = setup();
        let config = ChargeConfig::default();
        let contract = terms(tenant, 1200).with_due_day(31);
        let contract_id = contract.contract_id;
        contracts.upsert(contract);

        let generator = FixedChargeGenerator::new(&store, &contracts, &config);
        let created = generator
            .generate(tenant, BillingPeriod::new(2025, 2).unwrap(), None)
            .unwrap();

        assert_eq!(created.len(), 1);
        let charge = &created[0];
        assert_eq!(charge.contract_id, contract_id);
        assert_eq!(charge.concept, "Renta FEBRUARY 2025");
        assert_eq!(charge.issue_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(charge.due_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(charge.original_amount, Money::from_major(1200));
        assert!(charge.is_fixed);
    }

    #[test]
    fn test_generation_is_idempotent_per_period() {
        let (store, contracts, tenant) = setup();
        let config = ChargeConfig::default();
        contracts.upsert(terms(tenant, 900));
        let generator = FixedChargeGenerator::new(&store, &contracts, &config);
        let march = BillingPeriod::new(2025, 3).unwrap();

        assert_eq!(generator.generate(tenant, march, None).unwrap().len(), 1);
        assert!(generator.generate(tenant, march, None).unwrap().is_empty());

        let april = BillingPeriod::new(2025, 4).unwrap();
        assert_eq!(generator.generate(tenant, april, None).unwrap().len(), 1);
        assert_eq!(store.read(|t| t.charges(tenant).count()), 2);
    }

    #[test]
    fn test_default_due_day_and_skips() {
        let (store, contracts, tenant) = setup();
        let config = ChargeConfig {
            default_due_day: 10,
            ..ChargeConfig::default()
        };
        let free = terms(tenant, 0);
        let mut inactive = terms(tenant, 500);
        inactive.active = false;
        let regular = terms(tenant, 700);
        contracts.upsert(free);
        contracts.upsert(inactive);
        contracts.upsert(regular);

        let generator = FixedChargeGenerator::new(&store, &contracts, &config);
        let created = generator
            .generate(tenant, BillingPeriod::new(2025, 5).unwrap(), None)
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].due_date, NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
    }

    #[test]
    fn test_skips_contract_whose_key_is_taken_by_a_manual_charge() {
        let (store, contracts, tenant) = setup();
        let config = ChargeConfig::default();
        let contract = terms(tenant, 800);
        let contract_id = contract.contract_id;
        contracts.upsert(contract);
        contracts.upsert(terms(tenant, 650));

        let june_first = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let manual = Charge::create(
            tenant,
            NewCharge::new(
                contract_id,
                ChargeKind::Rent,
                "Renta JUNE 2025",
                Money::from_major(800),
                june_first,
                june_first,
            ),
        )
        .unwrap();
        store.transaction(|t| t.insert_charge(manual)).unwrap();

        let generator = FixedChargeGenerator::new(&store, &contracts, &config);
        let created = generator
            .generate(tenant, BillingPeriod::new(2025, 6).unwrap(), None)
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_ne!(created[0].contract_id, contract_id);
        assert_eq!(store.read(|t| t.charges(tenant).count()), 2);
    }

    #[test]
    fn test_unknown_contract_and_bad_period() {
        let (store, contracts, tenant) = setup();
        let config = ChargeConfig::default();
        let generator = FixedChargeGenerator::new(&store, &contracts, &config);

        let err = generator
            .generate(tenant, BillingPeriod::new(2025, 1).unwrap(), Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ContractNotFound { .. }));

        let bad = BillingPeriod { year: 2025, month: 13 };
        assert!(matches!(
            generator.generate(tenant, bad, None),
            Err(LedgerError::InvalidPeriod { .. })
        ));
    }
}
