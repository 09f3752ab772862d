// Mock API service
//
// Stands in for the backend: every call sleeps for a simulated network
// delay, then reads or mutates the in-memory MockDb. Ids are assigned
// `max + 1` (or 1), community numbers likewise among siblings.
//
// `update_*` / `delete_*` on a missing id fail with `"<Entity> not found"`.

mod db;

pub use db::MockDb;

use crate::config::{ApiConfig, Latency};
use crate::entities::community::next_number;
use crate::entities::*;
use crate::error::{ApiError, ApiResult};
use db::{remove_from, update_in};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

/// Result of adding a contribution: the record plus the owner's new total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionAdded {
    pub contribution: Contribution,
    pub owner_total: String,
}

/// Result of deleting a contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRemoved {
    pub id: u64,
    pub owner: ContributionOwner,

    /// None when the owner no longer exists
    pub owner_total: Option<String>,
}

pub struct MockApi {
    db: RwLock<MockDb>,
    latency: Latency,
    injected_failure: Mutex<Option<String>>,
}

impl MockApi {
    pub fn new(db: MockDb, latency: Latency) -> Self {
        MockApi {
            db: RwLock::new(db),
            latency,
            injected_failure: Mutex::new(None),
        }
    }

    /// Empty collections, no latency
    pub fn empty() -> Self {
        Self::new(MockDb::default(), Latency::none())
    }

    /// Demo collections with the given latency
    pub fn seeded(latency: Latency) -> Self {
        Self::new(MockDb::seeded(), latency)
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        let db = if config.seed { MockDb::seeded() } else { MockDb::default() };
        Self::new(db, config.latency())
    }

    /// Make the next call fail with a generic error
    pub fn fail_next(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.injected_failure.lock() {
            *slot = Some(message.into());
        }
    }

    /// Copy of the current collections
    pub async fn snapshot(&self) -> MockDb {
        self.db.read().await.clone()
    }

    /// Simulated round trip: delay, then any injected failure
    async fn network(&self, op: &'static str) -> ApiResult<()> {
        let delay = self.latency.sample();
        debug!(op, delay_ms = delay.as_millis() as u64, "mock api call");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let injected = self.injected_failure.lock().ok().and_then(|mut slot| slot.take());
        match injected {
            Some(message) => {
                debug!(op, %message, "mock api call failed");
                Err(ApiError::Failure(message))
            }
            None => Ok(()),
        }
    }

    // ========================================================================
    // FORANES
    // ========================================================================

    pub async fn fetch_foranes(&self) -> ApiResult<Vec<Forane>> {
        self.network("fetch_foranes").await?;
        Ok(self.db.read().await.foranes.clone())
    }

    pub async fn add_forane(&self, req: NewForane) -> ApiResult<Forane> {
        req.validate()?;
        self.network("add_forane").await?;
        let mut db = self.db.write().await;
        let forane = Forane::new(next_id(&db.foranes), req);
        db.foranes.push(forane.clone());
        Ok(forane)
    }

    pub async fn update_forane(&self, id: u64, patch: ForanePatch) -> ApiResult<Forane> {
        patch.validate()?;
        self.network("update_forane").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.foranes, id, |f| patch.apply(f))
    }

    pub async fn delete_forane(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_forane").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.foranes, id).map(|f| f.id)
    }

    // ========================================================================
    // PARISHES
    // ========================================================================

    /// All parishes, or only those under `forane_id`
    pub async fn fetch_parishes(&self, forane_id: Option<u64>) -> ApiResult<Vec<Parish>> {
        self.network("fetch_parishes").await?;
        let db = self.db.read().await;
        Ok(db
            .parishes
            .iter()
            .filter(|p| forane_id.is_none() || p.forane_id == forane_id)
            .cloned()
            .collect())
    }

    pub async fn add_parish(&self, req: NewParish) -> ApiResult<Parish> {
        req.validate()?;
        self.network("add_parish").await?;
        let mut db = self.db.write().await;
        let parish = Parish::new(next_id(&db.parishes), req);
        db.parishes.push(parish.clone());
        Ok(parish)
    }

    pub async fn update_parish(&self, id: u64, patch: ParishPatch) -> ApiResult<Parish> {
        patch.validate()?;
        self.network("update_parish").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.parishes, id, |p| patch.apply(p))
    }

    /// Communities under the parish are left in place
    pub async fn delete_parish(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_parish").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.parishes, id).map(|p| p.id)
    }

    // ========================================================================
    // COMMUNITIES
    // ========================================================================

    pub async fn fetch_communities(&self, parent: ParentRef) -> ApiResult<Vec<Community>> {
        self.network("fetch_communities").await?;
        let db = self.db.read().await;
        Ok(db
            .communities
            .iter()
            .filter(|c| c.parent == parent)
            .cloned()
            .collect())
    }

    pub async fn add_community(&self, req: NewCommunity) -> ApiResult<Community> {
        req.validate()?;
        self.network("add_community").await?;
        let mut db = self.db.write().await;
        let number = match req.number {
            Some(number) => number,
            None => next_number(db.communities.iter().filter(|c| c.parent == req.parent))?,
        };
        let community = Community {
            id: next_id(&db.communities),
            number,
            name: req.name,
            parent: req.parent,
        };
        db.communities.push(community.clone());
        Ok(community)
    }

    pub async fn update_community(&self, id: u64, patch: CommunityPatch) -> ApiResult<Community> {
        patch.validate()?;
        self.network("update_community").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.communities, id, |c| patch.apply(c))
    }

    pub async fn delete_community(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_community").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.communities, id).map(|c| c.id)
    }

    // ========================================================================
    // FAMILIES
    // ========================================================================

    pub async fn fetch_families(&self, community_id: u64) -> ApiResult<Vec<Family>> {
        self.network("fetch_families").await?;
        let db = self.db.read().await;
        Ok(db
            .families
            .iter()
            .filter(|f| f.community_id == community_id)
            .cloned()
            .collect())
    }

    pub async fn add_family(&self, req: NewFamily) -> ApiResult<Family> {
        req.validate()?;
        self.network("add_family").await?;
        let mut db = self.db.write().await;
        let family = Family::new(next_id(&db.families), req);
        db.families.push(family.clone());
        Ok(family)
    }

    pub async fn update_family(&self, id: u64, patch: FamilyPatch) -> ApiResult<Family> {
        patch.validate()?;
        self.network("update_family").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.families, id, |f| patch.apply(f))
    }

    pub async fn delete_family(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_family").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.families, id).map(|f| f.id)
    }

    // ========================================================================
    // INDIVIDUALS
    // ========================================================================

    pub async fn fetch_individuals(&self) -> ApiResult<Vec<Individual>> {
        self.network("fetch_individuals").await?;
        Ok(self.db.read().await.individuals.clone())
    }

    pub async fn add_individual(&self, req: NewIndividual) -> ApiResult<Individual> {
        req.validate()?;
        self.network("add_individual").await?;
        let mut db = self.db.write().await;
        let individual = Individual::new(next_id(&db.individuals), req);
        db.individuals.push(individual.clone());
        Ok(individual)
    }

    pub async fn update_individual(&self, id: u64, patch: IndividualPatch) -> ApiResult<Individual> {
        patch.validate()?;
        self.network("update_individual").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.individuals, id, |i| patch.apply(i))
    }

    pub async fn delete_individual(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_individual").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.individuals, id).map(|i| i.id)
    }

    // ========================================================================
    // INSTITUTIONS
    // ========================================================================

    pub async fn fetch_institutions(&self) -> ApiResult<Vec<Institution>> {
        self.network("fetch_institutions").await?;
        Ok(self.db.read().await.institutions.clone())
    }

    pub async fn add_institution(&self, req: NewInstitution) -> ApiResult<Institution> {
        req.validate()?;
        self.network("add_institution").await?;
        let mut db = self.db.write().await;
        let institution = Institution::new(next_id(&db.institutions), req);
        db.institutions.push(institution.clone());
        Ok(institution)
    }

    pub async fn update_institution(&self, id: u64, patch: InstitutionPatch) -> ApiResult<Institution> {
        patch.validate()?;
        self.network("update_institution").await?;
        let mut db = self.db.write().await;
        update_in(&mut db.institutions, id, |i| patch.apply(i))
    }

    pub async fn delete_institution(&self, id: u64) -> ApiResult<u64> {
        self.network("delete_institution").await?;
        let mut db = self.db.write().await;
        remove_from(&mut db.institutions, id).map(|i| i.id)
    }

    // ========================================================================
    // CONTRIBUTIONS
    // ========================================================================

    pub async fn fetch_contributions(&self, owner: ContributionOwner) -> ApiResult<Vec<Contribution>> {
        self.network("fetch_contributions").await?;
        let db = self.db.read().await;
        Ok(db
            .contributions
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect())
    }

    /// Look up one contribution by id (receipts)
    pub async fn get_contribution(&self, id: u64) -> ApiResult<Contribution> {
        self.network("get_contribution").await?;
        let db = self.db.read().await;
        db.contributions
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(Contribution::ENTITY, id))
    }

    /// Display name of a contribution owner (receipts)
    pub async fn contributor_name(&self, owner: ContributionOwner) -> ApiResult<String> {
        let db = self.db.read().await;
        let id = owner.id();
        let name = match owner {
            ContributionOwner::Family(_) => db
                .families
                .iter()
                .find(|f| f.id == id)
                .map(|f| format!("{} ({})", f.family_name, f.head_name)),
            ContributionOwner::Individual(_) => db.individuals.iter().find(|i| i.id == id).map(|i| i.name.clone()),
            ContributionOwner::Institution(_) => db.institutions.iter().find(|i| i.id == id).map(|i| i.name.clone()),
        };
        name.ok_or_else(|| owner_not_found(owner))
    }

    /// Record a contribution and add its amount to the owner's total
    pub async fn add_contribution(&self, req: NewContribution) -> ApiResult<ContributionAdded> {
        req.validate()?;
        self.network("add_contribution").await?;
        let mut db = self.db.write().await;

        if !db.owner_exists(req.owner) {
            return Err(owner_not_found(req.owner));
        }

        let amount = req.amount;
        let contribution = Contribution::new(next_id(&db.contributions), req);
        let owner_total = db.adjust_owner_total(contribution.owner, amount)?;
        db.contributions.push(contribution.clone());

        Ok(ContributionAdded { contribution, owner_total })
    }

    /// Remove a contribution and subtract it from the owner's total
    pub async fn delete_contribution(&self, id: u64) -> ApiResult<ContributionRemoved> {
        self.network("delete_contribution").await?;
        let mut db = self.db.write().await;

        let removed = remove_from(&mut db.contributions, id)?;
        // The owner may have been deleted since
        let owner_total = db.adjust_owner_total(removed.owner, -removed.amount).ok();

        Ok(ContributionRemoved {
            id: removed.id,
            owner: removed.owner,
            owner_total,
        })
    }
}

fn owner_not_found(owner: ContributionOwner) -> ApiError {
    let entity = match owner {
        ContributionOwner::Family(_) => Family::ENTITY,
        ContributionOwner::Individual(_) => Individual::ENTITY,
        ContributionOwner::Institution(_) => Institution::ENTITY,
    };
    ApiError::not_found(entity, owner.id())
}
