// Store: cache slices plus the async actions that fill them
//
// Each dispatch method runs one thunk against the MockApi, then reduces
// the outcome into the matching slice:
//
// - fetch: loading → items (stale results discarded) or error message
// - add: push the server-returned record (no optimistic insert)
// - update: replace in place by id (moved between keys if its parent changed)
// - delete: filter out by id
//
// Fetch failures land in the cache entry's `error`; mutation failures are
// returned to the caller and recorded in Store::status. Successful
// mutations are announced on the EventBus.

pub mod slice;

pub use slice::{CacheEntry, CachePhase, FetchTicket, KeyedSlice, ListSlice};

use crate::api::{ContributionAdded, ContributionRemoved, MockApi};
use crate::entities::*;
use crate::error::ApiResult;
use crate::events::{Change, ChangeEvent, EventBus, Topic};
use crate::thunk::{run_thunk, ActionStatus, ThunkResult};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Everything the store caches
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub foranes: ListSlice<Forane>,
    pub parishes: ListSlice<Parish>,
    pub individuals: ListSlice<Individual>,
    pub institutions: ListSlice<Institution>,

    /// Keyed by (parent kind, parent id)
    pub communities: KeyedSlice<ParentRef, Community>,

    /// Keyed by community id
    pub families: KeyedSlice<u64, Family>,

    /// Keyed by owning family / individual / institution
    pub contributions: KeyedSlice<ContributionOwner, Contribution>,
}

impl LedgerState {
    /// Copy an owner's new total into whichever slice caches the owner
    fn apply_owner_total(&mut self, owner: ContributionOwner, total: &str) {
        let id = owner.id();
        let applied = match owner {
            ContributionOwner::Family(_) => match self.families.find_key(id) {
                Some(key) => self.families.entry_mut(key).modify(id, |f| f.set_total(total.to_string())),
                None => false,
            },
            ContributionOwner::Individual(_) => {
                self.individuals.modify(id, |i| i.set_total(total.to_string()))
            }
            ContributionOwner::Institution(_) => {
                self.institutions.modify(id, |i| i.set_total(total.to_string()))
            }
        };
        if !applied {
            debug!(%owner, "owner not cached, total not refreshed");
        }
    }
}

type Lens<T> = fn(&mut LedgerState) -> &mut ListSlice<T>;
type KeyedLens<K, T> = fn(&mut LedgerState) -> &mut KeyedSlice<K, T>;

mod lens {
    use super::*;

    pub fn foranes(s: &mut LedgerState) -> &mut ListSlice<Forane> { &mut s.foranes }
    pub fn parishes(s: &mut LedgerState) -> &mut ListSlice<Parish> { &mut s.parishes }
    pub fn individuals(s: &mut LedgerState) -> &mut ListSlice<Individual> { &mut s.individuals }
    pub fn institutions(s: &mut LedgerState) -> &mut ListSlice<Institution> { &mut s.institutions }
    pub fn communities(s: &mut LedgerState) -> &mut KeyedSlice<ParentRef, Community> { &mut s.communities }
    pub fn families(s: &mut LedgerState) -> &mut KeyedSlice<u64, Family> { &mut s.families }

    pub fn community_key(c: &Community) -> ParentRef { c.parent }
    pub fn family_key(f: &Family) -> u64 { f.community_id }
}

fn owner_topic(owner: ContributionOwner) -> Topic {
    match owner {
        ContributionOwner::Family(_) => Topic::Family,
        ContributionOwner::Individual(_) => Topic::Individual,
        ContributionOwner::Institution(_) => Topic::Institution,
    }
}

pub struct Store {
    api: Arc<MockApi>,
    events: EventBus,
    state: Mutex<LedgerState>,
    statuses: Mutex<HashMap<&'static str, ActionStatus>>,
}

impl Store {
    pub fn new(api: Arc<MockApi>) -> Self {
        Self::with_events(api, EventBus::new())
    }

    pub fn with_events(api: Arc<MockApi>, events: EventBus) -> Self {
        Store {
            api,
            events,
            state: Mutex::new(LedgerState::default()),
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &Arc<MockApi> {
        &self.api
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // SELECTORS
    // ========================================================================

    fn lock_state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a selector against the current state
    pub fn select<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.lock_state())
    }

    pub fn snapshot(&self) -> LedgerState {
        self.select(|s| s.clone())
    }

    pub fn communities_of(&self, parent: ParentRef) -> Option<CacheEntry<Community>> {
        self.select(|s| s.communities.entry(&parent).cloned())
    }

    pub fn families_of(&self, community_id: u64) -> Option<CacheEntry<Family>> {
        self.select(|s| s.families.entry(&community_id).cloned())
    }

    pub fn contributions_of(&self, owner: ContributionOwner) -> Option<CacheEntry<Contribution>> {
        self.select(|s| s.contributions.entry(&owner).cloned())
    }

    /// Lifecycle of the last dispatch of `action`, e.g. "families/add"
    pub fn status(&self, action: &str) -> Option<ActionStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(action)
            .cloned()
    }

    // ========================================================================
    // PLUMBING
    // ========================================================================

    fn reduce<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        f(&mut self.lock_state())
    }

    fn mark(&self, action: &'static str, status: ActionStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(action, status);
    }

    fn settle<T>(&self, action: &'static str, result: &ThunkResult<T>) {
        let status = match result {
            Ok(_) => ActionStatus::Fulfilled,
            Err(rejection) => ActionStatus::Rejected(rejection.message.clone()),
        };
        self.mark(action, status);
    }

    async fn dispatch<T, F>(&self, action: &'static str, call: F) -> ThunkResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.mark(action, ActionStatus::Pending);
        let result = run_thunk(action, call).await;
        self.settle(action, &result);
        result
    }

    async fn fetch_list<T, F>(&self, action: &'static str, lens: Lens<T>, call: F) -> ThunkResult<Vec<T>>
    where
        T: Record,
        F: Future<Output = ApiResult<Vec<T>>>,
    {
        let ticket = self.reduce(|s| lens(s).begin_fetch());
        let result = self.dispatch(action, call).await;
        self.reduce(|s| match &result {
            Ok(items) => lens(s).fulfill(ticket, items.clone()),
            Err(rejection) => lens(s).reject(ticket, rejection.message.clone()),
        });
        result
    }

    async fn add_to_list<T, F>(&self, action: &'static str, lens: Lens<T>, topic: Topic, call: F) -> ThunkResult<T>
    where
        T: Record,
        F: Future<Output = ApiResult<T>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(record) = &result {
            self.reduce(|s| lens(s).push(record.clone()));
            self.events.emit(ChangeEvent::new(topic, Change::Added, vec![record.id()]));
        }
        result
    }

    async fn update_in_list<T, F>(&self, action: &'static str, lens: Lens<T>, topic: Topic, call: F) -> ThunkResult<T>
    where
        T: Record,
        F: Future<Output = ApiResult<T>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(record) = &result {
            self.reduce(|s| lens(s).replace(record.clone()));
            self.events.emit(ChangeEvent::new(topic, Change::Updated, vec![record.id()]));
        }
        result
    }

    async fn delete_from_list<T, F>(&self, action: &'static str, lens: Lens<T>, topic: Topic, call: F) -> ThunkResult<u64>
    where
        T: Record,
        F: Future<Output = ApiResult<u64>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(id) = &result {
            self.reduce(|s| lens(s).remove(*id));
            self.events.emit(ChangeEvent::new(topic, Change::Deleted, vec![*id]));
        }
        result
    }

    async fn fetch_keyed<K, T, F>(&self, action: &'static str, lens: KeyedLens<K, T>, key: K, call: F) -> ThunkResult<Vec<T>>
    where
        K: Eq + Hash + Clone,
        T: Record,
        F: Future<Output = ApiResult<Vec<T>>>,
    {
        let ticket = self.reduce(|s| lens(s).begin_fetch(key.clone()));
        let result = self.dispatch(action, call).await;
        self.reduce(|s| match &result {
            Ok(items) => lens(s).fulfill(key, ticket, items.clone()),
            Err(rejection) => lens(s).reject(key, ticket, rejection.message.clone()),
        });
        result
    }

    async fn add_keyed<K, T, F>(
        &self,
        action: &'static str,
        lens: KeyedLens<K, T>,
        key_of: fn(&T) -> K,
        topic: Topic,
        call: F,
    ) -> ThunkResult<T>
    where
        K: Eq + Hash + Clone,
        T: Record,
        F: Future<Output = ApiResult<T>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(record) = &result {
            self.reduce(|s| lens(s).push(key_of(record), record.clone()));
            self.events.emit(ChangeEvent::new(topic, Change::Added, vec![record.id()]));
        }
        result
    }

    async fn update_keyed<K, T, F>(
        &self,
        action: &'static str,
        lens: KeyedLens<K, T>,
        key_of: fn(&T) -> K,
        topic: Topic,
        call: F,
    ) -> ThunkResult<T>
    where
        K: Eq + Hash + Clone,
        T: Record,
        F: Future<Output = ApiResult<T>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(record) = &result {
            self.reduce(|s| lens(s).upsert_moved(key_of(record), record.clone()));
            self.events.emit(ChangeEvent::new(topic, Change::Updated, vec![record.id()]));
        }
        result
    }

    async fn delete_keyed<K, T, F>(&self, action: &'static str, lens: KeyedLens<K, T>, topic: Topic, call: F) -> ThunkResult<u64>
    where
        K: Eq + Hash + Clone,
        T: Record,
        F: Future<Output = ApiResult<u64>>,
    {
        let result = self.dispatch(action, call).await;
        if let Ok(id) = &result {
            self.reduce(|s| lens(s).remove_anywhere(*id));
            self.events.emit(ChangeEvent::new(topic, Change::Deleted, vec![*id]));
        }
        result
    }

    // ========================================================================
    // FORANES
    // ========================================================================

    pub async fn fetch_foranes(&self) -> ThunkResult<Vec<Forane>> {
        self.fetch_list("foranes/fetch", lens::foranes, self.api.fetch_foranes()).await
    }

    pub async fn add_forane(&self, req: NewForane) -> ThunkResult<Forane> {
        self.add_to_list("foranes/add", lens::foranes, Topic::Forane, self.api.add_forane(req)).await
    }

    pub async fn update_forane(&self, id: u64, patch: ForanePatch) -> ThunkResult<Forane> {
        self.update_in_list("foranes/update", lens::foranes, Topic::Forane, self.api.update_forane(id, patch))
            .await
    }

    pub async fn delete_forane(&self, id: u64) -> ThunkResult<u64> {
        self.delete_from_list("foranes/delete", lens::foranes, Topic::Forane, self.api.delete_forane(id))
            .await
    }

    // ========================================================================
    // PARISHES
    // ========================================================================

    /// Fetch every parish into the flat parish cache
    pub async fn fetch_parishes(&self) -> ThunkResult<Vec<Parish>> {
        self.fetch_list("parishes/fetch", lens::parishes, self.api.fetch_parishes(None)).await
    }

    pub async fn add_parish(&self, req: NewParish) -> ThunkResult<Parish> {
        self.add_to_list("parishes/add", lens::parishes, Topic::Parish, self.api.add_parish(req)).await
    }

    pub async fn update_parish(&self, id: u64, patch: ParishPatch) -> ThunkResult<Parish> {
        self.update_in_list("parishes/update", lens::parishes, Topic::Parish, self.api.update_parish(id, patch))
            .await
    }

    pub async fn delete_parish(&self, id: u64) -> ThunkResult<u64> {
        self.delete_from_list("parishes/delete", lens::parishes, Topic::Parish, self.api.delete_parish(id))
            .await
    }

    // ========================================================================
    // COMMUNITIES
    // ========================================================================

    pub async fn fetch_communities(&self, parent: ParentRef) -> ThunkResult<Vec<Community>> {
        self.fetch_keyed(
            "communities/fetch",
            lens::communities,
            parent,
            self.api.fetch_communities(parent),
        )
        .await
    }

    pub async fn add_community(&self, req: NewCommunity) -> ThunkResult<Community> {
        self.add_keyed(
            "communities/add",
            lens::communities,
            lens::community_key,
            Topic::Community,
            self.api.add_community(req),
        )
        .await
    }

    pub async fn update_community(&self, id: u64, patch: CommunityPatch) -> ThunkResult<Community> {
        self.update_keyed(
            "communities/update",
            lens::communities,
            lens::community_key,
            Topic::Community,
            self.api.update_community(id, patch),
        )
        .await
    }

    pub async fn delete_community(&self, id: u64) -> ThunkResult<u64> {
        self.delete_keyed(
            "communities/delete",
            lens::communities,
            Topic::Community,
            self.api.delete_community(id),
        )
        .await
    }

    // ========================================================================
    // FAMILIES
    // ========================================================================

    pub async fn fetch_families(&self, community_id: u64) -> ThunkResult<Vec<Family>> {
        self.fetch_keyed(
            "families/fetch",
            lens::families,
            community_id,
            self.api.fetch_families(community_id),
        )
        .await
    }

    pub async fn add_family(&self, req: NewFamily) -> ThunkResult<Family> {
        self.add_keyed(
            "families/add",
            lens::families,
            lens::family_key,
            Topic::Family,
            self.api.add_family(req),
        )
        .await
    }

    pub async fn update_family(&self, id: u64, patch: FamilyPatch) -> ThunkResult<Family> {
        self.update_keyed(
            "families/update",
            lens::families,
            lens::family_key,
            Topic::Family,
            self.api.update_family(id, patch),
        )
        .await
    }

    pub async fn delete_family(&self, id: u64) -> ThunkResult<u64> {
        self.delete_keyed("families/delete", lens::families, Topic::Family, self.api.delete_family(id))
            .await
    }

    // ========================================================================
    // INDIVIDUALS & INSTITUTIONS
    // ========================================================================

    pub async fn fetch_individuals(&self) -> ThunkResult<Vec<Individual>> {
        self.fetch_list("individuals/fetch", lens::individuals, self.api.fetch_individuals())
            .await
    }

    pub async fn add_individual(&self, req: NewIndividual) -> ThunkResult<Individual> {
        self.add_to_list(
            "individuals/add",
            lens::individuals,
            Topic::Individual,
            self.api.add_individual(req),
        )
        .await
    }

    pub async fn update_individual(&self, id: u64, patch: IndividualPatch) -> ThunkResult<Individual> {
        self.update_in_list(
            "individuals/update",
            lens::individuals,
            Topic::Individual,
            self.api.update_individual(id, patch),
        )
        .await
    }

    pub async fn delete_individual(&self, id: u64) -> ThunkResult<u64> {
        self.delete_from_list(
            "individuals/delete",
            lens::individuals,
            Topic::Individual,
            self.api.delete_individual(id),
        )
        .await
    }

    pub async fn fetch_institutions(&self) -> ThunkResult<Vec<Institution>> {
        self.fetch_list("institutions/fetch", lens::institutions, self.api.fetch_institutions())
            .await
    }

    pub async fn add_institution(&self, req: NewInstitution) -> ThunkResult<Institution> {
        self.add_to_list(
            "institutions/add",
            lens::institutions,
            Topic::Institution,
            self.api.add_institution(req),
        )
        .await
    }

    pub async fn update_institution(&self, id: u64, patch: InstitutionPatch) -> ThunkResult<Institution> {
        self.update_in_list(
            "institutions/update",
            lens::institutions,
            Topic::Institution,
            self.api.update_institution(id, patch),
        )
        .await
    }

    pub async fn delete_institution(&self, id: u64) -> ThunkResult<u64> {
        self.delete_from_list(
            "institutions/delete",
            lens::institutions,
            Topic::Institution,
            self.api.delete_institution(id),
        )
        .await
    }

    // ========================================================================
    // CONTRIBUTIONS
    // ========================================================================

    pub async fn fetch_contributions(&self, owner: ContributionOwner) -> ThunkResult<Vec<Contribution>> {
        let ticket = self.reduce(|s| s.contributions.begin_fetch(owner));
        let result = self
            .dispatch("contributions/fetch", self.api.fetch_contributions(owner))
            .await;
        self.reduce(|s| match &result {
            Ok(items) => s.contributions.fulfill(owner, ticket, items.clone()),
            Err(rejection) => s.contributions.reject(owner, ticket, rejection.message.clone()),
        });
        result
    }

    /// Record a contribution; the owner's cached total follows the server's
    pub async fn add_contribution(&self, req: NewContribution) -> ThunkResult<ContributionAdded> {
        let result = self
            .dispatch("contributions/add", self.api.add_contribution(req))
            .await;

        if let Ok(added) = &result {
            let owner = added.contribution.owner;
            self.reduce(|s| {
                s.contributions.push(owner, added.contribution.clone());
                s.apply_owner_total(owner, &added.owner_total);
            });
            self.events.emit(ChangeEvent::new(
                owner_topic(owner),
                Change::ContributionAdded,
                vec![owner.id(), added.contribution.id],
            ));
        }
        result
    }

    pub async fn delete_contribution(&self, id: u64) -> ThunkResult<ContributionRemoved> {
        let result = self
            .dispatch("contributions/delete", self.api.delete_contribution(id))
            .await;

        if let Ok(removed) = &result {
            self.reduce(|s| {
                s.contributions.entry_mut(removed.owner).remove(removed.id);
                if let Some(total) = &removed.owner_total {
                    s.apply_owner_total(removed.owner, total);
                }
            });
            self.events.emit(ChangeEvent::new(
                owner_topic(removed.owner),
                Change::ContributionDeleted,
                vec![removed.owner.id(), removed.id],
            ));
        }
        result
    }
}
