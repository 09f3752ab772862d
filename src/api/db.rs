// In-memory collections standing in for a database
//
// One MockDb per MockApi instance. Nothing here is global, so every test
// constructs its own and never sees another test's writes.

use crate::currency::{format_total, parse_amount};
use crate::entities::*;
use crate::error::{ApiError, ApiResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockDb {
    pub foranes: Vec<Forane>,
    pub parishes: Vec<Parish>,
    pub communities: Vec<Community>,
    pub families: Vec<Family>,
    pub individuals: Vec<Individual>,
    pub institutions: Vec<Institution>,
    pub contributions: Vec<Contribution>,
}

/// Find a record by id and mutate it in place
pub(crate) fn update_in<T, F>(items: &mut [T], id: u64, update: F) -> ApiResult<T>
where
    T: Record,
    F: FnOnce(&mut T),
{
    let record = items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| ApiError::not_found(T::ENTITY, id))?;
    update(record);
    Ok(record.clone())
}

/// Remove a record by id; NotFound when absent
pub(crate) fn remove_from<T: Record>(items: &mut Vec<T>, id: u64) -> ApiResult<T> {
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| ApiError::not_found(T::ENTITY, id))?;
    Ok(items.remove(index))
}

impl MockDb {
    /// Adjust the running total of a contribution owner by `delta`
    pub(crate) fn adjust_owner_total(&mut self, owner: ContributionOwner, delta: f64) -> ApiResult<String> {
        fn bump<T: Record + HasTotal>(items: &mut [T], id: u64, delta: f64) -> ApiResult<String> {
            let record = update_in(items, id, |r| {
                let total = format_total(parse_amount(r.total()) + delta);
                r.set_total(total);
            })?;
            Ok(record.total().to_string())
        }

        match owner {
            ContributionOwner::Family(id) => bump(&mut self.families, id, delta),
            ContributionOwner::Individual(id) => bump(&mut self.individuals, id, delta),
            ContributionOwner::Institution(id) => bump(&mut self.institutions, id, delta),
        }
    }

    pub(crate) fn owner_exists(&self, owner: ContributionOwner) -> bool {
        let id = owner.id();
        match owner {
            ContributionOwner::Family(_) => self.families.iter().any(|f| f.id == id),
            ContributionOwner::Individual(_) => self.individuals.iter().any(|i| i.id == id),
            ContributionOwner::Institution(_) => self.institutions.iter().any(|i| i.id == id),
        }
    }

    /// Demo data: two foranes, three parishes, a handful of communities and
    /// families, with totals matching their contributions
    pub fn seeded() -> Self {
        let mut db = MockDb::default();

        // 1. Foranes
        for (name, location, vicar) in [
            ("Kottayam", "Kottayam", "Fr. Thomas Kurian"),
            ("Pala", "Pala", "Fr. George Mathew"),
        ] {
            let id = next_id(&db.foranes);
            db.foranes.push(Forane::new(
                id,
                NewForane {
                    name: name.to_string(),
                    location: location.to_string(),
                    vicar_name: vicar.to_string(),
                    contact: format!("0481-20{:04}", id),
                    total: None,
                },
            ));
        }

        // 2. Parishes
        for (name, place, forane_id) in [
            ("St Mary's", "Kudamaloor", Some(1)),
            ("St Thomas", "Bharananganam", Some(2)),
            ("Holy Family", "Erattupetta", None),
        ] {
            let id = next_id(&db.parishes);
            db.parishes.push(Parish::new(
                id,
                NewParish {
                    name: name.to_string(),
                    place: place.to_string(),
                    vicar_name: format!("Fr. Vicar of {}", place),
                    contact: format!("0482-21{:04}", id),
                    total: None,
                    forane_id,
                },
            ));
        }

        // 3. Communities (numbered per parent)
        for (name, number, parent) in [
            ("St Joseph Unit", 1, ParentRef::parish(1)),
            ("St Anne Unit", 2, ParentRef::parish(1)),
            ("Little Flower Unit", 1, ParentRef::parish(2)),
            ("Forane Youth", 1, ParentRef::forane(1)),
        ] {
            let id = next_id(&db.communities);
            db.communities.push(Community {
                id,
                number,
                name: name.to_string(),
                parent,
            });
        }

        // 4. Families
        for (family_name, head_name, community_id) in [
            ("Kallarackal", "Mathew", 1),
            ("Puthenpurackal", "Joseph", 1),
            ("Thottathil", "Annamma", 2),
            ("Vadakkel", "Chacko", 3),
        ] {
            let id = next_id(&db.families);
            db.families.push(Family::new(
                id,
                NewFamily {
                    family_name: family_name.to_string(),
                    head_name: head_name.to_string(),
                    community_id,
                    contact: format!("94470{:05}", id),
                    total: None,
                },
            ));
        }

        // 5. Individuals and institutions
        db.individuals.push(Individual::new(
            1,
            NewIndividual {
                name: "Dr. Elizabeth Varghese".to_string(),
                contact: "9846000001".to_string(),
                address: "Nagampadam, Kottayam".to_string(),
                total: None,
            },
        ));
        db.institutions.push(Institution::new(
            1,
            NewInstitution {
                name: "St Mary's Higher Secondary School".to_string(),
                kind: "School".to_string(),
                contact: "0481-2300300".to_string(),
                total: None,
            },
        ));

        // 6. Contributions (totals follow)
        let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap_or_default();
        for (owner, amount, purpose, on) in [
            (ContributionOwner::Family(1), 1000.0, "Feast", date(8, 15)),
            (ContributionOwner::Family(1), 2500.0, "Church renovation", date(9, 1)),
            (ContributionOwner::Family(2), 750.0, "Feast", date(8, 15)),
            (ContributionOwner::Family(4), 5000.0, "Charity fund", date(10, 2)),
            (ContributionOwner::Individual(1), 10000.0, "Scholarship", date(6, 1)),
            (ContributionOwner::Institution(1), 25000.0, "Building fund", date(7, 20)),
        ] {
            let id = next_id(&db.contributions);
            db.contributions.push(Contribution::new(
                id,
                NewContribution::new(owner, amount, purpose).on(on),
            ));
            // Owners were just inserted above
            let _ = db.adjust_owner_total(owner, amount);
        }

        db
    }
}
