// Entity Models
//
// Hierarchy: Forane → Parish → Community → Family
// Individuals and institutions stand on their own.
// Contributions belong to exactly one family, individual or institution.
//
// Each entity has:
// - A sequential integer id assigned by the API (max + 1, or 1)
// - A typed creation request (NewX) and a typed patch (XPatch)
// - A display total that sums its contributions

pub mod forane;
pub mod parish;
pub mod community;
pub mod family;
pub mod individual;
pub mod institution;
pub mod contribution;

pub use forane::{Forane, NewForane, ForanePatch};
pub use parish::{Parish, NewParish, ParishPatch};
pub use community::{Community, NewCommunity, CommunityPatch, ParentKind, ParentRef};
pub use family::{Family, NewFamily, FamilyPatch};
pub use individual::{Individual, NewIndividual, IndividualPatch};
pub use institution::{Institution, NewInstitution, InstitutionPatch};
pub use contribution::{Contribution, NewContribution, ContributionOwner};

use serde::{Deserialize, Deserializer};

/// Anything stored in a cache slice or the mock database
pub trait Record: Clone {
    /// Human readable entity name, used in "X not found" messages
    const ENTITY: &'static str;

    fn id(&self) -> u64;
}

/// Records that carry a running contribution total
pub trait HasTotal {
    fn total(&self) -> &str;
    fn set_total(&mut self, total: String);
}

/// Next sequential id: max(existing) + 1, or 1 when empty
pub fn next_id<T: Record>(items: &[T]) -> u64 {
    items.iter().map(Record::id).max().map_or(1, |max| max + 1)
}

/// Distinguish "field absent" from "field explicitly null" in patches
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Overwrite `target` when the patch carries a value
pub(crate) fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_empty() {
        let items: Vec<Individual> = Vec::new();
        assert_eq!(next_id(&items), 1);
    }

    #[test]
    fn test_next_id_uses_max_not_len() {
        let a = Individual::new(3, NewIndividual::named("A"));
        let b = Individual::new(7, NewIndividual::named("B"));
        assert_eq!(next_id(&[a, b]), 8);
    }
}
