// ⛪ Parish Entity - a church record, optionally under a forane

use super::{double_option, merge, HasTotal, Record};
use crate::currency::format_total;
use crate::error::{require, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parish {
    pub id: u64,
    pub name: String,
    pub place: String,
    pub vicar_name: String,
    pub contact: String,
    pub total: String,

    /// Owning forane (foreign key), if any
    pub forane_id: Option<u64>,
}

impl Parish {
    pub fn new(id: u64, req: NewParish) -> Self {
        Parish {
            id,
            name: req.name,
            place: req.place,
            vicar_name: req.vicar_name,
            contact: req.contact,
            total: req.total.unwrap_or_else(|| format_total(0.0)),
            forane_id: req.forane_id,
        }
    }
}

impl Record for Parish {
    const ENTITY: &'static str = "Parish";

    fn id(&self) -> u64 {
        self.id
    }
}

impl HasTotal for Parish {
    fn total(&self) -> &str {
        &self.total
    }

    fn set_total(&mut self, total: String) {
        self.total = total;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewParish {
    pub name: String,
    pub place: String,
    #[serde(default)]
    pub vicar_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub forane_id: Option<u64>,
}

impl NewParish {
    pub fn validate(&self) -> ApiResult<()> {
        require("Parish name", &self.name)?;
        require("Place", &self.place)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParishPatch {
    pub name: Option<String>,
    pub place: Option<String>,
    pub vicar_name: Option<String>,
    pub contact: Option<String>,
    pub total: Option<String>,

    /// `Some(None)` detaches the parish from its forane
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub forane_id: Option<Option<u64>>,
}

impl ParishPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require("Parish name", name)?;
        }
        if let Some(place) = &self.place {
            require("Place", place)?;
        }
        Ok(())
    }

    pub fn apply(self, parish: &mut Parish) {
        merge(&mut parish.name, self.name);
        merge(&mut parish.place, self.place);
        merge(&mut parish.vicar_name, self.vicar_name);
        merge(&mut parish.contact, self.contact);
        merge(&mut parish.total, self.total);
        merge(&mut parish.forane_id, self.forane_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st_george() -> Parish {
        Parish::new(
            4,
            NewParish {
                name: "St George".to_string(),
                place: "Aruvithura".to_string(),
                forane_id: Some(2),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_patch_merges_over_previous_values() {
        let mut parish = st_george();
        ParishPatch {
            vicar_name: Some("Fr. Joseph".to_string()),
            ..Default::default()
        }
        .apply(&mut parish);

        assert_eq!(parish.vicar_name, "Fr. Joseph");
        assert_eq!(parish.name, "St George");
        assert_eq!(parish.forane_id, Some(2));
    }

    #[test]
    fn test_patch_can_detach_forane() {
        let mut parish = st_george();
        let patch: ParishPatch = serde_json::from_str(r#"{"forane_id": null}"#).unwrap();
        assert_eq!(patch.forane_id, Some(None));

        patch.apply(&mut parish);
        assert_eq!(parish.forane_id, None);
    }

    #[test]
    fn test_patch_absent_forane_leaves_it() {
        let mut parish = st_george();
        let patch: ParishPatch = serde_json::from_str(r#"{"name": "St George Forane Church"}"#).unwrap();
        assert_eq!(patch.forane_id, None);

        patch.apply(&mut parish);
        assert_eq!(parish.forane_id, Some(2));
        assert_eq!(parish.name, "St George Forane Church");
    }
}
