// 👪 Family Entity - belongs to exactly one community

use super::{merge, HasTotal, Record};
use crate::currency::format_total;
use crate::error::{require, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: u64,
    pub family_name: String,
    pub head_name: String,
    pub community_id: u64,
    pub contact: String,

    /// Running sum of contributions, e.g. "Rs. 1,500"
    pub total: String,
}

impl Family {
    pub fn new(id: u64, req: NewFamily) -> Self {
        Family {
            id,
            family_name: req.family_name,
            head_name: req.head_name,
            community_id: req.community_id,
            contact: req.contact,
            total: req.total.unwrap_or_else(|| format_total(0.0)),
        }
    }
}

impl Record for Family {
    const ENTITY: &'static str = "Family";

    fn id(&self) -> u64 {
        self.id
    }
}

impl HasTotal for Family {
    fn total(&self) -> &str {
        &self.total
    }

    fn set_total(&mut self, total: String) {
        self.total = total;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFamily {
    pub family_name: String,
    pub head_name: String,
    pub community_id: u64,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub total: Option<String>,
}

impl NewFamily {
    pub fn validate(&self) -> ApiResult<()> {
        require("Family name", &self.family_name)?;
        require("Head of family", &self.head_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyPatch {
    pub family_name: Option<String>,
    pub head_name: Option<String>,
    pub community_id: Option<u64>,
    pub contact: Option<String>,

    /// Direct edit of the running total
    pub total: Option<String>,
}

impl FamilyPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.family_name {
            require("Family name", name)?;
        }
        if let Some(head) = &self.head_name {
            require("Head of family", head)?;
        }
        Ok(())
    }

    pub fn apply(self, family: &mut Family) {
        merge(&mut family.family_name, self.family_name);
        merge(&mut family.head_name, self.head_name);
        merge(&mut family.community_id, self.community_id);
        merge(&mut family.contact, self.contact);
        merge(&mut family.total, self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_creation() {
        let family = Family::new(
            1,
            NewFamily {
                family_name: "Kallarackal".to_string(),
                head_name: "Mathew".to_string(),
                community_id: 3,
                ..Default::default()
            },
        );

        assert_eq!(family.total, "Rs. 0");
        assert_eq!(family.community_id, 3);
    }

    #[test]
    fn test_family_validation() {
        let req = NewFamily {
            family_name: "Kallarackal".to_string(),
            head_name: "".to_string(),
            community_id: 3,
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "Head of family is required");
    }
}
