// 🏫 Institution Entity - schools, convents, hospitals

use super::{merge, HasTotal, Record};
use crate::currency::format_total;
use crate::error::{require, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: u64,
    pub name: String,

    /// Free text: "School", "Hospital", "Convent", ...
    pub kind: String,

    pub contact: String,
    pub total: String,
}

impl Institution {
    pub fn new(id: u64, req: NewInstitution) -> Self {
        Institution {
            id,
            name: req.name,
            kind: req.kind,
            contact: req.contact,
            total: req.total.unwrap_or_else(|| format_total(0.0)),
        }
    }
}

impl Record for Institution {
    const ENTITY: &'static str = "Institution";

    fn id(&self) -> u64 {
        self.id
    }
}

impl HasTotal for Institution {
    fn total(&self) -> &str {
        &self.total
    }

    fn set_total(&mut self, total: String) {
        self.total = total;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInstitution {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub total: Option<String>,
}

impl NewInstitution {
    pub fn validate(&self) -> ApiResult<()> {
        require("Institution name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub contact: Option<String>,
    pub total: Option<String>,
}

impl InstitutionPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require("Institution name", name)?;
        }
        Ok(())
    }

    pub fn apply(self, institution: &mut Institution) {
        merge(&mut institution.name, self.name);
        merge(&mut institution.kind, self.kind);
        merge(&mut institution.contact, self.contact);
        merge(&mut institution.total, self.total);
    }
}
