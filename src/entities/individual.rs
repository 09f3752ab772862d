// 🙋 Individual Entity - a contributor not tied to a family

use super::{merge, HasTotal, Record};
use crate::currency::format_total;
use crate::error::{require, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: u64,
    pub name: String,
    pub contact: String,
    pub address: String,
    pub total: String,
}

impl Individual {
    pub fn new(id: u64, req: NewIndividual) -> Self {
        Individual {
            id,
            name: req.name,
            contact: req.contact,
            address: req.address,
            total: req.total.unwrap_or_else(|| format_total(0.0)),
        }
    }
}

impl Record for Individual {
    const ENTITY: &'static str = "Individual";

    fn id(&self) -> u64 {
        self.id
    }
}

impl HasTotal for Individual {
    fn total(&self) -> &str {
        &self.total
    }

    fn set_total(&mut self, total: String) {
        self.total = total;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIndividual {
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub total: Option<String>,
}

impl NewIndividual {
    pub fn named(name: impl Into<String>) -> Self {
        NewIndividual {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        require("Name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndividualPatch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub total: Option<String>,
}

impl IndividualPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require("Name", name)?;
        }
        Ok(())
    }

    pub fn apply(self, individual: &mut Individual) {
        merge(&mut individual.name, self.name);
        merge(&mut individual.contact, self.contact);
        merge(&mut individual.address, self.address);
        merge(&mut individual.total, self.total);
    }
}
