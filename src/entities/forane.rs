// ⛪ Forane Entity - top-level grouping of parishes

use super::{merge, HasTotal, Record};
use crate::currency::format_total;
use crate::error::{require, ApiResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// FORANE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forane {
    pub id: u64,
    pub name: String,
    pub location: String,
    pub vicar_name: String,
    pub contact: String,

    /// Short code derived from name + location, e.g. "KOT-PAL"
    pub code: String,

    /// Aggregate total (display string)
    pub total: String,
}

impl Forane {
    pub fn new(id: u64, req: NewForane) -> Self {
        let code = Forane::derive_code(&req.name, &req.location);
        Forane {
            id,
            name: req.name,
            location: req.location,
            vicar_name: req.vicar_name,
            contact: req.contact,
            code,
            total: req.total.unwrap_or_else(|| format_total(0.0)),
        }
    }

    /// Derive the forane code: first three alphanumerics of name and location
    ///
    /// Example: ("Kottayam", "Pala") → "KOT-PAL"
    pub fn derive_code(name: &str, location: &str) -> String {
        fn prefix(s: &str) -> String {
            s.chars()
                .filter(|c| c.is_alphanumeric())
                .take(3)
                .collect::<String>()
                .to_uppercase()
        }
        format!("{}-{}", prefix(name), prefix(location))
    }
}

impl Record for Forane {
    const ENTITY: &'static str = "Forane";

    fn id(&self) -> u64 {
        self.id
    }
}

impl HasTotal for Forane {
    fn total(&self) -> &str {
        &self.total
    }

    fn set_total(&mut self, total: String) {
        self.total = total;
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewForane {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub vicar_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub total: Option<String>,
}

impl NewForane {
    pub fn validate(&self) -> ApiResult<()> {
        require("Forane name", &self.name)?;
        require("Location", &self.location)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForanePatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub vicar_name: Option<String>,
    pub contact: Option<String>,
    pub total: Option<String>,
}

impl ForanePatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require("Forane name", name)?;
        }
        if let Some(location) = &self.location {
            require("Location", location)?;
        }
        Ok(())
    }

    /// Merge over an existing record; the code follows name/location
    pub fn apply(self, forane: &mut Forane) {
        let recode = self.name.is_some() || self.location.is_some();
        merge(&mut forane.name, self.name);
        merge(&mut forane.location, self.location);
        merge(&mut forane.vicar_name, self.vicar_name);
        merge(&mut forane.contact, self.contact);
        merge(&mut forane.total, self.total);
        if recode {
            forane.code = Forane::derive_code(&forane.name, &forane.location);
        }
    }
}
