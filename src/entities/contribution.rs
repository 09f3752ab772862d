// 🪙 Contribution Entity - a single monetary donation
//
// Every contribution has exactly one owner: a family, an individual or an
// institution. The owner is also the cache key for contribution lists.

use super::Record;
use crate::currency::format_currency;
use crate::error::{require, ApiError, ApiResult};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// OWNER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContributionOwner {
    Family(u64),
    Individual(u64),
    Institution(u64),
}

impl ContributionOwner {
    pub fn id(&self) -> u64 {
        match self {
            ContributionOwner::Family(id)
            | ContributionOwner::Individual(id)
            | ContributionOwner::Institution(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContributionOwner::Family(_) => "family",
            ContributionOwner::Individual(_) => "individual",
            ContributionOwner::Institution(_) => "institution",
        }
    }

    /// Parse a (kind, id) pair such as ("family", 3)
    pub fn parse(kind: &str, id: u64) -> ApiResult<Self> {
        match kind.to_lowercase().as_str() {
            "family" => Ok(ContributionOwner::Family(id)),
            "individual" => Ok(ContributionOwner::Individual(id)),
            "institution" => Ok(ContributionOwner::Institution(id)),
            other => Err(ApiError::validation(format!("Unknown contributor type: {}", other))),
        }
    }
}

impl fmt::Display for ContributionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for ContributionOwner {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ApiError::validation(format!("Malformed contributor: {}", s)))?;
        let id = id
            .parse::<u64>()
            .map_err(|_| ApiError::validation(format!("Malformed contributor id: {}", id)))?;
        ContributionOwner::parse(kind, id)
    }
}

// ============================================================================
// CONTRIBUTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: u64,
    pub amount: f64,
    pub purpose: String,
    pub date: NaiveDate,
    pub owner: ContributionOwner,
}

impl Contribution {
    pub fn new(id: u64, req: NewContribution) -> Self {
        Contribution {
            id,
            amount: req.amount,
            purpose: req.purpose,
            date: req.date.unwrap_or_else(|| Local::now().date_naive()),
            owner: req.owner,
        }
    }

    /// Amount as "Rs. N,NNN.NN"
    pub fn display_amount(&self) -> String {
        format_currency(self.amount)
    }
}

impl Record for Contribution {
    const ENTITY: &'static str = "Contribution";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContribution {
    pub owner: ContributionOwner,
    pub amount: f64,
    #[serde(default)]
    pub purpose: String,

    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl NewContribution {
    pub fn new(owner: ContributionOwner, amount: f64, purpose: impl Into<String>) -> Self {
        NewContribution {
            owner,
            amount,
            purpose: purpose.into(),
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ApiError::validation("Amount must be greater than zero"));
        }
        if !self.purpose.is_empty() {
            require("Purpose", &self.purpose)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_display_and_parse() {
        let owner = ContributionOwner::Family(3);
        assert_eq!(owner.to_string(), "family:3");
        assert_eq!("family:3".parse::<ContributionOwner>().unwrap(), owner);
        assert_eq!(
            "Institution:9".parse::<ContributionOwner>().unwrap(),
            ContributionOwner::Institution(9)
        );
        assert!("family".parse::<ContributionOwner>().is_err());
        assert!("parish:1".parse::<ContributionOwner>().is_err());
    }

    #[test]
    fn test_owner_json_shape() {
        let json = serde_json::to_value(ContributionOwner::Individual(4)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "individual", "id": 4}));
    }

    #[test]
    fn test_amount_validation() {
        let owner = ContributionOwner::Family(1);
        assert!(NewContribution::new(owner, 500.0, "Feast").validate().is_ok());
        assert!(NewContribution::new(owner, 0.0, "Feast").validate().is_err());
        assert!(NewContribution::new(owner, -5.0, "").validate().is_err());
        assert!(NewContribution::new(owner, f64::INFINITY, "").validate().is_err());
        assert!(NewContribution::new(owner, 10.0, "  ").validate().is_err());
    }

    #[test]
    fn test_display_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        let c = Contribution::new(1, NewContribution::new(ContributionOwner::Family(1), 75250.5, "Christmas").on(date));
        assert_eq!(c.display_amount(), "Rs. 75,250.50");
        assert_eq!(c.date, date);
    }
}
