// 🏘️ Community Entity - a sub-group under a parish or a forane
//
// Communities are scoped by their parent. The (kind, id) pair is a value
// object used directly as a cache key, so "forane:3" and "parish:3" never
// collide.

use super::{merge, Record};
use crate::error::{require, ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PARENT REFERENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Forane,
    Parish,
}

impl ParentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Forane => "forane",
            ParentKind::Parish => "parish",
        }
    }
}

impl FromStr for ParentKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forane" => Ok(ParentKind::Forane),
            "parish" | "church" => Ok(ParentKind::Parish),
            other => Err(ApiError::validation(format!("Unknown parent type: {}", other))),
        }
    }
}

/// Composite parent key: (kind, id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: ParentKind,
    pub id: u64,
}

impl ParentRef {
    pub fn forane(id: u64) -> Self {
        ParentRef { kind: ParentKind::Forane, id }
    }

    pub fn parish(id: u64) -> Self {
        ParentRef { kind: ParentKind::Parish, id }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

// ============================================================================
// COMMUNITY ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: u64,

    /// Display ordinal among siblings of the same parent
    pub number: u32,

    pub name: String,
    pub parent: ParentRef,
}

impl Record for Community {
    const ENTITY: &'static str = "Community";

    fn id(&self) -> u64 {
        self.id
    }
}

/// Next display number among siblings: max + 1, or 1
pub fn next_number<'a>(siblings: impl Iterator<Item = &'a Community>) -> ApiResult<u32> {
    match siblings.map(|c| c.number).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| ApiError::validation("Community number out of range")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommunity {
    pub name: String,

    /// Assigned automatically when absent
    #[serde(default)]
    pub number: Option<u32>,

    pub parent: ParentRef,
}

impl NewCommunity {
    pub fn new(name: impl Into<String>, parent: ParentRef) -> Self {
        NewCommunity {
            name: name.into(),
            number: None,
            parent,
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        require("Community name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityPatch {
    pub name: Option<String>,
    pub number: Option<u32>,

    /// Move the community to another parent
    pub parent: Option<ParentRef>,
}

impl CommunityPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            require("Community name", name)?;
        }
        Ok(())
    }

    pub fn apply(self, community: &mut Community) {
        merge(&mut community.name, self.name);
        merge(&mut community.number, self.number);
        merge(&mut community.parent, self.parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_ref_display() {
        assert_eq!(ParentRef::forane(3).to_string(), "forane:3");
        assert_eq!(ParentRef::parish(3).to_string(), "parish:3");
        assert_ne!(ParentRef::forane(3), ParentRef::parish(3));
    }

    #[test]
    fn test_parent_kind_parse() {
        assert_eq!("Parish".parse::<ParentKind>().unwrap(), ParentKind::Parish);
        assert_eq!("church".parse::<ParentKind>().unwrap(), ParentKind::Parish);
        assert_eq!("forane".parse::<ParentKind>().unwrap(), ParentKind::Forane);
        assert!("diocese".parse::<ParentKind>().is_err());
    }

    #[test]
    fn test_next_number() {
        let parent = ParentRef::parish(5);
        assert_eq!(next_number(std::iter::empty()).unwrap(), 1);

        let siblings = vec![
            Community { id: 1, number: 2, name: "A".to_string(), parent },
            Community { id: 2, number: 7, name: "B".to_string(), parent },
        ];
        assert_eq!(next_number(siblings.iter()).unwrap(), 8);
    }

    #[test]
    fn test_next_number_at_limit() {
        let parent = ParentRef::parish(1);
        let siblings = vec![Community { id: 1, number: u32::MAX, name: "Last".to_string(), parent }];

        let err = next_number(siblings.iter()).unwrap_err();
        assert_eq!(err.to_string(), "Community number out of range");
    }

    #[test]
    fn test_parent_ref_json_shape() {
        let json = serde_json::to_value(ParentRef::parish(5)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "parish", "id": 5}));
    }
}
