use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// Opaque profile identifier.
///
/// The backend hands out numeric ids for some records and string ids (UUIDs)
/// for others, so both forms are accepted on the wire and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProfileId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProfileId {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl ProfileId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyProfileId);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawProfileId::deserialize(deserializer)? {
            RawProfileId::Int(id) => Ok(Self(id.to_string())),
            RawProfileId::UInt(id) => Ok(Self(id.to_string())),
            RawProfileId::Float(id) => Ok(Self(id.to_string())),
            RawProfileId::Text(id) => Self::new(id).map_err(serde::de::Error::custom),
        }
    }
}

impl From<ProfileId> for String {
    fn from(value: ProfileId) -> Self {
        value.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    /// Splits a backend location string of the form `"City, ST"`.
    ///
    /// Strings without a comma become a city with an empty state. Blank
    /// input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (city, state) = match raw.rsplit_once(',') {
            Some((city, state)) => (city.trim(), state.trim()),
            None => (raw, ""),
        };
        Some(Self {
            city: city.to_string(),
            state: state.to_string(),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state.is_empty() {
            f.write_str(&self.city)
        } else {
            write!(f, "{}, {}", self.city, self.state)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Like,
    Dislike,
}

impl Decision {
    /// Path segment used by the decision endpoints.
    pub fn as_path_segment(self) -> &'static str {
        match self {
            Decision::Like => "like",
            Decision::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_id_accepts_numbers_and_strings() {
        let ids: Vec<ProfileId> =
            serde_json::from_str(r#"[17, "41f7f9da-dc0a-4657-a1a5-d70c062bc627"]"#)
                .expect("ids");
        assert_eq!(ids[0].as_str(), "17");
        assert_eq!(ids[1].as_str(), "41f7f9da-dc0a-4657-a1a5-d70c062bc627");
    }

    #[test]
    fn numeric_and_textual_forms_of_the_same_id_are_equal() {
        let numeric: ProfileId = serde_json::from_str("42").expect("numeric");
        let textual: ProfileId = serde_json::from_str("\"42\"").expect("textual");
        assert_eq!(numeric, textual);
    }

    #[test]
    fn ids_outside_the_signed_range_stay_opaque() {
        let ids: Vec<ProfileId> =
            serde_json::from_str("[18446744073709551615, -3, 12.0, 7.5]").expect("ids");
        let ids: Vec<&str> = ids.iter().map(ProfileId::as_str).collect();
        assert_eq!(ids, vec!["18446744073709551615", "-3", "12", "7.5"]);
    }

    #[test]
    fn blank_profile_id_is_rejected() {
        assert_eq!(ProfileId::new("   "), Err(DomainError::EmptyProfileId));
        assert!(serde_json::from_str::<ProfileId>("\"\"").is_err());
    }

    #[test]
    fn location_splits_on_last_comma() {
        let location = Location::parse("Portland, OR").expect("location");
        assert_eq!(location.city, "Portland");
        assert_eq!(location.state, "OR");
        assert_eq!(location.to_string(), "Portland, OR");

        let bare = Location::parse("Remote").expect("location");
        assert_eq!(bare.state, "");
        assert!(Location::parse("  ").is_none());
    }
}
