//! Circle domain models.
//!
//! These are read-only snapshots of what the remote service returns. Nothing
//! here is mutated locally; a fresh fetch supersedes the previous copy.

use serde::{Deserialize, Serialize};

use crate::wire;

/// Last reported position and device state of a member.
///
/// Values are kept as the strings the service returns. No unit conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(deserialize_with = "wire::string")]
    pub latitude: String,
    #[serde(deserialize_with = "wire::string")]
    pub longitude: String,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,
    /// Place name when the member is inside a saved place.
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    /// Battery percentage.
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub battery: Option<String>,
    /// "1" while charging.
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub charge: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub wifi_state: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

impl Location {
    pub fn is_charging(&self) -> bool {
        matches!(self.charge.as_deref(), Some("1") | Some("true"))
    }

    /// Joins the non-empty address lines with ", ".
    pub fn address(&self) -> Option<String> {
        let parts: Vec<&str> = [self.address1.as_deref(), self.address2.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Absent for members who are not sharing their location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Member {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Upper-cased first letter of the display name, used when no avatar exists.
    pub fn initial(&self) -> Option<char> {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
    }
}

/// A circle with its full member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    /// Required: a circle response without members is malformed.
    pub members: Vec<Member>,
}

impl Circle {
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

/// Entry of the circle list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSummary {
    pub id: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::opt_string", skip_serializing_if = "Option::is_none")]
    pub member_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleList {
    pub circles: Vec<CircleSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberList {
    pub members: Vec<Member>,
}
