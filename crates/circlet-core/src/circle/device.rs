//! Circle-scoped device list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOwner {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceItem {
    pub id: String,
    #[serde(default)]
    pub owners: Vec<DeviceOwner>,
}

impl DeviceItem {
    /// Only the first listed owner is considered the device's owner.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owners
            .first()
            .is_some_and(|owner| owner.user_id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListData {
    #[serde(default)]
    pub items: Vec<DeviceItem>,
}

/// Response of the device list endpoint: `{ "data": { "items": [...] } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    pub data: DeviceListData,
}

impl DeviceList {
    /// Id of the first device owned by `user_id`.
    pub fn find_owned_by(&self, user_id: &str) -> Option<&str> {
        self.data
            .items
            .iter()
            .find(|item| item.is_owned_by(user_id))
            .map(|item| item.id.as_str())
    }
}
