//! Circles, members, locations, and circle-scoped devices.

pub mod device;
pub mod model;

pub use device::{DeviceItem, DeviceList, DeviceOwner};
pub use model::{Circle, CircleList, CircleSummary, Location, Member, MemberList};
