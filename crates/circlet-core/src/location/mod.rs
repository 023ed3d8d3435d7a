//! Location update payload.

pub mod payload;

pub use payload::{
    DeviceSection, FlagsSection, GeolocationMeta, GeolocationSection, LocationTelemetry,
    UserContext,
};
