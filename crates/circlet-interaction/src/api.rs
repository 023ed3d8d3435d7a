//! Remote endpoint paths and request fingerprints.
//!
//! Values must match the remote service byte-for-byte.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::request_builder::RequestOptions;

pub const TOKEN_PATH: &str = "/v3/oauth2/token.json";
pub const USER_SELF_PATH: &str = "/v3/users/me";
pub const CIRCLES_PATH: &str = "/v3/circles";
pub const THREADS_PATH: &str = "/v3/circles/threads";
pub const DEVICES_PATH: &str = "/v5/circles/devices";

pub const HEADER_USER_CONTEXT: &str = "X-UserContext";

pub const DEVICES_CE_ID: &str = "92388394-B6FB-5EE5-30EC-5F814CF204AD";
pub const DEVICES_CE_TYPE: &str = "com.life360.cloud.platform.devices.v1";
pub const DEVICES_CE_SOURCE: &str = "/iOS";
pub const DEVICES_CE_SPECVERSION: &str = "1.0";
pub const MOBILE_USER_AGENT: &str =
    "com.life360.android.safetymapd/KOKO version: 23.49.0 android XX:XX:XX:XX:XX:XX";

pub fn circle_path(circle_id: &str) -> String {
    format!("/v3/circles/{circle_id}")
}

pub fn members_path(circle_id: &str) -> String {
    format!("/v3/circles/{circle_id}/members")
}

pub fn member_path(circle_id: &str, member_id: &str) -> String {
    format!("/v3/circles/{circle_id}/members/{member_id}")
}

pub fn send_message_path(circle_id: &str) -> String {
    format!("/v3/circles/{circle_id}/threads/message")
}

pub fn thread_path(circle_id: &str, thread_id: &str) -> String {
    format!("/v3/circles/{circle_id}/threads/{thread_id}")
}

/// Device list request for one circle.
///
/// The endpoint is a CloudEvents-style API and rejects requests that do not
/// look like the mobile client.
pub fn device_list_request(circle_id: &str, now: DateTime<Utc>) -> RequestOptions {
    RequestOptions::get(DEVICES_PATH)
        .with_header("ce-id", DEVICES_CE_ID)
        .with_header("ce-type", DEVICES_CE_TYPE)
        .with_header("User-Agent", MOBILE_USER_AGENT)
        .with_header("ce-source", DEVICES_CE_SOURCE)
        .with_header("ce-time", now.to_rfc3339_opts(SecondsFormat::Millis, true))
        .with_header("ce-specversion", DEVICES_CE_SPECVERSION)
        .with_header("circleid", circle_id)
}
