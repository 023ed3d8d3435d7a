//! HTTP layer: request construction and the gateway that executes requests.

pub mod api;
pub mod gateway;
pub mod request_builder;
pub mod reqwest_gateway;

pub use gateway::{GatewayResponse, HttpGateway};
pub use request_builder::{
    Credentials, HttpMethod, RequestBuilder, RequestDescriptor, RequestOptions,
};
pub use reqwest_gateway::ReqwestGateway;
