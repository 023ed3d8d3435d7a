//! `HttpGateway` backed by `reqwest`.

use async_trait::async_trait;
use circlet_core::config::ApiConfig;
use circlet_core::{CircletError, Result};
use reqwest::{Client, Method};
use std::time::Duration;

use crate::gateway::{GatewayResponse, HttpGateway};
use crate::request_builder::{HttpMethod, RequestDescriptor};

#[derive(Clone)]
pub struct ReqwestGateway {
    client: Client,
}

impl ReqwestGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| CircletError::config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self::new(client))
    }

    fn to_reqwest(&self, request: RequestDescriptor) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn send(&self, request: RequestDescriptor) -> Result<GatewayResponse> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!("[Gateway] {} {}", method, url);

        let response = self
            .to_reqwest(request)
            .send()
            .await
            .map_err(|err| CircletError::transport(format!("{method} {url} failed: {err}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            CircletError::transport(format!("Failed to read response body of {url}: {err}"))
        })?;

        if !(200..300).contains(&status) {
            tracing::warn!("[Gateway] {} {} -> {}", method, url, status);
        }

        Ok(GatewayResponse { status, body })
    }
}
