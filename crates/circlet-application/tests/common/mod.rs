//! Shared fixtures: a scripted gateway and a dispatcher wired to it.

#![allow(dead_code)]

use async_trait::async_trait;
use circlet_application::{CommandDispatcher, SessionStore};
use circlet_core::clock::FixedClock;
use circlet_core::config::ApiConfig;
use circlet_core::session::InMemoryCredentialRepository;
use circlet_core::{CircletError, Result};
use circlet_interaction::{GatewayResponse, HttpGateway, HttpMethod, RequestDescriptor};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NOW_MS: i64 = 1_700_000_000_000;
pub const BASE: &str = "https://api-cloudfront.life360.com";

type Matcher = Box<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>;

struct Route {
    matcher: Matcher,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// Gateway answering from scripted routes. Later routes win over earlier
/// ones. Every request is recorded.
pub struct MockGateway {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, method: HttpMethod, url_suffix: &str, status: u16, body: &str) {
        let suffix = url_suffix.to_string();
        self.respond_when(
            move |r| r.method == method && r.url.ends_with(&suffix),
            status,
            body,
            None,
        );
    }

    pub fn respond_when<F>(&self, matcher: F, status: u16, body: &str, delay: Option<Duration>)
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.routes.lock().unwrap().push(Route {
            matcher: Box::new(matcher),
            status,
            body: body.to_string(),
            delay,
        });
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl HttpGateway for MockGateway {
    async fn send(&self, request: RequestDescriptor) -> Result<GatewayResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let answer = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|route| (route.matcher)(&request))
            .map(|route| (route.status, route.body.clone(), route.delay));

        let Some((status, body, delay)) = answer else {
            return Err(CircletError::transport(format!(
                "no route for {} {}",
                request.method, request.url
            )));
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(GatewayResponse::new(status, body))
    }
}

pub struct Fixture {
    pub gateway: Arc<MockGateway>,
    pub repository: Arc<InMemoryCredentialRepository>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<SessionStore>,
    pub dispatcher: Arc<CommandDispatcher>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_repository(InMemoryCredentialRepository::new())
    }

    pub fn with_repository(repository: InMemoryCredentialRepository) -> Self {
        let gateway = Arc::new(MockGateway::new());
        let repository = Arc::new(repository);
        let clock = Arc::new(FixedClock::new(NOW_MS));
        let store = Arc::new(SessionStore::new(repository.clone(), clock.clone()));
        let dispatcher = Arc::new(CommandDispatcher::new(
            store.clone(),
            gateway.clone(),
            &ApiConfig::default(),
        ));
        Self {
            gateway,
            repository,
            clock,
            store,
            dispatcher,
        }
    }

    /// A logged-in session for user `u1`.
    pub async fn ready(self) -> Self {
        self.store.save("tok", 3600).await;
        self.store.set_current_user("u1").await;
        self
    }
}

pub fn devices_json(items: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(id, owner)| serde_json::json!({"id": id, "owners": [{"userId": owner}]}))
        .collect();
    serde_json::json!({"data": {"items": items}}).to_string()
}
