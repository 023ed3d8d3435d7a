pub mod utils;

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use circlet_application::{BridgeNotification, BridgeRequest, Poller};
use circlet_core::CircletError;
use circlet_core::circle::Member;
use circlet_core::location::LocationTelemetry;
use circlet_core::message::{Message, Thread};
use circlet_interaction::{HttpMethod, RequestOptions};
use clap::Args;
use serde_json::{Value, json};

use crate::bootstrap::AppBootstrap;
use utils::{parse_header, print_json, read_stdin_line};

#[derive(Args)]
pub struct LocationArgs {
    /// Select this circle first to resolve the device id
    #[arg(long)]
    pub circle: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: String,
    #[arg(long, allow_hyphen_values = true)]
    pub lon: String,
    #[arg(long, allow_hyphen_values = true)]
    pub alt: Option<String>,
    #[arg(long)]
    pub accuracy: Option<String>,
    #[arg(long)]
    pub heading: Option<String>,
    #[arg(long)]
    pub speed: Option<String>,
    /// Battery percentage
    #[arg(long)]
    pub battery: Option<String>,
    #[arg(long)]
    pub charging: bool,
    #[arg(long)]
    pub wifi_state: Option<String>,
    #[arg(long)]
    pub wssid: Option<String>,
    #[arg(long)]
    pub reqssid: Option<String>,
    #[arg(long)]
    pub build: Option<String>,
}

impl LocationArgs {
    fn telemetry(&self) -> LocationTelemetry {
        LocationTelemetry {
            alt: self.alt.clone(),
            accuracy: self.accuracy.clone(),
            heading: self.heading.clone(),
            speed: self.speed.clone(),
            battery: self.battery.clone(),
            charge: self.charging.then(|| "1".to_string()),
            wifi_state: self.wifi_state.clone(),
            wssid: self.wssid.clone(),
            reqssid: self.reqssid.clone(),
            build: self.build.clone(),
            ..LocationTelemetry::new(self.lat.clone(), self.lon.clone())
        }
    }
}

#[derive(Args)]
pub struct RequestArgs {
    /// GET, POST, PUT, PATCH or DELETE
    pub method: String,
    /// Path relative to the API base, or an absolute URL
    pub path: String,
    /// JSON body
    #[arg(long)]
    pub body: Option<String>,
    /// Use the bootstrap client credential instead of the bearer token
    #[arg(long)]
    pub no_auth: bool,
    /// Extra header as `Name: value`; repeatable
    #[arg(long = "header")]
    pub headers: Vec<String>,
}

impl RequestArgs {
    fn options(&self) -> Result<RequestOptions> {
        let method: HttpMethod = self.method.parse()?;
        let mut options = RequestOptions::new(method, self.path.clone());
        if let Some(body) = &self.body {
            let body: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
            options = options.with_body(body);
        }
        if self.no_auth {
            options = options.with_basic_auth();
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            options = options.with_header(name, value);
        }
        Ok(options)
    }
}

async fn handle(app: &AppBootstrap, request: BridgeRequest) -> Result<Value> {
    Ok(app.bridge.handle(request).await?)
}

pub async fn login(app: &AppBootstrap, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            read_stdin_line()?
        }
    };
    // Keeps the stored device id across logins.
    app.dispatcher.store().load_persisted().await;

    let outcome = handle(app, BridgeRequest::Login { username, password }).await?;
    print_json(&outcome)
}

pub async fn status(app: &AppBootstrap) -> Result<()> {
    print_json(&handle(app, BridgeRequest::CheckAuthStatus).await?)
}

/// Clears the session of this process. The stored token record is kept, so
/// the next command restores it until it expires.
pub async fn logout(app: &AppBootstrap) -> Result<()> {
    app.restore().await;
    handle(app, BridgeRequest::Logout).await?;
    let session = app.dispatcher.store().snapshot().await;

    let token_file = app.repository.token_path();
    let report = logout_report(session.has_token(), token_file);
    if report["storedTokenKept"].as_bool() == Some(true) {
        eprintln!(
            "The token in {} is kept and later commands restore it until it expires; delete the file to sign out on this machine",
            token_file.display()
        );
    }
    print_json(&report)
}

fn logout_report(authenticated: bool, token_file: &Path) -> Value {
    json!({
        "authenticated": authenticated,
        "storedTokenKept": token_file.exists(),
        "tokenFile": token_file.display().to_string(),
    })
}

pub async fn circles(app: &AppBootstrap) -> Result<()> {
    app.restore().await;
    print_json(&handle(app, BridgeRequest::GetCircles).await?)
}

pub async fn circle(app: &AppBootstrap, circle_id: String) -> Result<()> {
    app.restore().await;
    print_json(&handle(app, BridgeRequest::GetCircleDetails { circle_id }).await?)
}

pub async fn members(app: &AppBootstrap, circle_id: String) -> Result<()> {
    app.restore().await;
    let members = app.dispatcher.circle_members(&circle_id).await?;
    print_json(&Value::Array(members.iter().map(member_summary).collect()))
}

/// One line of the member list: name, avatar fallback and last known place.
fn member_summary(member: &Member) -> Value {
    let location = member.location.as_ref();
    json!({
        "id": member.id,
        "name": member.display_name(),
        "initial": member.initial().map(String::from),
        "avatar": member.avatar,
        "place": location.and_then(|l| l.name.clone()),
        "address": location.and_then(|l| l.address()),
        "battery": location.and_then(|l| l.battery.clone()),
        "charging": location.is_some_and(|l| l.is_charging()),
    })
}

pub async fn member(app: &AppBootstrap, circle_id: String, member_id: String) -> Result<()> {
    app.restore().await;
    print_json(
        &handle(
            app,
            BridgeRequest::GetMemberInfo {
                circle_id,
                member_id,
            },
        )
        .await?,
    )
}

pub async fn select(app: &AppBootstrap, circle_id: String) -> Result<()> {
    app.restore().await;
    print_json(&handle(app, BridgeRequest::SetCurrentCircle { circle_id }).await?)
}

pub async fn update_location(app: &AppBootstrap, args: LocationArgs) -> Result<()> {
    app.restore().await;
    if let Some(circle_id) = args.circle.clone() {
        handle(app, BridgeRequest::SetCurrentCircle { circle_id }).await?;
    }

    let response = handle(app, BridgeRequest::UpdateLocation(args.telemetry())).await?;
    app.bridge.notify(BridgeNotification::LocationUpdated);
    print_json(&response)
}

pub async fn threads(app: &AppBootstrap, circle: Option<String>) -> Result<()> {
    app.restore().await;
    let user_id = app.dispatcher.store().current_user_id().await.unwrap_or_default();
    let list = app.dispatcher.list_threads().await?;
    let threads = match circle {
        Some(circle_id) => list.for_circle(&circle_id),
        None => list.threads,
    };
    let summaries: Vec<Value> = threads.iter().map(|t| thread_summary(t, &user_id)).collect();
    print_json(&Value::Array(summaries))
}

fn thread_summary(thread: &Thread, user_id: &str) -> Value {
    json!({
        "id": thread.id,
        "circleId": thread.circle_id,
        "title": thread.title(user_id),
        "lastMessage": thread.message.as_ref().map(|m| m.preview()),
    })
}

pub async fn messages(app: &AppBootstrap, circle_id: String, thread_id: String) -> Result<()> {
    app.restore().await;
    print_json(
        &handle(
            app,
            BridgeRequest::GetThreadMessages {
                circle_id,
                thread_id,
            },
        )
        .await?,
    )
}

async fn find_thread(app: &AppBootstrap, circle_id: &str, thread_id: &str) -> Result<Thread> {
    app.dispatcher
        .list_threads()
        .await?
        .for_circle(circle_id)
        .into_iter()
        .find(|t| t.id == thread_id)
        .ok_or_else(|| anyhow!("Thread {} not found in circle {}", thread_id, circle_id))
}

pub async fn send(
    app: &AppBootstrap,
    circle_id: String,
    thread_id: String,
    text: String,
) -> Result<()> {
    app.restore().await;
    let thread = find_thread(app, &circle_id, &thread_id).await?;
    handle(app, BridgeRequest::OpenThread { circle_id, thread }).await?;

    let response = handle(app, BridgeRequest::SendToSelectedThread { message: text }).await?;
    print_json(&response)
}

pub async fn watch_threads(app: &AppBootstrap, interval: u64) -> Result<()> {
    app.restore().await;
    let dispatcher = app.dispatcher.clone();

    let poll = Poller::spawn("threads", Duration::from_secs(interval.max(1)), move || {
        let dispatcher = dispatcher.clone();
        async move {
            let user_id = dispatcher.store().current_user_id().await.unwrap_or_default();
            let list = dispatcher.list_threads().await?;
            for thread in &list.threads {
                let preview = thread.message.as_ref().map(|m| m.preview()).unwrap_or("");
                println!("{}\t{}\t{}", thread.id, thread.title(&user_id), preview);
            }
            Ok::<(), CircletError>(())
        }
    });

    wait_for_interrupt().await?;
    poll.stop();
    poll.join().await;
    Ok(())
}

pub async fn watch_messages(
    app: &AppBootstrap,
    circle_id: String,
    thread_id: String,
    interval: u64,
) -> Result<()> {
    app.restore().await;
    let thread = find_thread(app, &circle_id, &thread_id).await?;

    let seen: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let shown = app.dispatcher.open_circle_thread(&circle_id, thread).await?;
    print_new(&seen, &shown);

    let dispatcher = app.dispatcher.clone();
    let poll_seen = seen.clone();
    let poll = Poller::spawn("messages", Duration::from_secs(interval.max(1)), move || {
        let dispatcher = dispatcher.clone();
        let seen = poll_seen.clone();
        async move {
            let messages = dispatcher.refresh_selected_thread().await?;
            print_new(&seen, &messages);
            Ok::<(), CircletError>(())
        }
    });

    wait_for_interrupt().await?;
    poll.stop();
    poll.join().await;
    Ok(())
}

fn print_new(seen: &Mutex<HashSet<String>>, messages: &[Message]) {
    let Ok(mut seen) = seen.lock() else {
        return;
    };
    for message in messages {
        if seen.insert(message.id.clone()) {
            println!("[{}] {}: {}", message.timestamp, message.sender_id, message.preview());
        }
    }
}

async fn wait_for_interrupt() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    eprintln!("Stopping");
    Ok(())
}

pub async fn request(app: &AppBootstrap, args: RequestArgs) -> Result<()> {
    let options = args.options()?;
    app.restore().await;
    if !app.dispatcher.dev_mode() {
        handle(app, BridgeRequest::ToggleDevMode).await?;
    }
    print_json(&handle(app, BridgeRequest::DevRequest(options)).await?)
}

pub fn paths(app: &AppBootstrap) -> Result<()> {
    let paths = &app.paths;
    let value = json!({
        "configFile": paths.config_file()?.display().to_string(),
        "dataDir": paths.data_dir()?.display().to_string(),
        "tokenFile": app.repository.token_path().display().to_string(),
        "deviceIdFile": app.repository.device_id_path().display().to_string(),
        "logsDir": paths.logs_dir()?.display().to_string(),
        "apiBaseUrl": app.config.api.base_url,
        "locationUrl": app.config.api.location_url,
    });
    print_json(&value)
}
