//! CLI command handlers.

use std::sync::Arc;

use anyhow::bail;
use credential_store::Theme;
use identity_resolver::{HostSdk, IdentityMessageCache, LaunchParams, MessageBus, StaticHostSdk};
use miniapp_api::{ConnectivityMonitor, HealthProbe};
use miniapp_auth::{resolve_view, AuthError, GuardView, SessionGuard};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::App;

fn print(value: Value) {
    println!("{}", value);
}

fn launch_params(launch_url: Option<&str>) -> LaunchParams {
    match launch_url {
        None => LaunchParams::empty(),
        Some(raw) => match Url::parse(raw) {
            Ok(url) => LaunchParams::from_url(&url),
            Err(_) => LaunchParams::from_query(raw),
        },
    }
}

/// Parent-frame messages arrive one per line; JSON when it parses, text otherwise.
fn parse_message_line(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}

fn spawn_stdin_messages(bus: MessageBus) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let delivered = bus.post(parse_message_line(line.trim()));
                    debug!(delivered, "Forwarded stdin message");
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Stopped reading messages from stdin");
                    break;
                }
            }
        }
    });
}

pub async fn bootstrap(
    app: &App,
    init_data: Option<String>,
    launch_url: Option<String>,
    wait: bool,
) -> anyhow::Result<()> {
    let host = Arc::new(StaticHostSdk::new(init_data));
    let bus = MessageBus::new();
    let bootstrapper = Arc::new(app.bootstrapper(
        Some(host.clone() as Arc<dyn HostSdk>),
        bus.clone(),
        launch_params(launch_url.as_deref()),
    ));

    let view = if wait {
        // Attached before the reader starts so no early line is lost.
        let _cache = IdentityMessageCache::spawn(&bus, app.credentials.clone());
        spawn_stdin_messages(bus);
        let guard = SessionGuard::mount(bootstrapper.clone(), &app.credentials);
        guard.settled().await;
        guard.view()
    } else if bootstrapper.bootstrap(false).await {
        GuardView::Protected
    } else {
        GuardView::RedirectToLogin {
            reload_prompt: true,
        }
    };

    let established = view == GuardView::Protected;
    info!(established, "Bootstrap finished");

    let mut output = json!({
        "session_established": established,
        "view": view,
    });
    if !established {
        output["hint"] = json!(
            "No identity received from the host. Reload the mini-app or log in manually."
        );
    }
    print(output);
    Ok(())
}

pub async fn login(app: &App, username: &str, uuid: &str, register: bool) -> anyhow::Result<()> {
    let bootstrapper = app.bootstrapper(None, MessageBus::new(), LaunchParams::empty());

    match bootstrapper.login_manually(username, uuid, register).await {
        Ok(()) => {
            print(json!({ "session_established": true }));
            Ok(())
        }
        Err(AuthError::Api(e)) => {
            warn!(error = %e, "Manual login failed");
            bail!("{}", e.user_message())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn logout(app: &App) -> anyhow::Result<()> {
    let existed = app
        .bootstrapper(None, MessageBus::new(), LaunchParams::empty())
        .logout()?;
    print(json!({ "logged_out": existed }));
    Ok(())
}

pub async fn status(app: &App, route: &str) -> anyhow::Result<()> {
    let mut user = Value::Null;
    let mut backend_available = None;

    if app.credentials.has_credential() {
        match app.api.me().await {
            Ok(current) => {
                user = serde_json::to_value(current)?;
                backend_available = Some(true);
            }
            Err(e) => {
                debug!(error = %e, "Could not load current user");
                if e.kind() == miniapp_api::FailureKind::Connectivity {
                    backend_available = Some(false);
                }
                user = json!({ "error": e.user_message() });
            }
        }
    }

    // A 401 above clears the credential, so read it afterwards.
    let has_credential = app.credentials.has_credential();
    let guard = if has_credential {
        GuardView::Protected
    } else {
        GuardView::RedirectToLogin {
            reload_prompt: false,
        }
    };

    print(json!({
        "api_url": app.config.api_url,
        "signed_in": has_credential,
        "theme": app.credentials.theme()?,
        "user": user,
        "view": resolve_view(route, has_credential, backend_available, guard),
    }));
    Ok(())
}

pub async fn health(app: &App) -> anyhow::Result<()> {
    match app.api.check_health().await {
        Ok(()) => print(json!({ "reachable": true })),
        Err(e) => {
            debug!(error = %e, "Health probe failed");
            print(json!({ "reachable": false, "message": e.user_message() }));
        }
    }
    Ok(())
}

pub async fn watch(app: &App, route: &str) -> anyhow::Result<()> {
    let monitor = ConnectivityMonitor::spawn(
        app.api.clone() as Arc<dyn HealthProbe>,
        app.credentials.clone(),
        app.config.health_check_interval(),
    );
    let mut availability = monitor.subscribe();

    loop {
        let has_credential = app.credentials.has_credential();
        let guard = if has_credential {
            GuardView::Protected
        } else {
            GuardView::RedirectToLogin {
                reload_prompt: false,
            }
        };
        let current = *availability.borrow_and_update();
        print(json!({
            "backend_available": current,
            "view": resolve_view(route, has_credential, current, guard),
        }));

        tokio::select! {
            changed = availability.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Watch interrupted");
                break;
            }
        }
    }

    Ok(())
}

pub fn theme(app: &App, value: Option<Theme>) -> anyhow::Result<()> {
    if let Some(theme) = value {
        app.credentials.set_theme(theme)?;
        info!(theme = %theme, "Theme updated");
    }
    print(json!({ "theme": app.credentials.theme()? }));
    Ok(())
}
