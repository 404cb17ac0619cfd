//! Shared wiring for the CLI commands.

use std::sync::Arc;

use credential_store::{CredentialManager, FileCredentialStore};
use identity_resolver::{HostSdk, IdentitySourceResolver, LaunchParams, MessageBus, ResolverConfig};
use miniapp_api::ApiClient;
use miniapp_auth::AuthBootstrapper;
use miniapp_config_and_utils::{Config, Paths};
use save_coordinator::{
    CoordinatorConfig, NavigationGate, Router, SaveCoordinator, SaveHandlerRegistry,
};
use tracing::debug;

/// Long-lived client state: config, persistent credentials, API client and
/// the process-wide save coordinator.
pub struct App {
    pub config: Config,
    pub paths: Paths,
    pub credentials: CredentialManager,
    pub api: Arc<ApiClient>,
    pub saves: SaveCoordinator,
    pub save_handlers: SaveHandlerRegistry,
}

impl App {
    pub fn open(config: Config, paths: Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;

        let store = FileCredentialStore::open(paths.credentials_file())?;
        let credentials = CredentialManager::new(Arc::new(store));
        let api = Arc::new(ApiClient::new(config.api_url()?, credentials.clone()));

        debug!(
            base_dir = %paths.base_dir().display(),
            api_url = %config.api_url,
            "Client opened"
        );

        let saves = SaveCoordinator::new(CoordinatorConfig {
            cooldown: config.save_cooldown(),
            handler_timeout: config.save_handler_timeout(),
        });

        Ok(Self {
            config,
            paths,
            credentials,
            api,
            saves,
            save_handlers: SaveHandlerRegistry::default(),
        })
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            wait_timeout: self.config.identity_wait_timeout(),
            poll_interval: self.config.identity_poll_interval(),
        }
    }

    pub fn bootstrapper(
        &self,
        host: Option<Arc<dyn HostSdk>>,
        bus: MessageBus,
        launch: LaunchParams,
    ) -> AuthBootstrapper {
        let resolver = IdentitySourceResolver::new(host, self.credentials.clone(), bus, launch)
            .with_config(self.resolver_config());

        AuthBootstrapper::new(resolver, self.api.clone(), self.credentials.clone())
            .with_username_prefix(self.config.username_prefix.clone())
    }

    /// Gate for a host router, sharing this client's coordinator and
    /// handler registry.
    pub fn navigation_gate(&self, router: Arc<dyn Router>) -> NavigationGate {
        NavigationGate::new(router, self.save_handlers.clone(), self.saves.clone())
            .with_edit_surface_route(self.config.edit_surface_route.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credential_store::SessionCredential;
    use parking_lot::Mutex;
    use save_coordinator::{FlushOutcome, NavigationOutcome, SaveStrategy};
    use std::time::Duration;
    use tempfile::tempdir;

    struct MemoryRouter {
        route: Mutex<String>,
    }

    impl Router for MemoryRouter {
        fn current_route(&self) -> String {
            self.route.lock().clone()
        }

        fn navigate(&self, route: &str) {
            *self.route.lock() = route.to_string();
        }
    }

    #[test]
    fn test_open_creates_layout_and_persists_credentials() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("client"));

        let app = App::open(Config::default(), paths.clone()).unwrap();
        assert!(paths.logs_dir().exists());
        app.credentials
            .set_credential(&SessionCredential::new("tok"))
            .unwrap();
        drop(app);

        let reopened = App::open(Config::default(), paths).unwrap();
        assert!(reopened.credentials.has_credential());
    }

    #[test]
    fn test_resolver_config_follows_config() {
        let dir = tempdir().unwrap();
        let config = Config {
            identity_wait_timeout_ms: 750,
            identity_poll_interval_ms: 25,
            ..Config::default()
        };
        let app = App::open(config, Paths::with_base_dir(dir.path().to_path_buf())).unwrap();

        let resolver = app.resolver_config();
        assert_eq!(resolver.wait_timeout.as_millis(), 750);
        assert_eq!(resolver.poll_interval.as_millis(), 25);
    }

    #[tokio::test]
    async fn test_navigation_gate_uses_configured_route_and_timeout() {
        let dir = tempdir().unwrap();
        let config = Config {
            save_handler_timeout_ms: 20,
            edit_surface_route: "/drafts".to_string(),
            ..Config::default()
        };
        let app = App::open(config, Paths::with_base_dir(dir.path().to_path_buf())).unwrap();
        assert_eq!(app.saves.config().handler_timeout, Duration::from_millis(20));

        let _direct = app.save_handlers.register_direct(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let _context = app.save_handlers.register_context(|| async { Ok(()) });

        let router = Arc::new(MemoryRouter {
            route: Mutex::new("/drafts".to_string()),
        });
        let gate = app.navigation_gate(router.clone());

        let outcome = gate.on_navigate_intent("/deadlines").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Navigated {
                save: FlushOutcome::Saved(SaveStrategy::Context)
            }
        );
        assert_eq!(router.current_route(), "/deadlines");
    }
}
