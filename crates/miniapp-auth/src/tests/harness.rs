//! Fixture for bootstrap and guard tests.

use crate::AuthBootstrapper;
use async_trait::async_trait;
use credential_store::{CredentialManager, MemoryCredentialStore};
use identity_resolver::{
    IdentitySourceResolver, LaunchParams, MessageBus, ResolverConfig, StaticHostSdk,
};
use miniapp_api::{ApiError, ApiResult, AuthApi, IdentityExchange};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// How the fake answers a call.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Rejected(u16),
    Unreachable,
}

impl Reply {
    fn into_result(self) -> ApiResult<()> {
        match self {
            Reply::Ok => Ok(()),
            Reply::Rejected(status) => Err(ApiError::Status {
                status,
                detail: "rejected".to_string(),
            }),
            Reply::Unreachable => Err(ApiError::HostUnavailable { status: 503 }),
        }
    }
}

/// Recording stand-in for the auth endpoints.
pub struct FakeAuthApi {
    pub register_reply: Mutex<Reply>,
    pub login_reply: Mutex<Reply>,
    pub latency: Duration,
    pub calls: Mutex<Vec<(String, IdentityExchange)>>,
}

impl FakeAuthApi {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            register_reply: Mutex::new(Reply::Ok),
            login_reply: Mutex::new(Reply::Ok),
            latency,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<IdentityExchange> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == endpoint)
            .map(|(_, identity)| identity.clone())
            .collect()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn register(&self, identity: &IdentityExchange) -> ApiResult<()> {
        self.calls.lock().push(("register".to_string(), identity.clone()));
        tokio::time::sleep(self.latency).await;
        let reply = self.register_reply.lock().clone();
        reply.into_result()
    }

    async fn login(&self, identity: &IdentityExchange) -> ApiResult<String> {
        self.calls.lock().push(("login".to_string(), identity.clone()));
        tokio::time::sleep(self.latency).await;
        let reply = self.login_reply.lock().clone();
        reply.into_result()?;
        Ok(format!("token-for-{}", identity.uuid))
    }
}

pub struct Fixture {
    pub api: Arc<FakeAuthApi>,
    pub host: Arc<StaticHostSdk>,
    pub bus: MessageBus,
    pub credentials: CredentialManager,
    pub launch: LaunchParams,
    pub with_host: bool,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            api: FakeAuthApi::new(),
            host: Arc::new(StaticHostSdk::new(None).with_reload_support()),
            bus: MessageBus::new(),
            credentials: CredentialManager::new(Arc::new(MemoryCredentialStore::new())),
            launch: LaunchParams::empty(),
            with_host: true,
        }
    }

    pub fn without_host(mut self) -> Self {
        self.with_host = false;
        self
    }

    pub fn with_api(mut self, api: Arc<FakeAuthApi>) -> Self {
        self.api = api;
        self
    }

    pub fn bootstrapper(&self) -> AuthBootstrapper {
        let host = if self.with_host {
            Some(self.host.clone() as Arc<dyn identity_resolver::HostSdk>)
        } else {
            None
        };
        let resolver = IdentitySourceResolver::new(
            host,
            self.credentials.clone(),
            self.bus.clone(),
            self.launch.clone(),
        )
        .with_config(ResolverConfig::default());

        AuthBootstrapper::new(resolver, self.api.clone(), self.credentials.clone())
    }
}
