//! Host SDK seam.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The embedding host's scripting object.
///
/// `init_data` is polled: hosts may inject the object after launch.
pub trait HostSdk: Send + Sync {
    /// Raw identity blob, if the host has made one available.
    fn init_data(&self) -> Option<String>;

    /// Ask the host to reload the mini-app. Returns false when unsupported.
    fn request_reload(&self) -> bool {
        false
    }
}

/// Host SDK whose payload is set from the outside.
///
/// Backs the CLI (`--init-data`) and tests that inject the SDK mid-wait.
#[derive(Debug, Default)]
pub struct StaticHostSdk {
    init_data: RwLock<Option<String>>,
    reload_supported: bool,
    reload_requests: AtomicUsize,
}

impl StaticHostSdk {
    pub fn new(init_data: Option<String>) -> Self {
        Self {
            init_data: RwLock::new(init_data),
            ..Self::default()
        }
    }

    pub fn with_reload_support(mut self) -> Self {
        self.reload_supported = true;
        self
    }

    /// Simulate the host injecting (or withdrawing) its payload.
    pub fn set_init_data(&self, init_data: Option<String>) {
        *self.init_data.write() = init_data;
    }

    pub fn reload_requests(&self) -> usize {
        self.reload_requests.load(Ordering::SeqCst)
    }
}

impl HostSdk for StaticHostSdk {
    fn init_data(&self) -> Option<String> {
        self.init_data
            .read()
            .as_ref()
            .filter(|raw| !raw.trim().is_empty())
            .cloned()
    }

    fn request_reload(&self) -> bool {
        if !self.reload_supported {
            return false;
        }
        self.reload_requests.fetch_add(1, Ordering::SeqCst);
        true
    }
}
