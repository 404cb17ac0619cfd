//! Save capability registry.
//!
//! The edit surface registers up to three save strategies while mounted.
//! Each registration returns a [`Registration`] that removes the handler on
//! drop. Coordinators only ever read a [`SaveHandlers`] snapshot.

use crate::SaveResult;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::debug;

pub type SaveFuture = BoxFuture<'static, SaveResult<()>>;

/// Persist pending edits.
pub type SaveFn = Arc<dyn Fn() -> SaveFuture + Send + Sync>;

/// Close the edit surface, saving or discarding as it sees fit.
pub type CloseFn = Arc<dyn Fn(CloseReason) -> SaveFuture + Send + Sync>;

/// Save strategies in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    /// Saves straight from the editor's own state.
    Direct,
    /// Saves through the shared edit-session state.
    Context,
    /// Closes the edit surface.
    Close,
}

impl fmt::Display for SaveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStrategy::Direct => "direct",
            SaveStrategy::Context => "context",
            SaveStrategy::Close => "close",
        };
        f.write_str(name)
    }
}

/// Why the edit surface is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Last-resort save before leaving the route.
    Navigation,
    /// The user tapped the nav item of the route already showing the surface.
    SameRouteTap,
}

/// Immutable handler set passed to a single flush.
#[derive(Clone, Default)]
pub struct SaveHandlers {
    pub direct: Option<SaveFn>,
    pub context: Option<SaveFn>,
    pub close: Option<CloseFn>,
}

impl SaveHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direct<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        self.direct = Some(save_fn(f));
        self
    }

    pub fn with_context<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        self.context = Some(save_fn(f));
        self
    }

    pub fn with_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CloseReason) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        self.close = Some(close_fn(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_none() && self.context.is_none() && self.close.is_none()
    }

    /// Present handlers in preference order; close runs with `reason`.
    pub fn chain(&self, reason: CloseReason) -> Vec<(SaveStrategy, SaveFn)> {
        let mut chain = Vec::with_capacity(3);
        if let Some(direct) = &self.direct {
            chain.push((SaveStrategy::Direct, direct.clone()));
        }
        if let Some(context) = &self.context {
            chain.push((SaveStrategy::Context, context.clone()));
        }
        if let Some(close) = &self.close {
            let close = close.clone();
            let bound: SaveFn = Arc::new(move || close(reason));
            chain.push((SaveStrategy::Close, bound));
        }
        chain
    }
}

impl fmt::Debug for SaveHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveHandlers")
            .field("direct", &self.direct.is_some())
            .field("context", &self.context.is_some())
            .field("close", &self.close.is_some())
            .finish()
    }
}

fn save_fn<F, Fut>(f: F) -> SaveFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SaveResult<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

fn close_fn<F, Fut>(f: F) -> CloseFn
where
    F: Fn(CloseReason) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SaveResult<()>> + Send + 'static,
{
    Arc::new(move |reason| f(reason).boxed())
}

#[derive(Default)]
struct Slots {
    direct: Option<(u64, SaveFn)>,
    context: Option<(u64, SaveFn)>,
    close: Option<(u64, CloseFn)>,
    surface_open: bool,
    next_id: u64,
}

impl Slots {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared, typed registry of the edit surface's save capabilities.
#[derive(Clone, Default)]
pub struct SaveHandlerRegistry {
    slots: Arc<RwLock<Slots>>,
}

impl SaveHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "the handler is removed when the registration drops"]
    pub fn register_direct<F, Fut>(&self, f: F) -> Registration
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        let mut slots = self.slots.write();
        let id = slots.next_id();
        slots.direct = Some((id, save_fn(f)));
        self.registration(SaveStrategy::Direct, id)
    }

    #[must_use = "the handler is removed when the registration drops"]
    pub fn register_context<F, Fut>(&self, f: F) -> Registration
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        let mut slots = self.slots.write();
        let id = slots.next_id();
        slots.context = Some((id, save_fn(f)));
        self.registration(SaveStrategy::Context, id)
    }

    #[must_use = "the handler is removed when the registration drops"]
    pub fn register_close<F, Fut>(&self, f: F) -> Registration
    where
        F: Fn(CloseReason) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SaveResult<()>> + Send + 'static,
    {
        let mut slots = self.slots.write();
        let id = slots.next_id();
        slots.close = Some((id, close_fn(f)));
        self.registration(SaveStrategy::Close, id)
    }

    fn registration(&self, strategy: SaveStrategy, id: u64) -> Registration {
        debug!(strategy = %strategy, "Save handler registered");
        Registration {
            slots: Arc::downgrade(&self.slots),
            strategy,
            id,
        }
    }

    /// Current handler set.
    pub fn snapshot(&self) -> SaveHandlers {
        let slots = self.slots.read();
        SaveHandlers {
            direct: slots.direct.as_ref().map(|(_, f)| f.clone()),
            context: slots.context.as_ref().map(|(_, f)| f.clone()),
            close: slots.close.as_ref().map(|(_, f)| f.clone()),
        }
    }

    pub fn set_surface_open(&self, open: bool) {
        self.slots.write().surface_open = open;
    }

    pub fn surface_open(&self) -> bool {
        self.slots.read().surface_open
    }
}

/// Keeps a handler registered. Dropping it deregisters the handler unless a
/// newer registration replaced it.
#[derive(Debug)]
pub struct Registration {
    slots: Weak<RwLock<Slots>>,
    strategy: SaveStrategy,
    id: u64,
}

impl Registration {
    pub fn strategy(&self) -> SaveStrategy {
        self.strategy
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let mut slots = slots.write();
        let removed = match self.strategy {
            SaveStrategy::Direct => take_if_owned(&mut slots.direct, self.id),
            SaveStrategy::Context => take_if_owned(&mut slots.context, self.id),
            SaveStrategy::Close => take_if_owned(&mut slots.close, self.id),
        };
        if removed {
            debug!(strategy = %self.strategy, "Save handler deregistered");
        }
    }
}

fn take_if_owned<T>(slot: &mut Option<(u64, T)>, id: u64) -> bool {
    if matches!(slot, Some((owner, _)) if *owner == id) {
        *slot = None;
        true
    } else {
        false
    }
}
