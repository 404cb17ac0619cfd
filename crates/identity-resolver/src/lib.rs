//! Identity source resolution for the notes mini-app.
//!
//! Identity data can arrive through three channels of decreasing trust:
//! the host SDK object, a cross-origin message from the parent frame (live,
//! or cached from an earlier session), and the launch URL's query string.
//! [`IdentitySourceResolver`] races them and returns a normalized
//! [`IdentityEnvelope`].

mod cache;
mod envelope;
mod host;
mod launch;
mod message;
mod resolver;

pub use cache::IdentityMessageCache;
pub use envelope::{parse_identity_fields, IdentityEnvelope, IdentitySource, USER_KEYS};
pub use host::{HostSdk, StaticHostSdk};
pub use launch::LaunchParams;
pub use message::{identity_payload_from_message, MessageBus, MessageSubscription};
pub use resolver::{IdentitySourceResolver, ResolverConfig};

#[cfg(test)]
mod tests;
