//! Stable username / identifier derivation from an identity envelope.

use identity_resolver::IdentityEnvelope;
use miniapp_api::IdentityExchange;

/// Derive the `(username, uuid)` pair the auth endpoints expect.
///
/// The identifier is `user_id`, else `id`. The username is the envelope's
/// `username` when present, else `<prefix>_<id>_<full name>`.
pub fn derive_identity(envelope: &IdentityEnvelope, username_prefix: &str) -> Option<IdentityExchange> {
    let uuid = envelope.field("user_id").or_else(|| envelope.field("id"))?;

    let username = match envelope.field("username") {
        Some(username) => username.to_string(),
        None => format!("{}_{}_{}", username_prefix, uuid, full_name(envelope, uuid)),
    };

    Some(IdentityExchange::new(username, uuid))
}

fn full_name(envelope: &IdentityEnvelope, uuid: &str) -> String {
    let first = envelope.field("first_name");
    let last = envelope.field("last_name");

    match (first, last) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.to_string(),
        _ => envelope
            .field("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("user_{}", uuid)),
    }
}
