//! Bootstrap protocol tests.
//!
//! - `harness.rs`   - fake auth API and a bootstrapper fixture
//! - `bootstrap.rs` - exchange, idempotency, manual login, logout
//! - `guard.rs`     - guard lifecycle, teardown, panics

mod guard;
pub(crate) mod harness;
