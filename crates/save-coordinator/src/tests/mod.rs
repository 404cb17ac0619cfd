//! Save coordination tests.
//!
//! - `harness.rs`    - scripted handlers and a recording router
//! - `coalescing.rs` - at most one attempt in flight; joiners share its outcome
//! - `fallback.rs`   - handler chain order, failure fallthrough, timeouts
//! - `cooldown.rs`   - debounce window after an attempt settles
//! - `navigation.rs` - the gate: close in place, no-op, suppression, always navigate
