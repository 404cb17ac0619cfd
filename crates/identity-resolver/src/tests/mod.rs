//! Resolver tests.
//!
//! - `harness.rs`  - fixture wiring a memory store, host SDK, bus and URL
//! - `priority.rs` - source ordering without waiting
//! - `waiting.rs`  - the timed race: late SDK, live messages, timeout, teardown

mod priority;
