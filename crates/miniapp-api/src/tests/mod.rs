//! HTTP behavior tests against an in-process stub server.
//!
//! - `harness.rs`      - stub server speaking minimal HTTP/1.1 on a TcpListener
//! - `transport.rs`    - bearer header, status classification, credential lifecycle
//! - `endpoints.rs`    - register / login / me / health
//! - `monitor.rs`      - connectivity monitor
