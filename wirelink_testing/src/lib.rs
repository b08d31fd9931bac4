//! Utilities for driving a [`Client`](wirelink::Client) and a
//! [`Service`](wirelink::Service) against in-memory or loopback peers during
//! tests.
//!
//! ```rust
//! use wirelink::{Client, Network};
//! use wirelink_testing::ScriptedDialer;
//!
//! # async fn example() {
//! let (dialer, mut peers) = ScriptedDialer::failing(2);
//! let client = Client::builder().dialer(dialer).build(Network::Tcp, "scripted");
//! client.start();
//! let _peer = peers.accept().await;
//! # }
//! ```

pub mod dialer;
pub mod hooks;
pub mod metrics;
pub mod servers;

pub use dialer::{Peers, ScriptedDialer};
pub use hooks::{RecordingHooks, recording_hooks};
pub use metrics::MetricsLog;
pub use servers::{LoopbackServer, tcp_echo_server, wait_until, ws_echo_server};
