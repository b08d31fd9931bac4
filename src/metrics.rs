//! Metric helpers for `wirelink`.
//!
//! This module defines metric names and thin helpers over the
//! [`metrics`](https://docs.rs/metrics) facade. With the `metrics` feature
//! disabled the helpers compile to no-ops. No exporter is installed; the
//! host application chooses one.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking live connections.
pub const CONNECTIONS_ACTIVE: &str = "wirelink_connections_active";
/// Name of the counter tracking frames by direction.
pub const FRAMES_PROCESSED: &str = "wirelink_frames_processed_total";
/// Name of the counter tracking dispatch failures.
pub const DISPATCH_ERRORS: &str = "wirelink_dispatch_errors_total";
/// Name of the counter tracking handler panics.
pub const HANDLER_PANICS: &str = "wirelink_handler_panics_total";
/// Name of the counter tracking failed dial attempts.
pub const CONNECT_FAILURES: &str = "wirelink_connect_failures_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames decoded from the peer.
    Inbound,
    /// Frames written to the peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the live connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the live connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a processed frame for the given direction.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
}

/// Record a dispatch failure for the given stage.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_dispatch_errors(stage: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(DISPATCH_ERRORS, "stage" => stage).increment(1);
}

/// Record a panic caught while handling a frame.
pub fn inc_handler_panics() {
    #[cfg(feature = "metrics")]
    counter!(HANDLER_PANICS).increment(1);
}

/// Record a failed dial attempt.
pub fn inc_connect_failures() {
    #[cfg(feature = "metrics")]
    counter!(CONNECT_FAILURES).increment(1);
}
