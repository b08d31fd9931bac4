//! Utilities for working with panic payloads.
//!
//! These helpers extract a readable message from `panic!` payloads and wrap
//! futures in a guard that turns a panic into a [`PanicReport`].

use std::{
    any::Any,
    backtrace::Backtrace,
    fmt,
    future::Future,
    panic::AssertUnwindSafe,
};

use futures::FutureExt;

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to `Debug` formatting otherwise.
///
/// ```
/// use wirelink::panic::format_panic;
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(
///     format_panic(Box::new(String::from("boom"))).to_string(),
///     "boom"
/// );
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Create a [`PanicMessage`] for the given payload.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

/// A caught panic: its message and the stack at the point it was caught.
///
/// The backtrace honours `RUST_BACKTRACE` and is empty when capture is
/// disabled.
#[derive(Debug)]
pub struct PanicReport {
    message: String,
    backtrace: Backtrace,
}

impl PanicReport {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: format_panic(payload).to_string(),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str { &self.message }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace { &self.backtrace }
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.message) }
}

/// Poll `fut` to completion, converting a panic into a [`PanicReport`].
///
/// # Errors
///
/// Returns the report when `fut` panics.
///
/// ```
/// use wirelink::panic::catch_panic;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let report = catch_panic(async { panic!("boom") })
///     .await
///     .expect_err("panic is caught");
/// assert_eq!(report.message(), "boom");
/// assert_eq!(catch_panic(async { 7 }).await.expect("no panic"), 7);
/// # }
/// ```
pub async fn catch_panic<F>(fut: F) -> Result<F::Output, PanicReport>
where
    F: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(PanicReport::from_payload)
}
