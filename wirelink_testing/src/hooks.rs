//! Hook recorders for asserting on client events.

use std::sync::{Arc, Mutex};

use rstest::fixture;
use wirelink::client::{ClientBuilder, MsgType};

/// Collects connect, disconnect, package and log hook invocations.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    connects: Arc<Mutex<Vec<u64>>>,
    disconnects: Arc<Mutex<Vec<u64>>>,
    packages: Arc<Mutex<Vec<(MsgType, Vec<u8>)>>>,
    logs: Arc<Mutex<Vec<String>>>,
}

impl RecordingHooks {
    /// Install every recorder on `builder`.
    #[must_use]
    pub fn attach(&self, builder: ClientBuilder) -> ClientBuilder {
        let connects = Arc::clone(&self.connects);
        let disconnects = Arc::clone(&self.disconnects);
        let packages = Arc::clone(&self.packages);
        let logs = Arc::clone(&self.logs);
        builder
            .on_connect(move |i| connects.lock().expect("hook lock").push(i))
            .on_disconnect(move |i| disconnects.lock().expect("hook lock").push(i))
            .on_package(move |kind, bytes| {
                packages.lock().expect("hook lock").push((kind, bytes.to_vec()));
            })
            .on_log(move |level, message| {
                logs.lock().expect("hook lock").push(format!("{level} {message}"));
            })
    }

    #[must_use]
    pub fn connects(&self) -> Vec<u64> { self.connects.lock().expect("hook lock").clone() }

    #[must_use]
    pub fn disconnects(&self) -> Vec<u64> { self.disconnects.lock().expect("hook lock").clone() }

    /// Raw chunks reported in one direction, in order.
    #[must_use]
    pub fn packages(&self, kind: MsgType) -> Vec<Vec<u8>> {
        self.packages
            .lock()
            .expect("hook lock")
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    /// Whether any log hook message contains `needle`.
    #[must_use]
    pub fn logged(&self, needle: &str) -> bool {
        self.logs
            .lock()
            .expect("hook lock")
            .iter()
            .any(|line| line.contains(needle))
    }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn recording_hooks() -> RecordingHooks { RecordingHooks::default() }
