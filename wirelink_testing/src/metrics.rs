//! Running totals over a `metrics_util` debugging recorder.
//!
//! Each `Snapshotter::snapshot` drains the recorder: counters and gauges are
//! swapped back to zero. [`MetricsLog`] folds every snapshot it takes into
//! running totals so repeated lookups and polling see all updates.

use std::collections::HashMap;

use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, Snapshotter},
};

/// Accumulated counter and gauge values.
pub struct MetricsLog {
    snapshotter: Snapshotter,
    counters: HashMap<CompositeKey, u64>,
    gauges: HashMap<CompositeKey, f64>,
}

impl MetricsLog {
    #[must_use]
    pub fn new(snapshotter: Snapshotter) -> Self {
        Self {
            snapshotter,
            counters: HashMap::new(),
            gauges: HashMap::new(),
        }
    }

    /// Drain the recorder into the running totals.
    pub fn refresh(&mut self) -> &mut Self {
        for (key, _, _, value) in self.snapshotter.snapshot().into_vec() {
            match value {
                DebugValue::Counter(c) => *self.counters.entry(key).or_default() += c,
                DebugValue::Gauge(g) => *self.gauges.entry(key).or_default() += g.0,
                DebugValue::Histogram(_) => {}
            }
        }
        self
    }

    /// Total of counter `name` across series whose labels include every pair
    /// in `labels`.
    #[must_use]
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .iter()
            .filter(|(key, _)| matches_key(key, name, labels))
            .map(|(_, value)| *value)
            .sum()
    }

    /// Value of gauge `name`, or `None` if it was never touched.
    #[must_use]
    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges
            .iter()
            .find(|(key, _)| key.key().name() == name)
            .map(|(_, value)| *value)
    }
}

fn matches_key(key: &CompositeKey, name: &str, labels: &[(&str, &str)]) -> bool {
    let key = key.key();
    key.name() == name
        && labels
            .iter()
            .all(|(k, v)| key.labels().any(|l| l.key() == *k && l.value() == *v))
}
