//! Labelled counters, gauges and a latency histogram backed by `DashMap`.
//!
//! Label sets are sorted before use so each series has one key. Histogram
//! buckets are fixed microsecond bounds, rendered in Prometheus text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use orbit_core::contract::BATCH_RESPONSE;
use orbit_core::error::ERROR_RECORD;
use orbit_core::{Message, Record, Value};

type LabelKey = Vec<(String, String)>;

fn key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.map
            .entry(key(labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}{{{}}} {val}", label_str(r.key()));
        }
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge\n{name} {}", self.get());
    }
}

// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s
const BUCKETS_MICROS: [u64; 9] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(key(labels)).or_default();
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let labels = label_str(r.key());
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{labels},")
            };
            let hist = r.value();
            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {count}");
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_sum{{{labels}}} {sum}");
            let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
        }
    }
}

#[derive(Default)]
pub struct RpcMetrics {
    /// Executed operations by name and outcome (`ok` / `error`).
    pub calls: CounterVec,
    /// Error envelopes sent, by code.
    pub errors: CounterVec,
    /// Inbound messages rejected before execution.
    pub decode_errors: CounterVec,
    pub dispatch_duration: HistogramVec,
    pub connections_active: Gauge,
}

impl RpcMetrics {
    /// Account for one dispatched message and the reply it produced. `ops`
    /// names the batch items in request order; items that never ran are not
    /// counted.
    pub fn observe_reply(&self, label: &str, ops: &[&str], reply: &Message, elapsed: Duration) {
        self.dispatch_duration.observe(&[("op", label)], elapsed);
        match reply {
            Message::Record(record) => self.observe_outcome(label, record),
            Message::Array(array) if array.is(BATCH_RESPONSE) => {
                for (op, item) in ops.iter().zip(array.items()) {
                    if let Value::Record(record) = item {
                        self.observe_outcome(op, record);
                    }
                }
            }
            Message::Array(_) => self.calls.inc(&[("op", label), ("outcome", "ok")]),
        }
    }

    pub fn observe_decode_error(&self, record: &Record) {
        self.decode_errors.inc(&[("code", error_code(record))]);
        self.errors.inc(&[("code", error_code(record))]);
    }

    fn observe_outcome(&self, label: &str, record: &Record) {
        if record.is(ERROR_RECORD) {
            self.calls.inc(&[("op", label), ("outcome", "error")]);
            self.errors.inc(&[("code", error_code(record))]);
        } else {
            self.calls.inc(&[("op", label), ("outcome", "ok")]);
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.calls.render("orbit_rpc_calls_total", &mut out);
        self.errors.render("orbit_rpc_errors_total", &mut out);
        self.decode_errors.render("orbit_rpc_decode_errors_total", &mut out);
        self.dispatch_duration
            .render("orbit_rpc_dispatch_duration_micros", &mut out);
        self.connections_active
            .render("orbit_rpc_connections_active", &mut out);
        out
    }
}

fn error_code(record: &Record) -> &str {
    match record.raw("code") {
        Some(Value::Str(code)) => code.as_str(),
        _ => "UNKNOWN",
    }
}
