use metrics::{Counter, Gauge, Histogram};
use std::time::Duration;

pub struct Metrics {
    pub renders_completed: Counter,
    pub renders_failed: Counter,
    pub render_duration: Histogram,
    pub pool_utilization: Gauge,
    pub pdf_bytes: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            renders_completed: Counter::noop(),
            renders_failed: Counter::noop(),
            render_duration: Histogram::noop(),
            pool_utilization: Gauge::noop(),
            pdf_bytes: Histogram::noop(),
        }
    }

    pub fn record_render(&self, duration: Duration, success: bool) {
        if success {
            self.renders_completed.increment(1);
        } else {
            self.renders_failed.increment(1);
        }

        self.render_duration.record(duration.as_secs_f64());
    }

    pub fn record_pool_usage(&self, busy_tabs: usize, total_tabs: usize) {
        if total_tabs > 0 {
            let utilization = (busy_tabs as f64 / total_tabs as f64) * 100.0;
            self.pool_utilization.set(utilization);
        }
    }

    pub fn record_pdf_size(&self, bytes: usize) {
        self.pdf_bytes.record(bytes as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
