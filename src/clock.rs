//! Time sources for sort timing and persistence coalescing.
//!
//! Nothing here keeps a process-wide origin. Scheduling takes `now` from the
//! caller; operation timing uses a [`Stopwatch`] that owns its start point.

use std::time::Duration;

/// Milliseconds since page load, from the Performance API.
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

/// Elapsed time of a single operation.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(target_arch = "wasm32")]
    started: f64,
    #[cfg(not(target_arch = "wasm32"))]
    started: std::time::Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn start() -> Self {
        Self {
            #[cfg(target_arch = "wasm32")]
            started: now_ms(),
            #[cfg(not(target_arch = "wasm32"))]
            started: std::time::Instant::now(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64((now_ms() - self.started).max(0.0) / 1000.0)
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
