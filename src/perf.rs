#[cfg(feature = "perf")]
use std::time::Instant;

/// RAII timing span for the render hot path.
///
/// Compiled out unless the `perf` feature is enabled; enabled builds emit
/// `tracing` events with `target = "perf"` when the span drops.
#[cfg(feature = "perf")]
pub struct PerfSpan {
    label: &'static str,
    started: Instant,
}

#[cfg(feature = "perf")]
impl PerfSpan {
    #[inline]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }
}

#[cfg(feature = "perf")]
impl Drop for PerfSpan {
    fn drop(&mut self) {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(target: "perf", label = self.label, ms = ms);
    }
}

#[cfg(not(feature = "perf"))]
pub struct PerfSpan;

#[cfg(not(feature = "perf"))]
impl PerfSpan {
    #[inline]
    pub fn new(_label: &'static str) -> Self {
        PerfSpan
    }
}

#[macro_export]
macro_rules! perf_scope {
    ($label:expr) => {
        $crate::perf::PerfSpan::new($label)
    };
}
