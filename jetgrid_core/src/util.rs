//! Common unit and worker-count helpers for jetgrid_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Convert seconds to whole milliseconds, rounding to nearest.
/// - Non-finite or negative inputs map to 0.
/// - Saturates at `u32::MAX`.
#[inline]
pub fn seconds_to_ms(s: f64) -> u32 {
    if !s.is_finite() || s <= 0.0 {
        return 0;
    }
    let ms = (s * MILLIS_PER_SEC).round();
    if ms >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        ms as u32
    }
}

/// Resolve a configured worker count: 0 means "one per available core".
/// Never exceeds the amount of work (`jobs`) and is at least 1.
#[inline]
pub fn resolve_workers(configured: usize, jobs: usize) -> usize {
    let n = if configured == 0 {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        configured
    };
    n.min(jobs.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_to_ms_rounds_and_saturates() {
        assert_eq!(seconds_to_ms(0.05), 50);
        assert_eq!(seconds_to_ms(0.0004), 0);
        assert_eq!(seconds_to_ms(0.0006), 1);
        assert_eq!(seconds_to_ms(-1.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
        assert_eq!(seconds_to_ms(1e12), u32::MAX);
    }

    #[test]
    fn worker_count_is_bounded_by_jobs() {
        assert_eq!(resolve_workers(8, 3), 3);
        assert_eq!(resolve_workers(2, 100), 2);
        assert_eq!(resolve_workers(4, 0), 1);
        assert!(resolve_workers(0, 1000) >= 1);
    }
}
