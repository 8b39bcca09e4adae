use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub replans: u32,
    pub abandoned: u32,
    pub arrivals: u32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Duration,
    interval: Duration,
    frames: u32,
    ticks: u32,
    replans: u32,
    abandoned: u32,
    arrivals: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Duration::ZERO,
            interval,
            frames: 0,
            ticks: 0,
            replans: 0,
            abandoned: 0,
            arrivals: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn record_replan(&mut self) {
        self.replans = self.replans.saturating_add(1);
    }

    pub(crate) fn record_abandoned(&mut self) {
        self.abandoned = self.abandoned.saturating_add(1);
    }

    pub(crate) fn record_arrival(&mut self) {
        self.arrivals = self.arrivals.saturating_add(1);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Duration) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_sub(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            replans: self.replans,
            abandoned: self.abandoned,
            arrivals: self.arrivals,
        };

        *self = Self::new(self.interval);
        self.interval_start = now;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));

        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_frame(Duration::from_millis(16));
        for _ in 0..4 {
            accumulator.record_tick();
        }
        accumulator.record_replan();
        accumulator.record_arrival();
        accumulator.record_arrival();

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert_eq!(snapshot.replans, 1);
        assert_eq!(snapshot.abandoned, 0);
        assert_eq!(snapshot.arrivals, 2);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn snapshot_resets_counters_and_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_tick();
        accumulator.record_replan();
        assert!(accumulator.maybe_snapshot(Duration::from_secs(1)).is_some());

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(1_500))
            .is_none());
        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(2))
            .expect("second interval");
        assert_eq!(snapshot.tps, 0.0);
        assert_eq!(snapshot.replans, 0);
    }
}
