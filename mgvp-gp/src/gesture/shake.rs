//! Shake classifier
//!
//! Separates a deliberate lateral shake from ambient motion (walking, bumps,
//! running) with a four-stage filter over a short sample window:
//!
//! 1. Magnitude: at least `min_crossings` samples with `|x| > accel_threshold`
//! 2. Variance: `var(x) > variance_threshold` (sharp bursts, not sustained motion)
//! 3. Dominant axis: `var(x) / var(y) > dominant_axis_ratio` (rejects vertical bouncing)
//! 4. Duration: the detection burst must not last longer than `max_burst_ms`
//!
//! Direction is the sign of the window's mean `x`, never the first or peak
//! sample, because overshoot and rebound routinely flip the instantaneous sign
//! right after the real gesture.
//!
//! Phases: `Idle → Detecting → Cooldown → Idle`. The cooldown is global: one
//! timer covers both directions.

use super::samples::MotionSample;
use mgvp_common::events::ShakeDirection;
use ringbuf::{traits::*, HeapRb};
use serde::Serialize;
use tracing::{debug, trace};

/// Shake classifier configuration
#[derive(Debug, Clone)]
pub struct ShakeConfig {
    /// Ring buffer capacity (samples)
    pub buffer_capacity: usize,
    /// Retained window length relative to the newest sample (ms)
    pub window_ms: u64,
    /// Lateral acceleration magnitude threshold (m/s²)
    pub accel_threshold: f64,
    /// Samples above threshold required within the window
    pub min_crossings: usize,
    /// Minimum population variance of `x` over the window
    pub variance_threshold: f64,
    /// Minimum `var(x) / var(y)`; `None` disables the dominant-axis check
    pub dominant_axis_ratio: Option<f64>,
    /// Longest allowed detection burst (ms)
    pub max_burst_ms: u64,
    /// Refractory period after an emitted shake (ms)
    pub cooldown_ms: u64,
}

impl Default for ShakeConfig {
    /// Defaults are tuned for child-strength gestures
    fn default() -> Self {
        Self {
            buffer_capacity: 20,
            window_ms: 150,
            accel_threshold: 18.0,
            min_crossings: 2,
            variance_threshold: 30.0,
            dominant_axis_ratio: Some(1.5),
            max_burst_ms: 300,
            cooldown_ms: 800,
        }
    }
}

impl ShakeConfig {
    /// Adult-strength magnitude threshold
    pub fn adult() -> Self {
        Self {
            accel_threshold: 12.0,
            ..Self::default()
        }
    }
}

/// A classified discrete shake
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShakeEvent {
    pub direction: ShakeDirection,
    pub timestamp_ms: u64,
    /// 0.0..=1.0
    pub confidence: f64,
}

/// Classifier phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakePhase {
    Idle,
    /// A threshold crossing was seen at `since_ms`
    Detecting { since_ms: u64 },
    /// Samples are discarded until `until_ms`
    Cooldown { until_ms: u64 },
}

/// Summary statistics over the retained window
#[derive(Debug, Clone, Copy)]
struct WindowStats {
    count: usize,
    crossings: usize,
    mean_x: f64,
    var_x: f64,
    var_y: Option<f64>,
}

impl WindowStats {
    fn compute<'a>(samples: impl Iterator<Item = &'a MotionSample>, threshold: f64) -> Self {
        let mut count = 0usize;
        let mut crossings = 0usize;
        let mut sum_x = 0.0;
        let mut sum_x2 = 0.0;
        let mut y_count = 0usize;
        let mut sum_y = 0.0;
        let mut sum_y2 = 0.0;

        for sample in samples {
            count += 1;
            if sample.x.abs() > threshold {
                crossings += 1;
            }
            sum_x += sample.x;
            sum_x2 += sample.x * sample.x;
            if let Some(y) = sample.y.filter(|y| y.is_finite()) {
                y_count += 1;
                sum_y += y;
                sum_y2 += y * y;
            }
        }

        let (mean_x, var_x) = mean_and_variance(count, sum_x, sum_x2);
        let var_y = (y_count >= 2).then(|| mean_and_variance(y_count, sum_y, sum_y2).1);

        Self {
            count,
            crossings,
            mean_x,
            var_x,
            var_y,
        }
    }
}

fn mean_and_variance(count: usize, sum: f64, sum_sq: f64) -> (f64, f64) {
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    let mean = sum / n;
    // Guard against tiny negative values from cancellation
    let variance = (sum_sq / n - mean * mean).max(0.0);
    (mean, variance)
}

/// Ring-buffer shake detector with a global cooldown
pub struct ShakeClassifier {
    config: ShakeConfig,
    window: HeapRb<MotionSample>,
    phase: ShakePhase,
}

impl ShakeClassifier {
    pub fn new(config: ShakeConfig) -> Self {
        let window = HeapRb::new(config.buffer_capacity.max(1));
        Self {
            config,
            window,
            phase: ShakePhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ShakePhase {
        self.phase
    }

    /// Number of retained samples
    pub fn buffered(&self) -> usize {
        self.window.occupied_len()
    }

    /// Expire the cooldown if `now_ms` has passed its deadline
    pub fn poll(&mut self, now_ms: u64) {
        if let ShakePhase::Cooldown { until_ms } = self.phase {
            if now_ms >= until_ms {
                trace!("Shake cooldown expired at {}ms", now_ms);
                self.phase = ShakePhase::Idle;
            }
        }
    }

    /// Feed one motion sample
    ///
    /// Returns a [`ShakeEvent`] when the window qualifies. Non-finite samples
    /// and samples arriving during cooldown are discarded.
    pub fn feed(&mut self, sample: MotionSample) -> Option<ShakeEvent> {
        self.poll(sample.timestamp_ms);
        if matches!(self.phase, ShakePhase::Cooldown { .. }) {
            return None;
        }

        if !sample.x.is_finite() {
            trace!("Discarding non-finite motion sample at {}ms", sample.timestamp_ms);
            return None;
        }

        let now = sample.timestamp_ms;
        self.window.push_overwrite(sample);
        self.evict_older_than(now.saturating_sub(self.config.window_ms));

        let crossing = sample.x.abs() > self.config.accel_threshold;
        match self.phase {
            ShakePhase::Idle => {
                if !crossing {
                    return None;
                }
                self.phase = ShakePhase::Detecting { since_ms: now };
            }
            ShakePhase::Detecting { since_ms } => {
                if now.saturating_sub(since_ms) > self.config.max_burst_ms {
                    debug!(
                        "Shake burst exceeded {}ms, restarting detection",
                        self.config.max_burst_ms
                    );
                    self.phase = if crossing {
                        ShakePhase::Detecting { since_ms: now }
                    } else {
                        ShakePhase::Idle
                    };
                    return None;
                }
            }
            ShakePhase::Cooldown { .. } => return None,
        }

        self.evaluate(now)
    }

    fn evict_older_than(&mut self, cutoff_ms: u64) {
        loop {
            let oldest = self.window.iter().next().map(|s| s.timestamp_ms);
            match oldest {
                Some(ts) if ts < cutoff_ms => {
                    self.window.try_pop();
                }
                _ => break,
            }
        }
    }

    fn clear_window(&mut self) {
        while self.window.try_pop().is_some() {}
    }

    fn evaluate(&mut self, now: u64) -> Option<ShakeEvent> {
        let config = &self.config;
        let stats = WindowStats::compute(self.window.iter(), config.accel_threshold);

        if stats.crossings == 0 {
            self.phase = ShakePhase::Idle;
            return None;
        }

        if stats.crossings < config.min_crossings {
            return None;
        }

        if stats.var_x <= config.variance_threshold {
            trace!(
                "Shake rejected: variance {:.1} <= {:.1}",
                stats.var_x,
                config.variance_threshold
            );
            return None;
        }

        if let (Some(ratio), Some(var_y)) = (config.dominant_axis_ratio, stats.var_y) {
            if var_y > 0.0 && stats.var_x / var_y <= ratio {
                trace!(
                    "Shake rejected: axis ratio {:.2} <= {:.2}",
                    stats.var_x / var_y,
                    ratio
                );
                return None;
            }
        }

        let direction = if stats.mean_x > 0.0 {
            ShakeDirection::Right
        } else if stats.mean_x < 0.0 {
            ShakeDirection::Left
        } else {
            return None;
        };

        let variance_score = ((stats.var_x / config.variance_threshold - 1.0) / 3.0).clamp(0.0, 1.0);
        let crossing_score = stats.crossings as f64 / stats.count as f64;
        let confidence = (0.5 * variance_score + 0.5 * crossing_score).clamp(0.0, 1.0);

        let event = ShakeEvent {
            direction,
            timestamp_ms: now,
            confidence,
        };

        debug!(
            "Shake {} detected (mean_x={:.2}, var_x={:.1}, confidence={:.2})",
            direction, stats.mean_x, stats.var_x, confidence
        );

        self.clear_window();
        self.phase = ShakePhase::Cooldown {
            until_ms: now.saturating_add(self.config.cooldown_ms),
        };

        Some(event)
    }
}

impl Default for ShakeClassifier {
    fn default() -> Self {
        Self::new(ShakeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `(t_ms, x)` pairs, returning every emitted event
    fn feed_all(classifier: &mut ShakeClassifier, samples: &[(u64, f64)]) -> Vec<ShakeEvent> {
        samples
            .iter()
            .filter_map(|(t, x)| classifier.feed(MotionSample::lateral(*x, *t)))
            .collect()
    }

    #[test]
    fn test_sharp_shake_detected() {
        let mut classifier = ShakeClassifier::default();
        let events = feed_all(&mut classifier, &[(0, 22.0), (20, -5.0), (40, 25.0)]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, ShakeDirection::Right);
        assert_eq!(events[0].timestamp_ms, 40);
        assert!(events[0].confidence > 0.0 && events[0].confidence <= 1.0);
        assert!(matches!(classifier.phase(), ShakePhase::Cooldown { until_ms: 840 }));
        assert_eq!(classifier.buffered(), 0);
    }

    #[test]
    fn test_walking_produces_no_shake() {
        let mut classifier = ShakeClassifier::default();
        // Two seconds of walking at 8-10 m/s², 50 Hz
        let walk: Vec<(u64, f64)> = (0..100u64)
            .map(|i| (i * 20, if i % 2 == 0 { 8.0 } else { 10.0 }))
            .collect();

        assert!(feed_all(&mut classifier, &walk).is_empty());
        assert_eq!(classifier.phase(), ShakePhase::Idle);
    }

    #[test]
    fn test_variance_separates_shake_from_sustained_motion() {
        // Both windows have exactly three threshold crossings
        let mut sustained = ShakeClassifier::default();
        let low_variance = [(0, 19.0), (20, 19.5), (40, 19.2), (60, 12.0)];
        assert!(feed_all(&mut sustained, &low_variance).is_empty());

        let mut sharp = ShakeClassifier::default();
        let high_variance = [(0, 12.0), (20, 30.0), (40, -19.0), (60, 28.0)];
        let events = feed_all(&mut sharp, &high_variance);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_direction_follows_mean_not_first_or_peak() {
        let mut classifier = ShakeClassifier::default();
        // First and peak samples are positive; the window mean is negative
        let samples = [
            (0, 40.0),
            (10, -17.0),
            (20, -17.0),
            (30, -17.0),
            (40, -17.0),
            (50, -19.0),
        ];

        let events = feed_all(&mut classifier, &samples);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, ShakeDirection::Left);
    }

    #[test]
    fn test_cooldown_suppresses_second_shake() {
        let mut classifier = ShakeClassifier::default();
        let first = feed_all(&mut classifier, &[(0, 22.0), (20, -5.0), (40, 25.0)]);
        assert_eq!(first.len(), 1);

        // Qualifying window 500ms later (inside the 800ms cooldown)
        let second = feed_all(&mut classifier, &[(500, 22.0), (520, -5.0), (540, 25.0)]);
        assert!(second.is_empty());

        // Same window after the cooldown has expired
        let third = feed_all(&mut classifier, &[(900, -22.0), (920, 5.0), (940, -25.0)]);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].direction, ShakeDirection::Left);
    }

    #[test]
    fn test_cooldown_is_global_across_directions() {
        let mut classifier = ShakeClassifier::default();
        assert_eq!(feed_all(&mut classifier, &[(0, 22.0), (20, -5.0), (40, 25.0)]).len(), 1);

        // Opposite direction inside the cooldown is also ignored
        assert!(feed_all(&mut classifier, &[(100, -22.0), (120, -25.0), (140, 3.0)]).is_empty());
    }

    #[test]
    fn test_poll_expires_cooldown_without_samples() {
        let mut classifier = ShakeClassifier::default();
        feed_all(&mut classifier, &[(0, 22.0), (20, -5.0), (40, 25.0)]);

        classifier.poll(839);
        assert!(matches!(classifier.phase(), ShakePhase::Cooldown { .. }));
        classifier.poll(840);
        assert_eq!(classifier.phase(), ShakePhase::Idle);
    }

    #[test]
    fn test_vertical_bounce_rejected_by_dominant_axis() {
        let mut classifier = ShakeClassifier::default();
        let bounce = [
            MotionSample::planar(20.0, 30.0, 0),
            MotionSample::planar(-20.0, -30.0, 20),
            MotionSample::planar(21.0, 31.0, 40),
        ];

        for sample in bounce {
            assert!(classifier.feed(sample).is_none());
        }
    }

    #[test]
    fn test_lateral_shake_with_quiet_y_passes_axis_check() {
        let mut classifier = ShakeClassifier::default();
        let samples = [
            MotionSample::planar(22.0, 1.0, 0),
            MotionSample::planar(-4.0, -1.0, 20),
            MotionSample::planar(25.0, 0.5, 40),
        ];

        let events: Vec<_> = samples
            .into_iter()
            .filter_map(|s| classifier.feed(s))
            .collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_samples_outside_window_are_evicted() {
        let mut classifier = ShakeClassifier::default();
        // Two crossings 200ms apart never share the 150ms window
        assert!(classifier.feed(MotionSample::lateral(22.0, 0)).is_none());
        assert!(classifier.feed(MotionSample::lateral(-25.0, 200)).is_none());
        assert_eq!(classifier.buffered(), 1);
    }

    #[test]
    fn test_overlong_burst_restarts_detection() {
        let mut classifier = ShakeClassifier::default();
        // Sustained high-magnitude, low-variance motion for 400ms
        let sustained: Vec<(u64, f64)> = (0..=20u64)
            .map(|i| (i * 20, 19.0 + (i % 2) as f64 * 0.5))
            .collect();

        assert!(feed_all(&mut classifier, &sustained).is_empty());
        match classifier.phase() {
            ShakePhase::Detecting { since_ms } => assert!(since_ms > 0),
            other => panic!("Expected Detecting, got {:?}", other),
        }
    }

    #[test]
    fn test_ring_buffer_is_bounded() {
        let mut classifier = ShakeClassifier::default();
        // 40 quiet samples within 150ms (very high sample rate)
        for i in 0..40u64 {
            classifier.feed(MotionSample::lateral(1.0, i * 2));
        }
        assert!(classifier.buffered() <= 20);
    }

    #[test]
    fn test_non_finite_sample_is_ignored() {
        let mut classifier = ShakeClassifier::default();
        assert!(classifier.feed(MotionSample::lateral(f64::NAN, 0)).is_none());
        assert_eq!(classifier.buffered(), 0);
    }

    #[test]
    fn test_adult_threshold_is_lower() {
        let mut classifier = ShakeClassifier::new(ShakeConfig::adult());
        let events = feed_all(&mut classifier, &[(0, 14.0), (20, -2.0), (40, 15.0)]);
        assert_eq!(events.len(), 1);

        let mut child = ShakeClassifier::default();
        assert!(feed_all(&mut child, &[(0, 14.0), (20, -2.0), (40, 15.0)]).is_empty());
    }
}
