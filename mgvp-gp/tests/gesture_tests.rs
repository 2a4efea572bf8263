//! Classifier behaviour over longer synthetic sensor streams

use mgvp_common::events::{SwipeDirection, TiltDirection};
use mgvp_gp::gesture::{
    MotionSample, OrientationSample, ShakeClassifier, ShakeConfig, SwipeClassifier, TiltClassifier,
    TouchPoint,
};

/// 60 Hz timestamps over `seconds`
fn ticks(seconds: u64) -> impl Iterator<Item = u64> {
    (0..seconds * 60).map(|i| i * 1000 / 60)
}

fn run_shake(classifier: &mut ShakeClassifier, stream: impl Iterator<Item = (u64, f64)>) -> Vec<u64> {
    stream
        .filter_map(|(t, x)| classifier.feed(MotionSample::lateral(x, t)))
        .map(|event| event.timestamp_ms)
        .collect()
}

#[test]
fn test_walking_rhythm_never_shakes() {
    let mut classifier = ShakeClassifier::default();
    let walking = ticks(10).map(|t| {
        let phase = t as f64 / 1000.0 * 2.0 * std::f64::consts::PI * 2.0;
        (t, 8.0 * phase.sin())
    });
    assert!(run_shake(&mut classifier, walking).is_empty());
}

#[test]
fn test_isolated_bumps_never_shake() {
    let mut classifier = ShakeClassifier::default();
    let bumps = ticks(10).map(|t| {
        let x = if t % 500 < 10 { 30.0 } else { 2.0 };
        (t, x)
    });
    assert!(run_shake(&mut classifier, bumps).is_empty());
}

#[test]
fn test_running_below_child_threshold_never_shakes() {
    let mut classifier = ShakeClassifier::default();
    let running = ticks(10).map(|t| {
        let phase = t as f64 / 1000.0 * 2.0 * std::f64::consts::PI * 3.0;
        (t, 15.0 * phase.sin())
    });
    assert!(run_shake(&mut classifier, running).is_empty());
}

#[test]
fn test_adult_threshold_still_honours_cooldown() {
    // Adult threshold: sustained swings may qualify, never faster than the cooldown
    let mut classifier = ShakeClassifier::new(ShakeConfig::adult());
    let running = ticks(10).map(|t| {
        let phase = t as f64 / 1000.0 * 2.0 * std::f64::consts::PI * 3.0;
        (t, 15.0 * phase.sin())
    });
    let events = run_shake(&mut classifier, running);
    for pair in events.windows(2) {
        assert!(pair[1] - pair[0] >= 800);
    }
}

#[test]
fn test_continuous_shaking_respects_cooldown() {
    let mut classifier = ShakeClassifier::default();
    let violent = (0..150u64).map(|i| {
        let x = if i % 2 == 0 { 25.0 } else { -25.0 };
        (i * 20, x)
    });

    let events = run_shake(&mut classifier, violent);
    assert!(events.len() >= 2);
    for pair in events.windows(2) {
        assert!(pair[1] - pair[0] >= 800, "events at {:?}", events);
    }
}

#[test]
fn test_tilt_intensity_monotonic_and_bounded() {
    let classifier = TiltClassifier::default();
    let mut previous = 0.0;

    for beta in 0..=90 {
        let forward = classifier.classify(&OrientationSample::with_beta(beta as f64, 0));
        let backward = classifier.classify(&OrientationSample::with_beta(-(beta as f64), 0));

        assert!((0.0..=1.0).contains(&forward.intensity));
        assert!(forward.intensity >= previous);
        assert_eq!(forward.intensity, backward.intensity);
        previous = forward.intensity;

        if beta < 15 {
            assert_eq!(forward.direction, TiltDirection::Neutral);
        } else if beta > 15 {
            assert_eq!(forward.direction, TiltDirection::Forward);
            assert_eq!(backward.direction, TiltDirection::Backward);
        }
        if beta >= 45 {
            assert_eq!(forward.intensity, 1.0);
        }
    }
}

#[test]
fn test_tilt_throttle_yields_one_state_per_tick() {
    let mut classifier = TiltClassifier::default();
    // 240 Hz input for one second
    let emitted = (0..240u64)
        .filter_map(|i| classifier.feed(&OrientationSample::with_beta(30.0, i * 1000 / 240)))
        .count();
    assert!(emitted <= 1000 / 16 + 1);
    assert!(emitted >= 50);
}

#[test]
fn test_swipe_thresholds() {
    let mut classifier = SwipeClassifier::default();

    // Dominant displacement just short of 100px
    classifier.start(TouchPoint::new(0.0, 0.0, 0));
    assert!(classifier.end(TouchPoint::new(99.0, 0.0, 100)).is_none());

    // Too much drift off the dominant axis
    classifier.start(TouchPoint::new(0.0, 0.0, 0));
    assert!(classifier.end(TouchPoint::new(150.0, 60.0, 100)).is_none());

    // Too slow
    classifier.start(TouchPoint::new(0.0, 0.0, 0));
    assert!(classifier.end(TouchPoint::new(150.0, 0.0, 501)).is_none());

    // Screen y grows downward
    classifier.start(TouchPoint::new(100.0, 100.0, 1_000));
    let swipe = classifier.end(TouchPoint::new(120.0, 260.0, 1_300)).unwrap();
    assert_eq!(swipe.direction, SwipeDirection::Down);
    assert_eq!(swipe.distance, 160.0);
    assert_eq!(swipe.duration_ms, 300);

    // The start was consumed
    assert!(classifier.end(TouchPoint::new(120.0, 400.0, 1_400)).is_none());
}
