use crate::evaluation::{classify, CallPhase, PhaseTag};

#[test]
fn hundred_second_call_uses_fifteen_percent_windows() {
    assert_eq!(classify(14.9, 100.0), CallPhase::Opening);
    assert_eq!(classify(15.0, 100.0), CallPhase::Opening);
    assert_eq!(classify(15.1, 100.0), CallPhase::Middle);
    assert_eq!(classify(84.9, 100.0), CallPhase::Middle);
    assert_eq!(classify(85.0, 100.0), CallPhase::Closing);
    assert_eq!(classify(85.1, 100.0), CallPhase::Closing);
}

#[test]
fn long_calls_cap_windows_at_thirty_seconds() {
    assert_eq!(classify(29.0, 600.0), CallPhase::Opening);
    assert_eq!(classify(31.0, 600.0), CallPhase::Middle);
    assert_eq!(classify(569.0, 600.0), CallPhase::Middle);
    assert_eq!(classify(570.0, 600.0), CallPhase::Closing);
}

#[test]
fn degenerate_durations_resolve_without_panicking() {
    assert_eq!(classify(0.0, 0.0), CallPhase::Opening);
    assert_eq!(classify(1.0, 0.0), CallPhase::Closing);
    assert_eq!(classify(0.0, -10.0), CallPhase::Closing);
    assert_eq!(classify(0.0, f64::NAN), CallPhase::Opening);
}

#[test]
fn all_tag_covers_every_phase() {
    for phase in CallPhase::ordered() {
        assert!(PhaseTag::All.covers(phase));
        assert!(PhaseTag::from(phase).covers(phase));
    }
    assert!(!PhaseTag::Opening.covers(CallPhase::Closing));
}
