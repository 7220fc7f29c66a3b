use scenario_core::{
    progress, resolve, resolve_keyframe, scale, Keyframe, ParameterSnapshot, Timeline,
};

fn hr_timeline(points: &[(f64, f64)]) -> Timeline {
    let keyframes = points
        .iter()
        .enumerate()
        .map(|(index, (offset, hr))| {
            Keyframe::new(
                *offset,
                format!("step-{index}"),
                ParameterSnapshot::new().with("HR", *hr),
            )
        })
        .collect();
    Timeline::new(keyframes).expect("Timeline không hợp lệ")
}

#[test]
fn scaled_template_resolves_middle_step() {
    let template = hr_timeline(&[(0.0, 80.0), (300.0, 110.0), (600.0, 140.0)]);
    let scaled = scale(&template, 600.0, 60.0).expect("Không co giãn được");

    assert_eq!(resolve(&scaled, 45.0).get("hr"), Some(110.0));
    assert_eq!(resolve(&scaled, 29.999).get("hr"), Some(80.0));
    assert_eq!(resolve(&scaled, 30.0).get("hr"), Some(110.0));
    assert_eq!(resolve(&scaled, 60.0).get("hr"), Some(140.0));
}

#[test]
fn holds_last_snapshot_after_completion() {
    let timeline = hr_timeline(&[(0.0, 80.0), (10.0, 120.0)]);
    for elapsed in [10.0, 11.0, 3600.0, 1e15, f64::INFINITY] {
        assert_eq!(resolve(&timeline, elapsed), &timeline.last().snapshot);
    }
}

#[test]
fn before_first_keyframe_uses_first_snapshot() {
    let timeline = hr_timeline(&[(5.0, 80.0), (10.0, 120.0)]);
    assert_eq!(resolve(&timeline, 0.0).get("hr"), Some(80.0));
    assert_eq!(resolve(&timeline, -3.0).get("hr"), Some(80.0));
    assert_eq!(resolve(&timeline, f64::NAN).get("hr"), Some(80.0));
}

#[test]
fn ties_resolve_to_later_keyframe() {
    let timeline = hr_timeline(&[(0.0, 80.0), (20.0, 100.0), (20.0, 150.0), (40.0, 90.0)]);
    let active = resolve_keyframe(&timeline, 20.0);
    assert_eq!(active.index, 2);
    assert_eq!(active.keyframe.label, "step-2");
    assert_eq!(resolve(&timeline, 25.0).get("hr"), Some(150.0));
}

#[test]
fn resolve_is_idempotent() {
    let timeline = hr_timeline(&[(0.0, 80.0), (30.0, 110.0), (60.0, 140.0)]);
    let before = timeline.clone();
    for elapsed in [0.0, 15.0, 30.0, 59.0, 90.0] {
        let first = resolve(&timeline, elapsed).clone();
        let second = resolve(&timeline, elapsed).clone();
        assert_eq!(first, second);
    }
    assert_eq!(timeline, before);
}

#[test]
fn values_step_without_interpolation() {
    let timeline = hr_timeline(&[(0.0, 80.0), (100.0, 180.0)]);
    assert_eq!(resolve(&timeline, 50.0).get("hr"), Some(80.0));
    assert_eq!(resolve(&timeline, 99.0).get("hr"), Some(80.0));
}

#[test]
fn progress_is_clamped() {
    assert_eq!(progress(0.0, 60.0), 0.0);
    assert_eq!(progress(30.0, 60.0), 0.5);
    assert_eq!(progress(120.0, 60.0), 1.0);
    assert_eq!(progress(f64::NAN, 60.0), 0.0);
    assert_eq!(progress(10.0, 0.0), 0.0);
}

#[test]
fn snapshot_keys_are_case_insensitive() {
    let snapshot = ParameterSnapshot::new().with(" SpO2 ", 97.0);
    assert_eq!(snapshot.get("spo2"), Some(97.0));
    assert_eq!(snapshot.get("SPO2"), Some(97.0));
    assert_eq!(snapshot.len(), 1);

    let json = serde_json::to_string(&snapshot).expect("Không serialize snapshot");
    assert_eq!(json, r#"{"spo2":97.0}"#);
}
