use std::fs;

use pretty_assertions::assert_eq;
use scenario_core::{scale, Keyframe, ParameterSnapshot, Scenario, ScenarioError, Timeline};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn load_fixture() -> Scenario {
    let raw = fs::read_to_string(fixture_path("tachycardia_template.json"))
        .expect("Không đọc được template mẫu");
    serde_json::from_str(&raw).expect("Template mẫu không hợp lệ")
}

fn offsets(timeline: &Timeline) -> Vec<f64> {
    timeline.keyframes().iter().map(|kf| kf.offset_seconds).collect()
}

fn timeline_at(offsets: &[f64]) -> Timeline {
    let keyframes = offsets
        .iter()
        .enumerate()
        .map(|(index, offset)| {
            Keyframe::new(
                *offset,
                format!("kf-{index}"),
                ParameterSnapshot::new().with("hr", index as f64),
            )
        })
        .collect();
    Timeline::new(keyframes).expect("Timeline không hợp lệ")
}

#[test]
fn scales_template_to_shorter_session() {
    let template = load_fixture();
    let scaled = scale(&template.timeline, 600.0, 60.0).expect("Không co giãn được");

    assert_eq!(offsets(&scaled), vec![0.0, 30.0, 60.0]);
    let labels: Vec<_> = scaled.keyframes().iter().map(|kf| kf.label.as_str()).collect();
    assert_eq!(labels, vec!["Baseline", "Tachycardia", "Decompensation"]);
    assert_eq!(scaled.keyframes()[1].snapshot, template.timeline.keyframes()[1].snapshot);
}

#[test]
fn scaling_to_same_duration_is_identity() {
    let timeline = timeline_at(&[0.0, 17.0, 250.0, 599.0, 600.0]);
    let scaled = scale(&timeline, 600.0, 600.0).expect("Không co giãn được");
    assert_eq!(scaled, timeline);
}

#[test]
fn preserves_count_and_order_for_many_ratios() {
    let timeline = timeline_at(&[0.0, 1.0, 2.0, 3.0, 10.0, 10.0, 333.0, 900.0]);
    for (from, to) in [(900.0, 1.0), (900.0, 7.0), (900.0, 61.0), (900.0, 3600.0), (1.5, 2.5)] {
        let scaled = scale(&timeline, from, to).expect("Không co giãn được");
        assert_eq!(scaled.len(), timeline.len());
        let scaled_offsets = offsets(&scaled);
        assert!(
            scaled_offsets.windows(2).all(|pair| pair[0] <= pair[1]),
            "offset bị đảo thứ tự khi co giãn {from} -> {to}: {scaled_offsets:?}"
        );
    }
}

#[test]
fn collapsed_keyframes_are_kept_in_author_order() {
    let timeline = timeline_at(&[0.0, 100.0, 104.0, 600.0]);
    let scaled = scale(&timeline, 600.0, 6.0).expect("Không co giãn được");

    assert_eq!(offsets(&scaled), vec![0.0, 1.0, 1.0, 6.0]);
    let labels: Vec<_> = scaled.keyframes().iter().map(|kf| kf.label.as_str()).collect();
    assert_eq!(labels, vec!["kf-0", "kf-1", "kf-2", "kf-3"]);
}

#[test]
fn ties_round_half_up() {
    // 150 * 10 / 600 = 2.5 -> 3; 90 * 10 / 600 = 1.5 -> 2; 84 * 10 / 600 = 1.4 -> 1
    let timeline = timeline_at(&[0.0, 84.0, 90.0, 150.0]);
    let scaled = scale(&timeline, 600.0, 10.0).expect("Không co giãn được");
    assert_eq!(offsets(&scaled), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn first_keyframe_is_normalized_to_zero() {
    let timeline = timeline_at(&[30.0, 300.0]);
    let scaled = scale(&timeline, 600.0, 600.0).expect("Không co giãn được");
    assert_eq!(offsets(&scaled), vec![0.0, 300.0]);
}

#[test]
fn rejects_invalid_durations() {
    let timeline = timeline_at(&[0.0, 10.0]);
    assert_eq!(scale(&timeline, 0.0, 60.0), Err(ScenarioError::InvalidDuration(0.0)));
    assert_eq!(scale(&timeline, 60.0, -5.0), Err(ScenarioError::InvalidDuration(-5.0)));
    assert!(matches!(
        scale(&timeline, f64::NAN, 60.0),
        Err(ScenarioError::InvalidDuration(_))
    ));
}

#[test]
fn empty_timeline_is_rejected() {
    assert_eq!(Timeline::new(Vec::new()), Err(ScenarioError::EmptyTimeline));

    let raw = fs::read_to_string(fixture_path("empty_timeline.json"))
        .expect("Không đọc được fixture");
    let err = serde_json::from_str::<Scenario>(&raw).expect_err("Timeline rỗng phải bị từ chối");
    assert!(err.to_string().contains("keyframe"), "{err}");
}

#[test]
fn unsorted_or_negative_offsets_are_rejected() {
    let snapshot = ParameterSnapshot::new();
    let unsorted = Timeline::new(vec![
        Keyframe::new(0.0, "a", snapshot.clone()),
        Keyframe::new(20.0, "b", snapshot.clone()),
        Keyframe::new(10.0, "c", snapshot.clone()),
    ]);
    assert_eq!(
        unsorted,
        Err(ScenarioError::UnsortedTimeline {
            index: 2,
            offset: 10.0,
            previous: 20.0
        })
    );

    let negative = Timeline::new(vec![Keyframe::new(-1.0, "a", snapshot)]);
    assert_eq!(
        negative,
        Err(ScenarioError::InvalidOffset {
            index: 0,
            offset: -1.0
        })
    );
}

#[test]
fn scenario_scaled_to_keeps_flags() {
    let template = load_fixture();
    assert!(template.auto_start);
    assert!(template.enabled);

    let session = template.scaled_to(120.0).expect("Không co giãn được");
    assert_eq!(session.total_duration_seconds, 120.0);
    assert!(session.auto_start);
    assert_eq!(offsets(&session.timeline), vec![0.0, 60.0, 120.0]);
    // Bản gốc không bị thay đổi.
    assert_eq!(offsets(&template.timeline), vec![0.0, 300.0, 600.0]);
}

#[test]
fn scenario_json_with_bad_duration_is_rejected() {
    let raw = fs::read_to_string(fixture_path("negative_duration.json"))
        .expect("Không đọc được fixture");
    let err = serde_json::from_str::<Scenario>(&raw).expect_err("Thời lượng âm phải bị từ chối");
    assert!(err.to_string().contains("Thời lượng không hợp lệ"), "{err}");

    let zero = raw.replace("-5", "0");
    assert!(serde_json::from_str::<Scenario>(&zero).is_err());
}

#[test]
fn overflowing_offsets_are_rejected() {
    let timeline = timeline_at(&[0.0, 1e308]);
    assert_eq!(
        scale(&timeline, 1.0, 100.0),
        Err(ScenarioError::InvalidOffset {
            index: 1,
            offset: f64::INFINITY
        })
    );
}
