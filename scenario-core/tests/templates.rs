use scenario_core::templates::{builtin, find};
use scenario_core::{resolve, ScenarioError};

#[test]
fn builtin_templates_are_well_formed() {
    let templates = builtin();
    assert!(!templates.is_empty());
    for template in templates {
        assert!(template.scenario.total_duration_seconds > 0.0, "{}", template.id);
        assert_eq!(template.scenario.timeline.first().offset_seconds, 0.0, "{}", template.id);
        assert!(
            template.scenario.timeline.last_offset() <= template.scenario.total_duration_seconds,
            "{}",
            template.id
        );
        let offsets: Vec<_> = template
            .scenario
            .timeline
            .keyframes()
            .iter()
            .map(|kf| kf.offset_seconds)
            .collect();
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]), "{}", template.id);
    }
}

#[test]
fn instantiate_scales_to_session_duration() {
    let template = find("septic-shock").expect("Thiếu template");
    let scenario = template.instantiate(180.0, true).expect("Không co giãn được");

    assert!(scenario.auto_start);
    assert_eq!(scenario.total_duration_seconds, 180.0);
    assert_eq!(scenario.timeline.len(), template.scenario.timeline.len());
    // 1200s / 1800s * 180s = 120s: trạng thái sốc
    assert_eq!(resolve(&scenario.timeline, 120.0).get("sbp"), Some(68.0));
}

#[test]
fn lookup_is_case_insensitive_and_reports_unknown() {
    assert!(find("ANAPHYLAXIS").is_ok());
    assert_eq!(
        find("nope").map(|t| t.id),
        Err(ScenarioError::UnknownTemplate("nope".to_string()))
    );
}
