//! Thư viện template kịch bản dựng sẵn cho tác giả.

use serde::Serialize;

use crate::{Keyframe, ParameterSnapshot, Scenario, ScenarioError, Timeline};

/// Template có thời lượng chuẩn, được co giãn khi gắn vào ca bệnh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub scenario: Scenario,
}

impl ScenarioTemplate {
    /// Bản sao kịch bản co giãn về `target_duration_seconds`.
    pub fn instantiate(
        &self,
        target_duration_seconds: f64,
        auto_start: bool,
    ) -> Result<Scenario, ScenarioError> {
        Ok(self
            .scenario
            .scaled_to(target_duration_seconds)?
            .with_auto_start(auto_start))
    }
}

pub fn builtin() -> Vec<ScenarioTemplate> {
    vec![septic_shock(), anaphylaxis(), hypoglycemia()]
}

pub fn find(id: &str) -> Result<ScenarioTemplate, ScenarioError> {
    builtin()
        .into_iter()
        .find(|template| template.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| ScenarioError::UnknownTemplate(id.to_string()))
}

fn template(
    id: &'static str,
    title: &'static str,
    duration_seconds: f64,
    keyframes: Vec<Keyframe>,
) -> ScenarioTemplate {
    ScenarioTemplate {
        id,
        title,
        scenario: Scenario {
            timeline: Timeline::from_sorted(keyframes),
            total_duration_seconds: duration_seconds,
            auto_start: false,
            enabled: true,
        },
    }
}

fn keyframe(offset_seconds: f64, label: &str, values: &[(&str, f64)]) -> Keyframe {
    Keyframe::new(
        offset_seconds,
        label,
        values.iter().copied().collect::<ParameterSnapshot>(),
    )
}

fn septic_shock() -> ScenarioTemplate {
    template(
        "septic-shock",
        "Sốc nhiễm khuẩn tiến triển",
        1800.0,
        vec![
            keyframe(
                0.0,
                "Nhập viện",
                &[
                    ("hr", 104.0),
                    ("spo2", 95.0),
                    ("sbp", 108.0),
                    ("dbp", 64.0),
                    ("rr", 22.0),
                    ("temp", 38.6),
                ],
            ),
            keyframe(
                600.0,
                "Tụt huyết áp",
                &[
                    ("hr", 122.0),
                    ("spo2", 93.0),
                    ("sbp", 86.0),
                    ("dbp", 50.0),
                    ("rr", 26.0),
                    ("temp", 39.1),
                ],
            ),
            keyframe(
                1200.0,
                "Sốc",
                &[
                    ("hr", 138.0),
                    ("spo2", 89.0),
                    ("sbp", 68.0),
                    ("dbp", 38.0),
                    ("rr", 32.0),
                    ("temp", 39.4),
                ],
            ),
            keyframe(
                1500.0,
                "Đáp ứng dịch truyền",
                &[
                    ("hr", 112.0),
                    ("spo2", 94.0),
                    ("sbp", 96.0),
                    ("dbp", 58.0),
                    ("rr", 24.0),
                    ("temp", 38.8),
                ],
            ),
        ],
    )
}

fn anaphylaxis() -> ScenarioTemplate {
    template(
        "anaphylaxis",
        "Phản vệ sau dùng kháng sinh",
        900.0,
        vec![
            keyframe(
                0.0,
                "Trước phơi nhiễm",
                &[("hr", 82.0), ("spo2", 98.0), ("sbp", 124.0), ("dbp", 78.0), ("rr", 14.0)],
            ),
            keyframe(
                120.0,
                "Khởi phát",
                &[("hr", 118.0), ("spo2", 92.0), ("sbp", 96.0), ("dbp", 60.0), ("rr", 24.0)],
            ),
            keyframe(
                300.0,
                "Trụy mạch",
                &[("hr", 146.0), ("spo2", 84.0), ("sbp", 66.0), ("dbp", 36.0), ("rr", 31.0)],
            ),
            keyframe(
                300.0,
                "Tiêm adrenaline",
                &[("hr", 152.0), ("spo2", 85.0), ("sbp", 78.0), ("dbp", 44.0), ("rr", 30.0)],
            ),
            keyframe(
                600.0,
                "Hồi phục",
                &[("hr", 104.0), ("spo2", 95.0), ("sbp", 110.0), ("dbp", 68.0), ("rr", 20.0)],
            ),
        ],
    )
}

fn hypoglycemia() -> ScenarioTemplate {
    template(
        "hypoglycemia",
        "Hạ đường huyết ở bệnh nhân đái tháo đường",
        600.0,
        vec![
            keyframe(
                0.0,
                "Lú lẫn",
                &[("hr", 108.0), ("spo2", 97.0), ("sbp", 132.0), ("rr", 18.0), ("glucose", 48.0)],
            ),
            keyframe(
                180.0,
                "Co giật",
                &[("hr", 126.0), ("spo2", 91.0), ("sbp", 148.0), ("rr", 24.0), ("glucose", 32.0)],
            ),
            keyframe(
                360.0,
                "Sau glucose tĩnh mạch",
                &[("hr", 94.0), ("spo2", 97.0), ("sbp", 128.0), ("rr", 16.0), ("glucose", 112.0)],
            ),
        ],
    )
}
