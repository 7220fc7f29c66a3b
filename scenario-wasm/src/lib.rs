//! Bridge WASM <-> JavaScript cho console mô phỏng.

use scenario_core::templates;
use scenario_core::{
    assign_flag, classify, default_analyte_range, resolve_keyframe, scale, ReferenceRange,
    ScenarioError, Timeline,
};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

/// Khoảng tham chiếu phía JS; nhận cả `critical_low` lẫn `criticalLow`.
#[derive(Deserialize)]
struct JsReferenceRange {
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default, alias = "criticalLow")]
    critical_low: Option<f64>,
    #[serde(default, alias = "criticalHigh")]
    critical_high: Option<f64>,
}

impl From<JsReferenceRange> for ReferenceRange {
    fn from(range: JsReferenceRange) -> Self {
        ReferenceRange {
            low: range.low,
            high: range.high,
            critical_low: range.critical_low,
            critical_high: range.critical_high,
        }
    }
}

#[derive(Serialize)]
struct JsResolved<'a> {
    index: usize,
    label: &'a str,
    snapshot: &'a scenario_core::ParameterSnapshot,
}

#[derive(Serialize)]
struct JsTemplateSummary {
    id: &'static str,
    title: &'static str,
    duration_seconds: f64,
    keyframes: usize,
}

#[wasm_bindgen]
pub fn scale_timeline(
    timeline: JsValue,
    template_duration_seconds: f64,
    target_duration_seconds: f64,
) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let timeline = read_timeline(timeline)?;
    let scaled = scale(&timeline, template_duration_seconds, target_duration_seconds)
        .map_err(|err| JsValue::from_str(&format_scenario_error(err)))?;

    to_js(&scaled, "timeline")
}

#[wasm_bindgen]
pub fn resolve_snapshot(timeline: JsValue, elapsed_seconds: f64) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let timeline = read_timeline(timeline)?;
    let active = resolve_keyframe(&timeline, elapsed_seconds);
    let resolved = JsResolved {
        index: active.index,
        label: &active.keyframe.label,
        snapshot: &active.keyframe.snapshot,
    };

    to_js(&resolved, "snapshot")
}

/// Trả về nhãn cờ (`normal`, `low`, `high`, `critical_low`, `critical_high`).
#[wasm_bindgen]
pub fn classify_value(value: f64, range: JsValue) -> Result<String, JsValue> {
    let range = read_range(range)?;
    Ok(classify(value, &range).as_str().to_string())
}

/// Gắn cờ lúc trả kết quả xét nghiệm; không truyền `range` thì dùng bảng mặc định.
#[wasm_bindgen]
pub fn assign_result_flag(
    analyte: &str,
    value: f64,
    range: Option<JsValue>,
) -> Result<String, JsValue> {
    let range = match range {
        Some(js_range) if !js_range.is_null() && !js_range.is_undefined() => read_range(js_range)?,
        _ => default_analyte_range(analyte).unwrap_or_default(),
    };
    Ok(assign_flag(value, &range).as_str().to_string())
}

#[wasm_bindgen]
pub fn list_templates() -> Result<JsValue, JsValue> {
    let summaries: Vec<JsTemplateSummary> = templates::builtin()
        .into_iter()
        .map(|template| JsTemplateSummary {
            id: template.id,
            title: template.title,
            duration_seconds: template.scenario.total_duration_seconds,
            keyframes: template.scenario.timeline.len(),
        })
        .collect();

    to_js(&summaries, "template")
}

#[wasm_bindgen]
pub fn instantiate_template(
    id: &str,
    target_duration_seconds: f64,
    auto_start: bool,
) -> Result<JsValue, JsValue> {
    init_panic_hook();

    let scenario = templates::find(id)
        .and_then(|template| template.instantiate(target_duration_seconds, auto_start))
        .map_err(|err| JsValue::from_str(&format_scenario_error(err)))?;

    to_js(&scenario, "kịch bản")
}

fn read_timeline(timeline: JsValue) -> Result<Timeline, JsValue> {
    from_value::<Timeline>(timeline)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được timeline: {err}")))
}

fn read_range(range: JsValue) -> Result<ReferenceRange, JsValue> {
    let range: JsReferenceRange = from_value(range)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được khoảng tham chiếu: {err}")))?;
    Ok(ReferenceRange::from(range))
}

// Map trả về dạng object thường thay vì `Map` của JS.
fn to_js<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Không serialize {what}: {err}")))
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn format_scenario_error(err: ScenarioError) -> String {
    format!("Scenario error: {err}")
}
