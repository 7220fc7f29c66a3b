//! Logic lõi của kịch bản mô phỏng: mô hình dữ liệu, phân loại ngưỡng,
//! co giãn timeline và tra cứu chỉ số theo thời gian.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod alarm;
pub mod classify;
pub mod playback;
pub mod results;
pub mod scale;
pub mod templates;

pub use alarm::{default_vital_range, AlarmConfig, AlarmLimit};
pub use classify::classify;
pub use playback::{progress, resolve, resolve_keyframe, ActiveKeyframe};
pub use results::{assign_flag, default_analyte_range, FlaggedResult, ResultKind};
pub use scale::scale;
pub use templates::ScenarioTemplate;

/// Mức cờ khi so một giá trị với khoảng tham chiếu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    #[default]
    Normal,
    Low,
    High,
    CriticalLow,
    CriticalHigh,
}

impl Flag {
    /// Khác `Normal`.
    pub fn is_abnormal(self) -> bool {
        self != Flag::Normal
    }

    pub fn is_critical(self) -> bool {
        matches!(self, Flag::CriticalLow | Flag::CriticalHigh)
    }

    /// Bậc nghiêm trọng dùng để sắp xếp hiển thị (0 = bình thường, 2 = nguy kịch).
    pub fn severity_rank(self) -> u8 {
        match self {
            Flag::Normal => 0,
            Flag::Low | Flag::High => 1,
            Flag::CriticalLow | Flag::CriticalHigh => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Normal => "normal",
            Flag::Low => "low",
            Flag::High => "high",
            Flag::CriticalLow => "critical_low",
            Flag::CriticalHigh => "critical_high",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Khoảng tham chiếu; mỗi cận có thể vắng mặt (không giới hạn phía đó).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ReferenceRange {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub critical_low: Option<f64>,
    #[serde(default)]
    pub critical_high: Option<f64>,
}

impl ReferenceRange {
    /// Khoảng không ràng buộc: mọi giá trị đều `Normal`.
    pub const fn unbounded() -> Self {
        Self {
            low: None,
            high: None,
            critical_low: None,
            critical_high: None,
        }
    }

    pub const fn normal(low: Option<f64>, high: Option<f64>) -> Self {
        Self {
            low,
            high,
            critical_low: None,
            critical_high: None,
        }
    }

    pub const fn with_critical(
        self,
        critical_low: Option<f64>,
        critical_high: Option<f64>,
    ) -> Self {
        Self {
            low: self.low,
            high: self.high,
            critical_low,
            critical_high,
        }
    }

    /// Kiểm tra bất biến: `low <= high`, cận nguy kịch không hẹp hơn cận thường.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let bounds = [
            ("low", self.low),
            ("high", self.high),
            ("critical_low", self.critical_low),
            ("critical_high", self.critical_high),
        ];
        for (name, bound) in bounds {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(ScenarioError::InvalidRange(format!(
                        "{name} không hữu hạn ({value})"
                    )));
                }
            }
        }

        if let (Some(low), Some(high)) = (self.low, self.high) {
            if low > high {
                return Err(ScenarioError::InvalidRange(format!(
                    "low {low} lớn hơn high {high}"
                )));
            }
        }
        if let (Some(critical_low), Some(low)) = (self.critical_low, self.low) {
            if critical_low > low {
                return Err(ScenarioError::InvalidRange(format!(
                    "critical_low {critical_low} lớn hơn low {low}"
                )));
            }
        }
        if let (Some(critical_high), Some(high)) = (self.critical_high, self.high) {
            if critical_high < high {
                return Err(ScenarioError::InvalidRange(format!(
                    "critical_high {critical_high} nhỏ hơn high {high}"
                )));
            }
        }
        Ok(())
    }

    pub fn validated(self) -> Result<Self, ScenarioError> {
        self.validate()?;
        Ok(self)
    }

    pub fn is_unbounded(&self) -> bool {
        self.low.is_none()
            && self.high.is_none()
            && self.critical_low.is_none()
            && self.critical_high.is_none()
    }
}

/// Khóa tham số (HR, SpO2, tên xét nghiệm...), không phân biệt hoa thường.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ParameterKey(String);

impl ParameterKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ParameterKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ParameterKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ParameterKey> for String {
    fn from(key: ParameterKey) -> Self {
        key.0
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Giá trị các tham số tại một thời điểm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSnapshot {
    values: BTreeMap<ParameterKey, f64>,
}

impl ParameterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thêm giá trị theo kiểu builder.
    pub fn with(mut self, key: impl Into<ParameterKey>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<ParameterKey>, value: f64) -> Option<f64> {
        self.values.insert(key.into(), value)
    }

    /// Tra cứu theo tên bất kể hoa thường.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(&ParameterKey::new(key)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, f64)> + '_ {
        self.values.iter().map(|(key, value)| (key, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<ParameterKey>> FromIterator<(K, f64)> for ParameterSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

/// Một mốc do tác giả kịch bản định nghĩa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub offset_seconds: f64,
    pub label: String,
    pub snapshot: ParameterSnapshot,
}

impl Keyframe {
    pub fn new(offset_seconds: f64, label: impl Into<String>, snapshot: ParameterSnapshot) -> Self {
        Self {
            offset_seconds,
            label: label.into(),
            snapshot,
        }
    }
}

/// Chuỗi keyframe đã sắp xếp, luôn có ít nhất một phần tử.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
}

impl Timeline {
    /// Kiểm tra timeline không rỗng, offset hữu hạn, không âm và không giảm.
    pub fn new(keyframes: Vec<Keyframe>) -> Result<Self, ScenarioError> {
        if keyframes.is_empty() {
            return Err(ScenarioError::EmptyTimeline);
        }

        let mut previous = 0.0_f64;
        for (index, keyframe) in keyframes.iter().enumerate() {
            let offset = keyframe.offset_seconds;
            if !offset.is_finite() || offset < 0.0 {
                return Err(ScenarioError::InvalidOffset { index, offset });
            }
            if index > 0 && offset < previous {
                return Err(ScenarioError::UnsortedTimeline {
                    index,
                    offset,
                    previous,
                });
            }
            previous = offset;
        }

        Ok(Self { keyframes })
    }

    /// Dành cho dữ liệu đã biết là hợp lệ (kết quả scale, template dựng sẵn).
    pub(crate) fn from_sorted(keyframes: Vec<Keyframe>) -> Self {
        debug_assert!(!keyframes.is_empty());
        Self { keyframes }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn first(&self) -> &Keyframe {
        &self.keyframes[0]
    }

    pub fn last(&self) -> &Keyframe {
        &self.keyframes[self.keyframes.len() - 1]
    }

    pub fn last_offset(&self) -> f64 {
        self.last().offset_seconds
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Luôn `false`; giữ cho đối xứng với `len`.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

impl TryFrom<Vec<Keyframe>> for Timeline {
    type Error = ScenarioError;

    fn try_from(keyframes: Vec<Keyframe>) -> Result<Self, Self::Error> {
        Timeline::new(keyframes)
    }
}

impl From<Timeline> for Vec<Keyframe> {
    fn from(timeline: Timeline) -> Self {
        timeline.keyframes
    }
}

/// Kịch bản gắn với một ca bệnh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ScenarioData")]
pub struct Scenario {
    pub timeline: Timeline,
    pub total_duration_seconds: f64,
    pub auto_start: bool,
    pub enabled: bool,
}

/// Dạng JSON của [`Scenario`] trước khi kiểm tra thời lượng.
#[derive(Deserialize)]
struct ScenarioData {
    timeline: Timeline,
    total_duration_seconds: f64,
    #[serde(default)]
    auto_start: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

impl TryFrom<ScenarioData> for Scenario {
    type Error = ScenarioError;

    fn try_from(data: ScenarioData) -> Result<Self, Self::Error> {
        let scenario = Scenario {
            timeline: data.timeline,
            total_duration_seconds: data.total_duration_seconds,
            auto_start: data.auto_start,
            enabled: data.enabled,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}

fn default_enabled() -> bool {
    true
}

impl Scenario {
    pub fn new(timeline: Timeline, total_duration_seconds: f64) -> Result<Self, ScenarioError> {
        scale::ensure_duration(total_duration_seconds)?;
        Ok(Self {
            timeline,
            total_duration_seconds,
            auto_start: false,
            enabled: true,
        })
    }

    /// Thời lượng phải hữu hạn và dương; timeline đã được kiểm tra khi tạo.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        scale::ensure_duration(self.total_duration_seconds)
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Bản sao riêng cho một phiên, co giãn về thời lượng mục tiêu.
    pub fn scaled_to(&self, target_duration_seconds: f64) -> Result<Scenario, ScenarioError> {
        let timeline = scale(
            &self.timeline,
            self.total_duration_seconds,
            target_duration_seconds,
        )?;
        Ok(Scenario {
            timeline,
            total_duration_seconds: target_duration_seconds,
            auto_start: self.auto_start,
            enabled: self.enabled,
        })
    }
}

/// Lỗi chung của engine kịch bản.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Timeline không có keyframe nào")]
    EmptyTimeline,
    #[error("Thời lượng không hợp lệ: {0}")]
    InvalidDuration(f64),
    #[error("Offset không hợp lệ tại keyframe {index}: {offset}")]
    InvalidOffset { index: usize, offset: f64 },
    #[error("Keyframe {index} có offset {offset} nhỏ hơn keyframe trước ({previous})")]
    UnsortedTimeline {
        index: usize,
        offset: f64,
        previous: f64,
    },
    #[error("Khoảng tham chiếu không hợp lệ: {0}")]
    InvalidRange(String),
    #[error("Không tìm thấy template: {0}")]
    UnknownTemplate(String),
}
