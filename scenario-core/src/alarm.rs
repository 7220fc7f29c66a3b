//! Ngưỡng báo động cho chỉ số sống và bảng giá trị mặc định.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ParameterKey, ReferenceRange, ScenarioError};

pub const HEART_RATE: &str = "hr";
pub const SPO2: &str = "spo2";
pub const SYSTOLIC_BP: &str = "sbp";
pub const DIASTOLIC_BP: &str = "dbp";
pub const MEAN_ARTERIAL_PRESSURE: &str = "map";
pub const RESPIRATORY_RATE: &str = "rr";
pub const TEMPERATURE: &str = "temp";
pub const ETCO2: &str = "etco2";

/// Ngưỡng do ca bệnh cấu hình cho một tham số.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlarmLimit {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for AlarmLimit {
    fn default() -> Self {
        Self {
            enabled: true,
            low: None,
            high: None,
        }
    }
}

impl AlarmLimit {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn between(low: f64, high: f64) -> Self {
        Self {
            enabled: true,
            low: Some(low),
            high: Some(high),
        }
    }

    /// Ghi đè cận thường của `base`; cận nguy kịch chỉ được giữ khi vẫn
    /// không hẹp hơn cận thường mới.
    fn apply_to(&self, base: ReferenceRange) -> ReferenceRange {
        let low = self.low.or(base.low);
        let high = self.high.or(base.high);
        let critical_low = base
            .critical_low
            .filter(|critical| low.map_or(true, |low| *critical <= low));
        let critical_high = base
            .critical_high
            .filter(|critical| high.map_or(true, |high| *critical >= high));

        ReferenceRange {
            low,
            high,
            critical_low,
            critical_high,
        }
    }
}

/// Cấu hình báo động của ca bệnh, chỉ đọc trong suốt phiên.
///
/// Tham số không có trong cấu hình dùng bảng mặc định ([`default_vital_range`]).
/// Khóa chỉ số sống được quy về tên chuẩn (`heart_rate` -> `hr`) nên cấu hình
/// và snapshot có thể dùng bí danh khác nhau.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(
    from = "BTreeMap<ParameterKey, AlarmLimit>",
    into = "BTreeMap<ParameterKey, AlarmLimit>"
)]
pub struct AlarmConfig {
    limits: BTreeMap<ParameterKey, AlarmLimit>,
}

impl AlarmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, key: impl Into<ParameterKey>, limit: AlarmLimit) -> Self {
        self.limits.insert(alarm_key(&key.into()), limit);
        self
    }

    pub fn limit(&self, key: &ParameterKey) -> Option<&AlarmLimit> {
        self.limits.get(&alarm_key(key))
    }

    /// Kiểm tra lúc nạp cấu hình; lỗi ở đây không bao giờ tới engine đang chạy.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (key, limit) in &self.limits {
            if !limit.enabled {
                continue;
            }
            let Some(range) = self.effective_range(key) else {
                continue;
            };
            range.validate().map_err(|err| match err {
                ScenarioError::InvalidRange(reason) => {
                    ScenarioError::InvalidRange(format!("{key}: {reason}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Khoảng dùng để phân loại `key`, hoặc `None` nếu tham số không được theo dõi.
    pub fn effective_range(&self, key: &ParameterKey) -> Option<ReferenceRange> {
        let default = default_vital_range(key);
        match self.limit(key) {
            Some(limit) if !limit.enabled => None,
            Some(limit) => Some(limit.apply_to(default.unwrap_or_default())),
            None => default,
        }
    }
}

impl From<BTreeMap<ParameterKey, AlarmLimit>> for AlarmConfig {
    fn from(limits: BTreeMap<ParameterKey, AlarmLimit>) -> Self {
        limits
            .into_iter()
            .fold(Self::new(), |config, (key, limit)| config.with_limit(key, limit))
    }
}

impl From<AlarmConfig> for BTreeMap<ParameterKey, AlarmLimit> {
    fn from(config: AlarmConfig) -> Self {
        config.limits
    }
}

fn alarm_key(key: &ParameterKey) -> ParameterKey {
    match canonical_vital(key.as_str()) {
        Some(canonical) => ParameterKey::from(canonical),
        None => key.clone(),
    }
}

/// Bảng ngưỡng mặc định cho người lớn.
pub fn default_vital_range(key: &ParameterKey) -> Option<ReferenceRange> {
    let range = match canonical_vital(key.as_str())? {
        HEART_RATE => {
            ReferenceRange::normal(Some(60.0), Some(100.0)).with_critical(Some(40.0), Some(150.0))
        }
        SPO2 => ReferenceRange::normal(Some(94.0), None).with_critical(Some(85.0), None),
        SYSTOLIC_BP => {
            ReferenceRange::normal(Some(90.0), Some(140.0)).with_critical(Some(70.0), Some(200.0))
        }
        DIASTOLIC_BP => {
            ReferenceRange::normal(Some(60.0), Some(90.0)).with_critical(Some(40.0), Some(120.0))
        }
        MEAN_ARTERIAL_PRESSURE => {
            ReferenceRange::normal(Some(65.0), Some(110.0)).with_critical(Some(50.0), Some(130.0))
        }
        RESPIRATORY_RATE => {
            ReferenceRange::normal(Some(12.0), Some(20.0)).with_critical(Some(8.0), Some(30.0))
        }
        TEMPERATURE => {
            ReferenceRange::normal(Some(36.0), Some(38.0)).with_critical(Some(35.0), Some(40.0))
        }
        ETCO2 => {
            ReferenceRange::normal(Some(35.0), Some(45.0)).with_critical(Some(25.0), Some(60.0))
        }
        _ => return None,
    };
    Some(range)
}

fn canonical_vital(key: &str) -> Option<&'static str> {
    match key {
        "hr" | "heart_rate" | "heart rate" | "pulse" => Some(HEART_RATE),
        "spo2" | "sp02" | "oxygen_saturation" => Some(SPO2),
        "sbp" | "bp_sys" | "systolic" | "systolic_bp" => Some(SYSTOLIC_BP),
        "dbp" | "bp_dia" | "diastolic" | "diastolic_bp" => Some(DIASTOLIC_BP),
        "map" | "mean_arterial_pressure" => Some(MEAN_ARTERIAL_PRESSURE),
        "rr" | "resp_rate" | "respiratory_rate" => Some(RESPIRATORY_RATE),
        "temp" | "temperature" => Some(TEMPERATURE),
        "etco2" | "end_tidal_co2" => Some(ETCO2),
        _ => None,
    }
}
