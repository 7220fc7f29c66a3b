//! Gắn cờ cho kết quả xét nghiệm / chẩn đoán hình ảnh khi hoàn tất y lệnh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{classify, Flag, ParameterKey, ReferenceRange};

/// Phân loại kết quả.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Lab,
    Radiology,
}

/// Cờ cho một kết quả, tính một lần lúc trả kết quả.
pub fn assign_flag(value: f64, analyte_range: &ReferenceRange) -> Flag {
    classify(value, analyte_range)
}

/// Kết quả đã hoàn tất; cờ được cố định, không có setter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlaggedResult {
    analyte: String,
    kind: ResultKind,
    value: f64,
    unit: Option<String>,
    range: ReferenceRange,
    flag: Flag,
    resulted_at: DateTime<Utc>,
}

impl FlaggedResult {
    pub fn fulfill(
        analyte: impl Into<String>,
        kind: ResultKind,
        value: f64,
        unit: Option<String>,
        range: ReferenceRange,
        resulted_at: DateTime<Utc>,
    ) -> Self {
        let analyte = analyte.into();
        let flag = assign_flag(value, &range);
        debug!(%analyte, value, %flag, "đã gắn cờ kết quả");
        Self {
            analyte,
            kind,
            value,
            unit,
            range,
            flag,
            resulted_at,
        }
    }

    /// Như [`FlaggedResult::fulfill`] nhưng lấy khoảng từ bảng mặc định;
    /// không có khoảng thì coi như không ràng buộc.
    pub fn fulfill_with_default_range(
        analyte: impl Into<String>,
        kind: ResultKind,
        value: f64,
        unit: Option<String>,
        resulted_at: DateTime<Utc>,
    ) -> Self {
        let analyte = analyte.into();
        let range = default_analyte_range(&analyte).unwrap_or_default();
        Self::fulfill(analyte, kind, value, unit, range, resulted_at)
    }

    pub fn analyte(&self) -> &str {
        &self.analyte
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn range(&self) -> &ReferenceRange {
        &self.range
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn resulted_at(&self) -> DateTime<Utc> {
        self.resulted_at
    }
}

/// Khoảng tham chiếu mặc định cho các xét nghiệm thường gặp (đơn vị quy ước Mỹ).
pub fn default_analyte_range(analyte: &str) -> Option<ReferenceRange> {
    let key = ParameterKey::new(analyte);
    let range = match canonical_analyte(key.as_str())? {
        "potassium" => {
            ReferenceRange::normal(Some(3.5), Some(5.0)).with_critical(Some(2.5), Some(6.5))
        }
        "sodium" => {
            ReferenceRange::normal(Some(135.0), Some(145.0)).with_critical(Some(120.0), Some(160.0))
        }
        "glucose" => {
            ReferenceRange::normal(Some(70.0), Some(140.0)).with_critical(Some(40.0), Some(500.0))
        }
        "lactate" => ReferenceRange::normal(None, Some(2.0)).with_critical(None, Some(4.0)),
        "troponin" => ReferenceRange::normal(None, Some(0.04)).with_critical(None, Some(0.4)),
        "creatinine" => ReferenceRange::normal(Some(0.6), Some(1.3)).with_critical(None, Some(4.0)),
        "hemoglobin" => {
            ReferenceRange::normal(Some(12.0), Some(17.5)).with_critical(Some(7.0), Some(20.0))
        }
        "wbc" => ReferenceRange::normal(Some(4.0), Some(11.0)).with_critical(Some(2.0), Some(30.0)),
        "platelets" => {
            ReferenceRange::normal(Some(150.0), Some(400.0)).with_critical(Some(50.0), Some(1000.0))
        }
        "ph" => ReferenceRange::normal(Some(7.35), Some(7.45)).with_critical(Some(7.2), Some(7.6)),
        "pco2" => {
            ReferenceRange::normal(Some(35.0), Some(45.0)).with_critical(Some(20.0), Some(70.0))
        }
        "po2" => ReferenceRange::normal(Some(80.0), Some(100.0)).with_critical(Some(60.0), None),
        "ejection_fraction" => {
            ReferenceRange::normal(Some(55.0), Some(70.0)).with_critical(Some(30.0), None)
        }
        _ => return None,
    };
    Some(range)
}

fn canonical_analyte(name: &str) -> Option<&'static str> {
    let normalized = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let canonical = match normalized.as_str() {
        "k" | "potassium" | "serum_potassium" => "potassium",
        "na" | "sodium" | "serum_sodium" => "sodium",
        "glucose" | "blood_glucose" | "bg" => "glucose",
        "lactate" | "lactic_acid" => "lactate",
        "troponin" | "troponin_i" | "trop" | "tni" => "troponin",
        "creatinine" | "cr" => "creatinine",
        "hemoglobin" | "haemoglobin" | "hgb" | "hb" => "hemoglobin",
        "wbc" | "white_blood_cells" => "wbc",
        "platelets" | "plt" | "platelet_count" => "platelets",
        "ph" => "ph",
        "pco2" | "paco2" => "pco2",
        "po2" | "pao2" => "po2",
        "ef" | "ejection_fraction" | "lvef" => "ejection_fraction",
        _ => return None,
    };
    Some(canonical)
}
