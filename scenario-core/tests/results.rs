use chrono::{TimeZone, Utc};
use scenario_core::{default_analyte_range, Flag, FlaggedResult, ReferenceRange, ResultKind};

#[test]
fn fulfilled_result_freezes_flag() {
    let resulted_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
    let range = ReferenceRange::normal(Some(3.5), Some(5.0)).with_critical(Some(2.5), Some(6.5));
    let result = FlaggedResult::fulfill(
        "Potassium",
        ResultKind::Lab,
        6.8,
        Some("mmol/L".to_string()),
        range,
        resulted_at,
    );

    assert_eq!(result.flag(), Flag::CriticalHigh);
    assert_eq!(result.analyte(), "Potassium");
    assert_eq!(result.unit(), Some("mmol/L"));
    assert_eq!(result.resulted_at(), resulted_at);

    let json = serde_json::to_value(&result).expect("Không serialize kết quả");
    assert_eq!(json["flag"], "critical_high");
    assert_eq!(json["kind"], "lab");
}

#[test]
fn default_analyte_table_handles_aliases() {
    assert_eq!(default_analyte_range("K"), default_analyte_range("potassium"));
    assert_eq!(default_analyte_range("Lactic acid"), default_analyte_range("lactate"));
    assert_eq!(default_analyte_range("Troponin-I"), default_analyte_range("troponin"));
    assert!(default_analyte_range("unobtainium").is_none());
}

#[test]
fn default_range_results() {
    let resulted_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let lactate = FlaggedResult::fulfill_with_default_range(
        "Lactate",
        ResultKind::Lab,
        3.2,
        None,
        resulted_at,
    );
    assert_eq!(lactate.flag(), Flag::High);

    let ef = FlaggedResult::fulfill_with_default_range(
        "LVEF",
        ResultKind::Radiology,
        25.0,
        None,
        resulted_at,
    );
    assert_eq!(ef.flag(), Flag::CriticalLow);
    assert_eq!(ef.kind(), ResultKind::Radiology);

    let unknown = FlaggedResult::fulfill_with_default_range(
        "Ferritin",
        ResultKind::Lab,
        9000.0,
        None,
        resulted_at,
    );
    assert_eq!(unknown.flag(), Flag::Normal);
    assert!(unknown.range().is_unbounded());
}

#[test]
fn default_tables_are_valid() {
    for analyte in [
        "potassium", "sodium", "glucose", "lactate", "troponin", "creatinine", "hemoglobin", "wbc",
        "platelets", "ph", "pco2", "po2", "ejection_fraction",
    ] {
        let range = default_analyte_range(analyte).expect("Thiếu khoảng mặc định");
        assert!(range.validate().is_ok(), "{analyte}");
    }
}
