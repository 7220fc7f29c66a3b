//! Phân loại giá trị theo khoảng tham chiếu.

use tracing::warn;

use crate::{Flag, ReferenceRange};

/// Xếp loại `value` theo `range`, mức nặng nhất thắng.
///
/// Thứ tự ưu tiên: `CriticalLow` (`value <= critical_low`), `CriticalHigh`
/// (`value >= critical_high`), `Low` (`value < low`), `High` (`value > high`),
/// còn lại là `Normal`. Khoảng bình thường tính cả hai đầu.
///
/// Giá trị NaN hoặc vô hạn được coi là `Normal` và chỉ ghi log, không trả lỗi.
pub fn classify(value: f64, range: &ReferenceRange) -> Flag {
    if !value.is_finite() {
        warn!(value, ?range, "giá trị không hữu hạn, xếp loại normal");
        return Flag::Normal;
    }

    if matches!(range.critical_low, Some(limit) if value <= limit) {
        return Flag::CriticalLow;
    }
    if matches!(range.critical_high, Some(limit) if value >= limit) {
        return Flag::CriticalHigh;
    }
    if matches!(range.low, Some(limit) if value < limit) {
        return Flag::Low;
    }
    if matches!(range.high, Some(limit) if value > limit) {
        return Flag::High;
    }

    Flag::Normal
}
