//! Tra cứu snapshot đang hiệu lực tại một thời điểm đã trôi qua.
//!
//! Hàm bậc thang: giá trị nhảy rời rạc giữa các keyframe, không nội suy.

use serde::Serialize;
use tracing::warn;

use crate::{Keyframe, ParameterSnapshot, Timeline};

/// Keyframe đang hiệu lực cùng vị trí của nó trong timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveKeyframe<'a> {
    pub index: usize,
    pub keyframe: &'a Keyframe,
}

/// Snapshot của keyframe cuối cùng có `offset_seconds <= elapsed_seconds`.
///
/// Trước keyframe đầu trả về snapshot đầu; sau keyframe cuối giữ nguyên
/// snapshot cuối. Các keyframe trùng offset lấy keyframe xuất hiện sau.
pub fn resolve(timeline: &Timeline, elapsed_seconds: f64) -> &ParameterSnapshot {
    &resolve_keyframe(timeline, elapsed_seconds).keyframe.snapshot
}

pub fn resolve_keyframe(timeline: &Timeline, elapsed_seconds: f64) -> ActiveKeyframe<'_> {
    let index = active_index(timeline, elapsed_seconds);
    ActiveKeyframe {
        index,
        keyframe: &timeline.keyframes()[index],
    }
}

/// Tỉ lệ hoàn thành trong `[0, 1]`.
pub fn progress(elapsed_seconds: f64, total_duration_seconds: f64) -> f64 {
    if !elapsed_seconds.is_finite() || total_duration_seconds <= 0.0 {
        return 0.0;
    }
    (elapsed_seconds / total_duration_seconds).clamp(0.0, 1.0)
}

fn active_index(timeline: &Timeline, elapsed_seconds: f64) -> usize {
    if elapsed_seconds.is_nan() {
        warn!("elapsed_seconds là NaN, dùng keyframe đầu");
        return 0;
    }

    timeline
        .keyframes()
        .partition_point(|keyframe| keyframe.offset_seconds <= elapsed_seconds)
        .saturating_sub(1)
}
