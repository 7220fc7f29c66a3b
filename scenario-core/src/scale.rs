//! Co giãn timeline mẫu về thời lượng của phiên.

use tracing::debug;

use crate::{Keyframe, ScenarioError, Timeline};

/// Co giãn offset của `template` từ `template_duration_seconds` sang
/// `target_duration_seconds`.
///
/// Offset mới được làm tròn tới giây gần nhất (0.5 làm tròn lên); keyframe đầu
/// luôn về 0. Nhãn và snapshot giữ nguyên, số keyframe không đổi. Hai keyframe
/// trùng offset sau khi làm tròn vẫn được giữ theo thứ tự gốc.
pub fn scale(
    template: &Timeline,
    template_duration_seconds: f64,
    target_duration_seconds: f64,
) -> Result<Timeline, ScenarioError> {
    ensure_duration(template_duration_seconds)?;
    ensure_duration(target_duration_seconds)?;

    let keyframes = template
        .keyframes()
        .iter()
        .enumerate()
        .map(|(index, keyframe)| {
            let offset_seconds = if index == 0 {
                0.0
            } else {
                round_half_up(
                    keyframe.offset_seconds * target_duration_seconds / template_duration_seconds,
                )
            };
            // Tỉ lệ quá lớn có thể tràn thành vô cực.
            if !offset_seconds.is_finite() {
                return Err(ScenarioError::InvalidOffset {
                    index,
                    offset: offset_seconds,
                });
            }
            Ok(Keyframe {
                offset_seconds,
                label: keyframe.label.clone(),
                snapshot: keyframe.snapshot.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        keyframes = keyframes.len(),
        from = template_duration_seconds,
        to = target_duration_seconds,
        "đã co giãn timeline"
    );

    Ok(Timeline::from_sorted(keyframes))
}

pub(crate) fn ensure_duration(duration_seconds: f64) -> Result<(), ScenarioError> {
    if duration_seconds.is_finite() && duration_seconds > 0.0 {
        Ok(())
    } else {
        Err(ScenarioError::InvalidDuration(duration_seconds))
    }
}

// Chỉ dùng cho giá trị không âm.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
