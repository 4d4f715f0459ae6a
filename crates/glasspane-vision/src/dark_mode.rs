//! 다크 모드 색 반전과 밝기 판정.

use glasspane_core::models::frame::{FrameBuffer, RegionMask};

use crate::pixel::{invert, luma};

/// 밝기 판정 샘플 간격 (픽셀, 양 축)
pub const BRIGHTNESS_SAMPLE_STEP: usize = 30;

/// 비이미지 픽셀의 세 색 채널을 반전한다. 마스크가 없으면 전체 반전.
pub fn invert_colors(frame: &mut FrameBuffer, mask: Option<&RegionMask>) {
    let width = frame.width as usize;
    let row_bytes = width * 4;
    let stride = frame.stride;
    for y in 0..frame.height as usize {
        let row = &mut frame.pixels[y * stride..y * stride + row_bytes];
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            if mask.is_some_and(|m| m.get_index(y * width + x)) {
                continue;
            }
            invert(px);
        }
    }
}

/// 비이미지 샘플의 절반 넘게 밝은지 (버킷 > 127). 샘플이 없으면 `false`.
pub fn is_bright(frame: &FrameBuffer, mask: Option<&RegionMask>) -> bool {
    let width = frame.width as usize;
    let mut total = 0usize;
    let mut bright = 0usize;
    for y in (0..frame.height as usize).step_by(BRIGHTNESS_SAMPLE_STEP) {
        for x in (0..width).step_by(BRIGHTNESS_SAMPLE_STEP) {
            if mask.is_some_and(|m| m.get_index(y * width + x)) {
                continue;
            }
            total += 1;
            let o = y * frame.stride + x * 4;
            if luma(&frame.pixels[o..o + 3]) > 127 {
                bright += 1;
            }
        }
    }
    total > 0 && bright * 2 > total
}
