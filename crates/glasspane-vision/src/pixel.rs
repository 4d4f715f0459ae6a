//! 픽셀 단위 헬퍼.
//!
//! 모든 단계가 같은 "밝기 버킷" 정의를 공유한다: 세 색 채널의 정수 평균.

/// 세 색 채널 평균 (0..=255)
#[inline]
pub fn luma(px: &[u8]) -> u8 {
    ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8
}

/// 세 색 채널이 허용 오차 안에서 같은지 (알파 무시)
#[inline]
pub fn same_color(a: &[u8], b: &[u8], tolerance: u8) -> bool {
    if tolerance == 0 {
        return a[0] == b[0] && a[1] == b[1] && a[2] == b[2];
    }
    a[0].abs_diff(b[0]) <= tolerance
        && a[1].abs_diff(b[1]) <= tolerance
        && a[2].abs_diff(b[2]) <= tolerance
}

/// 세 색 채널 비트 반전
#[inline]
pub fn invert(px: &mut [u8]) {
    px[0] = !px[0];
    px[1] = !px[1];
    px[2] = !px[2];
}
