//! `image::RgbaImage` ↔ `FrameBuffer` 변환.

use glasspane_core::error::CoreError;
use glasspane_core::models::frame::{FrameBuffer, BYTES_PER_PIXEL};
use image::RgbaImage;

/// 캡처 이미지를 프레임으로 (버퍼 이동, 복사 없음)
pub fn frame_from_image(image: RgbaImage) -> Result<FrameBuffer, CoreError> {
    let (width, height) = image.dimensions();
    FrameBuffer::new(
        width,
        height,
        width as usize * BYTES_PER_PIXEL,
        image.into_raw(),
    )
}

/// 프레임을 이미지로 (행 패딩 제거)
pub fn image_from_frame(frame: &FrameBuffer) -> Result<RgbaImage, CoreError> {
    let row_bytes = frame.width as usize * BYTES_PER_PIXEL;
    let mut raw = Vec::with_capacity(row_bytes * frame.height as usize);
    for y in 0..frame.height {
        raw.extend_from_slice(&frame.row(y)[..row_bytes]);
    }
    RgbaImage::from_raw(frame.width, frame.height, raw).ok_or_else(|| {
        CoreError::Internal(format!(
            "이미지 버퍼 생성 실패: {}x{}",
            frame.width, frame.height
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn image_to_frame_keeps_pixels() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        image.put_pixel(2, 1, Rgba([9, 8, 7, 6]));
        let frame = frame_from_image(image).unwrap();
        assert_eq!(frame.size(), (3, 2));
        assert_eq!(frame.stride, 12);
        assert_eq!(frame.pixel(2, 1), [9, 8, 7, 6]);
    }

    #[test]
    fn padded_frame_to_image() {
        let mut pixels = vec![0u8; 2 * 12];
        pixels[12..16].copy_from_slice(&[5, 6, 7, 8]);
        let frame = FrameBuffer::new(2, 2, 12, pixels).unwrap();
        let image = image_from_frame(&frame).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 1), &Rgba([5, 6, 7, 8]));
    }
}
