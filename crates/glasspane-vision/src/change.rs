//! 변경 감지 캐시.
//!
//! 직전에 처리한 프레임의 바이트 사본을 들고 있다가 새 프레임과 행 단위로 비교한다.
//! 오른쪽 끝 몇 열은 캡처 가장자리 잡음 때문에 비교에서 제외한다.

use glasspane_core::error::{try_alloc, CoreError, PipelineStage};
use glasspane_core::models::frame::{FrameBuffer, BYTES_PER_PIXEL};
use tracing::debug;

/// 직전 프레임 사본
#[derive(Debug, Default)]
pub struct ChangeCache {
    width: u32,
    height: u32,
    stride: usize,
    snapshot: Vec<u8>,
    /// 사본이 유효한지 (prepare/reset 직후엔 false)
    primed: bool,
    trailing_margin: u32,
}

impl ChangeCache {
    pub fn new(trailing_margin: u32) -> Self {
        Self {
            trailing_margin,
            ..Self::default()
        }
    }

    /// 프레임 크기에 맞춰 사본 버퍼 할당
    pub fn prepare(&mut self, width: u32, height: u32, stride: usize) -> Result<(), CoreError> {
        let len = height as usize * stride;
        self.snapshot = try_alloc(len, 0u8, PipelineStage::ChangeDetection)?;
        self.width = width;
        self.height = height;
        self.stride = stride;
        self.primed = false;
        debug!("변경 감지 캐시 할당: {}x{} ({} bytes)", width, height, len);
        Ok(())
    }

    /// 다음 호출이 무조건 `true`를 반환하도록 사본 무효화
    pub fn reset(&mut self) {
        self.primed = false;
    }

    /// 버퍼 해제
    pub fn release(&mut self) {
        self.snapshot = Vec::new();
        self.width = 0;
        self.height = 0;
        self.stride = 0;
        self.primed = false;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 새 프레임이 사본과 다른지 판정하고, 다르면 사본을 갱신한다.
    ///
    /// 크기가 바뀌었거나 사본이 비어 있으면 항상 `true`.
    pub fn has_changed(&mut self, frame: &FrameBuffer) -> bool {
        let len = frame.height as usize * frame.stride;
        let same_shape = self.primed
            && frame.width == self.width
            && frame.height == self.height
            && frame.stride == self.stride
            && self.snapshot.len() == len;

        if same_shape && !self.rows_differ(frame) {
            return false;
        }

        if !same_shape {
            self.width = frame.width;
            self.height = frame.height;
            self.stride = frame.stride;
            self.snapshot.clear();
            self.snapshot.extend_from_slice(&frame.pixels[..len]);
        } else {
            self.snapshot.copy_from_slice(&frame.pixels[..len]);
        }
        self.primed = true;
        true
    }

    fn rows_differ(&self, frame: &FrameBuffer) -> bool {
        let active = frame.width.saturating_sub(self.trailing_margin) as usize * BYTES_PER_PIXEL;
        (0..frame.height as usize).any(|y| {
            let start = y * frame.stride;
            self.snapshot[start..start + active] != frame.pixels[start..start + active]
        })
    }
}
