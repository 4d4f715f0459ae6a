//! 출력(Presenter) 포트.
//!
//! 구현: `glasspane-app::presenter` (LogPresenter, SnapshotPresenter)

use crate::error::CoreError;
use crate::models::effect::BlurLevel;
use crate::models::frame::{FrameBuffer, Rect};

/// 처리된 프레임을 화면(오버레이)에 출력
///
/// `present`는 복사/플립 동안만 블로킹한다. 나머지 메서드는 오버레이 창 속성을
/// 다루며, 지원하지 않는 구현은 기본 구현(아무것도 안 함)을 사용한다.
pub trait Presenter: Send {
    /// 프레임 출력
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), CoreError>;

    /// 크기 변경 중 오버레이 숨김
    fn hide_target(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    /// 오버레이 다시 표시
    fn show_target(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    /// 오버레이 위치/크기를 대상 창에 맞춤
    fn update_placement(&mut self, _rect: Rect) -> Result<(), CoreError> {
        Ok(())
    }

    /// 오버레이 전체 밝기 [0, 1]
    fn set_brightness(&mut self, _level: f64) -> Result<(), CoreError> {
        Ok(())
    }

    /// 배경 블러 강도
    fn set_blur(&mut self, _level: BlurLevel) -> Result<(), CoreError> {
        Ok(())
    }
}
