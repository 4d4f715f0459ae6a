//! 대상 창 포트.
//!
//! 구현: `glasspane-app::capture::XcapTarget` (xcap)

use crate::error::CoreError;
use crate::models::frame::FrameBuffer;
use crate::models::geometry::WindowPlacement;

use super::capture::FrameSource;
use super::display::Presenter;

/// 효과를 씌울 대상 창
///
/// 창 열거/배치 조회, 캡처 세션 생성, 출력 오버레이 생성을 담당한다.
pub trait TargetWindow: Send + Sync {
    /// 현재 배치 조회: 창이 사라졌으면 [`CoreError::GeometryQuery`]
    fn placement(&self) -> Result<WindowPlacement, CoreError>;

    /// 사용자가 창을 쓰는 중인지 (포그라운드 또는 마우스 호버)
    fn is_in_use(&self) -> bool;

    /// 전체 데스크톱 해상도 (알 수 없으면 `None`)
    fn desktop_size(&self) -> Option<(u32, u32)>;

    /// 연속 캡처 세션 시작
    fn open_capture(&self) -> Result<Box<dyn FrameSource>, CoreError>;

    /// 출력 오버레이 생성
    fn open_presenter(&self) -> Result<Box<dyn Presenter>, CoreError>;

    /// 단발 캡처 (일시정지 중 밝기 확인용)
    fn snapshot(&self) -> Result<Option<FrameBuffer>, CoreError>;
}
