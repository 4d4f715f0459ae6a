//! 프레임 소스 포트.
//!
//! 구현: `glasspane-renderer::mailbox::MailboxSource` (단일 슬롯 최신 프레임)

use crate::error::CoreError;
use crate::models::frame::FrameBuffer;

/// 캡처된 최신 프레임 제공자
///
/// 큐가 아니다. 워커가 느리면 중간 프레임은 버려지고 가장 최근 것만 남는다.
pub trait FrameSource: Send {
    /// 최신 프레임을 꺼낸다 (논블로킹).
    ///
    /// 마지막 호출 이후 새 프레임이 없으면 `Ok(None)`: 에러가 아니다.
    fn try_get_latest_frame(&mut self) -> Result<Option<FrameBuffer>, CoreError>;
}
