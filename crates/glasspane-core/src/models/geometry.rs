//! 대상 창 위치/상태 모델.

use serde::{Deserialize, Serialize};

use super::frame::Rect;

/// 창 표시 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    /// 숨김 (일부 호스트 앱이 일시적으로 보고)
    Hidden,
}

/// 한 시점의 창 배치 (위치 + 표시 상태)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPlacement {
    pub rect: Rect,
    pub show_state: ShowState,
}

impl WindowPlacement {
    pub fn new(rect: Rect, show_state: ShowState) -> Self {
        Self { rect, show_state }
    }

    /// 화면에 보이는 상태인지 (최소화/숨김 아님)
    pub fn is_visible(&self) -> bool {
        matches!(self.show_state, ShowState::Normal | ShowState::Maximized)
    }
}

/// 창 위치 변경 알림: 컨트롤러는 반응만 하고 직접 조회하지 않는다
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEvent {
    /// 크기 변경 (새 영역)
    Resized(Rect),
    /// 이동 (크기 동일)
    Moved(Rect),
    Minimized,
    Maximized,
    /// 최소화/최대화에서 복원
    Restored,
    /// 일시적 숨김
    Hidden,
}
