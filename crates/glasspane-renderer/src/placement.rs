//! 창 배치 변화 → 위치 이벤트 변환.

use glasspane_core::models::geometry::{GeometryEvent, ShowState, WindowPlacement};

/// 연속된 배치 조회 결과를 비교해 이벤트를 만든다
#[derive(Debug, Default)]
pub struct PlacementTracker {
    last: Option<WindowPlacement>,
}

impl PlacementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기준 배치 재설정 (이벤트 없음)
    pub fn reset(&mut self, placement: WindowPlacement) {
        self.last = Some(placement);
    }

    pub fn last(&self) -> Option<&WindowPlacement> {
        self.last.as_ref()
    }

    /// 새 배치 관찰. 표시 상태 변화가 크기/위치 변화보다 우선한다.
    pub fn observe(&mut self, placement: WindowPlacement) -> Option<GeometryEvent> {
        let prev = self.last.replace(placement)?;

        if prev.show_state != placement.show_state {
            return Some(match placement.show_state {
                ShowState::Minimized => GeometryEvent::Minimized,
                ShowState::Maximized => GeometryEvent::Maximized,
                ShowState::Hidden => GeometryEvent::Hidden,
                ShowState::Normal => GeometryEvent::Restored,
            });
        }
        if !placement.is_visible() {
            return None;
        }
        if !prev.rect.same_size(&placement.rect) {
            Some(GeometryEvent::Resized(placement.rect))
        } else if !prev.rect.same_origin(&placement.rect) {
            Some(GeometryEvent::Moved(placement.rect))
        } else {
            None
        }
    }
}
