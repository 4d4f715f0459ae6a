//! 파이프라인 상태 머신 (컨트롤러 측).
//!
//! 창 위치 이벤트와 타이머 만료를 받아 워커에 내릴 동작을 결정한다. 시계를 직접 읽지 않고
//! 순수하게 `now`만 사용한다. 실제 실행(워커 정지/시작)은 `Renderer`가 한다.
//!
//! ```text
//! Idle ─start→ Active ⇄ ResizePending (워커 보고)
//!   Active ─Minimized/Hidden→ MinimizePending ─500ms→ Hidden ─Restored→ ResumePending ─250ms→ Active
//!   Active ─Maximized/Restored→ MaximizePending ─250ms→ Active (Restart)
//! ```

use std::time::{Duration, Instant};

use glasspane_core::config::PipelineConfig;
use glasspane_core::models::frame::Rect;
use glasspane_core::models::geometry::{GeometryEvent, ShowState};
use tracing::{debug, info};

use crate::timers::Deadline;

/// 파이프라인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 워커 없음
    Idle,
    /// 워커 실행 중
    Active,
    /// 워커가 크기 변경 디바운스 중
    ResizePending,
    /// 최소화/숨김 디바운스: 만료 시 해체
    MinimizePending,
    /// 최대화/복원 디바운스: 만료 시 재초기화
    MaximizePending,
    /// 숨김에서 복원: 짧은 지연 후 재시작
    ResumePending,
    /// 해체됨 (창이 보이지 않음)
    Hidden,
}

impl PipelineState {
    /// 워커가 살아 있어야 하는 상태인지
    pub fn has_worker(&self) -> bool {
        matches!(
            self,
            PipelineState::Active
                | PipelineState::ResizePending
                | PipelineState::MinimizePending
                | PipelineState::MaximizePending
        )
    }
}

/// 컨트롤러가 실행할 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineAction {
    /// 처리 일시정지 + 오버레이 숨김
    Suspend,
    /// 일시정지 해제
    Resume,
    /// 워커 정지 및 리소스 해제
    Teardown,
    /// 워커 재시작 (캡처/처리 리소스 재초기화)
    Restart,
    /// 오버레이 위치 갱신
    Reposition(Rect),
}

/// 상태 머신
#[derive(Debug)]
pub struct PipelineStateMachine {
    state: PipelineState,
    show_state: ShowState,
    deadline: Deadline,
    minimize_debounce: Duration,
    maximize_debounce: Duration,
    resume_delay: Duration,
}

impl PipelineStateMachine {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            state: PipelineState::Idle,
            show_state: ShowState::Normal,
            deadline: Deadline::new(),
            minimize_debounce: config.minimize_debounce(),
            maximize_debounce: config.maximize_debounce(),
            resume_delay: config.resume_delay(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn show_state(&self) -> ShowState {
        self.show_state
    }

    /// 다음 타이머 만료 시각
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline.at()
    }

    /// 워커 시작 완료
    pub fn start(&mut self, show_state: ShowState) {
        self.transition(PipelineState::Active);
        self.show_state = show_state;
        self.deadline.disarm();
    }

    /// 워커 정지 (비활성화/치명적 에러)
    pub fn stop(&mut self) {
        self.transition(PipelineState::Idle);
        self.deadline.disarm();
    }

    /// 워커의 크기 변경 대기 여부 반영
    pub fn set_worker_resizing(&mut self, resizing: bool) {
        match (self.state, resizing) {
            (PipelineState::Active, true) => self.transition(PipelineState::ResizePending),
            (PipelineState::ResizePending, false) => self.transition(PipelineState::Active),
            _ => {}
        }
    }

    /// 창 위치 이벤트 처리
    pub fn on_event(&mut self, event: GeometryEvent, now: Instant) -> Option<PipelineAction> {
        let previous_show = self.show_state;
        match event {
            GeometryEvent::Minimized => self.show_state = ShowState::Minimized,
            GeometryEvent::Maximized => self.show_state = ShowState::Maximized,
            GeometryEvent::Restored => self.show_state = ShowState::Normal,
            GeometryEvent::Hidden => self.show_state = ShowState::Hidden,
            GeometryEvent::Resized(_) | GeometryEvent::Moved(_) => {}
        }

        use GeometryEvent as E;
        use PipelineState as S;
        match (self.state, event) {
            (S::Idle, _) => None,

            (S::Active | S::ResizePending, E::Resized(rect) | E::Moved(rect)) => {
                Some(PipelineAction::Reposition(rect))
            }
            (_, E::Resized(_) | E::Moved(_)) => None,

            (S::Active | S::ResizePending | S::MaximizePending, E::Minimized | E::Hidden) => {
                self.deadline.arm(now, self.minimize_debounce);
                self.transition(S::MinimizePending);
                Some(PipelineAction::Suspend)
            }
            (S::MinimizePending, E::Minimized | E::Hidden) => None,
            (S::MinimizePending, E::Restored | E::Maximized) => {
                // 일시적 숨김이었음: 해체 취소
                self.deadline.disarm();
                self.transition(S::Active);
                Some(PipelineAction::Resume)
            }

            (S::Hidden, E::Restored | E::Maximized) => {
                self.deadline.arm(now, self.resume_delay);
                self.transition(S::ResumePending);
                None
            }
            (S::Hidden, E::Minimized | E::Hidden) => None,
            (S::ResumePending, E::Minimized | E::Hidden) => {
                self.deadline.disarm();
                self.transition(S::Hidden);
                None
            }
            (S::ResumePending, E::Restored | E::Maximized) => None,

            (S::Active | S::ResizePending, E::Maximized) => {
                self.deadline.arm(now, self.maximize_debounce);
                self.transition(S::MaximizePending);
                Some(PipelineAction::Suspend)
            }
            (S::Active | S::ResizePending, E::Restored) => {
                if previous_show == ShowState::Maximized {
                    self.deadline.arm(now, self.maximize_debounce);
                    self.transition(S::MaximizePending);
                    Some(PipelineAction::Suspend)
                } else {
                    None
                }
            }
            (S::MaximizePending, E::Maximized | E::Restored) => {
                self.deadline.arm(now, self.maximize_debounce);
                None
            }
        }
    }

    /// 타이머 만료 확인
    pub fn poll(&mut self, now: Instant) -> Option<PipelineAction> {
        if !self.deadline.fire(now) {
            return None;
        }
        match self.state {
            PipelineState::MinimizePending => {
                self.transition(PipelineState::Hidden);
                Some(PipelineAction::Teardown)
            }
            PipelineState::MaximizePending | PipelineState::ResumePending => {
                self.transition(PipelineState::Active);
                Some(PipelineAction::Restart)
            }
            _ => None,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state == next {
            return;
        }
        if matches!(next, PipelineState::ResizePending) || self.state == PipelineState::ResizePending {
            debug!("파이프라인 상태: {:?} → {:?}", self.state, next);
        } else {
            info!("파이프라인 상태: {:?} → {:?}", self.state, next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn active() -> (PipelineStateMachine, Instant) {
        let mut m = PipelineStateMachine::new(&PipelineConfig::default());
        m.start(ShowState::Normal);
        (m, Instant::now())
    }

    #[test]
    fn idle_ignores_events() {
        let mut m = PipelineStateMachine::new(&PipelineConfig::default());
        let t0 = Instant::now();
        assert_eq!(m.on_event(GeometryEvent::Minimized, t0), None);
        assert_eq!(m.poll(t0 + 10_000 * MS), None);
        assert_eq!(m.state(), PipelineState::Idle);
        assert_eq!(m.show_state(), ShowState::Minimized);
    }

    #[test]
    fn move_repositions_overlay() {
        let (mut m, t0) = active();
        let rect = Rect::new(10, 20, 300, 200);
        assert_eq!(
            m.on_event(GeometryEvent::Moved(rect), t0),
            Some(PipelineAction::Reposition(rect))
        );
        assert_eq!(m.state(), PipelineState::Active);
    }

    #[test]
    fn minimize_tears_down_after_debounce() {
        let (mut m, t0) = active();
        assert_eq!(
            m.on_event(GeometryEvent::Minimized, t0),
            Some(PipelineAction::Suspend)
        );
        assert_eq!(m.state(), PipelineState::MinimizePending);
        assert_eq!(m.poll(t0 + 499 * MS), None);
        assert_eq!(m.poll(t0 + 500 * MS), Some(PipelineAction::Teardown));
        assert_eq!(m.state(), PipelineState::Hidden);
        assert!(!m.state().has_worker());
    }

    #[test]
    fn transient_hide_is_cancelled_by_restore() {
        let (mut m, t0) = active();
        m.on_event(GeometryEvent::Hidden, t0);
        assert_eq!(
            m.on_event(GeometryEvent::Restored, t0 + 100 * MS),
            Some(PipelineAction::Resume)
        );
        assert_eq!(m.state(), PipelineState::Active);
        assert_eq!(m.poll(t0 + 1000 * MS), None);
    }

    #[test]
    fn restore_from_hidden_restarts_after_short_delay() {
        let (mut m, t0) = active();
        m.on_event(GeometryEvent::Minimized, t0);
        m.poll(t0 + 500 * MS);

        let t1 = t0 + 2000 * MS;
        assert_eq!(m.on_event(GeometryEvent::Restored, t1), None);
        assert_eq!(m.state(), PipelineState::ResumePending);
        assert_eq!(m.poll(t1 + 249 * MS), None);
        assert_eq!(m.poll(t1 + 250 * MS), Some(PipelineAction::Restart));
        assert_eq!(m.state(), PipelineState::Active);
    }

    #[test]
    fn minimize_during_resume_returns_to_hidden() {
        let (mut m, t0) = active();
        m.on_event(GeometryEvent::Minimized, t0);
        m.poll(t0 + 500 * MS);
        m.on_event(GeometryEvent::Restored, t0 + 600 * MS);
        m.on_event(GeometryEvent::Minimized, t0 + 650 * MS);
        assert_eq!(m.state(), PipelineState::Hidden);
        assert_eq!(m.poll(t0 + 2000 * MS), None);
    }

    #[test]
    fn maximize_debounces_then_restarts() {
        let (mut m, t0) = active();
        assert_eq!(
            m.on_event(GeometryEvent::Maximized, t0),
            Some(PipelineAction::Suspend)
        );
        // 복원이 다시 오면 디바운스 연장
        assert_eq!(m.on_event(GeometryEvent::Restored, t0 + 200 * MS), None);
        assert_eq!(m.poll(t0 + 300 * MS), None);
        assert_eq!(m.poll(t0 + 450 * MS), Some(PipelineAction::Restart));
        assert_eq!(m.state(), PipelineState::Active);
    }

    #[test]
    fn restore_from_normal_is_noop() {
        let (mut m, t0) = active();
        assert_eq!(m.on_event(GeometryEvent::Restored, t0), None);
        assert_eq!(m.state(), PipelineState::Active);
    }

    #[test]
    fn worker_resize_flag_toggles_resize_pending() {
        let (mut m, t0) = active();
        m.set_worker_resizing(true);
        assert_eq!(m.state(), PipelineState::ResizePending);
        let rect = Rect::new(0, 0, 10, 10);
        assert_eq!(
            m.on_event(GeometryEvent::Resized(rect), t0),
            Some(PipelineAction::Reposition(rect))
        );
        m.set_worker_resizing(false);
        assert_eq!(m.state(), PipelineState::Active);

        // 다른 대기 상태에서는 무시
        m.on_event(GeometryEvent::Minimized, t0);
        m.set_worker_resizing(true);
        assert_eq!(m.state(), PipelineState::MinimizePending);
    }

    #[test]
    fn stop_clears_pending_timer() {
        let (mut m, t0) = active();
        m.on_event(GeometryEvent::Maximized, t0);
        m.stop();
        assert_eq!(m.next_deadline(), None);
        assert_eq!(m.poll(t0 + 1000 * MS), None);
        assert_eq!(m.state(), PipelineState::Idle);
    }
}
