//! 크기 변경 디바운스 게이트 (워커 측).
//!
//! 프레임 크기가 바뀌면 곧바로 재할당하지 않고 연속된 변경이 잠잠해질 때까지 기다린다.
//! 버스트의 첫 변경에서 오버레이를 숨기고, 마지막 변경 뒤 디바운스가 지나면 한 번만
//! `Commit`한다. 커밋마다 강제 렌더 구간을 연다.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::timers::Deadline;

/// 프레임 한 장에 대한 게이트 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// 확정된 크기: 그대로 처리
    Pass,
    /// 크기 변경 대기 중: 프레임 버림. `burst_started`면 오버레이를 숨긴다
    Hold { burst_started: bool },
    /// 새 크기 확정: 버퍼 재할당 후 처리
    Commit { width: u32, height: u32 },
}

/// 크기 변경 게이트: 워커 시작마다 새로 만든다
#[derive(Debug)]
pub struct ResizeGate {
    committed: Option<(u32, u32)>,
    pending: Option<(u32, u32)>,
    primed: bool,
    debounce: Deadline,
    debounce_after: Duration,
    forced: Deadline,
    forced_for: Duration,
    reveal: bool,
}

impl ResizeGate {
    /// `prepared`: 워커 시작 전에 이미 버퍼를 할당한 크기
    pub fn new(prepared: Option<(u32, u32)>, debounce_after: Duration, forced_for: Duration) -> Self {
        Self {
            committed: prepared,
            pending: None,
            primed: false,
            debounce: Deadline::new(),
            debounce_after,
            forced: Deadline::new(),
            forced_for,
            reveal: false,
        }
    }

    /// 프레임 크기 관찰
    pub fn observe(&mut self, size: (u32, u32), now: Instant) -> GateDecision {
        // 시작 직후 첫 프레임은 디바운스 없이 바로 확정
        if !self.primed {
            self.primed = true;
            let already = self.committed == Some(size);
            self.commit(size, now);
            return if already {
                GateDecision::Pass
            } else {
                GateDecision::Commit {
                    width: size.0,
                    height: size.1,
                }
            };
        }

        if self.pending.is_none() && self.committed == Some(size) {
            return GateDecision::Pass;
        }

        if self.pending != Some(size) {
            let burst_started = self.pending.is_none();
            self.pending = Some(size);
            self.debounce.arm(now, self.debounce_after);
            debug!(
                "크기 변경 감지: {}x{} (버스트 시작: {})",
                size.0, size.1, burst_started
            );
            return GateDecision::Hold { burst_started };
        }

        self.poll(now)
            .unwrap_or(GateDecision::Hold {
                burst_started: false,
            })
    }

    /// 새 프레임이 없을 때 디바운스 만료만 확인
    pub fn poll(&mut self, now: Instant) -> Option<GateDecision> {
        let size = self.pending?;
        if !self.debounce.fire(now) {
            return None;
        }
        self.pending = None;
        self.commit(size, now);
        Some(GateDecision::Commit {
            width: size.0,
            height: size.1,
        })
    }

    fn commit(&mut self, size: (u32, u32), now: Instant) {
        self.committed = Some(size);
        self.forced.arm(now, self.forced_for);
        self.reveal = true;
    }

    /// 강제 렌더 구간 안인지
    pub fn force_render(&self, now: Instant) -> bool {
        self.forced.is_active(now)
    }

    /// 강제 렌더 구간을 다시 연다 (일시정지 해제 시)
    pub fn rearm_forced(&mut self, now: Instant) {
        self.forced.arm(now, self.forced_for);
    }

    /// 커밋 후 첫 출력이면 `true`를 한 번 반환: 오버레이를 다시 보인다
    pub fn take_reveal(&mut self) -> bool {
        std::mem::take(&mut self.reveal)
    }

    /// 크기 변경 대기 중인지
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn committed(&self) -> Option<(u32, u32)> {
        self.committed
    }
}
