//! `Instant` 기반 타이머.
//!
//! 모두 호출자가 넘겨준 `now`로만 판정한다 (직접 시계를 읽지 않음). 그래서 상태 머신과
//! 크기 변경 게이트를 실제 시간 없이 테스트할 수 있다.

use std::time::{Duration, Instant};

/// 한 번 울리는 마감 시각
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn new() -> Self {
        Self(None)
    }

    /// `now + after`로 (재)설정
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.0 = Some(now + after);
    }

    pub fn disarm(&mut self) {
        self.0 = None;
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    pub fn at(&self) -> Option<Instant> {
        self.0
    }

    /// 설정되어 있고 아직 지나지 않았는지 (강제 렌더 구간 판정용)
    pub fn is_active(&self, now: Instant) -> bool {
        self.0.is_some_and(|at| now < at)
    }

    /// 지났으면 해제하고 `true`
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.0 {
            Some(at) if now >= at => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }
}

/// 주기 작업 타이머: 첫 호출은 즉시 실행
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: Duration,
    next: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// 실행할 때가 되었으면 다음 시각을 잡고 `true`
    pub fn due(&mut self, now: Instant) -> bool {
        if self.next.is_some_and(|next| now < next) {
            return false;
        }
        self.next = Some(now + self.period);
        true
    }

    /// 다음 `due`가 즉시 `true`가 되도록
    pub fn reset(&mut self) {
        self.next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn deadline_fires_once() {
        let t0 = Instant::now();
        let mut d = Deadline::new();
        assert!(!d.fire(t0));

        d.arm(t0, 250 * MS);
        assert!(d.is_active(t0 + 249 * MS));
        assert!(!d.fire(t0 + 249 * MS));
        assert!(d.fire(t0 + 250 * MS));
        assert!(!d.fire(t0 + 300 * MS));
        assert!(!d.is_armed());
    }

    #[test]
    fn rearm_pushes_deadline() {
        let t0 = Instant::now();
        let mut d = Deadline::new();
        d.arm(t0, 250 * MS);
        d.arm(t0 + 100 * MS, 250 * MS);
        assert!(!d.fire(t0 + 300 * MS));
        assert!(d.fire(t0 + 350 * MS));
    }

    #[test]
    fn interval_runs_immediately_then_periodically() {
        let t0 = Instant::now();
        let mut i = Interval::new(1000 * MS);
        assert!(i.due(t0));
        assert!(!i.due(t0 + 999 * MS));
        assert!(i.due(t0 + 1000 * MS));
        i.reset();
        assert!(i.due(t0 + 1001 * MS));
    }
}
