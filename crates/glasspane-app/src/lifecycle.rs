//! 프로세스 종료 처리.
//!
//! OS 시그널(SIGINT, SIGTERM / Ctrl+C)을 `watch` 채널 하나로 모으고, 컨트롤 루프가
//! 보는 [`ExitEvent`]로 넘긴다. 블로킹 스레드에 있는 렌더러는 다음 틱에서 종료한다.

use glasspane_renderer::ExitEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// 코드에서 직접 요청
    Requested,
}

/// 종료 신호 허브
pub struct LifecycleManager {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.tx.subscribe()
    }

    /// 첫 번째 사유만 남긴다
    pub fn shutdown(&self, reason: ShutdownReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            info!("종료 요청: {:?}", reason);
        }
    }

    /// 종료 신호가 오면 렌더러 종료 이벤트를 세우는 태스크
    pub fn forward_to(&self, exit: ExitEvent) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            if rx.wait_for(Option::is_some).await.is_ok() {
                exit.signal();
            }
        })
    }

    /// OS 시그널 하나를 기다린다. 핸들러를 못 걸면 경고 후 반환 (stdin `exit`은 그대로 동작).
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut interrupt, mut terminate) =
                match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                    (Ok(i), Ok(t)) => (i, t),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("시그널 핸들러 등록 실패: {e}");
                        return;
                    }
                };
            let reason = tokio::select! {
                _ = interrupt.recv() => ShutdownReason::Interrupt,
                _ = terminate.recv() => ShutdownReason::Terminate,
            };
            self.shutdown(reason);
        }

        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => self.shutdown(ShutdownReason::Interrupt),
                Err(e) => warn!("Ctrl+C 핸들러 등록 실패: {e}"),
            }
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_reason() {
        let lm = LifecycleManager::new();
        assert_eq!(*lm.subscribe().borrow(), None);
    }

    #[test]
    fn first_reason_wins() {
        let lm = LifecycleManager::new();
        let rx = lm.subscribe();
        lm.shutdown(ShutdownReason::Terminate);
        lm.shutdown(ShutdownReason::Requested);
        assert_eq!(*rx.borrow(), Some(ShutdownReason::Terminate));
    }

    #[tokio::test]
    async fn shutdown_reaches_exit_event() {
        let lm = LifecycleManager::new();
        let exit = ExitEvent::default();
        let forward = lm.forward_to(exit.clone());
        assert!(!exit.is_signaled());

        lm.shutdown(ShutdownReason::Requested);
        forward.await.unwrap();
        assert!(exit.is_signaled());
    }
}
