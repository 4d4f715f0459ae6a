//! 컨트롤 루프와 재시작 감독.
//!
//! 블로킹 스레드에서 `Renderer::process_loop`를 틱마다 돌리고, 프레임 워커가
//! 치명적 에러로 죽으면 정해진 횟수까지 렌더러를 재초기화한다. 창이 사라지는 등
//! 세션 전체가 끝나는 에러는 재시작하지 않는다.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use glasspane_core::config::SupervisorConfig;
use glasspane_core::error::CoreError;
use glasspane_renderer::{LoopControl, Renderer};
use tracing::{error, info, warn};

use crate::commands::CommandChannel;

/// 실패 후 판단
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 재시작 (1부터 세는 시도 번호)
    Restart { attempt: u32 },
    GiveUp,
}

/// 최대 재시작 횟수 정책
#[derive(Debug)]
pub struct RestartPolicy {
    max_attempts: u32,
    attempts: u32,
}

impl RestartPolicy {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            max_attempts: config.max_restart_attempts,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn on_failure(&mut self, err: &CoreError) -> Verdict {
        if err.is_session_fatal() || self.attempts >= self.max_attempts {
            return Verdict::GiveUp;
        }
        self.attempts += 1;
        Verdict::Restart {
            attempt: self.attempts,
        }
    }
}

/// 렌더러를 켜고 종료 이벤트까지 컨트롤 루프를 돈다
pub fn run_controller(
    renderer: &mut Renderer,
    commands: Option<&CommandChannel>,
    policy: &mut RestartPolicy,
    tick: Duration,
) -> Result<()> {
    renderer.enable(renderer.mode())?;

    loop {
        if let Some(commands) = commands {
            for parsed in commands.pending() {
                if let Err(e) = parsed.and_then(|command| renderer.apply(command)) {
                    warn!("명령 무시: {}", e);
                }
            }
        }

        match renderer.process_loop(Instant::now()) {
            Ok(LoopControl::Exit) => {
                info!("컨트롤 루프 종료");
                return Ok(());
            }
            Ok(LoopControl::Continue) => {}
            Err(e) => recover(renderer, policy, e)?,
        }

        thread::sleep(tick);
    }
}

fn recover(renderer: &mut Renderer, policy: &mut RestartPolicy, err: CoreError) -> Result<()> {
    let mut err = err;
    loop {
        match policy.on_failure(&err) {
            Verdict::GiveUp => {
                error!("렌더러 복구 포기 (재시작 {}회): {}", policy.attempts(), err);
                return Err(anyhow!(err).context("렌더러 중단"));
            }
            Verdict::Restart { attempt } => {
                warn!("렌더러 재시작 {}회차: {}", attempt, err);
                match renderer.reinitialize() {
                    Ok(()) => return Ok(()),
                    Err(e) => err = e,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use glasspane_core::config::AppConfig;
    use glasspane_core::models::frame::{FrameBuffer, Rect};
    use glasspane_core::models::geometry::{ShowState, WindowPlacement};
    use glasspane_core::ports::capture::FrameSource;
    use glasspane_core::ports::display::Presenter;
    use glasspane_core::ports::window::TargetWindow;
    use glasspane_renderer::mailbox::{FrameMailbox, MailboxSource};

    /// 캡처를 열 때마다 회색 프레임 하나를 넣어 주는 대상 창
    struct ScriptedTarget {
        fail_present: bool,
        gone: AtomicBool,
    }

    struct FailingPresenter;

    impl Presenter for FailingPresenter {
        fn present(&mut self, _frame: &FrameBuffer) -> Result<(), CoreError> {
            Err(CoreError::Display("surface lost".to_string()))
        }
    }

    impl TargetWindow for ScriptedTarget {
        fn placement(&self) -> Result<WindowPlacement, CoreError> {
            if self.gone.load(Ordering::SeqCst) {
                return Err(CoreError::GeometryQuery("창 사라짐".to_string()));
            }
            Ok(WindowPlacement::new(Rect::new(0, 0, 32, 24), ShowState::Normal))
        }

        fn is_in_use(&self) -> bool {
            true
        }

        fn desktop_size(&self) -> Option<(u32, u32)> {
            None
        }

        fn open_capture(&self) -> Result<Box<dyn FrameSource>, CoreError> {
            let mailbox = Arc::new(FrameMailbox::new());
            mailbox.publish(FrameBuffer::filled(32, 24, [90, 90, 90, 255]));
            Ok(Box::new(MailboxSource::new(mailbox)))
        }

        fn open_presenter(&self) -> Result<Box<dyn Presenter>, CoreError> {
            if self.fail_present {
                Ok(Box::new(FailingPresenter))
            } else {
                Ok(Box::new(crate::presenter::LogPresenter::new()))
            }
        }

        fn snapshot(&self) -> Result<Option<FrameBuffer>, CoreError> {
            Ok(None)
        }
    }

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default_config();
        config.pipeline.idle_sleep_ms = 5;
        config.pipeline.reveal_delay_ms = 1;
        config.pipeline.startup_warmup_ms = 0;
        config.effect.filter_images = false;
        config.supervisor.max_restart_attempts = 2;
        config
    }

    #[test]
    fn policy_counts_until_limit() {
        let mut policy = RestartPolicy::new(&SupervisorConfig {
            max_restart_attempts: 2,
        });
        let err = CoreError::FrameThread("boom".to_string());
        assert_eq!(policy.on_failure(&err), Verdict::Restart { attempt: 1 });
        assert_eq!(policy.on_failure(&err), Verdict::Restart { attempt: 2 });
        assert_eq!(policy.on_failure(&err), Verdict::GiveUp);
        assert_eq!(policy.attempts(), 2);
    }

    #[test]
    fn policy_never_restarts_session_fatal() {
        let mut policy = RestartPolicy::new(&SupervisorConfig::default());
        let err = CoreError::GeometryQuery("gone".to_string());
        assert_eq!(policy.on_failure(&err), Verdict::GiveUp);
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn repeated_worker_failures_exhaust_restarts() {
        let config = fast_config();
        let target = Arc::new(ScriptedTarget {
            fail_present: true,
            gone: AtomicBool::new(false),
        });
        let mut renderer = Renderer::new(config.clone(), target, None).unwrap();
        let mut policy = RestartPolicy::new(&config.supervisor);

        let result = run_controller(&mut renderer, None, &mut policy, Duration::from_millis(2));
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("surface lost"));
        assert_eq!(policy.attempts(), 2);
    }

    #[test]
    fn lost_window_stops_without_restart() {
        let config = fast_config();
        let target = Arc::new(ScriptedTarget {
            fail_present: false,
            gone: AtomicBool::new(false),
        });
        let mut renderer = Renderer::new(config.clone(), target.clone(), None).unwrap();
        let mut policy = RestartPolicy::new(&config.supervisor);

        let closer = {
            let target = Arc::clone(&target);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                target.gone.store(true, Ordering::SeqCst);
            })
        };
        let result = run_controller(&mut renderer, None, &mut policy, Duration::from_millis(2));
        closer.join().unwrap();

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::GeometryQuery(_))
        ));
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn exit_event_ends_loop() {
        let config = fast_config();
        let target = Arc::new(ScriptedTarget {
            fail_present: false,
            gone: AtomicBool::new(false),
        });
        let mut renderer = Renderer::new(config.clone(), target, None).unwrap();
        let exit = renderer.register_exit_event();
        exit.signal();

        let mut policy = RestartPolicy::new(&config.supervisor);
        run_controller(&mut renderer, None, &mut policy, Duration::from_millis(2)).unwrap();
        assert!(!renderer.is_enabled());
    }
}
