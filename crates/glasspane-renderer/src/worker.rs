//! 프레임 워커 스레드.
//!
//! 캡처 → 변경 감지 → 분류 → 효과 → 출력 루프를 전용 스레드 하나에서 돌린다.
//! 시작/종료는 채널 랑데부로 기다리며 두 대기 모두 시간 제한이 있다.
//! 종료 보고(`WorkerExit`)는 drop 가드에서 보내므로 에러/패닉 경로에서도 빠지지 않는다.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use glasspane_core::config::PipelineConfig;
use glasspane_core::error::CoreError;
use glasspane_core::models::effect::{BlurLevel, RenderMode};
use glasspane_core::models::frame::Rect;
use glasspane_core::ports::capture::FrameSource;
use glasspane_core::ports::display::Presenter;
use glasspane_core::ports::vision::{FrameProcessor, ProcessRequest};
use glasspane_core::ports::window::TargetWindow;
use glasspane_vision::settings::EffectSettings;
use tracing::{debug, error, info, warn};

use crate::resize::{GateDecision, ResizeGate};

/// 세션 사이에 재사용되는 워커 구성 요소
pub struct WorkerParts {
    pub source: Box<dyn FrameSource>,
    pub presenter: Box<dyn Presenter>,
    pub processor: Box<dyn FrameProcessor>,
}

/// 컨트롤러 → 워커 메시지
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerControl {
    /// 오버레이 위치 갱신
    Reposition(Rect),
    /// `true`면 처리 중단 + 오버레이 숨김, `false`면 재개
    Suspend(bool),
    SetBlur(BlurLevel),
}

/// 워커 종료 사유
#[derive(Debug)]
pub enum ExitReason {
    /// 정지 요청에 따른 정상 종료
    Stopped,
    /// 단계 실패로 종료
    Failed(CoreError),
}

/// 종료 보고: 재사용할 구성 요소를 돌려준다
pub struct WorkerExit {
    pub parts: WorkerParts,
    pub reason: ExitReason,
}

const BRIGHT_UNKNOWN: u8 = 0;
const BRIGHT_NO: u8 = 1;
const BRIGHT_YES: u8 = 2;

/// 컨트롤러와 워커가 공유하는 플래그/카운터
#[derive(Debug, Default)]
pub struct WorkerShared {
    stop: AtomicBool,
    in_use: AtomicBool,
    resizing: AtomicBool,
    fatal: AtomicBool,
    bright: AtomicU8,
    processed: AtomicU64,
    presented: AtomicU64,
}

impl WorkerShared {
    fn new(in_use: bool) -> Self {
        let shared = Self::default();
        shared.in_use.store(in_use, Ordering::Relaxed);
        shared
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// 대상 창 사용 중 여부 (워커 슬립 간격 결정)
    pub fn set_in_use(&self, in_use: bool) {
        self.in_use.store(in_use, Ordering::Relaxed);
    }

    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Relaxed)
    }

    /// 크기 변경 디바운스 중인지
    pub fn is_resizing(&self) -> bool {
        self.resizing.load(Ordering::Relaxed)
    }

    /// 워커가 에러로 종료되었는지 (sticky)
    pub fn has_fatal_error(&self) -> bool {
        self.fatal.load(Ordering::Acquire)
    }

    /// 마지막 밝기 판정 (아직 없으면 `None`)
    pub fn bright(&self) -> Option<bool> {
        match self.bright.load(Ordering::Relaxed) {
            BRIGHT_YES => Some(true),
            BRIGHT_NO => Some(false),
            _ => None,
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    fn set_bright(&self, bright: bool) {
        let value = if bright { BRIGHT_YES } else { BRIGHT_NO };
        self.bright.store(value, Ordering::Relaxed);
    }
}

/// 세션별 워커 입력
#[derive(Debug, Clone, Copy)]
pub struct WorkerSession {
    pub mode: RenderMode,
    pub filter_images: bool,
    pub blur: BlurLevel,
    /// 분류기 그리드 계산용 데스크톱 해상도
    pub desktop: (u32, u32),
    /// 시작 전에 프로세서를 준비한 크기
    pub prepared: Option<(u32, u32)>,
    pub in_use: bool,
}

struct WorkerContext {
    session: WorkerSession,
    active_sleep: Duration,
    idle_sleep: Duration,
    reveal_delay: Duration,
    resize_debounce: Duration,
    forced_render: Duration,
    settings: Arc<EffectSettings>,
    target: Arc<dyn TargetWindow>,
    shared: Arc<WorkerShared>,
    control_rx: Receiver<WorkerControl>,
}

/// 실행 중인 워커 핸들
pub struct FrameWorker {
    handle: Option<JoinHandle<()>>,
    control_tx: Sender<WorkerControl>,
    exit_rx: Receiver<WorkerExit>,
    shared: Arc<WorkerShared>,
}

impl FrameWorker {
    /// 워커 스레드 시작. `Alive` 응답을 최대 `worker_handshake_timeout_ms` 기다린다.
    pub fn spawn(
        parts: WorkerParts,
        session: WorkerSession,
        pipeline: &PipelineConfig,
        settings: Arc<EffectSettings>,
        target: Arc<dyn TargetWindow>,
    ) -> Result<Self, CoreError> {
        let (alive_tx, alive_rx) = channel::bounded::<()>(1);
        let (exit_tx, exit_rx) = channel::bounded::<WorkerExit>(1);
        let (control_tx, control_rx) = channel::unbounded();
        let shared = Arc::new(WorkerShared::new(session.in_use));

        let mut ctx = WorkerContext {
            session,
            active_sleep: pipeline.active_sleep(),
            idle_sleep: pipeline.idle_sleep(),
            reveal_delay: pipeline.reveal_delay(),
            resize_debounce: pipeline.resize_debounce(),
            forced_render: pipeline.forced_render(),
            settings,
            target,
            shared: Arc::clone(&shared),
            control_rx,
        };

        let handle = thread::Builder::new()
            .name("glasspane-frame".to_string())
            .spawn(move || {
                let mut guard = ExitGuard {
                    parts: Some(parts),
                    reason: ExitReason::Stopped,
                    exit_tx,
                    shared: Arc::clone(&ctx.shared),
                };
                let _ = alive_tx.send(());
                if let Err(e) = run(&mut ctx, &mut guard) {
                    guard.reason = ExitReason::Failed(e);
                }
            })
            .map_err(|e| CoreError::FrameThread(format!("워커 스레드 생성 실패: {e}")))?;

        let timeout = pipeline.handshake_timeout();
        match alive_rx.recv_timeout(timeout) {
            Ok(()) => {
                info!("프레임 워커 시작");
                Ok(Self {
                    handle: Some(handle),
                    control_tx,
                    exit_rx,
                    shared,
                })
            }
            Err(RecvTimeoutError::Timeout) => {
                shared.request_stop();
                warn!("프레임 워커 시작 응답 없음 ({}ms)", timeout.as_millis());
                Err(CoreError::WorkerTimeout {
                    operation: "start".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CoreError::FrameThread(
                "워커가 시작 응답 전에 종료됨".to_string(),
            )),
        }
    }

    pub fn shared(&self) -> &Arc<WorkerShared> {
        &self.shared
    }

    /// 제어 메시지 전송: 워커가 이미 종료됐으면 버린다
    pub fn control(&self, message: WorkerControl) {
        if self.control_tx.send(message).is_err() {
            debug!("종료된 워커에 제어 메시지 무시: {:?}", message);
        }
    }

    /// 정지 요청 후 종료 보고를 최대 `timeout` 기다린다
    pub fn stop(mut self, timeout: Duration) -> Result<WorkerExit, CoreError> {
        self.shared.request_stop();
        match self.exit_rx.recv_timeout(timeout) {
            Ok(exit) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        warn!("프레임 워커 join 실패 (패닉)");
                    }
                }
                info!("프레임 워커 정지");
                Ok(exit)
            }
            Err(_) => {
                warn!("프레임 워커 종료 응답 없음 ({}ms)", timeout.as_millis());
                Err(CoreError::WorkerTimeout {
                    operation: "stop".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.shared.request_stop();
    }
}

/// 스레드 종료 시 구성 요소와 사유를 컨트롤러로 돌려보낸다
struct ExitGuard {
    parts: Option<WorkerParts>,
    reason: ExitReason,
    exit_tx: Sender<WorkerExit>,
    shared: Arc<WorkerShared>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.reason = ExitReason::Failed(CoreError::FrameThread("워커 패닉".to_string()));
        }
        if let ExitReason::Failed(e) = &self.reason {
            match e.stage() {
                Some(stage) => error!("프레임 워커 실패 [{}]: {}", stage, e),
                None => error!("프레임 워커 실패: {}", e),
            }
            self.shared.fatal.store(true, Ordering::Release);
        }
        if let Some(parts) = self.parts.take() {
            let reason = std::mem::replace(&mut self.reason, ExitReason::Stopped);
            let _ = self.exit_tx.send(WorkerExit { parts, reason });
        }
    }
}

fn run(ctx: &mut WorkerContext, guard: &mut ExitGuard) -> Result<(), CoreError> {
    let parts = guard
        .parts
        .as_mut()
        .ok_or_else(|| CoreError::Internal("워커 구성 요소 없음".to_string()))?;
    let WorkerParts {
        source,
        presenter,
        processor,
    } = parts;

    presenter.set_blur(ctx.session.blur)?;
    let mut gate = ResizeGate::new(
        ctx.session.prepared,
        ctx.resize_debounce,
        ctx.forced_render,
    );
    let mut last_generation = None;
    let mut suspended = false;
    debug!(
        "워커 루프 진입: mode={}, filter_images={}, processor={}",
        ctx.session.mode,
        ctx.session.filter_images,
        processor.kind()
    );

    loop {
        while let Ok(message) = ctx.control_rx.try_recv() {
            match message {
                WorkerControl::Reposition(rect) => presenter.update_placement(rect)?,
                WorkerControl::Suspend(true) if !suspended => {
                    presenter.hide_target()?;
                    suspended = true;
                }
                WorkerControl::Suspend(false) if suspended => {
                    suspended = false;
                    gate.rearm_forced(Instant::now());
                    presenter.show_target()?;
                }
                WorkerControl::Suspend(_) => {}
                WorkerControl::SetBlur(level) => presenter.set_blur(level)?,
            }
        }

        if ctx.shared.stop_requested() {
            break;
        }

        let nap = if !suspended && ctx.shared.in_use() {
            ctx.active_sleep
        } else {
            ctx.idle_sleep
        };
        thread::sleep(nap);
        if suspended {
            continue;
        }

        let now = Instant::now();
        let frame = source.try_get_latest_frame()?;
        let decision = match &frame {
            Some(f) => Some(gate.observe(f.size(), now)),
            None => gate.poll(now),
        };
        match decision {
            Some(GateDecision::Hold { burst_started }) => {
                if burst_started {
                    presenter.hide_target()?;
                    ctx.shared.resizing.store(true, Ordering::Relaxed);
                }
                continue;
            }
            Some(GateDecision::Commit { width, height }) => {
                processor.prepare(width, height, ctx.session.desktop)?;
                let placement = ctx.target.placement()?;
                presenter.update_placement(placement.rect)?;
                ctx.shared.resizing.store(false, Ordering::Relaxed);
                info!("프레임 크기 확정: {}x{}", width, height);
            }
            Some(GateDecision::Pass) | None => {}
        }

        let Some(mut frame) = frame else {
            continue;
        };
        if frame.is_empty() {
            continue;
        }

        let generation = ctx.settings.generation();
        let effect = ctx.settings.snapshot();
        if last_generation != Some(generation) {
            presenter.set_brightness(effect.brightness_level)?;
            last_generation = Some(generation);
        }

        let request = ProcessRequest {
            mode: ctx.session.mode,
            filter_images: ctx.session.filter_images,
            effect,
            force_render: gate.force_render(now),
            now,
        };
        let outcome = processor.process(&mut frame, &request)?;
        ctx.shared.processed.fetch_add(1, Ordering::Relaxed);
        if let Some(bright) = outcome.bright {
            ctx.shared.set_bright(bright);
        }
        if !outcome.new_frame {
            continue;
        }

        presenter.present(&frame)?;
        ctx.shared.presented.fetch_add(1, Ordering::Relaxed);

        if gate.take_reveal() {
            thread::sleep(ctx.reveal_delay);
            presenter.show_target()?;
        }
    }
    Ok(())
}
