//! 렌더러 컨트롤러.
//!
//! 컨트롤 스레드에서 `process_loop`를 주기적으로 호출한다. 창 배치를 조회해 위치 이벤트로
//! 바꾸고, 상태 머신이 내린 동작대로 워커를 정지/시작/일시정지한다. 런타임 명령과
//! 효과 스칼라 설정도 여기서 받는다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glasspane_core::config::AppConfig;
use glasspane_core::error::CoreError;
use glasspane_core::models::command::RendererCommand;
use glasspane_core::models::effect::{BlurLevel, RenderMode};
use glasspane_core::models::geometry::GeometryEvent;
use glasspane_core::ports::vision::{ComputeDeviceProvider, ProcessorKind};
use glasspane_core::ports::window::TargetWindow;
use glasspane_vision::dark_mode;
use glasspane_vision::settings::EffectSettings;
use tracing::{debug, error, info, warn};

use crate::placement::PlacementTracker;
use crate::processors::ProcessorFactory;
use crate::state::{PipelineAction, PipelineState, PipelineStateMachine};
use crate::timers::{Deadline, Interval};
use crate::worker::{ExitReason, FrameWorker, WorkerControl, WorkerParts, WorkerSession};

/// `process_loop` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// 종료 이벤트 수신: 호출자는 루프를 끝낸다
    Exit,
}

/// 스레드 간 종료 요청 핸들
#[derive(Debug, Clone, Default)]
pub struct ExitEvent(Arc<AtomicBool>);

impl ExitEvent {
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 다크 모드 밝기 게이트: 이미 어두운 창은 반전하지 않고 쉬다가 밝아지면 재개
#[derive(Debug)]
struct DarkGate {
    paused: bool,
    probe: Interval,
    warmup: Deadline,
}

impl DarkGate {
    fn reset(&mut self) {
        self.paused = false;
        self.probe.reset();
        self.warmup.disarm();
    }
}

/// 렌더러 컨트롤러
pub struct Renderer {
    config: AppConfig,
    target: Arc<dyn TargetWindow>,
    factory: ProcessorFactory,
    kind: ProcessorKind,
    settings: Arc<EffectSettings>,
    machine: PipelineStateMachine,
    tracker: PlacementTracker,
    worker: Option<FrameWorker>,
    parts: Option<WorkerParts>,
    mode: RenderMode,
    filter_images: bool,
    blur: BlurLevel,
    enabled: bool,
    exit: ExitEvent,
    fatal: Option<String>,
    usage_poll: Interval,
    dark_gate: DarkGate,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("enabled", &self.enabled)
            .field("fatal", &self.fatal)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// 렌더러 생성. 가속 장치 공급자가 있고 사용 가능하면 가속 프로세서를 쓴다.
    pub fn new(
        config: AppConfig,
        target: Arc<dyn TargetWindow>,
        provider: Option<Arc<dyn ComputeDeviceProvider>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let factory = ProcessorFactory::new(provider);
        let kind = factory.detect();
        info!("렌더러 생성: 프로세서={}, 모드={}", kind, config.effect.mode);

        Ok(Self {
            settings: Arc::new(EffectSettings::new(config.effect.initial_effect())),
            machine: PipelineStateMachine::new(&config.pipeline),
            tracker: PlacementTracker::new(),
            worker: None,
            parts: None,
            mode: config.effect.mode,
            filter_images: config.effect.filter_images,
            blur: config.effect.blur,
            enabled: false,
            exit: ExitEvent::default(),
            fatal: None,
            usage_poll: Interval::new(config.pipeline.usage_poll_interval()),
            dark_gate: DarkGate {
                paused: false,
                probe: Interval::new(config.pipeline.brightness_check_interval()),
                warmup: Deadline::new(),
            },
            config,
            target,
            factory,
            kind,
        })
    }

    // ============================================================
    // 조회
    // ============================================================

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn state(&self) -> PipelineState {
        self.machine.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 다크 모드 밝기 게이트로 일시정지 중인지
    pub fn is_dark_paused(&self) -> bool {
        self.dark_gate.paused
    }

    /// 공유 효과 설정 핸들
    pub fn settings(&self) -> Arc<EffectSettings> {
        Arc::clone(&self.settings)
    }

    /// 현재 워커가 출력한 프레임 수
    pub fn frames_presented(&self) -> u64 {
        self.worker
            .as_ref()
            .map_or(0, |w| w.shared().frames_presented())
    }

    /// 프레임 워커가 치명적 에러로 끝났는지 (재초기화 전까지 유지)
    pub fn has_fatal_error(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    /// 다른 스레드에서 종료를 요청할 핸들
    pub fn register_exit_event(&self) -> ExitEvent {
        self.exit.clone()
    }

    // ============================================================
    // 라이프사이클
    // ============================================================

    /// 효과 켜기. 실패하면 파이프라인은 Idle로 남는다.
    pub fn enable(&mut self, mode: RenderMode) -> Result<(), CoreError> {
        if self.enabled {
            self.disable();
        }
        self.mode = mode;
        self.fatal = None;
        self.dark_gate.reset();
        self.start_session(Instant::now())?;
        self.enabled = true;
        info!("렌더러 활성화: {}", mode);
        Ok(())
    }

    /// 효과 끄기 (워커 정지, 대기 시간 제한 있음)
    pub fn disable(&mut self) {
        if !self.enabled && self.worker.is_none() {
            return;
        }
        self.stop_session();
        self.machine.stop();
        self.dark_gate.reset();
        self.enabled = false;
        info!("렌더러 비활성화");
    }

    /// 모든 구성 요소를 새로 만들어 다시 시작 (치명적 에러 복구용)
    pub fn reinitialize(&mut self) -> Result<(), CoreError> {
        info!("렌더러 재초기화");
        self.disable();
        self.parts = None;
        self.enable(self.mode)
    }

    /// 컨트롤 루프 한 틱
    pub fn process_loop(&mut self, now: Instant) -> Result<LoopControl, CoreError> {
        if self.exit.is_signaled() {
            self.disable();
            return Ok(LoopControl::Exit);
        }
        if !self.enabled {
            return Ok(LoopControl::Continue);
        }

        if let Some(err) = self.collect_worker_failure() {
            return Err(err);
        }

        let placement = match self.target.placement() {
            Ok(placement) => placement,
            Err(e) => {
                error!("대상 창 위치 조회 실패 — 세션 종료: {}", e);
                self.disable();
                return Err(match e {
                    CoreError::GeometryQuery(_) => e,
                    other => CoreError::GeometryQuery(other.to_string()),
                });
            }
        };
        if let Some(event) = self.tracker.observe(placement) {
            self.notify(event, now)?;
        }

        if let Some(worker) = &self.worker {
            self.machine
                .set_worker_resizing(worker.shared().is_resizing());
        }
        if let Some(action) = self.machine.poll(now) {
            self.execute(action, now)?;
        }

        if self.usage_poll.due(now) {
            if let Some(worker) = &self.worker {
                worker.shared().set_in_use(self.target.is_in_use());
            }
        }

        self.check_brightness(now)?;
        Ok(LoopControl::Continue)
    }

    /// 창 위치 이벤트 전달
    pub fn notify(&mut self, event: GeometryEvent, now: Instant) -> Result<(), CoreError> {
        debug!("위치 이벤트: {:?}", event);
        match self.machine.on_event(event, now) {
            Some(action) => self.execute(action, now),
            None => Ok(()),
        }
    }

    // ============================================================
    // 런타임 설정
    // ============================================================

    /// 텍스트 명령 적용
    pub fn apply(&mut self, command: RendererCommand) -> Result<(), CoreError> {
        debug!("명령 적용: {:?}", command);
        match command {
            RendererCommand::Exit => {
                info!("종료 명령 수신");
                self.exit.signal();
                Ok(())
            }
            RendererCommand::SetBackground(level) => self.set_background_level(level),
            RendererCommand::SetShapes(level) => self.set_shapes_level(level),
            RendererCommand::SetBrightness(level) => self.set_brightness_level(level),
            RendererCommand::SetDarkBackground(enable) => {
                self.set_dark_background(enable);
                Ok(())
            }
            RendererCommand::SetBlur(level) => {
                self.set_blur(level);
                Ok(())
            }
        }
    }

    pub fn set_background_level(&self, level: f64) -> Result<(), CoreError> {
        self.settings.set_background_level(level)
    }

    pub fn set_shapes_level(&self, level: f64) -> Result<(), CoreError> {
        self.settings.set_shapes_level(level)
    }

    pub fn set_brightness_level(&self, level: f64) -> Result<(), CoreError> {
        self.settings.set_brightness_level(level)
    }

    pub fn set_dark_background(&self, enable: bool) {
        self.settings.set_dark_background(enable);
    }

    pub fn set_blur(&mut self, level: BlurLevel) {
        self.blur = level;
        self.send_control(WorkerControl::SetBlur(level));
    }

    // ============================================================
    // 내부
    // ============================================================

    fn open_parts(&self) -> Result<WorkerParts, CoreError> {
        Ok(WorkerParts {
            source: self.target.open_capture()?,
            presenter: self.target.open_presenter()?,
            processor: self.factory.create(self.kind, &self.config)?,
        })
    }

    fn start_session(&mut self, now: Instant) -> Result<(), CoreError> {
        let placement = self.target.placement()?;
        let desktop = self.target.desktop_size().unwrap_or((
            self.config.classifier.desktop_width,
            self.config.classifier.desktop_height,
        ));
        let mut parts = match self.parts.take() {
            Some(parts) => parts,
            None => self.open_parts()?,
        };

        let size = (placement.rect.width, placement.rect.height);
        if let Err(e) = parts.processor.prepare(size.0, size.1, desktop) {
            error!("파이프라인 초기화 실패: {}", e);
            parts.processor.release();
            self.parts = Some(parts);
            self.machine.stop();
            return Err(e);
        }

        let session = WorkerSession {
            mode: self.mode,
            filter_images: self.filter_images,
            blur: self.blur,
            desktop,
            prepared: Some(size),
            in_use: self.target.is_in_use(),
        };
        let worker = match FrameWorker::spawn(
            parts,
            session,
            &self.config.pipeline,
            Arc::clone(&self.settings),
            Arc::clone(&self.target),
        ) {
            Ok(worker) => worker,
            Err(e) => {
                error!("프레임 워커 시작 실패: {}", e);
                self.machine.stop();
                return Err(e);
            }
        };

        self.tracker.reset(placement);
        self.machine.start(placement.show_state);
        self.usage_poll.reset();
        self.usage_poll.due(now);
        self.dark_gate
            .warmup
            .arm(now, self.config.pipeline.startup_warmup());
        self.worker = Some(worker);
        info!(
            "세션 시작: {}x{} (데스크톱 {}x{})",
            size.0, size.1, desktop.0, desktop.1
        );
        Ok(())
    }

    /// 워커 정지. 구성 요소를 회수하고 종료 사유를 돌려준다.
    fn stop_session(&mut self) -> Option<ExitReason> {
        let worker = self.worker.take()?;
        match worker.stop(self.config.pipeline.handshake_timeout()) {
            Ok(exit) => {
                let mut parts = exit.parts;
                parts.processor.release();
                if let Err(e) = parts.presenter.hide_target() {
                    warn!("오버레이 숨김 실패: {}", e);
                }
                // 실패한 세션의 구성 요소는 재사용하지 않는다
                self.parts = match exit.reason {
                    ExitReason::Stopped => Some(parts),
                    ExitReason::Failed(_) => None,
                };
                Some(exit.reason)
            }
            Err(e) => {
                warn!("워커 정지 실패: {}", e);
                self.parts = None;
                None
            }
        }
    }

    /// 워커가 에러로 끝났으면 정리하고 에러를 돌려준다
    fn collect_worker_failure(&mut self) -> Option<CoreError> {
        let failed = self
            .worker
            .as_ref()
            .is_some_and(|w| w.shared().has_fatal_error());
        if !failed {
            return None;
        }

        let cause = match self.stop_session() {
            Some(ExitReason::Failed(e)) => e,
            _ => CoreError::FrameThread("원인을 알 수 없는 워커 종료".to_string()),
        };
        self.machine.stop();
        self.enabled = false;
        self.fatal = Some(cause.to_string());
        error!("프레임 워커 치명적 에러: {}", cause);

        Some(if cause.is_session_fatal() {
            cause
        } else {
            CoreError::FrameThread(cause.to_string())
        })
    }

    fn execute(&mut self, action: PipelineAction, now: Instant) -> Result<(), CoreError> {
        debug!("파이프라인 동작: {:?}", action);
        match action {
            PipelineAction::Suspend => self.send_control(WorkerControl::Suspend(true)),
            PipelineAction::Resume => self.send_control(WorkerControl::Suspend(false)),
            PipelineAction::Reposition(rect) => self.send_control(WorkerControl::Reposition(rect)),
            PipelineAction::Teardown => {
                if let Some(ExitReason::Failed(e)) = self.stop_session() {
                    warn!("해체 중 워커 에러 보고: {}", e);
                }
            }
            PipelineAction::Restart => {
                self.stop_session();
                self.start_session(now)?;
            }
        }
        Ok(())
    }

    fn send_control(&self, message: WorkerControl) {
        if let Some(worker) = &self.worker {
            worker.control(message);
        }
    }

    fn check_brightness(&mut self, now: Instant) -> Result<(), CoreError> {
        if self.mode != RenderMode::Dark || !self.config.pipeline.dark_brightness_gate {
            return Ok(());
        }

        if self.dark_gate.paused {
            let visible = self.tracker.last().is_some_and(|p| p.is_visible());
            if !visible || !self.dark_gate.probe.due(now) {
                return Ok(());
            }
            match self.target.snapshot() {
                Ok(Some(frame)) if dark_mode::is_bright(&frame, None) => {
                    info!("대상 창이 다시 밝아짐 — 다크 모드 재개");
                    self.dark_gate.paused = false;
                    self.start_session(now)?;
                }
                Ok(_) => {}
                Err(e) => warn!("밝기 확인용 캡처 실패: {}", e),
            }
            return Ok(());
        }

        let Some(worker) = &self.worker else {
            return Ok(());
        };
        if self.dark_gate.warmup.is_active(now) || self.machine.state() != PipelineState::Active {
            return Ok(());
        }
        if worker.shared().bright() == Some(false) {
            info!("대상 창이 이미 어두움 — 다크 모드 일시정지");
            self.stop_session();
            self.machine.stop();
            self.dark_gate.paused = true;
            self.dark_gate.probe.reset();
            self.dark_gate.probe.due(now);
        }
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.disable();
    }
}
