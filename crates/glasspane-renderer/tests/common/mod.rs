//! 렌더러 통합 테스트용 모의 포트.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glasspane_core::config::{AppConfig, GlassConfig};
use glasspane_core::error::{CoreError, PipelineStage};
use glasspane_core::models::effect::{BlurLevel, EffectConfig};
use glasspane_core::models::frame::{FrameBuffer, Rect, RegionMask};
use glasspane_core::models::geometry::{ShowState, WindowPlacement};
use glasspane_core::ports::capture::FrameSource;
use glasspane_core::ports::display::Presenter;
use glasspane_core::ports::vision::{ComputeDevice, ComputeDeviceProvider};
use glasspane_core::ports::window::TargetWindow;
use glasspane_renderer::mailbox::{FrameMailbox, MailboxSource};
use glasspane_vision::device::HostComputeDevice;
use parking_lot::Mutex;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// 빠른 테스트용 설정 (사용 중 판정 → 1ms 슬립, 워밍업 없음)
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default_config();
    config.pipeline.idle_sleep_ms = 5;
    config.pipeline.reveal_delay_ms = 1;
    config.pipeline.startup_warmup_ms = 0;
    config.effect.filter_images = false;
    config
}

pub fn gray(width: u32, height: u32, level: u8) -> FrameBuffer {
    FrameBuffer::filled(width, height, [level, level, level, 255])
}

/// 조건이 참이 될 때까지 최대 `timeout` 폴링
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ============================================================
// Presenter
// ============================================================

/// 출력 기록
#[derive(Debug, Default)]
pub struct PresenterLog {
    pub presented: Vec<(u32, u32)>,
    pub last_pixel: Option<[u8; 4]>,
    pub hides: usize,
    pub shows: usize,
    pub placements: Vec<Rect>,
    pub brightness: Vec<f64>,
    pub blur: Vec<BlurLevel>,
}

pub struct RecordingPresenter {
    log: Arc<Mutex<PresenterLog>>,
    fail_present: Arc<AtomicBool>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        if self.fail_present.load(Ordering::SeqCst) {
            return Err(CoreError::Display("surface lost".to_string()));
        }
        let mut log = self.log.lock();
        log.presented.push(frame.size());
        log.last_pixel = Some(frame.pixel(0, 0));
        Ok(())
    }

    fn hide_target(&mut self) -> Result<(), CoreError> {
        self.log.lock().hides += 1;
        Ok(())
    }

    fn show_target(&mut self) -> Result<(), CoreError> {
        self.log.lock().shows += 1;
        Ok(())
    }

    fn update_placement(&mut self, rect: Rect) -> Result<(), CoreError> {
        self.log.lock().placements.push(rect);
        Ok(())
    }

    fn set_brightness(&mut self, level: f64) -> Result<(), CoreError> {
        self.log.lock().brightness.push(level);
        Ok(())
    }

    fn set_blur(&mut self, level: BlurLevel) -> Result<(), CoreError> {
        self.log.lock().blur.push(level);
        Ok(())
    }
}

// ============================================================
// TargetWindow
// ============================================================

/// 스크립트로 조종하는 대상 창
pub struct MockTarget {
    pub mailbox: Arc<FrameMailbox>,
    /// `None`이면 창이 사라진 것으로 보고
    pub placement: Mutex<Option<WindowPlacement>>,
    pub in_use: AtomicBool,
    pub snapshot: Mutex<Option<FrameBuffer>>,
    pub log: Arc<Mutex<PresenterLog>>,
    pub fail_present: Arc<AtomicBool>,
    pub captures_opened: AtomicUsize,
}

impl MockTarget {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            mailbox: Arc::new(FrameMailbox::new()),
            placement: Mutex::new(Some(WindowPlacement::new(
                Rect::new(100, 100, width, height),
                ShowState::Normal,
            ))),
            in_use: AtomicBool::new(true),
            snapshot: Mutex::new(None),
            log: Arc::new(Mutex::new(PresenterLog::default())),
            fail_present: Arc::new(AtomicBool::new(false)),
            captures_opened: AtomicUsize::new(0),
        })
    }

    pub fn publish(&self, frame: FrameBuffer) {
        self.mailbox.publish(frame);
    }

    pub fn set_placement(&self, placement: Option<WindowPlacement>) {
        *self.placement.lock() = placement;
    }

    pub fn set_show_state(&self, show_state: ShowState) {
        if let Some(p) = self.placement.lock().as_mut() {
            p.show_state = show_state;
        }
    }

    pub fn presented(&self) -> usize {
        self.log.lock().presented.len()
    }
}

impl TargetWindow for MockTarget {
    fn placement(&self) -> Result<WindowPlacement, CoreError> {
        let placement = *self.placement.lock();
        placement.ok_or_else(|| CoreError::GeometryQuery("창이 사라짐".to_string()))
    }

    fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    fn desktop_size(&self) -> Option<(u32, u32)> {
        Some((1920, 1080))
    }

    fn open_capture(&self) -> Result<Box<dyn FrameSource>, CoreError> {
        self.captures_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MailboxSource::new(Arc::clone(&self.mailbox))))
    }

    fn open_presenter(&self) -> Result<Box<dyn Presenter>, CoreError> {
        Ok(Box::new(RecordingPresenter {
            log: Arc::clone(&self.log),
            fail_present: Arc::clone(&self.fail_present),
        }))
    }

    fn snapshot(&self) -> Result<Option<FrameBuffer>, CoreError> {
        Ok(self.snapshot.lock().clone())
    }
}

// ============================================================
// ComputeDevice
// ============================================================

/// 할당 횟수를 세는 장치 공급자. `fail_allocation`이면 할당 실패를 흉내낸다.
#[derive(Default)]
pub struct CountingProvider {
    pub allocations: Arc<Mutex<Vec<(u32, u32)>>>,
    pub fail_allocation: bool,
}

impl CountingProvider {
    pub fn allocation_count(&self) -> usize {
        self.allocations.lock().len()
    }
}

impl ComputeDeviceProvider for CountingProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn create(&self) -> Result<Box<dyn ComputeDevice>, CoreError> {
        Ok(Box::new(CountingDevice {
            inner: HostComputeDevice::new(GlassConfig::default(), 1),
            allocations: Arc::clone(&self.allocations),
            fail_allocation: self.fail_allocation,
        }))
    }
}

struct CountingDevice {
    inner: HostComputeDevice,
    allocations: Arc<Mutex<Vec<(u32, u32)>>>,
    fail_allocation: bool,
}

impl ComputeDevice for CountingDevice {
    fn name(&self) -> &str {
        "counting"
    }

    fn allocate(&mut self, width: u32, height: u32) -> Result<(), CoreError> {
        if self.fail_allocation {
            return Err(CoreError::Allocation {
                stage: PipelineStage::Glass,
                bytes: width as usize * height as usize,
            });
        }
        self.allocations.lock().push((width, height));
        self.inner.allocate(width, height)
    }

    fn begin_process(&mut self) -> Result<(), CoreError> {
        self.inner.begin_process()
    }

    fn end_process(&mut self) {
        self.inner.end_process()
    }

    fn upload_frame(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        self.inner.upload_frame(frame)
    }

    fn upload_mask(&mut self, mask: Option<&RegionMask>) -> Result<(), CoreError> {
        self.inner.upload_mask(mask)
    }

    fn is_new_pixels(&mut self) -> Result<bool, CoreError> {
        self.inner.is_new_pixels()
    }

    fn invert_colors(&mut self) -> Result<(), CoreError> {
        self.inner.invert_colors()
    }

    fn apply_glass(&mut self, effect: &EffectConfig) -> Result<(), CoreError> {
        self.inner.apply_glass(effect)
    }

    fn is_bright(&mut self) -> Result<bool, CoreError> {
        self.inner.is_bright()
    }

    fn download_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), CoreError> {
        self.inner.download_frame(frame)
    }

    fn release(&mut self) {
        self.inner.release()
    }
}
