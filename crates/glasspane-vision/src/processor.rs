//! 프레임 처리 오케스트레이터.
//!
//! `FrameProcessor` 포트 구현. 한 프레임 안에서 단계 순서는 고정:
//! 변경 감지 → (이미지 영역 분류) → 밝기 판정 → 반전/글래스.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use glasspane_core::config::AppConfig;
use glasspane_core::error::{CoreError, PipelineStage};
use glasspane_core::models::effect::RenderMode;
use glasspane_core::models::frame::{FrameBuffer, RegionMask, BYTES_PER_PIXEL};
use glasspane_core::ports::vision::{
    ComputeDevice, FrameProcessor, ProcessOutcome, ProcessRequest, ProcessorKind,
};
use tracing::{debug, error, info};

use crate::change::ChangeCache;
use crate::classifier::RegionClassifier;
use crate::dark_mode;
use crate::glass::GlassComposer;

/// 다크 모드 밝기 판정 주기 관리
#[derive(Debug)]
struct BrightnessTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl BrightnessTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// 판정할 때가 되었으면 시각을 기록하고 `true`
    fn due(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .map_or(true, |t| now.saturating_duration_since(t) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

fn ensure_size(prepared: Option<(u32, u32)>, frame: &FrameBuffer) -> Result<(), CoreError> {
    match prepared {
        Some(size) if size == frame.size() => Ok(()),
        Some((w, h)) => Err(CoreError::processing(
            PipelineStage::ChangeDetection,
            format!(
                "준비된 크기 {}x{}와 프레임 크기 {}x{} 불일치",
                w, h, frame.width, frame.height
            ),
        )),
        None => Err(CoreError::processing(
            PipelineStage::ChangeDetection,
            "prepare 전에 process 호출",
        )),
    }
}

/// CPU 프레임 처리기: 모든 단계를 호스트 메모리에서 수행
#[derive(Debug)]
pub struct CpuFrameProcessor {
    cache: ChangeCache,
    classifier: RegionClassifier,
    glass: GlassComposer,
    brightness: BrightnessTimer,
    prepared: Option<(u32, u32)>,
}

impl CpuFrameProcessor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            cache: ChangeCache::new(config.pipeline.change_trailing_margin_px),
            classifier: RegionClassifier::new(config.classifier.clone()),
            glass: GlassComposer::new(config.glass.clone()),
            brightness: BrightnessTimer::new(config.pipeline.brightness_check_interval()),
            prepared: None,
        }
    }

    /// 마지막 분류 결과
    pub fn mask(&self) -> &RegionMask {
        self.classifier.mask()
    }
}

impl FrameProcessor for CpuFrameProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Cpu
    }

    fn prepare(&mut self, width: u32, height: u32, desktop: (u32, u32)) -> Result<(), CoreError> {
        self.prepared = None;
        self.cache
            .prepare(width, height, width as usize * BYTES_PER_PIXEL)?;
        self.classifier.prepare(width, height, desktop)?;
        self.glass.prepare(width, height)?;
        self.brightness.reset();
        self.prepared = Some((width, height));
        info!("CPU 프로세서 준비 완료: {}x{}", width, height);
        Ok(())
    }

    fn process(
        &mut self,
        frame: &mut FrameBuffer,
        request: &ProcessRequest,
    ) -> Result<ProcessOutcome, CoreError> {
        ensure_size(self.prepared, frame)?;

        // 강제 렌더 중에도 캐시는 갱신
        let changed = self.cache.has_changed(frame);
        if !(changed || request.force_render) {
            return Ok(ProcessOutcome::default());
        }

        let mask = if request.filter_images {
            Some(
                self.classifier
                    .classify(frame, request.force_render, request.now)?,
            )
        } else {
            None
        };

        let mut bright = None;
        match request.mode {
            RenderMode::Dark => {
                if self.brightness.due(request.now) {
                    bright = Some(dark_mode::is_bright(frame, mask));
                }
                dark_mode::invert_colors(frame, mask);
            }
            RenderMode::Glass => {
                self.glass.apply(frame, mask, &request.effect)?;
            }
        }

        Ok(ProcessOutcome {
            new_frame: true,
            bright,
        })
    }

    fn release(&mut self) {
        self.cache.release();
        self.classifier.release();
        self.glass.release();
        self.prepared = None;
        debug!("CPU 프로세서 리소스 해제");
    }
}

/// 장치 패스 가드: 생성 시 `begin_process`, 어떤 경로로 빠져나가도 `end_process`
pub struct DeviceScope<'a, D: ComputeDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: ComputeDevice + ?Sized> DeviceScope<'a, D> {
    pub fn begin(device: &'a mut D) -> Result<Self, CoreError> {
        device.begin_process()?;
        Ok(Self { device })
    }
}

impl<D: ComputeDevice + ?Sized> Deref for DeviceScope<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: ComputeDevice + ?Sized> DerefMut for DeviceScope<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: ComputeDevice + ?Sized> Drop for DeviceScope<'_, D> {
    fn drop(&mut self) {
        self.device.end_process();
    }
}

/// 가속 프레임 처리기.
///
/// 이미지 필터링이 켜져 있으면 변경 감지/분류는 CPU에서 하고 마스크만 장치로 올린다.
/// 꺼져 있으면 변경 감지도 장치에서 한다.
pub struct GpuFrameProcessor {
    device: Box<dyn ComputeDevice>,
    cache: ChangeCache,
    classifier: RegionClassifier,
    brightness: BrightnessTimer,
    prepared: Option<(u32, u32)>,
}

impl GpuFrameProcessor {
    pub fn new(device: Box<dyn ComputeDevice>, config: &AppConfig) -> Self {
        Self {
            device,
            cache: ChangeCache::new(config.pipeline.change_trailing_margin_px),
            classifier: RegionClassifier::new(config.classifier.clone()),
            brightness: BrightnessTimer::new(config.pipeline.brightness_check_interval()),
            prepared: None,
        }
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    fn run_pass(
        &mut self,
        frame: &mut FrameBuffer,
        request: &ProcessRequest,
    ) -> Result<ProcessOutcome, CoreError> {
        let mask = if request.filter_images {
            let changed = self.cache.has_changed(frame);
            if !(changed || request.force_render) {
                return Ok(ProcessOutcome::default());
            }
            Some(
                self.classifier
                    .classify(frame, request.force_render, request.now)?,
            )
        } else {
            None
        };

        let mut scope = DeviceScope::begin(self.device.as_mut())?;
        scope.upload_frame(frame)?;

        if mask.is_none() {
            let changed = scope.is_new_pixels()?;
            if !(changed || request.force_render) {
                return Ok(ProcessOutcome::default());
            }
        }
        scope.upload_mask(mask)?;

        let mut bright = None;
        match request.mode {
            RenderMode::Dark => {
                if self.brightness.due(request.now) {
                    bright = Some(scope.is_bright()?);
                }
                scope.invert_colors()?;
            }
            RenderMode::Glass => scope.apply_glass(&request.effect)?,
        }
        scope.download_frame(frame)?;

        Ok(ProcessOutcome {
            new_frame: true,
            bright,
        })
    }
}

impl FrameProcessor for GpuFrameProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Gpu
    }

    fn prepare(&mut self, width: u32, height: u32, desktop: (u32, u32)) -> Result<(), CoreError> {
        self.prepared = None;
        self.device.allocate(width, height)?;
        self.cache
            .prepare(width, height, width as usize * BYTES_PER_PIXEL)?;
        self.classifier.prepare(width, height, desktop)?;
        self.brightness.reset();
        self.prepared = Some((width, height));
        info!(
            "가속 프로세서 준비 완료: {}x{} ({})",
            width,
            height,
            self.device.name()
        );
        Ok(())
    }

    fn process(
        &mut self,
        frame: &mut FrameBuffer,
        request: &ProcessRequest,
    ) -> Result<ProcessOutcome, CoreError> {
        ensure_size(self.prepared, frame)?;
        self.run_pass(frame, request).inspect_err(|e| {
            error!("가속 프레임 처리 실패 [{}]: {}", self.device.name(), e);
        })
    }

    fn release(&mut self) {
        self.device.release();
        self.cache.release();
        self.classifier.release();
        self.prepared = None;
        debug!("가속 프로세서 리소스 해제");
    }
}
