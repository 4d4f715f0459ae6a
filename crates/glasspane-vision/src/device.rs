//! 호스트 메모리 연산 장치.
//!
//! `ComputeDevice` 포트의 소프트웨어 구현. 전용 가속기가 없는 환경에서 가속 경로
//! (`GpuFrameProcessor`)를 그대로 돌릴 수 있게 한다. 출력은 CPU 경로와 비트 단위로 같다.

use glasspane_core::config::GlassConfig;
use glasspane_core::error::{CoreError, PipelineStage};
use glasspane_core::models::effect::EffectConfig;
use glasspane_core::models::frame::{FrameBuffer, RegionMask, BYTES_PER_PIXEL};
use glasspane_core::ports::vision::{ComputeDevice, ComputeDeviceProvider};
use tracing::debug;

use crate::change::ChangeCache;
use crate::dark_mode;
use crate::glass::GlassComposer;

const DEVICE_NAME: &str = "host";

/// 호스트 메모리 장치
#[derive(Debug)]
pub struct HostComputeDevice {
    glass: GlassComposer,
    previous: ChangeCache,
    frame: Option<FrameBuffer>,
    mask: Option<RegionMask>,
    allocated: Option<(u32, u32)>,
    in_pass: bool,
    passes: u64,
}

impl HostComputeDevice {
    pub fn new(glass: GlassConfig, trailing_margin: u32) -> Self {
        Self {
            glass: GlassComposer::new(glass),
            previous: ChangeCache::new(trailing_margin),
            frame: None,
            mask: None,
            allocated: None,
            in_pass: false,
            passes: 0,
        }
    }

    /// 완료된 패스 수
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn is_in_pass(&self) -> bool {
        self.in_pass
    }

    fn require_pass(&self, stage: PipelineStage) -> Result<(), CoreError> {
        if self.in_pass {
            Ok(())
        } else {
            Err(CoreError::processing(stage, "패스 밖에서 장치 호출"))
        }
    }

    fn frame_mut(&mut self, stage: PipelineStage) -> Result<&mut FrameBuffer, CoreError> {
        self.require_pass(stage)?;
        self.frame
            .as_mut()
            .ok_or_else(|| CoreError::processing(stage, "업로드된 프레임 없음"))
    }
}

impl ComputeDevice for HostComputeDevice {
    fn name(&self) -> &str {
        DEVICE_NAME
    }

    fn allocate(&mut self, width: u32, height: u32) -> Result<(), CoreError> {
        self.allocated = None;
        self.glass.prepare(width, height)?;
        self.previous
            .prepare(width, height, width as usize * BYTES_PER_PIXEL)?;
        self.frame = None;
        self.mask = None;
        self.allocated = Some((width, height));
        debug!("호스트 장치 버퍼 할당: {}x{}", width, height);
        Ok(())
    }

    fn begin_process(&mut self) -> Result<(), CoreError> {
        if self.allocated.is_none() {
            return Err(CoreError::processing(
                PipelineStage::Allocation,
                "할당 전에 패스 시작",
            ));
        }
        if self.in_pass {
            return Err(CoreError::processing(
                PipelineStage::Allocation,
                "이전 패스가 닫히지 않음",
            ));
        }
        self.in_pass = true;
        Ok(())
    }

    fn end_process(&mut self) {
        if self.in_pass {
            self.in_pass = false;
            self.passes += 1;
        }
    }

    fn upload_frame(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        self.require_pass(PipelineStage::Capture)?;
        if Some(frame.size()) != self.allocated {
            return Err(CoreError::processing(
                PipelineStage::Capture,
                format!("장치 버퍼와 프레임 크기 불일치: {}x{}", frame.width, frame.height),
            ));
        }
        match self.frame.as_mut() {
            Some(buffer) => buffer.clone_from(frame),
            None => self.frame = Some(frame.clone()),
        }
        Ok(())
    }

    fn upload_mask(&mut self, mask: Option<&RegionMask>) -> Result<(), CoreError> {
        self.require_pass(PipelineStage::Classification)?;
        match (mask, self.mask.as_mut()) {
            (Some(src), Some(dst)) => dst.clone_from(src),
            (Some(src), None) => self.mask = Some(src.clone()),
            (None, _) => self.mask = None,
        }
        Ok(())
    }

    fn is_new_pixels(&mut self) -> Result<bool, CoreError> {
        self.require_pass(PipelineStage::ChangeDetection)?;
        let frame = self.frame.as_ref().ok_or_else(|| {
            CoreError::processing(PipelineStage::ChangeDetection, "업로드된 프레임 없음")
        })?;
        Ok(self.previous.has_changed(frame))
    }

    fn invert_colors(&mut self) -> Result<(), CoreError> {
        let mask = self.mask.take();
        let result = self
            .frame_mut(PipelineStage::DarkMode)
            .map(|frame| dark_mode::invert_colors(frame, mask.as_ref()));
        self.mask = mask;
        result
    }

    fn apply_glass(&mut self, effect: &EffectConfig) -> Result<(), CoreError> {
        self.require_pass(PipelineStage::Glass)?;
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| CoreError::processing(PipelineStage::Glass, "업로드된 프레임 없음"))?;
        self.glass.apply(frame, self.mask.as_ref(), effect)
    }

    fn is_bright(&mut self) -> Result<bool, CoreError> {
        self.require_pass(PipelineStage::DarkMode)?;
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| CoreError::processing(PipelineStage::DarkMode, "업로드된 프레임 없음"))?;
        Ok(dark_mode::is_bright(frame, self.mask.as_ref()))
    }

    fn download_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), CoreError> {
        let source = self.frame_mut(PipelineStage::Present)?;
        if source.size() != frame.size() {
            return Err(CoreError::processing(
                PipelineStage::Present,
                "다운로드 대상 크기 불일치",
            ));
        }
        frame.clone_from(source);
        Ok(())
    }

    fn release(&mut self) {
        self.glass.release();
        self.previous.release();
        self.frame = None;
        self.mask = None;
        self.allocated = None;
        self.in_pass = false;
        debug!("호스트 장치 리소스 해제");
    }
}

/// 호스트 장치 공급자: 항상 사용 가능
#[derive(Debug, Clone)]
pub struct HostDeviceProvider {
    glass: GlassConfig,
    trailing_margin: u32,
}

impl HostDeviceProvider {
    pub fn new(glass: GlassConfig, trailing_margin: u32) -> Self {
        Self {
            glass,
            trailing_margin,
        }
    }
}

impl ComputeDeviceProvider for HostDeviceProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn create(&self) -> Result<Box<dyn ComputeDevice>, CoreError> {
        Ok(Box::new(HostComputeDevice::new(
            self.glass.clone(),
            self.trailing_margin,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(w: u32, h: u32) -> HostComputeDevice {
        let mut device = HostComputeDevice::new(GlassConfig::default(), 1);
        device.allocate(w, h).unwrap();
        device
    }

    #[test]
    fn pass_requires_allocation() {
        let mut device = HostComputeDevice::new(GlassConfig::default(), 1);
        assert!(device.begin_process().is_err());
    }

    #[test]
    fn calls_outside_pass_are_rejected() {
        let mut device = device(4, 4);
        let frame = FrameBuffer::filled(4, 4, [1; 4]);
        assert!(device.upload_frame(&frame).is_err());
        assert!(device.is_bright().is_err());
    }

    #[test]
    fn nested_pass_is_rejected() {
        let mut device = device(4, 4);
        device.begin_process().unwrap();
        assert!(device.begin_process().is_err());
        device.end_process();
        assert_eq!(device.pass_count(), 1);
        assert!(!device.is_in_pass());
    }

    #[test]
    fn invert_round_trip_through_device() {
        let mut device = device(4, 4);
        let mut frame = FrameBuffer::filled(4, 4, [10, 20, 30, 255]);
        let mut mask = RegionMask::try_new(4, 4).unwrap();
        mask.set(0, 0, true);

        device.begin_process().unwrap();
        device.upload_frame(&frame).unwrap();
        device.upload_mask(Some(&mask)).unwrap();
        assert!(device.is_new_pixels().unwrap());
        device.invert_colors().unwrap();
        device.download_frame(&mut frame).unwrap();
        device.end_process();

        assert_eq!(frame.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(frame.pixel(1, 0), [245, 235, 225, 255]);
    }

    #[test]
    fn new_pixels_tracks_uploads() {
        let mut device = device(4, 4);
        let frame = FrameBuffer::filled(4, 4, [7; 4]);
        for expected in [true, false] {
            device.begin_process().unwrap();
            device.upload_frame(&frame).unwrap();
            assert_eq!(device.is_new_pixels().unwrap(), expected);
            device.end_process();
        }
    }

    #[test]
    fn upload_rejects_wrong_size() {
        let mut device = device(4, 4);
        device.begin_process().unwrap();
        let err = device
            .upload_frame(&FrameBuffer::filled(5, 4, [0; 4]))
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Capture));
    }

    #[test]
    fn provider_creates_named_device() {
        let provider = HostDeviceProvider::new(GlassConfig::default(), 1);
        assert!(provider.is_available());
        assert_eq!(provider.create().unwrap().name(), "host");
    }
}
