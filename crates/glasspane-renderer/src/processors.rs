//! 프레임 프로세서 선택.
//!
//! 렌더러 생성 시 한 번 결정한다. 호출 지점마다 CPU/가속 분기를 두지 않는다.

use std::sync::Arc;

use glasspane_core::config::AppConfig;
use glasspane_core::error::CoreError;
use glasspane_core::ports::vision::{ComputeDeviceProvider, FrameProcessor, ProcessorKind};
use glasspane_vision::processor::{CpuFrameProcessor, GpuFrameProcessor};
use tracing::{info, warn};

/// 프로세서 생성기
#[derive(Clone, Default)]
pub struct ProcessorFactory {
    provider: Option<Arc<dyn ComputeDeviceProvider>>,
}

impl ProcessorFactory {
    pub fn new(provider: Option<Arc<dyn ComputeDeviceProvider>>) -> Self {
        Self { provider }
    }

    /// CPU 전용
    pub fn cpu_only() -> Self {
        Self { provider: None }
    }

    /// 사용할 프로세서 종류 탐지
    pub fn detect(&self) -> ProcessorKind {
        match &self.provider {
            Some(provider) if provider.is_available() => ProcessorKind::Gpu,
            Some(_) => {
                warn!("가속 장치를 사용할 수 없음 — CPU 프로세서로 대체");
                ProcessorKind::Cpu
            }
            None => ProcessorKind::Cpu,
        }
    }

    pub fn create(
        &self,
        kind: ProcessorKind,
        config: &AppConfig,
    ) -> Result<Box<dyn FrameProcessor>, CoreError> {
        match kind {
            ProcessorKind::Cpu => Ok(Box::new(CpuFrameProcessor::new(config))),
            ProcessorKind::Gpu => {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    CoreError::Internal("가속 장치 공급자 없이 GPU 프로세서 요청".to_string())
                })?;
                let device = provider.create()?;
                let processor = GpuFrameProcessor::new(device, config);
                info!("가속 장치 사용: {}", processor.device_name());
                Ok(Box::new(processor))
            }
        }
    }
}
