//! 프레임 처리 포트.
//!
//! 구현: `glasspane-vision` crate (CpuFrameProcessor, GpuFrameProcessor, HostComputeDevice)

use std::fmt;
use std::time::Instant;

use crate::error::CoreError;
use crate::models::effect::{EffectConfig, RenderMode};
use crate::models::frame::{FrameBuffer, RegionMask};

/// 프로세서 종류: 세션 시작 시 한 번 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Cpu,
    Gpu,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorKind::Cpu => f.write_str("cpu"),
            ProcessorKind::Gpu => f.write_str("gpu"),
        }
    }
}

/// 프레임 한 장 처리 요청
#[derive(Debug, Clone, Copy)]
pub struct ProcessRequest {
    pub mode: RenderMode,
    /// 이미지 영역을 분류해 효과에서 제외할지
    pub filter_images: bool,
    /// 패스 시작 시점의 설정 스냅샷
    pub effect: EffectConfig,
    /// 변경 감지 결과와 무관하게 새 프레임으로 취급 (강제 렌더 구간)
    pub force_render: bool,
    pub now: Instant,
}

/// 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// 효과가 적용된 새 프레임인지 (`false`면 출력 생략)
    pub new_frame: bool,
    /// 다크 모드 밝기 판정 결과 (이번 패스에서 검사한 경우만)
    pub bright: Option<bool>,
}

/// 변경 감지 → 분류 → 효과 파이프라인
pub trait FrameProcessor: Send {
    fn kind(&self) -> ProcessorKind;

    /// 프레임 크기에 맞춰 캐시/마스크/스크래치 버퍼 (재)할당
    fn prepare(&mut self, width: u32, height: u32, desktop: (u32, u32)) -> Result<(), CoreError>;

    /// 프레임 처리 (제자리 수정)
    fn process(
        &mut self,
        frame: &mut FrameBuffer,
        request: &ProcessRequest,
    ) -> Result<ProcessOutcome, CoreError>;

    /// 보유 리소스 해제
    fn release(&mut self);
}

/// 가속 장치: 픽셀 패스를 장치 메모리에서 수행
///
/// 한 패스는 `begin_process` … `end_process`로 감싼다.
pub trait ComputeDevice: Send {
    fn name(&self) -> &str;

    /// 프레임 크기에 맞춰 장치 버퍼 할당
    fn allocate(&mut self, width: u32, height: u32) -> Result<(), CoreError>;

    fn begin_process(&mut self) -> Result<(), CoreError>;

    /// 패스 종료: 에러 경로에서도 반드시 호출된다
    fn end_process(&mut self);

    fn upload_frame(&mut self, frame: &FrameBuffer) -> Result<(), CoreError>;

    /// 이미지 영역 마스크 업로드 (`None`이면 전체 비이미지)
    fn upload_mask(&mut self, mask: Option<&RegionMask>) -> Result<(), CoreError>;

    /// 업로드된 프레임이 직전 프레임과 다른지
    fn is_new_pixels(&mut self) -> Result<bool, CoreError>;

    fn invert_colors(&mut self) -> Result<(), CoreError>;

    fn apply_glass(&mut self, effect: &EffectConfig) -> Result<(), CoreError>;

    fn is_bright(&mut self) -> Result<bool, CoreError>;

    fn download_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), CoreError>;

    fn release(&mut self);
}

/// 가속 장치 탐지/생성
pub trait ComputeDeviceProvider: Send + Sync {
    /// 장치 사용 가능 여부
    fn is_available(&self) -> bool;

    fn create(&self) -> Result<Box<dyn ComputeDevice>, CoreError>;
}
