//! glasspane 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입을 그대로 반환하거나 `anyhow`로 감싼다.
//! 실패 지점은 [`PipelineStage`]로 어느 단계에서 실패했는지 함께 보고한다.

use std::fmt;

use thiserror::Error;

/// 프레임 파이프라인 단계: 에러 발생 위치 식별용
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// 프레임 캡처 (FrameSource)
    Capture,
    /// 변경 감지 (ChangeCache)
    ChangeDetection,
    /// 이미지 영역 분류 (RegionClassifier)
    Classification,
    /// 다크 모드 색 반전
    DarkMode,
    /// 글래스 효과 합성
    Glass,
    /// 화면 출력 (Presenter)
    Present,
    /// 버퍼/리소스 할당
    Allocation,
    /// 창 위치/상태 조회
    Placement,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Capture => "capture",
            PipelineStage::ChangeDetection => "change-detection",
            PipelineStage::Classification => "classification",
            PipelineStage::DarkMode => "dark-mode",
            PipelineStage::Glass => "glass",
            PipelineStage::Present => "present",
            PipelineStage::Allocation => "allocation",
            PipelineStage::Placement => "placement",
        };
        f.write_str(name)
    }
}

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 스크래치/캐시 버퍼 할당 실패: 현재 세션 초기화 중단
    #[error("버퍼 할당 실패 [{stage}]: {bytes} bytes")]
    Allocation {
        /// 할당을 시도한 단계
        stage: PipelineStage,
        /// 요청한 크기 (바이트)
        bytes: usize,
    },

    /// 프레임 처리 도중 단계 실패: 워커 루프 종료
    #[error("프레임 처리 실패 [{stage}]: {message}")]
    FrameProcessing {
        /// 실패한 단계
        stage: PipelineStage,
        /// 실패 사유
        message: String,
    },

    /// 프레임 워커가 치명적 에러로 종료됨 (sticky)
    #[error("프레임 워커 치명적 에러: {0}")]
    FrameThread(String),

    /// 대상 창 위치 조회 실패 (창이 사라짐)
    #[error("창 위치 조회 실패: {0}")]
    GeometryQuery(String),

    /// 워커 시작/종료 대기 시간 초과
    #[error("워커 {operation} 대기 시간 초과: {timeout_ms}ms")]
    WorkerTimeout {
        /// 대기한 동작 (예: "start", "stop")
        operation: String,
        /// 대기 한도 (밀리초)
        timeout_ms: u64,
    },

    /// 캡처 소스 에러
    #[error("캡처 에러: {0}")]
    Capture(String),

    /// 출력 레이어 에러
    #[error("출력 에러: {0}")]
    Display(String),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 단계 지정 프레임 처리 에러 생성
    pub fn processing(stage: PipelineStage, message: impl Into<String>) -> Self {
        CoreError::FrameProcessing {
            stage,
            message: message.into(),
        }
    }

    /// 에러가 발생한 파이프라인 단계 (알 수 있는 경우)
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            CoreError::Allocation { stage, .. } | CoreError::FrameProcessing { stage, .. } => {
                Some(*stage)
            }
            CoreError::Capture(_) => Some(PipelineStage::Capture),
            CoreError::Display(_) => Some(PipelineStage::Present),
            CoreError::GeometryQuery(_) => Some(PipelineStage::Placement),
            _ => None,
        }
    }

    /// 세션 전체를 종료해야 하는 에러인지 여부
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, CoreError::GeometryQuery(_))
    }
}

/// `Vec` 버퍼를 실패 가능하게 할당: 할당 실패를 [`CoreError::Allocation`]으로 변환
pub fn try_alloc<T: Clone>(len: usize, value: T, stage: PipelineStage) -> Result<Vec<T>, CoreError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| CoreError::Allocation {
        stage,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    buf.resize(len, value);
    Ok(buf)
}
