//! 애플리케이션 설정 구조체.
//!
//! 효과 배율, 분류기 임계값, 글래스 셀 크기, 파이프라인 타이머, 재시작 정책을
//! 정의한다. 파일(JSON)과 환경변수(`GLASSPANE__*`)에서 `config` crate로 로드.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::effect::{check_level, BlurLevel, EffectConfig, RenderMode};

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 효과 설정
    #[serde(default)]
    pub effect: EffectSection,
    /// 이미지 영역 분류기 설정
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// 글래스 합성 설정
    #[serde(default)]
    pub glass: GlassConfig,
    /// 파이프라인 타이머/워커 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// 재시작 정책
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

// ============================================================
// 효과 설정
// ============================================================

/// 효과 설정: 모드와 런타임 스칼라의 초기값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSection {
    /// 렌더링 모드 (dark | glass)
    #[serde(default)]
    pub mode: RenderMode,
    /// 이미지(사진) 영역을 효과에서 제외
    #[serde(default = "default_true")]
    pub filter_images: bool,
    /// 배경 밝기 배율 [0, 1]
    #[serde(default = "default_level")]
    pub background_level: f64,
    /// 도형/글자 밝기 배율 [0, 1]
    #[serde(default = "default_level")]
    pub shapes_level: f64,
    /// 오버레이 밝기 [0, 1]
    #[serde(default = "default_level")]
    pub brightness_level: f64,
    /// 밝은 배경 반전 (글래스 모드)
    #[serde(default)]
    pub dark_background: bool,
    /// 배경 블러
    #[serde(default)]
    pub blur: BlurLevel,
}

impl Default for EffectSection {
    fn default() -> Self {
        Self {
            mode: RenderMode::Dark,
            filter_images: true,
            background_level: default_level(),
            shapes_level: default_level(),
            brightness_level: default_level(),
            dark_background: false,
            blur: BlurLevel::None,
        }
    }
}

impl EffectSection {
    /// 런타임 스칼라 초기값
    pub fn initial_effect(&self) -> EffectConfig {
        EffectConfig {
            background_level: self.background_level,
            shapes_level: self.shapes_level,
            brightness_level: self.brightness_level,
            dark_background: self.dark_background,
        }
    }
}

// ============================================================
// 분류기 설정
// ============================================================

/// 이미지 영역 분류기 설정: 특정 해상도 대역에 맞춰 조정된 경험값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// 샘플 간격 = floor(grid_factor × (데스크톱 너비 + 높이))
    #[serde(default = "default_grid_factor")]
    pub grid_factor: f64,
    /// 그리드 한 칸의 샘플 수
    #[serde(default = "default_grid_points")]
    pub grid_points: u32,
    /// 시드 판정 전환 횟수 임계값
    #[serde(default = "default_seed_threshold")]
    pub seed_threshold: i32,
    /// 행 방향 성장 임계값
    #[serde(default = "default_span_threshold")]
    pub span_threshold: i32,
    /// 반복 확장 임계값
    #[serde(default = "default_expand_threshold")]
    pub expand_threshold: i32,
    /// 최소 행 길이 (그리드 칸, 초과해야 통과)
    #[serde(default = "default_min_span_cells")]
    pub min_span_cells: u32,
    /// 좌우 가장자리 제외 폭 (픽셀)
    #[serde(default = "default_edge_margin_x")]
    pub edge_margin_x: u32,
    /// 상하 가장자리 제외 폭 (픽셀)
    #[serde(default = "default_edge_margin_y")]
    pub edge_margin_y: u32,
    /// 흔한 색 판정 연속 반복 횟수
    #[serde(default = "default_common_color_repeat")]
    pub common_color_repeat: u32,
    /// 흔한 색 스캔 라인 간격 (픽셀)
    #[serde(default = "default_common_color_line_step")]
    pub common_color_line_step: u32,
    /// 흔한 색 스캔 라인 기울기 (이 픽셀마다 한 칸 이동)
    #[serde(default = "default_common_color_drift")]
    pub common_color_drift: u32,
    /// 흔한 색 갱신 주기 (밀리초)
    #[serde(default = "default_common_color_refresh_ms")]
    pub common_color_refresh_ms: u64,
    /// 색 동일 판정 허용 오차 (채널별, 0 = 정확히 일치)
    #[serde(default)]
    pub color_tolerance: u8,
    /// 데스크톱 크기를 알 수 없을 때 사용할 너비
    #[serde(default = "default_desktop_width")]
    pub desktop_width: u32,
    /// 데스크톱 크기를 알 수 없을 때 사용할 높이
    #[serde(default = "default_desktop_height")]
    pub desktop_height: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            grid_factor: default_grid_factor(),
            grid_points: default_grid_points(),
            seed_threshold: default_seed_threshold(),
            span_threshold: default_span_threshold(),
            expand_threshold: default_expand_threshold(),
            min_span_cells: default_min_span_cells(),
            edge_margin_x: default_edge_margin_x(),
            edge_margin_y: default_edge_margin_y(),
            common_color_repeat: default_common_color_repeat(),
            common_color_line_step: default_common_color_line_step(),
            common_color_drift: default_common_color_drift(),
            common_color_refresh_ms: default_common_color_refresh_ms(),
            color_tolerance: 0,
            desktop_width: default_desktop_width(),
            desktop_height: default_desktop_height(),
        }
    }
}

impl ClassifierConfig {
    /// 흔한 색 갱신 주기
    pub fn common_color_refresh(&self) -> Duration {
        Duration::from_millis(self.common_color_refresh_ms)
    }
}

// ============================================================
// 글래스 설정
// ============================================================

/// 글래스 합성 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlassConfig {
    /// 축소 맵 셀 한 변 (픽셀)
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,
    /// 행 방향 잡음 제거 허용 불일치 (셀)
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance: u32,
    /// 열 방향 잡음 제거 허용 불일치 (셀)
    #[serde(default = "default_column_tolerance")]
    pub column_tolerance: u32,
    /// 이 값보다 밝은 배경은 dark_background에서 반전
    #[serde(default = "default_bright_threshold")]
    pub bright_threshold: u8,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            row_tolerance: default_row_tolerance(),
            column_tolerance: default_column_tolerance(),
            bright_threshold: default_bright_threshold(),
        }
    }
}

// ============================================================
// 파이프라인 설정
// ============================================================

/// 파이프라인 타이머/워커 설정
///
/// 디바운스·강제 렌더 값은 경험적으로 맞춘 값이라 설정으로 노출한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 크기 변경 디바운스 (밀리초)
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,
    /// 최소화/숨김 후 해제까지 대기 (밀리초)
    #[serde(default = "default_minimize_debounce_ms")]
    pub minimize_debounce_ms: u64,
    /// 최대화/복원 디바운스 (밀리초)
    #[serde(default = "default_maximize_debounce_ms")]
    pub maximize_debounce_ms: u64,
    /// 숨김 상태에서 복원 시 재개 지연 (밀리초)
    #[serde(default = "default_resume_delay_ms")]
    pub resume_delay_ms: u64,
    /// 크기 확정 후 강제 렌더 구간 (밀리초)
    #[serde(default = "default_forced_render_ms")]
    pub forced_render_ms: u64,
    /// 크기 확정 후 첫 프레임 출력 뒤 다시 표시까지 (밀리초)
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    /// 창 사용 중 워커 대기 (밀리초)
    #[serde(default = "default_active_sleep_ms")]
    pub active_sleep_ms: u64,
    /// 창 미사용 중 워커 대기 (밀리초)
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,
    /// 워커 시작/종료 확인 대기 한도 (밀리초)
    #[serde(default = "default_worker_handshake_timeout_ms")]
    pub worker_handshake_timeout_ms: u64,
    /// 창 사용 여부 확인 주기 (밀리초)
    #[serde(default = "default_usage_poll_interval_ms")]
    pub usage_poll_interval_ms: u64,
    /// 다크 모드 밝기 확인 주기 (밀리초)
    #[serde(default = "default_brightness_check_interval_ms")]
    pub brightness_check_interval_ms: u64,
    /// 밝기 게이트 재시작 시 워커 예열 (밀리초)
    #[serde(default = "default_startup_warmup_ms")]
    pub startup_warmup_ms: u64,
    /// 변경 감지에서 제외할 오른쪽 끝 열 수 (픽셀)
    #[serde(default = "default_change_trailing_margin_px")]
    pub change_trailing_margin_px: u32,
    /// 컨트롤러 루프 주기 (밀리초)
    #[serde(default = "default_controller_tick_ms")]
    pub controller_tick_ms: u64,
    /// 가속 장치 사용 시도
    #[serde(default)]
    pub acceleration: bool,
    /// 다크 모드에서 창이 어두워지면 일시정지
    #[serde(default = "default_true")]
    pub dark_brightness_gate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: default_resize_debounce_ms(),
            minimize_debounce_ms: default_minimize_debounce_ms(),
            maximize_debounce_ms: default_maximize_debounce_ms(),
            resume_delay_ms: default_resume_delay_ms(),
            forced_render_ms: default_forced_render_ms(),
            reveal_delay_ms: default_reveal_delay_ms(),
            active_sleep_ms: default_active_sleep_ms(),
            idle_sleep_ms: default_idle_sleep_ms(),
            worker_handshake_timeout_ms: default_worker_handshake_timeout_ms(),
            usage_poll_interval_ms: default_usage_poll_interval_ms(),
            brightness_check_interval_ms: default_brightness_check_interval_ms(),
            startup_warmup_ms: default_startup_warmup_ms(),
            change_trailing_margin_px: default_change_trailing_margin_px(),
            controller_tick_ms: default_controller_tick_ms(),
            acceleration: false,
            dark_brightness_gate: true,
        }
    }
}

impl PipelineConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
    pub fn minimize_debounce(&self) -> Duration {
        Duration::from_millis(self.minimize_debounce_ms)
    }
    pub fn maximize_debounce(&self) -> Duration {
        Duration::from_millis(self.maximize_debounce_ms)
    }
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
    pub fn forced_render(&self) -> Duration {
        Duration::from_millis(self.forced_render_ms)
    }
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
    pub fn active_sleep(&self) -> Duration {
        Duration::from_millis(self.active_sleep_ms)
    }
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_handshake_timeout_ms)
    }
    pub fn usage_poll_interval(&self) -> Duration {
        Duration::from_millis(self.usage_poll_interval_ms)
    }
    pub fn brightness_check_interval(&self) -> Duration {
        Duration::from_millis(self.brightness_check_interval_ms)
    }
    pub fn startup_warmup(&self) -> Duration {
        Duration::from_millis(self.startup_warmup_ms)
    }
    pub fn controller_tick(&self) -> Duration {
        Duration::from_millis(self.controller_tick_ms)
    }
}

// ============================================================
// 재시작 정책
// ============================================================

/// 프레임 워커 치명적 에러 후 재시작 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// 최대 재시작 횟수 (초과 시 종료)
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restart_attempts: default_max_restart_attempts(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 값 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        check_level("effect.background_level", self.effect.background_level)?;
        check_level("effect.shapes_level", self.effect.shapes_level)?;
        check_level("effect.brightness_level", self.effect.brightness_level)?;

        let nonzero = [
            ("classifier.grid_points", self.classifier.grid_points),
            (
                "classifier.common_color_line_step",
                self.classifier.common_color_line_step,
            ),
            (
                "classifier.common_color_drift",
                self.classifier.common_color_drift,
            ),
            (
                "classifier.common_color_repeat",
                self.classifier.common_color_repeat,
            ),
            ("classifier.desktop_width", self.classifier.desktop_width),
            ("classifier.desktop_height", self.classifier.desktop_height),
            ("glass.cell_size", self.glass.cell_size),
        ];
        for (field, value) in nonzero {
            if value == 0 {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: "0일 수 없음".to_string(),
                });
            }
        }

        if !(self.classifier.grid_factor.is_finite() && self.classifier.grid_factor > 0.0) {
            return Err(CoreError::Validation {
                field: "classifier.grid_factor".to_string(),
                message: format!("양수여야 함: {}", self.classifier.grid_factor),
            });
        }
        if self.pipeline.worker_handshake_timeout_ms == 0 {
            return Err(CoreError::Validation {
                field: "pipeline.worker_handshake_timeout_ms".to_string(),
                message: "0일 수 없음".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_level() -> f64 {
    1.0
}

fn default_grid_factor() -> f64 {
    0.002_811_621_368_322_4
}
fn default_grid_points() -> u32 {
    4
}
fn default_seed_threshold() -> i32 {
    5
}
fn default_span_threshold() -> i32 {
    10
}
fn default_expand_threshold() -> i32 {
    10
}
fn default_min_span_cells() -> u32 {
    3
}
fn default_edge_margin_x() -> u32 {
    8
}
fn default_edge_margin_y() -> u32 {
    4
}
fn default_common_color_repeat() -> u32 {
    200
}
fn default_common_color_line_step() -> u32 {
    4
}
fn default_common_color_drift() -> u32 {
    32
}
fn default_common_color_refresh_ms() -> u64 {
    5_000
}
fn default_desktop_width() -> u32 {
    1920
}
fn default_desktop_height() -> u32 {
    1080
}

fn default_cell_size() -> u32 {
    5
}
fn default_row_tolerance() -> u32 {
    5
}
fn default_column_tolerance() -> u32 {
    4
}
fn default_bright_threshold() -> u8 {
    128
}

fn default_resize_debounce_ms() -> u64 {
    250
}
fn default_minimize_debounce_ms() -> u64 {
    500
}
fn default_maximize_debounce_ms() -> u64 {
    250
}
fn default_resume_delay_ms() -> u64 {
    250
}
fn default_forced_render_ms() -> u64 {
    4_000
}
fn default_reveal_delay_ms() -> u64 {
    100
}
fn default_active_sleep_ms() -> u64 {
    1
}
fn default_idle_sleep_ms() -> u64 {
    500
}
fn default_worker_handshake_timeout_ms() -> u64 {
    2_000
}
fn default_usage_poll_interval_ms() -> u64 {
    1_000
}
fn default_brightness_check_interval_ms() -> u64 {
    1_000
}
fn default_startup_warmup_ms() -> u64 {
    1_000
}
fn default_change_trailing_margin_px() -> u32 {
    1
}
fn default_controller_tick_ms() -> u64 {
    10
}
fn default_max_restart_attempts() -> u32 {
    5
}
