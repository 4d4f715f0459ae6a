//! # glasspane
//!
//! 대상 창을 연속 캡처해 다크 모드 반전 또는 글래스 효과를 입히는 실행 파일.
//!
//! 와이어링 순서: 설정(JSON 파일 → `GLASSPANE__*` 환경변수 → CLI) → 대상 창(xcap) →
//! 렌더러 → 시그널/명령 채널 → 블로킹 컨트롤 루프.

mod capture;
mod commands;
mod lifecycle;
mod presenter;
mod supervisor;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glasspane_core::config::AppConfig;
use glasspane_core::config_manager::ConfigManager;
use glasspane_core::models::effect::{BlurLevel, RenderMode};
use glasspane_core::ports::vision::ComputeDeviceProvider;
use glasspane_renderer::Renderer;
use glasspane_vision::device::HostDeviceProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::capture::XcapTarget;
use crate::commands::CommandChannel;
use crate::lifecycle::{LifecycleManager, ShutdownReason};
use crate::presenter::PresenterKind;
use crate::supervisor::RestartPolicy;

/// 환경변수 접두사 (`GLASSPANE__EFFECT__MODE=glass`)
const ENV_PREFIX: &str = "GLASSPANE";

/// glasspane: 창 다크 모드/글래스 효과 렌더러
#[derive(Parser, Debug)]
#[command(name = "glasspane", version, about)]
struct Args {
    /// 대상 창 제목 (부분 일치, 대소문자 무시)
    #[arg(long, short = 'w')]
    window: String,

    /// 렌더링 모드 (dark | glass)
    #[arg(long, short = 'm')]
    mode: Option<RenderMode>,

    /// 이미지 영역도 효과에 포함
    #[arg(long)]
    no_filter_images: bool,

    /// 배경 밝기 배율 [0, 1]
    #[arg(long)]
    background: Option<f64>,

    /// 도형/글자 밝기 배율 [0, 1]
    #[arg(long)]
    shapes: Option<f64>,

    /// 오버레이 밝기 [0, 1]
    #[arg(long)]
    brightness: Option<f64>,

    /// 글래스 모드에서 밝은 배경 반전
    #[arg(long)]
    dark_background: bool,

    /// 배경 블러 (none | low | high)
    #[arg(long)]
    blur: Option<BlurLevel>,

    /// 가속 장치 경로 사용
    #[arg(long)]
    accel: bool,

    /// 출력 프레임을 PNG로 저장할 디렉토리
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// PNG 저장 간격 (프레임)
    #[arg(long, default_value_t = 30)]
    dump_every: u64,

    /// 캡처 주기 (밀리초)
    #[arg(long, default_value_t = 16)]
    capture_interval_ms: u64,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// 파일 설정 위에 환경변수 설정을 얹는다
fn layer_environment(base: &AppConfig, env: config::Environment) -> Result<AppConfig> {
    let json = serde_json::to_string(base).context("설정 직렬화 실패")?;
    let layered = config::Config::builder()
        .add_source(config::File::from_str(&json, config::FileFormat::Json))
        .add_source(env)
        .build()
        .context("설정 병합 실패")?
        .try_deserialize::<AppConfig>()
        .context("설정 해석 실패")?;
    Ok(layered)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// CLI 플래그 적용 (가장 높은 우선순위)
fn apply_cli(config: &mut AppConfig, args: &Args) {
    if let Some(mode) = args.mode {
        config.effect.mode = mode;
    }
    if args.no_filter_images {
        config.effect.filter_images = false;
    }
    if let Some(level) = args.background {
        config.effect.background_level = level;
    }
    if let Some(level) = args.shapes {
        config.effect.shapes_level = level;
    }
    if let Some(level) = args.brightness {
        config.effect.brightness_level = level;
    }
    if args.dark_background {
        config.effect.dark_background = true;
    }
    if let Some(blur) = args.blur {
        config.effect.blur = blur;
    }
    if args.accel {
        config.pipeline.acceleration = true;
    }
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    info!("설정 파일: {}", manager.config_path().display());

    let mut config = layer_environment(&manager.get(), environment())?;
    apply_cli(&mut config, args);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "glasspane={0},glasspane_app={0},glasspane_core={0},glasspane_vision={0},glasspane_renderer={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("glasspane 시작");
    let config = load_config(&args)?;

    let presenter = match &args.dump_dir {
        Some(dir) => PresenterKind::Snapshot {
            dir: dir.clone(),
            every: args.dump_every,
        },
        None => PresenterKind::Log,
    };
    let target = Arc::new(XcapTarget::find(
        &args.window,
        Duration::from_millis(args.capture_interval_ms),
        presenter,
    )?);
    info!("대상 창: {}", target.title());

    let provider: Option<Arc<dyn ComputeDeviceProvider>> = if config.pipeline.acceleration {
        Some(Arc::new(HostDeviceProvider::new(
            config.glass.clone(),
            config.pipeline.change_trailing_margin_px,
        )))
    } else {
        None
    };

    let mut renderer = Renderer::new(config.clone(), target, provider)?;
    let lifecycle = Arc::new(LifecycleManager::new());
    let forward = lifecycle.forward_to(renderer.register_exit_event());
    {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move { lifecycle.wait_for_signal().await });
    }
    let commands = CommandChannel::stdin().context("명령 입력 스레드 시작 실패")?;

    let tick = config.pipeline.controller_tick();
    let mut policy = RestartPolicy::new(&config.supervisor);
    let outcome = tokio::task::spawn_blocking(move || {
        supervisor::run_controller(&mut renderer, Some(&commands), &mut policy, tick)
    })
    .await
    .context("컨트롤 루프 스레드 패닉")?;

    lifecycle.shutdown(ShutdownReason::Requested);
    let _ = forward.await;
    info!("glasspane 종료");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn environment_overrides_file_values() {
        let base = AppConfig::default_config();
        let config = layer_environment(
            &base,
            env_with(&[
                ("GLASSPANE__EFFECT__BACKGROUND_LEVEL", "0.4"),
                ("GLASSPANE__EFFECT__MODE", "glass"),
                ("GLASSPANE__PIPELINE__RESIZE_DEBOUNCE_MS", "300"),
            ]),
        )
        .unwrap();

        assert_eq!(config.effect.background_level, 0.4);
        assert_eq!(config.effect.mode, RenderMode::Glass);
        assert_eq!(config.pipeline.resize_debounce_ms, 300);
        assert_eq!(config.classifier, base.classifier);
    }

    #[test]
    fn empty_environment_keeps_file_config() {
        let mut base = AppConfig::default_config();
        base.glass.cell_size = 7;
        let config = layer_environment(&base, env_with(&[])).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn cli_flags_override_config() {
        let args = Args::parse_from([
            "glasspane",
            "--window",
            "editor",
            "--mode",
            "glass",
            "--no-filter-images",
            "--shapes",
            "0.5",
            "--blur",
            "low",
            "--accel",
        ]);
        let mut config = AppConfig::default_config();
        apply_cli(&mut config, &args);

        assert_eq!(config.effect.mode, RenderMode::Glass);
        assert!(!config.effect.filter_images);
        assert_eq!(config.effect.shapes_level, 0.5);
        assert_eq!(config.effect.background_level, 1.0);
        assert_eq!(config.effect.blur, BlurLevel::Low);
        assert!(config.pipeline.acceleration);
    }

    #[test]
    fn load_config_rejects_out_of_range_flag() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let args = Args::parse_from([
            "glasspane",
            "--window",
            "editor",
            "--background",
            "1.5",
            "--config",
            path.to_str().unwrap(),
        ]);
        assert!(load_config(&args).is_err());
        assert!(path.exists());
    }

    #[test]
    fn args_reject_unknown_mode() {
        let result = Args::try_parse_from(["glasspane", "--window", "x", "--mode", "sepia"]);
        assert!(result.is_err());
    }
}
