//! 설정 파일 관리.
//!
//! 플랫폼 설정 디렉토리의 `config.json`을 읽고 쓴다. 저장은 임시 파일에 쓴 뒤
//! 이름을 바꿔서, 중간에 죽어도 반쯤 쓴 설정 파일이 남지 않는다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

const CONFIG_FILE_NAME: &str = "config.json";

/// (qualifier, organization, application)
const PROJECT_ID: (&str, &str, &str) = ("dev", "glasspane", "glasspane");

/// 검증된 설정 사본과 그 파일 위치
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 `config.json` 사용
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정 경로 사용. 파일이 없으면 기본값으로 만들고, 있으면 읽어서 검증한다.
    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        ensure_parent(&path)?;

        let config = if path.is_file() {
            read_config(&path)?
        } else {
            let defaults = AppConfig::default_config();
            write_config(&path, &defaults)?;
            info!("기본 설정 생성: {}", path.display());
            defaults
        };

        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 검증 → 파일 저장 → 메모리 반영. 검증이나 저장이 실패하면 아무것도 바뀌지 않는다.
    pub fn update(&self, config: AppConfig) -> Result<(), CoreError> {
        config.validate()?;
        write_config(&self.path, &config)?;
        *self.current.write() = config;
        debug!("설정 저장: {}", self.path.display());
        Ok(())
    }

    /// 현재 설정 사본을 고쳐서 [`update`](Self::update)
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        edit(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 파일을 다시 읽는다 (외부 편집 반영)
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = read_config(&self.path)?;
        *self.current.write() = config;
        info!("설정 다시 읽음: {}", self.path.display());
        Ok(())
    }

    /// Linux `~/.config/glasspane`, macOS `~/Library/Application Support/dev.glasspane.glasspane`,
    /// Windows `%APPDATA%\glasspane\glasspane\config`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        let (qualifier, organization, application) = PROJECT_ID;
        ProjectDirs::from(qualifier, organization, application)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리 없음".to_string()))
    }
}

fn ensure_parent(path: &Path) -> Result<(), CoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            fs::create_dir_all(dir).map_err(|e| {
                CoreError::Config(format!("{}: 디렉토리 생성 실패: {e}", dir.display()))
            })?;
            debug!("설정 디렉토리 생성: {}", dir.display());
            Ok(())
        }
        _ => Ok(()),
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{}: 읽기 실패: {e}", path.display())))?;
    let config: AppConfig = serde_json::from_str(&text)
        .map_err(|e| CoreError::Config(format!("{}: JSON 오류: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// `<path>.tmp`에 쓴 뒤 rename
fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    let text = serde_json::to_string_pretty(config)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, text)
        .and_then(|()| fs::rename(&staging, path))
        .map_err(|e| CoreError::Config(format!("{}: 저장 실패: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::effect::{BlurLevel, RenderMode};
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("config.json");

        let manager = ConfigManager::with_path(path.clone()).unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("json.tmp").exists());

        let config = manager.get();
        assert_eq!(config.pipeline.resize_debounce_ms, 250);
        assert_eq!(config.pipeline.forced_render_ms, 4000);
        assert_eq!(config.effect.mode, RenderMode::Dark);
    }

    #[test]
    fn updates_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        ConfigManager::with_path(path.clone())
            .unwrap()
            .update_with(|c| {
                c.effect.mode = RenderMode::Glass;
                c.effect.background_level = 0.25;
                c.effect.blur = BlurLevel::High;
            })
            .unwrap();

        let config = ConfigManager::with_path(path).unwrap().get();
        assert_eq!(config.effect.mode, RenderMode::Glass);
        assert_eq!(config.effect.background_level, 0.25);
        assert_eq!(config.effect.blur, BlurLevel::High);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = manager.update_with(|c| c.glass.cell_size = 0);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(manager.get().glass.cell_size, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn reload_picks_up_external_edit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let manager = ConfigManager::with_path(path.clone()).unwrap();

        let mut edited = manager.get();
        edited.pipeline.idle_sleep_ms = 250;
        fs::write(&path, serde_json::to_string(&edited).unwrap()).unwrap();

        manager.reload().unwrap();
        assert_eq!(manager.get().pipeline.idle_sleep_ms, 250);
    }

    #[test]
    fn unparsable_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigManager::with_path(path).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn out_of_range_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"effect": {"shapes_level": 3.0}}"#).unwrap();

        let err = ConfigManager::with_path(path).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }
}
