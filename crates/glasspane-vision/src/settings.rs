//! 런타임 효과 스칼라 (lock-free).
//!
//! 컨트롤러가 비동기로 쓰고 워커가 패스 시작 시 한 번 읽는다. 값마다 독립 atomic이며
//! 마지막 쓰기가 이긴다. 한 프레임 동안 일부 값만 새 값인 상태는 허용된다.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glasspane_core::error::CoreError;
use glasspane_core::models::effect::{check_level, EffectConfig};

/// `f64`를 비트로 저장하는 atomic
#[derive(Debug)]
struct AtomicLevel(AtomicU64);

impl AtomicLevel {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// 공유 효과 설정: `Arc<EffectSettings>`로 컨트롤러와 워커가 나눠 가진다
#[derive(Debug)]
pub struct EffectSettings {
    background_level: AtomicLevel,
    shapes_level: AtomicLevel,
    brightness_level: AtomicLevel,
    dark_background: AtomicBool,
    /// 쓰기마다 증가: 워커가 변경 여부를 싸게 확인
    generation: AtomicU64,
}

impl EffectSettings {
    pub fn new(initial: EffectConfig) -> Self {
        Self {
            background_level: AtomicLevel::new(initial.background_level),
            shapes_level: AtomicLevel::new(initial.shapes_level),
            brightness_level: AtomicLevel::new(initial.brightness_level),
            dark_background: AtomicBool::new(initial.dark_background),
            generation: AtomicU64::new(0),
        }
    }

    /// 현재 값 스냅샷
    pub fn snapshot(&self) -> EffectConfig {
        EffectConfig {
            background_level: self.background_level.load(),
            shapes_level: self.shapes_level.load(),
            brightness_level: self.brightness_level.load(),
            dark_background: self.dark_background.load(Ordering::Relaxed),
        }
    }

    /// 쓰기 세대 번호
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn set_background_level(&self, level: f64) -> Result<(), CoreError> {
        self.background_level.store(check_level("background_level", level)?);
        self.bump();
        Ok(())
    }

    pub fn set_shapes_level(&self, level: f64) -> Result<(), CoreError> {
        self.shapes_level.store(check_level("shapes_level", level)?);
        self.bump();
        Ok(())
    }

    pub fn set_brightness_level(&self, level: f64) -> Result<(), CoreError> {
        self.brightness_level.store(check_level("brightness_level", level)?);
        self.bump();
        Ok(())
    }

    pub fn set_dark_background(&self, enable: bool) {
        self.dark_background.store(enable, Ordering::Relaxed);
        self.bump();
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self::new(EffectConfig::default())
    }
}
