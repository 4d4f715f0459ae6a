//! 효과(다크 모드 / 글래스) 설정 모델.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 렌더링 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// 비이미지 영역 색 반전
    #[default]
    Dark,
    /// 반투명 글래스 합성
    Glass,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Dark => f.write_str("dark"),
            RenderMode::Glass => f.write_str("glass"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(RenderMode::Dark),
            "glass" => Ok(RenderMode::Glass),
            other => Err(CoreError::Validation {
                field: "mode".to_string(),
                message: format!("알 수 없는 모드: {other}"),
            }),
        }
    }
}

/// 창 배경 블러 강도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurLevel {
    #[default]
    None,
    Low,
    High,
}

impl fmt::Display for BlurLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurLevel::None => f.write_str("none"),
            BlurLevel::Low => f.write_str("low"),
            BlurLevel::High => f.write_str("high"),
        }
    }
}

impl FromStr for BlurLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "0" => Ok(BlurLevel::None),
            "low" | "1" => Ok(BlurLevel::Low),
            "high" | "2" => Ok(BlurLevel::High),
            other => Err(CoreError::Validation {
                field: "blur".to_string(),
                message: format!("알 수 없는 블러 강도: {other}"),
            }),
        }
    }
}

/// 효과 패스 하나가 읽는 설정 스냅샷
///
/// 워커가 패스 시작 시 한 번 읽는다. 컨트롤러는 언제든 덮어쓸 수 있다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectConfig {
    /// 배경 픽셀 밝기 배율 [0, 1]
    pub background_level: f64,
    /// 도형/글자 픽셀 목표 밝기 배율 [0, 1]
    pub shapes_level: f64,
    /// 오버레이 전체 밝기 [0, 1]
    pub brightness_level: f64,
    /// 밝은 배경을 반전한 뒤 배율 적용
    pub dark_background: bool,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            background_level: 1.0,
            shapes_level: 1.0,
            brightness_level: 1.0,
            dark_background: false,
        }
    }
}

/// [0, 1] 범위 배율 검증
pub fn check_level(field: &str, value: f64) -> Result<f64, CoreError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CoreError::Validation {
            field: field.to_string(),
            message: format!("{value}는 [0, 1] 범위를 벗어남"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_roundtrip() {
        assert_eq!("Glass".parse::<RenderMode>().unwrap(), RenderMode::Glass);
        assert_eq!(RenderMode::Dark.to_string(), "dark");
        assert!("sepia".parse::<RenderMode>().is_err());
    }

    #[test]
    fn blur_accepts_numeric_levels() {
        assert_eq!("2".parse::<BlurLevel>().unwrap(), BlurLevel::High);
        assert_eq!("off".parse::<BlurLevel>().unwrap(), BlurLevel::None);
    }

    #[test]
    fn level_bounds() {
        assert!(check_level("background", 0.0).is_ok());
        assert!(check_level("background", 1.0).is_ok());
        assert!(check_level("background", 1.01).is_err());
        assert!(check_level("background", f64::NAN).is_err());
    }
}
