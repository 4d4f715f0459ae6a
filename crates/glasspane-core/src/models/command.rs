//! 렌더러 런타임 명령.
//!
//! 호스트 프로세스가 한 줄 텍스트(`background 0.4`, `blur high`, `exit`)로
//! 스칼라 설정을 바꿀 때 사용한다.

use std::str::FromStr;

use crate::error::CoreError;

use super::effect::{check_level, BlurLevel};

/// 컨트롤러가 처리하는 명령
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RendererCommand {
    /// 렌더러 종료 요청
    Exit,
    SetBackground(f64),
    SetShapes(f64),
    SetBrightness(f64),
    SetDarkBackground(bool),
    SetBlur(BlurLevel),
}

fn parse_level(field: &str, arg: Option<&str>) -> Result<f64, CoreError> {
    let raw = arg.ok_or_else(|| CoreError::Validation {
        field: field.to_string(),
        message: "값 누락".to_string(),
    })?;
    let value: f64 = raw.parse().map_err(|_| CoreError::Validation {
        field: field.to_string(),
        message: format!("숫자가 아님: {raw}"),
    })?;
    check_level(field, value)
}

fn parse_flag(field: &str, arg: Option<&str>) -> Result<bool, CoreError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        None | Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        Some(other) => Err(CoreError::Validation {
            field: field.to_string(),
            message: format!("on/off가 아님: {other}"),
        }),
    }
}

impl FromStr for RendererCommand {
    type Err = CoreError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| CoreError::Validation {
            field: "command".to_string(),
            message: "빈 명령".to_string(),
        })?;
        let arg = parts.next();

        let command = match name.to_ascii_lowercase().as_str() {
            "exit" | "quit" => RendererCommand::Exit,
            "background" => RendererCommand::SetBackground(parse_level("background", arg)?),
            "shapes" => RendererCommand::SetShapes(parse_level("shapes", arg)?),
            "brightness" => RendererCommand::SetBrightness(parse_level("brightness", arg)?),
            "dark-background" | "dark_background" => {
                RendererCommand::SetDarkBackground(parse_flag("dark_background", arg)?)
            }
            "blur" => {
                let level = arg.unwrap_or("none").parse::<BlurLevel>()?;
                RendererCommand::SetBlur(level)
            }
            other => {
                return Err(CoreError::Validation {
                    field: "command".to_string(),
                    message: format!("알 수 없는 명령: {other}"),
                })
            }
        };

        if parts.next().is_some() {
            return Err(CoreError::Validation {
                field: "command".to_string(),
                message: format!("인자가 너무 많음: {line}"),
            });
        }
        Ok(command)
    }
}
