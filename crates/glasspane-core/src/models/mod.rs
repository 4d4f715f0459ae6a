//! glasspane 도메인 모델.
//!
//! 프레임 버퍼, 마스크, 창 배치, 효과 설정, 런타임 명령을 정의한다.

pub mod command;
pub mod effect;
pub mod frame;
pub mod geometry;
