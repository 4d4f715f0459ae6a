//! # glasspane-renderer
//!
//! 파이프라인 라이프사이클 크레이트.
//! 최신 프레임 우편함, 크기 변경 디바운스, 상태 머신, 프레임 워커 스레드와
//! 이들을 묶는 컨트롤러(`Renderer`)를 담당한다.
//!
//! ## 스레드 구성
//!
//! - 캡처 스레드 (외부) → [`mailbox::FrameMailbox`]
//! - 프레임 워커 ([`worker::FrameWorker`]): 변경 감지 → 분류 → 효과 → 출력
//! - 컨트롤 스레드: [`renderer::Renderer::process_loop`]

pub mod mailbox;
pub mod placement;
pub mod processors;
pub mod renderer;
pub mod resize;
pub mod state;
pub mod timers;
pub mod worker;

pub use renderer::{ExitEvent, LoopControl, Renderer};
pub use state::{PipelineAction, PipelineState};
