//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 외부 협력자(캡처, 출력, 창 조회, 가속 장치)는 모두 여기 정의된 trait 뒤에 있고,
//! `glasspane-app`이 `Box<dyn T>` / `Arc<dyn T>`로 와이어링한다.
//!
//! 워커 스레드가 소유하는 포트(`FrameSource`, `Presenter`, `FrameProcessor`)는
//! `Send`만 요구한다.

pub mod capture;
pub mod display;
pub mod vision;
pub mod window;
