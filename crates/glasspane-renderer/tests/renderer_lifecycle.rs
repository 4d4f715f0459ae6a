//! 렌더러 라이프사이클 통합 테스트.
//!
//! 모의 대상 창/출력 위에서 워커 시작/정지, 크기 변경 디바운스, 최소화/복원,
//! 다크 모드 밝기 게이트를 검증한다.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{gray, test_config, wait_until, CountingProvider, MockTarget, HEIGHT, WIDTH};
use glasspane_core::models::effect::{BlurLevel, RenderMode};
use glasspane_core::models::frame::Rect;
use glasspane_core::models::geometry::{ShowState, WindowPlacement};
use glasspane_core::ports::vision::ProcessorKind;
use glasspane_renderer::{LoopControl, PipelineState, Renderer};

const MS: Duration = Duration::from_millis(1);
const WAIT: Duration = Duration::from_secs(3);

#[test]
fn enable_presents_frames_and_disable_hides() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    assert_eq!(renderer.kind(), ProcessorKind::Cpu);

    renderer.enable(RenderMode::Dark).unwrap();
    assert_eq!(renderer.state(), PipelineState::Active);

    target.publish(gray(WIDTH, HEIGHT, 200));
    assert!(wait_until(WAIT, || target.presented() >= 1));
    assert_eq!(target.log.lock().last_pixel, Some([55, 55, 55, 255]));
    // 첫 출력 뒤 오버레이 표시
    assert!(wait_until(WAIT, || target.log.lock().shows >= 1));

    renderer.disable();
    assert_eq!(renderer.state(), PipelineState::Idle);
    assert!(!renderer.is_enabled());
    assert!(target.log.lock().hides >= 1);
}

#[test]
fn unchanged_frames_are_presented_once_after_forced_window() {
    let mut config = test_config();
    config.pipeline.forced_render_ms = 0;
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(config, target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();

    for _ in 0..5 {
        target.publish(gray(WIDTH, HEIGHT, 90));
        thread::sleep(10 * MS);
    }
    assert!(wait_until(WAIT, || target.presented() >= 1));
    thread::sleep(50 * MS);
    assert_eq!(target.presented(), 1);
}

#[test]
fn resize_burst_reallocates_once_after_quiescence() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let provider = Arc::new(CountingProvider::default());
    let mut renderer = Renderer::new(test_config(), target.clone(), Some(provider.clone())).unwrap();
    assert_eq!(renderer.kind(), ProcessorKind::Gpu);

    renderer.enable(RenderMode::Glass).unwrap();
    assert_eq!(provider.allocation_count(), 1);
    target.publish(gray(WIDTH, HEIGHT, 100));
    assert!(wait_until(WAIT, || target.presented() >= 1));

    // 100ms 안에 크기 변경 5회
    for (w, h) in [(70, 48), (76, 50), (82, 52), (88, 54), (94, 56)] {
        target.publish(gray(w, h, 100));
        thread::sleep(18 * MS);
    }
    let last_change = Instant::now();

    thread::sleep(100 * MS);
    assert_eq!(provider.allocation_count(), 1, "디바운스 중 재할당 없음");

    while last_change.elapsed() < 700 * MS {
        target.publish(gray(94, 56, 100));
        thread::sleep(10 * MS);
    }
    assert_eq!(provider.allocation_count(), 2);
    assert_eq!(provider.allocations.lock()[1], (94, 56));
    assert!(target.log.lock().hides >= 1);
    assert!(wait_until(WAIT, || {
        target.log.lock().presented.last() == Some(&(94, 56))
    }));
}

#[test]
fn minimize_tears_down_and_restore_restarts() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Dark).unwrap();

    let t0 = Instant::now();
    target.set_show_state(ShowState::Minimized);
    assert_eq!(renderer.process_loop(t0).unwrap(), LoopControl::Continue);
    assert_eq!(renderer.state(), PipelineState::MinimizePending);

    renderer.process_loop(t0 + 499 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::MinimizePending);
    renderer.process_loop(t0 + 500 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::Hidden);
    assert_eq!(renderer.frames_presented(), 0);

    target.set_show_state(ShowState::Normal);
    renderer.process_loop(t0 + 1000 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::ResumePending);
    renderer.process_loop(t0 + 1250 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::Active);

    // 정상 해체된 세션의 캡처는 재사용
    assert_eq!(target.captures_opened.load(Ordering::SeqCst), 1);
    target.publish(gray(WIDTH, HEIGHT, 200));
    assert!(wait_until(WAIT, || target.presented() >= 1));
}

#[test]
fn transient_hide_resumes_without_teardown() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();

    let t0 = Instant::now();
    target.set_show_state(ShowState::Hidden);
    renderer.process_loop(t0).unwrap();
    assert_eq!(renderer.state(), PipelineState::MinimizePending);

    target.set_show_state(ShowState::Normal);
    renderer.process_loop(t0 + 100 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::Active);
    renderer.process_loop(t0 + 1000 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::Active);

    assert!(wait_until(WAIT, || {
        let log = target.log.lock();
        log.hides >= 1 && log.shows >= 1
    }));
    target.publish(gray(WIDTH, HEIGHT, 30));
    assert!(wait_until(WAIT, || target.presented() >= 1));
}

#[test]
fn maximize_restarts_after_debounce() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();

    let t0 = Instant::now();
    target.set_placement(Some(WindowPlacement::new(
        Rect::new(0, 0, 128, 96),
        ShowState::Maximized,
    )));
    renderer.process_loop(t0).unwrap();
    assert_eq!(renderer.state(), PipelineState::MaximizePending);
    renderer.process_loop(t0 + 250 * MS).unwrap();
    assert_eq!(renderer.state(), PipelineState::Active);

    target.publish(gray(128, 96, 120));
    assert!(wait_until(WAIT, || {
        target.log.lock().presented.last() == Some(&(128, 96))
    }));
}

#[test]
fn move_repositions_overlay() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();

    let moved = Rect::new(300, 200, WIDTH, HEIGHT);
    target.set_placement(Some(WindowPlacement::new(moved, ShowState::Normal)));
    renderer.process_loop(Instant::now()).unwrap();
    assert!(wait_until(WAIT, || target.log.lock().placements.contains(&moved)));
}

#[test]
fn blur_changes_reach_presenter() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();
    renderer.set_blur(BlurLevel::High);
    assert!(wait_until(WAIT, || {
        target.log.lock().blur == vec![BlurLevel::None, BlurLevel::High]
    }));
}

#[test]
fn brightness_changes_reach_presenter() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Glass).unwrap();
    target.publish(gray(WIDTH, HEIGHT, 10));
    assert!(wait_until(WAIT, || target.presented() >= 1));

    renderer.set_brightness_level(0.5).unwrap();
    target.publish(gray(WIDTH, HEIGHT, 11));
    assert!(wait_until(WAIT, || {
        target.log.lock().brightness.last() == Some(&0.5)
    }));
}

#[test]
fn dark_gate_pauses_dark_window_and_resumes_when_bright() {
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(test_config(), target.clone(), None).unwrap();
    renderer.enable(RenderMode::Dark).unwrap();

    target.publish(gray(WIDTH, HEIGHT, 20));
    assert!(wait_until(WAIT, || {
        renderer.process_loop(Instant::now()).unwrap();
        renderer.is_dark_paused()
    }));
    assert_eq!(renderer.state(), PipelineState::Idle);
    assert!(renderer.is_enabled());

    // 아직 어두움: 계속 쉼
    let t1 = Instant::now() + 1000 * MS;
    renderer.process_loop(t1).unwrap();
    assert!(renderer.is_dark_paused());

    *target.snapshot.lock() = Some(gray(WIDTH, HEIGHT, 230));
    renderer.process_loop(t1 + 1000 * MS).unwrap();
    assert!(!renderer.is_dark_paused());
    assert_eq!(renderer.state(), PipelineState::Active);
}

#[test]
fn dark_gate_can_be_disabled() {
    let mut config = test_config();
    config.pipeline.dark_brightness_gate = false;
    let target = MockTarget::new(WIDTH, HEIGHT);
    let mut renderer = Renderer::new(config, target.clone(), None).unwrap();
    renderer.enable(RenderMode::Dark).unwrap();

    target.publish(gray(WIDTH, HEIGHT, 20));
    assert!(wait_until(WAIT, || target.presented() >= 1));
    for _ in 0..5 {
        renderer.process_loop(Instant::now()).unwrap();
    }
    assert!(!renderer.is_dark_paused());
    assert_eq!(renderer.state(), PipelineState::Active);
}
