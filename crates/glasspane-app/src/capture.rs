//! xcap 기반 대상 창.
//!
//! 제목으로 찾은 창 하나를 대상으로 삼는다. 배치 조회와 단발 캡처는 매번 창 목록을
//! 다시 열거해 창 ID로 찾고, 연속 캡처는 전용 스레드가 [`FrameMailbox`]에 최신
//! 프레임만 남긴다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glasspane_core::error::CoreError;
use glasspane_core::models::frame::{FrameBuffer, Rect};
use glasspane_core::models::geometry::{ShowState, WindowPlacement};
use glasspane_core::ports::capture::FrameSource;
use glasspane_core::ports::display::Presenter;
use glasspane_core::ports::window::TargetWindow;
use glasspane_renderer::mailbox::{FrameMailbox, MailboxSource};
use glasspane_vision::frame_image::frame_from_image;
use tracing::{debug, info, warn};
use xcap::{Monitor, Window};

use crate::presenter::PresenterKind;

/// 제목 부분 문자열로 선택한 xcap 창
pub struct XcapTarget {
    window_id: u32,
    title: String,
    capture_interval: Duration,
    presenter: PresenterKind,
}

impl XcapTarget {
    /// 제목에 `query`가 들어간 첫 번째 창을 대상으로 잡는다 (대소문자 무시)
    pub fn find(
        query: &str,
        capture_interval: Duration,
        presenter: PresenterKind,
    ) -> Result<Self, CoreError> {
        let windows = Window::all()
            .map_err(|e| CoreError::Capture(format!("창 목록 조회 실패: {e}")))?;

        let titles: Vec<(u32, String)> = windows
            .iter()
            .filter_map(|w| Some((w.id().ok()?, w.title().ok()?)))
            .collect();
        let (window_id, title) = select_window(&titles, query).ok_or_else(|| {
            CoreError::GeometryQuery(format!("제목에 '{query}'가 포함된 창 없음"))
        })?;

        info!("대상 창 선택: id={}, 제목=\"{}\"", window_id, title);
        Ok(Self {
            window_id,
            title,
            capture_interval,
            presenter,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn window(&self) -> Result<Window, CoreError> {
        find_by_id(self.window_id)
    }
}

/// 제목 목록에서 `query`가 들어간 첫 창 (빈 제목은 건너뜀)
fn select_window(titles: &[(u32, String)], query: &str) -> Option<(u32, String)> {
    let needle = query.to_lowercase();
    titles
        .iter()
        .find(|(_, title)| !title.is_empty() && title.to_lowercase().contains(&needle))
        .cloned()
}

fn find_by_id(window_id: u32) -> Result<Window, CoreError> {
    Window::all()
        .map_err(|e| CoreError::GeometryQuery(format!("창 목록 조회 실패: {e}")))?
        .into_iter()
        .find(|w| w.id().ok() == Some(window_id))
        .ok_or_else(|| CoreError::GeometryQuery(format!("창 {window_id} 사라짐")))
}

fn capture_window(window: &Window) -> Result<FrameBuffer, CoreError> {
    let image = window
        .capture_image()
        .map_err(|e| CoreError::Capture(format!("창 캡처 실패: {e}")))?;
    frame_from_image(image)
}

/// xcap 창 속성을 배치로 변환
fn placement_of(window: &Window) -> Result<WindowPlacement, CoreError> {
    let query = |e: xcap::XCapError| CoreError::GeometryQuery(e.to_string());
    let rect = Rect::new(
        window.x().map_err(query)?,
        window.y().map_err(query)?,
        window.width().map_err(query)?,
        window.height().map_err(query)?,
    );
    let show_state = if window.is_minimized().map_err(query)? {
        ShowState::Minimized
    } else if window.is_maximized().map_err(query)? {
        ShowState::Maximized
    } else if rect.width == 0 || rect.height == 0 {
        ShowState::Hidden
    } else {
        ShowState::Normal
    };
    Ok(WindowPlacement::new(rect, show_state))
}

impl TargetWindow for XcapTarget {
    fn placement(&self) -> Result<WindowPlacement, CoreError> {
        placement_of(&self.window()?)
    }

    fn is_in_use(&self) -> bool {
        self.window()
            .and_then(|w| {
                w.is_focused()
                    .map_err(|e| CoreError::GeometryQuery(e.to_string()))
            })
            .unwrap_or(false)
    }

    fn desktop_size(&self) -> Option<(u32, u32)> {
        let monitors = Monitor::all().ok()?;
        let primary = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())?;
        Some((primary.width().ok()?, primary.height().ok()?))
    }

    fn open_capture(&self) -> Result<Box<dyn FrameSource>, CoreError> {
        let session = CaptureSession::start(self.window_id, self.capture_interval)?;
        Ok(Box::new(session))
    }

    fn open_presenter(&self) -> Result<Box<dyn Presenter>, CoreError> {
        self.presenter.open()
    }

    fn snapshot(&self) -> Result<Option<FrameBuffer>, CoreError> {
        let window = self.window()?;
        if window.is_minimized().unwrap_or(false) {
            return Ok(None);
        }
        capture_window(&window).map(Some)
    }
}

// ============================================================
// 연속 캡처
// ============================================================

/// 캡처 스레드 + 최신 프레임 우편함. drop 시 스레드를 멈춘다.
struct CaptureSession {
    source: MailboxSource,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureSession {
    fn start(window_id: u32, interval: Duration) -> Result<Self, CoreError> {
        let mailbox = Arc::new(FrameMailbox::new());
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let mailbox = Arc::clone(&mailbox);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("glasspane-capture".to_string())
                .spawn(move || capture_loop(window_id, interval, &mailbox, &stop))
                .map_err(|e| CoreError::Capture(format!("캡처 스레드 시작 실패: {e}")))?
        };

        debug!("캡처 세션 시작: 창 {}, 주기 {:?}", window_id, interval);
        Ok(Self {
            source: MailboxSource::new(mailbox),
            stop,
            handle: Some(handle),
        })
    }
}

fn capture_loop(window_id: u32, interval: Duration, mailbox: &FrameMailbox, stop: &AtomicBool) {
    let mut failing = false;
    while !stop.load(Ordering::Acquire) {
        let captured = find_by_id(window_id).and_then(|window| {
            if window.is_minimized().unwrap_or(false) {
                return Ok(None);
            }
            capture_window(&window).map(Some)
        });

        match captured {
            Ok(Some(frame)) => {
                failing = false;
                mailbox.publish(frame);
            }
            Ok(None) => {}
            Err(e) => {
                // 연속 실패는 첫 번째만 경고
                if !failing {
                    warn!("캡처 실패: {}", e);
                    failing = true;
                }
            }
        }
        thread::sleep(interval);
    }
    debug!(
        "캡처 스레드 종료: 발행 {}, 버림 {}",
        mailbox.published_count(),
        mailbox.dropped_count()
    );
}

impl FrameSource for CaptureSession {
    fn try_get_latest_frame(&mut self) -> Result<Option<FrameBuffer>, CoreError> {
        self.source.try_get_latest_frame()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
