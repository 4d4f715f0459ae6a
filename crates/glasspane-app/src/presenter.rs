//! 헤드리스 출력.
//!
//! 실제 오버레이 창 대신 출력된 프레임을 기록한다. `LogPresenter`는 개수와 상태
//! 변화를 로그로 남기고, `SnapshotPresenter`는 N 프레임마다 PNG로 저장한다.

use std::fs;
use std::path::PathBuf;

use glasspane_core::error::CoreError;
use glasspane_core::models::effect::BlurLevel;
use glasspane_core::models::frame::{FrameBuffer, Rect};
use glasspane_core::ports::display::Presenter;
use glasspane_vision::frame_image::image_from_frame;
use tracing::{debug, info};

/// 세션마다 만들 출력 종류
#[derive(Debug, Clone)]
pub enum PresenterKind {
    Log,
    Snapshot { dir: PathBuf, every: u64 },
}

impl PresenterKind {
    pub fn open(&self) -> Result<Box<dyn Presenter>, CoreError> {
        match self {
            PresenterKind::Log => Ok(Box::new(LogPresenter::new())),
            PresenterKind::Snapshot { dir, every } => {
                Ok(Box::new(SnapshotPresenter::new(dir.clone(), *every)?))
            }
        }
    }
}

/// 출력 개수/오버레이 상태를 로그로 남기는 출력
#[derive(Debug, Default)]
pub struct LogPresenter {
    frames: u64,
    last_size: Option<(u32, u32)>,
    visible: bool,
    placement: Option<Rect>,
    brightness: f64,
    blur: BlurLevel,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self {
            visible: true,
            brightness: 1.0,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn placement(&self) -> Option<Rect> {
        self.placement
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        self.frames += 1;
        let size = frame.size();
        if self.last_size != Some(size) {
            info!("출력 크기: {}x{}", size.0, size.1);
            self.last_size = Some(size);
        }
        if self.frames % 100 == 0 {
            debug!("출력 프레임 {}", self.frames);
        }
        Ok(())
    }

    fn hide_target(&mut self) -> Result<(), CoreError> {
        self.visible = false;
        debug!("오버레이 숨김");
        Ok(())
    }

    fn show_target(&mut self) -> Result<(), CoreError> {
        self.visible = true;
        debug!("오버레이 표시");
        Ok(())
    }

    fn update_placement(&mut self, rect: Rect) -> Result<(), CoreError> {
        debug!(
            "오버레이 위치: ({}, {}) {}x{}",
            rect.x, rect.y, rect.width, rect.height
        );
        self.placement = Some(rect);
        Ok(())
    }

    fn set_brightness(&mut self, level: f64) -> Result<(), CoreError> {
        self.brightness = level;
        debug!("오버레이 밝기: {:.2}", level);
        Ok(())
    }

    fn set_blur(&mut self, level: BlurLevel) -> Result<(), CoreError> {
        self.blur = level;
        debug!("오버레이 블러: {}", level);
        Ok(())
    }
}

/// N 프레임마다 PNG를 남기는 출력
pub struct SnapshotPresenter {
    inner: LogPresenter,
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl SnapshotPresenter {
    /// `dir`이 없으면 만든다. `every`가 0이면 1로 본다.
    pub fn new(dir: PathBuf, every: u64) -> Result<Self, CoreError> {
        fs::create_dir_all(&dir)?;
        info!("스냅샷 저장 위치: {} ({} 프레임마다)", dir.display(), every.max(1));
        Ok(Self {
            inner: LogPresenter::new(),
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Presenter for SnapshotPresenter {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), CoreError> {
        self.inner.present(frame)?;
        let index = self.inner.frames();
        if (index - 1) % self.every != 0 {
            return Ok(());
        }

        let path = self.dir.join(format!("frame-{index:06}.png"));
        image_from_frame(frame)?
            .save(&path)
            .map_err(|e| CoreError::Display(format!("스냅샷 저장 실패: {}: {e}", path.display())))?;
        self.written += 1;
        debug!("스냅샷 저장: {}", path.display());
        Ok(())
    }

    fn hide_target(&mut self) -> Result<(), CoreError> {
        self.inner.hide_target()
    }

    fn show_target(&mut self) -> Result<(), CoreError> {
        self.inner.show_target()
    }

    fn update_placement(&mut self, rect: Rect) -> Result<(), CoreError> {
        self.inner.update_placement(rect)
    }

    fn set_brightness(&mut self, level: f64) -> Result<(), CoreError> {
        self.inner.set_brightness(level)
    }

    fn set_blur(&mut self, level: BlurLevel) -> Result<(), CoreError> {
        self.inner.set_blur(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_presenter_tracks_overlay_state() {
        let mut presenter = LogPresenter::new();
        let frame = FrameBuffer::filled(4, 4, [10, 20, 30, 255]);

        presenter.present(&frame).unwrap();
        presenter.present(&frame).unwrap();
        presenter.hide_target().unwrap();
        presenter.update_placement(Rect::new(5, 6, 4, 4)).unwrap();

        assert_eq!(presenter.frames(), 2);
        assert!(!presenter.is_visible());
        assert_eq!(presenter.placement(), Some(Rect::new(5, 6, 4, 4)));

        presenter.show_target().unwrap();
        assert!(presenter.is_visible());
    }

    #[test]
    fn snapshot_presenter_writes_every_nth_frame() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("dumps");
        let mut presenter = SnapshotPresenter::new(dir.clone(), 2).unwrap();
        let frame = FrameBuffer::filled(3, 2, [200, 100, 50, 255]);

        for _ in 0..5 {
            presenter.present(&frame).unwrap();
        }

        // 1, 3, 5번째 프레임
        assert_eq!(presenter.written(), 3);
        assert!(dir.join("frame-000001.png").exists());
        assert!(!dir.join("frame-000002.png").exists());
        assert!(dir.join("frame-000005.png").exists());

        let saved = image::open(dir.join("frame-000003.png")).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (3, 2));
        assert_eq!(saved.get_pixel(1, 1).0, [200, 100, 50, 255]);
    }

    #[test]
    fn presenter_kind_opens_snapshot_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("out");
        let kind = PresenterKind::Snapshot {
            dir: dir.clone(),
            every: 0,
        };
        let mut presenter = kind.open().unwrap();
        presenter
            .present(&FrameBuffer::filled(2, 2, [0, 0, 0, 255]))
            .unwrap();
        assert!(dir.join("frame-000001.png").exists());
    }
}
