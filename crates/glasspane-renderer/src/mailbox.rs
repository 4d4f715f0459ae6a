//! 단일 슬롯 최신 프레임 우편함.
//!
//! 캡처 스레드가 `publish`로 밀어 넣고 워커가 `take`로 꺼낸다. 큐가 아니므로
//! 워커가 느리면 꺼내지 않은 프레임은 덮어써지고 버려진다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glasspane_core::error::CoreError;
use glasspane_core::models::frame::FrameBuffer;
use glasspane_core::ports::capture::FrameSource;
use parking_lot::Mutex;

/// 최신 프레임 한 장만 보관
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<FrameBuffer>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프레임 게시. 꺼내지 않은 이전 프레임을 덮어썼으면 `true`.
    pub fn publish(&self, frame: FrameBuffer) -> bool {
        let replaced = self.slot.lock().replace(frame).is_some();
        self.published.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// 슬롯을 비우며 최신 프레임을 꺼낸다
    pub fn take(&self) -> Option<FrameBuffer> {
        self.slot.lock().take()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }

    /// 지금까지 게시된 프레임 수
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// 꺼내지기 전에 덮어써진 프레임 수
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 우편함을 `FrameSource` 포트로 노출
#[derive(Debug, Clone)]
pub struct MailboxSource {
    mailbox: Arc<FrameMailbox>,
}

impl MailboxSource {
    pub fn new(mailbox: Arc<FrameMailbox>) -> Self {
        Self { mailbox }
    }
}

impl FrameSource for MailboxSource {
    fn try_get_latest_frame(&mut self) -> Result<Option<FrameBuffer>, CoreError> {
        Ok(self.mailbox.take())
    }
}
