//! 흔한 색(배경/글자색) 학습.
//!
//! 프레임의 위쪽/오른쪽 가장자리에서 출발하는 완만한 기울기의 스캔 라인을 따라가며
//! 같은 색이 오래 반복되면 그 색의 밝기 버킷을 기록한다.

use glasspane_core::config::ClassifierConfig;
use glasspane_core::models::frame::FrameBuffer;

use crate::pixel::{luma, same_color};

/// 밝기 버킷(0..=255) 존재 집합
#[derive(Debug, Clone)]
pub struct CommonColorSet {
    present: [bool; 256],
}

impl Default for CommonColorSet {
    fn default() -> Self {
        Self {
            present: [false; 256],
        }
    }
}

impl CommonColorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bucket: u8) {
        self.present[bucket as usize] = true;
    }

    #[inline]
    pub fn contains(&self, bucket: u8) -> bool {
        self.present[bucket as usize]
    }

    /// 픽셀의 밝기 버킷이 집합에 있는지
    #[inline]
    pub fn contains_pixel(&self, px: &[u8]) -> bool {
        self.present[luma(px) as usize]
    }

    pub fn clear(&mut self) {
        self.present = [false; 256];
    }

    pub fn len(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 스캔 라인 하나의 반복 카운터
struct RunTracker<'a> {
    frame: &'a FrameBuffer,
    anchor: usize,
    count: u32,
    repeat: u32,
    tolerance: u8,
}

impl<'a> RunTracker<'a> {
    fn start(frame: &'a FrameBuffer, x: u32, y: u32, repeat: u32, tolerance: u8) -> Self {
        Self {
            frame,
            anchor: frame.offset(x, y),
            count: 1,
            repeat,
            tolerance,
        }
    }

    fn feed(&mut self, x: u32, y: u32, set: &mut CommonColorSet) {
        let p = self.frame.offset(x, y);
        let px = &self.frame.pixels;
        if same_color(&px[self.anchor..self.anchor + 3], &px[p..p + 3], self.tolerance) {
            self.count += 1;
            if self.count >= self.repeat {
                set.insert(luma(&px[self.anchor..self.anchor + 3]));
                self.count = 1;
            }
        } else {
            self.count = 1;
            self.anchor = p;
        }
    }
}

/// 네 방향 스캔으로 흔한 색을 `set`에 누적
pub fn learn_common_colors(frame: &FrameBuffer, config: &ClassifierConfig, set: &mut CommonColorSet) {
    let (w, h) = (frame.width, frame.height);
    if w == 0 || h == 0 {
        return;
    }
    let step = config.common_color_line_step.max(1);
    let drift = config.common_color_drift.max(1);
    let repeat = config.common_color_repeat;
    let tol = config.color_tolerance;
    let diagonal_step = (step * drift) as usize;

    // 가로 라인: step 행마다, drift 픽셀마다 한 행 아래로
    for y in (0..h).step_by(step as usize) {
        let mut run = RunTracker::start(frame, 0, y, repeat, tol);
        let mut shift = 0;
        for x in 1..w {
            if x % drift == 0 {
                shift += 1;
                if y + shift >= h {
                    break;
                }
            }
            run.feed(x, y + shift, set);
        }
    }

    // 윗변에서 출발하는 대각 라인
    for x0 in (diagonal_step as u32..w).step_by(diagonal_step) {
        let mut run = RunTracker::start(frame, x0, 0, repeat, tol);
        let mut shift = 0;
        for x in x0 + 1..w {
            if (x - x0) % drift == 0 {
                shift += 1;
                if shift >= h {
                    break;
                }
            }
            run.feed(x, shift, set);
        }
    }

    // 세로 라인: 오른쪽 끝부터 step 열마다, drift 픽셀마다 한 열 왼쪽으로
    for x in (0..w).rev().step_by(step as usize) {
        let mut run = RunTracker::start(frame, x, 0, repeat, tol);
        let mut shift = 0;
        for y in 1..h.saturating_sub(1) {
            if y % drift == 0 {
                shift += 1;
                if shift >= x {
                    break;
                }
            }
            run.feed(x - shift, y, set);
        }
    }

    // 오른변에서 출발하는 대각 라인
    for y0 in (diagonal_step as u32..h).step_by(diagonal_step) {
        let mut run = RunTracker::start(frame, w - 1, y0, repeat, tol);
        let mut shift = 0;
        for y in y0 + 1..h {
            if (y - y0) % drift == 0 {
                shift += 1;
                if shift >= w {
                    break;
                }
            }
            run.feed(w - 1 - shift, y, set);
        }
    }
}
