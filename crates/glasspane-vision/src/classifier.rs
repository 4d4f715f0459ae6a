//! 이미지 영역 분류기 ("is-image-area").
//!
//! 프레임을 평탄한 영역(글자, UI 도형, 단색 배경)과 이미지 영역(사진, 썸네일,
//! 그라디언트)으로 나눈다. 통계적 휴리스틱이며 비전 모델이 아니다.
//!
//! 1. 흔한 색 학습 (주기적, [`crate::common_colors`])
//! 2. 성긴 그리드에서 시드 탐색: 격자점 주변 샘플의 색 전환 횟수
//! 3. 시드에서 오른쪽/아래로 성장
//! 4. 네 변 반복 확장 (더 이상 자라지 않을 때까지)
//! 5. 픽셀 단위 경계 보정 (흔한 색 또는 이미 표시된 픽셀에서 멈춤)
//! 6. 테두리 균일성 필터
//! 7. 마스크 채우고 스캔 계속

use std::time::Instant;

use glasspane_core::config::ClassifierConfig;
use glasspane_core::error::{CoreError, PipelineStage};
use glasspane_core::models::frame::{FrameBuffer, RegionMask};
use tracing::{debug, trace};

use crate::common_colors::{learn_common_colors, CommonColorSet};
use crate::pixel::same_color;

/// 이미지 영역 분류기
#[derive(Debug)]
pub struct RegionClassifier {
    config: ClassifierConfig,
    mask: RegionMask,
    common: CommonColorSet,
    /// 전환 검사 샘플 간격 (픽셀)
    sample_step: u32,
    /// 시드 그리드 간격 (픽셀)
    grid_step: u32,
    last_refresh: Option<Instant>,
}

impl RegionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            mask: RegionMask::default(),
            common: CommonColorSet::new(),
            sample_step: 1,
            grid_step: 1,
            last_refresh: None,
        }
    }

    /// 프레임 크기에 맞춰 마스크 할당, 데스크톱 해상도로 그리드 간격 계산
    pub fn prepare(
        &mut self,
        width: u32,
        height: u32,
        desktop: (u32, u32),
    ) -> Result<(), CoreError> {
        self.mask = RegionMask::try_new(width, height)?;
        let span = (desktop.0 as f64) + (desktop.1 as f64);
        self.sample_step = ((self.config.grid_factor * span).floor() as u32).max(1);
        self.grid_step = self.sample_step * self.config.grid_points.max(1);
        self.common.clear();
        self.last_refresh = None;
        debug!(
            "분류기 준비: {}x{}, 샘플 간격 {}px, 그리드 {}px",
            width, height, self.sample_step, self.grid_step
        );
        Ok(())
    }

    pub fn release(&mut self) {
        self.mask = RegionMask::default();
        self.common.clear();
        self.last_refresh = None;
    }

    pub fn sample_step(&self) -> u32 {
        self.sample_step
    }

    pub fn grid_step(&self) -> u32 {
        self.grid_step
    }

    pub fn mask(&self) -> &RegionMask {
        &self.mask
    }

    pub fn common_colors(&self) -> &CommonColorSet {
        &self.common
    }

    /// 프레임을 분류해 마스크를 새로 만든다.
    ///
    /// `force_refresh`면 주기와 관계없이 흔한 색을 다시 학습한다.
    pub fn classify(
        &mut self,
        frame: &FrameBuffer,
        force_refresh: bool,
        now: Instant,
    ) -> Result<&RegionMask, CoreError> {
        if frame.size() != (self.mask.width(), self.mask.height()) {
            return Err(CoreError::processing(
                PipelineStage::Classification,
                format!(
                    "마스크 크기 {}x{}와 프레임 크기 {}x{} 불일치",
                    self.mask.width(),
                    self.mask.height(),
                    frame.width,
                    frame.height
                ),
            ));
        }

        let refresh_due = self.last_refresh.map_or(true, |t| {
            now.saturating_duration_since(t) >= self.config.common_color_refresh()
        });
        if force_refresh || refresh_due {
            learn_common_colors(frame, &self.config, &mut self.common);
            self.last_refresh = Some(now);
            trace!("흔한 색 갱신: {}개", self.common.len());
        }

        self.mask.clear();
        let mut scan = Scan {
            frame,
            mask: &mut self.mask,
            common: &self.common,
            config: &self.config,
            w: frame.width as i64,
            h: frame.height as i64,
            s: self.sample_step as i64,
            g: self.grid_step as i64,
            regions: 0,
        };
        scan.run();
        if scan.regions > 0 {
            trace!("이미지 영역 {}개 감지", scan.regions);
        }
        Ok(&self.mask)
    }
}

/// 한 프레임 스캔 상태 (좌표는 부호 있는 픽셀 단위)
struct Scan<'a> {
    frame: &'a FrameBuffer,
    mask: &'a mut RegionMask,
    common: &'a CommonColorSet,
    config: &'a ClassifierConfig,
    w: i64,
    h: i64,
    s: i64,
    g: i64,
    regions: usize,
}

impl Scan<'_> {
    #[inline]
    fn px(&self, x: i64, y: i64) -> &[u8] {
        let o = self.frame.offset(x as u32, y as u32);
        &self.frame.pixels[o..o + 3]
    }

    #[inline]
    fn marked(&self, x: i64, y: i64) -> bool {
        self.mask.get(x as u32, y as u32)
    }

    #[inline]
    fn is_common(&self, x: i64, y: i64) -> bool {
        self.common.contains_pixel(self.px(x, y))
    }

    /// 경계 보정 정지 조건
    #[inline]
    fn stops_edge(&self, x: i64, y: i64) -> bool {
        self.is_common(x, y) || self.marked(x, y)
    }

    /// 격자점 주변 샘플 창의 색 전환 검사.
    ///
    /// 행마다 첫 샘플을 기준으로 오른쪽 샘플과 비교해 다르면 +1(기준 이동),
    /// 같으면 -1. 합계가 `level`을 넘으면 통과.
    fn transitions(&self, x: i64, y: i64, level: i32) -> bool {
        let points = self.config.grid_points.max(1) as i64;
        let half = self.s * points / 2;
        let (x0, y0) = (x - half, y - half);
        if x0 < 0 || y0 < 0 {
            return false;
        }
        let y_last = (y0 + self.s * (points - 1)).min(self.h - 1);
        let x_last = (x0 + self.s * points).min(self.w - 1);
        let tol = self.config.color_tolerance;

        let mut count = 0i32;
        let mut yy = y0;
        while yy <= y_last {
            let mut anchor = self.px(x0, yy);
            let mut xx = x0 + self.s;
            while xx <= x_last {
                let sample = self.px(xx, yy);
                if same_color(anchor, sample, tol) {
                    count -= 1;
                } else {
                    count += 1;
                    anchor = sample;
                }
                xx += self.s;
            }
            yy += self.s;
        }
        count > level
    }

    #[inline]
    fn grows(&self, x: i64, y: i64, level: i32) -> bool {
        !self.marked(x, y) && self.transitions(x, y, level)
    }

    /// 가로 선 (x_a, x_b]가 흔한 색 위주인지
    fn uniform_row(&self, y: i64, x_a: i64, x_b: i64) -> bool {
        let mut unique = 0i64;
        for x in x_a + 1..=x_b {
            if self.is_common(x, y) {
                unique -= 1;
            } else {
                unique += 1;
            }
        }
        unique <= 0
    }

    /// 세로 선 (y_a, y_b]가 흔한 색 위주인지
    fn uniform_col(&self, x: i64, y_a: i64, y_b: i64) -> bool {
        let mut unique = 0i64;
        for y in y_a + 1..=y_b {
            if self.is_common(x, y) {
                unique -= 1;
            } else {
                unique += 1;
            }
        }
        unique <= 0
    }

    fn run(&mut self) {
        let x_start = self.config.edge_margin_x as i64;
        let x_end = self.w - self.config.edge_margin_x as i64;
        let y_start = self.config.edge_margin_y as i64;
        let y_end = self.h - 1 - self.config.edge_margin_y as i64;

        let mut y = y_start;
        while y <= y_end {
            let mut x = x_start;
            while x < x_end {
                let bounds = (x_start, x_end, y_start, y_end);
                if let Some(region) = self.grow_region(&mut x, y, bounds) {
                    self.commit(region);
                }
                x += self.g;
            }
            y += self.g;
        }
    }

    /// 시드 (x, y)에서 영역 성장. `x`는 행 성장이 멈춘 위치로 전진한다.
    fn grow_region(&self, x: &mut i64, y: i64, bounds: (i64, i64, i64, i64)) -> Option<Region> {
        let (x_start, x_end, y_start, y_end) = bounds;
        let g = self.g;
        let seed = self.config.seed_threshold;
        let span = self.config.span_threshold;
        let expand = self.config.expand_threshold;

        if self.marked(*x, y) || !self.transitions(*x, y, seed) {
            return None;
        }

        let mut a = (*x, y);
        let mut b: Option<(i64, i64)> = None;
        let (mut x1, mut y1) = (*x, y);
        let mut x2 = x1;

        // 오른쪽으로 행 성장
        *x += g;
        while *x < x_end {
            if !self.grows(*x, y, span) {
                break;
            }
            b = Some((*x, y));
            x2 = *x;
            *x += g;
        }
        let mut b = b?;
        if (x2 - x1) / g <= self.config.min_span_cells as i64 {
            return None;
        }

        // 아래로 성장: 열마다 가장 멀리 간 지점
        let mut y2 = -1i64;
        let mut c = (x1, y1);
        let mut xx = x1;
        while xx < x2 {
            let mut yy = y1;
            while yy < self.h - 1 {
                if !self.grows(xx, yy, seed) {
                    break;
                }
                if yy > y2 {
                    y2 = yy;
                    c = (xx, yy);
                }
                yy += g;
            }
            xx += g;
        }
        if y2 < 0 {
            return None;
        }

        // 반복 확장: 좌우 → 상하, 좌우가 더 안 자라면 종료
        loop {
            let mut grew_x = false;
            let mut yy = y1;
            while yy <= y2 {
                let mut xx = x2 + g;
                while xx <= x_end && self.grows(xx, yy, expand) {
                    x2 = xx;
                    b = (xx, yy);
                    grew_x = true;
                    xx += g;
                }
                let mut xx = x1 - g;
                while xx > x_start && self.grows(xx, yy, expand) {
                    x1 = xx;
                    a = (xx, yy);
                    grew_x = true;
                    xx -= g;
                }
                yy += g;
            }
            if !grew_x {
                break;
            }

            let mut grew_y = false;
            let mut xx = x1;
            while xx <= x2 {
                let mut yy = y2 + g;
                while yy < y_end && self.grows(xx, yy, expand) {
                    y2 = yy;
                    c = (xx, yy);
                    grew_y = true;
                    yy += g;
                }
                let mut yy = y1 - g;
                while yy > y_start && self.grows(xx, yy, expand) {
                    y1 = yy;
                    a = (xx, yy);
                    grew_y = true;
                    yy -= g;
                }
                if !grew_y {
                    break;
                }
                xx += g;
            }
        }

        // 픽셀 단위 경계 보정
        let mut yy = c.1 + 1;
        while yy < self.h - 1 {
            if self.stops_edge(c.0, yy) {
                y2 = yy - 1;
                break;
            }
            yy += 1;
        }

        let mut xx = b.0 + 1;
        while xx < self.w - 1 {
            if self.stops_edge(xx, b.1) {
                x2 = xx - 1;
                break;
            }
            xx += 1;
        }

        let mut xx = a.0 - 1;
        while xx > 0 {
            if self.stops_edge(xx, a.1) {
                x1 = xx + 1;
                break;
            }
            xx -= 1;
        }

        let mut yy = a.1 - 1;
        while yy >= 0 && yy * self.w + a.0 > 0 {
            if self.stops_edge(a.0, yy) {
                y1 = yy + 1;
                break;
            }
            yy -= 1;
        }

        let mut region = Region { x1, y1, x2, y2 };
        self.refine_borders(&mut region, y_end);
        Some(region)
    }

    /// 테두리 균일성 필터: 각 변을 흔한 색 줄 경계까지 밀거나 당긴다
    fn refine_borders(&self, r: &mut Region, y_end: i64) {
        // 윗변: 위로만 확장
        let mut yy = r.y1 - 1;
        if yy > 0 && !self.uniform_row(yy, r.x1, r.x2) {
            yy -= 1;
            while yy > 0 {
                if self.uniform_row(yy, r.x1, r.x2) {
                    r.y1 = yy + 1;
                    break;
                }
                yy -= 1;
            }
        }

        // 아랫변
        if !self.uniform_row(r.y2, r.x1, r.x2) {
            let y_max = y_end - 1;
            let mut yy = r.y2 + 1;
            if yy < y_max && !self.uniform_row(yy, r.x1, r.x2) {
                yy += 1;
                while yy < y_max {
                    if self.uniform_row(yy, r.x1, r.x2) {
                        r.y2 = yy - 1;
                        break;
                    }
                    yy += 1;
                }
            }
        } else {
            let mut yy = r.y2 - 1;
            while yy > r.y1 {
                if !self.uniform_row(yy, r.x1, r.x2) {
                    r.y2 = yy;
                    break;
                }
                yy -= 1;
            }
        }

        // 왼변
        if !self.uniform_col(r.x1, r.y1, r.y2) {
            let mut xx = r.x1 - 1;
            if xx > 0 && !self.uniform_col(xx, r.y1, r.y2) {
                xx -= 1;
                while xx > 0 {
                    if self.uniform_col(xx, r.y1, r.y2) {
                        r.x1 = xx + 1;
                        break;
                    }
                    xx -= 1;
                }
            }
        } else {
            let mut xx = r.x1 + 1;
            while xx < r.x2 {
                if !self.uniform_col(xx, r.y1, r.y2) {
                    r.x1 = xx;
                    break;
                }
                xx += 1;
            }
        }

        // 오른변
        if !self.uniform_col(r.x2, r.y1, r.y2) {
            let mut xx = r.x2 + 1;
            if xx < self.w && !self.uniform_col(xx, r.y1, r.y2) {
                xx += 1;
                while xx < self.w {
                    if self.uniform_col(xx, r.y1, r.y2) {
                        r.x2 = xx - 1;
                        break;
                    }
                    xx += 1;
                }
            }
        } else {
            let mut xx = r.x2 - 1;
            while xx > r.x1 {
                if !self.uniform_col(xx, r.y1, r.y2) {
                    r.x2 = xx;
                    break;
                }
                xx -= 1;
            }
        }
    }

    fn commit(&mut self, r: Region) {
        let x1 = r.x1.clamp(0, self.w) as u32;
        let y1 = r.y1.clamp(0, self.h) as u32;
        let x2 = (r.x2 + 1).clamp(0, self.w) as u32;
        let y2 = (r.y2 + 1).clamp(0, self.h) as u32;
        self.mask.fill_rect(x1, y1, x2, y2);
        self.regions += 1;
    }
}

/// 확정 영역 (양끝 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
}
