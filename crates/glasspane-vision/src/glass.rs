//! 글래스 효과 합성.
//!
//! 프레임을 `cell_size`×`cell_size` 셀로 나눠 셀마다 지배적인 밝기(최빈값)를 구하고,
//! 그 값과 같은 픽셀은 배경으로 보고 흐리게, 다른 픽셀은 도형/글자로 보고 목표 밝기로
//! 끌어올린다. 이미지 영역 픽셀은 건드리지 않는다.

use glasspane_core::config::GlassConfig;
use glasspane_core::error::{try_alloc, CoreError, PipelineStage};
use glasspane_core::models::effect::EffectConfig;
use glasspane_core::models::frame::{FrameBuffer, RegionMask};
use tracing::debug;

use crate::pixel::{invert, luma};

/// 글래스 합성기: 축소 밝기 맵을 재사용한다
#[derive(Debug)]
pub struct GlassComposer {
    config: GlassConfig,
    reduced: Vec<u8>,
    reduced_width: usize,
    reduced_height: usize,
    width: u32,
    height: u32,
}

impl GlassComposer {
    pub fn new(config: GlassConfig) -> Self {
        Self {
            config,
            reduced: Vec::new(),
            reduced_width: 0,
            reduced_height: 0,
            width: 0,
            height: 0,
        }
    }

    /// 프레임 크기에 맞춰 축소 맵 할당 (올림 나눗셈: 빈 끝 셀 없음)
    pub fn prepare(&mut self, width: u32, height: u32) -> Result<(), CoreError> {
        let cell = self.config.cell_size.max(1);
        self.reduced_width = width.div_ceil(cell) as usize;
        self.reduced_height = height.div_ceil(cell) as usize;
        self.reduced = try_alloc(
            self.reduced_width * self.reduced_height,
            0u8,
            PipelineStage::Glass,
        )?;
        self.width = width;
        self.height = height;
        debug!(
            "글래스 축소 맵 할당: {}x{} 셀",
            self.reduced_width, self.reduced_height
        );
        Ok(())
    }

    pub fn release(&mut self) {
        self.reduced = Vec::new();
        self.reduced_width = 0;
        self.reduced_height = 0;
        self.width = 0;
        self.height = 0;
    }

    /// 축소 맵 크기 (셀 단위)
    pub fn reduced_size(&self) -> (usize, usize) {
        (self.reduced_width, self.reduced_height)
    }

    /// 마지막 패스의 셀별 지배 밝기
    pub fn reduced_map(&self) -> &[u8] {
        &self.reduced
    }

    /// 글래스 효과 적용 (제자리)
    pub fn apply(
        &mut self,
        frame: &mut FrameBuffer,
        mask: Option<&RegionMask>,
        effect: &EffectConfig,
    ) -> Result<(), CoreError> {
        if frame.size() != (self.width, self.height) {
            return Err(CoreError::processing(
                PipelineStage::Glass,
                format!(
                    "축소 맵 크기 {}x{}와 프레임 크기 {}x{} 불일치",
                    self.width, self.height, frame.width, frame.height
                ),
            ));
        }
        if let Some(m) = mask {
            if (m.width(), m.height()) != frame.size() {
                return Err(CoreError::processing(
                    PipelineStage::Glass,
                    "마스크 크기 불일치",
                ));
            }
        }

        self.build_reduced(frame, mask);
        self.denoise();
        self.recolor(frame, mask, effect);
        Ok(())
    }

    /// 셀 범위 [x0, x1) × [y0, y1)
    fn cell_bounds(&self, cx: usize, cy: usize) -> (u32, u32, u32, u32) {
        let cell = self.config.cell_size.max(1);
        let x0 = cx as u32 * cell;
        let y0 = cy as u32 * cell;
        (
            x0,
            y0,
            (x0 + cell).min(self.width),
            (y0 + cell).min(self.height),
        )
    }

    fn build_reduced(&mut self, frame: &FrameBuffer, mask: Option<&RegionMask>) {
        for cy in 0..self.reduced_height {
            for cx in 0..self.reduced_width {
                let (x0, y0, x1, y1) = self.cell_bounds(cx, cy);
                let mut histogram = [0u32; 256];
                let mut dominant = luma(&frame.pixels[frame.offset(x0, y0)..]);
                let mut dominant_count = 1u32;

                for y in y0..y1 {
                    for x in x0..x1 {
                        if mask.is_some_and(|m| m.get(x, y)) {
                            continue;
                        }
                        let bucket = luma(&frame.pixels[frame.offset(x, y)..]);
                        let slot = &mut histogram[bucket as usize];
                        *slot += 1;
                        if *slot > dominant_count {
                            dominant = bucket;
                            dominant_count = *slot;
                        }
                    }
                }
                self.reduced[cy * self.reduced_width + cx] = dominant;
            }
        }
    }

    /// 행/열을 따라 같은 값 사이의 짧은 불일치 구간을 메운다
    fn denoise(&mut self) {
        let rw = self.reduced_width;
        let rh = self.reduced_height;
        if rw == 0 || rh == 0 {
            return;
        }

        for y in 0..rh - 1 {
            let mut point = y * rw;
            let point_max = point + rw - 1;
            while point < point_max {
                point = bridge_run(
                    &mut self.reduced,
                    point,
                    point_max,
                    1,
                    self.config.row_tolerance,
                ) + 1;
            }
        }

        for x in 0..rw {
            let mut point = x;
            let point_max = x + (rh - 1) * rw;
            while point < point_max {
                point = bridge_run(
                    &mut self.reduced,
                    point,
                    point_max,
                    rw,
                    self.config.column_tolerance,
                ) + rw;
            }
        }
    }

    fn recolor(&self, frame: &mut FrameBuffer, mask: Option<&RegionMask>, effect: &EffectConfig) {
        let background = effect.background_level;
        for cy in 0..self.reduced_height {
            for cx in 0..self.reduced_width {
                let dominant = self.reduced[cy * self.reduced_width + cx];
                let (x0, y0, x1, y1) = self.cell_bounds(cx, cy);

                let mut shape_max = 0u8;
                for y in y0..y1 {
                    for x in x0..x1 {
                        if mask.is_some_and(|m| m.get(x, y)) {
                            continue;
                        }
                        let bucket = luma(&frame.pixels[frame.offset(x, y)..]);
                        if bucket != dominant && bucket > shape_max {
                            shape_max = bucket;
                        }
                    }
                }
                let scale = if shape_max == 0 {
                    0.0
                } else {
                    255.0 / shape_max as f64 * effect.shapes_level
                };

                for y in y0..y1 {
                    for x in x0..x1 {
                        if mask.is_some_and(|m| m.get(x, y)) {
                            continue;
                        }
                        let o = frame.offset(x, y);
                        let px = &mut frame.pixels[o..o + 4];
                        if luma(px) != dominant {
                            if scale > 1.0 {
                                scale_shape(px, scale);
                            }
                        } else {
                            if effect.dark_background && dominant > self.config.bright_threshold {
                                invert(px);
                            }
                            if background == 0.0 {
                                px.fill(0);
                            } else if background != 1.0 {
                                for c in px.iter_mut() {
                                    *c = (*c as f64 * background) as u8;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// `start` 값으로 시작하는 구간을 `tolerance`개 미만의 연속 불일치까지 이어 붙이고
/// 그 사이를 `start` 값으로 덮어쓴다. 구간의 마지막 일치 위치를 반환.
fn bridge_run(map: &mut [u8], start: usize, max: usize, jump: usize, tolerance: u32) -> usize {
    let value = map[start];
    let mut end = start;
    let mut misses = 0u32;
    let mut point = start;
    while point < max {
        if map[point] == value {
            end = point;
            misses = 0;
        } else {
            misses += 1;
            if misses >= tolerance {
                break;
            }
        }
        point += jump;
    }
    if start < end {
        for p in (start..=end).step_by(jump) {
            map[p] = value;
        }
    }
    end
}

/// 도형 픽셀 세 채널을 배율만큼 키우고, 255를 넘으면 세 채널을 같은 비율로 줄인다
fn scale_shape(px: &mut [u8], scale: f64) {
    let mut channels = [
        (px[0] as f64 * scale) as i64,
        (px[1] as f64 * scale) as i64,
        (px[2] as f64 * scale) as i64,
    ];
    let max = channels.iter().copied().max().unwrap_or(0);
    if max > 255 {
        let reduce = 255.0 / max as f64;
        for c in channels.iter_mut() {
            *c = (*c as f64 * reduce) as i64;
        }
    }
    for (dst, c) in px.iter_mut().zip(channels) {
        *dst = c.clamp(0, 255) as u8;
    }
}
