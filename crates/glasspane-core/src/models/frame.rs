//! 프레임 버퍼 모델.
//!
//! 캡처된 창 한 장의 픽셀 데이터와 이미지 영역 마스크를 정의한다.
//! 픽셀은 4바이트(채널 0..3 = 색, 채널 3 = 알파) 고정 레이아웃이다.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 픽셀당 바이트 수
pub const BYTES_PER_PIXEL: usize = 4;

/// 캡처된 프레임 한 장.
///
/// 파이프라인 단계 사이에서 소유권이 이동하며, 동시에 두 단계가 수정하지 않는다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// 너비 (픽셀)
    pub width: u32,
    /// 높이 (픽셀)
    pub height: u32,
    /// 한 행의 바이트 수 (`width * 4` 이상)
    pub stride: usize,
    /// 픽셀 데이터 (`height * stride` 바이트 이상)
    pub pixels: Vec<u8>,
}

impl FrameBuffer {
    /// 크기/stride 검증 후 프레임 생성
    pub fn new(width: u32, height: u32, stride: usize, pixels: Vec<u8>) -> Result<Self, CoreError> {
        let min_stride = width as usize * BYTES_PER_PIXEL;
        if stride < min_stride {
            return Err(CoreError::Validation {
                field: "stride".to_string(),
                message: format!("{stride} < {min_stride}"),
            });
        }
        let min_len = height as usize * stride;
        if pixels.len() < min_len {
            return Err(CoreError::Validation {
                field: "pixels".to_string(),
                message: format!("{} bytes < {min_len}", pixels.len()),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            pixels,
        })
    }

    /// 단색 프레임 생성 (stride = width * 4)
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        let mut pixels = Vec::with_capacity(stride * height as usize);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            stride,
            pixels,
        }
    }

    /// (x, y) 픽셀의 바이트 오프셋
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * BYTES_PER_PIXEL
    }

    /// (x, y) 픽셀 값
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let o = self.offset(x, y);
        [
            self.pixels[o],
            self.pixels[o + 1],
            self.pixels[o + 2],
            self.pixels[o + 3],
        ]
    }

    /// (x, y) 픽셀 값 설정
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [u8; 4]) {
        let o = self.offset(x, y);
        self.pixels[o..o + BYTES_PER_PIXEL].copy_from_slice(&value);
    }

    /// 한 행의 유효 바이트 (패딩 제외)
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.pixels[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// 프레임 크기 (너비, 높이)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 빈 프레임 여부
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 직사각형 영역 (화면 좌표, 음수 허용)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 크기만 비교
    pub fn same_size(&self, other: &Rect) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// 위치만 비교
    pub fn same_origin(&self, other: &Rect) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// 이미지 영역 마스크: 픽셀당 하나, 행 우선, `true` = 이미지(사진) 영역
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl RegionMask {
    /// 전부 `false`인 마스크 할당 (실패 시 [`CoreError::Allocation`])
    pub fn try_new(width: u32, height: u32) -> Result<Self, CoreError> {
        let cells = crate::error::try_alloc(
            width as usize * height as usize,
            false,
            crate::error::PipelineStage::Classification,
        )?;
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (x, y)가 이미지 영역인지
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = y as usize * self.width as usize + x as usize;
        self.cells[idx] = value;
    }

    /// 행 우선 선형 인덱스 접근
    #[inline]
    pub fn get_index(&self, idx: usize) -> bool {
        self.cells[idx]
    }

    /// 전체 `false`로 초기화
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// [x1, x2) × [y1, y2) 영역을 `true`로 채움
    pub fn fill_rect(&mut self, x1: u32, y1: u32, x2: u32, y2: u32) {
        let x2 = x2.min(self.width);
        let y2 = y2.min(self.height);
        if x1 >= x2 {
            return;
        }
        for y in y1..y2 {
            let base = y as usize * self.width as usize;
            self.cells[base + x1 as usize..base + x2 as usize].fill(true);
        }
    }

    /// `true` 셀 개수
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// `true` 셀 전체를 감싸는 바운딩 박스 (x1, y1, x2, y2: 끝 포함)
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bbox: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    bbox = Some(match bbox {
                        None => (x, y, x, y),
                        Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
                    });
                }
            }
        }
        bbox
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }
}
