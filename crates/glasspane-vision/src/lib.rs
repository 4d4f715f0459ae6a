//! # glasspane-vision
//!
//! 픽셀 처리 크레이트.
//! 프레임 변경 감지, 이미지 영역 분류, 다크 모드 반전, 글래스 합성과
//! 이들을 한 패스로 묶는 CPU/가속 프로세서를 담당한다.

pub mod change;
pub mod classifier;
pub mod common_colors;
pub mod dark_mode;
pub mod device;
pub mod frame_image;
pub mod glass;
pub mod pixel;
pub mod processor;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support {
    use glasspane_core::models::frame::FrameBuffer;

    /// 결정적 의사 난수 (xorshift64)
    pub struct XorShift(u64);

    impl XorShift {
        pub fn new(seed: u64) -> Self {
            Self(seed.max(1))
        }

        pub fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            (x >> 32) as u32
        }
    }

    /// [from, to) 구간을 어두운 노이즈로 채운다 (채널 0..90, 알파 255)
    pub fn noise_block(
        frame: &mut FrameBuffer,
        rng: &mut XorShift,
        from: (u32, u32),
        to: (u32, u32),
    ) {
        for y in from.1..to.1.min(frame.height) {
            for x in from.0..to.0.min(frame.width) {
                let mut px = [0u8, 0, 0, 255];
                for c in px.iter_mut().take(3) {
                    *c = (rng.next_u32() % 91) as u8;
                }
                frame.set_pixel(x, y, px);
            }
        }
    }
}
