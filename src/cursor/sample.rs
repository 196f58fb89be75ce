use std::sync::atomic::{AtomicU64, Ordering};

/// Latest right-stick position, each axis normalised to roughly [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickSample {
    pub x: f32,
    pub y: f32,
}

impl StickSample {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn pack(self) -> u64 {
        (u64::from(self.x.to_bits()) << 32) | u64::from(self.y.to_bits())
    }

    fn unpack(bits: u64) -> Self {
        Self {
            x: f32::from_bits((bits >> 32) as u32),
            y: f32::from_bits(bits as u32),
        }
    }
}

/// Both axes packed into one word so readers never see a torn pair.
/// Lock-free: writers on the event path never block.
#[derive(Debug, Default)]
pub struct AtomicStickSample(AtomicU64);

impl AtomicStickSample {
    pub fn new(sample: StickSample) -> Self {
        Self(AtomicU64::new(sample.pack()))
    }

    pub fn load(&self) -> StickSample {
        StickSample::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, sample: StickSample) {
        self.0.store(sample.pack(), Ordering::Release);
    }
}
