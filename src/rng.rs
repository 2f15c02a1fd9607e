use std::time::{SystemTime, UNIX_EPOCH};

/// seed used when the wall clock is unavailable or the caller asks for zero;
/// zero is the one state xorshift can never leave
const FALLBACK_SEED: u32 = 0x2545_f491;

/// Marsaglia's 32-bit xorshift generator. One persistent state advanced in
/// place; the RND instruction takes the low byte of each step. The state is
/// seeded once at startup rather than on every call, so the output is a
/// proper stream and a fixed seed reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// explicit seed, for reproducible runs and tests
    pub fn new(seed: u32) -> Self {
        Xorshift32 {
            state: if seed == 0 { FALLBACK_SEED } else { seed },
        }
    }

    /// seed from the wall clock, the default for interactive runs
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(FALLBACK_SEED);
        Xorshift32::new(seed)
    }

    /// advance the state and return it
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// low byte of the next step, as the RND instruction consumes it
    pub fn next_byte(&mut self) -> u8 {
        (self.next_u32() % 256) as u8
    }
}
