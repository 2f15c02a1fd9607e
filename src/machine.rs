use crate::memory::{Memory, PROGRAM_ADDR};
use crate::rng::Xorshift32;

/// framebuffer geometry: 64x32 single-bit pixels, row-major from the top left
pub const GFX_WIDTH: usize = 64;
pub const GFX_HEIGHT: usize = 32;
pub const GFX_SIZE: usize = GFX_WIDTH * GFX_HEIGHT;

/// sixteen general registers, V0-VF
pub const V_SIZE: usize = 16;

/// index of the flags register; arithmetic and DRW overwrite it
pub const FLAG: usize = 0xf;

/// the pad has sixteen keys, 0x0-0xF
pub const KEY_COUNT: usize = 16;

/// how many nested CALLs the machine holds return addresses for
pub const STACK_DEPTH: usize = 15;

/// Every piece of mutable interpreter state in one place: register file,
/// index register, program counter, call stack, timers, key latch,
/// framebuffer and the RNG. The struct only knows how to initialise itself,
/// tick its timers and hand latches over; instruction semantics live in
/// [`crate::interpreter`].
///
/// Fields are public so tests (and anything else driving the machine) can
/// arrange and inspect state directly.
#[derive(Debug)]
pub struct Machine {
    pub v: [u8; V_SIZE],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub stack: [u16; STACK_DEPTH],
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keys: [bool; KEY_COUNT],
    /// one byte per pixel, 0 or 1
    pub gfx: [u8; GFX_SIZE],
    /// set by CLS and DRW; consumed by the renderer via [`Machine::take_draw_flag`]
    pub draw: bool,
    pub memory: Memory,
    pub rng: Xorshift32,
}

impl Machine {
    /// power-on state: font in memory, PC at the program start, all else zero
    pub fn new(rng: Xorshift32) -> Self {
        Machine {
            v: [0; V_SIZE],
            i: 0,
            pc: PROGRAM_ADDR,
            sp: 0,
            stack: [0; STACK_DEPTH],
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            gfx: [0; GFX_SIZE],
            draw: false,
            memory: Memory::new(),
            rng,
        }
    }

    /// tick both countdown timers once. Returns true exactly when the sound
    /// timer decays from 1 to 0, which is the audio collaborator's cue; a
    /// timer already at zero stays there silently.
    pub fn tick_timers(&mut self) -> bool {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            self.sound_timer -= 1;
            return self.sound_timer == 0;
        }
        false
    }

    /// replace the key latch with a fresh snapshot from the input collaborator
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }

    /// true if the framebuffer changed since the last call; clears the flag,
    /// so each change is presented once
    pub fn take_draw_flag(&mut self) -> bool {
        let draw = self.draw;
        self.draw = false;
        draw
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.gfx
    }
}
