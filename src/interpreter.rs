//! The fetch-decode-execute engine. One [`Interpreter`] owns a [`Machine`]
//! and borrows the display, input and sound collaborators for the length of
//! the run; everything it does is driven from [`Interpreter::cycle`] or the
//! blocking [`Interpreter::main_loop`].

use crate::display::Display;
use crate::input::Input;
use crate::machine::{Machine, FLAG, GFX_SIZE, GFX_WIDTH, STACK_DEPTH};
use crate::memory::{LoadError, MEMORY_SIZE, PROGRAM_ADDR};
use crate::opcode::{Instruction, Opcode};
use crate::rng::Xorshift32;
use crate::sound::Sound;
use log::debug;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// highest address an instruction word can be fetched from
const PC_MAX: u16 = (MEMORY_SIZE - 2) as u16;

/// Execution faults. All of them end the run: once the program counter or
/// the instruction stream is inconsistent with the machine, carrying on
/// would only corrupt state.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("opcode {opcode:#06x} at {pc:#06x} is not a CHIP-8 instruction")]
    UnknownOpcode { opcode: u16, pc: u16 },
    #[error("program counter {0:#06x} left the executable range")]
    PcOutOfRange(u16),
    #[error("call stack overflow")]
    StackOverflow,
    #[error("RET with an empty call stack")]
    StackUnderflow,
    #[error("memory access at {addr:#06x}+{len} leaves the address space")]
    OutOfBounds { addr: u16, len: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Interpreter<'a> {
    pub machine: Machine,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        rng: Xorshift32,
    ) -> Interpreter<'a> {
        Interpreter {
            machine: Machine::new(rng),
            display,
            input,
            sound,
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, LoadError> {
        self.machine.memory.load_program(reader)
    }

    /// read the word at PC and step past it. The PC must sit inside
    /// [0x200, 0xffe]; anything else is fatal, never wrapped or clamped.
    fn fetch(&mut self) -> Result<Opcode, ExecError> {
        let pc = self.machine.pc;
        if pc < PROGRAM_ADDR || pc > PC_MAX {
            return Err(ExecError::PcOutOfRange(pc));
        }
        let word = self
            .machine
            .memory
            .read_word(pc)
            .ok_or(ExecError::PcOutOfRange(pc))?;
        self.machine.pc = pc + 2;
        Ok(Opcode(word))
    }

    /// run one fetch-decode-execute step, then tick the timers. A sound
    /// timer decaying to zero here is what cues the beep.
    pub fn cycle(&mut self) -> Result<(), ExecError> {
        let pc = self.machine.pc;
        let op = self.fetch()?;
        let instr = Instruction::decode(op).ok_or(ExecError::UnknownOpcode {
            opcode: op.word(),
            pc,
        })?;
        debug!(
            "mem: {:#06x}, opcode: {:#06x}, inst: {}",
            pc,
            op.word(),
            instr.mnemonic()
        );
        self.execute(instr)?;
        if self.machine.tick_timers() {
            self.sound.beep();
        }
        Ok(())
    }

    /// apply one decoded instruction to the machine
    fn execute(&mut self, instr: Instruction) -> Result<(), ExecError> {
        let m = &mut self.machine;
        match instr {
            Instruction::Cls => {
                m.gfx = [0; GFX_SIZE];
                m.draw = true;
            }
            Instruction::Ret => {
                if m.sp == 0 {
                    return Err(ExecError::StackUnderflow);
                }
                m.sp -= 1;
                m.pc = m.stack[m.sp as usize];
            }
            Instruction::Jp(nnn) => m.pc = nnn,
            Instruction::Call(nnn) => {
                if m.sp as usize >= STACK_DEPTH {
                    return Err(ExecError::StackOverflow);
                }
                m.stack[m.sp as usize] = m.pc;
                m.sp += 1;
                m.pc = nnn;
            }
            Instruction::SeByte(x, kk) => {
                if m.v[x as usize] == kk {
                    m.pc += 2;
                }
            }
            Instruction::SneByte(x, kk) => {
                if m.v[x as usize] != kk {
                    m.pc += 2;
                }
            }
            Instruction::SeReg(x, y) => {
                if m.v[x as usize] == m.v[y as usize] {
                    m.pc += 2;
                }
            }
            Instruction::LdByte(x, kk) => m.v[x as usize] = kk,
            // ADD Vx, byte leaves the flags register alone
            Instruction::AddByte(x, kk) => {
                m.v[x as usize] = m.v[x as usize].wrapping_add(kk);
            }
            Instruction::LdReg(x, y) => m.v[x as usize] = m.v[y as usize],
            Instruction::Or(x, y) => m.v[x as usize] |= m.v[y as usize],
            Instruction::And(x, y) => m.v[x as usize] &= m.v[y as usize],
            Instruction::Xor(x, y) => m.v[x as usize] ^= m.v[y as usize],
            // flags for the 8xxx arithmetic come from the operands as they
            // were before the result lands; when x is 0xF the flag wins
            Instruction::AddReg(x, y) => {
                let (sum, carry) = m.v[x as usize].overflowing_add(m.v[y as usize]);
                m.v[x as usize] = sum;
                m.v[FLAG] = carry as u8;
            }
            Instruction::Sub(x, y) => {
                let (vx, vy) = (m.v[x as usize], m.v[y as usize]);
                m.v[x as usize] = vx.wrapping_sub(vy);
                m.v[FLAG] = (vx > vy) as u8;
            }
            Instruction::Shr(x) => {
                let vx = m.v[x as usize];
                m.v[x as usize] = vx >> 1;
                m.v[FLAG] = vx & 0x01;
            }
            Instruction::Subn(x, y) => {
                let (vx, vy) = (m.v[x as usize], m.v[y as usize]);
                m.v[x as usize] = vy.wrapping_sub(vx);
                m.v[FLAG] = (vy > vx) as u8;
            }
            Instruction::Shl(x) => {
                let vx = m.v[x as usize];
                m.v[x as usize] = vx << 1;
                m.v[FLAG] = vx >> 7;
            }
            Instruction::SneReg(x, y) => {
                if m.v[x as usize] != m.v[y as usize] {
                    m.pc += 2;
                }
            }
            Instruction::LdI(nnn) => m.i = nnn,
            Instruction::JpV0(nnn) => m.pc = nnn + m.v[0] as u16,
            Instruction::Rnd(x, kk) => m.v[x as usize] = m.rng.next_byte() & kk,
            Instruction::Drw(x, y, n) => {
                let left = m.v[x as usize] as usize;
                let top = m.v[y as usize] as usize;
                let rows = m
                    .memory
                    .slice(m.i, n as usize)
                    .ok_or(ExecError::OutOfBounds {
                        addr: m.i,
                        len: n as usize,
                    })?;
                m.v[FLAG] = 0;
                for (row, &bits) in rows.iter().enumerate() {
                    for col in 0..8 {
                        if bits & (0x80 >> col) != 0 {
                            // sprites land linearly in the framebuffer: a
                            // sprite crossing the right edge bleeds onto the
                            // next row, one off the bottom wraps to the top
                            let pos = (left + col + (top + row) * GFX_WIDTH) % GFX_SIZE;
                            if m.gfx[pos] == 1 {
                                m.v[FLAG] = 1;
                            }
                            m.gfx[pos] ^= 1;
                        }
                    }
                }
                m.draw = true;
            }
            Instruction::Skp(x) => {
                if m.keys[(m.v[x as usize] & 0x0f) as usize] {
                    m.pc += 2;
                }
            }
            Instruction::Sknp(x) => {
                if !m.keys[(m.v[x as usize] & 0x0f) as usize] {
                    m.pc += 2;
                }
            }
            Instruction::LdRegDt(x) => m.v[x as usize] = m.delay_timer,
            // LD Vx, K does not wait: it takes the last key down right now
            // and leaves Vx alone when the pad is idle
            Instruction::LdKey(x) => {
                for (key, &down) in m.keys.iter().enumerate() {
                    if down {
                        m.v[x as usize] = key as u8;
                    }
                }
            }
            Instruction::LdDtReg(x) => m.delay_timer = m.v[x as usize],
            Instruction::LdStReg(x) => m.sound_timer = m.v[x as usize],
            Instruction::AddI(x) => m.i = m.i.wrapping_add(m.v[x as usize] as u16),
            Instruction::LdFont(x) => m.i = m.v[x as usize] as u16 * 5,
            Instruction::LdBcd(x) => {
                let vx = m.v[x as usize];
                let digits = [vx / 100, (vx / 10) % 10, vx % 10];
                m.memory
                    .write(&digits, m.i)
                    .ok_or(ExecError::OutOfBounds { addr: m.i, len: 3 })?;
            }
            Instruction::StoreRegs(x) => {
                let count = x as usize + 1;
                m.memory
                    .write(&m.v[..count], m.i)
                    .ok_or(ExecError::OutOfBounds {
                        addr: m.i,
                        len: count,
                    })?;
            }
            Instruction::LoadRegs(x) => {
                let count = x as usize + 1;
                let src = m.memory.slice(m.i, count).ok_or(ExecError::OutOfBounds {
                    addr: m.i,
                    len: count,
                })?;
                m.v[..count].copy_from_slice(src);
            }
        }
        Ok(())
    }

    /// cycle the machine until the input collaborator reports a quit.
    /// `frame_after` is how many extra cycles run between display presents;
    /// `copy_delay` is slept after each present interval to pace execution.
    pub fn main_loop(&mut self, frame_after: u32, copy_delay: Duration) -> Result<(), ExecError> {
        let mut passes = 0u32;
        loop {
            self.cycle()?;
            let state = self.input.poll()?;
            if state.quit {
                break;
            }
            self.machine.set_keys(state.keys);
            if passes == frame_after {
                // only repaint when something changed, but always pace
                if self.machine.take_draw_flag() {
                    self.display.draw(self.machine.framebuffer())?;
                }
                spin_sleep::sleep(copy_delay);
                passes = 0;
            } else {
                passes += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::machine::GFX_HEIGHT;
    use crate::sound::Mute;

    /// load `prog`, let `setup` arrange the machine, run `cycles` steps and
    /// hand the machine back for inspection
    fn run(
        prog: &[u8],
        cycles: usize,
        setup: impl FnOnce(&mut Machine),
    ) -> Result<Machine, ExecError> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut sound = Mute::new();
        let mut i = Interpreter::new(&mut display, &mut input, &mut sound, Xorshift32::new(0xc8));
        i.load_program(&mut &prog[..]).unwrap();
        setup(&mut i.machine);
        for _ in 0..cycles {
            i.cycle()?;
        }
        Ok(i.machine)
    }

    struct CountingBeep {
        count: usize,
    }

    impl Sound for CountingBeep {
        fn beep(&mut self) {
            self.count += 1;
        }
    }

    #[test]
    fn test_jump() -> Result<(), ExecError> {
        let m = run(&[0x16, 0x66], 1, |_| {})?;
        assert_eq!(m.pc, 0x666);
        Ok(())
    }

    #[test]
    fn test_jump_plus_v0() -> Result<(), ExecError> {
        let m = run(&[0xb3, 0x00], 1, |m| m.v[0] = 0x08)?;
        assert_eq!(m.pc, 0x308);
        Ok(())
    }

    #[test]
    fn test_call_and_ret_round_trip() -> Result<(), ExecError> {
        let mut prog = [0u8; 10];
        prog[..2].copy_from_slice(&[0x22, 0x08]); // call 0x208
        prog[8..].copy_from_slice(&[0x00, 0xee]); // ret
        let m = run(&prog, 2, |_| {})?;
        assert_eq!(m.pc, 0x202);
        assert_eq!(m.sp, 0);
        Ok(())
    }

    #[test]
    fn test_skip_equal_byte() -> Result<(), ExecError> {
        let m = run(&[0x30, 0x07], 1, |m| m.v[0] = 0x07)?;
        assert_eq!(m.pc, 0x204);
        let m = run(&[0x30, 0x07], 1, |m| m.v[0] = 0x08)?;
        assert_eq!(m.pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_skip_not_equal_byte() -> Result<(), ExecError> {
        let m = run(&[0x40, 0x07], 1, |m| m.v[0] = 0x08)?;
        assert_eq!(m.pc, 0x204);
        let m = run(&[0x40, 0x07], 1, |m| m.v[0] = 0x07)?;
        assert_eq!(m.pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_skip_register_compares() -> Result<(), ExecError> {
        let m = run(&[0x50, 0x10], 1, |m| {
            m.v[0] = 9;
            m.v[1] = 9;
        })?;
        assert_eq!(m.pc, 0x204);
        let m = run(&[0x90, 0x10], 1, |m| {
            m.v[0] = 9;
            m.v[1] = 8;
        })?;
        assert_eq!(m.pc, 0x204);
        let m = run(&[0x90, 0x10], 1, |m| {
            m.v[0] = 9;
            m.v[1] = 9;
        })?;
        assert_eq!(m.pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_load_and_add_byte() -> Result<(), ExecError> {
        let m = run(&[0x63, 0xf5, 0x73, 0x11], 2, |_| {})?;
        assert_eq!(m.v[3], 0x06); // 0xf5 + 0x11 wraps
        Ok(())
    }

    #[test]
    fn test_add_byte_wraps_without_touching_flag() -> Result<(), ExecError> {
        let m = run(&[0x70, 0xff], 1, |m| {
            m.v[0] = 2;
            m.v[FLAG] = 0xaa;
        })?;
        assert_eq!(m.v[0], 1);
        assert_eq!(m.v[FLAG], 0xaa);
        Ok(())
    }

    #[test]
    fn test_logical_ops() -> Result<(), ExecError> {
        let setup = |m: &mut Machine| {
            m.v[0] = 0xf0;
            m.v[1] = 0x3c;
        };
        let m = run(&[0x80, 0x11], 1, setup)?;
        assert_eq!(m.v[0], 0xfc);
        let m = run(&[0x80, 0x12], 1, setup)?;
        assert_eq!(m.v[0], 0x30);
        let m = run(&[0x80, 0x13], 1, setup)?;
        assert_eq!(m.v[0], 0xcc);
        let m = run(&[0x80, 0x10], 1, setup)?;
        assert_eq!(m.v[0], 0x3c);
        Ok(())
    }

    #[test]
    fn test_add_register_carry() -> Result<(), ExecError> {
        let m = run(&[0x80, 0x14], 1, |m| {
            m.v[0] = 200;
            m.v[1] = 100;
        })?;
        assert_eq!(m.v[0], 44);
        assert_eq!(m.v[FLAG], 1);
        let m = run(&[0x80, 0x14], 1, |m| {
            m.v[0] = 200;
            m.v[1] = 55;
        })?;
        assert_eq!(m.v[0], 255);
        assert_eq!(m.v[FLAG], 0);
        Ok(())
    }

    #[test]
    fn test_sub_sets_flag_on_no_borrow() -> Result<(), ExecError> {
        let m = run(&[0x80, 0x15], 1, |m| {
            m.v[0] = 9;
            m.v[1] = 5;
        })?;
        assert_eq!(m.v[0], 4);
        assert_eq!(m.v[FLAG], 1);
        // equal operands: no flag
        let m = run(&[0x80, 0x15], 1, |m| {
            m.v[0] = 5;
            m.v[1] = 5;
        })?;
        assert_eq!(m.v[0], 0);
        assert_eq!(m.v[FLAG], 0);
        // borrow wraps
        let m = run(&[0x80, 0x15], 1, |m| {
            m.v[0] = 5;
            m.v[1] = 9;
        })?;
        assert_eq!(m.v[0], 252);
        assert_eq!(m.v[FLAG], 0);
        Ok(())
    }

    #[test]
    fn test_subn_is_sub_reversed() -> Result<(), ExecError> {
        let m = run(&[0x80, 0x17], 1, |m| {
            m.v[0] = 5;
            m.v[1] = 9;
        })?;
        assert_eq!(m.v[0], 4);
        assert_eq!(m.v[FLAG], 1);
        let m = run(&[0x80, 0x17], 1, |m| {
            m.v[0] = 9;
            m.v[1] = 5;
        })?;
        assert_eq!(m.v[0], 252);
        assert_eq!(m.v[FLAG], 0);
        Ok(())
    }

    #[test]
    fn test_shr_catches_low_bit() -> Result<(), ExecError> {
        let m = run(&[0x80, 0x06], 1, |m| m.v[0] = 0x05)?;
        assert_eq!(m.v[0], 0x02);
        assert_eq!(m.v[FLAG], 1);
        let m = run(&[0x80, 0x06], 1, |m| m.v[0] = 0x04)?;
        assert_eq!(m.v[0], 0x02);
        assert_eq!(m.v[FLAG], 0);
        Ok(())
    }

    #[test]
    fn test_shl_catches_high_bit() -> Result<(), ExecError> {
        let m = run(&[0x80, 0x0e], 1, |m| m.v[0] = 0x81)?;
        assert_eq!(m.v[0], 0x02);
        assert_eq!(m.v[FLAG], 1);
        let m = run(&[0x80, 0x0e], 1, |m| m.v[0] = 0x41)?;
        assert_eq!(m.v[0], 0x82);
        assert_eq!(m.v[FLAG], 0);
        Ok(())
    }

    #[test]
    fn test_index_register_loads_and_adds() -> Result<(), ExecError> {
        let m = run(&[0xa5, 0x68, 0xf0, 0x1e], 2, |m| m.v[0] = 5)?;
        assert_eq!(m.i, 0x56d);
        // ADD I, Vx wraps at 16 bits and sets no flag
        let m = run(&[0xf0, 0x1e], 1, |m| {
            m.i = 0xffff;
            m.v[0] = 2;
            m.v[FLAG] = 0xaa;
        })?;
        assert_eq!(m.i, 1);
        assert_eq!(m.v[FLAG], 0xaa);
        Ok(())
    }

    #[test]
    fn test_font_addresses_are_five_bytes_apart() -> Result<(), ExecError> {
        let m = run(&[0xf0, 0x29], 1, |m| m.v[0] = 0x0b)?;
        assert_eq!(m.i, 55);
        // values past 0xF are not masked, matching the original interpreter
        let m = run(&[0xf0, 0x29], 1, |m| m.v[0] = 255)?;
        assert_eq!(m.i, 1275);
        Ok(())
    }

    #[test]
    fn test_bcd_conversion() -> Result<(), ExecError> {
        let m = run(&[0xa3, 0x00, 0xf0, 0x33], 2, |m| m.v[0] = 234)?;
        assert_eq!(m.memory.slice(0x300, 3), Some(&[2, 3, 4][..]));
        let m = run(&[0xa3, 0x00, 0xf0, 0x33], 2, |m| m.v[0] = 7)?;
        assert_eq!(m.memory.slice(0x300, 3), Some(&[0, 0, 7][..]));
        Ok(())
    }

    #[test]
    fn test_store_registers_to_memory() -> Result<(), ExecError> {
        let m = run(&[0xa3, 0x00, 0xf3, 0x55], 2, |m| {
            m.v[..4].copy_from_slice(&[9, 8, 7, 6]);
            m.v[4] = 0xee; // one past x, must not be copied
        })?;
        assert_eq!(m.memory.slice(0x300, 5), Some(&[9, 8, 7, 6, 0][..]));
        Ok(())
    }

    #[test]
    fn test_load_registers_from_memory() -> Result<(), ExecError> {
        let m = run(&[0xa3, 0x00, 0xf3, 0x65], 2, |m| {
            m.memory.write(&[4, 3, 2, 1, 0xee], 0x300);
        })?;
        assert_eq!(m.v[..5], [4, 3, 2, 1, 0]);
        Ok(())
    }

    #[test]
    fn test_draw_font_glyph_top_left() -> Result<(), ExecError> {
        // the scenario a fresh ROM hits first: point I at the 0 glyph and
        // draw it five rows tall at the origin
        let m = run(&[0x6a, 0x05, 0xa0, 0x00, 0xd0, 0x05], 3, |_| {})?;
        assert_eq!(m.v[0xa], 0x05);
        assert_eq!(m.v[FLAG], 0);
        assert!(m.draw);
        assert_eq!(m.gfx[..8], [1, 1, 1, 1, 0, 0, 0, 0]); // 0xF0
        assert_eq!(m.gfx[64..72], [1, 0, 0, 1, 0, 0, 0, 0]); // 0x90
        Ok(())
    }

    #[test]
    fn test_draw_twice_erases_and_reports_collision() -> Result<(), ExecError> {
        let m = run(&[0xa0, 0x00, 0xd0, 0x05, 0xd0, 0x05], 3, |_| {})?;
        assert_eq!(m.v[FLAG], 1);
        assert_eq!(m.gfx, [0; GFX_SIZE]);
        assert!(m.draw);
        Ok(())
    }

    #[test]
    fn test_draw_past_right_edge_bleeds_onto_next_row() -> Result<(), ExecError> {
        let m = run(&[0xa3, 0x00, 0xd0, 0x11], 2, |m| {
            m.memory.write(&[0xc0], 0x300);
            m.v[0] = 63;
        })?;
        assert_eq!(m.gfx[63], 1);
        assert_eq!(m.gfx[64], 1); // second pixel lands on the next row
        assert_eq!(m.gfx[0], 0);
        Ok(())
    }

    #[test]
    fn test_draw_past_bottom_wraps_to_top() -> Result<(), ExecError> {
        let m = run(&[0xa3, 0x00, 0xd0, 0x12], 2, |m| {
            m.memory.write(&[0x80, 0x80], 0x300);
            m.v[1] = (GFX_HEIGHT - 1) as u8;
        })?;
        assert_eq!(m.gfx[(GFX_HEIGHT - 1) * GFX_WIDTH], 1);
        assert_eq!(m.gfx[0], 1);
        Ok(())
    }

    #[test]
    fn test_clear_screen() -> Result<(), ExecError> {
        let m = run(&[0x00, 0xe0], 1, |m| m.gfx = [1; GFX_SIZE])?;
        assert_eq!(m.gfx, [0; GFX_SIZE]);
        assert!(m.draw);
        Ok(())
    }

    #[test]
    fn test_random_masks_with_kk() -> Result<(), ExecError> {
        let m = run(&[0xc0, 0x0f], 1, |m| m.rng = Xorshift32::new(7))?;
        let expected = Xorshift32::new(7).next_byte() & 0x0f;
        assert_eq!(m.v[0], expected);
        assert!(m.v[0] <= 0x0f);
        // kk of zero pins the register to zero
        let m = run(&[0xc1, 0x00], 1, |_| {})?;
        assert_eq!(m.v[1], 0);
        Ok(())
    }

    #[test]
    fn test_skip_on_key_state() -> Result<(), ExecError> {
        let m = run(&[0xe0, 0x9e], 1, |m| {
            m.v[0] = 0x05;
            m.keys[0x05] = true;
        })?;
        assert_eq!(m.pc, 0x204);
        let m = run(&[0xe0, 0xa1], 1, |m| {
            m.v[0] = 0x05;
            m.keys[0x05] = true;
        })?;
        assert_eq!(m.pc, 0x202);
        // only the low nibble of Vx picks the key
        let m = run(&[0xe0, 0x9e], 1, |m| {
            m.v[0] = 0xf5;
            m.keys[0x05] = true;
        })?;
        assert_eq!(m.pc, 0x204);
        Ok(())
    }

    #[test]
    fn test_key_load_takes_last_key_down() -> Result<(), ExecError> {
        let m = run(&[0xf0, 0x0a], 1, |m| {
            m.keys[0x2] = true;
            m.keys[0x7] = true;
        })?;
        assert_eq!(m.v[0], 0x7);
        // idle pad leaves the register alone
        let m = run(&[0xf0, 0x0a], 1, |m| m.v[0] = 0xaa)?;
        assert_eq!(m.v[0], 0xaa);
        Ok(())
    }

    #[test]
    fn test_timers_tick_after_every_cycle() -> Result<(), ExecError> {
        // LD DT, V0 with 5, then read it back: the set cycle already ticks
        let m = run(&[0x60, 0x05, 0xf0, 0x15, 0xf1, 0x07], 3, |_| {})?;
        assert_eq!(m.v[1], 4);
        assert_eq!(m.delay_timer, 3);
        let m = run(&[0xf0, 0x18], 1, |m| m.v[0] = 5)?;
        assert_eq!(m.sound_timer, 4);
        Ok(())
    }

    #[test]
    fn test_sound_edge_beeps_exactly_once() -> Result<(), ExecError> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut sound = CountingBeep { count: 0 };
        let mut i = Interpreter::new(&mut display, &mut input, &mut sound, Xorshift32::new(1));
        // ST = 2, then two idle loads: the edge lands on the second cycle
        i.load_program(&mut &[0xf0, 0x18, 0x61, 0x00, 0x61, 0x00][..])
            .unwrap();
        i.machine.v[0] = 2;
        for _ in 0..3 {
            i.cycle()?;
        }
        drop(i);
        assert_eq!(sound.count, 1);
        Ok(())
    }

    #[test]
    fn test_sound_timer_rearms() -> Result<(), ExecError> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut sound = CountingBeep { count: 0 };
        let mut i = Interpreter::new(&mut display, &mut input, &mut sound, Xorshift32::new(1));
        i.load_program(&mut &[0xf0, 0x18, 0x61, 0x00, 0xf0, 0x18, 0x61, 0x00][..])
            .unwrap();
        i.machine.v[0] = 2;
        for _ in 0..4 {
            i.cycle()?;
        }
        drop(i);
        assert_eq!(sound.count, 2);
        Ok(())
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let err = run(&[0x80, 0x08], 1, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnknownOpcode {
                opcode: 0x8008,
                pc: 0x200
            }
        ));
    }

    #[test]
    fn test_host_calls_are_fatal() {
        // 0nnn ran RCA 1802 code on the original hardware; here it's an error
        let err = run(&[0x02, 0x30], 1, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnknownOpcode {
                opcode: 0x0230,
                pc: 0x200
            }
        ));
    }

    #[test]
    fn test_pc_leaving_range_is_fatal() {
        let err = run(&[0x11, 0xff], 2, |_| {}).unwrap_err();
        assert!(matches!(err, ExecError::PcOutOfRange(0x1ff)));
        let err = run(&[0x1f, 0xff], 2, |_| {}).unwrap_err();
        assert!(matches!(err, ExecError::PcOutOfRange(0xfff)));
    }

    #[test]
    fn test_ret_underflows_fresh_stack() {
        let err = run(&[0x00, 0xee], 1, |_| {}).unwrap_err();
        assert!(matches!(err, ExecError::StackUnderflow));
    }

    #[test]
    fn test_sixteenth_nested_call_overflows() {
        // a program that calls itself: the 16th push must fail
        assert!(run(&[0x22, 0x00], 15, |_| {}).is_ok());
        let err = run(&[0x22, 0x00], 16, |_| {}).unwrap_err();
        assert!(matches!(err, ExecError::StackOverflow));
    }

    #[test]
    fn test_draw_reading_past_ram_is_fatal() {
        let err = run(&[0xd0, 0x0f], 1, |m| m.i = 0x0ffa).unwrap_err();
        assert!(matches!(
            err,
            ExecError::OutOfBounds {
                addr: 0x0ffa,
                len: 15
            }
        ));
    }

    #[test]
    fn test_bcd_writing_past_ram_is_fatal() {
        let err = run(&[0xf0, 0x33], 1, |m| m.i = 0x0ffe).unwrap_err();
        assert!(matches!(
            err,
            ExecError::OutOfBounds {
                addr: 0x0ffe,
                len: 3
            }
        ));
    }

    #[test]
    fn test_main_loop_runs_until_quit() -> Result<(), ExecError> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::quit_after(5);
        let mut sound = Mute::new();
        let mut i = Interpreter::new(&mut display, &mut input, &mut sound, Xorshift32::new(1));
        // draw the 0 glyph, then jump back to the draw forever
        i.load_program(&mut &[0xa0, 0x00, 0xd0, 0x05, 0x12, 0x02][..])
            .unwrap();
        i.main_loop(0, Duration::ZERO)?;
        drop(i);
        assert!(display.frames >= 1);
        Ok(())
    }
}
