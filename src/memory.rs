use std::io;
use thiserror::Error;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const MEMORY_SIZE: usize = 4096;

/// where programs are loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// the largest ROM that fits between the program start and the top of RAM
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_ADDR as usize;

/// where the font glyphs live; LD F, Vx computes glyph addresses from here
pub const FONT_ADDR: u16 = 0x0000;

/// why a ROM could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM size of {0} bytes is invalid; must be > 0 and <= {max}", max = MAX_PROGRAM_SIZE)]
    BadSize(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The 4K address space. The low 512 bytes belong to the interpreter and
/// hold the font; programs sit at 0x200 and may reach anything up to the top
/// of RAM. Registers, stack and display live outside this space, so all of
/// it is addressable by ordinary loads and stores.
#[derive(Debug)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// fresh memory: font baked in at the bottom, everything else zeroed
    pub fn new() -> Self {
        let mut m = Memory {
            bytes: Box::new([0u8; MEMORY_SIZE]),
        };
        // the write can't fail: the font fits under PROGRAM_ADDR
        m.write(&FONT, FONT_ADDR);
        m
    }

    /// load a ROM at 0x200, validating its size against the program area
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, LoadError> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len == 0 || len > MAX_PROGRAM_SIZE {
            return Err(LoadError::BadSize(len));
        }
        self.write(&buf, PROGRAM_ADDR);
        Ok(len)
    }

    /// one byte, or None past the top of RAM
    pub fn read_byte(&self, addr: u16) -> Option<u8> {
        self.bytes.get(addr as usize).copied()
    }

    /// big-endian instruction word at addr
    pub fn read_word(&self, addr: u16) -> Option<u16> {
        let hi = self.read_byte(addr)?;
        let lo = self.read_byte(addr.checked_add(1)?)?;
        Some(((hi as u16) << 8) | lo as u16)
    }

    /// r/o window onto memory, or None if it leaves the address space
    pub fn slice(&self, addr: u16, len: usize) -> Option<&[u8]> {
        let a = addr as usize;
        self.bytes.get(a..a.checked_add(len)?)
    }

    /// r/w window onto memory, or None if it leaves the address space
    pub fn slice_mut(&mut self, addr: u16, len: usize) -> Option<&mut [u8]> {
        let a = addr as usize;
        self.bytes.get_mut(a..a.checked_add(len)?)
    }

    /// copy a chunk of bytes into memory at addr; None means it didn't fit
    pub fn write(&mut self, data: &[u8], addr: u16) -> Option<()> {
        self.slice_mut(addr, data.len())?.copy_from_slice(data);
        Some(())
    }
}

/// 16 hex digit glyphs, 8x5 pixels each packed into 5 bytes
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
