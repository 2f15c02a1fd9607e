use std::fmt;

/// a raw 16-bit instruction word, big-endian as fetched from memory. Field
/// extraction here is total; whether the word names a real instruction is
/// [`Instruction::decode`]'s problem.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn word(self) -> u16 {
        self.0
    }

    /// high nibble, selects the operation family
    pub fn family(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// first register index
    pub fn x(self) -> u8 {
        ((self.0 & 0x0f00) >> 8) as u8
    }

    /// second register index
    pub fn y(self) -> u8 {
        ((self.0 & 0x00f0) >> 4) as u8
    }

    /// low nibble: sprite height, or a sub-opcode within family 8
    pub fn n(self) -> u8 {
        (self.0 & 0x000f) as u8
    }

    /// 8-bit immediate
    pub fn kk(self) -> u8 {
        (self.0 & 0x00ff) as u8
    }

    /// 12-bit address immediate
    pub fn nnn(self) -> u16 {
        self.0 & 0x0fff
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({:#06x})", self.0)
    }
}

/// the decoded instruction set. Register indices are nibbles carried as u8;
/// the dispatcher widens them when it indexes the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0: clear the display
    Cls,
    /// 00EE: return from subroutine
    Ret,
    /// 1nnn: jump
    Jp(u16),
    /// 2nnn: call subroutine
    Call(u16),
    /// 3xkk: skip next if Vx == kk
    SeByte(u8, u8),
    /// 4xkk: skip next if Vx != kk
    SneByte(u8, u8),
    /// 5xy0: skip next if Vx == Vy
    SeReg(u8, u8),
    /// 6xkk: Vx = kk
    LdByte(u8, u8),
    /// 7xkk: Vx += kk, no carry flag
    AddByte(u8, u8),
    /// 8xy0: Vx = Vy
    LdReg(u8, u8),
    /// 8xy1: Vx |= Vy
    Or(u8, u8),
    /// 8xy2: Vx &= Vy
    And(u8, u8),
    /// 8xy3: Vx ^= Vy
    Xor(u8, u8),
    /// 8xy4: Vx += Vy, VF = carry
    AddReg(u8, u8),
    /// 8xy5: Vx -= Vy, VF = no borrow
    Sub(u8, u8),
    /// 8xy6: Vx >>= 1, VF = shifted-out bit
    Shr(u8),
    /// 8xy7: Vx = Vy - Vx, VF = no borrow
    Subn(u8, u8),
    /// 8xyE: Vx <<= 1, VF = shifted-out bit
    Shl(u8),
    /// 9xy0: skip next if Vx != Vy
    SneReg(u8, u8),
    /// Annn: I = nnn
    LdI(u16),
    /// Bnnn: jump to nnn + V0
    JpV0(u16),
    /// Cxkk: Vx = random byte & kk
    Rnd(u8, u8),
    /// Dxyn: draw n-row sprite from I at (Vx, Vy), VF = collision
    Drw(u8, u8, u8),
    /// Ex9E: skip next if key Vx is down
    Skp(u8),
    /// ExA1: skip next if key Vx is up
    Sknp(u8),
    /// Fx07: Vx = delay timer
    LdRegDt(u8),
    /// Fx0A: Vx = last pressed key, if any
    LdKey(u8),
    /// Fx15: delay timer = Vx
    LdDtReg(u8),
    /// Fx18: sound timer = Vx
    LdStReg(u8),
    /// Fx1E: I += Vx
    AddI(u8),
    /// Fx29: I = font glyph address for digit Vx
    LdFont(u8),
    /// Fx33: BCD of Vx into memory at I
    LdBcd(u8),
    /// Fx55: copy V0..Vx into memory at I
    StoreRegs(u8),
    /// Fx65: copy memory at I into V0..Vx
    LoadRegs(u8),
}

impl Instruction {
    /// map a raw word onto the instruction set. `None` means the word is not
    /// a CHIP-8 instruction, which the interpreter treats as fatal.
    pub fn decode(op: Opcode) -> Option<Instruction> {
        let instruction = match op.family() {
            0x0 => match op.word() {
                // machine-code calls into the host (0nnn) are not supported
                0x00e0 => Instruction::Cls,
                0x00ee => Instruction::Ret,
                _ => return None,
            },
            0x1 => Instruction::Jp(op.nnn()),
            0x2 => Instruction::Call(op.nnn()),
            0x3 => Instruction::SeByte(op.x(), op.kk()),
            0x4 => Instruction::SneByte(op.x(), op.kk()),
            // families 5 and 9 dispatch on the high nibble alone; the low
            // nibble is not significant
            0x5 => Instruction::SeReg(op.x(), op.y()),
            0x6 => Instruction::LdByte(op.x(), op.kk()),
            0x7 => Instruction::AddByte(op.x(), op.kk()),
            0x8 => match op.n() {
                0x0 => Instruction::LdReg(op.x(), op.y()),
                0x1 => Instruction::Or(op.x(), op.y()),
                0x2 => Instruction::And(op.x(), op.y()),
                0x3 => Instruction::Xor(op.x(), op.y()),
                0x4 => Instruction::AddReg(op.x(), op.y()),
                0x5 => Instruction::Sub(op.x(), op.y()),
                0x6 => Instruction::Shr(op.x()),
                0x7 => Instruction::Subn(op.x(), op.y()),
                0xe => Instruction::Shl(op.x()),
                _ => return None,
            },
            0x9 => Instruction::SneReg(op.x(), op.y()),
            0xa => Instruction::LdI(op.nnn()),
            0xb => Instruction::JpV0(op.nnn()),
            0xc => Instruction::Rnd(op.x(), op.kk()),
            0xd => Instruction::Drw(op.x(), op.y(), op.n()),
            0xe => match op.kk() {
                0x9e => Instruction::Skp(op.x()),
                0xa1 => Instruction::Sknp(op.x()),
                _ => return None,
            },
            0xf => match op.kk() {
                0x07 => Instruction::LdRegDt(op.x()),
                0x0a => Instruction::LdKey(op.x()),
                0x15 => Instruction::LdDtReg(op.x()),
                0x18 => Instruction::LdStReg(op.x()),
                0x1e => Instruction::AddI(op.x()),
                0x29 => Instruction::LdFont(op.x()),
                0x33 => Instruction::LdBcd(op.x()),
                0x55 => Instruction::StoreRegs(op.x()),
                0x65 => Instruction::LoadRegs(op.x()),
                _ => return None,
            },
            _ => return None,
        };
        Some(instruction)
    }

    /// conventional assembler name, for the debug log
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Cls => "CLS",
            Instruction::Ret => "RET",
            Instruction::Jp(_) => "JP addr",
            Instruction::Call(_) => "CALL addr",
            Instruction::SeByte(..) => "SE Vx, byte",
            Instruction::SneByte(..) => "SNE Vx, byte",
            Instruction::SeReg(..) => "SE Vx, Vy",
            Instruction::LdByte(..) => "LD Vx, byte",
            Instruction::AddByte(..) => "ADD Vx, byte",
            Instruction::LdReg(..) => "LD Vx, Vy",
            Instruction::Or(..) => "OR Vx, Vy",
            Instruction::And(..) => "AND Vx, Vy",
            Instruction::Xor(..) => "XOR Vx, Vy",
            Instruction::AddReg(..) => "ADD Vx, Vy",
            Instruction::Sub(..) => "SUB Vx, Vy",
            Instruction::Shr(_) => "SHR Vx {, Vy}",
            Instruction::Subn(..) => "SUBN Vx, Vy",
            Instruction::Shl(_) => "SHL Vx {, Vy}",
            Instruction::SneReg(..) => "SNE Vx, Vy",
            Instruction::LdI(_) => "LD I, addr",
            Instruction::JpV0(_) => "JP V0, addr",
            Instruction::Rnd(..) => "RND Vx, byte",
            Instruction::Drw(..) => "DRW Vx, Vy, nibble",
            Instruction::Skp(_) => "SKP Vx",
            Instruction::Sknp(_) => "SKNP Vx",
            Instruction::LdRegDt(_) => "LD Vx, DT",
            Instruction::LdKey(_) => "LD Vx, K",
            Instruction::LdDtReg(_) => "LD DT, Vx",
            Instruction::LdStReg(_) => "LD ST, Vx",
            Instruction::AddI(_) => "ADD I, Vx",
            Instruction::LdFont(_) => "LD F, Vx",
            Instruction::LdBcd(_) => "LD B, Vx",
            Instruction::StoreRegs(_) => "LD [I], Vx",
            Instruction::LoadRegs(_) => "LD Vx, [I]",
        }
    }
}
