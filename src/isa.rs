//! Instruction encoding for the LC3.

use std::fmt;

/// Instruction class, held in the top 4 bits of every instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Br,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    /// Return from interrupt. Interrupts are not modelled, so this always faults.
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    /// Unused encoding. Always faults.
    Reserved,
    Lea,
    Trap,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::Br,       // 0x0
        Opcode::Add,      // 0x1
        Opcode::Ld,       // 0x2
        Opcode::St,       // 0x3
        Opcode::Jsr,      // 0x4
        Opcode::And,      // 0x5
        Opcode::Ldr,      // 0x6
        Opcode::Str,      // 0x7
        Opcode::Rti,      // 0x8
        Opcode::Not,      // 0x9
        Opcode::Ldi,      // 0xA
        Opcode::Sti,      // 0xB
        Opcode::Jmp,      // 0xC
        Opcode::Reserved, // 0xD
        Opcode::Lea,      // 0xE
        Opcode::Trap,     // 0xF
    ];

    /// Decode the opcode of an instruction word.
    #[inline]
    pub fn decode(instr: u16) -> Opcode {
        Self::TABLE[(instr >> 12) as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Br => "BR",
            Opcode::Add => "ADD",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Jsr => "JSR",
            Opcode::And => "AND",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::Rti => "RTI",
            Opcode::Not => "NOT",
            Opcode::Ldi => "LDI",
            Opcode::Sti => "STI",
            Opcode::Jmp => "JMP",
            Opcode::Reserved => "RESERVED",
            Opcode::Lea => "LEA",
            Opcode::Trap => "TRAP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Sign-extend the lowest `bits` bits of `val` to 16 bits.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    // Sign bit
    let sign = val & (1u16 << (bits - 1));
    // Bits lower than sign bit
    let magnitude = val & ((1u16 << bits) - 1);
    // Positive input: all bits unset; 0x0000
    // Negative input: sign bit and above will be set, lower bits will be reset
    //      Eg. bits=5 -> 0xFFF0
    let sign_extension = (!sign).wrapping_add(1); // sign * -1
    magnitude | sign_extension
}

/// A raw instruction word, with accessors for each operand field.
///
/// Accessors do not check that the field is meaningful for the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction(pub u16);

impl Instruction {
    #[inline]
    pub fn opcode(self) -> Opcode {
        Opcode::decode(self.0)
    }

    /// Bits 11..9: destination register, or source register for stores.
    #[inline]
    pub fn dr(self) -> u16 {
        (self.0 >> 9) & 0b111
    }

    /// Bits 8..6: first source register, or base register.
    #[inline]
    pub fn sr1(self) -> u16 {
        (self.0 >> 6) & 0b111
    }

    /// Bits 2..0: second source register.
    #[inline]
    pub fn sr2(self) -> u16 {
        self.0 & 0b111
    }

    /// Bit 5: ADD/AND take `imm5` rather than `sr2`.
    #[inline]
    pub fn is_immediate(self) -> bool {
        self.0 & 0b10_0000 != 0
    }

    /// Bit 11: JSR takes `pc_offset11` rather than a base register.
    #[inline]
    pub fn is_long(self) -> bool {
        self.0 & 0x0800 != 0
    }

    /// Bits 11..9 of a BR instruction, laid out as `nzp`.
    #[inline]
    pub fn condition_mask(self) -> u16 {
        (self.0 >> 9) & 0b111
    }

    #[inline]
    pub fn imm5(self) -> u16 {
        sign_extend(self.0, 5)
    }

    #[inline]
    pub fn offset6(self) -> u16 {
        sign_extend(self.0, 6)
    }

    #[inline]
    pub fn pc_offset9(self) -> u16 {
        sign_extend(self.0, 9)
    }

    #[inline]
    pub fn pc_offset11(self) -> u16 {
        sign_extend(self.0, 11)
    }

    #[inline]
    pub fn trap_vector(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        let signed = |val: u16| val as i16;
        match op {
            Opcode::Br => {
                let mask = self.condition_mask();
                if mask == 0 {
                    return write!(f, "NOP");
                }
                write!(f, "BR")?;
                for (bit, name) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if mask & bit != 0 {
                        write!(f, "{}", name)?;
                    }
                }
                write!(f, " #{}", signed(self.pc_offset9()))
            }
            Opcode::Add | Opcode::And => {
                write!(f, "{} R{}, R{}, ", op, self.dr(), self.sr1())?;
                if self.is_immediate() {
                    write!(f, "#{}", signed(self.imm5()))
                } else {
                    write!(f, "R{}", self.sr2())
                }
            }
            Opcode::Not => write!(f, "NOT R{}, R{}", self.dr(), self.sr1()),
            Opcode::Ld | Opcode::Ldi | Opcode::Lea | Opcode::St | Opcode::Sti => {
                write!(f, "{} R{}, #{}", op, self.dr(), signed(self.pc_offset9()))
            }
            Opcode::Ldr | Opcode::Str => write!(
                f,
                "{} R{}, R{}, #{}",
                op,
                self.dr(),
                self.sr1(),
                signed(self.offset6())
            ),
            Opcode::Jsr => {
                if self.is_long() {
                    write!(f, "JSR #{}", signed(self.pc_offset11()))
                } else {
                    write!(f, "JSRR R{}", self.sr1())
                }
            }
            Opcode::Jmp if self.sr1() == 7 => write!(f, "RET"),
            Opcode::Jmp => write!(f, "JMP R{}", self.sr1()),
            Opcode::Trap => match TrapVector::from_vector(self.trap_vector()) {
                Some(trap) => write!(f, "{}", trap),
                None => write!(f, "TRAP x{:02X}", self.trap_vector()),
            },
            Opcode::Rti | Opcode::Reserved => write!(f, "{} (x{:04X})", op, self.0),
        }
    }
}

/// Trap service routines provided by the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVector {
    /// Read a character without echo.
    Getc = 0x20,
    /// Write a character.
    Out = 0x21,
    /// Write a string of one character per word.
    Puts = 0x22,
    /// Prompt for a character and echo it.
    In = 0x23,
    /// Write a string of two characters per word.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TrapVector {
    pub fn from_vector(vector: u8) -> Option<TrapVector> {
        let trap = match vector {
            0x20 => TrapVector::Getc,
            0x21 => TrapVector::Out,
            0x22 => TrapVector::Puts,
            0x23 => TrapVector::In,
            0x24 => TrapVector::Putsp,
            0x25 => TrapVector::Halt,
            _ => return None,
        };
        Some(trap)
    }
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extend_positive_is_unchanged() {
        for bits in [5, 6, 9, 11] {
            let max = (1u16 << (bits - 1)) - 1;
            for val in [0, 1, max / 2, max] {
                assert_eq!(sign_extend(val, bits), val, "sign_extend(0x{val:04x}, {bits})");
            }
        }
    }

    #[test]
    fn sign_extend_negative() {
        #[rustfmt::skip]
        let cases: &[(u16, u32, i16)] = &[
            // (input, bits, expected)
            (0b1_1111, 5, -1),
            (0b1_0000, 5, -16),
            (0b1_1011, 5, -5),
            (0b11_1111, 6, -1),
            (0b10_0000, 6, -32),
            (0x1FF, 9, -1),
            (0x100, 9, -256),
            (0x1F7, 9, -9),
            (0x7FF, 11, -1),
            (0x400, 11, -1024),
        ];
        for &(input, bits, expected) in cases {
            let actual = sign_extend(input, bits);
            assert_eq!(
                actual as i16, expected,
                "sign_extend(0x{input:04x}, {bits}) == 0x{actual:04x}"
            );
        }
    }

    #[test]
    fn sign_extend_ignores_higher_bits() {
        // Opcode and register fields above the immediate must not leak in
        assert_eq!(sign_extend(0x1025, 5), 0x0005);
        assert_eq!(sign_extend(0xF03F, 5), 0xFFFF);
        assert_eq!(sign_extend(0x0E09, 9), 0x0009);
    }

    #[test]
    fn sign_extend_is_idempotent() {
        for bits in [5, 6, 9, 11] {
            for raw in 0..(1u16 << bits) {
                let once = sign_extend(raw, bits);
                assert_eq!(sign_extend(once, bits), once);
            }
        }
    }

    #[test]
    fn decodes_every_opcode() {
        let expected = [
            Opcode::Br,
            Opcode::Add,
            Opcode::Ld,
            Opcode::St,
            Opcode::Jsr,
            Opcode::And,
            Opcode::Ldr,
            Opcode::Str,
            Opcode::Rti,
            Opcode::Not,
            Opcode::Ldi,
            Opcode::Sti,
            Opcode::Jmp,
            Opcode::Reserved,
            Opcode::Lea,
            Opcode::Trap,
        ];
        for (nibble, opcode) in expected.into_iter().enumerate() {
            let instr = ((nibble as u16) << 12) | 0x0ABC;
            assert_eq!(Opcode::decode(instr), opcode);
        }
    }

    #[test]
    fn operand_fields() {
        // ADD R3, R5, #-3
        let instr = Instruction(0b0001_011_101_1_11101);
        assert_eq!(instr.opcode(), Opcode::Add);
        assert_eq!(instr.dr(), 3);
        assert_eq!(instr.sr1(), 5);
        assert!(instr.is_immediate());
        assert_eq!(instr.imm5() as i16, -3);

        // JSR #-1
        let instr = Instruction(0x4FFF);
        assert!(instr.is_long());
        assert_eq!(instr.pc_offset11(), 0xFFFF);
    }

    #[test]
    fn disassembly() {
        assert_eq!(Instruction(0x1025).to_string(), "ADD R0, R0, #5");
        assert_eq!(Instruction(0x5020).to_string(), "AND R0, R0, #0");
        assert_eq!(Instruction(0x1242).to_string(), "ADD R1, R1, R2");
        assert_eq!(Instruction(0x0FFE).to_string(), "BRnzp #-2");
        assert_eq!(Instruction(0x0000).to_string(), "NOP");
        assert_eq!(Instruction(0xA009).to_string(), "LDI R0, #9");
        assert_eq!(Instruction(0xC1C0).to_string(), "RET");
        assert_eq!(Instruction(0x4080).to_string(), "JSRR R2");
        assert_eq!(Instruction(0xF025).to_string(), "HALT");
        assert_eq!(Instruction(0xF0FF).to_string(), "TRAP xFF");
        assert_eq!(Instruction(0xD000).to_string(), "RESERVED (xD000)");
    }
}
