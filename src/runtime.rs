use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use log::{debug, trace, warn};

use crate::console::{Console, Input, EOF_SENTINEL};
use crate::isa::{Instruction, Opcode, TrapVector};
use crate::loader::{self, LoadError};
use crate::memory::{Memory, KBDR, KBSR, KBSR_READY};

/// Program counter value of a freshly constructed machine.
pub const PC_START: u16 = 0x3000;

/// Instructions executed between checks of [`Console::poll_interrupt`].
const INTERRUPT_INTERVAL: u32 = 0x1000;

/// Complete machine state, plus the console it talks to.
pub struct Machine<C> {
    /// System memory - 128KB in size.
    mem: Memory,
    /// Program counter
    pc: u16,
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Condition code
    flag: Condition,
    /// Cleared by `HALT`
    running: bool,
    console: C,
}

/// Condition code. Exactly one is set at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl Condition {
    /// Condition code describing `val`.
    pub fn of(val: u16) -> Condition {
        match (val as i16).cmp(&0) {
            Ordering::Less => Condition::N,
            Ordering::Equal => Condition::Z,
            Ordering::Greater => Condition::P,
        }
    }
}

/// Reason the machine stopped without halting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `RTI` or the reserved opcode was fetched.
    IllegalOpcode {
        opcode: Opcode,
        instruction: u16,
        /// Address the instruction was fetched from.
        address: u16,
    },
    /// Console reported an interrupt while waiting for input.
    Interrupted,
}

impl std::error::Error for Fault {}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalOpcode {
                opcode,
                instruction,
                address,
            } => write!(
                f,
                "illegal opcode {} (x{:04X}) at address x{:04X}",
                opcode, instruction, address
            ),
            Self::Interrupted => write!(f, "interrupted while waiting for input"),
        }
    }
}

impl<C> Machine<C> {
    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn reg(&self, reg: u16) -> u16 {
        self.reg[(reg & 0b111) as usize]
    }

    pub fn set_reg(&mut self, reg: u16, val: u16) {
        self.reg[(reg & 0b111) as usize] = val;
    }

    pub fn registers(&self) -> &[u16; 8] {
        &self.reg
    }

    pub fn flag(&self) -> Condition {
        self.flag
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }
}

impl<C: Console> Machine<C> {
    pub fn new(console: C) -> Self {
        Self::with_memory(Memory::new(), console)
    }

    /// Machine with images already loaded into `mem`.
    pub fn with_memory(mem: Memory, console: C) -> Self {
        Machine {
            mem,
            pc: PC_START,
            reg: [0; 8],
            flag: Condition::Z,
            running: true,
            console,
        }
    }

    /// Load an image file into memory. Registers are left alone.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        loader::load(&mut self.mem, path)
    }

    /// Load an image from a byte buffer. Registers are left alone.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        loader::load_bytes(&mut self.mem, bytes)
    }

    /// Run until `HALT`, or until a fault stops the machine.
    pub fn run(&mut self) -> Result<(), Fault> {
        debug!("running from 0x{:04x}", self.pc);
        let mut until_check = INTERRUPT_INTERVAL;
        while self.running {
            self.step()?;
            until_check -= 1;
            if until_check == 0 {
                until_check = INTERRUPT_INTERVAL;
                if self.console.poll_interrupt() {
                    debug!("interrupted at 0x{:04x}", self.pc);
                    return Err(Fault::Interrupted);
                }
            }
        }
        Ok(())
    }

    /// Fetch, decode and execute one instruction.
    pub fn step(&mut self) -> Result<(), Fault> {
        let address = self.pc;
        let instr = Instruction(self.mem_read(address)?);
        // PC incremented before instruction is performed
        self.pc = self.pc.wrapping_add(1);
        trace!("{:04x}: {:04x}  {}", address, instr.0, instr);

        match instr.opcode() {
            Opcode::Br => self.br(instr),
            Opcode::Add => self.add(instr),
            Opcode::Ld => self.ld(instr)?,
            Opcode::St => self.st(instr),
            Opcode::Jsr => self.jsr(instr),
            Opcode::And => self.and(instr),
            Opcode::Ldr => self.ldr(instr)?,
            Opcode::Str => self.str(instr),
            Opcode::Not => self.not(instr),
            Opcode::Ldi => self.ldi(instr)?,
            Opcode::Sti => self.sti(instr)?,
            Opcode::Jmp => self.jmp(instr),
            Opcode::Lea => self.lea(instr),
            Opcode::Trap => self.trap(instr)?,
            opcode @ (Opcode::Rti | Opcode::Reserved) => {
                return Err(Fault::IllegalOpcode {
                    opcode,
                    instruction: instr.0,
                    address,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn reg_mut(&mut self, reg: u16) -> &mut u16 {
        &mut self.reg[(reg & 0b111) as usize]
    }

    /// Read memory, refreshing the keyboard registers first if `addr` is [`KBSR`].
    fn mem_read(&mut self, addr: u16) -> Result<u16, Fault> {
        if addr == KBSR {
            self.poll_keyboard()?;
        }
        Ok(self.mem.read(addr))
    }

    fn poll_keyboard(&mut self) -> Result<(), Fault> {
        if self.console.poll_input_ready() {
            let ch = self.read_input()?;
            self.mem.write(KBSR, KBSR_READY);
            self.mem.write(KBDR, ch);
        } else {
            self.mem.write(KBSR, 0);
        }
        Ok(())
    }

    fn read_input(&mut self) -> Result<u16, Fault> {
        match self.console.read_char() {
            Input::Char(ch) => Ok(ch as u16),
            Input::EndOfInput => Ok(EOF_SENTINEL),
            Input::Interrupted => Err(Fault::Interrupted),
        }
    }

    #[inline]
    fn set_flags(&mut self, val: u16) {
        self.flag = Condition::of(val);
    }

    /// Write `val` to `dr` and update condition code.
    #[inline]
    fn set_result(&mut self, dr: u16, val: u16) {
        *self.reg_mut(dr) = val;
        self.set_flags(val);
    }

    fn add(&mut self, instr: Instruction) {
        let val1 = self.reg(instr.sr1());
        let val2 = if instr.is_immediate() {
            instr.imm5()
        } else {
            self.reg(instr.sr2())
        };
        self.set_result(instr.dr(), val1.wrapping_add(val2));
    }

    fn and(&mut self, instr: Instruction) {
        let val1 = self.reg(instr.sr1());
        let val2 = if instr.is_immediate() {
            instr.imm5()
        } else {
            self.reg(instr.sr2())
        };
        self.set_result(instr.dr(), val1 & val2);
    }

    fn not(&mut self, instr: Instruction) {
        let val = !self.reg(instr.sr1());
        self.set_result(instr.dr(), val);
    }

    fn br(&mut self, instr: Instruction) {
        if self.flag as u16 & instr.condition_mask() != 0 {
            self.pc = self.pc.wrapping_add(instr.pc_offset9());
        }
    }

    fn jmp(&mut self, instr: Instruction) {
        self.pc = self.reg(instr.sr1());
    }

    fn jsr(&mut self, instr: Instruction) {
        let ret = self.pc;
        self.pc = if instr.is_long() {
            self.pc.wrapping_add(instr.pc_offset11())
        } else {
            // Read base before R7 is overwritten, for `JSRR R7`
            self.reg(instr.sr1())
        };
        *self.reg_mut(7) = ret;
    }

    fn ld(&mut self, instr: Instruction) -> Result<(), Fault> {
        let val = self.mem_read(self.pc.wrapping_add(instr.pc_offset9()))?;
        self.set_result(instr.dr(), val);
        Ok(())
    }

    fn ldi(&mut self, instr: Instruction) -> Result<(), Fault> {
        let ptr = self.mem_read(self.pc.wrapping_add(instr.pc_offset9()))?;
        let val = self.mem_read(ptr)?;
        self.set_result(instr.dr(), val);
        Ok(())
    }

    fn ldr(&mut self, instr: Instruction) -> Result<(), Fault> {
        let base = self.reg(instr.sr1());
        let val = self.mem_read(base.wrapping_add(instr.offset6()))?;
        self.set_result(instr.dr(), val);
        Ok(())
    }

    fn lea(&mut self, instr: Instruction) {
        let val = self.pc.wrapping_add(instr.pc_offset9());
        self.set_result(instr.dr(), val);
    }

    fn st(&mut self, instr: Instruction) {
        let val = self.reg(instr.dr());
        self.mem.write(self.pc.wrapping_add(instr.pc_offset9()), val);
    }

    fn sti(&mut self, instr: Instruction) -> Result<(), Fault> {
        let val = self.reg(instr.dr());
        let ptr = self.mem_read(self.pc.wrapping_add(instr.pc_offset9()))?;
        self.mem.write(ptr, val);
        Ok(())
    }

    fn str(&mut self, instr: Instruction) {
        let val = self.reg(instr.dr());
        let base = self.reg(instr.sr1());
        self.mem.write(base.wrapping_add(instr.offset6()), val);
    }

    fn trap(&mut self, instr: Instruction) -> Result<(), Fault> {
        let Some(trap) = TrapVector::from_vector(instr.trap_vector()) else {
            warn!(
                "ignoring unknown trap vector x{:02X} at x{:04X}",
                instr.trap_vector(),
                self.pc.wrapping_sub(1)
            );
            return Ok(());
        };

        match trap {
            TrapVector::Getc => {
                *self.reg_mut(0) = self.read_input()?;
            }
            TrapVector::Out => {
                let ch = (self.reg(0) & 0xFF) as u8;
                self.console.write_char(ch);
                self.console.flush();
            }
            TrapVector::Puts => {
                let start = self.reg(0);
                for offset in 0..=u16::MAX {
                    let word = self.mem_read(start.wrapping_add(offset))?;
                    if word == 0 {
                        break;
                    }
                    self.console.write_char((word & 0xFF) as u8);
                }
                self.console.flush();
            }
            TrapVector::In => {
                self.console.write_str("Enter a character: ");
                self.console.flush();
                let ch = self.read_input()?;
                if ch != EOF_SENTINEL {
                    self.console.write_char((ch & 0xFF) as u8);
                }
                self.console.flush();
                *self.reg_mut(0) = ch;
            }
            TrapVector::Putsp => {
                let start = self.reg(0);
                for offset in 0..=u16::MAX {
                    let word = self.mem_read(start.wrapping_add(offset))?;
                    if word == 0 {
                        break;
                    }
                    self.console.write_char((word & 0xFF) as u8);
                    // Zero high byte pads an odd-length string
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        self.console.write_char(high);
                    }
                }
                self.console.flush();
            }
            TrapVector::Halt => {
                self.console.write_str("HALT\n");
                self.console.flush();
                self.running = false;
                debug!("halted at 0x{:04x}", self.pc.wrapping_sub(1));
            }
        }
        Ok(())
    }
}
