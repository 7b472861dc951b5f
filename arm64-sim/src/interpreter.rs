//! The functional emulator: fetch, decode, execute, advance.
//!
//! Shaped after `fuel-vm::interpreter::Interpreter::execute` — a `step()`
//! that retires exactly one instruction and a `run()` that drives it to
//! completion or a fatal error — generalized from FuelVM's single ISA to
//! AArch64's wider instruction set. Unlike
//! [`crate::timing::pipeline::Pipeline`], this loop has no notion of
//! cycles: every instruction costs the same "one step", and ALU/address/
//! branch semantics are delegated to [`crate::exec`] so the two consumers
//! never drift apart.

use arm64_asm::{decode, Format, Instruction, Op};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{self, AddressResult, AluInputs, BranchOutcome};
use crate::memory::Memory;
use crate::registers::RegisterFile;
use crate::syscall::Syscalls;

/// What one `step()` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The guest retired an instruction and PC advanced (or branched).
    Continued,
    /// `exit`/`exit_group` retired; the guest requested to stop.
    Exited(i64),
}

/// Owns all guest-visible state for a functional (non-timed) run:
/// registers, memory, and the syscall layer.
pub struct Interpreter {
    pub registers: RegisterFile,
    pub memory: Memory,
    pub syscalls: Syscalls,
    config: Config,
    instructions_retired: u64,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(),
            syscalls: Syscalls::new(&config),
            config,
            instructions_retired: 0,
        }
    }

    pub fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    /// Reset architectural state for a fresh run with the same loaded
    /// memory image: registers, syscall-layer state (FD table, mmap
    /// regions, program break), and the retired-instruction counter all
    /// go back to their
    /// initial values. Memory contents are left untouched; callers that
    /// want a clean guest image should reload segments after `reset`.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::new();
        self.syscalls.reset(&self.config);
        self.instructions_retired = 0;
    }

    /// Fetch, decode, and execute exactly one instruction.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let pc = self.registers.pc;
        let word = self.memory.read_u32(pc);
        let instr = decode(word);

        if instr.is_unknown() {
            return Err(Error::DecodeFailure { pc });
        }

        tracing::trace!(pc, word, op = %instr.op, "step");

        let mut next_pc = pc.wrapping_add(Instruction::SIZE as u64);
        let mut outcome = StepOutcome::Continued;

        if exec::is_branch_format(instr.format) {
            let rn = self.registers.read_or_zero(instr.rn);
            match exec::evaluate_branch(&instr, rn, self.registers.nzcv, pc) {
                BranchOutcome::Taken { target, link } => {
                    if link {
                        self.registers.write_or_drop(30, next_pc);
                    }
                    next_pc = target;
                }
                BranchOutcome::NotTaken => {}
            }
        } else {
            match instr.format {
                Format::Exception => match instr.op {
                    Op::Nop => {}
                    Op::Svc => {
                        let args = [
                            self.registers.read_or_zero(0),
                            self.registers.read_or_zero(1),
                            self.registers.read_or_zero(2),
                            self.registers.read_or_zero(3),
                            self.registers.read_or_zero(4),
                            self.registers.read_or_zero(5),
                        ];
                        let nr = self.registers.read_or_zero(8);
                        let result = self.syscalls.dispatch(nr, args, &mut self.memory);
                        self.registers.write_or_drop(0, result);
                        if let Some(code) = self.syscalls.exit_code() {
                            outcome = StepOutcome::Exited(code);
                        }
                    }
                    Op::Brk => {
                        return Err(Error::Trap { pc, immediate: instr.imm as u16 });
                    }
                    _ => {}
                },
                Format::LoadStore | Format::LoadStorePair | Format::LoadStoreLit => {
                    self.exec_load_store(&instr, pc);
                }
                Format::SIMDLoadStore => {
                    self.exec_simd_load_store(&instr, pc);
                }
                Format::SIMDReg => {
                    let vn = self.registers.read_vreg(instr.rn);
                    let vm = self.registers.read_vreg(instr.rm);
                    let result = exec::compute_simd(&instr, vn, vm);
                    self.registers.write_vreg(instr.rd, result);
                }
                _ => {
                    self.exec_alu(&instr, pc);
                }
            }
        }

        self.registers.pc = next_pc;
        self.instructions_retired += 1;

        if self.config.max_instructions != 0 && self.instructions_retired >= self.config.max_instructions {
            if matches!(outcome, StepOutcome::Continued) {
                return Err(Error::InstructionLimitExceeded { limit: self.config.max_instructions });
            }
        }

        Ok(outcome)
    }

    fn exec_alu(&mut self, instr: &Instruction, pc: u64) {
        let rn = self.registers.read_or_zero(instr.rn);
        let rm = self.registers.read_or_zero(instr.rm);
        let ra = if instr.format == Format::DataProc3Src {
            self.registers.read_or_zero(instr.rt2)
        } else {
            0
        };
        let rd_old = self.registers.read_or_zero(instr.rd);

        let inputs = AluInputs {
            rn,
            rm,
            ra,
            rd_old,
            flags_in: self.registers.nzcv,
            pc,
        };
        let output = exec::compute_alu(instr, inputs);

        if instr.set_flags || exec::always_sets_flags(instr) {
            self.registers.nzcv = output.flags;
        }
        if instr.format != Format::CondCmp {
            self.registers.write_or_drop(instr.rd, output.value);
        }
    }

    fn exec_load_store(&mut self, instr: &Instruction, pc: u64) {
        let base = self.registers.read_or_sp(instr.rn);
        let rm_value = self.registers.read_or_zero(instr.rm);
        let AddressResult { address, writeback } = exec::compute_address(instr, base, rm_value, pc);

        match instr.op {
            Op::Ldp => {
                let bytes = exec::mem_bytes(instr.op, instr.is64);
                let stride = bytes as u64;
                let v1 = self.load_sized(address, bytes, false, instr.is64);
                let v2 = self.load_sized(address + stride, bytes, false, instr.is64);
                self.registers.write_or_drop(instr.rd, v1);
                self.registers.write_or_drop(instr.rt2, v2);
            }
            Op::Stp => {
                let bytes = exec::mem_bytes(instr.op, instr.is64);
                let stride = bytes as u64;
                let v1 = self.registers.read_or_zero(instr.rd);
                let v2 = self.registers.read_or_zero(instr.rt2);
                self.store_sized(address, bytes, v1);
                self.store_sized(address + stride, bytes, v2);
            }
            Op::Str | Op::Strh | Op::Strb => {
                let bytes = exec::mem_bytes(instr.op, instr.is64);
                let value = self.registers.read_or_zero(instr.rd);
                self.store_sized(address, bytes, value);
            }
            _ => {
                let bytes = exec::mem_bytes(instr.op, instr.is64);
                let signed = exec::mem_is_signed(instr.op);
                let value = self.load_sized(address, bytes, signed, instr.is64);
                self.registers.write_or_drop(instr.rd, value);
            }
        }

        if let Some(value) = writeback {
            self.registers.write_or_sp(instr.rn, value);
        }
    }

    fn exec_simd_load_store(&mut self, instr: &Instruction, pc: u64) {
        let base = self.registers.read_or_sp(instr.rn);
        let rm_value = self.registers.read_or_zero(instr.rm);
        let AddressResult { address, writeback } = exec::compute_address(instr, base, rm_value, pc);

        match instr.op {
            Op::Strq => {
                let value = self.registers.read_vreg(instr.rd).to_u128();
                self.memory.write_u128(address, value);
            }
            _ => {
                let value = self.memory.read_u128(address);
                self.registers.write_vreg(instr.rd, crate::registers::VReg::from_u128(value));
            }
        }

        if let Some(value) = writeback {
            self.registers.write_or_sp(instr.rn, value);
        }
    }

    fn load_sized(&self, address: u64, bytes: u32, signed: bool, is64: bool) -> u64 {
        let raw = match bytes {
            1 => self.memory.read_u8(address) as u64,
            2 => self.memory.read_u16(address) as u64,
            4 => self.memory.read_u32(address) as u64,
            _ => self.memory.read_u64(address),
        };
        exec::extend_loaded(raw, bytes, signed, is64)
    }

    fn store_sized(&mut self, address: u64, bytes: u32, value: u64) {
        match bytes {
            1 => self.memory.write_u8(address, value as u8),
            2 => self.memory.write_u16(address, value as u16),
            4 => self.memory.write_u32(address, value as u32),
            _ => self.memory.write_u64(address, value),
        }
    }

    /// Run until `exit` retires or a fatal error occurs. Returns the
    /// guest's exit code.
    pub fn run(&mut self) -> Result<i64> {
        loop {
            match self.step()? {
                StepOutcome::Continued => {}
                StepOutcome::Exited(code) => return Ok(code),
            }
        }
    }
}
