//! The cycle-accurate wide-issue in-order pipeline.
//!
//! Shares the same fetch/decode/execute loop shape as
//! [`crate::interpreter::Interpreter`], widened to `issue_width` slots and
//! split into five classic stages. Every stage's in-flight state is a
//! single `Vec<Option<_>>` sized by `issue_width` rather than per-width
//! duplicate struct definitions. Each [`Pipeline::tick`]
//! processes stages in reverse pipeline order (WB, MEM, EX, ID, IF) so a
//! stage always reads the latch its producer left behind last cycle
//! before that latch is overwritten with this cycle's output, letting one
//! array serve as both "this stage's input" and "next stage's output".
//!
//! The pipeline borrows the architectural state rather than owning it,
//! so the same registers/memory/syscalls a
//! [`crate::interpreter::Interpreter`] would drive functionally can also be
//! driven cycle-by-cycle for timing.

use arm64_asm::{decode, Format, IndexMode, Instruction, Nzcv, Op};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{self, AddressResult, AluInputs, BranchOutcome};
use crate::memory::Memory;
use crate::registers::{RegisterFile, VReg};
use crate::syscall::Syscalls;
use crate::timing::cache::{Cache, CacheOutcome};
use crate::timing::latency::multi_cycle_latency;
use crate::timing::predictor::BranchPredictor;
use crate::timing::stats::Statistics;

/// Bound on fetch-stage unconditional-branch folding per slot per cycle,
/// so a guest `b .` (branch to self) infinite loop can't spin the
/// simulator's own fetch loop forever instead of just burning cycles.
const FOLD_LIMIT: u32 = 1024;

/// What one `tick()` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continued,
    Exited(i64),
}

#[derive(Debug, Clone, Copy)]
struct IfSlot {
    word: u32,
    pc: u64,
}

#[derive(Debug, Clone, Copy)]
struct IdSlot {
    instr: Instruction,
    pc: u64,
    predicted_taken: bool,
    predicted_target: u64,
}

#[derive(Debug, Clone, Copy)]
struct MemOp {
    address: u64,
    bytes: u32,
    signed: bool,
    is64: bool,
    is_store: bool,
    is_pair: bool,
    is_simd: bool,
    store_value: u64,
    store_value2: u128,
    dest: u8,
    dest2: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct ExSlot {
    gpr_write: Option<(u8, u64)>,
    gpr_write2: Option<(u8, u64)>,
    vreg_write: Option<(u8, VReg)>,
    addr_writeback: Option<(u8, u64)>,
    flags_out: Option<Nzcv>,
    mem: Option<MemOp>,
    svc: Option<(u64, [u64; 6])>,
}

#[derive(Debug, Clone, Copy, Default)]
struct MemWbSlot {
    gpr_write: Option<(u8, u64)>,
    gpr_write2: Option<(u8, u64)>,
    vreg_write: Option<(u8, VReg)>,
    addr_writeback: Option<(u8, u64)>,
    flags_out: Option<Nzcv>,
    exit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortClass {
    Memory,
    Branch,
}

/// Whether `format` may only appear once per issued bundle: the
/// structural limits are a single memory port and a single branch
/// resolved per cycle.
fn port_class(format: Format) -> Option<PortClass> {
    if matches!(
        format,
        Format::LoadStore | Format::LoadStorePair | Format::LoadStoreLit | Format::SIMDLoadStore
    ) {
        Some(PortClass::Memory)
    } else if exec::is_branch_format(format) {
        Some(PortClass::Branch)
    } else {
        None
    }
}

/// Five-stage, `issue_width`-wide in-order pipeline over borrowed
/// architectural state.
pub struct Pipeline<'a> {
    pub registers: &'a mut RegisterFile,
    pub memory: &'a mut Memory,
    pub syscalls: &'a mut Syscalls,
    config: Config,
    width: usize,

    icache: Option<Cache>,
    dcache: Option<Cache>,
    l2: Cache,
    predictor: BranchPredictor,
    stats: Statistics,

    fetch_pc: u64,
    halted: bool,
    halt_code: Option<i64>,
    stall_remaining: u32,

    if_latch: Vec<Option<IfSlot>>,
    id_latch: Vec<Option<IdSlot>>,
    ex_latch: Vec<Option<ExSlot>>,
    memwb_latch: Vec<Option<MemWbSlot>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(registers: &'a mut RegisterFile, memory: &'a mut Memory, syscalls: &'a mut Syscalls, config: Config) -> Self {
        let width = config.issue_width as usize;
        let fetch_pc = registers.pc;
        Self {
            registers,
            memory,
            syscalls,
            icache: config.enable_icache.then(|| Cache::new(config.l1i)),
            dcache: config.enable_dcache.then(|| Cache::new(config.l1d)),
            l2: Cache::new(config.l2),
            predictor: BranchPredictor::new(config.btb_entries),
            stats: Statistics::default(),
            fetch_pc,
            halted: false,
            halt_code: None,
            stall_remaining: 0,
            if_latch: vec![None; width],
            id_latch: vec![None; width],
            ex_latch: vec![None; width],
            memwb_latch: vec![None; width],
            config,
            width,
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Drop all in-flight latches, predictor/cache state, and counters,
    /// resuming fetch from the current architectural PC. Mirrors
    /// [`crate::interpreter::Interpreter::reset`], additionally clearing
    /// the timing-only state a functional reset has nothing to say about.
    pub fn reset(&mut self) {
        self.icache = self.config.enable_icache.then(|| Cache::new(self.config.l1i));
        self.dcache = self.config.enable_dcache.then(|| Cache::new(self.config.l1d));
        self.l2 = Cache::new(self.config.l2);
        self.predictor = BranchPredictor::new(self.config.btb_entries);
        self.stats = Statistics::default();
        self.fetch_pc = self.registers.pc;
        self.halted = false;
        self.halt_code = None;
        self.stall_remaining = 0;
        self.if_latch = vec![None; self.width];
        self.id_latch = vec![None; self.width];
        self.ex_latch = vec![None; self.width];
        self.memwb_latch = vec![None; self.width];
    }

    /// Advance the pipeline by exactly one cycle.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.halted {
            return Ok(TickOutcome::Exited(self.halt_code.unwrap_or(-1)));
        }

        self.stats.cycles += 1;
        if self.config.max_cycles != 0 && self.stats.cycles > self.config.max_cycles {
            return Err(Error::CycleLimitExceeded { limit: self.config.max_cycles });
        }

        if self.stall_remaining > 0 {
            self.stall_remaining -= 1;
            return Ok(TickOutcome::Continued);
        }

        if let Some(outcome) = self.run_wb()? {
            return Ok(outcome);
        }

        // MEM is about to drain `ex_latch` for this cycle's memory
        // accesses; snapshot it first so EX can still see last cycle's
        // loads for load-use hazard detection (`resolve_gpr`'s
        // `draining` parameter) after `run_mem` has already replaced it.
        let draining = self.ex_latch.clone();

        if self.run_mem() {
            // A cache miss occupied this tick; EX/ID/IF don't run.
            return Ok(TickOutcome::Continued);
        }

        let mispredicted = self.run_ex(&draining)?;
        if mispredicted {
            return Ok(TickOutcome::Continued);
        }

        self.run_id()?;
        let all_consumed = self.if_latch.iter().all(Option::is_none);
        self.run_if(all_consumed);

        Ok(TickOutcome::Continued)
    }

    /// Run to completion (exit or a fatal error). Returns the guest's
    /// exit code.
    pub fn run(&mut self) -> Result<i64> {
        loop {
            match self.tick()? {
                TickOutcome::Continued => {}
                TickOutcome::Exited(code) => return Ok(code),
            }
        }
    }

    fn run_wb(&mut self) -> Result<Option<TickOutcome>> {
        let inputs = std::mem::replace(&mut self.memwb_latch, vec![None; self.width]);
        for slot in inputs.into_iter().flatten() {
            if let Some((r, v)) = slot.gpr_write {
                self.registers.write_or_drop(r, v);
            }
            if let Some((r, v)) = slot.gpr_write2 {
                self.registers.write_or_drop(r, v);
            }
            if let Some((r, v)) = slot.vreg_write {
                self.registers.write_vreg(r, v);
            }
            if let Some((r, v)) = slot.addr_writeback {
                self.registers.write_or_sp(r, v);
            }
            if let Some(f) = slot.flags_out {
                self.registers.nzcv = f;
            }

            self.stats.instructions += 1;

            if let Some(code) = slot.exit {
                self.halted = true;
                self.halt_code = Some(code);
                return Ok(Some(TickOutcome::Exited(code)));
            }

            if self.config.max_instructions != 0 && self.stats.instructions >= self.config.max_instructions {
                return Err(Error::InstructionLimitExceeded { limit: self.config.max_instructions });
            }
        }
        Ok(None)
    }

    /// Runs MEM, performing the real memory access/syscall dispatch for
    /// whatever EX produced last cycle. Returns `true` if a cache miss
    /// means the pipeline should do nothing else this tick, having
    /// already scheduled `stall_remaining`.
    fn run_mem(&mut self) -> bool {
        let inputs = std::mem::replace(&mut self.ex_latch, vec![None; self.width]);
        let mut stalled = false;

        for slot in inputs.into_iter() {
            let Some(ex) = slot else { continue };

            let mut wb = MemWbSlot {
                gpr_write: ex.gpr_write,
                gpr_write2: ex.gpr_write2,
                vreg_write: ex.vreg_write,
                addr_writeback: ex.addr_writeback,
                flags_out: ex.flags_out,
                exit: None,
            };

            if let Some(mem) = ex.mem {
                let latency = self.access_data_cache(mem.address);
                if latency > 1 {
                    self.stats.mem_stalls += 1;
                    self.stall_remaining = self.stall_remaining.max(latency - 1);
                    stalled = true;
                }

                if mem.is_simd {
                    if mem.is_store {
                        self.memory.write_u128(mem.address, mem.store_value2);
                    } else {
                        let value = self.memory.read_u128(mem.address);
                        wb.vreg_write = Some((mem.dest, VReg::from_u128(value)));
                    }
                } else if mem.is_pair {
                    let stride = mem.bytes as u64;
                    if mem.is_store {
                        self.store_sized(mem.address, mem.bytes, mem.store_value);
                        self.store_sized(mem.address + stride, mem.bytes, mem.store_value2 as u64);
                    } else {
                        let v1 = self.load_sized(mem.address, mem.bytes, false, mem.is64);
                        let v2 = self.load_sized(mem.address + stride, mem.bytes, false, mem.is64);
                        wb.gpr_write = Some((mem.dest, v1));
                        wb.gpr_write2 = Some((mem.dest2, v2));
                    }
                } else if mem.is_store {
                    self.store_sized(mem.address, mem.bytes, mem.store_value);
                } else {
                    let value = self.load_sized(mem.address, mem.bytes, mem.signed, mem.is64);
                    wb.gpr_write = Some((mem.dest, value));
                }
            }

            if let Some((nr, args)) = ex.svc {
                let result = self.syscalls.dispatch(nr, args, self.memory);
                wb.gpr_write = Some((0, result));
                if let Some(code) = self.syscalls.exit_code() {
                    wb.exit = Some(code);
                }
            }

            let done = wb.exit.is_some();
            if let Some(empty) = self.memwb_latch.iter().position(Option::is_none) {
                self.memwb_latch[empty] = Some(wb);
            }
            if done {
                break;
            }
        }

        stalled
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

    /// Access the data side of the cache hierarchy (L1D, falling through
    /// to the shared L2 on a miss) and return the latency to charge. On
    /// an L1 miss the L2's own latency is charged directly rather than
    /// stacked on top of the L1 miss latency, since the L1 miss penalty
    /// already represents "go check the next level".
    fn access_data_cache(&mut self, addr: u64) -> u32 {
        let Some(dcache) = self.dcache.as_mut() else { return 1 };
        let access = dcache.access(addr);
        self.stats.dcache.hits = dcache.hits();
        self.stats.dcache.misses = dcache.misses();
        if matches!(access.outcome, CacheOutcome::Hit) {
            return access.latency;
        }
        let l2 = self.l2.access(addr);
        self.stats.l2.hits = self.l2.hits();
        self.stats.l2.misses = self.l2.misses();
        l2.latency
    }

    fn access_instruction_cache(&mut self, addr: u64) -> u32 {
        let Some(icache) = self.icache.as_mut() else { return 1 };
        let access = icache.access(addr);
        self.stats.icache.hits = icache.hits();
        self.stats.icache.misses = icache.misses();
        if matches!(access.outcome, CacheOutcome::Hit) {
            return access.latency;
        }
        let l2 = self.l2.access(addr);
        self.stats.l2.hits = self.l2.hits();
        self.stats.l2.misses = self.l2.misses();
        l2.latency
    }

    /// Resolve a source register with intra-cycle forwarding from older
    /// slots already computed earlier this tick (flags are forwarded
    /// through the same mechanism; see `resolve_flags`). Returns
    /// `None` if the value depends on a load that MEM is still draining
    /// this same tick (a load-use hazard): by next tick WB will have
    /// committed it, so a single cycle of hold is always enough.
    fn resolve_gpr(&self, reg: u8, sp_context: bool, done: &[Option<ExSlot>], draining: &[Option<ExSlot>]) -> Option<u64> {
        if reg == 31 && !sp_context {
            return Some(0);
        }
        let mut value = if sp_context { self.registers.read_or_sp(reg) } else { self.registers.read_or_zero(reg) };
        for slot in done.iter().flatten() {
            if let Some((r, v)) = slot.gpr_write {
                if r == reg {
                    value = v;
                }
            }
            if let Some((r, v)) = slot.gpr_write2 {
                if r == reg {
                    value = v;
                }
            }
            if let Some((r, v)) = slot.addr_writeback {
                if r == reg {
                    value = v;
                }
            }
        }
        for slot in draining.iter().flatten() {
            if let Some(mem) = &slot.mem {
                if !mem.is_store && (mem.dest == reg || (mem.is_pair && mem.dest2 == reg)) {
                    return None;
                }
            }
        }
        Some(value)
    }

    fn resolve_flags(&self, done: &[Option<ExSlot>]) -> Nzcv {
        let mut flags = self.registers.nzcv;
        for slot in done.iter().flatten() {
            if let Some(f) = slot.flags_out {
                flags = f;
            }
        }
        flags
    }

    /// Runs EX over the current `id_latch`. `draining` is last cycle's
    /// EX latch, snapshotted by the caller before `run_mem` drained it
    /// this tick — it's what lets a load-use hazard on the instruction
    /// MEM is processing this very cycle be detected instead of missed.
    /// Returns whether a branch misprediction fired (and already flushed
    /// id/if, redirected fetch, and scheduled the mispredict-penalty
    /// stall).
    fn run_ex(&mut self, draining: &[Option<ExSlot>]) -> Result<bool> {
        let mut produced: Vec<Option<ExSlot>> = vec![None; self.width];
        let mut barrier = self.width;
        let mut mispredicted = false;
        let mut extra_stall: u32 = 0;

        for slot in 0..self.width {
            let Some(id) = self.id_latch[slot] else { continue };
            let instr = id.instr;

            if exec::is_branch_format(instr.format) {
                let Some(rn) = self.resolve_gpr(instr.rn, false, &produced, draining) else {
                    barrier = slot;
                    break;
                };
                let flags = self.resolve_flags(&produced);
                let outcome = exec::evaluate_branch(&instr, rn, flags, id.pc);

                let (actual_taken, actual_target, link) = match outcome {
                    BranchOutcome::NotTaken => (false, id.pc.wrapping_add(4), false),
                    BranchOutcome::Taken { target, link } => (true, target, link),
                };

                self.stats.branch_predictions += 1;
                let predicted_ok = id.predicted_taken == actual_taken && (!actual_taken || id.predicted_target == actual_target);
                self.predictor.update(id.pc, actual_taken, actual_target);

                produced[slot] = Some(ExSlot {
                    gpr_write: link.then_some((30, id.pc.wrapping_add(4))),
                    ..Default::default()
                });

                if predicted_ok {
                    self.stats.correct += 1;
                } else {
                    self.stats.mispredictions += 1;
                    self.stats.flushes += 1;
                    self.id_latch = vec![None; self.width];
                    self.if_latch = vec![None; self.width];
                    self.fetch_pc = actual_target;
                    self.stall_remaining = self.stall_remaining.max(self.config.latencies.branch_mispredict_penalty.max(1));
                    mispredicted = true;
                    barrier = slot + 1;
                    break;
                }
                continue;
            }

            match instr.format {
                Format::Exception => match instr.op {
                    Op::Nop => {
                        produced[slot] = Some(ExSlot::default());
                    }
                    Op::Svc => {
                        let regs = [0u8, 1, 2, 3, 4, 5, 8];
                        let mut vals = [0u64; 7];
                        let mut hazard = false;
                        for (i, r) in regs.iter().enumerate() {
                            match self.resolve_gpr(*r, false, &produced, draining) {
                                Some(v) => vals[i] = v,
                                None => {
                                    hazard = true;
                                    break;
                                }
                            }
                        }
                        if hazard {
                            barrier = slot;
                            break;
                        }
                        let args = [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]];
                        produced[slot] = Some(ExSlot {
                            svc: Some((vals[6], args)),
                            ..Default::default()
                        });
                    }
                    Op::Brk => {
                        return Err(Error::Trap { pc: id.pc, immediate: instr.imm as u16 });
                    }
                    _ => {
                        produced[slot] = Some(ExSlot::default());
                    }
                },
                Format::LoadStore | Format::LoadStorePair | Format::LoadStoreLit | Format::SIMDLoadStore => {
                    let Some(base) = self.resolve_gpr(instr.rn, true, &produced, draining) else {
                        barrier = slot;
                        break;
                    };
                    let rm_value = if instr.index_mode == IndexMode::RegBase {
                        match self.resolve_gpr(instr.rm, false, &produced, draining) {
                            Some(v) => v,
                            None => {
                                barrier = slot;
                                break;
                            }
                        }
                    } else {
                        0
                    };
                    let AddressResult { address, writeback } = exec::compute_address(&instr, base, rm_value, id.pc);
                    let bytes = exec::mem_bytes(instr.op, instr.is64);

                    let mut ex_slot = ExSlot {
                        addr_writeback: writeback.map(|v| (instr.rn, v)),
                        ..Default::default()
                    };

                    if instr.format == Format::SIMDLoadStore {
                        let store_value2 = if instr.op == Op::Strq { self.registers.read_vreg(instr.rd).to_u128() } else { 0 };
                        ex_slot.mem = Some(MemOp {
                            address,
                            bytes,
                            signed: false,
                            is64: instr.is64,
                            is_store: instr.op == Op::Strq,
                            is_pair: false,
                            is_simd: true,
                            store_value: 0,
                            store_value2,
                            dest: instr.rd,
                            dest2: 0,
                        });
                    } else if instr.op == Op::Stp {
                        let Some(v1) = self.resolve_gpr(instr.rd, false, &produced, draining) else {
                            barrier = slot;
                            break;
                        };
                        let Some(v2) = self.resolve_gpr(instr.rt2, false, &produced, draining) else {
                            barrier = slot;
                            break;
                        };
                        ex_slot.mem = Some(MemOp {
                            address,
                            bytes,
                            signed: false,
                            is64: instr.is64,
                            is_store: true,
                            is_pair: true,
                            is_simd: false,
                            store_value: v1,
                            store_value2: v2 as u128,
                            dest: 0,
                            dest2: 0,
                        });
                    } else if instr.op == Op::Ldp {
                        ex_slot.mem = Some(MemOp {
                            address,
                            bytes,
                            signed: false,
                            is64: instr.is64,
                            is_store: false,
                            is_pair: true,
                            is_simd: false,
                            store_value: 0,
                            store_value2: 0,
                            dest: instr.rd,
                            dest2: instr.rt2,
                        });
                    } else if matches!(instr.op, Op::Str | Op::Strh | Op::Strb) {
                        let Some(value) = self.resolve_gpr(instr.rd, false, &produced, draining) else {
                            barrier = slot;
                            break;
                        };
                        ex_slot.mem = Some(MemOp {
                            address,
                            bytes,
                            signed: false,
                            is64: instr.is64,
                            is_store: true,
                            is_pair: false,
                            is_simd: false,
                            store_value: value,
                            store_value2: 0,
                            dest: 0,
                            dest2: 0,
                        });
                    } else {
                        let signed = exec::mem_is_signed(instr.op);
                        ex_slot.mem = Some(MemOp {
                            address,
                            bytes,
                            signed,
                            is64: instr.is64,
                            is_store: false,
                            is_pair: false,
                            is_simd: false,
                            store_value: 0,
                            store_value2: 0,
                            dest: instr.rd,
                            dest2: 0,
                        });
                    }

                    produced[slot] = Some(ex_slot);
                }
                Format::SIMDReg => {
                    let vn = self.registers.read_vreg(instr.rn);
                    let vm = self.registers.read_vreg(instr.rm);
                    let result = exec::compute_simd(&instr, vn, vm);
                    produced[slot] = Some(ExSlot {
                        vreg_write: Some((instr.rd, result)),
                        ..Default::default()
                    });
                }
                _ => {
                    let Some(rn) = self.resolve_gpr(instr.rn, false, &produced, draining) else {
                        barrier = slot;
                        break;
                    };
                    let Some(rm) = self.resolve_gpr(instr.rm, false, &produced, draining) else {
                        barrier = slot;
                        break;
                    };
                    let ra = if instr.format == Format::DataProc3Src {
                        match self.resolve_gpr(instr.rt2, false, &produced, draining) {
                            Some(v) => v,
                            None => {
                                barrier = slot;
                                break;
                            }
                        }
                    } else {
                        0
                    };
                    let Some(rd_old) = self.resolve_gpr(instr.rd, false, &produced, draining) else {
                        barrier = slot;
                        break;
                    };

                    let inputs = AluInputs { rn, rm, ra, rd_old, flags_in: self.resolve_flags(&produced), pc: id.pc };
                    let output = exec::compute_alu(&instr, inputs);

                    let writes_flags = instr.set_flags || exec::always_sets_flags(&instr);
                    produced[slot] = Some(ExSlot {
                        gpr_write: (instr.format != Format::CondCmp).then_some((instr.rd, output.value)),
                        flags_out: writes_flags.then_some(output.flags),
                        ..Default::default()
                    });

                    if let Some(lat) = multi_cycle_latency(&instr, rm, &self.config.latencies) {
                        if lat > 1 {
                            extra_stall = extra_stall.max(lat - 1);
                            barrier = slot + 1;
                            break;
                        }
                    }
                }
            }
        }

        self.ex_latch = produced;

        if !mispredicted {
            if barrier < self.width {
                self.stats.exec_stalls += 1;
            }
            for j in 0..barrier {
                self.id_latch[j] = None;
            }
            if extra_stall > 0 {
                self.stall_remaining = self.stall_remaining.max(extra_stall);
            }
        }

        Ok(mispredicted)
    }

    /// Runs ID: decode held `if_latch` entries into `id_latch`, enforcing
    /// the at-most-one-memory/at-most-one-branch structural issue limit.
    /// Whatever `if_latch` entries remain afterward (a structural stall,
    /// or a slot still held from an EX-stage barrier) tell IF it must not
    /// fetch fresh words ahead of them this cycle.
    fn run_id(&mut self) -> Result<()> {
        let mut still_decoding = true;
        let mut mem_used = false;
        let mut branch_used = false;

        for j in 0..self.width {
            if !still_decoding {
                continue;
            }
            if self.id_latch[j].is_some() {
                // Still held from an EX-stage barrier; nothing younger
                // may advance past it this cycle.
                still_decoding = false;
                continue;
            }
            let Some(if_slot) = self.if_latch[j] else { continue };

            let instr = decode(if_slot.word);
            if instr.is_unknown() {
                return Err(Error::DecodeFailure { pc: if_slot.pc });
            }

            if let Some(class) = port_class(instr.format) {
                let blocked = match class {
                    PortClass::Memory => mem_used,
                    PortClass::Branch => branch_used,
                };
                if blocked {
                    self.stats.structural_stalls += 1;
                    still_decoding = false;
                    continue;
                }
                match class {
                    PortClass::Memory => mem_used = true,
                    PortClass::Branch => branch_used = true,
                }
            }

            let predicted = self.predictor.predict(if_slot.pc);
            self.id_latch[j] = Some(IdSlot {
                instr,
                pc: if_slot.pc,
                predicted_taken: predicted.taken,
                predicted_target: predicted.target,
            });
            self.if_latch[j] = None;
        }

        Ok(())
    }

    /// Runs IF. Only fetches fresh words when `allow_fetch` (every
    /// `if_latch` slot was consumed by ID this cycle, so the whole
    /// bundle cleared — true at a cold start too, when `if_latch` starts
    /// out empty with nothing for ID to decode) — otherwise the
    /// still-held slots must keep their place in program order, so
    /// nothing younger is allowed in ahead of them even if some slots
    /// happen to be empty.
    fn run_if(&mut self, allow_fetch: bool) {
        if !allow_fetch {
            return;
        }
        for j in 0..self.width {
            if self.if_latch[j].is_some() {
                continue;
            }

            let mut tries = 0;
            loop {
                let pc = self.fetch_pc;
                let word = self.fetch_word(pc);
                let instr = decode(word);

                if !instr.is_unknown() && exec::is_foldable(&instr) && tries < FOLD_LIMIT {
                    // Unconditional direct branches never need the BTB:
                    // the target is already fully computable from the
                    // decoded offset, so folding doesn't wait for the
                    // predictor to warm up on this PC.
                    self.stats.folded += 1;
                    self.fetch_pc = pc.wrapping_add(instr.branch_offset as u64);
                    tries += 1;
                    continue;
                }

                let predicted = self.predictor.predict(pc);
                self.if_latch[j] = Some(IfSlot { word, pc });
                self.fetch_pc = if predicted.taken { predicted.target } else { pc.wrapping_add(4) };
                break;
            }
        }
    }

    fn fetch_word(&mut self, pc: u64) -> u32 {
        let latency = self.access_instruction_cache(pc);
        if latency > 1 {
            self.stats.mem_stalls += 1;
            self.stall_remaining = self.stall_remaining.max(latency - 1);
        }
        self.memory.read_u32(pc)
    }
}

#[cfg(test)]
mod tests;
