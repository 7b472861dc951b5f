//! Functional execution units.
//!
//! Pure functions shared by [`crate::interpreter::Interpreter`] (which
//! calls them once per retired instruction) and
//! [`crate::timing::pipeline::Pipeline`] (whose EX stage calls the same
//! functions against forwarded operands, so the decoder and execution
//! semantics never drift between the two consumers). None of these touch
//! a register file or memory directly — callers resolve operands first
//! (directly, or via forwarding) and commit results afterward.

use crate::registers::VReg;
use arm64_asm::{check_condition, ExtendType, Format, IndexMode, Instruction, Nzcv, Op, ShiftType};

/// Resolved source operands for [`compute_alu`]. Most formats only use
/// `rn`/`rm`; `ra` is the third source for MADD/MSUB and `rd_old` is the
/// destination's current value, needed by BFM (preserves bits outside the
/// field) and MOVK (preserves bits outside the 16-bit slice).
#[derive(Debug, Clone, Copy, Default)]
pub struct AluInputs {
    pub rn: u64,
    pub rm: u64,
    pub ra: u64,
    pub rd_old: u64,
    pub flags_in: Nzcv,
    pub pc: u64,
}

/// What an ALU-class instruction produces: a value for `rd` (ignored by
/// condition-compare, which only sets flags) and the NZCV that would
/// result, left to the caller to commit only when the instruction is
/// flag-setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    pub value: u64,
    pub flags: Nzcv,
}

pub(crate) const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn sign_extend_from(value: u64, width: u32) -> i64 {
    if width == 0 {
        return 0;
    }
    if width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Extend the register-offset index per its `option` field before the
/// addressing shift. `Lsl`/`Sxtx` pass the full 64-bit `Xm` through
/// unchanged; `Uxtw`/`Sxtw` take only the low 32 bits of `Wm`.
fn extend_index(value: u64, extend: ExtendType) -> u64 {
    match extend {
        ExtendType::Uxtw => value & 0xffff_ffff,
        ExtendType::Sxtw => sign_extend_from(value & 0xffff_ffff, 32) as u64,
        ExtendType::Lsl | ExtendType::Sxtx => value,
    }
}

fn apply_shift(value: u64, shift_type: ShiftType, amount: u32, width: u32) -> u64 {
    let amount = if width == 0 { 0 } else { amount % width };
    let m = mask(width);
    let v = value & m;
    if amount == 0 {
        return v;
    }
    match shift_type {
        ShiftType::Lsl => (v << amount) & m,
        ShiftType::Lsr => v >> amount,
        ShiftType::Asr => ((sign_extend_from(v, width) >> amount) as u64) & m,
        ShiftType::Ror => ((v >> amount) | (v << (width - amount))) & m,
    }
}

/// ADD with N/Z/C/V: C is the unsigned carry-out, V is
/// same-sign-operands-produce-different-sign-result.
fn add_with_flags(a: u64, b: u64, width: u32) -> (u64, Nzcv) {
    let m = mask(width);
    let (aw, bw) = (a & m, b & m);
    let sum = aw as u128 + bw as u128;
    let value = (sum as u64) & m;
    let c = sum > m as u128;
    let sign_a = (aw >> (width - 1)) & 1;
    let sign_b = (bw >> (width - 1)) & 1;
    let sign_r = (value >> (width - 1)) & 1;
    let v = sign_a == sign_b && sign_r != sign_a;
    (value, Nzcv::from_bools(sign_r == 1, value == 0, c, v))
}

/// SUB with N/Z/C/V: C is NOT-borrow (`op1 >= op2`).
fn sub_with_flags(a: u64, b: u64, width: u32) -> (u64, Nzcv) {
    let m = mask(width);
    let (aw, bw) = (a & m, b & m);
    let value = aw.wrapping_sub(bw) & m;
    let c = aw >= bw;
    let sign_a = (aw >> (width - 1)) & 1;
    let sign_b = (bw >> (width - 1)) & 1;
    let sign_r = (value >> (width - 1)) & 1;
    let v = sign_a != sign_b && sign_r == sign_b;
    (value, Nzcv::from_bools(sign_r == 1, value == 0, c, v))
}

fn logical(op: Op, a: u64, b: u64, width: u32) -> AluOutput {
    let m = mask(width);
    let value = match op {
        Op::And => a & b,
        Op::Orr => a | b,
        Op::Eor => a ^ b,
        _ => 0,
    } & m;
    let n = (value >> (width - 1)) & 1 == 1;
    AluOutput {
        value,
        flags: Nzcv::from_bools(n, value == 0, false, false),
    }
}

/// UBFM/SBFM/BFM's extract-or-insert formula. `immr` is `instr.imm`,
/// `imms` is `instr.imm2`.
fn bitfield(instr: &Instruction, rn: u64, rd_old: u64, width: u32) -> u64 {
    let immr = instr.imm as u32 & (width - 1);
    let imms = instr.imm2 as u32 & (width - 1);
    let rnm = rn & mask(width);

    if imms >= immr {
        let field_width = imms - immr + 1;
        let extracted = (rnm >> immr) & mask(field_width);
        match instr.op {
            Op::Ubfm => extracted,
            Op::Sbfm => (sign_extend_from(extracted, field_width) as u64) & mask(width),
            Op::Bfm => (rd_old & mask(width) & !mask(field_width)) | extracted,
            _ => extracted,
        }
    } else {
        let field_width = imms + 1;
        let shift = width - immr;
        let src_frag = rnm & mask(field_width);
        match instr.op {
            Op::Ubfm => (src_frag << shift) & mask(width),
            Op::Sbfm => ((sign_extend_from(src_frag, field_width) as u64) << shift) & mask(width),
            Op::Bfm => {
                let inserted = (src_frag << shift) & mask(width);
                let keep = !(mask(field_width) << shift) & mask(width);
                (rd_old & keep) | inserted
            }
            _ => 0,
        }
    }
}

/// EXTR (and its ROR-immediate alias, which the decoder already reduces
/// to `Op::Ror` with `rm == rn`): concatenate `Rm:Rn` and extract
/// `width` bits starting at `lsb`.
fn extract(instr: &Instruction, rn: u64, rm: u64, width: u32) -> u64 {
    let lsb = if width == 0 { 0 } else { instr.shift_amount % width };
    let concat = ((rm & mask(width)) as u128) << width | (rn & mask(width)) as u128;
    ((concat >> lsb) & mask(width) as u128) as u64
}

fn move_wide(instr: &Instruction, rd_old: u64, width: u32) -> u64 {
    match instr.op {
        Op::Movz => instr.imm & mask(width),
        Op::Movn => (!instr.imm) & mask(width),
        Op::Movk => {
            let keep = !(0xffffu64 << instr.shift_amount) & mask(width);
            (rd_old & keep) | (instr.imm & mask(width))
        }
        _ => 0,
    }
}

fn pc_rel(instr: &Instruction, pc: u64) -> u64 {
    match instr.op {
        Op::Adrp => (pc & !0xfff).wrapping_add(instr.branch_offset as u64),
        Op::Adr => pc.wrapping_add(instr.branch_offset as u64),
        _ => 0,
    }
}

fn cond_select(instr: &Instruction, rn: u64, rm: u64, flags: Nzcv) -> u64 {
    let width = instr.reg_width();
    let value = if check_condition(instr.cond, flags) {
        rn
    } else {
        match instr.op {
            Op::Csel => rm,
            Op::Csinc => rm.wrapping_add(1),
            Op::Csinv => !rm,
            Op::Csneg => (rm as i64).wrapping_neg() as u64,
            _ => rm,
        }
    };
    value & mask(width)
}

/// CCMP/CCMN: if the outer condition holds, evaluate SUBS/ADDS against
/// `Rn` and the operand and return those flags; otherwise the 4-bit
/// immediate (`instr.imm2`) is loaded directly. The register-vs-immediate
/// operand form is recorded in `index_mode` at decode time (see
/// `arm64-asm`'s `decode_cond_cmp`), since the bit layout can't otherwise
/// distinguish `rm == 0` from an all-zero 5-bit immediate.
fn cond_cmp(instr: &Instruction, rn: u64, rm: u64, flags_in: Nzcv, width: u32) -> AluOutput {
    if !check_condition(instr.cond, flags_in) {
        return AluOutput {
            value: 0,
            flags: Nzcv::from_imm4(instr.imm2 as u32),
        };
    }
    let operand = if instr.index_mode == IndexMode::RegBase { rm } else { instr.imm };
    let (_, flags) = if instr.op == Op::Ccmn {
        add_with_flags(rn, operand, width)
    } else {
        sub_with_flags(rn, operand, width)
    };
    AluOutput { value: 0, flags }
}

fn data_proc_2src(instr: &Instruction, rn: u64, rm: u64, width: u32) -> u64 {
    let a = rn & mask(width);
    let b = rm & mask(width);
    match instr.op {
        Op::Udiv => {
            if b == 0 {
                0
            } else {
                a / b
            }
        }
        Op::Sdiv => {
            if b == 0 {
                return 0;
            }
            if width == 64 {
                ((a as i64).wrapping_div(b as i64) as u64) & mask(width)
            } else {
                (((a as i32).wrapping_div(b as i32)) as u32 as u64) & mask(width)
            }
        }
        Op::Lslv => apply_shift(a, ShiftType::Lsl, (b % width as u64) as u32, width),
        Op::Lsrv => apply_shift(a, ShiftType::Lsr, (b % width as u64) as u32, width),
        Op::Asrv => apply_shift(a, ShiftType::Asr, (b % width as u64) as u32, width),
        Op::Rorv => apply_shift(a, ShiftType::Ror, (b % width as u64) as u32, width),
        _ => 0,
    }
}

fn data_proc_3src(instr: &Instruction, rn: u64, rm: u64, ra: u64, width: u32) -> u64 {
    let m = mask(width);
    let prod = (rn & m).wrapping_mul(rm & m) & m;
    match instr.op {
        Op::Madd => (ra & m).wrapping_add(prod) & m,
        Op::Msub => (ra & m).wrapping_sub(prod) & m,
        _ => 0,
    }
}

/// Compute the non-memory, non-branch, non-SIMD portion of instruction
/// execution. Returns the value destined for `rd` (meaningless for
/// `CondCmp`, which only sets flags) and the NZCV the instruction would
/// produce; the caller decides whether to commit the flags (always for
/// `CondCmp`, otherwise only when `instr.set_flags`).
pub fn compute_alu(instr: &Instruction, inputs: AluInputs) -> AluOutput {
    let width = instr.reg_width();
    let AluInputs { rn, rm, ra, rd_old, flags_in, pc } = inputs;

    match instr.format {
        Format::DPImm => match instr.op {
            Op::Sub => {
                let (value, flags) = sub_with_flags(rn, instr.imm, width);
                AluOutput { value, flags }
            }
            _ => {
                let (value, flags) = add_with_flags(rn, instr.imm, width);
                AluOutput { value, flags }
            }
        },
        Format::DPReg => {
            let op2 = apply_shift(rm, instr.shift_type, instr.shift_amount, width);
            match instr.op {
                Op::Sub => {
                    let (value, flags) = sub_with_flags(rn, op2, width);
                    AluOutput { value, flags }
                }
                Op::Add => {
                    let (value, flags) = add_with_flags(rn, op2, width);
                    AluOutput { value, flags }
                }
                _ => logical(instr.op, rn, op2, width),
            }
        }
        Format::LogicalImm => logical(instr.op, rn, instr.imm, width),
        Format::Bitfield => AluOutput {
            value: bitfield(instr, rn, rd_old, width),
            flags: flags_in,
        },
        Format::Extract => AluOutput {
            value: extract(instr, rn, rm, width),
            flags: flags_in,
        },
        Format::MoveWide => AluOutput {
            value: move_wide(instr, rd_old, width),
            flags: flags_in,
        },
        Format::PCRel => AluOutput {
            value: pc_rel(instr, pc),
            flags: flags_in,
        },
        Format::CondSelect => AluOutput {
            value: cond_select(instr, rn, rm, flags_in),
            flags: flags_in,
        },
        Format::CondCmp => cond_cmp(instr, rn, rm, flags_in, width),
        Format::DataProc2Src => AluOutput {
            value: data_proc_2src(instr, rn, rm, width),
            flags: flags_in,
        },
        Format::DataProc3Src => AluOutput {
            value: data_proc_3src(instr, rn, rm, ra, width),
            flags: flags_in,
        },
        _ => AluOutput { value: 0, flags: flags_in },
    }
}

/// Whether this instruction always writes flags regardless of
/// `instr.set_flags` (CCMP/CCMN are unconditionally flag-setting; the
/// decoder never bothers flipping a `set_flags` bit for them).
pub fn always_sets_flags(instr: &Instruction) -> bool {
    matches!(instr.format, Format::CondCmp)
}

/// Element-wise SIMD ALU (VADD/VSUB/VMUL/VFADD/VFSUB/VFMUL) over a
/// `SIMDReg`-format instruction. Clears the upper 64 bits of the result
/// for 64-bit arrangements, since a 64-bit vector write always zeroes
/// the unused upper half of the 128-bit register.
pub fn compute_simd(instr: &Instruction, vn: VReg, vm: VReg) -> VReg {
    let arrangement = instr.simd_arrangement;
    let elem_bits = arrangement.elem_bits();
    let mut result = VReg::ZERO;
    for lane in 0..arrangement.lanes() as usize {
        let a = vn.elem(elem_bits, lane);
        let b = vm.elem(elem_bits, lane);
        let r = if instr.is_float {
            float_lane(instr.op, a, b, elem_bits)
        } else {
            int_lane(instr.op, a, b, elem_bits)
        };
        result.set_elem(elem_bits, lane, r);
    }
    if arrangement.is_64bit() {
        result.clear_upper();
    }
    result
}

fn int_lane(op: Op, a: u64, b: u64, elem_bits: u32) -> u64 {
    let m = mask(elem_bits);
    match op {
        Op::Vadd => a.wrapping_add(b) & m,
        Op::Vsub => a.wrapping_sub(b) & m,
        Op::Vmul => a.wrapping_mul(b) & m,
        _ => 0,
    }
}

fn float_lane(op: Op, a: u64, b: u64, elem_bits: u32) -> u64 {
    if elem_bits == 64 {
        let (x, y) = (f64::from_bits(a), f64::from_bits(b));
        let r = match op {
            Op::Vfadd => x + y,
            Op::Vfsub => x - y,
            Op::Vfmul => x * y,
            _ => 0.0,
        };
        r.to_bits()
    } else {
        let (x, y) = (f32::from_bits(a as u32), f32::from_bits(b as u32));
        let r = match op {
            Op::Vfadd => x + y,
            Op::Vfsub => x - y,
            Op::Vfmul => x * y,
            _ => 0.0,
        };
        r.to_bits() as u64
    }
}

/// Byte width of a load/store's memory access.
pub fn mem_bytes(op: Op, is64: bool) -> u32 {
    match op {
        Op::Ldrb | Op::Strb | Op::Ldrsb => 1,
        Op::Ldrh | Op::Strh | Op::Ldrsh => 2,
        Op::Ldrsw => 4,
        Op::Ldrq | Op::Strq => 16,
        Op::Ldp | Op::Stp => {
            if is64 {
                8
            } else {
                4
            }
        }
        _ => {
            if is64 {
                8
            } else {
                4
            }
        }
    }
}

pub fn mem_is_signed(op: Op) -> bool {
    matches!(op, Op::Ldrsb | Op::Ldrsh | Op::Ldrsw)
}

/// Sign- or zero-extend a loaded value of `bytes` width into a 32- or
/// 64-bit destination register per `is64`.
pub fn extend_loaded(raw: u64, bytes: u32, signed: bool, is64: bool) -> u64 {
    if !signed {
        return raw;
    }
    let extended = sign_extend_from(raw, bytes * 8) as u64;
    if is64 {
        extended
    } else {
        extended & 0xffff_ffff
    }
}

/// Effective address for a load/store, plus any pre/post-index
/// writeback value for `Rn` (or `SP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressResult {
    pub address: u64,
    pub writeback: Option<u64>,
}

pub fn compute_address(instr: &Instruction, base: u64, rm_value: u64, pc: u64) -> AddressResult {
    if instr.format == Format::LoadStoreLit {
        return AddressResult {
            address: pc.wrapping_add(instr.branch_offset as u64),
            writeback: None,
        };
    }
    match instr.index_mode {
        IndexMode::PreIndex => {
            let addr = base.wrapping_add(instr.signed_imm as u64);
            AddressResult {
                address: addr,
                writeback: Some(addr),
            }
        }
        IndexMode::PostIndex => AddressResult {
            address: base,
            writeback: Some(base.wrapping_add(instr.signed_imm as u64)),
        },
        IndexMode::RegBase => {
            let extended = extend_index(rm_value, instr.extend_type);
            AddressResult {
                address: base.wrapping_add(extended << instr.shift_amount),
                writeback: None,
            }
        }
        IndexMode::SignedOffset | IndexMode::None => AddressResult {
            address: base.wrapping_add(instr.signed_imm as u64),
            writeback: None,
        },
    }
}

/// Outcome of evaluating a branch-format instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    NotTaken,
    Taken { target: u64, link: bool },
}

/// Whether `format` is one of the branch-resolving formats the timing
/// pipeline must check in every issued slot, not just the first.
pub fn is_branch_format(format: Format) -> bool {
    matches!(
        format,
        Format::Branch | Format::BranchCond | Format::BranchReg | Format::CompareBranch | Format::TestBranch
    )
}

/// Unconditional direct branches (`B`, not `BL`) are eligible for
/// zero-cycle fetch-stage folding: `BL` writes X30 and so cannot be
/// resolved without going through the pipeline.
pub fn is_foldable(instr: &Instruction) -> bool {
    matches!(instr.op, Op::B)
}

pub fn evaluate_branch(instr: &Instruction, rn: u64, flags: Nzcv, pc: u64) -> BranchOutcome {
    let target = || pc.wrapping_add(instr.branch_offset as u64);
    match instr.op {
        Op::B => BranchOutcome::Taken { target: target(), link: false },
        Op::Bl => BranchOutcome::Taken { target: target(), link: true },
        Op::BCond => {
            if check_condition(instr.cond, flags) {
                BranchOutcome::Taken { target: target(), link: false }
            } else {
                BranchOutcome::NotTaken
            }
        }
        Op::Br => BranchOutcome::Taken { target: rn, link: false },
        Op::Blr => BranchOutcome::Taken { target: rn, link: true },
        Op::Ret => BranchOutcome::Taken { target: rn, link: false },
        Op::Cbz | Op::Cbnz => {
            let width = instr.reg_width();
            let is_zero = (rn & mask(width)) == 0;
            let taken = if instr.op == Op::Cbz { is_zero } else { !is_zero };
            if taken {
                BranchOutcome::Taken { target: target(), link: false }
            } else {
                BranchOutcome::NotTaken
            }
        }
        Op::Tbz | Op::Tbnz => {
            let bit_pos = instr.imm as u32 & 63;
            let bit = (rn >> bit_pos) & 1;
            let taken = if instr.op == Op::Tbz { bit == 0 } else { bit == 1 };
            if taken {
                BranchOutcome::Taken { target: target(), link: false }
            } else {
                BranchOutcome::NotTaken
            }
        }
        _ => BranchOutcome::NotTaken,
    }
}

#[cfg(test)]
mod tests;
