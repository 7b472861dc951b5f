//! The bit-pattern classifier: `decode(word) -> Instruction`.
//!
//! Implements the priority-ordered match of spec §4.1. Each class is
//! matched against a fixed set of bits; the first class whose fixed bits
//! agree with `word` wins and fills in the remaining operand fields. A word
//! matching no class decodes to `Instruction::default()` (`op = Unknown`).

use crate::cond::Nzcv;
use crate::instruction::Instruction;
use crate::types::{Arrangement, Cond, ExtendType, Format, IndexMode, Op, ShiftType};

#[cfg(test)]
mod tests;

/// Extract bits `[hi:lo]` (inclusive) as an unsigned value.
const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    let width = hi - lo + 1;
    let mask = if width >= 32 { u32::MAX } else { (1u32 << width) - 1 };
    (word >> lo) & mask
}

const fn bit(word: u32, n: u32) -> u32 {
    (word >> n) & 1
}

/// Sign-extend the low `bits` bits of `value` to `i64`.
const fn sign_extend(value: u32, bits: u32) -> i64 {
    let shift = 64 - bits;
    (((value as u64) << shift) as i64) >> shift
}

/// Decode a 32-bit instruction word into a typed [`Instruction`].
///
/// Pure function; never panics, never fails. See module docs for the
/// priority order.
pub fn decode(word: u32) -> Instruction {
    // Literal system-instruction constants (NOP and friends) are checked
    // first the way a disassembler's special-case table would be.
    if word == 0xD503_201F {
        return Instruction {
            op: Op::Nop,
            format: Format::Exception,
            ..Instruction::default()
        };
    }

    if let Some(i) = decode_simd_load_store(word) {
        return i;
    }
    if let Some(i) = decode_simd_three_same(word) {
        return i;
    }
    if let Some(i) = decode_load_store_pair(word) {
        return i;
    }
    if let Some(i) = decode_load_literal(word) {
        return i;
    }
    if let Some(i) = decode_load_store_reg_indexed(word) {
        return i;
    }
    if let Some(i) = decode_load_store_unsigned_imm(word) {
        return i;
    }
    if let Some(i) = decode_pcrel(word) {
        return i;
    }
    if let Some(i) = decode_move_wide(word) {
        return i;
    }
    if let Some(i) = decode_bitfield(word) {
        return i;
    }
    if let Some(i) = decode_extract(word) {
        return i;
    }
    if let Some(i) = decode_dp_imm_addsub(word) {
        return i;
    }
    if let Some(i) = decode_logical_imm(word) {
        return i;
    }
    if let Some(i) = decode_cond_select(word) {
        return i;
    }
    if let Some(i) = decode_cond_cmp(word) {
        return i;
    }
    if let Some(i) = decode_data_proc_2src(word) {
        return i;
    }
    if let Some(i) = decode_data_proc_3src(word) {
        return i;
    }
    if let Some(i) = decode_dp_reg(word) {
        return i;
    }
    if let Some(i) = decode_unconditional_branch(word) {
        return i;
    }
    if let Some(i) = decode_cond_branch(word) {
        return i;
    }
    if let Some(i) = decode_branch_reg(word) {
        return i;
    }
    if let Some(i) = decode_exception(word) {
        return i;
    }
    if let Some(i) = decode_compare_branch(word) {
        return i;
    }
    if let Some(i) = decode_test_branch(word) {
        return i;
    }

    Instruction::default()
}

// ---------------------------------------------------------------------
// SIMD load/store (unsigned offset), 128-bit only (spec §4.2 SIMDLoadStore)
// ---------------------------------------------------------------------
fn decode_simd_load_store(word: u32) -> Option<Instruction> {
    if bits(word, 29, 26) != 0b1111 {
        return None;
    }
    let opc = bits(word, 23, 22);
    // opc bit1 set selects a 128-bit (Q) transfer; anything else here is a
    // narrower SIMD&FP load/store this simulator doesn't model.
    if opc & 0b10 == 0 {
        return None;
    }
    let is_load = bit(word, 22) != 0 || (opc & 1) != 0;
    let imm12 = bits(word, 21, 10);
    let rn = bits(word, 9, 5) as u8;
    let rt = bits(word, 4, 0) as u8;
    Some(Instruction {
        op: if is_load { Op::Ldrq } else { Op::Strq },
        format: Format::SIMDLoadStore,
        rd: rt,
        rn,
        is_simd: true,
        index_mode: IndexMode::SignedOffset,
        signed_imm: (imm12 as i64) * 16,
        simd_arrangement: Arrangement::D2,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// SIMD three-same (vector ALU)
// ---------------------------------------------------------------------
fn decode_simd_three_same(word: u32) -> Option<Instruction> {
    if bit(word, 31) != 0 || bits(word, 28, 24) != 0b01110 {
        return None;
    }
    let q = bit(word, 30);
    let u = bit(word, 29);
    let size = bits(word, 23, 22);
    let rm = bits(word, 20, 16) as u8;
    let alu_op = bits(word, 13, 11);
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;

    // This decoder's own convention (not a literal ARM encoding field):
    // bit 23 doubles as the integer/float discriminant for the three-same
    // class, since spec §4.1 only specifies the class's top bits and
    // leaves element-op selection to the implementation.
    let is_float = bit(word, 23) != 0;
    let arrangement = if is_float {
        if q == 1 {
            Arrangement::D2
        } else {
            Arrangement::S2
        }
    } else {
        match (q, size & 0b11) {
            (0, 0b00) => Arrangement::B8,
            (1, 0b00) => Arrangement::B16,
            (0, 0b01) => Arrangement::H4,
            (1, 0b01) => Arrangement::H8,
            (0, 0b10) => Arrangement::S2,
            (1, 0b10) => Arrangement::S4,
            _ => Arrangement::D2,
        }
    };

    let op = match (is_float, u, alu_op & 0b11) {
        (true, _, 0b00) => Op::Vfadd,
        (true, _, 0b01) => Op::Vfsub,
        (true, _, 0b10) => Op::Vfmul,
        (false, 0, 0b00) => Op::Vadd,
        (false, 1, 0b00) => Op::Vsub,
        (false, 0, 0b01) => Op::Vmul,
        _ => return None,
    };

    // Integer MUL has no defined 2D form. Decode still classifies the
    // pattern (a reader can see what bits produced it) but the executor
    // must treat this one combination as fatal, same as any other Unknown.
    let is_unrepresentable_mul2d = matches!(op, Op::Vmul) && matches!(arrangement, Arrangement::D2);

    Some(Instruction {
        op: if is_unrepresentable_mul2d { Op::Unknown } else { op },
        format: if is_unrepresentable_mul2d {
            Format::Unallocated
        } else {
            Format::SIMDReg
        },
        rd,
        rn,
        rm,
        is_simd: true,
        is_float,
        simd_arrangement: arrangement,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Load/store pair
// ---------------------------------------------------------------------
fn decode_load_store_pair(word: u32) -> Option<Instruction> {
    if bits(word, 29, 27) != 0b101 {
        return None;
    }
    let mode = bits(word, 25, 23);
    let index_mode = match mode {
        0b001 => IndexMode::PostIndex,
        0b010 => IndexMode::SignedOffset,
        0b011 => IndexMode::PreIndex,
        _ => return None,
    };
    let is_load = bit(word, 22) != 0;
    let is64 = bit(word, 31) != 0;
    let scale: i64 = if is64 { 8 } else { 4 };
    let imm7 = bits(word, 21, 15);
    let rt2 = bits(word, 14, 10) as u8;
    let rn = bits(word, 9, 5) as u8;
    let rt = bits(word, 4, 0) as u8;
    let signed_imm = sign_extend(imm7, 7) * scale;

    Some(Instruction {
        op: if is_load { Op::Ldp } else { Op::Stp },
        format: Format::LoadStorePair,
        is64,
        rd: rt,
        rn,
        rt2,
        index_mode,
        signed_imm,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Load literal
// ---------------------------------------------------------------------
fn decode_load_literal(word: u32) -> Option<Instruction> {
    if bits(word, 29, 27) != 0b011 || bits(word, 25, 24) != 0b00 {
        return None;
    }
    let opc = bits(word, 31, 30);
    let is64 = opc == 0b01;
    let imm19 = bits(word, 23, 5);
    let rt = bits(word, 4, 0) as u8;
    Some(Instruction {
        op: Op::Ldr,
        format: Format::LoadStoreLit,
        is64,
        rd: rt,
        branch_offset: sign_extend(imm19, 19) * 4,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Load/store register, pre/post-indexed or register-offset
// ---------------------------------------------------------------------
fn decode_load_store_reg_indexed(word: u32) -> Option<Instruction> {
    if bits(word, 29, 27) != 0b111 || bits(word, 25, 24) != 0b00 {
        return None;
    }
    let size = bits(word, 31, 30);
    let opc = bits(word, 23, 22);
    let rn = bits(word, 9, 5) as u8;
    let rt = bits(word, 4, 0) as u8;
    let (op, is64) = mem_op(size, opc)?;

    if bit(word, 21) == 1 {
        // Register-offset form: imm9 field is repurposed as Rm + extend/shift.
        if bits(word, 11, 10) != 0b10 {
            return None;
        }
        let rm = bits(word, 20, 16) as u8;
        let extend_type = ExtendType::from_option(bits(word, 15, 13))?;
        let natural_shift = mem_scale(size, op).trailing_zeros();
        let shift_amount = bit(word, 12) * natural_shift;
        return Some(Instruction {
            op,
            format: Format::LoadStore,
            is64,
            rd: rt,
            rn,
            rm,
            index_mode: IndexMode::RegBase,
            shift_amount,
            extend_type,
            ..Instruction::default()
        });
    }

    if bits(word, 11, 10) == 0b10 {
        // bit21=0, idx bits 10 => unscaled/unprivileged form, not modeled.
        return None;
    }
    let imm9 = bits(word, 20, 12);
    let idx = bits(word, 11, 10);
    let index_mode = match idx {
        0b01 => IndexMode::PostIndex,
        0b11 => IndexMode::PreIndex,
        _ => return None,
    };
    Some(Instruction {
        op,
        format: Format::LoadStore,
        is64,
        rd: rt,
        rn,
        index_mode,
        signed_imm: sign_extend(imm9, 9),
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Load/store unsigned immediate
// ---------------------------------------------------------------------
fn decode_load_store_unsigned_imm(word: u32) -> Option<Instruction> {
    if bits(word, 29, 27) != 0b111 || bit(word, 26) != 0 || bits(word, 25, 24) != 0b01 {
        return None;
    }
    let size = bits(word, 31, 30);
    let opc = bits(word, 23, 22);
    let rn = bits(word, 9, 5) as u8;
    let rt = bits(word, 4, 0) as u8;
    let (op, is64) = mem_op(size, opc)?;
    let scale = mem_scale(size, op);
    let imm12 = bits(word, 21, 10);

    Some(Instruction {
        op,
        format: Format::LoadStore,
        is64,
        rd: rt,
        rn,
        index_mode: IndexMode::SignedOffset,
        signed_imm: (imm12 as i64) * scale,
        ..Instruction::default()
    })
}

/// Maps the `size`/`opc` fields shared by the unsigned-immediate and
/// pre/post-indexed load/store encodings to an `(Op, is64)` pair.
fn mem_op(size: u32, opc: u32) -> Option<(Op, bool)> {
    match (size, opc) {
        (0b11, 0b00) => Some((Op::Str, true)),
        (0b11, 0b01) => Some((Op::Ldr, true)),
        (0b10, 0b00) => Some((Op::Str, false)),
        (0b10, 0b01) => Some((Op::Ldr, false)),
        (0b10, 0b10) => Some((Op::Ldrsw, true)),
        (0b01, 0b00) => Some((Op::Strh, false)),
        (0b01, 0b01) => Some((Op::Ldrh, false)),
        (0b01, 0b10) => Some((Op::Ldrsh, true)),
        (0b01, 0b11) => Some((Op::Ldrsh, false)),
        (0b00, 0b00) => Some((Op::Strb, false)),
        (0b00, 0b01) => Some((Op::Ldrb, false)),
        (0b00, 0b10) => Some((Op::Ldrsb, true)),
        (0b00, 0b11) => Some((Op::Ldrsb, false)),
        _ => None,
    }
}

const fn mem_scale(size: u32, op: Op) -> i64 {
    match op {
        Op::Ldrsb | Op::Strb | Op::Ldrb => 1,
        Op::Ldrsh | Op::Strh | Op::Ldrh => 2,
        _ => match size {
            0b10 => 4,
            0b11 => 8,
            _ => 1,
        },
    }
}

// ---------------------------------------------------------------------
// PC-relative (ADR / ADRP)
// ---------------------------------------------------------------------
fn decode_pcrel(word: u32) -> Option<Instruction> {
    if bits(word, 28, 24) != 0b10000 {
        return None;
    }
    let op = bit(word, 31);
    let immlo = bits(word, 30, 29);
    let immhi = bits(word, 23, 5);
    let rd = bits(word, 4, 0) as u8;
    let imm = (immhi << 2) | immlo;
    let offset = sign_extend(imm, 21);
    Some(Instruction {
        op: if op == 1 { Op::Adrp } else { Op::Adr },
        format: Format::PCRel,
        is64: true,
        rd,
        branch_offset: if op == 1 { offset * 4096 } else { offset },
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Move wide (MOVZ/MOVN/MOVK)
// ---------------------------------------------------------------------
fn decode_move_wide(word: u32) -> Option<Instruction> {
    if bits(word, 28, 23) != 0b100101 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let opc = bits(word, 30, 29);
    let hw = bits(word, 22, 21);
    if !is64 && hw >= 2 {
        return None;
    }
    let imm16 = bits(word, 20, 5) as u64;
    let rd = bits(word, 4, 0) as u8;
    let shift = hw * 16;
    let op = match opc {
        0b00 => Op::Movn,
        0b10 => Op::Movz,
        0b11 => Op::Movk,
        _ => return None,
    };
    Some(Instruction {
        op,
        format: Format::MoveWide,
        is64,
        rd,
        imm: imm16 << shift,
        shift_amount: shift,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Bitfield (UBFM/SBFM/BFM), plus the LSL/LSR/ASR immediate aliases
// ---------------------------------------------------------------------
fn decode_bitfield(word: u32) -> Option<Instruction> {
    if bits(word, 28, 23) != 0b100110 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let opc = bits(word, 30, 29);
    let n = bit(word, 22);
    if is64 && n != 1 {
        return None;
    }
    if !is64 && n != 0 {
        return None;
    }
    let immr = bits(word, 21, 16);
    let imms = bits(word, 15, 10);
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;
    let width = if is64 { 64 } else { 32 };

    let base_op = match opc {
        0b00 => Op::Sbfm,
        0b01 => Op::Bfm,
        0b10 => Op::Ubfm,
        _ => return None,
    };

    // LSR/ASR alias: imms == width - 1 (UBFM/SBFM extracting to the top).
    if matches!(base_op, Op::Ubfm | Op::Sbfm) && imms == width - 1 {
        let op = if base_op == Op::Ubfm { Op::Lsr } else { Op::Asr };
        return Some(Instruction {
            op,
            format: Format::Bitfield,
            is64,
            rd,
            rn,
            imm: immr as u64,
            imm2: imms as u64,
            shift_amount: immr,
            ..Instruction::default()
        });
    }
    // LSL alias: UBFM with imms == immr - 1 (mod width), i.e. immr = (width - shift) mod width.
    if base_op == Op::Ubfm && imms + 1 == immr {
        let shift = width - immr;
        return Some(Instruction {
            op: Op::Lsl,
            format: Format::Bitfield,
            is64,
            rd,
            rn,
            imm: immr as u64,
            imm2: imms as u64,
            shift_amount: shift,
            ..Instruction::default()
        });
    }

    Some(Instruction {
        op: base_op,
        format: Format::Bitfield,
        is64,
        rd,
        rn,
        imm: immr as u64,
        imm2: imms as u64,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Extract (EXTR), plus the ROR-immediate alias (Rn == Rm)
// ---------------------------------------------------------------------
fn decode_extract(word: u32) -> Option<Instruction> {
    if bits(word, 28, 23) != 0b100111 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let n = bit(word, 22);
    if is64 != (n == 1) {
        return None;
    }
    if bits(word, 30, 29) != 0b00 {
        return None;
    }
    let rm = bits(word, 20, 16) as u8;
    let imms = bits(word, 15, 10);
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;

    if rn == rm {
        return Some(Instruction {
            op: Op::Ror,
            format: Format::Extract,
            is64,
            rd,
            rn,
            rm,
            shift_amount: imms,
            ..Instruction::default()
        });
    }

    Some(Instruction {
        op: Op::Extr,
        format: Format::Extract,
        is64,
        rd,
        rn,
        rm,
        shift_amount: imms,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Data-processing immediate: add/sub
// ---------------------------------------------------------------------
fn decode_dp_imm_addsub(word: u32) -> Option<Instruction> {
    if bits(word, 28, 23) != 0b100010 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let is_sub = bit(word, 30) != 0;
    let set_flags = bit(word, 29) != 0;
    let sh = bit(word, 22);
    let imm12 = bits(word, 21, 10) as u64;
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;
    let imm = if sh == 1 { imm12 << 12 } else { imm12 };

    Some(Instruction {
        op: if is_sub { Op::Sub } else { Op::Add },
        format: Format::DPImm,
        is64,
        set_flags,
        rd,
        rn,
        imm,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Logical immediate (AND/ORR/EOR/ANDS)
// ---------------------------------------------------------------------
fn decode_logical_imm(word: u32) -> Option<Instruction> {
    if bits(word, 28, 23) != 0b100100 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let opc = bits(word, 30, 29);
    let n = bit(word, 22);
    if !is64 && n != 0 {
        return None;
    }
    let immr = bits(word, 21, 16);
    let imms = bits(word, 15, 10);
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;
    let datasize = if is64 { 64 } else { 32 };
    let imm = decode_bitmasks(n, imms, immr, datasize)?;

    let (op, set_flags) = match opc {
        0b00 => (Op::And, false),
        0b01 => (Op::Orr, false),
        0b10 => (Op::Eor, false),
        0b11 => (Op::And, true),
        _ => unreachable!(),
    };

    Some(Instruction {
        op,
        format: Format::LogicalImm,
        is64,
        set_flags,
        rd,
        rn,
        imm,
        ..Instruction::default()
    })
}

/// ARM's `DecodeBitMasks` pseudocode (A64 logical-immediate encoding),
/// returning just the working mask (`wmask`) used as the immediate
/// operand value. Returns `None` for reserved encodings.
fn decode_bitmasks(n: u32, imms: u32, immr: u32, datasize: u32) -> Option<u64> {
    let imms = imms & 0x3f;
    let immr = immr & 0x3f;
    let combined = (((n & 1) << 6) | (!imms & 0x3f)) & 0x7f;
    if combined == 0 {
        return None;
    }
    let len = 31 - combined.leading_zeros() as i32;
    if len < 1 {
        return None;
    }
    let esize = 1u32 << len;
    if esize > datasize {
        return None;
    }
    let levels = esize - 1;
    let s = imms & levels;
    let r = immr & levels;
    if datasize < 64 && imms & levels == levels {
        // `immediate=true` path of DecodeBitMasks: all-ones imms is reserved.
        return None;
    }

    let welem: u64 = if s + 1 >= 64 {
        u64::MAX
    } else {
        (1u64 << (s + 1)) - 1
    };
    let rotated = ror_within(welem, r, esize);
    let mut wmask: u64 = 0;
    let mut i = 0u32;
    let elem_mask = mask64(esize);
    while i < datasize {
        wmask |= (rotated & elem_mask) << i;
        i += esize;
    }
    if datasize < 64 {
        wmask &= mask64(datasize);
    }
    Some(wmask)
}

const fn mask64(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Rotate the low `width` bits of `value` right by `amount` bits.
const fn ror_within(value: u64, amount: u32, width: u32) -> u64 {
    if amount == 0 || width == 0 {
        return value & mask64(width);
    }
    let amount = amount % width;
    let masked = value & mask64(width);
    ((masked >> amount) | (masked << (width - amount))) & mask64(width)
}

// ---------------------------------------------------------------------
// Conditional select (CSEL/CSINC/CSINV/CSNEG)
// ---------------------------------------------------------------------
fn decode_cond_select(word: u32) -> Option<Instruction> {
    if bits(word, 28, 21) != 0b1101_0100 {
        return None;
    }
    if bit(word, 29) != 0 {
        return None; // S must be 0
    }
    let is64 = bit(word, 31) != 0;
    let op_bit = bit(word, 30);
    let op2 = bits(word, 11, 10);
    let rm = bits(word, 20, 16) as u8;
    let cond = Cond::from_bits(bits(word, 15, 12));
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;

    let op = match (op_bit, op2) {
        (0, 0b00) => Op::Csel,
        (0, 0b01) => Op::Csinc,
        (1, 0b00) => Op::Csinv,
        (1, 0b01) => Op::Csneg,
        _ => return None,
    };

    Some(Instruction {
        op,
        format: Format::CondSelect,
        is64,
        rd,
        rn,
        rm,
        cond,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Conditional compare (CCMP/CCMN), register and immediate forms
// ---------------------------------------------------------------------
fn decode_cond_cmp(word: u32) -> Option<Instruction> {
    if bits(word, 28, 21) != 0b1101_0010 {
        return None;
    }
    if bit(word, 29) != 1 {
        return None; // S must be 1 for conditional compare
    }
    if bit(word, 4) != 0 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let is_neg = bit(word, 30) != 0;
    let is_imm = bit(word, 11) != 0;
    let cond = Cond::from_bits(bits(word, 15, 12));
    let rn = bits(word, 9, 5) as u8;
    let nzcv = bits(word, 3, 0) as u64;

    let (rm, imm) = if is_imm {
        (0u8, bits(word, 20, 16) as u64)
    } else {
        (bits(word, 20, 16) as u8, 0)
    };

    Some(Instruction {
        op: if is_neg { Op::Ccmn } else { Op::Ccmp },
        format: Format::CondCmp,
        is64,
        rn,
        rm,
        cond,
        imm,
        imm2: nzcv,
        // CCMP/CCMN's register vs. 5-bit-immediate operand forms share the
        // same bit position for an all-zero `rm`/`imm`, so the `is_imm`
        // discriminant must survive into the `Instruction` somewhere; we
        // repurpose `index_mode` (otherwise unused by this format) rather
        // than add a dedicated boolean field.
        index_mode: if is_imm { IndexMode::None } else { IndexMode::RegBase },
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Data-processing (2-source): UDIV/SDIV/LSLV/LSRV/ASRV/RORV
// ---------------------------------------------------------------------
fn decode_data_proc_2src(word: u32) -> Option<Instruction> {
    if bits(word, 28, 21) != 0b1101_0110 {
        return None;
    }
    if bit(word, 29) != 0 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let rm = bits(word, 20, 16) as u8;
    let opcode = bits(word, 15, 10);
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;

    let op = match opcode {
        0b000010 => Op::Udiv,
        0b000011 => Op::Sdiv,
        0b001000 => Op::Lslv,
        0b001001 => Op::Lsrv,
        0b001010 => Op::Asrv,
        0b001011 => Op::Rorv,
        _ => return None,
    };

    Some(Instruction {
        op,
        format: Format::DataProc2Src,
        is64,
        rd,
        rn,
        rm,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Data-processing (3-source): MADD/MSUB
// ---------------------------------------------------------------------
fn decode_data_proc_3src(word: u32) -> Option<Instruction> {
    if bits(word, 28, 24) != 0b11011 {
        return None;
    }
    if bits(word, 23, 21) != 0b000 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let rm = bits(word, 20, 16) as u8;
    let o0 = bit(word, 15);
    let ra = bits(word, 14, 10) as u8;
    let rn = bits(word, 9, 5) as u8;
    let rd = bits(word, 4, 0) as u8;

    Some(Instruction {
        op: if o0 == 1 { Op::Msub } else { Op::Madd },
        format: Format::DataProc3Src,
        is64,
        rd,
        rn,
        rm,
        rt2: ra,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Data-processing register: add/sub (shifted) and logical (shifted)
// ---------------------------------------------------------------------
fn decode_dp_reg(word: u32) -> Option<Instruction> {
    let top = bits(word, 28, 24);
    if top == 0b01011 {
        // add/sub, shifted register. Extended-register form (bit21=1) is
        // not modeled.
        if bit(word, 21) != 0 {
            return None;
        }
        let is64 = bit(word, 31) != 0;
        let is_sub = bit(word, 30) != 0;
        let set_flags = bit(word, 29) != 0;
        let shift_type = ShiftType::from_bits(bits(word, 23, 22));
        let rm = bits(word, 20, 16) as u8;
        let imm6 = bits(word, 15, 10);
        let rn = bits(word, 9, 5) as u8;
        let rd = bits(word, 4, 0) as u8;
        return Some(Instruction {
            op: if is_sub { Op::Sub } else { Op::Add },
            format: Format::DPReg,
            is64,
            set_flags,
            rd,
            rn,
            rm,
            shift_type,
            shift_amount: imm6,
            ..Instruction::default()
        });
    }
    if top == 0b01010 {
        // logical, shifted register. N=1 (BIC/ORN/EON/BICS) not modeled.
        if bit(word, 21) != 0 {
            return None;
        }
        let is64 = bit(word, 31) != 0;
        let opc = bits(word, 30, 29);
        let shift_type = ShiftType::from_bits(bits(word, 23, 22));
        let rm = bits(word, 20, 16) as u8;
        let imm6 = bits(word, 15, 10);
        let rn = bits(word, 9, 5) as u8;
        let rd = bits(word, 4, 0) as u8;
        let (op, set_flags) = match opc {
            0b00 => (Op::And, false),
            0b01 => (Op::Orr, false),
            0b10 => (Op::Eor, false),
            0b11 => (Op::And, true),
            _ => unreachable!(),
        };
        return Some(Instruction {
            op,
            format: Format::DPReg,
            is64,
            set_flags,
            rd,
            rn,
            rm,
            shift_type,
            shift_amount: imm6,
            ..Instruction::default()
        });
    }
    None
}

// ---------------------------------------------------------------------
// Unconditional branch immediate (B/BL)
// ---------------------------------------------------------------------
fn decode_unconditional_branch(word: u32) -> Option<Instruction> {
    let top = bits(word, 31, 26);
    if top != 0b000101 && top != 0b100101 {
        return None;
    }
    let is_bl = top == 0b100101;
    let imm26 = bits(word, 25, 0);
    Some(Instruction {
        op: if is_bl { Op::Bl } else { Op::B },
        format: Format::Branch,
        branch_offset: sign_extend(imm26, 26) * 4,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Conditional branch (B.cond)
// ---------------------------------------------------------------------
fn decode_cond_branch(word: u32) -> Option<Instruction> {
    if bits(word, 31, 25) != 0b0101010 || bit(word, 4) != 0 {
        return None;
    }
    let imm19 = bits(word, 23, 5);
    let cond = Cond::from_bits(bits(word, 3, 0));
    Some(Instruction {
        op: Op::BCond,
        format: Format::BranchCond,
        cond,
        branch_offset: sign_extend(imm19, 19) * 4,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Branch register (BR/BLR/RET)
// ---------------------------------------------------------------------
fn decode_branch_reg(word: u32) -> Option<Instruction> {
    if bits(word, 31, 25) != 0b1101011 || bits(word, 15, 10) != 0 || bits(word, 4, 0) != 0 {
        return None;
    }
    let opc = bits(word, 24, 21);
    let rn = bits(word, 9, 5) as u8;
    let op = match opc {
        0b0000 => Op::Br,
        0b0001 => Op::Blr,
        0b0010 => Op::Ret,
        _ => return None,
    };
    Some(Instruction {
        op,
        format: Format::BranchReg,
        rn,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Exception generation (SVC/BRK)
// ---------------------------------------------------------------------
fn decode_exception(word: u32) -> Option<Instruction> {
    if bits(word, 31, 24) != 0b1101_0100 {
        return None;
    }
    let opc = bits(word, 23, 21);
    let imm16 = bits(word, 20, 5) as u64;
    let ll = bits(word, 1, 0);
    let op = match (opc, ll) {
        (0b000, 0b01) => Op::Svc,
        (0b001, 0b00) => Op::Brk,
        _ => return None,
    };
    Some(Instruction {
        op,
        format: Format::Exception,
        imm: imm16,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Compare-and-branch (CBZ/CBNZ)
// ---------------------------------------------------------------------
fn decode_compare_branch(word: u32) -> Option<Instruction> {
    if bits(word, 30, 25) != 0b011010 {
        return None;
    }
    let is64 = bit(word, 31) != 0;
    let is_nz = bit(word, 24) != 0;
    let imm19 = bits(word, 23, 5);
    let rt = bits(word, 4, 0) as u8;
    Some(Instruction {
        op: if is_nz { Op::Cbnz } else { Op::Cbz },
        format: Format::CompareBranch,
        is64,
        rd: rt,
        branch_offset: sign_extend(imm19, 19) * 4,
        ..Instruction::default()
    })
}

// ---------------------------------------------------------------------
// Test-and-branch (TBZ/TBNZ)
// ---------------------------------------------------------------------
fn decode_test_branch(word: u32) -> Option<Instruction> {
    if bits(word, 30, 25) != 0b011011 {
        return None;
    }
    let b5 = bit(word, 31);
    let is_nz = bit(word, 24) != 0;
    let b40 = bits(word, 23, 19);
    let imm14 = bits(word, 18, 5);
    let rt = bits(word, 4, 0) as u8;
    let bit_pos = (b5 << 5) | b40;
    Some(Instruction {
        op: if is_nz { Op::Tbnz } else { Op::Tbz },
        format: Format::TestBranch,
        rd: rt,
        imm: bit_pos as u64,
        branch_offset: sign_extend(imm14, 14) * 4,
        ..Instruction::default()
    })
}
