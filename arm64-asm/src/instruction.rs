//! The typed record produced by [`crate::decode`].

use crate::types::{Arrangement, Cond, ExtendType, Format, IndexMode, Op, ShiftType};

/// A fully decoded AArch64 instruction.
///
/// Once built by [`crate::decode`] no field is ever mutated — the
/// executor reads it and produces new register/memory state, it never
/// rewrites the `Instruction` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub op: Op,
    pub format: Format,
    pub is64: bool,
    pub set_flags: bool,

    /// Destination / first source register index, `[0, 31]`.
    pub rd: u8,
    /// Second source register index, `[0, 31]`.
    pub rn: u8,
    /// Third source register index, `[0, 31]`.
    pub rm: u8,
    /// Second destination register for pair load/store, `[0, 31]`.
    pub rt2: u8,

    /// First general-purpose immediate slot. Wide enough to carry a fully
    /// decoded move-wide or logical-immediate value (up to 64 bits).
    pub imm: u64,
    /// Second immediate slot (bitfield `imms`, CCMP 5-bit operand, or the
    /// CCMP/CCMN 4-bit NZCV-else immediate).
    pub imm2: u64,

    pub shift_type: ShiftType,
    pub shift_amount: u32,

    /// Already scaled, sign-extended byte offset for branch formats.
    pub branch_offset: i64,

    pub cond: Cond,

    pub index_mode: IndexMode,
    /// Signed byte offset for indexed/pair addressing.
    pub signed_imm: i64,
    /// Index-register extension, only meaningful when `index_mode` is
    /// `RegBase`.
    pub extend_type: ExtendType,

    pub simd_arrangement: Arrangement,
    pub is_simd: bool,
    pub is_float: bool,
}

impl Default for Instruction {
    /// An `Unknown` instruction — the value the decoder returns for any
    /// unclassified bit pattern.
    fn default() -> Self {
        Self {
            op: Op::Unknown,
            format: Format::Unallocated,
            is64: false,
            set_flags: false,
            rd: 0,
            rn: 0,
            rm: 0,
            rt2: 0,
            imm: 0,
            imm2: 0,
            shift_type: ShiftType::Lsl,
            shift_amount: 0,
            branch_offset: 0,
            cond: Cond::Al,
            index_mode: IndexMode::None,
            signed_imm: 0,
            extend_type: ExtendType::Lsl,
            simd_arrangement: Arrangement::B8,
            is_simd: false,
            is_float: false,
        }
    }
}

impl Instruction {
    pub const SIZE: usize = 4;

    /// Width in bits of the operand registers for this instruction (32 or
    /// 64). SIMD/vector widths are governed by `simd_arrangement` instead.
    pub const fn reg_width(&self) -> u32 {
        if self.is64 {
            64
        } else {
            32
        }
    }

    /// True if the decoder failed to classify the instruction. Fatal;
    /// the caller must treat this as a `DecodeFailure`.
    pub const fn is_unknown(&self) -> bool {
        matches!(self.op, Op::Unknown)
    }
}

impl core::fmt::Display for Instruction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_unknown() {
            return write!(f, "unknown");
        }
        write!(f, "{}", self.op)?;
        match self.format {
            Format::Branch | Format::BranchCond | Format::CompareBranch | Format::TestBranch => {
                write!(f, " #{:+}", self.branch_offset)
            }
            Format::BranchReg => write!(f, " x{}", self.rn),
            Format::LoadStore | Format::LoadStorePair | Format::SIMDLoadStore => {
                write!(f, " r{}, [x{}, #{}]", self.rd, self.rn, self.signed_imm)
            }
            _ => write!(f, " r{}, r{}, r{}", self.rd, self.rn, self.rm),
        }
    }
}
