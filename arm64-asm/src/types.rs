//! Value types shared by [`crate::Instruction`].

/// The operation a decoded instruction performs.
///
/// `Unknown` is a legal value — the decoder never fails to produce an
/// `Instruction`, it only ever fails to *classify* one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Op {
    Add,
    Sub,
    And,
    Orr,
    Eor,
    Lsl,
    Lsr,
    Asr,
    Ror,
    Ubfm,
    Sbfm,
    Bfm,
    Extr,
    Movz,
    Movn,
    Movk,
    Adr,
    Adrp,
    Ldr,
    Ldrh,
    Ldrb,
    Ldrsw,
    Ldrsh,
    Ldrsb,
    Str,
    Strh,
    Strb,
    Ldp,
    Stp,
    B,
    Bl,
    BCond,
    Br,
    Blr,
    Ret,
    Cbz,
    Cbnz,
    Tbz,
    Tbnz,
    Csel,
    Csinc,
    Csinv,
    Csneg,
    Ccmp,
    Ccmn,
    Udiv,
    Sdiv,
    Lslv,
    Lsrv,
    Asrv,
    Rorv,
    Madd,
    Msub,
    Svc,
    Nop,
    Brk,
    Vadd,
    Vsub,
    Vmul,
    Vfadd,
    Vfsub,
    Vfmul,
    Ldrq,
    Strq,
    /// No classification pattern matched this bit pattern.
    Unknown,
}

/// Encoding class, used to pick the operand-decode routine and later to
/// pick the functional-execution routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    DPImm,
    DPReg,
    LogicalImm,
    Bitfield,
    Extract,
    Branch,
    BranchCond,
    BranchReg,
    LoadStore,
    LoadStorePair,
    LoadStoreLit,
    PCRel,
    MoveWide,
    Exception,
    CondSelect,
    CondCmp,
    DataProc2Src,
    DataProc3Src,
    TestBranch,
    CompareBranch,
    SIMDReg,
    SIMDLoadStore,
    /// Bit pattern matched no class; `op` will be `Op::Unknown`.
    Unallocated,
}

/// Barrel-shifter kind applied to a data-processing register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShiftType {
    #[default]
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    /// Decode the 2-bit shift-type field used by DPReg / logical-register
    /// encodings.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

/// Index-register extension for the register-offset load/store
/// addressing form (`option` field, bits `[15:13]`). `Lsl` and `Sxtx`
/// both pass the 64-bit index register through unextended — `Lsl` is
/// the alias ARM assembly uses for that case (`UXTX` is never spelled
/// out in practice) — only `Uxtw`/`Sxtw` truncate-then-extend the
/// index from a 32-bit `Wm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtendType {
    Uxtw,
    #[default]
    Lsl,
    Sxtw,
    Sxtx,
}

impl ExtendType {
    /// Decode the 3-bit `option` field of a register-offset load/store.
    /// `None` for the reserved encodings (bit 1 of `option` must be set;
    /// the remaining four combinations aren't allocated for this form).
    pub const fn from_option(option: u32) -> Option<Self> {
        match option & 0b111 {
            0b010 => Some(Self::Uxtw),
            0b011 => Some(Self::Lsl),
            0b110 => Some(Self::Sxtw),
            0b111 => Some(Self::Sxtx),
            _ => None,
        }
    }
}

/// Addressing mode for load/store and load/store-pair instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexMode {
    #[default]
    None,
    PreIndex,
    PostIndex,
    SignedOffset,
    RegBase,
}

/// SIMD element-layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arrangement {
    #[default]
    B8,
    B16,
    H4,
    H8,
    S2,
    S4,
    D2,
}

impl Arrangement {
    /// Element width in bits.
    pub const fn elem_bits(self) -> u32 {
        match self {
            Self::B8 | Self::B16 => 8,
            Self::H4 | Self::H8 => 16,
            Self::S2 | Self::S4 => 32,
            Self::D2 => 64,
        }
    }

    /// Number of elements in the arrangement.
    pub const fn lanes(self) -> u32 {
        match self {
            Self::B8 => 8,
            Self::B16 => 16,
            Self::H4 => 4,
            Self::H8 => 8,
            Self::S2 => 2,
            Self::S4 => 4,
            Self::D2 => 2,
        }
    }

    /// Whether this arrangement only occupies the low 64 bits of a SIMD
    /// register (so the upper 64 bits must be cleared after the op).
    pub const fn is_64bit(self) -> bool {
        matches!(self, Self::B8 | Self::H4 | Self::S2)
    }
}

/// 4-bit ARM condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cond {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    Nv,
}

impl Cond {
    /// Decode the 4-bit condition field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xf {
            0b0000 => Self::Eq,
            0b0001 => Self::Ne,
            0b0010 => Self::Cs,
            0b0011 => Self::Cc,
            0b0100 => Self::Mi,
            0b0101 => Self::Pl,
            0b0110 => Self::Vs,
            0b0111 => Self::Vc,
            0b1000 => Self::Hi,
            0b1001 => Self::Ls,
            0b1010 => Self::Ge,
            0b1011 => Self::Lt,
            0b1100 => Self::Gt,
            0b1101 => Self::Le,
            0b1110 => Self::Al,
            _ => Self::Nv,
        }
    }

    /// The 4-bit encoding of this condition.
    pub const fn to_bits(self) -> u32 {
        match self {
            Self::Eq => 0b0000,
            Self::Ne => 0b0001,
            Self::Cs => 0b0010,
            Self::Cc => 0b0011,
            Self::Mi => 0b0100,
            Self::Pl => 0b0101,
            Self::Vs => 0b0110,
            Self::Vc => 0b0111,
            Self::Hi => 0b1000,
            Self::Ls => 0b1001,
            Self::Ge => 0b1010,
            Self::Lt => 0b1011,
            Self::Gt => 0b1100,
            Self::Le => 0b1101,
            Self::Al => 0b1110,
            Self::Nv => 0b1111,
        }
    }

    /// Invert the condition (used by CCMP's "else load NZCV" path has no
    /// inverse, but B.cond's `NE` vs `EQ` pairing and similar aliasing does).
    pub const fn invert(self) -> Self {
        Self::from_bits(self.to_bits() ^ 1)
    }
}
