//! PSTATE condition flags and the ARM condition-code truth table.

use crate::types::Cond;

bitflags::bitflags! {
    /// The 4-bit NZCV condition-flag register.
    ///
    /// Kept as a plain value type here (rather than on the register file
    /// in `arm64-sim`) so both the functional engine and the timing
    /// pipeline's per-slot forwarding logic can pass it around and compare
    /// it like any other forwarded value.
    #[derive(Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Nzcv: u8 {
        /// Negative: result bit (width-1) was set.
        const N = 0b1000;
        /// Zero: result was zero.
        const Z = 0b0100;
        /// Carry (unsigned overflow for ADD, NOT borrow for SUB).
        const C = 0b0010;
        /// Signed overflow.
        const V = 0b0001;
    }
}

impl Nzcv {
    /// Build from the four flags directly.
    pub const fn from_bools(n: bool, z: bool, c: bool, v: bool) -> Self {
        let mut bits = 0u8;
        if n {
            bits |= Self::N.bits();
        }
        if z {
            bits |= Self::Z.bits();
        }
        if c {
            bits |= Self::C.bits();
        }
        if v {
            bits |= Self::V.bits();
        }
        Self::from_bits_truncate(bits)
    }

    /// Build from the 4-bit immediate CCMP/CCMN encode in bits [3:0] as
    /// N:Z:C:V, same layout as the flag register itself.
    pub const fn from_imm4(imm4: u32) -> Self {
        Self::from_bits_truncate((imm4 & 0xf) as u8)
    }

    pub const fn n(self) -> bool {
        self.contains(Self::N)
    }
    pub const fn z(self) -> bool {
        self.contains(Self::Z)
    }
    pub const fn c(self) -> bool {
        self.contains(Self::C)
    }
    pub const fn v(self) -> bool {
        self.contains(Self::V)
    }
}

/// Evaluate the standard 16-entry ARM condition table against `flags`.
///
/// `AL` and `NV` both always evaluate true — ARMv8 defines `NV` as a
/// reserved alias of `AL` in data-processing contexts.
pub const fn check_condition(cond: Cond, flags: Nzcv) -> bool {
    let (n, z, c, v) = (flags.n(), flags.z(), flags.c(), flags.v());
    match cond {
        Cond::Eq => z,
        Cond::Ne => !z,
        Cond::Cs => c,
        Cond::Cc => !c,
        Cond::Mi => n,
        Cond::Pl => !n,
        Cond::Vs => v,
        Cond::Vc => !v,
        Cond::Hi => c && !z,
        Cond::Ls => !c || z,
        Cond::Ge => n == v,
        Cond::Lt => n != v,
        Cond::Gt => !z && (n == v),
        Cond::Le => z || (n != v),
        Cond::Al | Cond::Nv => true,
    }
}
