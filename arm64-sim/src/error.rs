//! Runtime error types.
//!
//! A two-layer split, the same shape as `fuel-vm`'s `RuntimeError` vs
//! `InterpreterError`: [`Errno`] is the recoverable, guest-visible layer —
//! syscall failures are folded into a negative `X0` and never escape the
//! interpreter — while [`Error`] is the fatal layer that terminates a run.

use core::fmt;

/// Linux errno values the syscall layer can produce. Only the subset the
/// syscall layer actually needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Errno {
    Ebadf,
    Enoent,
    Eacces,
    Eio,
    Einval,
    Espipe,
    Enosys,
    Enomem,
}

impl Errno {
    /// The numeric value as used on the Linux AArch64 ABI.
    pub const fn value(self) -> i64 {
        match self {
            Self::Eacces => 13,
            Self::Ebadf => 9,
            Self::Enoent => 2,
            Self::Eio => 5,
            Self::Einval => 22,
            Self::Espipe => 29,
            Self::Enosys => 38,
            Self::Enomem => 12,
        }
    }

    /// The value a syscall writes into `X0` on failure: two's-complement of
    /// `-errno`.
    pub const fn to_x0(self) -> u64 {
        (-(self.value())) as u64
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.value())
    }
}

/// Fatal error kinds. Any of these terminates the run.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// No classification pattern matched the fetched word at `pc`.
    #[error("decode failure at pc={pc:#x}")]
    DecodeFailure { pc: u64 },

    /// A `BRK #imm` instruction retired.
    #[error("trap at pc={pc:#x}, immediate={immediate}")]
    Trap { pc: u64, immediate: u16 },

    /// The functional emulator's retired-instruction cap was reached.
    #[error("instruction limit exceeded: {limit}")]
    InstructionLimitExceeded { limit: u64 },

    /// The timing pipeline's cycle cap was reached.
    #[error("cycle limit exceeded: {limit}")]
    CycleLimitExceeded { limit: u64 },

    /// A syscall failed. Never escapes the interpreter under normal
    /// operation — exposed only so internal `Result` plumbing for the
    /// syscall layer has a uniform error type; callers of [`crate::Interpreter::step`]
    /// will not see this variant, as the dispatcher converts it to `-errno`
    /// in `X0` before returning.
    #[error("syscall error: {0}")]
    Syscall(Errno),
}

impl Error {
    /// The host process exit code a fatal error maps to.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InstructionLimitExceeded { .. } | Self::CycleLimitExceeded { .. } => -2,
            _ => -1,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
