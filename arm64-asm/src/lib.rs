//! AArch64 instruction decoder.
//!
//! [`decode`] is a pure function from a 32-bit instruction word to a typed
//! [`Instruction`]. It never fails: an unrecognized bit pattern decodes to
//! an [`Instruction`] whose `op` is [`Op::Unknown`] — the caller decides
//! whether that is fatal.
//!
//! This crate has no knowledge of registers, memory, or execution; it only
//! classifies bits. See `arm64-sim` for the functional and timing models
//! that consume [`Instruction`].

#![cfg_attr(not(feature = "std"), no_std)]

mod cond;
mod decode;
pub mod encode;
mod instruction;
mod types;

pub use cond::{check_condition, Nzcv};
pub use decode::decode;
pub use instruction::Instruction;
pub use types::{Arrangement, Cond, ExtendType, Format, IndexMode, Op, ShiftType};
