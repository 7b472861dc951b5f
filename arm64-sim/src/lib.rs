//! Cycle-accurate user-space AArch64 simulator.
//!
//! Built on top of [`arm64_asm`]'s pure decoder, this crate owns the state a
//! running guest needs: a [`registers::RegisterFile`], a [`memory::Memory`],
//! the Linux user-mode [`syscall`] layer, a functional [`Interpreter`], and a
//! cycle-accurate [`timing::Pipeline`] that reuses the same functional
//! semantics for its execute stage.
//!
//! The functional [`Interpreter`] and the timing [`timing::Pipeline`] are
//! independent consumers of the same [`exec`] module: one retires an
//! instruction per `step()` with no notion of cycles, the other models
//! fetch/decode/execute/memory/writeback with forwarding, hazards, branch
//! prediction, and caches.

// Unlike `arm64-asm`, this crate talks to the host filesystem for the
// syscall layer (§4.4) and so is not meaningfully `no_std`.

pub mod config;
pub mod error;
pub mod exec;
pub mod interpreter;
pub mod memory;
pub mod registers;
pub mod syscall;
pub mod timing;

pub use config::Config;
pub use error::{Error, Result};
pub use interpreter::Interpreter;
pub use memory::Memory;
pub use registers::RegisterFile;
