//! Multi-cycle execute latencies.
//!
//! Divide latency is deterministic given the same operands, resolved
//! here the way real dividers behave: a power-of-two divisor lets the
//! unit shortcut to a shift, so it gets the fast latency; everything
//! else pays the slow one. Multiply has a single fixed latency; there's
//! no analogous fast path to model.

use arm64_asm::{Format, Instruction, Op};

use crate::config::Latencies;

/// Cycles EX should hold `instr` for, or `None` if it retires in the
/// ordinary single cycle every other instruction takes.
pub fn multi_cycle_latency(instr: &Instruction, divisor: u64, latencies: &Latencies) -> Option<u32> {
    match instr.format {
        Format::DataProc3Src => Some(latencies.multiply),
        Format::DataProc2Src => match instr.op {
            Op::Udiv | Op::Sdiv => Some(divide_latency(divisor, latencies)),
            _ => None,
        },
        _ => None,
    }
}

fn divide_latency(divisor: u64, latencies: &Latencies) -> u32 {
    if divisor != 0 && divisor.is_power_of_two() {
        latencies.divide_min
    } else {
        latencies.divide_max
    }
}
