//! End-to-end scenarios driving the full public API: an ELF-style
//! segment load followed by a functional run to completion, the way a
//! loader crate sitting on top of `arm64-sim` would use it.

use arm64_asm::encode;
use arm64_sim::memory::Segment;
use arm64_sim::{Config, Interpreter};

fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn loads_a_text_segment_and_runs_to_exit() {
    let text = words_to_bytes(&[
        encode::movz(true, 0, 10, 0),
        encode::movz(true, 1, 20, 0),
        encode::add_reg(true, false, 0, 0, 1),
        encode::movz(true, 8, 93, 0),
        encode::svc(0),
    ]);

    let mut interp = Interpreter::new(Config::default());
    interp.memory.load_segments(&[Segment {
        vaddr: 0,
        bytes: text,
        mem_size: 0x1000,
        writable: false,
        executable: true,
    }]);

    let exit = interp.run().unwrap();
    assert_eq!(exit, 30);
}

#[test]
fn bss_beyond_file_bytes_reads_as_zero() {
    let text = words_to_bytes(&[
        encode::ldr_imm(true, 0, 1, 0), // LDR X0, [X1], X1 points into bss
        encode::movz(true, 8, 93, 0),
        encode::svc(0),
    ]);
    let mut interp = Interpreter::new(Config::default());
    interp.memory.load_segments(&[
        Segment { vaddr: 0, bytes: text, mem_size: 0x1000, writable: false, executable: true },
        Segment { vaddr: 0x2000, bytes: Vec::new(), mem_size: 0x1000, writable: true, executable: false },
    ]);
    interp.registers.write_or_drop(1, 0x2000);
    let exit = interp.run().unwrap();
    assert_eq!(exit, 0);
}

#[test]
fn a_self_modifying_style_rerun_after_reset_repeats_the_same_result() {
    let text = words_to_bytes(&[
        encode::movz(true, 0, 7, 0),
        encode::movz(true, 8, 93, 0),
        encode::svc(0),
    ]);
    let mut interp = Interpreter::new(Config::default());
    interp.memory.load_segments(&[Segment {
        vaddr: 0,
        bytes: text,
        mem_size: 0x1000,
        writable: false,
        executable: true,
    }]);

    assert_eq!(interp.run().unwrap(), 7);
    interp.reset();
    assert_eq!(interp.run().unwrap(), 7);
    assert_eq!(interp.instructions_retired(), 3);
}

#[test]
fn decode_failure_surfaces_the_faulting_pc() {
    let mut interp = Interpreter::new(Config::default());
    interp.memory.load_segments(&[Segment {
        vaddr: 0,
        bytes: vec![0u8; 4], // all-zero word decodes to Unknown
        mem_size: 0x1000,
        writable: false,
        executable: true,
    }]);
    let err = interp.run().unwrap_err();
    assert_eq!(err, arm64_sim::Error::DecodeFailure { pc: 0 });
}
