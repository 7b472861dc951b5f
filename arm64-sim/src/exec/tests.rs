use super::*;
use arm64_asm::{decode, encode, Cond};

fn inputs(rn: u64, rm: u64) -> AluInputs {
    AluInputs {
        rn,
        rm,
        ..Default::default()
    }
}

#[test]
fn add_sets_carry_on_unsigned_overflow() {
    let instr = decode(encode::add_reg(true, true, 0, 1, 2));
    let out = compute_alu(&instr, inputs(u64::MAX, 1));
    assert_eq!(out.value, 0);
    assert!(out.flags.z());
    assert!(out.flags.c());
    assert!(!out.flags.v());
}

#[test]
fn add_sets_overflow_on_signed_overflow() {
    let instr = decode(encode::add_reg(true, true, 0, 1, 2));
    let out = compute_alu(&instr, inputs(i64::MAX as u64, 1));
    assert!(out.flags.n());
    assert!(out.flags.v());
}

#[test]
fn sub_carry_is_not_borrow() {
    let instr = decode(encode::sub_reg(true, true, 0, 1, 2));
    // 5 - 3: no borrow, C set.
    let out = compute_alu(&instr, inputs(5, 3));
    assert_eq!(out.value, 2);
    assert!(out.flags.c());

    // 3 - 5: borrow, C clear.
    let out = compute_alu(&instr, inputs(3, 5));
    assert!(!out.flags.c());
    assert!(out.flags.n());
}

#[test]
fn logical_ops_clear_carry_and_overflow() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.set_flags = true;
    let out = compute_alu(&instr, inputs(0xff, 0x0f));
    assert_eq!(out.value, 0x0f);
    assert!(!out.flags.c());
    assert!(!out.flags.v());
}

#[test]
fn logical_ops_match_spec_example() {
    let and = decode(encode::and_reg(true, 2, 0, 1));
    let orr = decode(encode::orr_reg(true, 3, 0, 1));
    let eor = decode(encode::eor_reg(true, 4, 0, 1));
    assert_eq!(compute_alu(&and, inputs(0xff, 0x0f)).value, 0x0f);
    assert_eq!(compute_alu(&orr, inputs(0xff, 0x0f)).value, 0xff);
    assert_eq!(compute_alu(&eor, inputs(0xff, 0x0f)).value, 0xf0);
}

#[test]
fn movz_zeros_other_bits_movk_preserves_them() {
    let movz = decode(encode::movz(true, 0, 0x1234, 0));
    let out = compute_alu(&movz, AluInputs::default());
    assert_eq!(out.value, 0x1234);

    let movk = decode(encode::movk(true, 0, 0xbeef, 1));
    let out = compute_alu(
        &movk,
        AluInputs {
            rd_old: 0x0000_0000_0000_1234,
            ..Default::default()
        },
    );
    assert_eq!(out.value, 0x0000_beef_0000_1234);
}

#[test]
fn movn_inverts_bits() {
    let movn = decode(encode::movn(true, 0, 0, 0));
    let out = compute_alu(&movn, AluInputs::default());
    assert_eq!(out.value, u64::MAX);
}

#[test]
fn adr_adds_pc_relative_offset() {
    // ADR Xd, #2 : immlo=2 (bits[30:29]), immhi=0.
    let word = (0b10000u32 << 24) | (2 << 29);
    let instr = decode(word);
    assert_eq!(instr.op, arm64_asm::Op::Adr);
    let out = compute_alu(&instr, AluInputs { pc: 0x1000, ..Default::default() });
    assert_eq!(out.value, 0x1000 + 2);
}

#[test]
fn adrp_masks_pc_to_page_before_adding() {
    let word = (1u32 << 31) | (0b10000 << 24) | (1 << 5);
    let instr = decode(word);
    assert_eq!(instr.op, arm64_asm::Op::Adrp);
    let out = compute_alu(&instr, AluInputs { pc: 0x1234, ..Default::default() });
    assert_eq!(out.value, 0x1000 + 4096);
}

#[test]
fn cond_select_family() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.op = arm64_asm::Op::Csinc;
    instr.format = arm64_asm::Format::CondSelect;
    instr.cond = Cond::Eq;

    let taken = compute_alu(&instr, AluInputs { rn: 7, rm: 9, flags_in: Nzcv::Z, ..Default::default() });
    assert_eq!(taken.value, 7, "condition true selects Rn");

    let not_taken = compute_alu(&instr, AluInputs { rn: 7, rm: 9, flags_in: Nzcv::empty(), ..Default::default() });
    assert_eq!(not_taken.value, 10, "CSINC: false branch increments Rm");
}

#[test]
fn ccmp_taken_evaluates_comparison_else_loads_immediate_flags() {
    let word = (1u32 << 31) | (1 << 29) | (0b1101_0010 << 21) | (5 << 16) | ((Cond::Al.to_bits()) << 12) | 0b1001;
    let instr = decode(word);
    assert_eq!(instr.op, arm64_asm::Op::Ccmp);
    // AL is always true, so this evaluates Rn - imm(5) with Rn=5 -> zero.
    let out = cond_cmp(&instr, 5, 0, Nzcv::empty(), 64);
    assert!(out.flags.z());
}

#[test]
fn ccmp_not_taken_loads_nzcv_immediate() {
    let word = (1u32 << 31) | (1 << 29) | (0b1101_0010 << 21) | (5 << 16) | ((Cond::Eq.to_bits()) << 12) | 0b1001;
    let instr = decode(word);
    let out = cond_cmp(&instr, 5, 0, Nzcv::empty(), 64);
    assert_eq!(out.flags, Nzcv::from_imm4(0b1001));
}

#[test]
fn udiv_and_sdiv_by_zero_return_zero_not_trap() {
    let instr = decode(encode::add_reg(true, false, 0, 1, 2));
    let mut udiv = instr;
    udiv.op = arm64_asm::Op::Udiv;
    udiv.format = arm64_asm::Format::DataProc2Src;
    assert_eq!(compute_alu(&udiv, inputs(42, 0)).value, 0);

    let mut sdiv = instr;
    sdiv.op = arm64_asm::Op::Sdiv;
    sdiv.format = arm64_asm::Format::DataProc2Src;
    assert_eq!(compute_alu(&sdiv, inputs(42, 0)).value, 0);
}

#[test]
fn madd_and_msub() {
    let mut instr = decode(encode::add_reg(true, false, 0, 1, 2));
    instr.format = arm64_asm::Format::DataProc3Src;
    instr.op = arm64_asm::Op::Madd;
    let out = compute_alu(
        &instr,
        AluInputs {
            rn: 3,
            rm: 4,
            ra: 10,
            ..Default::default()
        },
    );
    assert_eq!(out.value, 22);

    instr.op = arm64_asm::Op::Msub;
    let out = compute_alu(
        &instr,
        AluInputs {
            rn: 3,
            rm: 4,
            ra: 10,
            ..Default::default()
        },
    );
    assert_eq!(out.value, -2i64 as u64);
}

#[test]
fn bitfield_extract_sign_extends_for_sbfm() {
    // SXTB-equivalent: SBFM Xd, Xn, #0, #7 (sign-extend the low byte).
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.format = arm64_asm::Format::Bitfield;
    instr.op = arm64_asm::Op::Sbfm;
    instr.imm = 0; // immr
    instr.imm2 = 7; // imms
    let out = compute_alu(&instr, inputs(0xff, 0));
    assert_eq!(out.value, u64::MAX, "0xff sign-extended as a byte is -1");
}

#[test]
fn bitfield_bfm_preserves_bits_outside_field() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.format = arm64_asm::Format::Bitfield;
    instr.op = arm64_asm::Op::Bfm;
    instr.imm = 0; // immr
    instr.imm2 = 3; // imms -> 4-bit field
    let out = compute_alu(
        &instr,
        AluInputs {
            rn: 0xff,
            rd_old: 0xdead_beef_0000_00f0,
            ..Default::default()
        },
    );
    assert_eq!(out.value & 0xf, 0xf, "low nibble replaced from Rn");
    assert_eq!(out.value & !0xfu64, 0xdead_beef_0000_00f0 & !0xfu64, "other bits preserved");
}

#[test]
fn extr_concatenates_rm_high_rn_low() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.format = arm64_asm::Format::Extract;
    instr.op = arm64_asm::Op::Extr;
    instr.shift_amount = 32;
    let out = compute_alu(&instr, inputs(0x0000_0000_ffff_ffff, 0x1234_5678_0000_0000));
    // Concat = rm:rn = 0x12345678_00000000_ffffffff (128-bit); extract 64 bits at lsb 32.
    assert_eq!(out.value, 0x0000_0000_1234_5678 << 32 | 0xffff_ffff);
}

#[test]
fn simd_vadd_wraps_per_lane_and_clears_upper_for_64bit_arrangement() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.is_simd = true;
    instr.op = arm64_asm::Op::Vadd;
    instr.simd_arrangement = arm64_asm::Arrangement::S2;
    let vn = VReg::from_u128(0x0000_0001_0000_0001);
    let vm = VReg::from_u128(0xffff_ffff_0000_0001);
    let out = compute_simd(&instr, vn, vm);
    assert_eq!(out.hi, 0, "2S (64-bit arrangement) must clear upper lane");
    assert_eq!(out.elem(32, 0), 2);
    assert_eq!(out.elem(32, 1), 0, "wraps on overflow");
}

#[test]
fn simd_vfadd_double_precision() {
    let mut instr = decode(encode::and_reg(true, 0, 1, 2));
    instr.is_simd = true;
    instr.is_float = true;
    instr.op = arm64_asm::Op::Vfadd;
    instr.simd_arrangement = arm64_asm::Arrangement::D2;
    let vn = VReg::from_u64(1.5f64.to_bits());
    let vm = VReg { lo: 2.5f64.to_bits(), hi: 0.5f64.to_bits() };
    let out = compute_simd(&instr, vn, vm);
    assert_eq!(f64::from_bits(out.lo), 4.0);
    assert_eq!(f64::from_bits(out.hi), 0.5);
}

#[test]
fn countdown_loop_branch_taken_until_zero() {
    let bcond = decode(encode::b_cond(Cond::Ne.to_bits() as u8, -4));
    let taken = evaluate_branch(&bcond, 0, Nzcv::empty(), 0x100);
    assert_eq!(taken, BranchOutcome::Taken { target: 0xfc, link: false });

    let not_taken = evaluate_branch(&bcond, 0, Nzcv::Z, 0x100);
    assert_eq!(not_taken, BranchOutcome::NotTaken);
}

#[test]
fn cbz_cbnz_respect_register_width() {
    let cbz = decode(encode::cbz(false, 0, 8));
    // Upper 32 bits nonzero but lower 32 bits zero: still "zero" for a W compare.
    let out = evaluate_branch(&cbz, 0xffff_ffff_0000_0000, Nzcv::empty(), 0x1000);
    assert_eq!(out, BranchOutcome::Taken { target: 0x1008, link: false });
}

#[test]
fn bl_and_blr_report_link_true() {
    let bl = decode(encode::bl(16));
    assert_eq!(evaluate_branch(&bl, 0, Nzcv::empty(), 0x1000), BranchOutcome::Taken { target: 0x1010, link: true });

    let blr = decode(encode::blr(5));
    assert_eq!(evaluate_branch(&blr, 0x2000, Nzcv::empty(), 0x1000), BranchOutcome::Taken { target: 0x2000, link: true });
}

#[test]
fn b_is_foldable_bl_is_not() {
    assert!(is_foldable(&decode(encode::b(4))));
    assert!(!is_foldable(&decode(encode::bl(4))));
}

#[test]
fn pre_and_post_index_addressing_writeback() {
    let pre = arm64_asm::Instruction {
        index_mode: IndexMode::PreIndex,
        signed_imm: 16,
        ..decode(encode::ldr_imm(true, 0, 1, 0))
    };
    let result = compute_address(&pre, 0x1000, 0, 0);
    assert_eq!(result.address, 0x1010);
    assert_eq!(result.writeback, Some(0x1010));

    let post = arm64_asm::Instruction {
        index_mode: IndexMode::PostIndex,
        signed_imm: 16,
        ..decode(encode::ldr_imm(true, 0, 1, 0))
    };
    let result = compute_address(&post, 0x1000, 0, 0);
    assert_eq!(result.address, 0x1000);
    assert_eq!(result.writeback, Some(0x1010));
}

#[test]
fn reg_offset_address_zero_extends_uxtw_index() {
    let instr = decode(encode::ldr_reg(true, 0, 1, 2, 0b010, false));
    // Wm index with its top bit set must not sign-extend under UXTW.
    let result = compute_address(&instr, 0x1000, 0xffff_ffff, 0);
    assert_eq!(result.address, 0x1000 + 0xffff_ffff);
}

#[test]
fn reg_offset_address_sign_extends_sxtw_index() {
    let instr = decode(encode::ldr_reg(true, 0, 1, 2, 0b110, false));
    let result = compute_address(&instr, 0x1000, 0xffff_ffff, 0);
    assert_eq!(result.address, 0x1000u64.wrapping_sub(1));
}

#[test]
fn reg_offset_address_lsl_passes_full_width_index() {
    let instr = decode(encode::ldr_reg(true, 0, 1, 2, 0b011, true));
    let result = compute_address(&instr, 0x1000, 1, 0);
    assert_eq!(result.address, 0x1000 + (1 << 3));
}

#[test]
fn extend_loaded_sign_extends_byte_to_requested_width() {
    assert_eq!(extend_loaded(0xff, 1, true, true), u64::MAX);
    assert_eq!(extend_loaded(0xff, 1, true, false), 0xffff_ffff);
    assert_eq!(extend_loaded(0xff, 1, false, true), 0xff);
}

#[quickcheck_macros::quickcheck]
fn add_flags_agree_with_widening_reference(a: u32, b: u32) -> bool {
    let (value, flags) = add_with_flags(a as u64, b as u64, 32);
    let expect = (a as u64) + (b as u64);
    let expect_c = expect > u32::MAX as u64;
    value as u64 == (expect & 0xffff_ffff) && flags.c() == expect_c
}
