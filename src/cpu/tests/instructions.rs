//! Instruction-level tests: ALU, registers, ports, data movement

use super::*;

#[test]
fn test_reset_state() {
    let cpu = Cpu::new();
    assert_eq!(cpu.pc, 0);
    assert_eq!(cpu.acc, 0);
    assert_eq!(cpu.psw, 0x08);
    assert_eq!(cpu.sp(), 0);
    assert_eq!(cpu.rb, 0);
    assert_eq!(cpu.mb, 0);
    assert_eq!(cpu.cycles, 0);
    assert!(cpu.irq);
    assert_eq!(cpu.ports.p1, 0x00);
    assert_eq!(cpu.ports.p2, 0xFF);
    assert_eq!(cpu.ports.bus, 0xFF);
}

#[test]
fn test_reset_preserves_ram() {
    let mut cpu = run_steps(&[0xB8, 0x42], 1); // MOV R0,#0x42
    assert_eq!(cpu.ram()[0], 0x42);
    cpu.reset();
    assert_eq!(cpu.ram()[0], 0x42);
    assert_eq!(cpu.pc, 0);
}

#[test]
fn test_add_sets_carry_on_overflow() {
    // MOV A,#0xFF; ADD A,#1
    let cpu = run_steps(&[0x23, 0xFF, 0x03, 0x01], 2);
    assert_eq!(cpu.acc, 0x00);
    assert_eq!(cpu.psw & 0x80, 0x80);
    assert_eq!(cpu.cycles, 4);
}

#[test]
fn test_add_clears_carry_without_overflow() {
    // MOV A,#0xFF; ADD A,#1 (sets carry); ADD A,#1 (must clear it)
    let cpu = run_steps(&[0x23, 0xFF, 0x03, 0x01, 0x03, 0x01], 3);
    assert_eq!(cpu.acc, 0x01);
    assert_eq!(cpu.psw & 0x80, 0);
}

#[test]
fn test_addc_adds_carry_in() {
    // MOV A,#0xFF; ADD A,#1 -> carry; ADDC A,#0 -> 0x01, carry clear
    let cpu = run_steps(&[0x23, 0xFF, 0x03, 0x01, 0x13, 0x00], 3);
    assert_eq!(cpu.acc, 0x01);
    assert_eq!(cpu.psw & 0x80, 0);
}

#[test]
fn test_add_register_and_indirect() {
    // MOV R0,#0x20; MOV @R0,#0x30; MOV A,#0x12; ADD A,@R0; MOV R1,#3; ADD A,R1
    let rom = [0xB8, 0x20, 0xB0, 0x30, 0x23, 0x12, 0x60, 0xB9, 0x03, 0x69];
    let cpu = run_steps(&rom, 6);
    assert_eq!(cpu.acc, 0x12 + 0x30 + 0x03);
    assert_eq!(cpu.psw & 0x80, 0);
}

#[test]
fn test_bank_switch_register_write() {
    // SEL RB1; MOV R0,#0x42; SEL RB0
    let cpu = run_steps(&[0xD5, 0xB8, 0x42, 0xC5], 3);
    assert_eq!(cpu.ram()[24], 0x42);
    assert_eq!(cpu.ram()[0], 0x00);
    assert_eq!(cpu.rb, 0);
    assert_eq!(cpu.psw & 0x10, 0);
}

#[test]
fn test_bank_select_mirrors_psw() {
    let (mut cpu, mut adb) = with_rom(&[0xD5, 0xC5]); // SEL RB1; SEL RB0
    cpu.step(&mut adb);
    assert_eq!(cpu.rb, 1);
    assert_eq!(cpu.psw & 0x10, 0x10);
    cpu.step(&mut adb);
    assert_eq!(cpu.rb, 0);
    assert_eq!(cpu.psw & 0x10, 0);
}

#[test]
fn test_cpl_and_swap_are_involutions() {
    // CPL A; CPL A; SWAP A; SWAP A
    let (mut cpu, mut adb) = with_rom(&[0x37, 0x37, 0x47, 0x47]);
    cpu.acc = 0x5C;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0xA3);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x5C);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0xC5);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x5C);
}

#[test]
fn test_rotates() {
    let (mut cpu, mut adb) = with_rom(&[0x77, 0xE7]); // RR A; RL A
    cpu.acc = 0x81;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0xC0);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x81);
}

#[test]
fn test_rrc_moves_one_bit_through_carry() {
    let (mut cpu, mut adb) = with_rom(&[0x67, 0x67]); // RRC A twice
    cpu.acc = 0x01;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x00);
    assert_eq!(cpu.psw & 0x80, 0x80);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x80);
    assert_eq!(cpu.psw & 0x80, 0);
}

#[test]
fn test_rlc_moves_one_bit_through_carry() {
    let (mut cpu, mut adb) = with_rom(&[0xF7, 0xF7]); // RLC A twice
    cpu.acc = 0x80;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x00);
    assert_eq!(cpu.psw & 0x80, 0x80);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x01);
    assert_eq!(cpu.psw & 0x80, 0);
}

#[test]
fn test_carry_flag_ops() {
    let (mut cpu, mut adb) = with_rom(&[0xA7, 0x97, 0xA7]); // CPL C; CLR C; CPL C
    cpu.step(&mut adb);
    assert_eq!(cpu.psw & 0x80, 0x80);
    cpu.step(&mut adb);
    assert_eq!(cpu.psw & 0x80, 0);
    cpu.step(&mut adb);
    assert_eq!(cpu.psw & 0x80, 0x80);
}

#[test]
fn test_user_flags() {
    // CPL F0; CPL F1; CLR F0; CLR F1
    let (mut cpu, mut adb) = with_rom(&[0x95, 0xB5, 0x85, 0xA5]);
    cpu.step(&mut adb);
    cpu.step(&mut adb);
    assert!(cpu.f0);
    assert!(cpu.f1);
    cpu.step(&mut adb);
    cpu.step(&mut adb);
    assert!(!cpu.f0);
    assert!(!cpu.f1);
}

#[test]
fn test_inc_dec_wrap() {
    let (mut cpu, mut adb) = with_rom(&[0x07, 0x17, 0x17]); // DEC A; INC A; INC A
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0xFF);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x00);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x01);
}

#[test]
fn test_inc_register_wraps() {
    // MOV R3,#0xFF; INC R3
    let cpu = run_steps(&[0xBB, 0xFF, 0x1B], 2);
    assert_eq!(cpu.get_reg(3), 0x00);
}

#[test]
fn test_indirect_access() {
    // MOV R1,#0x40; MOV @R1,#0xAA; INC @R1; MOV A,@R1
    let cpu = run_steps(&[0xB9, 0x40, 0xB1, 0xAA, 0x11, 0xF1], 4);
    assert_eq!(cpu.ram()[0x40], 0xAB);
    assert_eq!(cpu.acc, 0xAB);
}

#[test]
fn test_xch_register_and_indirect() {
    // MOV R4,#0x11; MOV A,#0x22; XCH A,R4; MOV R0,#0x30; MOV @R0,#0x33; XCH A,@R0
    let rom = [0xBC, 0x11, 0x23, 0x22, 0x2C, 0xB8, 0x30, 0xB0, 0x33, 0x20];
    let cpu = run_steps(&rom, 6);
    assert_eq!(cpu.get_reg(4), 0x22);
    // after the second exchange ACC holds the RAM byte and RAM holds 0x11
    assert_eq!(cpu.acc, 0x33);
    assert_eq!(cpu.ram()[0x30], 0x11);
}

#[test]
fn test_logic_ops() {
    // MOV A,#0xF0; ORL A,#0x0F; ANL A,#0x3C; XRL A,#0xFF
    let cpu = run_steps(&[0x23, 0xF0, 0x43, 0x0F, 0x53, 0x3C, 0xD3, 0xFF], 4);
    assert_eq!(cpu.acc, 0xC3);
}

#[test]
fn test_logic_register_forms() {
    // MOV R2,#0x0F; MOV A,#0xF0; ORL A,R2; MOV R3,#0x3C; ANL A,R3; XRL A,R2
    let rom = [0xBA, 0x0F, 0x23, 0xF0, 0x4A, 0xBB, 0x3C, 0x5B, 0xDA];
    let cpu = run_steps(&rom, 6);
    assert_eq!(cpu.acc, 0x33);
}

#[test]
fn test_timer_register_moves() {
    // MOV A,#0x7E; MOV T,A; CLR A; MOV A,T
    let cpu = run_steps(&[0x23, 0x7E, 0x62, 0x27, 0x42], 4);
    assert_eq!(cpu.t, 0x7E);
    assert_eq!(cpu.acc, 0x7E);
}

#[test]
fn test_interrupt_enables_tracked_only() {
    // EN I; EN TCNTI; DIS I; DIS TCNTI
    let (mut cpu, mut adb) = with_rom(&[0x05, 0x25, 0x15, 0x35]);
    cpu.step(&mut adb);
    cpu.step(&mut adb);
    assert!(cpu.eie);
    assert!(cpu.tie);
    let pc = cpu.pc;
    cpu.step(&mut adb);
    cpu.step(&mut adb);
    assert!(!cpu.eie);
    assert!(!cpu.tie);
    // no dispatch or other side effect
    assert_eq!(cpu.pc, pc + 2);
}

#[test]
fn test_outl_latches_port() {
    // MOV A,#0x5A; OUTL P1,A; OUTL P2,A
    let cpu = run_steps(&[0x23, 0x5A, 0x39, 0x3A], 3);
    assert_eq!(cpu.ports.p1, 0x5A);
    assert_eq!(cpu.ports.p2, 0x5A);
}

#[test]
fn test_in_reads_latch() {
    // IN A,P2 after reset reads the 0xFF latch, INS A,BUS likewise
    let cpu = run_steps(&[0x0A], 1);
    assert_eq!(cpu.acc, 0xFF);
    let cpu = run_steps(&[0x08], 1);
    assert_eq!(cpu.acc, 0xFF);
    assert_eq!(cpu.cycles, 2);
}

#[test]
fn test_port_logic_with_immediate() {
    // OUTL P1,A with A=0x0F first, then ORL P1,#0xF0 and ANL P2,#0x0F
    let rom = [0x23, 0x0F, 0x39, 0x89, 0xF0, 0x9A, 0x0F];
    let cpu = run_steps(&rom, 4);
    assert_eq!(cpu.ports.p1, 0xFF);
    assert_eq!(cpu.ports.p2, 0x0F);
}

#[test]
fn test_bus_logic_with_immediate() {
    // ANL BUS,#0x0F; ORL BUS,#0x30
    let cpu = run_steps(&[0x98, 0x0F, 0x88, 0x30], 2);
    assert_eq!(cpu.ports.bus, 0x3F);
}

#[test]
fn test_movx_is_timing_only() {
    let (mut cpu, mut adb) = with_rom(&[0x80, 0x90]); // MOVX A,@R0; MOVX @R0,A
    cpu.acc = 0x42;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x42);
    assert_eq!(cpu.cycles, 2);
    cpu.step(&mut adb);
    assert_eq!(cpu.cycles, 4);
}

#[test]
fn test_mov_psw_syncs_bank_select() {
    // MOV A,#0x1F; MOV PSW,A
    let cpu = run_steps(&[0x23, 0x1F, 0xD7], 2);
    assert_eq!(cpu.psw, 0x1F);
    assert_eq!(cpu.rb, 1);
    assert_eq!(cpu.sp(), 7);
}

#[test]
fn test_mov_a_psw() {
    // CPL C; MOV A,PSW
    let cpu = run_steps(&[0xA7, 0xC7], 2);
    assert_eq!(cpu.acc, 0x88);
}

#[test]
fn test_da_a_is_stub() {
    let (mut cpu, mut adb) = with_rom(&[0x57]);
    cpu.acc = 0x9A;
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0x9A);
    assert_eq!(cpu.cycles, 1);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_unknown_opcode_continues() {
    let (mut cpu, mut adb) = with_rom(&[0x01, 0x27]); // unknown, then CLR A
    cpu.acc = 0x55;
    cpu.step(&mut adb);
    assert_eq!(cpu.pc, 1);
    assert_eq!(cpu.cycles, 1);
    assert_eq!(cpu.acc, 0x55);
    cpu.step(&mut adb);
    assert_eq!(cpu.acc, 0);
}

#[test]
fn test_set_state_round_trip() {
    let (mut cpu, _) = with_rom(&[0x00; 16]);
    cpu.set_state("PC", 0x00F);
    assert_eq!(cpu.get_pc(), 0x00F);
    cpu.set_state("PC", 16); // rom_size itself is allowed
    assert_eq!(cpu.get_pc(), 16);
    cpu.set_state("A", 0xAB);
    assert_eq!(cpu.acc, 0xAB);
    cpu.set_state("T0", 0);
    cpu.set_state("T1", 1);
    assert!(!cpu.ports.t0);
    assert!(cpu.ports.t1);
}

#[test]
fn test_set_state_rejects_out_of_range() {
    let (mut cpu, _) = with_rom(&[0x00; 16]);
    cpu.set_state("PC", 17);
    assert_eq!(cpu.get_pc(), 0);
    cpu.set_state("A", 256);
    assert_eq!(cpu.acc, 0);
    cpu.set_state("A", -1);
    assert_eq!(cpu.acc, 0);
    cpu.set_state("R9", 1);
    cpu.set_state("FOO", 1);
}

#[test]
fn test_set_state_register_uses_active_bank() {
    let (mut cpu, mut adb) = with_rom(&[0xD5]); // SEL RB1
    cpu.set_state("R2", 0x11);
    assert_eq!(cpu.ram()[2], 0x11);
    cpu.step(&mut adb);
    cpu.set_state("R2", 0x22);
    assert_eq!(cpu.ram()[26], 0x22);
    assert_eq!(cpu.ram()[2], 0x11);
}
