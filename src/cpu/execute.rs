//! MCS-48 opcode dispatch
//!
//! One exhaustive match over the opcode byte. The encodings are
//! prefix-structured: the top five bits select most jump/call/branch
//! families, with a register or accumulator-bit index in the low three.
//! `step()` has already advanced PC past the opcode byte and charged one
//! cycle; two-cycle instructions charge the second cycle here.
//!
//! Interrupt and timer opcodes only track their enable bits, and MOVX only
//! consumes its second cycle; neither peripheral is modeled.
//!
//! # References
//! - Intel MCS-48 Family User's Manual

use log::{debug, warn};

use crate::adb::AdbHost;

use super::Cpu;

impl Cpu {
    pub(crate) fn execute(&mut self, opcode: u8, adb: &mut AdbHost) {
        match opcode {
            // ========== 0x00-0x1F ==========
            0x00 => {} // NOP
            0x03 => {
                // ADD A,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                self.pc += 1;
                self.add_acc(imm, 0);
            }
            0x04 | 0x24 | 0x44 | 0x64 | 0x84 | 0xA4 | 0xC4 | 0xE4 => {
                // JMP a11
                self.cycles += 1;
                self.pc = self.jmp_target(opcode);
            }
            0x05 => self.eie = true,  // EN I
            0x07 => self.acc = self.acc.wrapping_sub(1), // DEC A
            0x08..=0x0B => {
                // INS A,BUS / IN A,P1 / IN A,P2
                self.cycles += 1;
                match opcode & 3 {
                    0 => self.acc = self.ports.bus,
                    1 => self.acc = self.ports.p1,
                    2 => self.acc = self.ports.p2,
                    _ => warn!("invalid port {}", opcode & 3),
                }
            }
            0x10 | 0x11 => {
                // INC @R
                let ptr = self.reg(opcode & 1);
                self.ram_write(ptr, self.ram_read(ptr).wrapping_add(1));
            }
            0x12 | 0x32 | 0x52 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                // JBb a8
                self.cycles += 1;
                let mask = 1 << ((opcode >> 5) & 7);
                self.cond_jump(self.acc & mask != 0);
            }
            0x13 => {
                // ADDC A,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                self.pc += 1;
                let carry = self.carry();
                self.add_acc(imm, carry);
            }
            0x14 | 0x34 | 0x54 | 0x74 | 0x94 | 0xB4 | 0xD4 | 0xF4 => {
                // CALL a11
                self.cycles += 1;
                let addr = self.jmp_target(opcode);
                self.pc += 1;
                if (addr as usize) < self.rom_size {
                    self.push_call_frame();
                    self.pc = addr;
                } else {
                    warn!("invalid call destination {:#05X}", addr);
                }
            }
            0x15 => self.eie = false, // DIS I
            0x16 => {
                // JTF a8 - the timer is not modeled, so its flag never sets
                self.cycles += 1;
                self.cond_jump(false);
            }
            0x17 => self.acc = self.acc.wrapping_add(1), // INC A
            0x18..=0x1F => {
                // INC Rn
                let n = opcode & 7;
                let val = self.reg(n).wrapping_add(1);
                self.set_reg(n, val);
            }

            // ========== 0x20-0x3F ==========
            0x20 | 0x21 => {
                // XCH A,@R
                let ptr = self.reg(opcode & 1);
                let tmp = self.ram_read(ptr);
                self.ram_write(ptr, self.acc);
                self.acc = tmp;
            }
            0x23 => {
                // MOV A,#imm
                self.cycles += 1;
                self.acc = self.rom_byte(self.pc);
                self.pc += 1;
            }
            0x25 => self.tie = true,  // EN TCNTI
            0x26 => {
                // JNT0 a8
                self.cycles += 1;
                self.cond_jump(!self.ports.t0);
            }
            0x27 => self.acc = 0, // CLR A
            0x28..=0x2F => {
                // XCH A,Rn
                let n = opcode & 7;
                let tmp = self.reg(n);
                self.set_reg(n, self.acc);
                self.acc = tmp;
            }
            0x35 => self.tie = false, // DIS TCNTI
            0x36 => {
                // JT0 a8
                self.cycles += 1;
                self.cond_jump(self.ports.t0);
            }
            0x37 => self.acc = !self.acc, // CPL A
            0x38..=0x3B => {
                // OUTL Pp,A
                self.cycles += 1;
                let port = opcode & 3;
                if port == 1 || port == 2 {
                    self.ports.write_port(port, self.acc);
                } else {
                    warn!("invalid port {}", port);
                }
            }

            // ========== 0x40-0x5F ==========
            0x40 | 0x41 => {
                // ORL A,@R
                let ptr = self.reg(opcode & 1);
                self.acc |= self.ram_read(ptr);
            }
            0x42 => self.acc = self.t, // MOV A,T
            0x43 => {
                // ORL A,#imm
                self.cycles += 1;
                self.acc |= self.rom_byte(self.pc);
                self.pc += 1;
            }
            0x45 => {} // STRT CNT - counting not modeled
            0x46 => {
                // JNT1 a8 - the ADB host drives T1, tick it before sampling
                adb.tick(self.cycles, &mut self.ports);
                self.cycles += 1;
                self.cond_jump(!self.ports.t1);
            }
            0x47 => self.acc = self.acc.rotate_left(4), // SWAP A
            0x48..=0x4F => self.acc |= self.reg(opcode & 7), // ORL A,Rn
            0x50 | 0x51 => {
                // ANL A,@R
                let ptr = self.reg(opcode & 1);
                self.acc &= self.ram_read(ptr);
            }
            0x53 => {
                // ANL A,#imm
                self.cycles += 1;
                self.acc &= self.rom_byte(self.pc);
                self.pc += 1;
            }
            0x55 => {} // STRT T - counting not modeled
            0x56 => {
                // JT1 a8 - tick the ADB host before sampling the line
                adb.tick(self.cycles, &mut self.ports);
                self.cycles += 1;
                self.cond_jump(self.ports.t1);
            }
            0x57 => debug!("da a executed as a no-op"), // DA A
            0x58..=0x5F => self.acc &= self.reg(opcode & 7), // ANL A,Rn

            // ========== 0x60-0x7F ==========
            0x60 | 0x61 => {
                // ADD A,@R
                let ptr = self.reg(opcode & 1);
                let val = self.ram_read(ptr);
                self.add_acc(val, 0);
            }
            0x62 => self.t = self.acc, // MOV T,A
            0x65 => {} // STOP TCNT
            0x67 => {
                // RRC A
                let carry_out = self.acc & 1;
                self.acc = (self.acc >> 1) | (self.carry() << 7);
                self.set_carry(carry_out != 0);
            }
            0x68..=0x6F => {
                // ADD A,Rn
                let val = self.reg(opcode & 7);
                self.add_acc(val, 0);
            }
            0x70 | 0x71 => {
                // ADDC A,@R
                let ptr = self.reg(opcode & 1);
                let val = self.ram_read(ptr);
                let carry = self.carry();
                self.add_acc(val, carry);
            }
            0x75 => {} // ENT0 CLK - clock output not modeled
            0x76 => {
                // JF1 a8
                self.cycles += 1;
                self.cond_jump(self.f1);
            }
            0x77 => self.acc = self.acc.rotate_right(1), // RR A
            0x78..=0x7F => {
                // ADDC A,Rn
                let val = self.reg(opcode & 7);
                let carry = self.carry();
                self.add_acc(val, carry);
            }

            // ========== 0x80-0x9F ==========
            0x80 | 0x81 => self.cycles += 1, // MOVX A,@R - external data memory absent
            0x83 => {
                // RET
                self.cycles += 1;
                self.pop_call_frame(false);
            }
            0x85 => self.f0 = false, // CLR F0
            0x86 => {
                // JNI a8 - the interrupt line is active low
                self.cycles += 1;
                self.cond_jump(!self.irq);
            }
            0x88..=0x8B => {
                // ORL Pp,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                match opcode & 3 {
                    0 => {
                        let val = self.ports.bus | imm;
                        self.ports.write_port(0, val);
                    }
                    1 => {
                        let val = self.ports.p1 | imm;
                        self.ports.write_port(1, val);
                    }
                    2 => {
                        let val = self.ports.p2 | imm;
                        self.ports.write_port(2, val);
                    }
                    _ => warn!("invalid port {}", opcode & 3),
                }
                self.pc += 1;
            }
            0x90 | 0x91 => self.cycles += 1, // MOVX @R,A - external data memory absent
            0x93 => {
                // RETR
                self.cycles += 1;
                self.pop_call_frame(true);
            }
            0x95 => self.f0 = !self.f0, // CPL F0
            0x96 => {
                // JNZ a8
                self.cycles += 1;
                self.cond_jump(self.acc != 0);
            }
            0x97 => self.set_carry(false), // CLR C
            0x98..=0x9B => {
                // ANL Pp,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                match opcode & 3 {
                    0 => {
                        let val = self.ports.bus & imm;
                        self.ports.write_port(0, val);
                    }
                    1 => {
                        let val = self.ports.p1 & imm;
                        self.ports.write_port(1, val);
                    }
                    2 => {
                        let val = self.ports.p2 & imm;
                        self.ports.write_port(2, val);
                    }
                    _ => warn!("invalid port {}", opcode & 3),
                }
                self.pc += 1;
            }

            // ========== 0xA0-0xBF ==========
            0xA0 | 0xA1 => {
                // MOV @R,A
                let ptr = self.reg(opcode & 1);
                self.ram_write(ptr, self.acc);
            }
            0xA3 => {
                // MOVP A,@A - lookup within the current 256-byte page
                self.cycles += 1;
                self.acc = self.rom_byte((self.pc & 0xF00) | self.acc as u16);
            }
            0xA5 => self.f1 = false, // CLR F1
            0xA7 => self.psw ^= super::flags::CY, // CPL C
            0xA8..=0xAF => self.set_reg(opcode & 7, self.acc), // MOV Rn,A
            0xB0 | 0xB1 => {
                // MOV @R,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                self.pc += 1;
                let ptr = self.reg(opcode & 1);
                self.ram_write(ptr, imm);
            }
            0xB3 => {
                // JMPP @A - indirect jump through a same-page table
                self.cycles += 1;
                let page = self.pc & 0xF00;
                let offset = self.rom_byte(page | self.acc as u16);
                self.pc = page | offset as u16;
            }
            0xB5 => self.f1 = !self.f1, // CPL F1
            0xB6 => {
                // JF0 a8
                self.cycles += 1;
                self.cond_jump(self.f0);
            }
            0xB8..=0xBF => {
                // MOV Rn,#imm
                self.cycles += 1;
                let imm = self.rom_byte(self.pc);
                self.pc += 1;
                self.set_reg(opcode & 7, imm);
            }

            // ========== 0xC0-0xDF ==========
            0xC5 => {
                // SEL RB0
                self.rb = 0;
                self.psw &= !super::flags::BS;
            }
            0xC6 => {
                // JZ a8
                self.cycles += 1;
                self.cond_jump(self.acc == 0);
            }
            0xC7 => self.acc = self.psw, // MOV A,PSW
            0xC8..=0xCF => {
                // DEC Rn
                let n = opcode & 7;
                let val = self.reg(n).wrapping_sub(1);
                self.set_reg(n, val);
            }
            0xD0 | 0xD1 => {
                // XRL A,@R
                let ptr = self.reg(opcode & 1);
                self.acc ^= self.ram_read(ptr);
            }
            0xD3 => {
                // XRL A,#imm
                self.cycles += 1;
                self.acc ^= self.rom_byte(self.pc);
                self.pc += 1;
            }
            0xD5 => {
                // SEL RB1
                self.rb = 1;
                self.psw |= super::flags::BS;
            }
            0xD7 => {
                // MOV PSW,A - the bank select mirror must follow PSW bit 4
                self.psw = self.acc;
                self.rb = (self.psw >> 4) & 1;
            }
            0xD8..=0xDF => self.acc ^= self.reg(opcode & 7), // XRL A,Rn

            // ========== 0xE0-0xFF ==========
            0xE3 => {
                // MOVP3 A,@A - lookup in ROM page 3
                self.cycles += 1;
                self.acc = self.rom_byte(0x300 | self.acc as u16);
            }
            0xE5 => self.mb = 0, // SEL MB0
            0xE6 => {
                // JNC a8
                self.cycles += 1;
                self.cond_jump(self.carry() == 0);
            }
            0xE7 => self.acc = self.acc.rotate_left(1), // RL A
            0xE8..=0xEF => {
                // DJNZ Rn,a8
                self.cycles += 1;
                let n = opcode & 7;
                let val = self.reg(n).wrapping_sub(1);
                self.set_reg(n, val);
                if val != 0 {
                    self.pc = (self.pc & !0xFF) | self.rom_byte(self.pc) as u16;
                } else {
                    self.pc += 1;
                }
            }
            0xF0 | 0xF1 => {
                // MOV A,@R
                let ptr = self.reg(opcode & 1);
                self.acc = self.ram_read(ptr);
            }
            0xF5 => self.mb = 1, // SEL MB1
            0xF6 => {
                // JC a8
                self.cycles += 1;
                self.cond_jump(self.carry() != 0);
            }
            0xF7 => {
                // RLC A
                let carry_out = self.acc & 0x80;
                self.acc = (self.acc << 1) | self.carry();
                self.set_carry(carry_out != 0);
            }
            0xF8..=0xFF => self.acc = self.reg(opcode & 7), // MOV A,Rn

            _ => warn!(
                "unknown opcode {:#04X} at {:#05X}",
                opcode,
                self.pc.wrapping_sub(1)
            ),
        }
    }
}
