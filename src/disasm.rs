//! MCS-48 disassembler
//!
//! Decodes the full 8048/8049 instruction set, including forms the CPU
//! core never executes (port-expander transfers, XCHD, DA A), so ROM dumps
//! read cleanly. Decoding never touches CPU state: the input is an address
//! and at most two bytes, the output is a mnemonic string and the
//! instruction length.

/// Formatting options and the decode entry point
pub struct Disasm {
    /// Render the output in upper case
    uppercase: bool,
    /// Field width the mnemonic is padded to
    opcode_width: usize,
}

impl Disasm {
    pub fn new() -> Self {
        Self {
            uppercase: false,
            opcode_width: 8,
        }
    }

    /// Switch the output between lower case (default) and upper case
    pub fn set_uppercase(&mut self, flag: bool) {
        self.uppercase = flag;
    }

    /// Change the width of the padded mnemonic field
    pub fn set_opcode_width(&mut self, width: usize) {
        self.opcode_width = width;
    }

    fn fmt(&self, opc: &str, ops: String) -> String {
        let line = format!("{:<width$}{}", opc, ops, width = self.opcode_width);
        if self.uppercase {
            line.to_uppercase()
        } else {
            line
        }
    }

    fn fmt_imm(n: u16) -> String {
        format!("#{:03x}h", n)
    }

    /// Disassemble a single instruction.
    ///
    /// `pc` is the address of the opcode byte and supplies the page bits of
    /// branch targets; `bytes` holds the opcode byte and, when present, the
    /// byte after it. Returns the rendered instruction and its length in
    /// bytes (1 or 2). Unrecognized encodings come back as `("unknown", 1)`.
    pub fn dasm_single(&self, pc: u16, bytes: &[u8]) -> (String, usize) {
        let opcode = bytes[0];
        let imm = bytes.get(1).copied().unwrap_or(0);
        // branch targets within the current 256-byte page
        let page_dest = (pc & !0xFF) | imm as u16;
        // 11-bit jump/call targets
        let long_dest = (((opcode & 0xE0) as u16) << 3) | imm as u16;

        match opcode {
            0x00 => (self.fmt("nop", String::new()), 1),
            0x02 => (self.fmt("outl", "bus,a".into()), 1),
            0x03 => (self.fmt("add", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0x04 | 0x24 | 0x44 | 0x64 | 0x84 | 0xA4 | 0xC4 | 0xE4 => {
                (self.fmt("jmp", Self::fmt_imm(long_dest)), 2)
            }
            0x05 => (self.fmt("en", "i".into()), 1),
            0x07 => (self.fmt("dec", "a".into()), 1),
            0x08 => (self.fmt("ins", "a,bus".into()), 1),
            0x09 | 0x0A => (self.fmt("in", format!("a,p{}", opcode & 3)), 1),
            0x0C..=0x0F => (self.fmt("movd", format!("a,p{}", (opcode & 3) + 4)), 1),
            0x10 | 0x11 => (self.fmt("inc", format!("@r{}", opcode & 1)), 1),
            0x12 | 0x32 | 0x52 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                let bit = (opcode >> 5) & 7;
                (self.fmt(&format!("jb{}", bit), Self::fmt_imm(page_dest)), 2)
            }
            0x13 => (self.fmt("addc", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0x14 | 0x34 | 0x54 | 0x74 | 0x94 | 0xB4 | 0xD4 | 0xF4 => {
                (self.fmt("call", Self::fmt_imm(long_dest)), 2)
            }
            0x15 => (self.fmt("dis", "i".into()), 1),
            0x16 => (self.fmt("jtf", Self::fmt_imm(page_dest)), 2),
            0x17 => (self.fmt("inc", "a".into()), 1),
            0x18..=0x1F => (self.fmt("inc", format!("r{}", opcode & 7)), 1),
            0x20 | 0x21 => (self.fmt("xch", format!("a,@r{}", opcode & 1)), 1),
            0x23 => (self.fmt("mov", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0x25 => (self.fmt("en", "tcnti".into()), 1),
            0x26 => (self.fmt("jnt0", Self::fmt_imm(page_dest)), 2),
            0x27 => (self.fmt("clr", "a".into()), 1),
            0x28..=0x2F => (self.fmt("xch", format!("a,r{}", opcode & 7)), 1),
            0x30 | 0x31 => (self.fmt("xchd", format!("a,@r{}", opcode & 1)), 1),
            0x35 => (self.fmt("dis", "tcnti".into()), 1),
            0x36 => (self.fmt("jt0", Self::fmt_imm(page_dest)), 2),
            0x37 => (self.fmt("cpl", "a".into()), 1),
            0x39 | 0x3A => (self.fmt("outl", format!("p{},a", opcode & 3)), 1),
            0x3C..=0x3F => (self.fmt("movd", format!("p{},a", (opcode & 3) + 4)), 1),
            0x40 | 0x41 => (self.fmt("orl", format!("a,@r{}", opcode & 1)), 1),
            0x42 => (self.fmt("mov", "a,t".into()), 1),
            0x43 => (self.fmt("orl", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0x45 => (self.fmt("strt", "cnt".into()), 1),
            0x46 => (self.fmt("jnt1", Self::fmt_imm(page_dest)), 2),
            0x47 => (self.fmt("swap", "a".into()), 1),
            0x48..=0x4F => (self.fmt("orl", format!("a,r{}", opcode & 7)), 1),
            0x50 | 0x51 => (self.fmt("anl", format!("a,@r{}", opcode & 1)), 1),
            0x53 => (self.fmt("anl", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0x55 => (self.fmt("strt", "t".into()), 1),
            0x56 => (self.fmt("jt1", Self::fmt_imm(page_dest)), 2),
            0x57 => (self.fmt("da", "a".into()), 1),
            0x58..=0x5F => (self.fmt("anl", format!("a,r{}", opcode & 7)), 1),
            0x60 | 0x61 => (self.fmt("add", format!("a,@r{}", opcode & 1)), 1),
            0x62 => (self.fmt("mov", "t,a".into()), 1),
            0x65 => (self.fmt("stop", "tcnt".into()), 1),
            0x67 => (self.fmt("rrc", "a".into()), 1),
            0x68..=0x6F => (self.fmt("add", format!("a,r{}", opcode & 7)), 1),
            0x70 | 0x71 => (self.fmt("addc", format!("a,@r{}", opcode & 1)), 1),
            0x75 => (self.fmt("ent0", "clk".into()), 1),
            0x76 => (self.fmt("jf1", Self::fmt_imm(page_dest)), 2),
            0x77 => (self.fmt("rr", "a".into()), 1),
            0x78..=0x7F => (self.fmt("addc", format!("a,r{}", opcode & 7)), 1),
            0x80 | 0x81 => (self.fmt("movx", format!("a,@r{}", opcode & 1)), 1),
            0x83 => (self.fmt("ret", String::new()), 1),
            0x85 => (self.fmt("clr", "f0".into()), 1),
            0x86 => (self.fmt("jni", Self::fmt_imm(page_dest)), 2),
            0x88 => (self.fmt("orl", format!("bus,{}", Self::fmt_imm(imm as u16))), 2),
            0x89 | 0x8A => (
                self.fmt("orl", format!("p{},{}", opcode & 3, Self::fmt_imm(imm as u16))),
                2,
            ),
            // invalid-port encoding; the core still consumes the immediate
            0x8B => ("unknown".to_string(), 2),
            0x8C..=0x8F => (self.fmt("orld", format!("p{},a", (opcode & 3) + 4)), 1),
            0x90 | 0x91 => (self.fmt("movx", format!("@r{},a", opcode & 1)), 1),
            0x93 => (self.fmt("retr", String::new()), 1),
            0x95 => (self.fmt("cpl", "f0".into()), 1),
            0x96 => (self.fmt("jnz", Self::fmt_imm(page_dest)), 2),
            0x97 => (self.fmt("clr", "c".into()), 1),
            0x98 => (self.fmt("anl", format!("bus,{}", Self::fmt_imm(imm as u16))), 2),
            0x99 | 0x9A => (
                self.fmt("anl", format!("p{},{}", opcode & 3, Self::fmt_imm(imm as u16))),
                2,
            ),
            // invalid-port encoding; the core still consumes the immediate
            0x9B => ("unknown".to_string(), 2),
            0x9C..=0x9F => (self.fmt("anld", format!("p{},a", (opcode & 3) + 4)), 1),
            0xA0 | 0xA1 => (self.fmt("mov", format!("@r{},a", opcode & 1)), 1),
            0xA3 => (self.fmt("movp", "a,@a".into()), 1),
            0xA5 => (self.fmt("clr", "f1".into()), 1),
            0xA7 => (self.fmt("cpl", "c".into()), 1),
            0xA8..=0xAF => (self.fmt("mov", format!("r{},a", opcode & 7)), 1),
            0xB0 | 0xB1 => (
                self.fmt("mov", format!("@r{},{}", opcode & 1, Self::fmt_imm(imm as u16))),
                2,
            ),
            0xB3 => (self.fmt("jmpp", "@a".into()), 1),
            0xB5 => (self.fmt("cpl", "f1".into()), 1),
            0xB6 => (self.fmt("jf0", Self::fmt_imm(page_dest)), 2),
            0xB8..=0xBF => (
                self.fmt("mov", format!("r{},{}", opcode & 7, Self::fmt_imm(imm as u16))),
                2,
            ),
            0xC5 => (self.fmt("sel", "rb0".into()), 1),
            0xC6 => (self.fmt("jz", Self::fmt_imm(page_dest)), 2),
            0xC7 => (self.fmt("mov", "a,psw".into()), 1),
            0xC8..=0xCF => (self.fmt("dec", format!("r{}", opcode & 7)), 1),
            0xD0 | 0xD1 => (self.fmt("xrl", format!("a,@r{}", opcode & 1)), 1),
            0xD3 => (self.fmt("xrl", format!("a,{}", Self::fmt_imm(imm as u16))), 2),
            0xD5 => (self.fmt("sel", "rb1".into()), 1),
            0xD7 => (self.fmt("mov", "psw,a".into()), 1),
            0xD8..=0xDF => (self.fmt("xrl", format!("a,r{}", opcode & 7)), 1),
            0xE3 => (self.fmt("movp3", "a,@a".into()), 1),
            0xE5 => (self.fmt("sel", "mb0".into()), 1),
            0xE6 => (self.fmt("jnc", Self::fmt_imm(page_dest)), 2),
            0xE7 => (self.fmt("rl", "a".into()), 1),
            0xE8..=0xEF => (
                self.fmt("djnz", format!("r{},{}", opcode & 7, Self::fmt_imm(page_dest))),
                2,
            ),
            0xF0 | 0xF1 => (self.fmt("mov", format!("a,@r{}", opcode & 1)), 1),
            0xF5 => (self.fmt("sel", "mb1".into()), 1),
            0xF6 => (self.fmt("jc", Self::fmt_imm(page_dest)), 2),
            0xF7 => (self.fmt("rlc", "a".into()), 1),
            0xF8..=0xFF => (self.fmt("mov", format!("a,r{}", opcode & 7)), 1),
            _ => ("unknown".to_string(), 1),
        }
    }
}

impl Default for Disasm {
    fn default() -> Self {
        Self::new()
    }
}

/// Length in bytes of the instruction the CPU core would execute.
/// Unknown opcodes count as one byte, matching the core's no-rewind rule.
pub fn instr_len(opcode: u8) -> usize {
    match opcode {
        // immediate ALU forms
        0x03 | 0x13 | 0x23 | 0x43 | 0x53 | 0xD3 => 2,
        // jmp / call / accumulator-bit branches
        0x04 | 0x24 | 0x44 | 0x64 | 0x84 | 0xA4 | 0xC4 | 0xE4 => 2,
        0x14 | 0x34 | 0x54 | 0x74 | 0x94 | 0xB4 | 0xD4 | 0xF4 => 2,
        0x12 | 0x32 | 0x52 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => 2,
        // page-local conditional branches
        0x16 | 0x26 | 0x36 | 0x46 | 0x56 | 0x76 | 0x86 | 0x96 | 0xB6 | 0xC6 | 0xE6 | 0xF6 => 2,
        // register immediate loads and DJNZ
        0xB0 | 0xB1 => 2,
        0xB8..=0xBF => 2,
        0xE8..=0xEF => 2,
        // port logic with immediate (the core consumes the immediate even
        // for an invalid port number)
        0x88..=0x8B | 0x98..=0x9B => 2,
        _ => 1,
    }
}
