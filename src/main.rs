//! ADB keyboard simulator REPL
//!
//! Loads an 8048/8049 firmware image and drops into a line-oriented
//! debugger: single-step, run to an address, inspect registers and RAM,
//! disassemble, poke state, and arm ADB host transactions. An empty line
//! repeats the previous command.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Env;
use log::{error, warn};

use adbsim::disasm::Disasm;
use adbsim::Emu;

#[derive(Parser)]
#[command(name = "adbsim", version, about = "Interactive MCS-48 emulator for ADB keyboard firmware")]
struct Args {
    /// Path to the 8048/8049 ROM file to process
    #[arg(long = "rom_path", value_name = "ROM_PATH")]
    rom_path: PathBuf,
}

/// Parse an integer in any common base: 0x/0o/0b prefixed or decimal
fn parse_int(s: &str) -> Option<i64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (2, d)
    } else {
        (10, body)
    };
    i64::from_str_radix(digits, radix)
        .ok()
        .map(|v| if negative { -v } else { v })
}

fn print_help() {
    println!("step        - execute single instruction");
    println!("si          - execute single instruction");
    println!("until addr  - execute until addr is reached");
    println!("regs        - print internal registers");
    println!("dump        - dump internal memory");
    println!("dasm [A N]  - disassemble N instructions at address A");
    println!("              'dasm' without parameters disassembles one");
    println!("              instruction at PC");
    println!("set X=Y     - change value of register X to Y");
    println!("adb_send X  - send byte X over ADB");
    println!("reset       - reset the CPU, keeping ROM and RAM");
    println!("history     - dump recently executed instructions");
    println!("help        - print this summary");
    println!("quit        - shut down the simulator");
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let rom_data = match fs::read(&args.rom_path) {
        Ok(data) => data,
        Err(err) => {
            error!("cannot read {}: {}", args.rom_path.display(), err);
            process::exit(1);
        }
    };
    println!("ROM file size {} bytes", rom_data.len());

    let mut emu = Emu::new();
    if let Err(err) = emu.load_rom(&rom_data) {
        error!("cannot load ROM: {}", err);
        process::exit(1);
    }

    let dasm = Disasm::new();

    println!("Welcome to the ADB keyboard simulator.");
    println!("Please enter a command or 'help'.");

    let stdin = io::stdin();
    let mut prev_cmd = String::new();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let trimmed = line.trim();
        let input = if trimmed.is_empty() {
            if prev_cmd.is_empty() {
                continue;
            }
            prev_cmd.clone()
        } else {
            trimmed.to_string()
        };
        prev_cmd = input.clone();

        let words: Vec<&str> = input.split_whitespace().collect();
        match words[0] {
            "quit" => break,
            "step" | "si" => emu.step(),
            "until" => {
                let addr = match words.get(1).and_then(|w| parse_int(w)) {
                    Some(v) if (0..=0xFFF).contains(&v) => v as u16,
                    _ => {
                        warn!("invalid command syntax");
                        continue;
                    }
                };
                println!("Execute until {:#05X}", addr);
                emu.run_until(addr);
            }
            "regs" => print!("{}", emu.cpu.print_state()),
            "dump" => print!("{}", emu.cpu.dump_ram()),
            "dasm" => match words.len() {
                1 => {
                    let pc = emu.cpu.get_pc();
                    let bytes = [emu.cpu.rom_byte(pc), emu.cpu.rom_byte(pc.wrapping_add(1))];
                    let (text, _) = dasm.dasm_single(pc, &bytes);
                    println!("{}", text);
                }
                2 => warn!("invalid command syntax"),
                _ => {
                    let (addr, count) = match (parse_int(words[1]), parse_int(words[2])) {
                        (Some(a), Some(n)) if (0..=0xFFF).contains(&a) && n >= 0 => {
                            (a as u16, n as usize)
                        }
                        _ => {
                            warn!("invalid command syntax");
                            continue;
                        }
                    };
                    let mut addr = addr;
                    for _ in 0..count {
                        let bytes = [emu.cpu.rom_byte(addr), emu.cpu.rom_byte(addr.wrapping_add(1))];
                        let (text, len) = dasm.dasm_single(addr, &bytes);
                        println!("{}", text);
                        addr = addr.wrapping_add(len as u16);
                    }
                }
            },
            "set" => {
                let assignment = match words.get(1) {
                    Some(w) => w,
                    None => {
                        warn!("invalid command syntax");
                        continue;
                    }
                };
                match assignment.split_once('=') {
                    Some((dst, val_str)) => match parse_int(val_str) {
                        Some(val) => emu.cpu.set_state(&dst.to_uppercase(), val),
                        None => warn!("invalid command syntax"),
                    },
                    None => warn!("invalid command syntax"),
                }
            }
            "adb_send" => match words.get(1).and_then(|w| parse_int(w)) {
                Some(cmd) if (0..=255).contains(&cmd) => emu.adb_send(cmd as u8),
                Some(cmd) => warn!("invalid command byte {:#X}", cmd),
                None => warn!("invalid command syntax"),
            },
            "reset" => emu.reset(),
            "history" => print!("{}", emu.dump_history()),
            "help" => print_help(),
            other => warn!("unknown command: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_int;

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2C"), Some(0x2C));
        assert_eq!(parse_int("0X2c"), Some(0x2C));
        assert_eq!(parse_int("0o17"), Some(0o17));
        assert_eq!(parse_int("0b1010"), Some(10));
        assert_eq!(parse_int("-5"), Some(-5));
        assert_eq!(parse_int("zz"), None);
        assert_eq!(parse_int(""), None);
    }
}
