use std::fmt::Write as _;
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::runtime::{Condition, Machine};

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Red,
}

/// Status line on stderr, eg. `     Loading target hello.obj`.
///
/// Stdout belongs to the running program, so nothing here is printed there.
pub fn message(color: MsgColor, left: &str, right: &str) {
    let left = paint(color, left);
    eprintln!("{left:>12} {right}");
}

pub fn file_message(color: MsgColor, left: &str, path: &Path) {
    message(color, left, &format!("target {}", path.display()));
}

fn paint(color: MsgColor, text: &str) -> ColoredString {
    match color {
        MsgColor::Green => text.green(),
        MsgColor::Red => text.red(),
    }
}

/// Render registers, program counter and condition code as a table.
pub fn register_table<C>(machine: &Machine<C>) -> String {
    let mut out = String::new();
    // `fmt::Write` for `String` never fails
    let _ = write_registers(&mut out, machine);
    out
}

fn write_registers<C>(out: &mut String, machine: &Machine<C>) -> std::fmt::Result {
    writeln!(out, "\x1b[2m┌────────────────────────────────────┐\x1b[0m")?;
    writeln!(
        out,
        "\x1b[2m│        \x1b[3mhex     int    uint    char\x1b[0m\x1b[2m │\x1b[0m"
    )?;
    for (i, value) in machine.registers().iter().enumerate() {
        write!(out, "\x1b[2m│\x1b[0m \x1b[1mR{}\x1b[0m  ", i)?;
        write_integer(out, *value)?;
        writeln!(out, " \x1b[2m│\x1b[0m")?;
    }
    write!(out, "\x1b[2m│\x1b[0m")?;
    write!(out, " \x1b[1mPC\x1b[0m  0x{:04x}", machine.pc())?;
    write!(out, "                ")?;
    write!(out, " \x1b[1mCC\x1b[0m  {}  ", condition_name(machine.flag()))?;
    writeln!(out, " \x1b[2m│\x1b[0m")?;
    writeln!(out, "\x1b[2m└────────────────────────────────────┘\x1b[0m")
}

fn condition_name(flag: Condition) -> &'static str {
    match flag {
        Condition::N => "N",
        Condition::Z => "Z",
        Condition::P => "P",
    }
}

fn write_integer(out: &mut String, value: u16) -> std::fmt::Result {
    write!(out, "0x{:04x}  ", value)?;
    write!(out, "{:-6}  ", value as i16)?;
    write!(out, "{:-6}  ", value)?;
    write!(out, "   ")?;
    // 3 characters wide
    match value {
        // ASCII control characters which are arbitrarily considered significant
        0x00 => write!(out, "NUL"),
        0x08 => write!(out, "BS "),
        0x09 => write!(out, "HT "),
        0x0a => write!(out, "LF "),
        0x0b => write!(out, "VT "),
        0x0c => write!(out, "FF "),
        0x0d => write!(out, "CR "),
        0x1b => write!(out, "ESC"),
        0x7f => write!(out, "DEL"),

        // Space
        0x20 => write!(out, "[_]"),

        // Printable ASCII characters
        0x21..=0x7e => write!(out, " {}  ", value as u8 as char),

        // Any ASCII character not already matched (unimportant control characters)
        0x00..=0x7f => write!(out, "\x1b[2m───\x1b[0m"),
        // Any non-ASCII character
        0x0080.. => write!(out, "\x1b[2m┄┄┄\x1b[0m"),
    }
}

/// Strip ANSI escape sequences, for writing to something that is not a terminal.
pub fn decolor(string: &str) -> String {
    let mut chars = string.chars();
    let mut out = String::with_capacity(string.len());
    while let Some(ch) = chars.next() {
        // Skip everything between '\x1b' and 'm' (inclusive)
        if ch == '\x1b' {
            while chars.next().is_some_and(|ch| ch != 'm') {}
            continue;
        }
        out.push(ch);
    }
    out
}
