use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, diff};

/// Write an image with `origin` and `words` to a fresh file, returning its path.
fn image(name: &str, origin: u16, words: &[u16]) -> PathBuf {
    let bytes: Vec<u8> = std::iter::once(origin)
        .chain(words.iter().copied())
        .flat_map(u16::to_be_bytes)
        .collect();
    raw_image(name, &bytes)
}

fn raw_image(name: &str, bytes: &[u8]) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn string_words(string: &str) -> impl Iterator<Item = u16> + '_ {
    string.bytes().map(u16::from).chain(std::iter::once(0))
}

fn lc3sim() -> Command {
    let mut cmd = Command::cargo_bin("lc3sim").unwrap();
    cmd.env_remove("LC3SIM_MINIMAL");
    cmd
}

#[test]
fn usage_without_images() {
    lc3sim()
        .assert()
        .code(2)
        .stderr(contains("Usage"))
        .stdout(diff(""));
}

#[test]
fn help_is_a_usage_error() {
    for flag in ["-h", "--help"] {
        lc3sim()
            .arg(flag)
            .assert()
            .code(2)
            .stderr(contains("Usage"))
            .stderr(contains("--input"));
    }
}

#[test]
fn prints_version() {
    lc3sim().arg("--version").assert().success();
}

#[test]
fn missing_image() {
    lc3sim()
        .arg("tests/files/does_not_exist.obj")
        .assert()
        .code(2)
        .stderr(contains("load::io"))
        .stdout(diff(""));
}

#[test]
fn empty_image() {
    let path = raw_image("empty.obj", &[]);
    lc3sim()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(contains("load::truncated"));
}

#[test]
fn failed_load_never_runs() {
    let good = image(
        "never_runs.obj",
        0x3000,
        &[
            0xF021, // OUT
            0xF025, // HALT
        ],
    );
    lc3sim()
        .arg(&good)
        .arg("tests/files/does_not_exist.obj")
        .arg("--minimal")
        .assert()
        .code(2)
        .stdout(diff(""));
}

#[test]
fn runs_hello_world() {
    let mut words = vec![
        0xE002, // LEA R0, #2
        0xF022, // PUTS
        0xF025, // HALT
    ];
    words.extend(string_words("Hello, world!\n"));
    let path = image("hello_world.obj", 0x3000, &words);

    lc3sim()
        .arg(&path)
        .assert()
        .success()
        .stdout(diff("Hello, world!\nHALT\n"))
        .stderr(contains("Loading"))
        .stderr(contains("Completed"));
}

#[test]
fn minimal_output() {
    let path = image(
        "minimal.obj",
        0x3000,
        &[
            0x5020, // AND R0, R0, #0
            0x1025, // ADD R0, R0, #5
            0xF021, // OUT
            0xF025, // HALT
        ],
    );

    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff("\x05HALT\n"))
        .stderr(diff(""));

    lc3sim()
        .arg(&path)
        .env("LC3SIM_MINIMAL", "1")
        .assert()
        .success()
        .stderr(diff(""));
}

#[test]
fn later_images_overwrite_earlier() {
    let first = image(
        "overwrite_first.obj",
        0x3000,
        &[
            0xE002, // LEA R0, #2
            0xF022, // PUTS
            0xF025, // HALT
            b'A' as u16,
            0,
        ],
    );
    let second = image("overwrite_second.obj", 0x3003, &[b'B' as u16]);

    lc3sim()
        .arg(&first)
        .arg(&second)
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff("BHALT\n"));
}

/// Echo two characters read with `GETC`.
fn echo_twice() -> PathBuf {
    image(
        "echo_twice.obj",
        0x3000,
        &[
            0xF020, // GETC
            0xF021, // OUT
            0xF020, // GETC
            0xF021, // OUT
            0xF025, // HALT
        ],
    )
}

#[test]
fn getc_reads_stdin() {
    lc3sim()
        .arg(echo_twice())
        .arg("--minimal")
        .write_stdin("hi")
        .assert()
        .success()
        .stdout(diff("hiHALT\n"));
}

#[test]
fn getc_reads_input_argument() {
    lc3sim()
        .arg(echo_twice())
        .arg("--minimal")
        .arg("--input")
        .arg("ok")
        .assert()
        .success()
        .stdout(diff("okHALT\n"));
}

#[test]
fn getc_at_end_of_input() {
    let mut words = vec![
        0xF020, // GETC
        0x1021, // ADD R0, R0, #1
        0x0A02, // BRnp #2
        0xE002, // LEA R0, #2
        0xF022, // PUTS
        0xF025, // HALT
    ];
    words.extend(string_words("EOF"));
    let path = image("getc_eof.obj", 0x3000, &words);

    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .assert()
        .success()
        .stdout(diff("EOFHALT\n"));
}

#[test]
fn in_prompts_and_echoes() {
    let path = image(
        "in.obj",
        0x3000,
        &[
            0xF023, // IN
            0xF025, // HALT
        ],
    );
    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .write_stdin("y")
        .assert()
        .success()
        .stdout(diff("Enter a character: yHALT\n"));
}

#[test]
fn polls_keyboard_status() {
    let path = image(
        "poll.obj",
        0x3000,
        &[
            0xA004, // LDI R0, #4   ; KBSR
            0x07FE, // BRzp #-2
            0xA003, // LDI R0, #3   ; KBDR
            0xF021, // OUT
            0xF025, // HALT
            0xFE00,
            0xFE02,
        ],
    );
    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .write_stdin("k")
        .assert()
        .success()
        .stdout(diff("kHALT\n"));
}

#[test]
fn polling_ends_with_input_argument() {
    let path = image(
        "poll_until_end.obj",
        0x3000,
        &[
            0xA008, // LDI R0, #8   ; KBSR
            0x07FE, // BRzp #-2
            0xA007, // LDI R0, #7   ; KBDR
            0x1221, // ADD R1, R0, #1
            0x0402, // BRz #2       ; xFFFF, end of input
            0xF021, // OUT
            0x0FF9, // BRnzp #-7
            0xF025, // HALT
            0x0000,
            0xFE00,
            0xFE02,
        ],
    );
    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .arg("--input")
        .arg("ok")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(diff("okHALT\n"));
}

#[test]
fn reserved_opcode_is_fatal() {
    let path = image(
        "reserved.obj",
        0x3000,
        &[
            0x1021, // ADD R0, R0, #1
            0xD000, // reserved
            0xF025, // HALT
        ],
    );
    lc3sim()
        .arg(&path)
        .assert()
        .code(1)
        .stdout(diff(""))
        .stderr(contains("run::illegal_opcode"))
        .stderr(contains("x3001"))
        .stderr(contains("R0  0x0001"))
        .stderr(contains("Completed").not());
}

#[test]
fn rti_is_fatal() {
    let path = image(
        "rti.obj",
        0x3000,
        &[
            0x8000, // RTI
            0xF025, // HALT
        ],
    );
    lc3sim()
        .arg(&path)
        .arg("--minimal")
        .assert()
        .code(1)
        .stdout(diff(""))
        .stderr(contains("RTI"))
        .stderr(contains("PC  0x").not());
}
