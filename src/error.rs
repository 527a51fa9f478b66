use std::path::Path;

use miette::{miette, Report, Severity};

use crate::isa::Opcode;
use crate::loader::LoadError;
use crate::runtime::Fault;

// Loader errors

pub fn load_failed(path: &Path, err: &LoadError) -> Report {
    match err {
        LoadError::Io(source) => miette!(
            severity = Severity::Error,
            code = "load::io",
            help = "check that the image exists and is readable",
            "Failed to read image `{}`: {source}",
            path.display(),
        ),
        LoadError::Truncated => miette!(
            severity = Severity::Error,
            code = "load::truncated",
            help = "an image must start with a 16-bit origin address",
            "Image `{}` is empty",
            path.display(),
        ),
    }
}

// Runtime errors

pub fn run_fault(fault: &Fault) -> Report {
    match fault {
        Fault::IllegalOpcode {
            opcode,
            instruction,
            address,
        } => {
            let help = match opcode {
                Opcode::Rti => "interrupts are not supported, so RTI cannot be executed",
                _ => "the program may have jumped into data, or been assembled incorrectly",
            };
            miette!(
                severity = Severity::Error,
                code = "run::illegal_opcode",
                help = help,
                "Encountered illegal opcode {opcode} (x{instruction:04X}) at address x{address:04X}",
            )
        }
        Fault::Interrupted => miette!(
            severity = Severity::Warning,
            code = "run::interrupted",
            "Interrupted while waiting for input",
        ),
    }
}

pub fn terminal_unavailable(err: std::io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "term::raw_mode",
        help = "pass keyboard input with `--input` instead",
        "Failed to configure terminal: {err}",
    )
}
