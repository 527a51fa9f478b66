use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use log::LevelFilter;
use miette::Report;
use simple_logger::SimpleLogger;

use lc3sim::output::{decolor, file_message, message, register_table, MsgColor};
use lc3sim::{error, Console, Fault, Machine, Memory, Piped, ScriptedConsole, Terminal};

/// Run assembled LC3 `.obj` images.
///
/// Images are loaded in order, so later images overwrite earlier ones where they
/// overlap. Execution starts at x3000.
#[derive(Parser)]
#[command(version, disable_help_flag = true)]
struct Args {
    /// `.obj` images to load
    images: Vec<PathBuf>,

    /// Read keyboard input from this text instead of the terminal
    #[arg(short, long)]
    input: Option<String>,

    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,

    /// Log to stderr: `-v` for loaded images, `-vv` for every instruction
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help
    #[arg(short, long, action = ArgAction::SetTrue)]
    help: bool,
}

/// Program executed an illegal instruction, or the terminal could not be set up.
const EXIT_FAULT: i32 = 1;
/// Bad arguments, or an image could not be loaded.
const EXIT_USAGE: i32 = 2;
/// `Ctrl+C` while the program was waiting for input.
const EXIT_INTERRUPTED: i32 = 130;

/// Error report, plus the exit code it should cause.
struct Failure {
    report: Report,
    code: i32,
}

fn main() {
    let args = Args::parse();
    lc3sim::env::init();

    if args.help || args.images.is_empty() {
        eprintln!("{}", Args::command().render_help());
        std::process::exit(EXIT_USAGE);
    }

    init_logger(args.verbose);
    let minimal = args.minimal || lc3sim::env::is_minimal();

    // Every `Failure` is returned after the console (and raw mode) has been dropped
    let code = match run(&args, minimal) {
        Ok(()) => 0,
        Err(failure) => {
            eprintln!("{:?}", failure.report);
            failure.code
        }
    };
    std::process::exit(code);
}

fn init_logger(verbose: u8) {
    let level = lc3sim::env::log_level().unwrap_or(match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to start logger: {}", err);
    }
}

fn run(args: &Args, minimal: bool) -> Result<(), Failure> {
    // Load everything before touching the terminal, so a bad image never starts the machine
    let mut memory = Memory::new();
    for path in &args.images {
        if !minimal {
            file_message(MsgColor::Green, "Loading", path);
        }
        lc3sim::load(&mut memory, path).map_err(|err| Failure {
            report: error::load_failed(path, &err),
            code: EXIT_USAGE,
        })?;
    }

    if !minimal {
        message(MsgColor::Green, "Running", "loaded images");
    }
    let console = open_console(args)?;
    let mut machine = Machine::with_memory(memory, console);
    let result = machine.run();

    let registers = register_table(&machine);
    // Restores the terminal
    drop(machine);

    match result {
        Ok(()) => {
            if !minimal {
                message(MsgColor::Green, "Completed", "machine halted");
            }
            Ok(())
        }
        Err(fault @ Fault::Interrupted) => Err(Failure {
            report: error::run_fault(&fault),
            code: EXIT_INTERRUPTED,
        }),
        Err(fault) => {
            if !minimal {
                message(MsgColor::Red, "Fault", "register state");
                if io::stderr().is_terminal() {
                    eprint!("{}", registers);
                } else {
                    eprint!("{}", decolor(&registers));
                }
            }
            Err(Failure {
                report: error::run_fault(&fault),
                code: EXIT_FAULT,
            })
        }
    }
}

fn open_console(args: &Args) -> Result<Box<dyn Console>, Failure> {
    if let Some(input) = &args.input {
        return Ok(Box::new(ScriptedConsole::with_output(input, io::stdout())));
    }
    if io::stdin().is_terminal() {
        let terminal = Terminal::new().map_err(|err| Failure {
            report: error::terminal_unavailable(err),
            code: EXIT_FAULT,
        })?;
        return Ok(Box::new(terminal));
    }
    Ok(Box::new(Piped::new()))
}
