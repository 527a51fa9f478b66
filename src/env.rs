//! Configuration read from environment variables, once at startup.
//!
//! - `LC3SIM_MINIMAL=1`: same as `--minimal`.
//! - `LC3SIM_LOG=<level>`: log level (`off`, `error`, `warn`, `info`, `debug`,
//!   `trace`). Takes precedence over `-v`.

use std::cell::RefCell;
use std::str::FromStr;

use log::LevelFilter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    minimal: bool,
    log_level: Option<LevelFilter>,
}

thread_local! {
    /// Must only be mutated within `init`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env::from_vars(|name| std::env::var(name).ok());
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

pub fn log_level() -> Option<LevelFilter> {
    with_env(|env| env.log_level)
}

impl Env {
    fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = var("LC3SIM_LOG").and_then(|level| {
            let parsed = LevelFilter::from_str(level.trim()).ok();
            if parsed.is_none() {
                eprintln!("ignoring invalid LC3SIM_LOG level `{}`", level);
            }
            parsed
        });
        Env {
            minimal: var("LC3SIM_MINIMAL").is_some_and(|v| v == "1"),
            log_level,
        }
    }
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}
