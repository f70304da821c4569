//! Process-wide settings taken from environment variables.

use std::ffi::OsStr;
use std::sync::OnceLock;

use crate::DIAGNOSTIC_CONTEXT_LINES;

#[derive(Clone, Copy, Debug)]
struct Env {
    trace_enabled: bool,
    context_lines: usize,
}

/// Must only be written by `init`
static ENV: OnceLock<Env> = OnceLock::new();

pub fn init() {
    let value = Env {
        trace_enabled: var_is("ARMLET_TRACE", "1"),
        context_lines: var_parse("ARMLET_CONTEXT_LINES").unwrap_or(DIAGNOSTIC_CONTEXT_LINES),
    };
    assert!(
        ENV.set(value).is_ok(),
        "tried to initialize environment state multiple times"
    );
}

/// `ARMLET_TRACE=1`: print every pipeline slot as the emulator reaches it.
pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace_enabled)
}

/// `ARMLET_CONTEXT_LINES=<n>`: source lines shown around an assembler error.
pub fn context_lines() -> usize {
    with_env(|env| env.context_lines)
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    let env = ENV.get().unwrap_or_else(|| {
        panic!("tried to access environment state before initialization");
    });
    callback(env)
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

fn var_parse(name: impl AsRef<OsStr>) -> Option<usize> {
    std::env::var(name.as_ref()).ok()?.trim().parse().ok()
}
