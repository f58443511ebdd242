//! Diagnostic log for failures that are recorded but never surfaced in the
//! chat transcript (control request errors, poll decode errors, dropped
//! fire-and-forget submissions). The TUI owns the terminal, so messages go to
//! a log file and only fall back to stderr when no file can be written.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/codechat-debug.log";
const LOG_PATH_ENV: &str = "CODECHAT_LOG_PATH";

pub fn log_error(context: &str, error: &impl Display) {
    emit_log_message(&format!("CODECHAT ERROR {context}: {error}\n"));
}

pub fn log_info(context: &str, detail: &str) {
    emit_log_message(&format!("CODECHAT INFO {context}: {detail}\n"));
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
