use std::io::{self, Write};

use crate::cloudshell::TerminalSize;

/// Current size of the local terminal, or 80x30 when it cannot be read
pub fn terminal_size() -> TerminalSize {
    match crossterm::terminal::size() {
        Ok((cols, rows)) if cols > 0 && rows > 0 => TerminalSize::new(rows, cols),
        Ok(_) => TerminalSize::FALLBACK,
        Err(e) => {
            tracing::debug!("Terminal size unavailable ({}), using {}", e, TerminalSize::FALLBACK);
            TerminalSize::FALLBACK
        }
    }
}

/// Display a message to stdout
pub fn display_message(message: &str) {
    let mut out = io::stdout().lock();
    // Progress output is informational; a closed stdout must not abort provisioning
    let _ = writeln!(out, "{}", message);
    let _ = out.flush();
}

/// Display an error message to stderr
pub fn display_error(message: &str) {
    eprintln!("Error: {}", message);
}
