/// Raw-mode lifecycle of the local terminal
use std::io;

use tracing::{debug, error};

/// Switches the local terminal between its original mode and raw mode
pub trait TerminalMode: Send {
    /// Enter raw (non-canonical, non-echo) mode, remembering the previous mode
    fn enable_raw(&mut self) -> io::Result<()>;

    /// Return to the mode captured by `enable_raw`
    fn restore(&mut self) -> io::Result<()>;
}

/// The process's controlling terminal, driven through crossterm
#[derive(Debug, Default)]
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn enable_raw(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn restore(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Holds the terminal in raw mode and restores it exactly once,
/// either through `restore` or on drop.
pub struct RawModeGuard<M: TerminalMode> {
    mode: M,
    restored: bool,
}

impl<M: TerminalMode> RawModeGuard<M> {
    pub fn enable(mut mode: M) -> io::Result<Self> {
        mode.enable_raw()?;
        debug!("Local terminal switched to raw mode");
        Ok(Self {
            mode,
            restored: false,
        })
    }

    /// Restore the previous mode. Later calls are no-ops.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.mode.restore()?;
        debug!("Local terminal mode restored");
        Ok(())
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl<M: TerminalMode> Drop for RawModeGuard<M> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!("Failed to restore terminal mode: {}", e);
        }
    }
}
