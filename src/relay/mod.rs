/// Terminal relay between the local terminal device and the remote terminal socket
mod events;
mod memory_socket;
mod pumps;
mod raw_mode;
mod terminal_relay;

pub use events::{InterruptSource, ResizeSource};
pub use memory_socket::MemorySink;
pub use pumps::*;
pub use raw_mode::{CrosstermMode, RawModeGuard, TerminalMode};
pub use terminal_relay::{RelayState, SessionReport, TerminalRelay};
