/// Cloud shell provisioning: console, terminal, relay address and resize notifications
mod console;
mod provision;
mod resize;
mod terminals;
mod types;

pub use console::create_console;
pub use provision::{ProvisionRequest, ProvisionedShell, provision_cloud_shell};
pub use resize::ResizeNotifier;
pub use terminals::{create_terminal, normalize_socket_url};
pub use types::*;
