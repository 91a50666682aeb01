/// OS event subscriptions handed to the relay: interrupts and window resizes
use std::io;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cloudshell::TerminalSize;

/// Queue depth for OS event subscriptions
const EVENT_BUFFER: usize = 16;

/// Subscription to interrupt (Ctrl-C) notifications
#[derive(Debug)]
pub struct InterruptSource {
    rx: mpsc::Receiver<()>,
}

impl InterruptSource {
    pub fn new(rx: mpsc::Receiver<()>) -> Self {
        Self { rx }
    }

    /// A source fed by the returned sender
    pub fn channel() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (tx, Self::new(rx))
    }

    /// Subscribe to SIGINT delivered to this process
    pub fn os() -> io::Result<Self> {
        let (tx, source) = Self::channel();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut interrupts = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                while interrupts.recv().await.is_some() {
                    debug!("SIGINT received");
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            });
        }
        #[cfg(not(unix))]
        {
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Ctrl-C received");
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(source)
    }

    /// Wait for the next interrupt; `None` once the source is closed
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// Subscription to local terminal size changes
#[derive(Debug)]
pub struct ResizeSource {
    rx: mpsc::Receiver<TerminalSize>,
}

impl ResizeSource {
    pub fn new(rx: mpsc::Receiver<TerminalSize>) -> Self {
        Self { rx }
    }

    /// A source fed by the returned sender
    pub fn channel() -> (mpsc::Sender<TerminalSize>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (tx, Self::new(rx))
    }

    /// Subscribe to SIGWINCH, reading the new geometry on each delivery.
    ///
    /// Platforms without SIGWINCH get a source that never yields.
    pub fn os() -> io::Result<Self> {
        let (tx, source) = Self::channel();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut resizes = signal(SignalKind::window_change())?;
            tokio::spawn(async move {
                while resizes.recv().await.is_some() {
                    let size = crate::terminal::terminal_size();
                    debug!("SIGWINCH received, terminal is now {}", size);
                    if tx.send(size).await.is_err() {
                        break;
                    }
                }
            });
        }
        #[cfg(not(unix))]
        {
            // Keep the channel open so the resize pump idles instead of ending
            tokio::spawn(async move {
                tx.closed().await;
            });
        }

        Ok(source)
    }

    /// Wait for the next size change; `None` once the source is closed
    pub async fn next(&mut self) -> Option<TerminalSize> {
        self.rx.recv().await
    }
}
