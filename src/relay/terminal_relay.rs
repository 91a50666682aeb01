/// Terminal relay: owns the local terminal and the socket for one session
use std::fmt::{self, Display};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cloudshell::TerminalSize;
use crate::error::{Error, Result};
use crate::relay::{
    InterruptSource, OutputEnd, RawModeGuard, ResizeSource, TerminalMode, pump_input,
    pump_interrupt, pump_output, pump_resize, share_sink,
};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    RawMode,
    Connected,
    Draining,
    Restored,
}

impl Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a finished session
#[derive(Debug)]
pub struct SessionReport {
    /// Every state the relay went through, in order
    pub states: Vec<RelayState>,
    /// Why the output pump stopped
    pub end: OutputEnd,
}

/// Relays the local terminal to a remote terminal socket
pub struct TerminalRelay<M: TerminalMode> {
    mode: M,
    session: Session,
}

impl<M: TerminalMode> TerminalRelay<M> {
    /// `notifier` receives every local size change for the resize notifier
    pub fn new(
        mode: M,
        interrupts: InterruptSource,
        resizes: ResizeSource,
        notifier: mpsc::Sender<TerminalSize>,
    ) -> Self {
        Self {
            mode,
            session: Session {
                interrupts,
                resizes,
                notifier,
                states: vec![RelayState::Idle],
            },
        }
    }

    /// Current state
    pub fn state(&self) -> RelayState {
        self.session.state()
    }

    /// Connect to `url` and relay standard input and output until the
    /// remote side goes away.
    pub async fn run(self, url: &str) -> Result<SessionReport> {
        let request = url
            .into_client_request()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let TerminalRelay { mode, mut session } = self;
        let guard = session.enter_raw_mode(mode)?;

        info!("Connecting to WebSocket server at: {}", url);
        let (socket, response) = match connect_async(request).await {
            Ok(connected) => connected,
            Err(e) => {
                log_handshake_failure(&e);
                // dropping the guard restores the terminal
                drop(guard);
                return Err(Error::Handshake(e));
            }
        };
        info!("Connected to server! Response status: {:?}", response.status());
        debug!("Response headers: {:?}", response.headers());

        let (sink, stream) = socket.split();
        session
            .relay(guard, sink, stream, tokio::io::stdin(), tokio::io::stdout())
            .await
    }

    /// Relay an already connected socket to arbitrary local input and output
    pub async fn run_session<Si, St, E, R, W>(
        self,
        sink: Si,
        stream: St,
        input: R,
        output: W,
    ) -> Result<SessionReport>
    where
        Si: Sink<Message> + Send + 'static,
        Si::Error: Display + Send,
        St: Stream<Item = std::result::Result<Message, E>>,
        E: Display,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let TerminalRelay { mode, mut session } = self;
        let guard = session.enter_raw_mode(mode)?;
        session.relay(guard, sink, stream, input, output).await
    }
}

/// Event sources and state history of one session
struct Session {
    interrupts: InterruptSource,
    resizes: ResizeSource,
    notifier: mpsc::Sender<TerminalSize>,
    states: Vec<RelayState>,
}

impl Session {
    fn state(&self) -> RelayState {
        self.states.last().copied().unwrap_or(RelayState::Idle)
    }

    fn transition(&mut self, state: RelayState) {
        debug!("Relay state: {} -> {}", self.state(), state);
        self.states.push(state);
    }

    fn enter_raw_mode<M: TerminalMode>(&mut self, mode: M) -> Result<RawModeGuard<M>> {
        let guard = RawModeGuard::enable(mode)?;
        self.transition(RelayState::RawMode);
        Ok(guard)
    }

    async fn relay<M, Si, St, E, R, W>(
        mut self,
        mut guard: RawModeGuard<M>,
        sink: Si,
        stream: St,
        input: R,
        mut output: W,
    ) -> Result<SessionReport>
    where
        M: TerminalMode,
        Si: Sink<Message> + Send + 'static,
        Si::Error: Display + Send,
        St: Stream<Item = std::result::Result<Message, E>>,
        E: Display,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        self.transition(RelayState::Connected);

        let cancel = CancellationToken::new();
        let sink = share_sink(sink);

        let input_task = tokio::spawn(pump_input(sink.clone(), input, cancel.child_token()));
        let interrupt_task = tokio::spawn(pump_interrupt(
            sink.clone(),
            self.interrupts,
            cancel.child_token(),
        ));
        let resize_task = tokio::spawn(pump_resize(
            self.resizes,
            self.notifier,
            cancel.child_token(),
        ));

        let mut stream = Box::pin(stream);
        let end = pump_output(&mut stream, &mut output).await;
        info!("Session ending: {:?}", end);

        self.states.push(RelayState::Draining);
        debug!("Relay state: Connected -> Draining");
        cancel.cancel();
        for (name, task) in [
            ("input", input_task),
            ("interrupt", interrupt_task),
            ("resize", resize_task),
        ] {
            if let Err(e) = task.await {
                warn!("{} pump ended abnormally: {}", name, e);
            }
        }

        if let Err(e) = sink.lock().await.close().await {
            debug!("Closing socket: {}", e);
        }

        if let Err(e) = guard.restore() {
            error!("Failed to restore terminal mode: {}", e);
        }
        // Leave the local prompt on a fresh line
        if let Err(e) = output.write_all(b"\r\n").await {
            debug!("Writing final newline: {}", e);
        }
        let _ = output.flush().await;

        self.states.push(RelayState::Restored);
        debug!("Relay state: Draining -> Restored");

        Ok(SessionReport {
            states: self.states,
            end,
        })
    }
}

fn log_handshake_failure(e: &TungsteniteError) {
    if let TungsteniteError::Http(response) = e {
        error!("dial failed with status {}", response.status());
        if let Some(body) = response.body() {
            if !body.is_empty() {
                error!("response body: {}", String::from_utf8_lossy(body));
            }
        }
    } else {
        error!("dial: {}", e);
    }
}
