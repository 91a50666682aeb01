/// The four pumps moving bytes and events between the local terminal and the socket
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cloudshell::TerminalSize;
use crate::relay::{InterruptSource, ResizeSource};

/// End-of-text, what a terminal sends for Ctrl-C
pub const ETX: &str = "\u{3}";

/// Outbound socket half shared by the input and interrupt pumps
pub type SharedSink<S> = Arc<Mutex<Pin<Box<S>>>>;

pub fn share_sink<S>(sink: S) -> SharedSink<S> {
    Arc::new(Mutex::new(Box::pin(sink)))
}

/// Why the output pump stopped
#[derive(Debug)]
pub enum OutputEnd {
    /// The socket stream ended
    RemoteClosed,
    /// Reading from the socket failed
    ReadError(String),
    /// Writing to the local terminal failed
    WriteError(std::io::Error),
}

async fn send_text<S>(sink: &SharedSink<S>, text: String) -> Result<(), S::Error>
where
    S: Sink<Message>,
{
    sink.lock().await.send(Message::Text(text)).await
}

/// Copy every data frame from the socket to local output until the socket
/// ends or fails. Its return is the only signal that the session is over.
pub async fn pump_output<St, E, W>(stream: &mut St, output: &mut W) -> OutputEnd
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    debug!("Output pump started");
    loop {
        let bytes = match stream.next().await {
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bin))) => bin,
            Some(Ok(Message::Close(frame))) => {
                match frame {
                    Some(frame) => info!(
                        "Received close frame: code={}, reason={}",
                        frame.code, frame.reason
                    ),
                    None => info!("Received close frame"),
                }
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                info!("read: {}", e);
                return OutputEnd::ReadError(e.to_string());
            }
            None => {
                info!("Socket stream ended");
                return OutputEnd::RemoteClosed;
            }
        };

        let written = match output.write_all(&bytes).await {
            Ok(()) => output.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("write to terminal: {}", e);
            return OutputEnd::WriteError(e);
        }
    }
}

/// Forward local input to the socket one byte at a time.
///
/// Send failures are logged and the pump keeps going. It stops on
/// cancellation, local EOF or a local read error.
pub async fn pump_input<S, R>(sink: SharedSink<S>, mut input: R, cancel: CancellationToken)
where
    S: Sink<Message>,
    S::Error: Display,
    R: AsyncRead + Unpin,
{
    debug!("Input pump started");
    let mut pending = Utf8Accumulator::default();
    let mut byte = [0u8; 1];
    loop {
        select! {
            _ = cancel.cancelled() => break,
            read = input.read(&mut byte) => match read {
                Ok(0) => {
                    debug!("Local input closed");
                    break;
                }
                Ok(_) => {
                    if let Some(text) = pending.push(byte[0]) {
                        if let Err(e) = send_text(&sink, text).await {
                            warn!("send: {}", e);
                        }
                    }
                }
                Err(e) => {
                    warn!("read from terminal: {}", e);
                    break;
                }
            },
        }
    }
    debug!("Input pump stopped");
}

/// Send ETX for every interrupt delivered to the process
pub async fn pump_interrupt<S>(
    sink: SharedSink<S>,
    mut interrupts: InterruptSource,
    cancel: CancellationToken,
) where
    S: Sink<Message>,
    S::Error: Display,
{
    debug!("Interrupt pump started");
    loop {
        select! {
            _ = cancel.cancelled() => break,
            interrupt = interrupts.next() => match interrupt {
                Some(()) => {
                    debug!("Forwarding interrupt");
                    if let Err(e) = send_text(&sink, ETX.to_string()).await {
                        warn!("send interrupt: {}", e);
                    }
                }
                None => break,
            },
        }
    }
    debug!("Interrupt pump stopped");
}

/// Hand every local size change to the resize notifier
pub async fn pump_resize(
    mut resizes: ResizeSource,
    notifier: mpsc::Sender<TerminalSize>,
    cancel: CancellationToken,
) {
    debug!("Resize pump started");
    loop {
        select! {
            _ = cancel.cancelled() => break,
            size = resizes.next() => match size {
                Some(size) => {
                    if notifier.send(size).await.is_err() {
                        debug!("Resize notifier gone, dropping size {}", size);
                        break;
                    }
                }
                None => break,
            },
        }
    }
    debug!("Resize pump stopped");
}

/// Groups single input bytes into complete UTF-8 characters.
///
/// Text frames must be valid UTF-8, so the bytes of a multi-byte character
/// are held until the character is complete. Invalid sequences are released
/// with replacement characters.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn push(&mut self, byte: u8) -> Option<String> {
        self.pending.push(byte);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        // incomplete sequence, wait for more bytes
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                        // only the broken bytes are replaced; what follows may still
                        // start a valid character
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                    }
                }
            }
        }
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::MemorySink;
    use futures_util::stream;
    use std::time::Duration;

    #[test]
    fn ascii_passes_through_byte_by_byte() {
        let mut acc = Utf8Accumulator::default();
        assert_eq!(acc.push(b'l').as_deref(), Some("l"));
        assert_eq!(acc.push(0x03).as_deref(), Some(ETX));
        assert_eq!(acc.push(0x1b).as_deref(), Some("\u{1b}"));
    }

    #[test]
    fn multibyte_characters_are_held_until_complete() {
        let mut acc = Utf8Accumulator::default();
        let bytes = "é€".as_bytes();
        let out: Vec<Option<String>> = bytes.iter().map(|b| acc.push(*b)).collect();
        assert_eq!(
            out,
            vec![None, Some("é".to_string()), None, None, Some("€".to_string())]
        );
    }

    #[test]
    fn invalid_sequences_are_released() {
        let mut acc = Utf8Accumulator::default();
        assert_eq!(acc.push(0xff).as_deref(), Some("\u{fffd}"));
        assert_eq!(acc.push(0xe2), None);
        assert_eq!(acc.push(b'a').as_deref(), Some("\u{fffd}a"));
        assert_eq!(acc.push(b'b').as_deref(), Some("b"));
    }

    #[test]
    fn truncated_sequence_keeps_the_following_character() {
        let mut acc = Utf8Accumulator::default();
        let out: String = [0xe2, 0xc3, 0xa9]
            .into_iter()
            .filter_map(|b| acc.push(b))
            .collect();
        assert_eq!(out, "\u{fffd}é");

        let out: String = [0xf0, 0x9f, b'x', 0xe2, 0x82, 0xac]
            .into_iter()
            .filter_map(|b| acc.push(b))
            .collect();
        assert_eq!(out, "\u{fffd}x€");
    }

    #[tokio::test]
    async fn output_pump_writes_payloads_until_read_error() {
        let mut socket = stream::iter(vec![
            Ok(Message::Text("hello ".to_string())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Binary(b"world\r\n".to_vec())),
            Err("connection reset".to_string()),
            Ok(Message::Text("never written".to_string())),
        ]);
        let mut output = Vec::new();

        let end = pump_output(&mut socket, &mut output).await;

        assert!(matches!(end, OutputEnd::ReadError(e) if e == "connection reset"));
        assert_eq!(output, b"hello world\r\n");
    }

    #[tokio::test]
    async fn output_pump_ends_when_stream_ends() {
        let mut socket = stream::iter(vec![
            Ok::<_, String>(Message::Text("bye".to_string())),
            Ok(Message::Close(None)),
        ]);
        let mut output = Vec::new();

        let end = pump_output(&mut socket, &mut output).await;
        assert!(matches!(end, OutputEnd::RemoteClosed));
        assert_eq!(output, b"bye");
    }

    #[tokio::test]
    async fn input_pump_sends_each_byte_as_text() {
        let sink = MemorySink::new();
        let (mut local, input) = tokio::io::duplex(64);
        let task = tokio::spawn(pump_input(
            share_sink(sink.clone()),
            input,
            CancellationToken::new(),
        ));

        local.write_all(b"ls\r").await.unwrap();
        drop(local);
        task.await.unwrap();

        assert_eq!(sink.texts(), vec!["l", "s", "\r"]);
    }

    #[tokio::test]
    async fn input_pump_survives_send_failures() {
        let sink = MemorySink::new();
        sink.set_failing(true);
        let (mut local, input) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_input(share_sink(sink.clone()), input, cancel.clone()));

        local.write_all(b"ab").await.unwrap();
        while sink.rejected() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sink.set_failing(false);
        local.write_all(b"c").await.unwrap();
        while sink.texts().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(sink.texts(), vec!["c"]);
    }

    #[tokio::test]
    async fn interrupt_pump_forwards_etx() {
        let sink = MemorySink::new();
        let (tx, interrupts) = InterruptSource::channel();
        let task = tokio::spawn(pump_interrupt(
            share_sink(sink.clone()),
            interrupts,
            CancellationToken::new(),
        ));

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(sink.texts(), vec![ETX, ETX]);
    }

    #[tokio::test]
    async fn interrupt_pump_survives_send_failures() {
        let sink = MemorySink::new();
        sink.set_failing(true);
        let (tx, interrupts) = InterruptSource::channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_interrupt(
            share_sink(sink.clone()),
            interrupts,
            cancel.clone(),
        ));

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        while sink.rejected() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!task.is_finished());

        sink.set_failing(false);
        tx.send(()).await.unwrap();
        while sink.texts().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(sink.texts(), vec![ETX]);
    }

    #[tokio::test]
    async fn resize_pump_forwards_until_cancelled() {
        let (events_tx, resizes) = ResizeSource::channel();
        let (notifier_tx, mut notifier_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_resize(resizes, notifier_tx, cancel.clone()));

        events_tx.send(TerminalSize::new(40, 100)).await.unwrap();
        assert_eq!(notifier_rx.recv().await, Some(TerminalSize::new(40, 100)));

        cancel.cancel();
        task.await.unwrap();
        // The pump dropped its sender on exit
        assert_eq!(notifier_rx.recv().await, None);
    }
}
