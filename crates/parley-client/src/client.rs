//! Connection establishment and the concurrent receive/send loop.

use std::fmt;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use parley_core::constants::{DEFAULT_PROMPT, EXIT_COMMAND};
use parley_core::{FrameReceiver, IntoFrame};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::errors::ClientError;

/// Printed once the connection is up.
pub const CONNECTED_BANNER: &str = "Connected to chat server. Type 'exit' to quit.";

/// Printed when the server side goes away.
pub const CONNECTION_LOST: &str = "Connection to server lost.";

/// How long to wait for our Close frame to flush on the way out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a chat session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatExit {
    /// The operator typed the exit sentinel.
    OperatorExit,
    /// Operator input reached end-of-file.
    InputClosed,
    /// The server closed the connection or it failed.
    ConnectionLost,
}

/// An established connection to the chat server.
pub struct ChatConnection<S = MaybeTlsStream<TcpStream>> {
    ws: WebSocketStream<S>,
    url: String,
    prompt: String,
}

impl<S> ChatConnection<S> {
    /// Wrap an already-handshaken WebSocket.
    pub fn new(ws: WebSocketStream<S>, url: impl Into<String>) -> Self {
        Self {
            ws,
            url: url.into(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Prompt printed after each inbound message.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// The URL this connection was opened against.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<S> fmt::Debug for ChatConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConnection")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Open a connection to the chat server at `url`. Not retried.
pub async fn connect(url: &str) -> Result<ChatConnection, ClientError> {
    let (ws, response) = connect_async(url)
        .await
        .map_err(|e| ClientError::from_connect(url, e))?;
    info!(url, status = %response.status(), "connected");
    Ok(ChatConnection::new(ws, url))
}

/// Run the receive and send activities until either finishes.
///
/// The loser is cancelled, a Close frame is sent, and the reason is
/// returned. A console write failure is returned as an error, after the
/// Close frame. Lines from `input` are forwarded verbatim except the exit
/// sentinel, which is never sent. Server messages are written to `output`.
pub async fn run_chat<S, W>(
    conn: ChatConnection<S>,
    mut input: mpsc::Receiver<String>,
    mut output: W,
) -> Result<ChatExit, ClientError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let ChatConnection { ws, prompt, .. } = conn;
    let (mut sink, stream) = ws.split();
    let mut receiver = FrameReceiver::new(stream);

    let exit = tokio::select! {
        received = receive_messages(&mut receiver, &mut output, &prompt) => received,
        sent = send_messages(&mut sink, &mut input) => Ok(sent),
    };
    debug!(?exit, "chat ended");

    // Ignore failures: the server may already be gone.
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
    exit
}

/// Print every server message until the connection closes.
async fn receive_messages<S, M, E, W>(
    receiver: &mut FrameReceiver<S>,
    output: &mut W,
    prompt: &str,
) -> Result<ChatExit, ClientError>
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: IntoFrame,
    E: fmt::Display,
    W: AsyncWrite + Unpin,
{
    while let Some(message) = receiver.receive().await {
        output
            .write_all(format!("\r{message}\n{prompt}").as_bytes())
            .await?;
        output.flush().await?;
    }
    if let Some(kind) = receiver.close_kind() {
        debug!(close = %kind, "server connection closed");
    }
    output
        .write_all(format!("{CONNECTION_LOST}\n").as_bytes())
        .await?;
    output.flush().await?;
    Ok(ChatExit::ConnectionLost)
}

/// Forward operator lines until the exit sentinel, end of input, or a send
/// failure.
async fn send_messages<K>(sink: &mut K, input: &mut mpsc::Receiver<String>) -> ChatExit
where
    K: Sink<Message> + Unpin,
    K::Error: fmt::Display,
{
    while let Some(line) = input.recv().await {
        if is_exit_command(&line) {
            return ChatExit::OperatorExit;
        }
        if let Err(e) = sink.send(Message::Text(line.into())).await {
            debug!(error = %e, "send failed");
            return ChatExit::ConnectionLost;
        }
    }
    ChatExit::InputClosed
}

/// Whether `line` is the exit sentinel. Case-insensitive.
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case(EXIT_COMMAND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use futures::stream;
    use std::convert::Infallible;
    use tokio_tungstenite::tungstenite::protocol::Role;

    #[test]
    fn exit_is_case_insensitive() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("Exit"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(" exit"));
        assert!(!is_exit_command(""));
    }

    #[tokio::test]
    async fn receive_prints_with_prompt_then_lost() {
        let mut receiver = FrameReceiver::new(stream::iter(vec![
            Ok::<_, Infallible>(Message::Text("[1.2.3.4:5]: hi".into())),
            Ok(Message::Ping(Vec::<u8>::new().into())),
            Ok(Message::Text("[1.2.3.4:5]: bye".into())),
            Ok(Message::Close(None)),
        ]));
        let mut out = Vec::new();

        let exit = receive_messages(&mut receiver, &mut out, "> ")
            .await
            .unwrap();

        assert_eq!(exit, ChatExit::ConnectionLost);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\r[1.2.3.4:5]: hi\n> \r[1.2.3.4:5]: bye\n> Connection to server lost.\n"
        );
    }

    #[tokio::test]
    async fn send_stops_at_exit_without_sending_it() {
        let (mut sink, sent) = fmpsc::unbounded::<Message>();
        let (tx, mut rx) = mpsc::channel(8);
        for line in ["one", "two", "Exit", "three"] {
            tx.send(line.to_string()).await.unwrap();
        }

        let exit = send_messages(&mut sink, &mut rx).await;
        drop(sink);

        assert_eq!(exit, ChatExit::OperatorExit);
        let sent: Vec<Message> = sent.collect().await;
        assert_eq!(
            sent,
            vec![Message::Text("one".into()), Message::Text("two".into())]
        );
    }

    #[tokio::test]
    async fn send_ends_on_input_eof() {
        let (mut sink, _sent) = fmpsc::unbounded::<Message>();
        let (tx, mut rx) = mpsc::channel::<String>(1);
        drop(tx);
        assert_eq!(send_messages(&mut sink, &mut rx).await, ChatExit::InputClosed);
    }

    #[tokio::test]
    async fn send_failure_is_connection_lost() {
        let (mut sink, sent) = fmpsc::unbounded::<Message>();
        drop(sent);
        let (tx, mut rx) = mpsc::channel(1);
        tx.send("hello".to_string()).await.unwrap();
        assert_eq!(
            send_messages(&mut sink, &mut rx).await,
            ChatExit::ConnectionLost
        );
    }

    #[tokio::test]
    async fn console_failure_still_sends_close() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let client_ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let mut server_ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        // A console nobody reads from: every write fails.
        let (console, console_reader) = tokio::io::duplex(64);
        drop(console_reader);
        let (_input_tx, input_rx) = mpsc::channel::<String>(1);

        let chat = tokio::spawn(run_chat(
            ChatConnection::new(client_ws, "ws://test"),
            input_rx,
            console,
        ));
        server_ws.send(Message::Text("hi".into())).await.unwrap();

        let err = chat.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        let next = tokio::time::timeout(Duration::from_secs(5), server_ws.next())
            .await
            .unwrap();
        assert!(matches!(next, Some(Ok(Message::Close(_)))), "got {next:?}");
    }
}
