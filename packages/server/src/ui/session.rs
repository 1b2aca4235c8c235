//! Per-connection session handler.
//!
//! A session walks `Connecting → Naming → Active → Closing → Closed`. Each
//! step of the `Naming` and `Active` states consumes exactly one inbound line.
//! Every byte sent to the client goes through the session's outbox, which the
//! writer task drains; nothing here touches the socket's write half.

use std::{net::SocketAddr, sync::Arc};

use futures_util::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_util::codec::FramedRead;

use crate::{
    domain::{
        ChatMessage, ClientInput, DisplayName, EventKind, RegistryError, SessionError, SystemNotice,
    },
    infrastructure::{
        codec::{ChatLineCodec, LineCodecError, Outbound},
        registry::{Outbox, SessionHandle, SessionId},
    },
};

use super::{protocol, state::AppState, writer::pusher_loop};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Naming,
    Active(DisplayName),
    /// Carries the name if the session had joined the room
    Closing(Option<DisplayName>),
    Closed,
}

/// Why reading from the client stopped
#[derive(Debug)]
enum ReadEnd {
    EndOfStream,
    Failed(LineCodecError),
    /// Closed out of band: server shutdown or eviction by the broadcaster
    Closed,
}

/// Serve one accepted TCP connection until it is closed
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let (reader, writer) = stream.into_split();
    serve(reader, writer, peer.to_string(), state).await;
}

/// Run a session over any byte stream pair.
///
/// `client` identifies the connection in logs (the peer address for TCP).
pub async fn serve<R, W>(reader: R, writer: W, client: String, state: Arc<AppState>)
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, rx) = Outbox::channel(state.config.outbox_capacity);
    let closer = state.shutdown.child_token();
    let writer = pusher_loop(writer, rx, state.config.write_timeout, closer.clone());

    let session = Session {
        handle: SessionHandle::new(SessionId::next(), outbox, closer),
        lines: FramedRead::new(reader, ChatLineCodec::new(state.config.max_line_length)),
        client: client.clone(),
        state,
    };
    // Dropping the session releases its outbox; the writer then drains and exits.
    session.run().await;

    match writer.await {
        Ok(Ok(())) => tracing::debug!("Writer for {} finished", client),
        Ok(Err(e)) => tracing::info!("Writer for {} stopped: {}", client, e),
        Err(e) => tracing::warn!("Writer task for {} failed: {}", client, e),
    }
}

struct Session<R> {
    handle: SessionHandle,
    lines: FramedRead<R, ChatLineCodec>,
    client: String,
    state: Arc<AppState>,
}

impl<R> Session<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn run(mut self) {
        let mut current = SessionState::Connecting;
        loop {
            current = match current {
                SessionState::Connecting => self.greet(),
                SessionState::Naming => self.negotiate_name().await,
                SessionState::Active(name) => self.converse(name).await,
                SessionState::Closing(name) => {
                    self.close(name).await;
                    SessionState::Closed
                }
                SessionState::Closed => break,
            };
        }
        tracing::debug!("Session {} ({}) closed", self.handle.id(), self.client);
    }

    fn greet(&self) -> SessionState {
        for item in protocol::welcome_banner() {
            self.send(item);
        }
        SessionState::Naming
    }

    async fn negotiate_name(&mut self) -> SessionState {
        let line = match self.next_line().await {
            Ok(line) => line,
            Err(end) => {
                let reason = self.finish_reading(end, None);
                self.log(
                    EventKind::Disconnect,
                    &format!("Client disconnected before choosing a name ({reason})"),
                );
                return SessionState::Closing(None);
            }
        };

        let Ok(name) = DisplayName::new(line) else {
            self.log(EventKind::InvalidName, "Invalid name request: \"\"");
            self.send(protocol::reprompt(protocol::INVALID_NAME));
            return SessionState::Naming;
        };

        match self.state.broadcaster.join(&name, &self.handle).await {
            Ok(replayed) => {
                tracing::info!("Client {} joined as '{}'", self.client, name);
                self.log(EventKind::Connect, &format!("Client \"{name}\" joined"));
                self.log(
                    EventKind::MsgHistory,
                    &format!("Message history ({replayed} lines) sent to client \"{name}\""),
                );
                self.state
                    .broadcaster
                    .publish(SystemNotice::Joined(name.clone()).to_string())
                    .await;
                SessionState::Active(name)
            }
            Err(RegistryError::NameTaken(_)) => {
                self.log(EventKind::NameTaken, &format!("Taken name requested: \"{name}\""));
                self.send(protocol::reprompt(protocol::NAME_TAKEN));
                SessionState::Naming
            }
            Err(RegistryError::RoomFull { capacity }) => {
                tracing::info!("Rejecting {}: room is full ({})", self.client, capacity);
                self.log(EventKind::RoomFull, "Chat room full, connection closed");
                self.send(Outbound::line(protocol::ROOM_FULL));
                SessionState::Closing(None)
            }
            Err(e) => {
                tracing::warn!("Client {} could not join: {}", self.client, e);
                self.log(EventKind::Error, &format!("Join failed: {e}"));
                SessionState::Closing(None)
            }
        }
    }

    async fn converse(&mut self, name: DisplayName) -> SessionState {
        let line = match self.next_line().await {
            Ok(line) => line,
            Err(end) => {
                let reason = self.finish_reading(end, Some(&name));
                self.log(EventKind::Disconnect, &format!("\"{name}\" disconnected ({reason})"));
                return SessionState::Closing(Some(name));
            }
        };

        match ClientInput::parse(&line) {
            ClientInput::Empty => {
                self.log(EventKind::NotSent, &format!("Empty message from \"{name}\" not sent"));
                SessionState::Active(name)
            }
            ClientInput::Rename(requested) => self.rename(name, requested).await,
            ClientInput::Quit => {
                self.send(Outbound::line(protocol::FAREWELL));
                self.log(EventKind::Disconnect, &format!("\"{name}\" left the chat"));
                SessionState::Closing(Some(name))
            }
            ClientInput::Chat(body) => {
                self.log(EventKind::Message, &format!("\"{name}\": {body}"));
                let message = ChatMessage::new(self.state.clock.now(), name.clone(), body);
                self.state.broadcaster.publish(message.to_string()).await;
                SessionState::Active(name)
            }
        }
    }

    async fn rename(&mut self, current: DisplayName, requested: String) -> SessionState {
        let Ok(new_name) = DisplayName::new(requested) else {
            self.log(
                EventKind::InvalidName,
                &format!("Invalid new name request: \"\" from \"{current}\""),
            );
            self.send(Outbound::line(protocol::INVALID_NEW_NAME));
            return SessionState::Active(current);
        };

        let renamed = if new_name == current {
            Err(RegistryError::NameTaken(new_name.to_string()))
        } else {
            self.state
                .broadcaster
                .registry()
                .rename(self.handle.id(), &new_name)
                .await
        };

        match renamed {
            Ok(()) => {
                self.log(
                    EventKind::NewName,
                    &format!("\"{current}\" changed their name to \"{new_name}\""),
                );
                let notice = SystemNotice::Renamed {
                    from: current,
                    to: new_name.clone(),
                };
                self.state.broadcaster.publish(notice.to_string()).await;
                SessionState::Active(new_name)
            }
            Err(RegistryError::NotRegistered) => {
                tracing::info!("Rename by {} ignored: session was already removed", self.client);
                self.log(
                    EventKind::Error,
                    &format!("Name change to \"{new_name}\" by removed session \"{current}\""),
                );
                SessionState::Closing(Some(current))
            }
            Err(e) => {
                self.log(
                    EventKind::NameTaken,
                    &format!("Taken name change requested: \"{new_name}\" by \"{current}\""),
                );
                tracing::debug!("Rename of '{}' refused: {}", current, e);
                self.send(Outbound::line(protocol::NEW_NAME_TAKEN));
                SessionState::Active(current)
            }
        }
    }

    async fn close(&mut self, name: Option<DisplayName>) {
        let Some(name) = name else {
            tracing::info!("Client {} disconnected before joining", self.client);
            return;
        };
        self.state
            .broadcaster
            .registry()
            .remove(self.handle.id())
            .await;
        self.state
            .broadcaster
            .publish(SystemNotice::Left(name.clone()).to_string())
            .await;
        tracing::info!("Client '{}' ({}) left the chat", name, self.client);
    }

    async fn next_line(&mut self) -> Result<String, ReadEnd> {
        tokio::select! {
            biased;
            _ = self.handle.closed() => Err(ReadEnd::Closed),
            frame = self.lines.next() => match frame {
                Some(Ok(line)) => Ok(line),
                Some(Err(e)) => Err(ReadEnd::Failed(e)),
                None => Err(ReadEnd::EndOfStream),
            },
        }
    }

    /// Log why reading stopped, notify the client on shutdown, and describe it
    fn finish_reading(&self, end: ReadEnd, name: Option<&DisplayName>) -> String {
        let who = name.map_or_else(|| "unnamed client".to_string(), |n| format!("'{n}'"));
        match end {
            ReadEnd::EndOfStream => {
                tracing::info!("{} at {} closed the connection", who, self.client);
                "client terminated".to_string()
            }
            ReadEnd::Failed(e) => {
                let e = SessionError::Read(e);
                tracing::info!("{} at {}: {}", who, self.client, e);
                e.to_string()
            }
            ReadEnd::Closed if self.state.shutdown.is_cancelled() => {
                self.send(Outbound::line(protocol::SHUTDOWN_NOTICE));
                tracing::info!("Closing {} at {} for shutdown", who, self.client);
                "server shutdown".to_string()
            }
            ReadEnd::Closed => {
                tracing::info!("Connection to {} at {} was dropped", who, self.client);
                "connection dropped".to_string()
            }
        }
    }

    fn send(&self, item: Outbound) {
        if let Err(e) = self.handle.deliver(item) {
            tracing::debug!("Could not queue output for {}: {}", self.client, e);
            self.handle.close();
        }
    }

    fn log(&self, kind: EventKind, details: &str) {
        self.state.events.log_event(kind, &self.client, details);
    }
}
