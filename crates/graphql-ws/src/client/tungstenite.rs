//! A tokio client over `tokio-tungstenite`.

use futures_util::{pin_mut, SinkExt, StreamExt};
use tokio::{sync::mpsc, time::Instant};
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    handshake::client::Request,
    http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue},
    protocol::{frame::coding::CloseCode as WsCloseCode, CloseFrame as WsCloseFrame},
    Message as WsMessage,
};
use ulid::Ulid;

use super::{Client, ClientChannel, ClientEvent, EventKind, ReadyState};
use crate::{
    config::ClientConfig,
    protocol::{CloseCode, OperationRequest},
    session::deadline,
    transport::{CloseFrame, Frame},
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid subprotocol: {0}")]
    InvalidProtocol(#[from] tungstenite::http::header::InvalidHeaderValue),
    #[error(transparent)]
    Websocket(Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for ClientError {
    fn from(error: tungstenite::Error) -> Self {
        ClientError::Websocket(Box::new(error))
    }
}

type Listener = Box<dyn FnMut(&ClientEvent) + Send>;

enum Command {
    Subscribe { id: String, request: OperationRequest },
    Complete { id: String },
    Listen { kind: EventKind, listener: Listener },
    Close(CloseFrame),
}

/// Controls a [`ClientActor`]. Usable before the connection is established:
/// operations started early are sent once the socket opens.
#[derive(Clone)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ClientHandle {
    pub fn subscribe(&self, request: OperationRequest) -> String {
        let id = Ulid::new().to_string();
        self.subscribe_with_id(&id, request);
        id
    }

    pub fn subscribe_with_id(&self, id: &str, request: OperationRequest) {
        self.command(Command::Subscribe {
            id: id.to_owned(),
            request,
        });
    }

    pub fn complete(&self, id: &str) {
        self.command(Command::Complete { id: id.to_owned() });
    }

    pub fn on(&self, kind: EventKind, listener: impl FnMut(&ClientEvent) + Send + 'static) {
        self.command(Command::Listen {
            kind,
            listener: Box::new(listener),
        });
    }

    pub fn close(&self, code: impl Into<u16>, reason: impl Into<String>) {
        self.command(Command::Close(CloseFrame::new(code, reason)));
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Client connection is gone, dropping command");
        }
    }
}

struct SocketChannel {
    outgoing: mpsc::UnboundedSender<WsMessage>,
}

impl ClientChannel for SocketChannel {
    fn send(&mut self, payload: String) {
        self.outgoing.send(WsMessage::Text(payload)).ok();
    }

    fn close(&mut self, frame: CloseFrame) {
        let frame = frame.truncated();
        let frame = WsCloseFrame {
            code: WsCloseCode::from(frame.code),
            reason: frame.reason.into(),
        };

        self.outgoing.send(WsMessage::Close(Some(frame))).ok();
    }
}

/// Owns the socket of one connection and drives its [`Client`].
pub struct ClientActor {
    request: Request,
    client: Client<SocketChannel>,
    commands: mpsc::UnboundedReceiver<Command>,
    outgoing: mpsc::UnboundedReceiver<WsMessage>,
}

/// Prepares a connection. Nothing happens on the network until [`ClientActor::run`] is polled.
pub fn connect(
    request: impl IntoClientRequest,
    config: ClientConfig,
) -> Result<(ClientHandle, ClientActor), ClientError> {
    let mut request = request.into_client_request()?;

    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_str(&config.protocol)?);

    let (command_sender, commands) = mpsc::unbounded_channel();
    let (outgoing_sender, outgoing) = mpsc::unbounded_channel();

    let actor = ClientActor {
        request,
        client: Client::new(
            SocketChannel {
                outgoing: outgoing_sender,
            },
            config,
        ),
        commands,
        outgoing,
    };

    Ok((
        ClientHandle {
            commands: command_sender,
        },
        actor,
    ))
}

impl ClientActor {
    /// Connects and runs until the connection closes.
    pub async fn run(self) -> Result<(), ClientError> {
        let ClientActor {
            request,
            mut client,
            mut commands,
            mut outgoing,
        } = self;

        let mut accepting_commands = true;

        let connecting = tokio_tungstenite::connect_async(request);
        pin_mut!(connecting);

        let (socket, _response) = loop {
            tokio::select! {
                connected = &mut connecting => match connected {
                    Ok(connected) => break connected,
                    Err(error) => {
                        client.handle_close(WsCloseCode::Abnormal.into(), error.to_string());
                        return Err(error.into());
                    }
                },
                command = commands.recv(), if accepting_commands => match command {
                    Some(Command::Close(frame)) => {
                        client.handle_close(frame.code, frame.reason);
                        return Ok(());
                    }
                    Some(command) => apply(&mut client, command),
                    None => accepting_commands = false,
                },
            }
        };

        let (mut sink, mut stream) = socket.split();

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing.recv().await {
                let closing = message.is_close();

                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        client.handle_open();

        let ack_deadline = client
            .config()
            .connection_ack_wait_timeout
            .map(|timeout| Instant::now() + timeout);

        let result = loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(WsMessage::Text(text))) => client.handle_frame(Frame::Text(text)),
                    Some(Ok(WsMessage::Binary(bytes))) => client.handle_frame(Frame::Binary(bytes)),
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (frame.code.into(), frame.reason.into_owned()),
                            None => (WsCloseCode::Status.into(), String::new()),
                        };
                        client.handle_close(code, reason);
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        client.handle_close(WsCloseCode::Abnormal.into(), error.to_string());
                        break Err(error.into());
                    }
                    None => {
                        client.handle_close(WsCloseCode::Abnormal.into(), String::new());
                        break Ok(());
                    }
                },
                command = commands.recv(), if accepting_commands => match command {
                    Some(command) => apply(&mut client, command),
                    None => accepting_commands = false,
                },
                () = deadline(ack_deadline), if !client.is_acknowledged() && client.ready_state() == ReadyState::Open => {
                    tracing::warn!("No connection_ack received in time");
                    client.close(CloseCode::ConnectionAcknowledgementTimeout.into());
                }
            }
        };

        drop(client);
        writer.await.ok();

        result
    }
}

fn apply(client: &mut Client<SocketChannel>, command: Command) {
    match command {
        Command::Subscribe { id, request } => client.subscribe_with_id(&id, request),
        Command::Complete { id } => client.complete(&id),
        Command::Listen { kind, listener } => {
            client.on(kind, listener);
        }
        Command::Close(frame) => client.close(frame),
    }
}
