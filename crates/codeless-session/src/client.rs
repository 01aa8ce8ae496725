//! WebSocket driver for the editor connection.
//!
//! The application dials the editor. For each established socket:
//! - a connection is registered in the [`ConnectionTable`],
//! - a writer task drains the connection's outbound channel into the socket,
//! - the reader loop decodes frames and dispatches one unit of work each,
//! - when the socket ends the connection is torn down, so every pending
//!   unit of work resolves to nothing and does not respond.
//!
//! A session counts as connected once the first frame arrives. When a
//! connected session drops, the client reconnects with
//! [`RetryPolicy::AFTER_DISCONNECT`]. A session the editor ended with
//! `disconnect` is not resumed.

use std::sync::Arc;

use anyhow::Result;
use codeless_core::TransformerRegistry;
use codeless_protocol::{decode_envelope, encode_outbound};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::commands::CommandContext;
use crate::config::{Config, RetryPolicy};
use crate::connection::ConnectionTable;
use crate::types::{Outbound, OutboundRx};
use crate::ui::UiHandle;

type EditorSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Callback = Arc<dyn Fn() + Send + Sync>;

/// How a served socket ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Closed before the first frame arrived.
    NeverStarted,
    /// The editor sent `disconnect`.
    Released,
    /// A started session dropped.
    Lost,
}

pub struct EditorClient {
    config: Config,
    table: ConnectionTable,
    ui: UiHandle,
    transformers: Arc<TransformerRegistry>,
    on_connect: Option<Callback>,
    on_disconnect: Option<Callback>,
}

impl EditorClient {
    pub fn new(config: Config, ui: UiHandle, transformers: Arc<TransformerRegistry>) -> Self {
        EditorClient {
            config,
            table: ConnectionTable::new(),
            ui,
            transformers,
            on_connect: None,
            on_disconnect: None,
        }
    }

    /// Called when the first frame of a session arrives.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called when a connected session drops.
    pub fn on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    /// Connect and serve sessions until the retry budget runs out.
    pub async fn run(&self) -> Result<()> {
        let mut policy = self.config.initial_retry_policy();

        loop {
            let Some(socket) = self.open(policy).await else {
                warn!(url = %self.config.editor_url, "giving up on editor connection");
                return Ok(());
            };

            match self.serve(socket).await {
                SessionEnd::NeverStarted => {
                    info!("editor closed the socket before the session started");
                    return Ok(());
                }
                SessionEnd::Released => {
                    info!("editor ended the session");
                    return Ok(());
                }
                SessionEnd::Lost => {}
            }

            if let Some(callback) = &self.on_disconnect {
                callback();
            }
            policy = RetryPolicy::AFTER_DISCONNECT;
        }
    }

    async fn open(&self, policy: RetryPolicy) -> Option<EditorSocket> {
        let url = self.config.editor_url.as_str();
        for retry in 0..=policy.max_retries {
            debug!(url, retry, max_retries = policy.max_retries, "opening editor socket");
            match connect_async(url).await {
                Ok((socket, _response)) => {
                    info!(url, "editor socket open");
                    return Some(socket);
                }
                Err(e) => warn!(url, retry, error = %e, "editor connection failed"),
            }
            if retry < policy.max_retries {
                tokio::time::sleep(policy.delay(retry)).await;
            }
        }
        None
    }

    /// Serve one socket until it ends.
    async fn serve(&self, socket: EditorSocket) -> SessionEnd {
        let (sink, mut source) = socket.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let handle = self.table.register(out_tx).await;
        let connection_id = handle.id();
        let connection = handle.resolve().await;
        let ctx = CommandContext::new(
            handle.clone(),
            self.ui.clone(),
            Arc::clone(&self.transformers),
            self.config.command_concurrency,
        );

        let writer = tokio::spawn(write_frames(sink, out_rx));

        let mut connected = false;
        while let Some(frame) = source.next().await {
            let bytes = match frame {
                Ok(WsMessage::Text(text)) => text.as_str().as_bytes().to_vec(),
                Ok(WsMessage::Binary(data)) => data.to_vec(),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(connection = %connection_id, error = %e, "editor socket error");
                    break;
                }
            };

            if !connected {
                connected = true;
                info!(connection = %connection_id, "editor session started");
                if let Some(callback) = &self.on_connect {
                    callback();
                }
            }

            match decode_envelope(&bytes) {
                Ok(envelope) => {
                    debug!(
                        connection = %connection_id,
                        message_type = %envelope.message_type(),
                        "received message"
                    );
                    ctx.dispatch_envelope(envelope);
                }
                Err(e) => {
                    warn!(connection = %connection_id, error = %e, "badly formed socket message")
                }
            }
        }

        handle.teardown().await;
        writer.abort();
        info!(connection = %connection_id, "editor socket closed");

        if !connected {
            SessionEnd::NeverStarted
        } else if connection.is_some_and(|c| c.is_released()) {
            SessionEnd::Released
        } else {
            SessionEnd::Lost
        }
    }
}

async fn write_frames<S>(mut sink: S, mut out_rx: OutboundRx)
where
    S: futures::Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = out_rx.recv().await {
        match frame {
            Outbound::Message(msg) => {
                let text = match encode_outbound(&msg).map(String::from_utf8) {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        error!(error = %e, "encoded frame is not UTF-8");
                        continue;
                    }
                    Err(e) => {
                        error!(error = %e, ?msg, "cannot encode response");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    warn!(error = %e, "editor socket write failed");
                    break;
                }
            }
            Outbound::Close => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
}
