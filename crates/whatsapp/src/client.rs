use std::{sync::Arc, time::Duration};

use {
    anyhow::Context,
    futures::{SinkExt, StreamExt},
    quickreply_auth::AuthStore,
    quickreply_pipeline::Pipeline,
    tokio::{net::TcpStream, sync::mpsc},
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, info, warn},
};

use crate::{
    outbound::SidecarOutbound,
    types::{GatewayFrame, SidecarFrame},
};

/// Wait between sidecar connection attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Outbound frame queue depth. Sends beyond this apply backpressure on the
/// flush tasks, which is fine — the sidecar link is local and fast.
const OUTBOUND_QUEUE: usize = 32;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the session loop ended.
enum Disconnect {
    /// The pairing was revoked; reconnecting is pointless.
    LoggedOut,
    /// Transport-level loss; reconnect and resume.
    ConnectionLost,
}

/// Long-lived connection to the Baileys sidecar.
///
/// Inbound messages are fed through the pipeline sequentially, which keeps
/// fragments for one conversation in arrival order. Credential updates are
/// written through the session store as they arrive. The loop reconnects
/// on connection loss and only ends when the sidecar reports a logout.
pub struct SidecarClient {
    url: String,
    connect_attempts: u32,
    pipeline: Arc<Pipeline>,
    store: Arc<AuthStore>,
    outbound: SidecarOutbound,
}

impl SidecarClient {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        connect_attempts: u32,
        pipeline: Arc<Pipeline>,
        store: Arc<AuthStore>,
        outbound: SidecarOutbound,
    ) -> Self {
        Self {
            url: url.into(),
            connect_attempts,
            pipeline,
            store,
            outbound,
        }
    }

    /// Connect and serve until the session is logged out.
    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            let ws = self.connect_with_retry().await?;
            match self.serve(ws).await? {
                Disconnect::LoggedOut => {
                    info!("sidecar session logged out, shutting down");
                    return Ok(());
                },
                Disconnect::ConnectionLost => {
                    warn!("sidecar connection lost, reconnecting");
                },
            }
        }
    }

    async fn connect_with_retry(&self) -> anyhow::Result<WsStream> {
        for attempt in 1..=self.connect_attempts {
            match connect_async(self.url.as_str()).await {
                Ok((ws, _response)) => {
                    info!(url = %self.url, "connected to sidecar");
                    return Ok(ws);
                },
                Err(error) => {
                    warn!(attempt, %error, "sidecar connect failed");
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                },
            }
        }
        anyhow::bail!(
            "could not reach sidecar at {} after {} attempts",
            self.url,
            self.connect_attempts
        )
    }

    async fn serve(&self, ws: WsStream) -> anyhow::Result<Disconnect> {
        let (mut write, mut read) = ws.split();
        let (tx, mut rx) = mpsc::channel::<GatewayFrame>(OUTBOUND_QUEUE);
        self.outbound.attach(tx.clone());

        // Resume (or start pairing for) the session with what we have
        // persisted.
        let state = serde_json::to_value(self.store.snapshot().await?)
            .context("failed to serialize session record")?;
        if tx.send(GatewayFrame::Login { state }).await.is_err() {
            self.outbound.detach();
            return Ok(Disconnect::ConnectionLost);
        }

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    // `tx` is held above, so recv can't return None here.
                    let Some(frame) = frame else {
                        self.outbound.detach();
                        return Ok(Disconnect::ConnectionLost);
                    };
                    let text = serde_json::to_string(&frame)
                        .context("failed to serialize gateway frame")?;
                    if let Err(error) = write.send(Message::text(text)).await {
                        warn!(%error, "failed to write to sidecar");
                        self.outbound.detach();
                        return Ok(Disconnect::ConnectionLost);
                    }
                },
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SidecarFrame>(&text) {
                            Ok(frame) => {
                                if let Some(disconnect) = self.handle_frame(frame).await {
                                    self.outbound.detach();
                                    return Ok(disconnect);
                                }
                            },
                            Err(error) => warn!(%error, "unparseable sidecar frame"),
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        self.outbound.detach();
                        return Ok(Disconnect::ConnectionLost);
                    },
                    Some(Ok(_)) => {
                        // Ping/pong/binary: nothing to do.
                    },
                    Some(Err(error)) => {
                        warn!(%error, "sidecar read error");
                        self.outbound.detach();
                        return Ok(Disconnect::ConnectionLost);
                    },
                },
            }
        }
    }

    async fn handle_frame(&self, frame: SidecarFrame) -> Option<Disconnect> {
        match frame {
            SidecarFrame::Qr { code } => {
                info!("pairing required, scan the QR code below");
                println!("{code}");
                None
            },
            SidecarFrame::Connected { jid } => {
                info!(?jid, "whatsapp session open");
                None
            },
            SidecarFrame::Disconnected { reason, logged_out } => {
                warn!(?reason, logged_out, "whatsapp session closed");
                Some(if logged_out {
                    Disconnect::LoggedOut
                } else {
                    Disconnect::ConnectionLost
                })
            },
            SidecarFrame::Message(wire) => {
                let inbound = wire.into_inbound();
                debug!(chat_jid = %inbound.chat_jid, kind = ?inbound.kind, "inbound message");
                self.pipeline.handle_inbound(inbound).await;
                None
            },
            SidecarFrame::CredsUpdate { state } => {
                match serde_json::from_value(state) {
                    Ok(record) => {
                        if let Err(error) = self.store.update(|rec| *rec = record).await {
                            warn!(%error, "failed to persist credentials update");
                        }
                    },
                    Err(error) => warn!(%error, "malformed credentials update, ignoring"),
                }
                None
            },
            SidecarFrame::SendResult { ok, error } => {
                if !ok {
                    warn!(?error, "sidecar failed to deliver a message");
                }
                None
            },
        }
    }
}
