use std::sync::{Arc, RwLock};

use {
    quickreply_common::{ChannelOutbound, Error},
    tokio::sync::mpsc,
    tracing::debug,
};

use crate::types::GatewayFrame;

type FrameSender = mpsc::Sender<GatewayFrame>;

/// Outbound adapter backed by the sidecar connection.
///
/// The sender slot is empty until the client connects and is cleared on
/// disconnect, so sends during an outage fail fast instead of queueing
/// into the void.
#[derive(Clone, Default)]
pub struct SidecarOutbound {
    tx: Arc<RwLock<Option<FrameSender>>>,
}

impl SidecarOutbound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, sender: FrameSender) {
        let mut slot = self.tx.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sender);
    }

    pub(crate) fn detach(&self) {
        let mut slot = self.tx.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

#[async_trait::async_trait]
impl ChannelOutbound for SidecarOutbound {
    async fn send_text(&self, chat_jid: &str, text: &str) -> quickreply_common::Result<()> {
        let sender = {
            let slot = self.tx.read().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        let Some(sender) = sender else {
            return Err(Error::message("sidecar not connected"));
        };

        debug!(chat_jid, len = text.len(), "queueing send to sidecar");
        sender
            .send(GatewayFrame::Send {
                to: chat_jid.to_string(),
                text: text.to_string(),
            })
            .await
            .map_err(|_| Error::message("sidecar connection closed"))
    }
}
