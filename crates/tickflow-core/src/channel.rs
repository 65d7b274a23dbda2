//! Message channel seams.
//!
//! The channel decouples ingestion cadence from processing cadence with a
//! deliberately narrow interface: publish-with-confirmation on one side,
//! subscribe-and-receive on the other. Delivery is at-least-once and carries
//! no dedup; consumers must tolerate duplicate payloads.
//!
//! A broker-grade transport is an external collaborator behind these traits.
//! [`InProcessChannel`] is the bundled transport used by the composition root
//! and by tests.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Errors surfaced by a channel transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel closed: {0}")]
    Closed(String),
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Broker acknowledgment returned once a payload is durably accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: String,
}

/// One payload handed to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub payload: Vec<u8>,
}

/// Producer side. Must be safe to share across concurrent in-flight requests.
///
/// `publish` resolves only once the transport has accepted the message; a
/// caller reporting success after awaiting it is giving a delivery guarantee,
/// not fire-and-forget.
pub trait ChannelPublisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        payload: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<PublishReceipt, ChannelError>> + Send + 'a>>;
}

/// Consumer side. `receive` suspends while the channel is empty and yields
/// `None` once the channel is closed and fully drained.
pub trait ChannelSubscription: Send {
    fn receive<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Delivery>> + Send + 'a>>;
}

/// Bounded in-process transport over a tokio mpsc pair.
///
/// Publish confirmation is the send completing against the bounded buffer,
/// so a slow consumer backpressures producers instead of dropping payloads.
pub struct InProcessChannel;

impl InProcessChannel {
    pub fn bounded(capacity: usize) -> (InProcessPublisher, InProcessSubscription) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            InProcessPublisher { tx },
            InProcessSubscription { rx },
        )
    }
}

/// Producer half of [`InProcessChannel`]; cheap to clone and share.
#[derive(Clone)]
pub struct InProcessPublisher {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelPublisher for InProcessPublisher {
    fn publish<'a>(
        &'a self,
        payload: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<PublishReceipt, ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            let message_id = Uuid::new_v4().to_string();
            self.tx
                .send(Delivery {
                    message_id: message_id.clone(),
                    payload,
                })
                .await
                .map_err(|_| ChannelError::Closed(String::from("subscriber side dropped")))?;
            Ok(PublishReceipt { message_id })
        })
    }
}

/// Consumer half of [`InProcessChannel`]; single consumer per channel.
pub struct InProcessSubscription {
    rx: mpsc::Receiver<Delivery>,
}

impl ChannelSubscription for InProcessSubscription {
    fn receive<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Option<Delivery>> + Send + 'a>> {
        Box::pin(async move { self.rx.recv().await })
    }
}
