//! Bounding client rects
//!
//! Layout only exists on the main thread, so a rect is requested with a
//! `GET_BOUNDING_CLIENT_RECT` transfer and arrives later as an inbound
//! message. Requests that are never answered resolve to the zero rect once
//! the runtime's timeout elapses.

use std::future::Future;

use serde::{Deserialize, Serialize};
use smol::future::FutureExt;
use smol::Timer;

use crate::document::Document;
use crate::protocol::TransferMutation;
use crate::{DomResult, NodeIndex};

/// Element box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientRect {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl ClientRect {
    /// Build from the wire form `[top, right, bottom, left, width, height]`
    pub fn from_transfer(data: [f64; 6]) -> Self {
        let [top, right, bottom, left, width, height] = data;
        Self {
            top,
            right,
            bottom,
            left,
            width,
            height,
            x: top,
            y: left,
        }
    }
}

impl Document {
    /// Ask the main thread for `element`'s rect.
    ///
    /// Detached elements resolve to the zero rect without a request. The
    /// returned future owns everything it needs; it completes once
    /// [`Document::handle_message`] receives the answer or the timeout
    /// elapses.
    pub fn get_bounding_client_rect_async(
        &mut self,
        element: NodeIndex,
    ) -> DomResult<impl Future<Output = ClientRect> + use<>> {
        let connected = self.try_node(element)?.is_connected();
        let timeout = self.runtime.options().bounding_rect_timeout;
        let (sender, receiver) = smol::channel::bounded(1);

        if connected {
            // Requests that timed out have dropped their receiver
            self.pending_rects.retain(|_, waiting| {
                waiting.retain(|sender| !sender.is_closed());
                !waiting.is_empty()
            });
            self.pending_rects.entry(element).or_default().push(sender);
            self.runtime.transfer(TransferMutation::GetBoundingClientRect { target: element });
        } else {
            // Nothing was requested, answer right away
            let _ = sender.try_send(ClientRect::default());
        }

        Ok(async move {
            let answer = async { receiver.recv().await.ok() };
            let expired = async {
                Timer::after(timeout).await;
                tracing::warn!("Bounding rect for {} timed out after {:?}", element, timeout);
                None
            };
            answer.or(expired).await.unwrap_or_default()
        })
    }

    /// Hand a main-thread answer to every request waiting on `target`
    pub(crate) fn resolve_bounding_client_rect(&mut self, target: NodeIndex, data: [f64; 6]) {
        let Some(senders) = self.pending_rects.remove(&target) else {
            tracing::trace!("Dropping unrequested bounding rect for {}", target);
            return;
        };
        let rect = ClientRect::from_transfer(data);
        for sender in senders {
            // The requester may have timed out already
            let _ = sender.try_send(rect);
        }
    }
}
