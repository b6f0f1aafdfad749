use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use hopper_protocol::{Envelope, ItemBody, WaitRequest, delivery_body};
use hopper_queue::{DeliverFn, SubscriberId, Waiter};

use crate::state::Registry;

/// `GET /take/ws` — upgrade and run the subscription loop.
pub async fn upgrade(State(registry): State<Arc<Registry>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, registry))
}

/// One connected subscriber. Frames are written through an unbounded
/// channel so deliveries (which run on a publisher's stack, under the
/// registry lock) never block on the socket.
async fn handle_connection(socket: WebSocket, registry: Arc<Registry>) {
    let subscriber = registry.next_subscriber_id();
    debug!(%subscriber, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                handle_wait(&registry, subscriber, &tx, text.as_str()).await;
            }
            Message::Close(_) => break,
            // pings are answered by axum; binary frames are not part of
            // the protocol
            _ => {}
        }
    }

    registry.cancel_for_subscriber(subscriber).await;
    // cancelled waiters may still hold sender clones; don't wait for them
    writer.abort();
    debug!(%subscriber, "websocket closed");
}

/// Process one subscription frame.
async fn handle_wait(
    registry: &Arc<Registry>,
    subscriber: SubscriberId,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let request = match WaitRequest::parse(text) {
        Ok(request) => request,
        Err(err) => {
            send_failure(tx, &err.to_string());
            return;
        }
    };

    trace!(%subscriber, identifier = %request.identifier, queue = %request.queue, "wait");

    let waiter = Waiter::new(
        request.identifier,
        subscriber,
        request.key,
        deliver_over(tx.clone()),
    );

    if registry.wait(&request.queue, waiter).await.is_err() {
        send_failure(tx, "queue not found");
    }
}

/// Delivery hook: encode `{id, item}` as a success envelope and enqueue it
/// to the subscriber. Runs on the publisher's call stack; a closed channel
/// means the client is gone and the item is consumed regardless.
fn deliver_over(tx: mpsc::UnboundedSender<String>) -> DeliverFn {
    Box::new(move |waiter, item| {
        if waiter.is_cancelled() {
            return;
        }
        let body = delivery_body(
            waiter.identifier(),
            &ItemBody::new(item.key.as_deref(), &item.value),
        );
        if tx.send(Envelope::success(body).to_json()).is_err() {
            debug!(identifier = waiter.identifier(), "subscriber gone before delivery");
        }
    })
}

fn send_failure(tx: &mpsc::UnboundedSender<String>, message: &str) {
    let _ = tx.send(Envelope::failure(message).to_json());
}
