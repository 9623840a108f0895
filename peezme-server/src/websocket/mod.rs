use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

pub mod connection;

use connection::ConnectionId;
pub use connection::{ConnectionManager, Subscription};

/// Stream matching events to one client until either side hangs up. A text
/// frame holding a `Subscription` replaces the connection's filter.
pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    subscription: Subscription,
) {
    let connection_id = ConnectionId::new();
    info!(connection_id = %connection_id, ?subscription, "Event subscriber connected");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let event_receiver = connection_manager.create_connection(connection_id, subscription);

    let incoming_handler = {
        let connection_manager = connection_manager.clone();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_close() => break,
                    Ok(msg) => {
                        let Ok(text) = msg.to_str() else {
                            continue;
                        };
                        match serde_json::from_str::<Subscription>(text) {
                            Ok(subscription) => {
                                info!(connection_id = %connection_id, ?subscription, "Subscription changed");
                                connection_manager.update_subscription(connection_id, subscription);
                            }
                            Err(e) => {
                                warn!(connection_id = %connection_id, "Ignoring bad subscription: {}", e)
                            }
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = event_receiver;

        while let Some(event) = receiver.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send event to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Subscriber {} disconnected", connection_id);
    connection_manager.remove_connection(connection_id);
}
