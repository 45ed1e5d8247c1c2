use std::{convert::Infallible, time::Duration as StdDuration};

use axum::{
    extract::{
        Extension, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration as TokioDuration, interval};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TMessage};

use crate::{AppState, models::CurrentUser};

const MAX_PROXY_SYMBOLS: usize = 50;

#[derive(Deserialize)]
pub struct TicksWsQuery {
    pub symbols: String,
}

// GET /ws/ticks?symbols=BTCUSDT,ETHUSDT
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<TicksWsQuery>,
) -> impl IntoResponse {
    let mut syms: Vec<String> = q
        .symbols
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    syms.sort();
    syms.dedup();

    if syms.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing symbols").into_response();
    }

    if syms.len() > MAX_PROXY_SYMBOLS {
        syms.truncate(MAX_PROXY_SYMBOLS);
    }

    let ws_base = state.settings.feed_ws_url.clone();
    ws.on_upgrade(move |socket| handle_ticks_socket(socket, syms, ws_base))
}

async fn handle_ticks_socket(mut client_ws: WebSocket, symbols: Vec<String>, ws_base: String) {
    // combined stream: one upstream connection for all requested symbols
    let streams: Vec<String> = symbols.iter().map(|s| format!("{s}@trade")).collect();
    let url = format!("{}/stream?streams={}", ws_base, streams.join("/"));

    tracing::info!("WS client connected: symbols={:?}", symbols);

    let (feed_ws, _) = match connect_async(url.as_str()).await {
        Ok(x) => x,
        Err(err) => {
            tracing::error!("feed WS connect failed: {}", err);
            let _ = client_ws
                .send(Message::Text(format!(
                    r#"{{"type":"error","message":"feed connect failed: {}"}}"#,
                    err
                )))
                .await;
            let _ = client_ws.close().await;
            return;
        }
    };

    tracing::info!("feed WS connected OK");

    let (mut feed_write, mut feed_read) = feed_ws.split();

    // Ping browser to keep alive
    let mut ping = interval(TokioDuration::from_secs(25));

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if client_ws.send(Message::Ping(b"ping".to_vec())).await.is_err() {
                    break;
                }
            }

            feed_msg = feed_read.next() => {
                match feed_msg {
                    Some(Ok(TMessage::Text(txt))) => {
                        // forward everything, including feed errors
                        if client_ws.send(Message::Text(txt)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(TMessage::Binary(bin))) => {
                        if client_ws.send(Message::Binary(bin)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(TMessage::Ping(payload))) => {
                        let _ = feed_write.send(TMessage::Pong(payload)).await;
                    }
                    Some(Ok(TMessage::Pong(_))) => {}
                    Some(Ok(TMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }

            client_msg = client_ws.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = client_ws.close().await;
}

// GET /events  (SSE)
pub async fn sse_events(
    State(state): State<AppState>,
    Extension(_u): Extension<CurrentUser>,
) -> Sse<impl futures_util::stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let stream = futures_util::stream::unfold(rx, |mut rx| async {
        let evt = match rx.recv().await {
            Ok(name) => Event::default().event(name).data("1"),
            Err(RecvError::Lagged(_)) => Event::default().event("ping").data("lagged"),
            Err(RecvError::Closed) => Event::default().event("ping").data("closed"),
        };

        Some((Ok(evt), rx))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(StdDuration::from_secs(20))
            .text("keep-alive"),
    )
}
