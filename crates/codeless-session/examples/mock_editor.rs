//! A stand-in editor: accepts one app connection, pushes a few requests
//! and prints whatever comes back.
//!
//! Run this first, then `cargo run -p codeless-session`.

use std::env;
use std::error::Error;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = env::var("MOCK_EDITOR_ADDR").unwrap_or_else(|_| "127.0.0.1:8765".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!("Mock editor listening on ws://{}/connect", addr);

    let (stream, peer) = listener.accept().await?;
    println!("App connected from {}", peer);
    let mut ws = accept_async(stream).await?;

    let script = [
        json!({"type": "device_info_request"}),
        json!({"type": "change_request", "payload": {"actions": [
            {
                "name": "buy_title",
                "path": "/UIView/UIButton",
                "selector": "setTitle:",
                "args": [["Buy now", "IdentityTransformer"]]
            },
            {
                "name": "tint",
                "path": "/UIView",
                "selector": "setBackgroundColor:",
                "args": ["#ff0000"]
            }
        ]}}),
        json!({"type": "tweak_request", "payload": {"tweaks": [
            {"name": "show_banner", "encoding": "c", "value": true}
        ]}}),
        json!({"type": "event_binding_request", "payload": {"events": [
            {
                "name": "tap_buy",
                "event_type": "ui_control",
                "path": "/UIView/UIButton",
                "event_name": "Buy tapped"
            }
        ]}}),
        json!({"type": "clear_request", "payload": {"actions": ["tint"]}}),
    ];

    for request in &script {
        println!(">> {}", request);
        ws.send(Message::Text(request.to_string().into())).await?;

        match timeout(Duration::from_secs(5), ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => println!("<< {}", text.as_str()),
            Ok(Some(Ok(other))) => println!("<< (non-text frame) {:?}", other),
            Ok(Some(Err(e))) => {
                eprintln!("socket error: {}", e);
                return Ok(());
            }
            Ok(None) => {
                println!("App closed the connection.");
                return Ok(());
            }
            Err(_) => println!("(no response within 5s)"),
        }
    }

    println!(">> disconnect");
    ws.send(Message::Text(json!({"type": "disconnect"}).to_string().into())).await?;
    while let Some(frame) = ws.next().await {
        if let Ok(Message::Close(_)) = frame {
            println!("App closed the session.");
            break;
        }
    }
    Ok(())
}
