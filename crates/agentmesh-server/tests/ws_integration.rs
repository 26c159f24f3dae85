//! WebSocket tests for the `/ws/{client_id}` subscription channel.
//!
//! The server runs with a short heartbeat interval so idle behavior can be
//! observed within a test.

use std::net::SocketAddr;
use std::time::Duration;

use agentmesh_server::{create_app_state, start_server_with_state, OrchestratorConfig, ServerConfig};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HEARTBEAT: Duration = Duration::from_millis(300);

async fn spawn_server() -> SocketAddr {
    let config = OrchestratorConfig {
        heartbeat_interval: HEARTBEAT,
        ..OrchestratorConfig::default().without_delays()
    };
    let state = create_app_state(config, None)
        .await
        .expect("Failed to build state");
    start_server_with_state(
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workflows_file: None,
        },
        state,
    )
    .await
    .expect("Failed to start server")
}

async fn connect(addr: SocketAddr, client_id: &str) -> Socket {
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/{}", addr, client_id))
        .await
        .expect("Failed to connect");
    socket
}

/// Next text frame, failing the test if none arrives within `wait`.
async fn next_text(socket: &mut Socket, wait: Duration) -> String {
    loop {
        let frame = tokio::time::timeout(wait, socket.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            return text.as_str().to_owned();
        }
    }
}

async fn next_event(socket: &mut Socket, wait: Duration) -> Value {
    serde_json::from_str(&next_text(socket, wait).await).expect("Frame is not JSON")
}

#[tokio::test]
async fn test_welcome_then_ping_pong() {
    let addr = spawn_server().await;
    let mut socket = connect(addr, "client-a").await;

    let welcome = next_event(&mut socket, Duration::from_secs(2)).await;
    assert_eq!(welcome["type"], "connection_established");
    assert_eq!(welcome["clientId"], "client-a");
    assert_eq!(welcome["availableWorkflows"].as_array().unwrap().len(), 4);

    socket.send(Message::Text("ping".into())).await.unwrap();
    assert_eq!(next_text(&mut socket, Duration::from_secs(2)).await, "pong");

    socket.send(Message::Text("hello there".into())).await.unwrap();
    let echo = next_event(&mut socket, Duration::from_secs(2)).await;
    assert_eq!(echo["type"], "echo");
    assert_eq!(echo["message"], "Received: hello there");
}

#[tokio::test]
async fn test_heartbeat_only_after_idle_interval() {
    let addr = spawn_server().await;
    let mut socket = connect(addr, "client-b").await;
    let _ = next_event(&mut socket, Duration::from_secs(2)).await;

    // Activity more often than the interval keeps heartbeats away.
    for _ in 0..5 {
        tokio::time::sleep(HEARTBEAT / 3).await;
        socket.send(Message::Text("ping".into())).await.unwrap();
        assert_eq!(next_text(&mut socket, Duration::from_secs(2)).await, "pong");
    }

    let heartbeat = next_event(&mut socket, HEARTBEAT * 4).await;
    assert_eq!(heartbeat["type"], "heartbeat");
    assert_eq!(heartbeat["activeWorkflows"], 0);
}

#[tokio::test]
async fn test_workflow_events_arrive_in_step_order() {
    let addr = spawn_server().await;
    let mut socket = connect(addr, "client-c").await;
    let _ = next_event(&mut socket, Duration::from_secs(2)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/workflows/customer_optimization", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let mut steps = Vec::new();
    loop {
        let event = next_event(&mut socket, Duration::from_secs(2)).await;
        match event["type"].as_str() {
            Some("workflow_progress") => {
                assert_eq!(event["workflowName"], "customer_optimization");
                assert_eq!(event["totalSteps"], 3);
                steps.push(event["step"].as_u64().unwrap());
            }
            Some("workflow_completed") => {
                assert_eq!(event["totalAgents"], 3);
                break;
            }
            Some("heartbeat") => continue,
            other => panic!("unexpected event type: {:?}", other),
        }
    }
    assert_eq!(steps, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_reconnect_with_same_id_keeps_new_subscription() {
    let addr = spawn_server().await;
    let mut first = connect(addr, "dup").await;
    let _ = next_event(&mut first, Duration::from_secs(2)).await;

    let mut second = connect(addr, "dup").await;
    let _ = next_event(&mut second, Duration::from_secs(2)).await;

    // The first connection is closed by the server once it is replaced.
    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(Ok(frame)) = first.next().await {
            if frame.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    let report: Value = reqwest::Client::new()
        .post(format!("http://{}/api/events/simulate/low_stock", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["broadcastedTo"], 1);

    let event = next_event(&mut second, Duration::from_secs(2)).await;
    assert_eq!(event["type"], "simulated_event");
    assert_eq!(event["eventType"], "low_stock");
}
