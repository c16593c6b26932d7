//! Event channel integration tests
//!
//! Each test runs a scripted TCP listener standing in for the server's
//! event bus: it answers the handshake, then pushes frames or drops the
//! connection according to the scenario.

use bakery_client::channel::{read_message, write_message};
use bakery_client::{ChannelError, ChannelState, EventChannel, OrderEvent};
use chrono::Utc;
use rust_decimal::Decimal;
use shared::message::{BusMessage, HandshakeAckPayload, MessageType, PROTOCOL_VERSION};
use shared::order::{Order, OrderStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

fn sample_order(id: u64) -> Order {
    Order {
        id,
        order_number: format!("PED20260825{:04}", id),
        customer_id: 1,
        products: Vec::new(),
        total_price: Decimal::new(150, 2),
        order_date: Utc::now(),
        status: OrderStatus::InPreparation,
        pickup_time: None,
        payment_intent_id: format!("pi_{}", id),
        review_id: None,
        deleted: false,
    }
}

/// Answer the client's handshake with an accepting ack
async fn accept_handshake(stream: &mut TcpStream) {
    let hs = read_message(stream).await.unwrap();
    assert_eq!(hs.message_type, MessageType::Handshake);
    let ack = BusMessage::handshake_ack(
        &HandshakeAckPayload {
            accepted: true,
            server_version: PROTOCOL_VERSION,
            message: None,
        },
        hs.request_id,
    );
    write_message(stream, &ack).await.unwrap();
}

async fn wait_for_state(
    rx: &mut watch::Receiver<ChannelState>,
    target: ChannelState,
) -> ChannelState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == target))
        .await
        .expect("timed out waiting for channel state")
        .map(|s| *s)
        .unwrap()
}

fn channel_for(addr: std::net::SocketAddr, attempts: u32, delay_ms: u64) -> EventChannel {
    EventChannel::from_config(
        &bakery_client::ClientConfig::new("http://unused")
            .with_event_addr(addr.to_string())
            .with_reconnect_attempts(attempts)
            .with_reconnect_delay(Duration::from_millis(delay_ms)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_events_arrive_in_publish_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_handshake(&mut stream).await;
        for id in 1..=3 {
            let event = OrderEvent::new_order(sample_order(id));
            write_message(&mut stream, &BusMessage::event(&event))
                .await
                .unwrap();
        }
        // Keep the connection open until the test is done
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let channel = channel_for(addr, 5, 50);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _guard = channel.subscribe("new-order", move |event: &OrderEvent| {
        let _ = tx.send(event.order.id);
    });

    channel.connect().await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let id = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap();
        seen.push(id);
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let counter = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            accept_handshake(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        }
    });

    let channel = channel_for(addr, 5, 50);
    channel.connect().await.unwrap();
    assert!(channel.is_connected());

    // Second call must not open a second connection
    channel.connect().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reconnect_bound_is_exhausted() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    // First connection handshakes and drops; every later connection is
    // dropped before the ack, so each reconnect attempt fails.
    let counter = accepts.clone();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        counter.fetch_add(1, Ordering::SeqCst);
        accept_handshake(&mut stream).await;
        drop(stream);

        loop {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let channel = channel_for(addr, 5, 20);
    let mut state = channel.state();
    channel.connect().await.unwrap();

    assert_eq!(
        wait_for_state(&mut state, ChannelState::Exhausted).await,
        ChannelState::Exhausted
    );

    // Initial connection plus exactly five reconnect attempts
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 6);
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn test_reconnect_recovers_and_resumes_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // First connection: handshake, then immediate drop
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_handshake(&mut stream).await;
        drop(stream);

        // Second connection: handshake and deliver an event
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_handshake(&mut stream).await;
        let event = OrderEvent::new_order(sample_order(42));
        write_message(&mut stream, &BusMessage::event(&event))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let channel = channel_for(addr, 5, 20);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _guard = channel.subscribe("new-order", move |event: &OrderEvent| {
        let _ = tx.send(event.order.id);
    });
    let mut state = channel.state();
    channel.connect().await.unwrap();

    let id = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for post-reconnect event")
        .unwrap();
    assert_eq!(id, 42);
    assert_eq!(
        wait_for_state(&mut state, ChannelState::Connected).await,
        ChannelState::Connected
    );
}

#[tokio::test]
async fn test_handshake_rejection_fails_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let hs = read_message(&mut stream).await.unwrap();
        let ack = BusMessage::handshake_ack(
            &HandshakeAckPayload {
                accepted: false,
                server_version: PROTOCOL_VERSION,
                message: Some("Unsupported protocol version".to_string()),
            },
            hs.request_id,
        );
        write_message(&mut stream, &ack).await.unwrap();
    });

    let channel = channel_for(addr, 5, 20);
    let err = channel.connect().await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeRejected(_)));
    assert!(!channel.is_connected());

    // A rejected connect leaves the channel usable for another attempt
    let err = channel.connect().await.unwrap_err();
    assert!(matches!(err, ChannelError::Connection(_) | ChannelError::Disconnected));
}

#[tokio::test]
async fn test_close_stops_the_channel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        accept_handshake(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let channel = channel_for(addr, 5, 20);
    let mut state = channel.state();
    channel.connect().await.unwrap();
    assert_eq!(
        wait_for_state(&mut state, ChannelState::Connected).await,
        ChannelState::Connected
    );

    channel.close();
    assert_eq!(
        wait_for_state(&mut state, ChannelState::Disconnected).await,
        ChannelState::Disconnected
    );
}
