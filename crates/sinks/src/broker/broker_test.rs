//! Tests for broker framing and TCP delivery against a loopback listener

use std::sync::Arc;

use courier_protocol::{Message, RawSerde};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use super::{encode_record, BrokerConfig, BrokerSink};
use crate::sink::BatchWrite;

fn msg(key: &str, payload: &str) -> Arc<Message> {
    Arc::new(Message::new(key, payload.as_bytes().to_vec()))
}

/// Decode frames written by the sink: (key, body) pairs
fn decode_frames(mut data: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut records = Vec::new();
    while !data.is_empty() {
        let key_len = u32::from_be_bytes(data[..4].try_into().unwrap()) as usize;
        let key = String::from_utf8(data[4..4 + key_len].to_vec()).unwrap();
        data = &data[4 + key_len..];

        let body_len = u32::from_be_bytes(data[..4].try_into().unwrap()) as usize;
        let body = data[4..4 + body_len].to_vec();
        data = &data[4 + body_len..];

        records.push((key, body));
    }
    records
}

#[test]
fn test_encode_record_layout() {
    let mut buf = bytes::BytesMut::new();
    encode_record("ab", b"xyz", &mut buf);

    assert_eq!(
        buf.as_ref(),
        &[0, 0, 0, 2, b'a', b'b', 0, 0, 0, 3, b'x', b'y', b'z']
    );
}

#[test]
fn test_encode_empty_body() {
    let mut buf = bytes::BytesMut::new();
    encode_record("k", b"", &mut buf);

    assert_eq!(buf.as_ref(), &[0, 0, 0, 1, b'k', 0, 0, 0, 0]);
}

#[tokio::test]
async fn test_write_delivers_framed_batch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let config = BrokerConfig::new(addr.to_string());
    let mut sink = BrokerSink::new(config, Box::new(RawSerde));

    let batch = vec![msg("error.db", "boom"), msg("error.net", "down")];
    sink.write(&batch).await.unwrap();
    sink.close().await.unwrap();

    let received = server.await.unwrap();
    let records = decode_frames(&received);
    assert_eq!(
        records,
        vec![
            ("error.db".to_string(), b"boom".to_vec()),
            ("error.net".to_string(), b"down".to_vec()),
        ]
    );
}

#[tokio::test]
async fn test_write_reconnects_after_peer_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: read one frame (13 bytes for key "a", body
        // "1234") then drop, forcing the sink to reconnect later
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut first = vec![0u8; 13];
        socket.read_exact(&mut first).await.unwrap();
        drop(socket);

        // Second connection: read the retried batch
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let config = BrokerConfig::new(addr.to_string());
    let mut sink = BrokerSink::new(config, Box::new(RawSerde));

    let batch = vec![msg("a", "1234")];
    sink.write(&batch).await.unwrap();

    // Write until the dead connection surfaces; the kernel may buffer one
    // or two sends after the peer is gone
    let mut failed = false;
    for _ in 0..20 {
        if sink.write(&batch).await.is_err() {
            failed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(failed, "peer close never surfaced as a write error");

    // The engine would retry: the next write reconnects and succeeds
    sink.write(&batch).await.unwrap();
    sink.close().await.unwrap();

    let received = server.await.unwrap();
    assert!(!received.is_empty());
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    // Port 1 on localhost: connection refused
    let config = BrokerConfig::new("127.0.0.1:1")
        .with_connect_timeout(std::time::Duration::from_millis(500));
    let mut sink = BrokerSink::new(config, Box::new(RawSerde));

    let batch = vec![msg("a", "x")];
    let err = sink.write(&batch).await.unwrap_err();
    assert!(err.to_string().contains("connect"));
}
