//! Tests for the file sink's line format and append behavior

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use courier_protocol::Message;

use super::{FileConfig, FileSink};
use crate::sink::BatchWrite;

fn msg_at(key: &str, payload: &str, unix_secs: u64) -> Arc<Message> {
    Arc::new(Message::with_timestamp(
        key,
        payload.as_bytes().to_vec(),
        UNIX_EPOCH + Duration::from_secs(unix_secs),
    ))
}

#[tokio::test]
async fn test_write_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");

    let mut sink = FileSink::new(FileConfig::new(&path));
    let batch = vec![
        msg_at("error.db", "boom", 1_700_000_000),
        msg_at("app.request", "GET /", 1_700_000_001),
    ];
    sink.write(&batch).await.unwrap();
    sink.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    assert_eq!(lines[0], "2023-11-14T22:13:20.000Z\terror.db\tboom");
    assert_eq!(lines[1], "2023-11-14T22:13:21.000Z\tapp.request\tGET /");
}

#[tokio::test]
async fn test_successive_batches_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");

    let mut sink = FileSink::new(FileConfig::new(&path));
    sink.write(&[msg_at("a", "1", 1_700_000_000)]).await.unwrap();
    sink.write(&[msg_at("b", "2", 1_700_000_000)]).await.unwrap();
    sink.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[tokio::test]
async fn test_open_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/out.log");

    let mut sink = FileSink::new(FileConfig::new(&path));
    sink.open().await.unwrap();
    sink.write(&[msg_at("a", "1", 1_700_000_000)]).await.unwrap();
    sink.close().await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_reopen_appends_to_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");

    let mut sink = FileSink::new(FileConfig::new(&path));
    sink.write(&[msg_at("a", "1", 1_700_000_000)]).await.unwrap();
    sink.close().await.unwrap();

    // A fresh sink instance appends, it does not truncate
    let mut sink = FileSink::new(FileConfig::new(&path));
    sink.write(&[msg_at("b", "2", 1_700_000_000)]).await.unwrap();
    sink.close().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}
