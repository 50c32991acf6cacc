// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use crate::{Response, Status};
use std::io::Cursor;

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Ack;
    let encoded = encode(&response).expect("encode failed");

    // encode() returns raw JSON, no length prefix
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn eof_before_prefix_is_connection_closed() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed), "{err:?}");
}

#[tokio::test]
async fn oversized_prefix_is_rejected_before_allocating() {
    let len = (MAX_FRAME_SIZE as u32) + 1;
    let mut cursor = Cursor::new(len.to_be_bytes().to_vec());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { size, .. } if size == MAX_FRAME_SIZE + 1));
}

#[tokio::test]
async fn truncated_payload_is_io_error() {
    let mut buffer = 10u32.to_be_bytes().to_vec();
    buffer.extend_from_slice(b"abc");
    let mut cursor = Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)), "{err:?}");
}

#[tokio::test]
async fn frames_keep_their_id() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let frame = Frame::new(42, Response::error(Status::UnknownSession, "ses-x"));
    write_frame(&mut client, &frame, None).await.unwrap();

    let read: Frame<Response> = read_frame(&mut server, None).await.unwrap();
    assert_eq!(read, frame);
}

#[tokio::test]
async fn read_frame_times_out_on_silent_peer() {
    let (_client, mut server) = tokio::io::duplex(64);
    let err = read_frame::<_, Response>(&mut server, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout), "{err:?}");
}

#[tokio::test]
async fn garbage_payload_is_json_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"not json").await.unwrap();
    let mut cursor = Cursor::new(buffer);
    let err = read_frame::<_, Response>(&mut cursor, None).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)), "{err:?}");
}
