// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

fn frame(payload: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload).into_bytes()
}

#[test]
fn decodes_a_single_frame() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(&frame(r#"{"jsonrpc":"2.0"}"#));
    assert_eq!(decoder.next_frame().unwrap(), br#"{"jsonrpc":"2.0"}"#.to_vec());
    assert_eq!(decoder.next_frame(), None);
}

#[test]
fn waits_for_split_header() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"Content-Len");
    assert_eq!(decoder.next_frame(), None);
    decoder.extend(b"gth: 2\r\n\r\n{}");
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());
}

#[test]
fn waits_for_split_body() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"Content-Length: 11\r\n\r\n{\"a\"");
    assert_eq!(decoder.next_frame(), None);
    decoder.extend(b":true}");
    assert_eq!(decoder.next_frame().unwrap(), b"{\"a\":true}".to_vec());
}

#[test]
fn decodes_back_to_back_frames() {
    let mut decoder = FrameDecoder::new();
    let mut bytes = frame("{}");
    bytes.extend_from_slice(&frame(r#"{"b":1}"#));
    decoder.extend(&bytes);
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());
    assert_eq!(decoder.next_frame().unwrap(), br#"{"b":1}"#.to_vec());
    assert_eq!(decoder.next_frame(), None);
}

#[test]
fn header_parsing_is_case_insensitive() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"content-length: 2\r\n\r\n{}");
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());

    decoder.extend(b"CONTENT-LENGTH: 2\r\n\r\n[]");
    assert_eq!(decoder.next_frame().unwrap(), b"[]".to_vec());
}

#[test]
fn extra_headers_are_tolerated() {
    let mut decoder = FrameDecoder::new();
    decoder
        .extend(b"Content-Type: application/vscode-jsonrpc\r\nContent-Length: 2\r\n\r\n{}");
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());
}

#[test]
fn header_without_content_length_is_skipped() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"X-Nonsense: yes\r\n\r\n");
    decoder.extend(&frame("{}"));
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());
}

#[test]
fn wait_returns_none_until_delimiter_arrives() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"Content-Length: 5\r\n");
    assert_eq!(decoder.next_frame(), None);
}

#[test]
fn clear_discards_buffered_bytes() {
    let mut decoder = FrameDecoder::new();
    decoder.extend(b"Content-Length: 100\r\n\r\npartial");
    decoder.clear();
    decoder.extend(&frame("{}"));
    assert_eq!(decoder.next_frame().unwrap(), b"{}".to_vec());
}

#[test]
fn encode_uses_byte_length_not_char_length() {
    // Two characters, six bytes.
    let message = json!({"text": "é漢"});
    let encoded = encode_frame(&message);
    let text = String::from_utf8(encoded).unwrap();

    let payload = message.to_string();
    let expected_header = format!("Content-Length: {}\r\n\r\n", payload.len());
    assert!(payload.len() > payload.chars().count());
    assert!(text.starts_with(&expected_header), "header was: {text}");
}

#[test]
fn encode_decode_round_trip() {
    let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
    let mut decoder = FrameDecoder::new();
    decoder.extend(&encode_frame(&message));
    let body = decoder.next_frame().unwrap();
    let back: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(back, message);
}
