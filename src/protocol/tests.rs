use super::frame::{FrameReader, PREFIX_LEN, encode_frame, write_frame};
use super::message::{ClientMessage, ConsumerRegistration, Envelope, QueueDescriptor, ServerMessage};
use super::message::ErrorReply;
use super::parser::{parse, parse_server};
use crate::utils::error::{FrameError, ParseError};
use bytes::Bytes;
use serde_json::json;
use tokio::io::AsyncWriteExt;

async fn decode_through_pipe(payload: Vec<u8>, chunk_size: usize) -> Bytes {
    // A tiny pipe buffer forces the reader through many partial reads.
    let (mut client, server) = tokio::io::duplex(7);
    let frame = encode_frame(&payload).unwrap();
    tokio::spawn(async move {
        client.write_all(&frame).await.unwrap();
    });

    let mut reader = FrameReader::with_limits(server, chunk_size, 1 << 20);
    reader.next_frame().await.unwrap()
}

#[test]
fn test_encode_frame_prefix_is_little_endian() {
    let frame = encode_frame(b"abc").unwrap();
    assert_eq!(&frame[..PREFIX_LEN], &[3, 0, 0, 0]);
    assert_eq!(&frame[PREFIX_LEN..], b"abc");

    let big = vec![0u8; 0x0102];
    let frame = encode_frame(&big).unwrap();
    assert_eq!(&frame[..PREFIX_LEN], &[0x02, 0x01, 0, 0]);
}

#[tokio::test]
async fn test_frame_roundtrip_lengths() {
    for len in [0usize, 1, 49, 50, 51, 1000] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let decoded = decode_through_pipe(payload.clone(), 50).await;
        assert_eq!(&decoded[..], payload.as_slice(), "length {len}");
    }
}

#[tokio::test]
async fn test_empty_frame_does_not_wait_for_body() {
    let mut reader = FrameReader::new(&[0u8, 0, 0, 0][..]);
    let payload = reader.next_frame().await.unwrap();
    assert!(payload.is_empty());
    assert!(matches!(reader.next_frame().await, Err(FrameError::Closed)));
}

#[tokio::test]
async fn test_back_to_back_frames() {
    let mut wire = Vec::new();
    for payload in [&b"first"[..], b"", b"third frame"] {
        wire.extend_from_slice(&encode_frame(payload).unwrap());
    }

    let mut reader = FrameReader::with_limits(wire.as_slice(), 3, 1024);
    assert_eq!(&reader.next_frame().await.unwrap()[..], b"first");
    assert_eq!(&reader.next_frame().await.unwrap()[..], b"");
    assert_eq!(&reader.next_frame().await.unwrap()[..], b"third frame");
    assert!(matches!(reader.next_frame().await, Err(FrameError::Closed)));
}

#[tokio::test]
async fn test_eof_inside_prefix_or_body_is_closed() {
    let mut reader = FrameReader::new(&[5u8, 0][..]);
    assert!(matches!(reader.next_frame().await, Err(FrameError::Closed)));

    let mut reader = FrameReader::new(&[5u8, 0, 0, 0, b'a', b'b'][..]);
    assert!(matches!(reader.next_frame().await, Err(FrameError::Closed)));
}

#[tokio::test]
async fn test_oversized_prefix_is_rejected() {
    let frame = encode_frame(&[1u8; 64]).unwrap();
    let mut reader = FrameReader::with_limits(&frame[..], 16, 32);
    match reader.next_frame().await {
        Err(FrameError::TooLarge { len, max }) => {
            assert_eq!(len, 64);
            assert_eq!(max, 32);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_write_frame_then_read() {
    let (mut client, server) = tokio::io::duplex(64);
    write_frame(&mut client, b"hello").await.unwrap();
    drop(client);

    let mut reader = FrameReader::new(server);
    assert_eq!(&reader.next_frame().await.unwrap()[..], b"hello");
    assert!(matches!(reader.next_frame().await, Err(FrameError::Closed)));
}

#[test]
fn test_parse_queue_declaration() {
    let payload = json!({
        "MessageType": "Queue",
        "Name": "orders",
        "Type": "broadcast",
        "Durable": true
    })
    .to_string();

    let msg = parse(payload.as_bytes()).unwrap();
    assert_eq!(
        msg,
        ClientMessage::Queue(QueueDescriptor {
            name: "orders".to_string(),
            kind: "broadcast".to_string(),
            durable: true,
        })
    );
}

#[test]
fn test_parse_publish_decodes_base64_body() {
    // "aGVsbG8=" is base64 for "hello"
    let payload = json!({
        "MessageType": "EPMessage",
        "Route": "orders",
        "Body": "aGVsbG8="
    })
    .to_string();

    match parse(payload.as_bytes()).unwrap() {
        ClientMessage::Publish(envelope) => {
            assert_eq!(envelope.route, "orders");
            assert_eq!(&envelope.body[..], b"hello");
            assert_eq!(envelope.stream_id, None);
        }
        other => panic!("expected publish, got {other:?}"),
    }
}

#[test]
fn test_parse_consumer_with_and_without_stream_id() {
    let plain = json!({ "MessageType": "Consumer", "Route": "orders" }).to_string();
    assert_eq!(
        parse(plain.as_bytes()).unwrap(),
        ClientMessage::Consumer(ConsumerRegistration {
            route: "orders".to_string(),
            stream_id: None,
        })
    );

    let tagged = json!({ "MessageType": "Consumer", "Route": "orders", "StreamID": "s-1" })
        .to_string();
    match parse(tagged.as_bytes()).unwrap() {
        ClientMessage::Consumer(registration) => {
            assert_eq!(registration.stream_id.as_deref(), Some("s-1"))
        }
        other => panic!("expected consumer, got {other:?}"),
    }
}

#[test]
fn test_parse_unknown_type_keeps_record() {
    let payload = json!({ "MessageType": "Connect", "Route": "x" }).to_string();
    match parse(payload.as_bytes()) {
        Err(ParseError::UnknownType {
            message_type,
            record,
        }) => {
            assert_eq!(message_type.as_deref(), Some("Connect"));
            assert_eq!(record["Route"], "x");
        }
        other => panic!("expected UnknownType, got {other:?}"),
    }

    let untagged = json!({ "Route": "x" }).to_string();
    assert!(matches!(
        parse(untagged.as_bytes()),
        Err(ParseError::UnknownType {
            message_type: None,
            ..
        })
    ));
}

#[test]
fn test_parse_malformed_body_after_valid_discriminant() {
    // Route must be a string
    let payload = json!({ "MessageType": "EPMessage", "Route": 42 }).to_string();
    match parse(payload.as_bytes()) {
        Err(ParseError::MalformedBody { message_type, .. }) => {
            assert_eq!(message_type.as_deref(), Some("EPMessage"))
        }
        other => panic!("expected MalformedBody, got {other:?}"),
    }

    let bad_base64 = json!({ "MessageType": "EPMessage", "Route": "r", "Body": "***" }).to_string();
    assert!(matches!(
        parse(bad_base64.as_bytes()),
        Err(ParseError::MalformedBody { .. })
    ));
}

#[test]
fn test_parse_rejects_non_json() {
    assert!(matches!(
        parse(b"not json"),
        Err(ParseError::MalformedBody {
            message_type: None,
            ..
        })
    ));
    assert!(matches!(
        parse(b""),
        Err(ParseError::MalformedBody { .. })
    ));
}

#[test]
fn test_client_message_serializes_with_discriminant() {
    let msg = ClientMessage::Publish(Envelope::new("orders", &b"hi"[..]));
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["MessageType"], "EPMessage");
    assert_eq!(value["Route"], "orders");
    assert_eq!(value["Body"], "aGk=");
    assert!(value.get("StreamID").is_none());
}

#[test]
fn test_parse_server_messages() {
    let mut envelope = Envelope::new("orders", &b"payload"[..]);
    envelope.stream_id = Some("s-9".to_string());
    let delivery = serde_json::to_vec(&ServerMessage::Delivery(envelope.clone())).unwrap();
    assert_eq!(
        parse_server(&delivery).unwrap(),
        ServerMessage::Delivery(envelope)
    );

    let error = serde_json::to_vec(&ServerMessage::Error(ErrorReply::new("nope"))).unwrap();
    match parse_server(&error).unwrap() {
        ServerMessage::Error(reply) => assert_eq!(reply.message(), "nope"),
        other => panic!("expected error, got {other:?}"),
    }
}
