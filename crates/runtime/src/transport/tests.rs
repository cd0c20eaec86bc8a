use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) {
	let json_bytes = serde_json::to_vec(message).unwrap();
	let length = json_bytes.len() as u32;
	writer.write_all(&length.to_le_bytes()).await.unwrap();
	writer.write_all(&json_bytes).await.unwrap();
	writer.flush().await.unwrap();
}

#[test]
fn test_length_prefix_is_little_endian() {
	let length: u32 = 1234;
	let bytes = length.to_le_bytes();

	assert_eq!(bytes[0], (length & 0xFF) as u8);
	assert_eq!(bytes[1], ((length >> 8) & 0xFF) as u8);
	assert_eq!(bytes[2], ((length >> 16) & 0xFF) as u8);
	assert_eq!(bytes[3], ((length >> 24) & 0xFF) as u8);
}

#[tokio::test]
async fn test_send_command_frame() {
	// stdin: transport writes, test reads. stdout: test writes, transport reads.
	let (stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, _stdout_write) = tokio::io::duplex(1024);

	let (transport, _rx) = PipeTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	let command = json!({"method": "chat", "params": {"message": "hello"}});
	sender.send(command.clone()).await.unwrap();

	let (mut read_half, _write_half) = tokio::io::split(stdin_read);
	let mut len_buf = [0u8; 4];
	read_half.read_exact(&mut len_buf).await.unwrap();
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	read_half.read_exact(&mut msg_buf).await.unwrap();

	let received: Value = serde_json::from_slice(&msg_buf).unwrap();
	assert_eq!(received, command);
}

#[tokio::test]
async fn test_events_arrive_in_order() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(4096);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(4096);

	let (mut transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let read_task = tokio::spawn(async move { transport.run().await });

	let events = vec![
		json!({"event": "login"}),
		json!({"event": "chat", "params": {"username": "Steve", "message": "hi"}}),
		json!({"event": "end", "params": {"reason": "socketClosed"}}),
	];

	for event in &events {
		write_frame(&mut stdout_write, event).await;
	}

	for expected in &events {
		let received = rx.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	drop(stdout_write);
	drop(rx);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_boxed_receiver_feeds_message_channel() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (transport, message_rx) = PipeTransport::new(stdin_write, stdout_read);
	let TransportParts {
		receiver,
		mut message_rx,
		..
	} = transport.into_transport_parts(message_rx);

	let read_task = tokio::spawn(receiver.run());

	write_frame(&mut stdout_write, &json!({"event": "spawn"})).await;
	assert_eq!(message_rx.recv().await.unwrap(), json!({"event": "spawn"}));

	drop(stdout_write);
	let result = read_task.await.unwrap();
	assert!(result.is_err(), "EOF from the driver should surface as an error");
}

#[tokio::test]
async fn test_large_message() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024 * 1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024 * 1024);

	let (mut transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let read_task = tokio::spawn(async move { transport.run().await });

	let large_message = json!({
		"event": "text",
		"params": {"message": "x".repeat(100_000)}
	});
	write_frame(&mut stdout_write, &large_message).await;

	let received = rx.recv().await.unwrap();
	assert_eq!(received, large_message);

	drop(stdout_write);
	drop(rx);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_malformed_length_prefix() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	// Two bytes instead of four, then EOF.
	stdout_write.write_all(&[0x01, 0x02]).await.unwrap();
	stdout_write.flush().await.unwrap();
	drop(stdout_write);

	let result = transport.run().await;
	assert!(result.is_err());
	assert!(result.unwrap_err().to_string().contains("Failed to read length prefix"));
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	stdout_write.write_all(&u32::MAX.to_le_bytes()).await.unwrap();
	stdout_write.flush().await.unwrap();

	let result = transport.run().await;
	assert!(matches!(result, Err(Error::ProtocolError(_))));
}

#[tokio::test]
async fn test_invalid_json_body() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	let body = b"not json";
	stdout_write.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
	stdout_write.write_all(body).await.unwrap();
	stdout_write.flush().await.unwrap();

	let result = transport.run().await;
	assert!(matches!(result, Err(Error::Json(_))));
}

#[tokio::test]
async fn test_reader_stops_when_consumer_dropped() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, mut stdout_write) = tokio::io::duplex(1024);

	let (mut transport, rx) = PipeTransport::new(stdin_write, stdout_read);
	drop(rx);

	write_frame(&mut stdout_write, &json!({"event": "login"})).await;

	let result = transport.run().await;
	assert!(result.is_ok(), "dropped consumer is a clean shutdown: {result:?}");
}

#[tokio::test]
async fn test_broken_pipe() {
	let (_stdin_read, stdin_write) = tokio::io::duplex(1024);
	let (stdout_read, stdout_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);
	drop(stdout_write);

	let read_task = tokio::spawn(async move { transport.run().await });
	let result = read_task.await.unwrap();
	assert!(result.is_err());
}
