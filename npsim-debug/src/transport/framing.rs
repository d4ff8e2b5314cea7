//! Message framing for TCP transport.
//!
//! Uses a simple length-prefixed format:
//! [length: 4 bytes LE u32][payload: bitcode encoded request or reply]

use crate::error::{DebugError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Write a message to an async writer with length-prefix framing.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T, max_size: usize) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: bitcode::Encode,
{
    let payload = bitcode::encode(msg);

    if payload.len() > max_size {
        return Err(DebugError::MessageTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }

    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Read a message from an async reader with length-prefix framing.
///
/// A payload that fails to decode is consumed entirely, so the stream stays
/// usable. An oversized length prefix leaves the payload unread.
pub async fn read_frame<R, T>(reader: &mut R, max_size: usize) -> Result<T>
where
    R: AsyncReadExt + Unpin,
    T: bitcode::DecodeOwned,
{
    // Read length prefix
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_le_bytes(len_buf) as usize;

    if len > max_size {
        return Err(DebugError::MessageTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(bitcode::decode(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::Condition;
    use crate::config::DEFAULT_MAX_MESSAGE_SIZE;
    use crate::protocol::{Reply, Request};
    use std::io::Cursor;

    #[tokio::test]
    async fn test_multiple_frames() {
        let first = Request::SetBreakpoint {
            conditions: vec![Condition::module_read("parser")],
            temporary: false,
            disabled: false,
        };
        let second = Request::Run { time_ns: Some(1000.0) };

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &first, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        write_frame(&mut buffer, &second, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded: Request = read_frame(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(decoded, first);
        let decoded: Request = read_frame(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(decoded, second);
    }

    #[tokio::test]
    async fn test_framing_format() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Reply::SimulationEnd, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();

        // First 4 bytes should be length (little endian)
        let len = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
        assert_eq!(buffer.len(), 4 + len);

        let decoded: Reply = bitcode::decode(&buffer[4..]).unwrap();
        assert_eq!(decoded, Reply::SimulationEnd);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut buffer = Vec::new();
        let reply = Reply::AllIgnoreModules(vec!["x".repeat(64)]);
        let result = write_frame(&mut buffer, &reply, 8).await;
        assert!(matches!(result, Err(DebugError::MessageTooLarge { max: 8, .. })));

        let mut cursor = Cursor::new(vec![0xff, 0xff, 0, 0]);
        let result: Result<Request> = read_frame(&mut cursor, 1024).await;
        assert!(matches!(result, Err(DebugError::MessageTooLarge { size: 0xffff, .. })));
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let mut cursor = Cursor::new(vec![0u8, 0, 0, 0]);
        let result: Result<Request> = read_frame(&mut cursor, 1024).await;
        assert!(result.unwrap_err().is_protocol_error());
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let mut cursor = Cursor::new(vec![10, 0, 0, 0, 1]);
        let result: Result<Request> = read_frame(&mut cursor, 1024).await;
        assert!(result.unwrap_err().is_connection_error());
    }
}
