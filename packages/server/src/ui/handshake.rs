//! Display-name handshake: the first line of a new connection.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::{domain::HandshakeError, infrastructure::protocol::FrameReadError};

/// Read the display name, waiting at most `timeout`.
///
/// The name is trimmed. A peer that closes before sending a line counts as an empty name.
pub async fn read_handshake<R>(
    frames: &mut FramedRead<R, LinesCodec>,
    timeout: Duration,
) -> Result<String, HandshakeError>
where
    R: AsyncRead + Unpin,
{
    let next = tokio::time::timeout(timeout, frames.next())
        .await
        .map_err(|_| HandshakeError::Timeout(timeout))?;

    let line = match next {
        None => return Err(HandshakeError::Empty),
        Some(Err(e)) => {
            return Err(match FrameReadError::from(e) {
                FrameReadError::Malformed(e) => HandshakeError::Malformed(e),
                FrameReadError::Io(e) => HandshakeError::Io(e),
            });
        }
        Some(Ok(line)) => line,
    };

    let name = line.trim();
    if name.is_empty() {
        return Err(HandshakeError::Empty);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn test_reads_trimmed_display_name() {
        // テスト項目: 最初の 1 行が前後の空白を除いた表示名として読み込まれる
        // given (前提条件):
        let (mut client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(64));
        client.write_all(b"  alice \r\n").await.unwrap();

        // when (操作):
        let result = read_handshake(&mut frames, Duration::from_secs(1)).await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_following_frames_stay_buffered() {
        // テスト項目: ハンドシェイクと同時に届いた後続の行は失われない
        // given (前提条件):
        let (mut client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(64));
        client.write_all(b"alice\nnext line\n").await.unwrap();

        // when (操作):
        let name = read_handshake(&mut frames, Duration::from_secs(1)).await;
        let next = frames.next().await;

        // then (期待する結果):
        assert_eq!(name.unwrap(), "alice");
        assert_eq!(next.unwrap().unwrap(), "next line");
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        // テスト項目: 空白だけの表示名は HandshakeError::Empty になる
        // given (前提条件):
        let (mut client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(64));
        client.write_all(b"   \n").await.unwrap();

        // when (操作):
        let result = read_handshake(&mut frames, Duration::from_secs(1)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HandshakeError::Empty)));
    }

    #[tokio::test]
    async fn test_closed_before_name_is_empty() {
        // テスト項目: 表示名を送らずに切断した場合は HandshakeError::Empty になる
        // given (前提条件):
        let (client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(64));
        drop(client);

        // when (操作):
        let result = read_handshake(&mut frames, Duration::from_secs(1)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HandshakeError::Empty)));
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        // テスト項目: 制限時間内に表示名が届かない場合は HandshakeError::Timeout になる
        // given (前提条件):
        let (_client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(64));

        // when (操作):
        let result = read_handshake(&mut frames, Duration::from_millis(50)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HandshakeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_overlong_name_is_malformed() {
        // テスト項目: 最大長を超える表示名は HandshakeError::Malformed になる
        // given (前提条件):
        let (mut client, server) = duplex(256);
        let mut frames = FramedRead::new(server, LinesCodec::new_with_max_length(8));
        client.write_all(b"a-very-long-display-name\n").await.unwrap();

        // when (操作):
        let result = read_handshake(&mut frames, Duration::from_secs(1)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(HandshakeError::Malformed(_))));
    }
}
