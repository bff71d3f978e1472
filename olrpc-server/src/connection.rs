//! Newline-delimited JSON transport
//!
//! One message per line in, one response per line out. Blank lines are
//! skipped and notifications produce no output. A line that is not UTF-8
//! gets a parse error with a null id and the loop keeps going. The loop ends
//! at EOF.

use crate::session::ProtocolSession;
use crate::MailboxServer;
use olrpc_core::{codec, Error, Id, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Serve one client until its input closes
#[tracing::instrument(skip_all, name = "connection")]
pub async fn handle_connection<R, W>(server: &MailboxServer, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut handled: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }

        let reply = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                handled += 1;
                server.handle_message(line).await
            }
            Err(e) => {
                handled += 1;
                tracing::debug!(error = %e, "line is not valid UTF-8");
                let error = Error::Parse(format!("invalid UTF-8: {}", e));
                Some(codec::encode_response(&ProtocolSession::format_error(&error, Id::Null))?)
            }
        };

        if let Some(reply) = reply {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    tracing::info!(messages = handled, "input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_fn;
    use serde_json::Value;

    #[tokio::test]
    async fn test_connection_round_trip() {
        let server = MailboxServer::builder()
            .handler("get_folders", from_fn(|_| async { Ok(serde_json::json!(["Inbox"])) }))
            .build()
            .unwrap();

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"1","method":"initialize","params":{"protocol_version":"2024-11-05"}}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"2","method":"get_folders","params":{}}"#,
            "\n",
            "not json\n",
        );
        let mut output = Vec::new();
        handle_connection(&server, input.as_bytes(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], "1");
        assert_eq!(replies[1]["result"], serde_json::json!(["Inbox"]));
        assert_eq!(replies[2]["error"]["code"], -32700);
        assert_eq!(replies[2]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_answered() {
        let server = MailboxServer::builder()
            .handler("get_folders", from_fn(|_| async { Ok(serde_json::json!(["Inbox"])) }))
            .build()
            .unwrap();

        let mut input = Vec::new();
        input.extend_from_slice(
            br#"{"jsonrpc":"2.0","id":"1","method":"initialize","params":{"protocol_version":"2024-11-05"}}"#,
        );
        input.extend_from_slice(b"\n\xff\xfe garbage\r\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":"2","method":"get_folders","params":{}}"#);
        input.extend_from_slice(b"\n");

        let mut output = Vec::new();
        handle_connection(&server, input.as_slice(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], "1");
        assert_eq!(replies[1]["error"]["code"], -32700);
        assert_eq!(replies[1]["id"], Value::Null);
        assert_eq!(replies[2]["id"], "2");
        assert_eq!(replies[2]["result"], serde_json::json!(["Inbox"]));
    }
}
