// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder notification listener

use std::net::SocketAddr;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::event::NotificationSender;
use crate::protocol::{decode_message_body, parse_notification};

/// Largest notification body kept; anything longer is drained unread.
const MAX_BODY_LEN: usize = 64 * 1024;
const MAX_HEADER_LINES: usize = 100;
const MAX_LINE_LEN: u64 = 8 * 1024;
/// Time allowed for a client to deliver its request.
const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Time spent discarding the rest of an unreadable request.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

const RESPONSE_OK: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// A request read off the wire. Only what the notification handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// HTTP endpoint for AlarmDecoder custom notifications.
///
/// AlarmDecoder setup: custom notification to `<host>:<port>/`, POST,
/// urlencoded (or JSON), custom key `message`, custom value `{{message}}`.
/// Every connection is answered `200 OK` once its request has been read,
/// or drained when it could not be parsed. Only POST requests produce an
/// event. Bodies may use `Content-Length` or chunked transfer encoding.
pub struct NotificationListener {
    listener: TcpListener,
    tx: NotificationSender,
}

impl NotificationListener {
    pub async fn bind(bind: &str, port: u16, tx: NotificationSender) -> Result<Self> {
        let listener = TcpListener::bind(format!("{bind}:{port}"))
            .await
            .map_err(|e| {
                error!("Failed to bind notification listener: {}", e);
                BridgeError::Io(e)
            })?;
        info!("Notification listener is listening on {}:{}", bind, port);
        Ok(Self { listener, tx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is aborted.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx).await {
                            warn!("Notification from {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept notification connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, tx: NotificationSender) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let request = match timeout(READ_TIMEOUT, read_request(&mut reader)).await {
        Ok(Ok(request)) => Ok(request),
        Ok(Err(e)) => {
            drain(&mut reader).await;
            Err(e)
        }
        Err(_) => Err(BridgeError::Timeout {
            operation: "read notification request".to_string(),
            timeout_ms: READ_TIMEOUT.as_millis() as u64,
        }),
    };

    // Answered even when the request could not be read
    if let Err(e) = respond_ok(&mut writer).await {
        debug!("Failed to answer notification: {}", e);
    }
    let request = request?;

    if request.method != "POST" {
        debug!("Ignoring {} {}", request.method, request.path);
        return Ok(());
    }

    let Some(message) = decode_message_body(request.content_type.as_deref(), &request.body)
    else {
        warn!(
            "Notification without a message field: {}",
            String::from_utf8_lossy(&request.body)
        );
        return Ok(());
    };

    info!("Notification: {}", message);
    tx.send(parse_notification(&message))
        .await
        .map_err(|_| BridgeError::ChannelClosed)
}

async fn respond_ok<W: AsyncWrite + Unpin>(writer: &mut W) -> std::io::Result<()> {
    writer.write_all(RESPONSE_OK).await?;
    writer.shutdown().await
}

/// Discard whatever the client already sent after a request we could not read.
async fn drain<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut rest = reader.take(MAX_BODY_LEN as u64);
    let _ = timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut rest, &mut tokio::io::sink())).await;
}

fn invalid(details: impl Into<String>) -> BridgeError {
    BridgeError::InvalidRequest {
        details: details.into(),
    }
}

/// Read one line (up to `MAX_LINE_LEN` bytes) without its line ending.
/// Bytes that are not UTF-8 are replaced. `None` at end of input.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.take(MAX_LINE_LEN).read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf).trim_end().to_string()))
}

/// Read exactly `len` bytes, keeping at most `limit` of them.
async fn read_limited<R>(reader: &mut R, len: usize, limit: usize, body: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let keep = len.min(limit);
    let start = body.len();
    body.resize(start + keep, 0);
    reader.read_exact(&mut body[start..]).await?;
    if len > keep {
        let excess = (len - keep) as u64;
        let copied = tokio::io::copy(&mut reader.take(excess), &mut tokio::io::sink()).await?;
        if copied < excess {
            return Err(invalid("body shorter than announced"));
        }
    }
    Ok(())
}

/// Decode a `Transfer-Encoding: chunked` body.
async fn read_chunked<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let mut line = Vec::new();
    loop {
        let size_line = read_line(reader, &mut line)
            .await?
            .ok_or_else(|| invalid("chunked body ended early"))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| invalid(format!("invalid chunk size: {size_hex}")))?;

        if size == 0 {
            // Trailer section ends with an empty line
            while let Some(trailer) = read_line(reader, &mut line).await? {
                if trailer.is_empty() {
                    break;
                }
            }
            break;
        }

        let room = MAX_BODY_LEN.saturating_sub(body.len());
        read_limited(reader, size, room, &mut body).await?;
        read_line(reader, &mut line).await?;
    }
    if body.len() >= MAX_BODY_LEN {
        warn!("Chunked notification body truncated to {} bytes", MAX_BODY_LEN);
    }
    Ok(body)
}

/// Read a request line, headers and a `Content-Length` or chunked body.
pub async fn read_request<R>(reader: &mut R) -> Result<NotificationRequest>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let line = read_line(reader, &mut buf)
        .await?
        .ok_or_else(|| invalid("connection closed before request line"))?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Err(invalid(format!("malformed request line: {line}")));
    };
    let method = method.to_ascii_uppercase();
    let path = path.to_string();

    let mut content_length = None;
    let mut content_type = None;
    let mut chunked = false;
    for _ in 0..MAX_HEADER_LINES {
        let Some(header) = read_line(reader, &mut buf).await? else {
            break;
        };
        if header.is_empty() {
            break;
        }
        let Some((name, value)) = header.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(
                value
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("invalid content length: {value}")))?,
            );
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.to_ascii_lowercase().contains("chunked");
        }
    }

    let body = if chunked {
        read_chunked(reader).await?
    } else {
        let len = content_length.unwrap_or(0);
        if len > MAX_BODY_LEN {
            warn!("Notification body of {} bytes truncated", len);
        }
        let mut body = Vec::new();
        read_limited(reader, len, MAX_BODY_LEN, &mut body).await?;
        body
    };

    Ok(NotificationRequest {
        method,
        path,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{notification_channel, NotificationEvent};

    #[tokio::test]
    async fn test_read_form_request() {
        let raw: &[u8] = b"POST / HTTP/1.1\r\nHost: homebridge.local:51827\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 31\r\n\r\nmessage=The+alarm+system+has+be";
        let mut reader = raw;
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/");
        assert_eq!(
            request.content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body.len(), 31);
    }

    #[tokio::test]
    async fn test_read_request_without_body() {
        let raw: &[u8] = b"get /status HTTP/1.1\r\nHost: x\r\n\r\n";
        let mut reader = raw;
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, "GET");
        assert!(request.body.is_empty());
        assert_eq!(request.content_type, None);
    }

    #[tokio::test]
    async fn test_read_request_rejects_garbage() {
        let mut reader: &[u8] = b"\r\n";
        assert!(matches!(
            read_request(&mut reader).await,
            Err(BridgeError::InvalidRequest { .. })
        ));
        let mut reader: &[u8] = b"";
        assert!(read_request(&mut reader).await.is_err());
        let mut reader: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(
            read_request(&mut reader).await,
            Err(BridgeError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_short_body_is_an_error() {
        let mut reader: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 50\r\n\r\nmessage=x";
        assert!(matches!(
            read_request(&mut reader).await,
            Err(BridgeError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_read_chunked_request() {
        let raw: &[u8] = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\n8;ext=1\r\nmessage=\r\n12\r\nThere+is+a+fire%21\r\n0\r\nX-Trailer: yes\r\n\r\n";
        let mut reader = raw;
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.body, b"message=There+is+a+fire%21");
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_bad_chunk_size_is_rejected() {
        let mut reader: &[u8] =
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nmessage=x\r\n0\r\n\r\n";
        assert!(matches!(
            read_request(&mut reader).await,
            Err(BridgeError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_line_need_not_be_utf8() {
        let mut reader: &[u8] = b"POST /\xff\xfe HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, "POST");
        assert!(request.body.is_empty());
    }

    async fn roundtrip(request: &[u8]) -> (String, Option<NotificationEvent>) {
        let (tx, mut rx) = notification_channel(4);
        let listener = NotificationListener::bind("127.0.0.1", 0, tx).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(listener.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        let event = timeout(Duration::from_millis(500), rx.recv())
            .await
            .ok()
            .flatten();
        handle.abort();
        (response, event)
    }

    #[tokio::test]
    async fn test_post_json_produces_event() {
        let body = r#"{"message":"Zone Front Door (12) has been faulted."}"#;
        let request = format!(
            "POST / HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let (response, event) = roundtrip(request.as_bytes()).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(
            event,
            Some(NotificationEvent::ZoneChanged {
                fullname: "Front Door".to_string(),
                id: "12".to_string(),
                faulted: true,
            })
        );
    }

    #[tokio::test]
    async fn test_get_is_answered_without_event() {
        let (response, event) = roundtrip(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(event, None);
    }

    #[tokio::test]
    async fn test_unparseable_body_still_answered() {
        let (response, event) =
            roundtrip(b"POST / HTTP/1.1\r\nContent-Length: 8\r\n\r\nnot-json").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(event, None);
    }

    #[tokio::test]
    async fn test_chunked_post_produces_event() {
        let request = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\n1a\r\nmessage=There+is+a+fire%21\r\n0\r\n\r\n";
        let (response, event) = roundtrip(request).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(event, Some(NotificationEvent::FireAlarm));
    }

    #[tokio::test]
    async fn test_malformed_request_still_answered() {
        let (response, event) =
            roundtrip(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\nmessage=x").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(event, None);

        let (response, event) = roundtrip(b"\xff\xfe\xfd\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(event, None);
    }
}
