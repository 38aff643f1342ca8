//! STOMP frame encoding and decoding.
//!
//! Only the small subset of STOMP 1.2 the client speaks: CONNECT, SEND,
//! SUBSCRIBE, ACK and DISCONNECT going out; CONNECTED, MESSAGE and ERROR
//! coming back. Frames are `COMMAND\n` + `name:value\n` headers + blank
//! line + NUL-terminated body.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::types::{BrokerError, SendOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame with credentials and a bounded-prefetch hint.
    pub fn connect(host: &str, user: &str, password: &str) -> Frame {
        Frame::new("CONNECT")
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("login", user)
            .with_header("passcode", password)
            .with_header("activemq.prefetchSize", "1")
    }

    /// SEND frame for a text body with publication options as headers.
    pub fn send(destination: &str, body: &str, opts: &SendOptions) -> Frame {
        let mut frame = Frame::new("SEND")
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", body.len().to_string())
            .with_header("persistent", if opts.persistent { "true" } else { "false" })
            .with_header("priority", opts.priority.to_string());
        if let Some(delay) = opts.delay_ms {
            frame = frame.with_header("AMQ_SCHEDULED_DELAY", delay.to_string());
        }
        frame.with_body(body.as_bytes().to_vec())
    }

    /// SUBSCRIBE frame with client acks and a prefetch of one.
    pub fn subscribe(id: &str, destination: &str) -> Frame {
        Frame::new("SUBSCRIBE")
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "client-individual")
            .with_header("activemq.prefetchSize", "1")
    }

    pub fn ack(id: &str) -> Frame {
        Frame::new("ACK").with_header("id", id)
    }

    pub fn disconnect() -> Frame {
        Frame::new("DISCONNECT")
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 64);
        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.push(b':');
            out.extend_from_slice(value.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Read one frame from the stream.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream between frames.
    /// Heartbeat newlines between frames are skipped.
    pub async fn read<R>(reader: &mut R) -> Result<Option<Frame>, BrokerError>
    where
        R: AsyncBufRead + Unpin,
    {
        let command = loop {
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .await
                .map_err(|e| BrokerError::ConnectionLost(e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            // NUL stragglers show up here when the peer terminates a frame
            // and immediately closes; treat them like heartbeats.
            let trimmed = trimmed.trim_matches('\0');
            if !trimmed.is_empty() {
                break trimmed.to_string();
            }
        };

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .await
                .map_err(|e| BrokerError::ConnectionLost(e.to_string()))?;
            if n == 0 {
                return Err(BrokerError::MalformedFrame(
                    "end of stream inside frame headers".to_string(),
                ));
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                break;
            }
            let (name, value) = trimmed.split_once(':').ok_or_else(|| {
                BrokerError::MalformedFrame(format!("header without separator: '{trimmed}'"))
            })?;
            headers.push((name.to_string(), value.to_string()));
        }

        let content_length = headers
            .iter()
            .find(|(n, _)| n == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok());

        let body = match content_length {
            Some(len) => {
                let mut buf = vec![0u8; len];
                reader
                    .read_exact(&mut buf)
                    .await
                    .map_err(|e| BrokerError::ConnectionLost(e.to_string()))?;
                let mut terminator = [0u8; 1];
                reader
                    .read_exact(&mut terminator)
                    .await
                    .map_err(|e| BrokerError::ConnectionLost(e.to_string()))?;
                if terminator[0] != 0 {
                    return Err(BrokerError::MalformedFrame(
                        "frame body not NUL-terminated".to_string(),
                    ));
                }
                buf
            }
            None => {
                let mut buf = Vec::new();
                reader
                    .read_until(0, &mut buf)
                    .await
                    .map_err(|e| BrokerError::ConnectionLost(e.to_string()))?;
                if buf.pop() != Some(0) {
                    return Err(BrokerError::MalformedFrame(
                        "frame body not NUL-terminated".to_string(),
                    ));
                }
                buf
            }
        };

        Ok(Some(Frame {
            command,
            headers,
            body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(bytes: &[u8]) -> Option<Frame> {
        let mut reader = BufReader::new(std::io::Cursor::new(bytes.to_vec()));
        Frame::read(&mut reader).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_encode_roundtrip() {
        let frame = Frame::connect("broker.example", "ingest", "hunter2");
        let parsed = parse(&frame.encode()).await.unwrap();
        assert_eq!(parsed.command, "CONNECT");
        assert_eq!(parsed.header("login"), Some("ingest"));
        assert_eq!(parsed.header("passcode"), Some("hunter2"));
        assert_eq!(parsed.header("activemq.prefetchSize"), Some("1"));
        assert!(parsed.body.is_empty());
    }

    #[tokio::test]
    async fn test_send_carries_options_as_headers() {
        let opts = SendOptions {
            persistent: true,
            priority: 7,
            delay_ms: Some(2000),
        };
        let frame = Frame::send("/queue/DataReady", "{\"run_number\":1}", &opts);
        let parsed = parse(&frame.encode()).await.unwrap();
        assert_eq!(parsed.command, "SEND");
        assert_eq!(parsed.header("destination"), Some("/queue/DataReady"));
        assert_eq!(parsed.header("persistent"), Some("true"));
        assert_eq!(parsed.header("priority"), Some("7"));
        assert_eq!(parsed.header("AMQ_SCHEDULED_DELAY"), Some("2000"));
        assert_eq!(parsed.body, b"{\"run_number\":1}");
    }

    #[tokio::test]
    async fn test_send_without_delay_has_no_delay_header() {
        let frame = Frame::send("/queue/DataReady", "x", &SendOptions::default());
        assert_eq!(frame.header("AMQ_SCHEDULED_DELAY"), None);
    }

    #[tokio::test]
    async fn test_subscribe_bounds_prefetch() {
        let frame = Frame::subscribe("ingest-0", "/queue/DataReady");
        assert_eq!(frame.header("ack"), Some("client-individual"));
        assert_eq!(frame.header("activemq.prefetchSize"), Some("1"));
    }

    #[tokio::test]
    async fn test_parse_message_without_content_length() {
        let bytes = b"MESSAGE\ndestination:/queue/DataReady\nmessage-id:42\n\nhello\0";
        let parsed = parse(bytes).await.unwrap();
        assert_eq!(parsed.command, "MESSAGE");
        assert_eq!(parsed.header("message-id"), Some("42"));
        assert_eq!(parsed.body, b"hello");
    }

    #[tokio::test]
    async fn test_parse_skips_heartbeats_between_frames() {
        let bytes = b"\n\nCONNECTED\nversion:1.2\n\n\0";
        let parsed = parse(bytes).await.unwrap();
        assert_eq!(parsed.command, "CONNECTED");
    }

    #[tokio::test]
    async fn test_clean_eof_is_none() {
        assert!(parse(b"").await.is_none());
        assert!(parse(b"\n\n").await.is_none());
    }

    #[tokio::test]
    async fn test_two_frames_back_to_back() {
        let mut bytes = Frame::ack("1").encode();
        bytes.extend(Frame::ack("2").encode());
        let mut reader = BufReader::new(std::io::Cursor::new(bytes));
        let first = Frame::read(&mut reader).await.unwrap().unwrap();
        let second = Frame::read(&mut reader).await.unwrap().unwrap();
        assert_eq!(first.header("id"), Some("1"));
        assert_eq!(second.header("id"), Some("2"));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_malformed() {
        let mut reader =
            BufReader::new(std::io::Cursor::new(b"MESSAGE\ndestination:q\n".to_vec()));
        let err = Frame::read(&mut reader).await.unwrap_err();
        assert!(matches!(err, BrokerError::MalformedFrame(_)));
    }
}
