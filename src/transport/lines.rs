//! Newline-delimited JSON-RPC framing for the MCP service.
//!
//! Lines that are not a well-formed client message are answered here and the
//! session keeps going. Once input ends (EOF or shutdown) the transport stops
//! reading but only reports the end after every request it handed out has
//! been answered. A failed write ends the session straight away.

use std::sync::Arc;

use rmcp::model::{ClientJsonRpcMessage, ErrorCode, JsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::Transport;
use rmcp::RoleServer;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct LineTransport<R, W> {
    lines: Lines<BufReader<R>>,
    writer: Arc<Mutex<W>>,
    in_flight: Arc<watch::Sender<usize>>,
    shutdown: CancellationToken,
    output_closed: CancellationToken,
    draining: bool,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W, shutdown: CancellationToken) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            lines: BufReader::new(reader).lines(),
            writer: Arc::new(Mutex::new(writer)),
            in_flight: Arc::new(in_flight),
            shutdown,
            output_closed: CancellationToken::new(),
            draining: false,
        }
    }
}

impl<R, W> Transport<RoleServer> for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = std::io::Error;

    fn send(
        &mut self,
        item: ServerJsonRpcMessage,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send + 'static {
        let writer = Arc::clone(&self.writer);
        let in_flight = Arc::clone(&self.in_flight);
        let output_closed = self.output_closed.clone();
        let answers_request = matches!(
            item,
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_)
        );
        async move {
            let result = write_line(&writer, &item).await;
            if result.is_err() {
                output_closed.cancel();
            }
            if answers_request {
                in_flight.send_modify(|n| *n = n.saturating_sub(1));
            }
            result
        }
    }

    async fn receive(&mut self) -> Option<ClientJsonRpcMessage> {
        loop {
            if self.output_closed.is_cancelled() {
                warn!("output closed, ending session");
                return None;
            }
            if self.draining {
                let mut pending = self.in_flight.subscribe();
                tokio::select! {
                    _ = self.output_closed.cancelled() => {}
                    answered = pending.wait_for(|n| *n == 0) => {
                        if let Err(e) = answered {
                            debug!(error = %e, "in-flight counter dropped");
                        }
                    }
                }
                return None;
            }

            let next = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                _ = self.output_closed.cancelled() => continue,
                line = self.lines.next_line() => Some(line),
            };
            let line = match next {
                Some(Ok(Some(line))) => line,
                Some(Ok(None)) => {
                    debug!("input closed");
                    self.draining = true;
                    continue;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "failed to read request line");
                    self.draining = true;
                    continue;
                }
                None => {
                    debug!("shutdown requested, no longer reading input");
                    self.draining = true;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match decode(&line) {
                Ok(message) => {
                    if matches!(message, JsonRpcMessage::Request(_)) {
                        self.in_flight.send_modify(|n| *n += 1);
                    }
                    return Some(message);
                }
                Err(rejection) => {
                    warn!(code = rejection.code.0, reason = %rejection.message, "rejected input line");
                    if let Err(e) = write_line(&self.writer, &rejection.response()).await {
                        warn!(error = %e, "failed to write error response");
                        self.output_closed.cancel();
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.writer.lock().await.shutdown().await
    }
}

/// A line that could not be handed to the service, with the error to answer it with.
#[derive(Debug)]
struct Rejection {
    id: Value,
    code: ErrorCode,
    message: String,
}

impl Rejection {
    fn new(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            code,
            message: message.into(),
        }
    }

    fn response(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.id,
            "error": {
                "code": self.code.0,
                "message": self.message,
            }
        })
    }
}

/// Not JSON is a parse error. JSON that is not a client message is an
/// invalid request, echoing the id when it is usable. Request ids must be a
/// number or a string; a present `null` id is rejected rather than being
/// mistaken for a notification.
fn decode(line: &str) -> Result<ClientJsonRpcMessage, Rejection> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Rejection::new(Value::Null, ErrorCode::PARSE_ERROR, e.to_string()))?;

    let id = match value.get("id") {
        None => Value::Null,
        Some(id @ (Value::Number(_) | Value::String(_))) => id.clone(),
        Some(_) => {
            return Err(Rejection::new(
                Value::Null,
                ErrorCode::INVALID_REQUEST,
                "id must be a number or a string",
            ))
        }
    };

    serde_json::from_value(value)
        .map_err(|e| Rejection::new(id, ErrorCode::INVALID_REQUEST, e.to_string()))
}

async fn write_line<W, T>(writer: &Mutex<W>, message: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    let mut writer = writer.lock().await;
    writer.write_all(&line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rmcp::model::NumberOrString;
    use rmcp::ErrorData;
    use tokio::io::{duplex, DuplexStream};
    use tokio::time::timeout;

    use super::*;

    const PING: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";

    /// A transport whose output side has already gone away.
    fn broken_output() -> (DuplexStream, LineTransport<DuplexStream, DuplexStream>) {
        let (input, server_in) = duplex(1024);
        let (server_out, client_out) = duplex(1024);
        drop(client_out);
        let transport = LineTransport::new(server_in, server_out, CancellationToken::new());
        (input, transport)
    }

    #[tokio::test]
    async fn failed_error_reply_stops_reading() {
        let (mut input, mut transport) = broken_output();
        input.write_all(b"{oops\n").await.unwrap();
        input.write_all(PING).await.unwrap();

        let next = timeout(Duration::from_secs(5), transport.receive()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn failed_send_stops_reading() {
        let (mut input, mut transport) = broken_output();
        let reply = ServerJsonRpcMessage::error(
            ErrorData::internal_error("unreachable client", None),
            NumberOrString::Number(1),
        );
        assert!(transport.send(reply).await.is_err());

        input.write_all(PING).await.unwrap();
        let next = timeout(Duration::from_secs(5), transport.receive()).await.unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn decode_accepts_requests_and_notifications() {
        let request = decode(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(matches!(request, JsonRpcMessage::Request(_)));

        let notification =
            decode(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(notification, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn decode_rejects_non_json_as_parse_error() {
        let rejection = decode("{oops").unwrap_err();
        assert_eq!(rejection.code, ErrorCode::PARSE_ERROR);
        assert_eq!(rejection.id, Value::Null);
    }

    #[test]
    fn decode_rejects_null_id() {
        let rejection = decode(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap_err();
        assert_eq!(rejection.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(rejection.id, Value::Null);
    }

    #[test]
    fn decode_rejects_invalid_request_keeping_id() {
        let rejection = decode(r#"{"jsonrpc":"2.0","id":7}"#).unwrap_err();
        assert_eq!(rejection.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(rejection.id, json!(7));

        let rejection = decode("[1,2]").unwrap_err();
        assert_eq!(rejection.code, ErrorCode::INVALID_REQUEST);
        assert_eq!(rejection.id, Value::Null);
    }

    #[test]
    fn rejection_response_shape() {
        let response = Rejection::new(json!("a"), ErrorCode::INVALID_REQUEST, "bad").response();
        assert_eq!(
            response,
            json!({"jsonrpc": "2.0", "id": "a", "error": {"code": -32600, "message": "bad"}})
        );
    }
}
