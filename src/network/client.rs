//! Resilient websocket JSON-RPC client
//!
//! One [`WsClient`] owns one connection to one node at a time. Transport failures rotate
//! to the next node in the pool with exponential backoff; node-reported errors are
//! classified and returned without retrying. A client is not shared between threads;
//! open one per thread instead.

use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tungstenite::http::Uri;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::Config;
use crate::error::{GolosError, Result};
use crate::network::api::namespace_for;
use crate::network::node::{EndpointState, NodeEndpoint, NodePool};
use crate::network::retry::RetryPolicy;

/// Anything that can answer a named chain API call.
pub trait RpcClient {
    fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value>;
}

/// A connected, message-oriented duplex link to one node.
pub trait Channel: Send {
    fn send_text(&mut self, text: &str) -> Result<()>;
    fn recv_text(&mut self) -> Result<String>;
    fn close(&mut self);
}

/// Opens channels to endpoints. Failures to reach the node are `Transport` errors.
pub trait Dialer: Send {
    fn dial(&self, endpoint: &NodeEndpoint) -> Result<Box<dyn Channel>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Plain TCP or TLS websocket dialer with connect and I/O timeouts.
#[derive(Debug, Clone)]
pub struct WsDialer {
    timeout: Duration,
}

impl WsDialer {
    pub fn new(timeout: Duration) -> Self {
        WsDialer { timeout }
    }
}

impl Dialer for WsDialer {
    fn dial(&self, endpoint: &NodeEndpoint) -> Result<Box<dyn Channel>> {
        let uri: Uri = endpoint
            .get_url()
            .parse()
            .map_err(|e| GolosError::Config(format!("Invalid node url {endpoint}: {e}")))?;
        let host = uri
            .host()
            .ok_or_else(|| GolosError::Config(format!("Node url {endpoint} has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = uri
            .port_u16()
            .unwrap_or(if endpoint.is_secure() { 443 } else { 80 });

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| GolosError::Transport(format!("Cannot resolve {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| GolosError::Transport(format!("No address for {host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| GolosError::Transport(format!("Cannot connect to {endpoint}: {e}")))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        let (socket, response) = tungstenite::client_tls_with_config(endpoint.get_url(), stream, None, None)
            .map_err(|e| GolosError::Transport(format!("Handshake with {endpoint} failed: {e}")))?;
        debug!("Handshake with {endpoint} completed: {}", response.status());

        Ok(Box::new(WsChannel { socket }))
    }
}

struct WsChannel {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Channel for WsChannel {
    fn send_text(&mut self, text: &str) -> Result<()> {
        self.socket.send(Message::text(text.to_owned()))?;
        Ok(())
    }

    fn recv_text(&mut self) -> Result<String> {
        loop {
            match self.socket.read()? {
                Message::Text(text) => return Ok(text.as_str().to_owned()),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes.to_vec())
                        .map_err(|e| GolosError::Protocol(format!("Binary frame is not UTF-8: {e}")))
                }
                Message::Close(frame) => {
                    return Err(GolosError::Transport(format!("Node closed the connection: {frame:?}")))
                }
                // pings are answered by tungstenite on the next read or write
                _ => continue,
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.socket.close(None) {
            debug!("Error while closing websocket: {e}");
        }
    }
}

/// Websocket JSON-RPC client with node failover.
pub struct WsClient {
    pool: NodePool,
    dialer: Box<dyn Dialer>,
    channel: Option<Box<dyn Channel>>,
    state: ConnectionState,
    connect_policy: RetryPolicy,
    call_policy: RetryPolicy,
    next_id: u64,
}

impl WsClient {
    /// Build the node pool and policies from `config` and connect.
    pub fn new(config: &Config) -> Result<WsClient> {
        let mut pool = NodePool::new(&config.nodes)?;
        if config.shuffle_nodes {
            pool.shuffle();
        }
        WsClient::with_dialer(
            pool,
            Box::new(WsDialer::new(config.timeout())),
            config.connect_policy(),
            config.call_policy(),
        )
    }

    pub fn with_dialer(
        pool: NodePool,
        dialer: Box<dyn Dialer>,
        connect_policy: RetryPolicy,
        call_policy: RetryPolicy,
    ) -> Result<WsClient> {
        let mut client = WsClient {
            pool,
            dialer,
            channel: None,
            state: ConnectionState::Disconnected,
            connect_policy,
            call_policy,
            next_id: 0,
        };
        client.connect()?;
        Ok(client)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Url of the node currently in use.
    pub fn url(&self) -> Option<&str> {
        self.pool.current().map(NodeEndpoint::get_url)
    }

    /// Connect to the next endpoint in the pool, rotating through the list until one
    /// accepts or the connect budget runs out.
    pub fn connect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;
        let mut failures: u32 = 0;

        loop {
            let endpoint = self.pool.advance().clone();
            info!("Trying to connect to node {endpoint}");

            match self.dialer.dial(&endpoint) {
                Ok(channel) => {
                    self.channel = Some(channel);
                    self.pool.mark_current(EndpointState::Connected);
                    self.state = ConnectionState::Connected;
                    info!("Connected to node {endpoint}");
                    return Ok(());
                }
                Err(e) if !e.is_retryable() => {
                    error!("Giving up on {endpoint}: {e}");
                    self.state = ConnectionState::Failed;
                    return Err(e);
                }
                Err(e) => {
                    failures += 1;
                    self.pool.mark_current(EndpointState::NeedsReconnect);
                    warn!(
                        "Cannot connect to node {endpoint} ({failures}/{}): {e}",
                        self.connect_policy.max_attempts
                    );
                    if self.connect_policy.is_exhausted(failures) {
                        self.state = ConnectionState::Failed;
                        return Err(GolosError::RetriesExceeded {
                            attempts: failures,
                            last_error: e.to_string(),
                        });
                    }
                    sleep(self.connect_policy.delay(failures));
                }
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Invoke `method` with positional `params` and return the node's `result`.
    pub fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value> {
        let namespace = namespace_for(method)?;
        self.next_id += 1;
        let request_id = self.next_id;
        let body = json!({
            "id": request_id,
            "method": "call",
            "jsonrpc": "2.0",
            "params": [namespace, method, params],
        })
        .to_string();
        debug!("Request {request_id} to {:?}: {body}", self.url());

        let mut failures: u32 = 0;
        let response = loop {
            let err = match self.exchange(&body) {
                Ok(text) => break text,
                Err(e) => e,
            };
            failures += 1;
            if !self.call_policy.should_retry(&err, failures) {
                if !err.is_retryable() {
                    return Err(err);
                }
                warn!("Giving up on call {method} after {failures} attempts: {err}");
                return Err(GolosError::RetriesExceeded {
                    attempts: failures,
                    last_error: err.to_string(),
                });
            }
            warn!(
                "Lost connection to node during call {method} ({failures}/{}): {err}",
                self.call_policy.max_attempts
            );

            self.close();
            sleep(self.call_policy.delay(failures));
            match self.connect() {
                Ok(()) => {}
                Err(e) if e.is_retryable() || matches!(e, GolosError::RetriesExceeded { .. }) => {
                    warn!("Reconnect failed: {e}");
                }
                Err(e) => return Err(e),
            }
        };

        interpret_response(request_id, &response)
    }

    fn exchange(&mut self, body: &str) -> Result<String> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| GolosError::Transport("Not connected".to_string()))?;
        channel.send_text(body)?;
        channel.recv_text()
    }
}

impl RpcClient for WsClient {
    fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value> {
        WsClient::call(self, method, params)
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn sleep(delay: Duration) {
    if !delay.is_zero() {
        debug!("Sleeping {} ms before next attempt", delay.as_millis());
        thread::sleep(delay);
    }
}

/// Extract `result` from a response envelope, or classify its `error`.
pub fn interpret_response(request_id: u64, text: &str) -> Result<Value> {
    let response: Value = serde_json::from_str(text)?;

    match response.get("id") {
        Some(id) if id.as_u64() == Some(request_id) => {}
        Some(Value::Null) | None if response.get("error").is_some() => {}
        other => {
            return Err(GolosError::Protocol(format!(
                "Response id {other:?} does not match request {request_id}"
            )))
        }
    }

    if let Some(error) = response.get("error") {
        return Err(classify_rpc_error(error));
    }
    response
        .get("result")
        .cloned()
        .ok_or_else(|| GolosError::Protocol(format!("Response has neither result nor error: {text}")))
}

/// Map a node error object to a typed error. `${key}` placeholders are filled from
/// `data` and from each stack frame's own `data`.
pub fn classify_rpc_error(error: &Value) -> GolosError {
    let code = error.get("code").and_then(Value::as_i64);
    let data = error.get("data");
    let message = substitute_placeholders(
        error.get("message").and_then(Value::as_str).unwrap_or("unknown error"),
        data,
    );

    let mut details = vec![message.clone()];
    if let Some(stack) = data.and_then(|d| d.get("stack")).and_then(Value::as_array) {
        for frame in stack {
            if let Some(format) = frame.get("format").and_then(Value::as_str) {
                details.push(substitute_placeholders(format, frame.get("data")));
            }
        }
    }
    let haystack = details.join("\n").to_lowercase();

    if haystack.contains("unknown transaction") || haystack.contains("transaction not found") {
        GolosError::TransactionNotFound(details.last().cloned().unwrap_or(message))
    } else if haystack.contains("could not find api")
        || haystack.contains("no method with name")
        || haystack.contains("unknown api")
        || haystack.contains("api not found")
    {
        GolosError::ApiNotFound(message)
    } else {
        GolosError::Rpc { code, message }
    }
}

fn substitute_placeholders(template: &str, data: Option<&Value>) -> String {
    let Some(Value::Object(values)) = data else {
        return template.to_string();
    };
    values.iter().fold(template.to_string(), |text, (key, value)| {
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text.replace(&format!("${{{key}}}"), &replacement)
    })
}
