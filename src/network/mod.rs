//! Node transport
//!
//! Websocket JSON-RPC against a pool of Golos nodes: method routing, endpoint
//! rotation, bounded retries with backoff, and error classification.

pub mod api;
pub mod client;
pub mod node;
pub mod retry;

pub use api::{known_methods, namespace_for};
pub use client::{
    classify_rpc_error, interpret_response, Channel, ConnectionState, Dialer, RpcClient, WsClient,
    WsDialer,
};
pub use node::{EndpointState, NodeEndpoint, NodePool};
pub use retry::RetryPolicy;
