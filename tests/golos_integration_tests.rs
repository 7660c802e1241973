//! End-to-end tests
//!
//! Key derivation and transaction bytes against known chain vectors, and the websocket
//! client against a real local websocket server. Nothing here touches the public
//! network.

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use golos_core::network::{NodePool, RetryPolicy, WsDialer};
use golos_core::{
    derive_keys, is_key, public_from_wif, transaction_hex, transaction_id, ConnectionState,
    GolosError, Operation, Role, TransactionBuilder, WsClient,
};
use serde_json::{json, Value};
use tungstenite::Message;

type Handler = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;

/// Start a websocket JSON-RPC server on an ephemeral port. `drop_first` connections are
/// closed right after their first request arrives.
fn spawn_node(handler: Handler, drop_first: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let handler = handler.clone();
            let index = accepted.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || {
                let Ok(mut socket) = tungstenite::accept(stream) else {
                    return;
                };
                loop {
                    let text = match socket.read() {
                        Ok(Message::Text(text)) => text.as_str().to_owned(),
                        Ok(Message::Close(_)) | Err(_) => return,
                        Ok(_) => continue,
                    };
                    if index < drop_first {
                        let _ = socket.close(None);
                        return;
                    }
                    let request: Value = serde_json::from_str(&text).unwrap();
                    let method = request["params"][1].as_str().unwrap_or_default().to_string();
                    let mut response = handler(&method, &request["params"][2]);
                    response["id"] = request["id"].clone();
                    response["jsonrpc"] = json!("2.0");
                    if socket.send(Message::text(response.to_string())).is_err() {
                        return;
                    }
                }
            });
        }
    });

    url
}

/// A url on which nothing is listening.
fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn connect(urls: &[String], attempts: u32) -> golos_core::Result<WsClient> {
    WsClient::with_dialer(
        NodePool::new(urls).unwrap(),
        Box::new(WsDialer::new(Duration::from_secs(5))),
        RetryPolicy::immediate(attempts),
        RetryPolicy::immediate(attempts),
    )
}

fn chain_node() -> Handler {
    Arc::new(|method: &str, params: &Value| match method {
        "get_dynamic_global_properties" => json!({"result": {
            "head_block_number": 30895435u64,
            "head_block_id": "01d76d4b2b19f0b3e0c7b7b3c2b4d1f0a9e8d7c6",
            "time": "2019-10-01T12:49:00",
        }}),
        "broadcast_transaction_synchronous" => {
            let signatures = params[0]["signatures"].as_array().map_or(0, Vec::len);
            json!({"result": {"id": "ignored", "block_num": 30895436, "trx_num": signatures, "expired": false}})
        }
        "get_transaction" => json!({"error": {
            "code": 1,
            "message": "Assert Exception",
            "data": {"stack": [{"format": "Unknown Transaction ${id}", "data": {"id": params[0]}}]},
        }}),
        _ => json!({"error": {"code": 1, "message": format!("no method with name '{method}'")}}),
    })
}

#[test]
fn test_derive_keys_reference_account() {
    let keys = derive_keys("someguy123", "example").unwrap();
    assert_eq!(keys.login(), "someguy123");
    assert_eq!(
        keys.private(Role::Active),
        Some("5KME2a7DBdGBdpAwLC4tGmJ8mSz9HgZkcMtKc8rkADn6cLZyvPc")
    );
    assert_eq!(
        keys.public(Role::Active),
        Some("GLS7LjcmXF4mf9z3MNgcceSvMG8oezEtGhcL4yAXpJWFZxdX47ET7")
    );
    assert_eq!(
        keys.public(Role::Memo),
        Some("GLS8PwccyJcqMsrrwk7pYJ64DVEcw7a3p4EWuXXLRBaCx4LHnVyjW")
    );

    // Deriving twice gives the same text
    let again = derive_keys("someguy123", "example").unwrap();
    for role in Role::ALL {
        assert_eq!(keys.private(role), again.private(role));
    }
}

#[test]
fn test_public_from_private_text() {
    let wif = "5Jq19TeeVmGrBFnu32oxfxQMiipnSCKmwW7fZGUVLAoqsKJ9JwP";
    let public = "GLS7qHue1h2eWV8M7WKtb6F8dbhKfEFvLVy9JqvSTHBBEM5JMdsmh";
    assert_eq!(public_from_wif(wif).unwrap(), public);
    assert!(is_key(wif, public));
    assert!(!is_key(wif, "GLS8PwccyJcqMsrrwk7pYJ64DVEcw7a3p4EWuXXLRBaCx4LHnVyjW"));
}

#[test]
fn test_reference_transaction_vectors() {
    let tx = json!({
        "ref_block_num": 27979,
        "ref_block_prefix": 3018856747u32,
        "expiration": "2019-10-01T12:50:00",
        "operations": [["transfer", {
            "from": "someguy123",
            "to": "ksantoprotein",
            "amount": "0.100 GOLOS",
            "memo": "testing",
        }]],
        "extensions": [],
        "signatures": [],
    });
    assert_eq!(
        transaction_id(&tx).unwrap(),
        "c901c52daf57b60242d9d7be67f790e023cf2780"
    );
    assert_eq!(
        transaction_hex(&tx, true).unwrap(),
        "4b6d2b19f0b3784b935d01020a736f6d656775793132330d6b73616e746f70726f7465696e640000000000000003474f4c4f5300000774657374696e6700"
    );
}

#[test]
fn test_fails_over_past_dead_nodes() {
    let live = spawn_node(chain_node(), 0);
    let urls = vec![dead_url(), dead_url(), live.clone()];

    let mut client = connect(&urls, 5).unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.url(), Some(live.as_str()));

    let props = client.call("get_dynamic_global_properties", vec![]).unwrap();
    assert_eq!(props["head_block_number"], 30895435);
}

#[test]
fn test_retries_exceeded_when_all_nodes_dead() {
    let urls = vec![dead_url(), dead_url()];
    match connect(&urls, 3) {
        Err(GolosError::RetriesExceeded { attempts, .. }) => assert_eq!(attempts, 3),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("connected to a dead node"),
    }
}

#[test]
fn test_unknown_method_fails_locally() {
    let live = spawn_node(chain_node(), 0);
    let mut client = connect(&[live], 1).unwrap();
    assert!(matches!(
        client.call("get_something_else", vec![]),
        Err(GolosError::ApiNotFound(_))
    ));
}

#[test]
fn test_reconnects_after_dropped_connection() {
    let live = spawn_node(chain_node(), 1);
    let mut client = connect(&[live], 3).unwrap();
    let props = client.call("get_dynamic_global_properties", vec![]).unwrap();
    assert_eq!(props["time"], "2019-10-01T12:49:00");
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[test]
fn test_transaction_not_found_from_node() {
    let live = spawn_node(chain_node(), 0);
    let mut client = connect(&[live], 3).unwrap();
    assert_eq!(
        golos_core::get_transaction(&mut client, "deadbeef"),
        Err(GolosError::TransactionNotFound(
            "Unknown Transaction deadbeef".to_string()
        ))
    );
}

#[test]
fn test_finalize_against_local_node() {
    let live = spawn_node(chain_node(), 0);
    let mut client = connect(&[live], 3).unwrap();

    let keys = derive_keys("someguy123", "example").unwrap();
    let active = keys.get(Role::Active).unwrap().private_key().clone();
    let op = Operation::from_value(
        "transfer",
        json!({
            "from": "someguy123",
            "to": "ksantoprotein",
            "amount": "0.100 GOLOS",
            "memo": "testing",
        }),
    )
    .unwrap();

    let builder = TransactionBuilder::default();
    let result = builder.finalize(&mut client, vec![op], &[active]).unwrap();
    assert_eq!(result.id, "c901c52daf57b60242d9d7be67f790e023cf2780");
    assert_eq!(result.block_num, Some(30895436));
    assert_eq!(result.trx_num, Some(1));
    assert_eq!(result.transaction.signatures.len(), 1);
}
