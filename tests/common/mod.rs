//! Shared utilities for integration testing.
//!
//! A raw-TCP HTTP/1.1 backend whose responses are computed per request,
//! used to stand in for the JSON-RPC node, IPFS APIs, GitHub and the model.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Anvil's first well-known development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const TEST_TX_HASH: &str =
    "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

/// A parsed request as seen by the mock.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl MockRequest {
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// JSON-RPC method name, for single (non-batch) calls.
    pub fn rpc_method(&self) -> Option<String> {
        self.json()?.get("method")?.as_str().map(str::to_string)
    }

    pub fn rpc_id(&self) -> Value {
        self.json()
            .and_then(|v| v.get("id").cloned())
            .unwrap_or(Value::from(1))
    }

    pub fn rpc_params(&self) -> Value {
        self.json()
            .and_then(|v| v.get("params").cloned())
            .unwrap_or(Value::Null)
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut body = buf[header_end..].to_vec();
    if let Some(length) = headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(length);
    } else if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        // Raw chunked bytes are enough for the tests that look at bodies.
        while !body.ends_with(b"0\r\n\r\n") {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }

    Some(MockRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Start a programmable backend on an ephemeral port and return its address.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

pub fn rpc_result(id: Value, result: Value) -> (u16, String) {
    (200, json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string())
}

pub fn rpc_error(id: Value, code: i64, message: &str) -> (u16, String) {
    (
        200,
        json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
            .to_string(),
    )
}

/// A mined legacy receipt. `status` is true for success.
pub fn receipt_json(tx_hash: &str, status: bool) -> Value {
    json!({
        "type": "0x0",
        "status": if status { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": format!("0x{}", "1".repeat(64)),
        "blockNumber": "0x10",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        "to": "0x19054030669efbfc413ba3729b63ecfd3bdc22b5",
        "contractAddress": null
    })
}

/// A 32-byte ABI word holding `value`.
pub fn abi_uint(value: u64) -> String {
    format!("0x{:064x}", value)
}

/// Default answers for the read-only calls every submission makes.
pub fn default_rpc(method: &str, id: Value) -> Option<(u16, String)> {
    let result = match method {
        "eth_chainId" => json!("0x4cb2f"),
        "eth_blockNumber" => json!("0x10"),
        "eth_getTransactionCount" => json!("0x5"),
        "eth_estimateGas" => json!("0x5208"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getBalance" => json!("0xde0b6b3a7640000"),
        "eth_getCode" => json!("0x6080"),
        "eth_sendRawTransaction" => json!(TEST_TX_HASH),
        "eth_getTransactionReceipt" => receipt_json(TEST_TX_HASH, true),
        _ => return None,
    };
    Some(rpc_result(id, result))
}
