//! Direct tier — newline-delimited JSON-RPC 2.0 over a TCP connection to the
//! authoritative catalog service.
//!
//! One request per connection:
//!   → `{"jsonrpc":"2.0","id":1,"method":"ListProducts","params":{}}\n`
//!   ← `{"jsonrpc":"2.0","id":1,"result":{"products":[...]}}\n`

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{Backend, Capability, SourceTier, TierError};

/// Upper bound on a single reply line.
pub const MAX_REPLY_BYTES: usize = 4 * 1024 * 1024;

pub struct DirectBackend {
    name: String,
    addr: String,
    next_id: AtomicU64,
    max_reply_bytes: usize,
}

impl DirectBackend {
    pub fn new(name: &str, addr: &str) -> Self {
        Self {
            name: name.to_string(),
            addr: addr.to_string(),
            next_id: AtomicU64::new(1),
            max_reply_bytes: MAX_REPLY_BYTES,
        }
    }

    pub fn with_max_reply_bytes(mut self, limit: usize) -> Self {
        self.max_reply_bytes = limit.max(1);
        self
    }

    async fn call(&self, method: &str, params: &Value) -> Result<Value, TierError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TierError::Transport(format!("connect {}: {}", self.addr, e)))?;
        let (reader, mut writer) = stream.into_split();

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let params = if params.is_null() {
            serde_json::json!({})
        } else {
            params.clone()
        };
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut line = request.to_string();
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;

        // One byte past the limit tells an oversized line from one that fits exactly.
        let mut reader = BufReader::new(reader.take(self.max_reply_bytes as u64 + 1));
        let mut reply = Vec::new();
        let read = reader
            .read_until(b'\n', &mut reply)
            .await
            .map_err(|e| TierError::Transport(e.to_string()))?;
        if read == 0 {
            return Err(TierError::Transport("connection closed before reply".to_string()));
        }
        if reply.len() > self.max_reply_bytes && reply.last() != Some(&b'\n') {
            return Err(TierError::Malformed(format!(
                "reply exceeds {} bytes",
                self.max_reply_bytes
            )));
        }

        let mut response: Value =
            serde_json::from_slice(&reply).map_err(|e| TierError::Malformed(e.to_string()))?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(TierError::Transport(format!("rpc error: {}", message)));
        }
        if response.get("id").and_then(|v| v.as_u64()) != Some(id) {
            return Err(TierError::Malformed("reply id mismatch".to_string()));
        }

        response
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| TierError::Malformed("missing 'result'".to_string()))
    }
}

#[async_trait]
impl Backend for DirectBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Direct
    }

    fn address(&self) -> &str {
        &self.addr
    }

    async fn fetch(&self, capability: Capability, params: &Value) -> Result<Value, TierError> {
        self.call(capability.rpc_method(), params).await
    }

    async fn probe(&self) -> Result<Value, TierError> {
        TcpStream::connect(&self.addr)
            .await
            .map(|_| serde_json::json!({ "connected": true }))
            .map_err(|e| TierError::Transport(e.to_string()))
    }
}
