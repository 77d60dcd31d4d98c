use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RpcError;

const JSONRPC_VERSION: &str = "2.0";
const REQUEST_ID: u64 = 1;

/// A parameterless JSON-RPC 2.0 request.
///
/// Serializes as `{"jsonrpc":"2.0","method":"<method>","params":[],"id":1}`.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: [Value; 0],
    id: u64,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: [],
            id: REQUEST_ID,
        }
    }
}

/// Response envelope. Only `result` carries data; the other fields are read
/// to detect remote errors.
///
/// Standard nodes report failures as an `error` object with `code` and
/// `message`. Ontology nodes always send an integer `error` (0 on success)
/// next to a `desc` string.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    desc: Option<String>,
}

impl<T> RpcEnvelope<T> {
    pub fn into_result(self) -> Result<T, RpcError> {
        match self.error {
            Some(Value::Object(obj)) => {
                let code = obj.get("code").and_then(Value::as_i64).unwrap_or_default();
                let message = obj
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                return Err(RpcError::Remote { code, message });
            }
            Some(Value::Number(code)) if code.as_i64() != Some(0) => {
                return Err(RpcError::Remote {
                    code: code.as_i64().unwrap_or(-1),
                    message: self.desc.unwrap_or_default(),
                });
            }
            _ => {}
        }
        self.result.ok_or(RpcError::MissingResult)
    }
}
