use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 转发到上游时固定使用的请求 id
pub const RPC_REQUEST_ID: &str = "ash-coin-app";

const DEFAULT_RPC_ERROR: &str = "Error calling Helius API";

/// JSON-RPC 2.0 请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: RPC_REQUEST_ID.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 响应，`error` 可能是对象也可能是字符串
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// 上游返回了错误时给出错误信息
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        if is_falsy(error) {
            return None;
        }

        let message = error
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_RPC_ERROR);
        Some(message.to_string())
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// 浏览器发给 `/api/helius` 的请求体。
///
/// `method` 和 `walletAddress` 不限定类型，按真值判断是否存在：
/// `null`、`false`、`0`、空串视为缺失，其余值转成字符串使用。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<Value>,
}

impl ProxyRequest {
    pub fn method_name(&self) -> Option<String> {
        self.method.as_ref().and_then(truthy_text)
    }

    /// 钱包限流使用的标识
    pub fn wallet_key(&self) -> Option<String> {
        self.wallet_address.as_ref().and_then(truthy_text)
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    if is_falsy(value) {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_omits_missing_params() {
        let body = serde_json::to_value(RpcRequest::new("getBlockHeight", None)).unwrap();
        assert_eq!(
            body,
            json!({"jsonrpc": "2.0", "id": "ash-coin-app", "method": "getBlockHeight"})
        );
    }

    #[test]
    fn error_message_prefers_upstream_message() {
        let resp: RpcResponse =
            serde_json::from_value(json!({"error": {"code": -32602, "message": "Invalid params"}}))
                .unwrap();
        assert_eq!(resp.error_message().as_deref(), Some("Invalid params"));

        let resp: RpcResponse = serde_json::from_value(json!({"error": {"code": -1}})).unwrap();
        assert_eq!(resp.error_message().as_deref(), Some(DEFAULT_RPC_ERROR));

        let resp: RpcResponse =
            serde_json::from_value(json!({"result": 5, "error": null})).unwrap();
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn proxy_request_reads_camel_case_wallet() {
        let req: ProxyRequest = serde_json::from_value(json!({
            "method": "getBalance",
            "params": ["abc"],
            "walletAddress": "Wallet111"
        }))
        .unwrap();
        assert_eq!(req.method_name().as_deref(), Some("getBalance"));
        assert_eq!(req.wallet_key().as_deref(), Some("Wallet111"));
    }

    #[test]
    fn non_string_fields_use_truthiness() {
        let req: ProxyRequest =
            serde_json::from_value(json!({"method": 7, "walletAddress": 12345})).unwrap();
        assert_eq!(req.method_name().as_deref(), Some("7"));
        assert_eq!(req.wallet_key().as_deref(), Some("12345"));

        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            let req: ProxyRequest = serde_json::from_value(
                json!({"method": falsy.clone(), "walletAddress": falsy}),
            )
            .unwrap();
            assert_eq!(req.method_name(), None);
            assert_eq!(req.wallet_key(), None);
        }
    }
}
