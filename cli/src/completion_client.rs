//! The privileged side of the completion bridge: performs the HTTP call.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use texty_overlay::CompletionBridge;
use texty_protocol::ApiCall;
use texty_protocol::BridgeRequest;
use texty_protocol::BridgeResponse;
use texty_protocol::CorrectionResult;
use texty_protocol::chat_completion::ChatCompletionRequest;

const TEXTY_VERSION: &str = env!("CARGO_PKG_VERSION");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Performs one `makeApiCall` and always produces exactly one response envelope.
pub trait CompletionCaller: Send + Sync {
    fn call(&self, call: &ApiCall) -> impl Future<Output = BridgeResponse> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("texty/{TEXTY_VERSION}"))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build HTTP client")?;
        Ok(Self { client })
    }

    /// POSTs the chat request. The body is parsed as JSON whatever the status code, so error
    /// envelopes reach the caller intact.
    async fn post(&self, call: &ApiCall) -> anyhow::Result<Value> {
        let body = ChatCompletionRequest {
            model: call.model.clone(),
            messages: call.messages.clone(),
        };
        let response = self
            .client
            .post(&call.endpoint)
            .bearer_auth(&call.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {}", call.endpoint))?;
        let status = response.status();
        let data = response
            .json::<Value>()
            .await
            .with_context(|| format!("decode response body (HTTP {status})"))?;
        if !status.is_success() {
            tracing::debug!(%status, "completion endpoint returned an error status");
        }
        Ok(data)
    }
}

impl CompletionCaller for HttpCompletionClient {
    async fn call(&self, call: &ApiCall) -> BridgeResponse {
        match self.post(call).await {
            Ok(data) => BridgeResponse::ok(data),
            Err(err) => {
                tracing::error!("completion request failed: {err:#}");
                BridgeResponse::err(format!("{err:#}"))
            }
        }
    }
}

impl CompletionBridge for HttpCompletionClient {
    async fn complete(&self, request: BridgeRequest) -> CorrectionResult {
        let BridgeRequest::MakeApiCall(call) = request;
        self.call(&call).await.into_correction_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use texty_protocol::CorrectionRequest;
    use texty_protocol::Settings;
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if rest.len() >= length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write");
            String::from_utf8_lossy(&received).to_string()
        });
        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    fn api_call(endpoint: String) -> ApiCall {
        ApiCall::new(
            &Settings {
                endpoint,
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            &CorrectionRequest::new("Fix.", "teh cat"),
        )
    }

    #[tokio::test]
    async fn posts_bearer_authenticated_chat_request() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"the cat"}}]}"#,
        )
        .await;
        let client = HttpCompletionClient::new().expect("client");

        let response = client.call(&api_call(endpoint)).await;
        let request = server.await.expect("server");

        assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: bearer sk-test")
        );
        let body = request.split_once("\r\n\r\n").expect("body").1;
        let body: Value = serde_json::from_str(body).expect("json body");
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Fix."},
                    {"role": "user", "content": "teh cat"},
                ],
            })
        );
        assert_eq!(
            response.into_correction_result(),
            CorrectionResult::success("the cat")
        );
    }

    #[tokio::test]
    async fn error_status_body_is_still_returned() {
        let (endpoint, server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )
        .await;
        let client = HttpCompletionClient::new().expect("client");

        let result = client
            .complete(BridgeRequest::MakeApiCall(api_call(endpoint)))
            .await;
        server.await.expect("server");

        assert_eq!(
            result,
            CorrectionResult::failure("Incorrect API key provided")
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_failure_envelope() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let client = HttpCompletionClient::new().expect("client");

        let response = client
            .call(&api_call(format!("http://{addr}/v1/chat/completions")))
            .await;

        assert!(!response.success);
        assert!(response.data.is_none());
        assert!(response.error.is_some_and(|error| error.contains("POST")));
    }
}
