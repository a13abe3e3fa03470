//! Completion bridge: hands a correction request to a privileged context and awaits one reply.
//!
//! The page-side code never performs network I/O. It sends a [`BridgeRequest`] and receives
//! exactly one [`CorrectionResult`], whatever happens on the other side.
//!
//! Implementations:
//! - `texty-cli`'s `HttpCompletionClient` performs the HTTP call in-process (`texty fix`).
//! - On `wasm32` the browser host sends the request with `chrome.runtime.sendMessage`. The
//!   extension's background worker relays it unchanged to the `texty bridge` native-messaging
//!   host (`chrome.runtime.sendNativeMessage`) and hands the single reply back.
//!   The relay and the host manifest belong to the extension package, not this workspace.

use std::future::Future;

use texty_protocol::BridgeRequest;
use texty_protocol::CorrectionResult;

pub trait CompletionBridge: Send + Sync + 'static {
    /// Must resolve exactly once. Transport problems come back as [`CorrectionResult::Failure`].
    fn complete(&self, request: BridgeRequest) -> impl Future<Output = CorrectionResult> + Send;
}
