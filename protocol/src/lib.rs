//! Plain data shared by the overlay core and the privileged completion bridge.
//!
//! Nothing in this crate performs I/O: it only describes settings, correction requests and
//! results, and the JSON messages exchanged with the bridge.

pub mod bridge;
pub mod chat_completion;
pub mod correction;
pub mod settings;

pub use bridge::ApiCall;
pub use bridge::BridgeRequest;
pub use bridge::BridgeResponse;
pub use bridge::ProtocolError;
pub use correction::CorrectionRequest;
pub use correction::CorrectionResult;
pub use correction::DEFAULT_PROMPT;
pub use settings::Settings;
pub use settings::SettingsField;
