//! Editable-surface detection and text injection for an in-page correction overlay.
//!
//! The core is host-agnostic: it talks to the page through [`HostDocument`] and to the completion
//! service through [`CompletionBridge`]. [`headless::HeadlessDocument`] is an in-memory host used by
//! tests and tooling; the browser host lives in `web` and is only built for `wasm32`.

pub mod bridge;
pub mod classify;
pub mod controller;
pub mod dom;
pub mod focus_tracker;
pub mod headless;
pub mod inject;
pub mod panel;
#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;
pub mod settings_store;
#[cfg(target_arch = "wasm32")]
mod web;

pub use bridge::CompletionBridge;
pub use classify::Classification;
pub use classify::Classifier;
pub use classify::EditableKind;
pub use controller::FocusState;
pub use controller::OverlayController;
pub use controller::OverlayError;
pub use dom::DomError;
pub use dom::ElementId;
pub use dom::HostDocument;
pub use focus_tracker::BLUR_DEBOUNCE;
pub use inject::InjectionStrategy;
pub use inject::WriteMethod;
pub use inject::strategy_for;
#[cfg(not(target_arch = "wasm32"))]
pub use runtime::OverlayEvent;
#[cfg(not(target_arch = "wasm32"))]
pub use runtime::OverlayRuntime;
pub use settings_store::SettingsError;
pub use settings_store::SettingsStore;
