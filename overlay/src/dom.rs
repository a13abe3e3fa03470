//! Host-document abstraction.
//!
//! The overlay never owns document nodes. It holds [`ElementId`] handles and resolves them through
//! a [`HostDocument`] on every use, because the page may remove or replace any node at any time.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Non-owning handle to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("element {0} is no longer attached to the document")]
    Detached(ElementId),

    #[error("element {0} does not support {1}")]
    Unsupported(ElementId, &'static str),

    #[error("host document error: {0}")]
    Host(String),
}

/// Viewport-relative bounding rectangle, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            right: left + width,
            bottom: top + height,
        }
    }
}

/// Parts of the overlay's own UI that can hold focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPart {
    Trigger,
    Panel,
}

/// Editing intent carried by a synthetic `beforeinput` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputIntent {
    DeleteContent,
    InsertText(String),
}

impl InputIntent {
    /// Value of the event's `inputType` property.
    pub fn input_type(&self) -> &'static str {
        match self {
            InputIntent::DeleteContent => "deleteContent",
            InputIntent::InsertText(_) => "insertText",
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            InputIntent::DeleteContent => None,
            InputIntent::InsertText(text) => Some(text),
        }
    }
}

/// Synthetic notifications the overlay dispatches at an element. All of them bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    Input,
    Change,
    BeforeInput(InputIntent),
}

impl DomEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::BeforeInput(_) => "beforeinput",
        }
    }
}

/// Attribute snapshot of a node, enough to classify it without touching layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    /// Upper-case tag name, e.g. `TEXTAREA`.
    pub tag_name: String,
    /// Native content-editability (`isContentEditable`).
    pub content_editable: bool,
    /// Whether the node lives inside the overlay's own panel.
    pub in_overlay_panel: bool,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl NodeInfo {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_uppercase(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    pub fn in_overlay_panel(mut self) -> Self {
        self.in_overlay_panel = true;
        self
    }
}

/// Everything the overlay needs from the document it is embedded in.
///
/// Implementations must report [`DomError::Detached`] for handles whose node has left the
/// document instead of panicking.
pub trait HostDocument {
    /// Attribute snapshot, or `None` when the node is detached or unknown.
    fn node(&self, id: ElementId) -> Option<NodeInfo>;

    fn is_attached(&self, id: ElementId) -> bool;

    fn bounding_rect(&self, id: ElementId) -> Result<Rect, DomError>;

    fn active_element(&self) -> Option<ElementId>;

    /// Whether `id` is (or lies inside) the given part of the overlay UI.
    fn overlay_contains(&self, part: OverlayPart, id: ElementId) -> bool;

    fn focus(&mut self, id: ElementId) -> Result<(), DomError>;

    /// Text value of a native text field.
    fn value(&self, id: ElementId) -> Result<String, DomError>;

    fn set_value(&mut self, id: ElementId, value: &str) -> Result<(), DomError>;

    fn text_content(&self, id: ElementId) -> Result<String, DomError>;

    fn set_text_content(&mut self, id: ElementId, text: &str) -> Result<(), DomError>;

    /// Selects the entire content of `id`.
    fn select_all(&mut self, id: ElementId) -> Result<(), DomError>;

    /// Text of the document's current selection.
    fn selection_text(&self) -> String;

    /// The host's text-insertion primitive: replaces the current selection in the focused element.
    /// Returns whether the host honoured the command.
    fn insert_text(&mut self, text: &str) -> bool;

    fn dispatch(&mut self, id: ElementId, event: DomEvent) -> Result<(), DomError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rect_new_derives_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 30.0);
        assert_eq!(rect.right, 120.0);
        assert_eq!(rect.bottom, 40.0);
    }

    #[test]
    fn intents_map_to_input_types() {
        assert_eq!(InputIntent::DeleteContent.input_type(), "deleteContent");
        let insert = InputIntent::InsertText("hi".to_string());
        assert_eq!(insert.input_type(), "insertText");
        assert_eq!(insert.data(), Some("hi"));
    }

    #[test]
    fn node_info_tag_comparison_is_case_insensitive() {
        let node = NodeInfo::new("textarea");
        assert_eq!(node.tag_name, "TEXTAREA");
        assert!(node.is_tag("TextArea"));
    }
}
