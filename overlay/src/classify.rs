//! Editable-surface classification.
//!
//! Classification is an ordered list of named rules; the first rule whose predicate matches
//! decides the verdict. Supporting a new editor means inserting a rule, not editing a branch.

use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::dom::NodeInfo;

/// How an editable surface stores its text, and therefore how it is read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EditableKind {
    PlainInput,
    ContentEditable,
    RichTextWidget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Editable(EditableKind),
    NotEditable,
}

/// Valid `INPUT` types without plain-text semantics. Everything else (`text`, `search`, `email`,
/// `url`, `tel`, and a missing, empty or invalid `type`, which renders as `text`) is a plain field.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "password",
    "button",
    "checkbox",
    "color",
    "date",
    "datetime-local",
    "file",
    "hidden",
    "image",
    "month",
    "number",
    "radio",
    "range",
    "reset",
    "submit",
    "time",
    "week",
];

/// Accessibility roles that mark a custom text-entry surface.
const TEXTBOX_ROLES: &[&str] = &["textbox", "input"];

/// Signature left on the DOM by a specific third-party editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetMarker {
    Class(&'static str),
    Attribute(&'static str, &'static str),
}

impl WidgetMarker {
    pub fn matches(self, node: &NodeInfo) -> bool {
        match self {
            WidgetMarker::Class(class) => node.has_class(class),
            WidgetMarker::Attribute(name, value) => node.attr(name) == Some(value),
        }
    }
}

/// Markers of widely used rich-text editors.
///
/// All of these editors mount on a natively content-editable element, so the default rule order
/// classifies them as [`EditableKind::ContentEditable`]. They only decide the verdict for hosts that
/// insert a marker rule ahead of `content-editable` with [`Classifier::insert_before`], or for a
/// marked element that is not itself content-editable.
pub const KNOWN_WIDGET_MARKERS: &[WidgetMarker] = &[
    // ProseMirror (and Tiptap, which builds on it)
    WidgetMarker::Class("ProseMirror"),
    // Quill
    WidgetMarker::Class("ql-editor"),
    // CodeMirror 6
    WidgetMarker::Class("cm-content"),
    // Draft.js
    WidgetMarker::Class("public-DraftEditor-content"),
    // CKEditor 5
    WidgetMarker::Class("ck-editor__editable"),
    // TinyMCE iframe body
    WidgetMarker::Class("mce-content-body"),
    WidgetMarker::Attribute("data-slate-editor", "true"),
    WidgetMarker::Attribute("data-lexical-editor", "true"),
];

/// One entry of the classification list.
#[derive(Debug, Clone)]
pub struct ClassifierRule {
    pub name: &'static str,
    pub matches: fn(&NodeInfo) -> bool,
    pub verdict: Classification,
}

pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Classifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Inserts `rule` before the rule called `before`, or appends it when no rule has that name.
    pub fn insert_before(&mut self, before: &str, rule: ClassifierRule) {
        let index = self
            .rules
            .iter()
            .position(|existing| existing.name == before)
            .unwrap_or(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Pure attribute inspection; no side effects on the node.
    pub fn classify(&self, node: &NodeInfo) -> Classification {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(node))
            .map_or(Classification::NotEditable, |rule| rule.verdict)
    }

    /// Classifies a live element. Detached or unknown handles are not editable.
    pub fn classify_element<D: HostDocument + ?Sized>(
        &self,
        doc: &D,
        id: ElementId,
    ) -> Classification {
        match doc.node(id) {
            Some(node) => self.classify(&node),
            None => Classification::NotEditable,
        }
    }
}

pub fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule {
            name: "own-panel",
            matches: |node| node.in_overlay_panel,
            verdict: Classification::NotEditable,
        },
        ClassifierRule {
            name: "plain-input",
            matches: is_plain_text_field,
            verdict: Classification::Editable(EditableKind::PlainInput),
        },
        ClassifierRule {
            name: "content-editable",
            matches: |node| node.content_editable,
            verdict: Classification::Editable(EditableKind::ContentEditable),
        },
        ClassifierRule {
            name: "rich-text-widget",
            matches: is_rich_text_widget,
            verdict: Classification::Editable(EditableKind::RichTextWidget),
        },
    ]
}

fn is_plain_text_field(node: &NodeInfo) -> bool {
    if node.is_tag("TEXTAREA") {
        return true;
    }
    if !node.is_tag("INPUT") {
        return false;
    }
    let Some(kind) = node.attr("type").map(str::trim) else {
        return true;
    };
    !NON_TEXT_INPUT_TYPES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(kind))
}

fn is_rich_text_widget(node: &NodeInfo) -> bool {
    let has_textbox_role = node
        .attr("role")
        .is_some_and(|role| TEXTBOX_ROLES.contains(&role));
    has_textbox_role
        || KNOWN_WIDGET_MARKERS
            .iter()
            .any(|marker| marker.matches(node))
}
