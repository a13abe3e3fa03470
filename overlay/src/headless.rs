//! In-memory host document.
//!
//! Models just enough of a page to drive the overlay without a browser: native text fields,
//! content-editable regions, rich-text widgets with a private text model, the overlay's own
//! trigger and panel, focus, a whole-element selection, and a log of every dispatched event.

use std::collections::BTreeMap;

use crate::dom::DomError;
use crate::dom::DomEvent;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::dom::InputIntent;
use crate::dom::NodeInfo;
use crate::dom::OverlayPart;
use crate::dom::Rect;

/// Which signals a simulated rich-text widget updates its model from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetHonours {
    pub before_input: bool,
    pub insert_text_command: bool,
}

impl WidgetHonours {
    pub fn all() -> Self {
        Self {
            before_input: true,
            insert_text_command: true,
        }
    }

    pub fn none() -> Self {
        Self {
            before_input: false,
            insert_text_command: false,
        }
    }

    pub fn before_input_only() -> Self {
        Self {
            before_input: true,
            insert_text_command: false,
        }
    }

    pub fn insert_text_only() -> Self {
        Self {
            before_input: false,
            insert_text_command: true,
        }
    }
}

#[derive(Debug, Clone)]
enum Surface {
    Field { value: String },
    Text { text: String },
    Widget {
        model: String,
        honours: WidgetHonours,
        /// Lines render as block elements, so they vanish from `text_content`.
        paragraphs: bool,
    },
    Inert,
}

impl Surface {
    fn text(&self) -> &str {
        match self {
            Surface::Field { value } => value,
            Surface::Text { text } => text,
            Surface::Widget { model, .. } => model,
            Surface::Inert => "",
        }
    }
}

#[derive(Debug, Clone)]
struct HeadlessNode {
    info: NodeInfo,
    rect: Rect,
    attached: bool,
    parent: Option<ElementId>,
    surface: Surface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub target: ElementId,
    pub event: DomEvent,
}

#[derive(Debug, Default)]
pub struct HeadlessDocument {
    nodes: BTreeMap<ElementId, HeadlessNode>,
    next_id: u64,
    active: Option<ElementId>,
    /// Element whose entire content is selected.
    selection: Option<ElementId>,
    trigger: Option<ElementId>,
    panel: Option<ElementId>,
    events: Vec<RecordedEvent>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, info: NodeInfo, surface: Surface, parent: Option<ElementId>) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        let rect = Rect::new(20.0 * self.next_id as f64, 10.0, 200.0, 24.0);
        self.nodes.insert(
            id,
            HeadlessNode {
                info,
                rect,
                attached: true,
                parent,
                surface,
            },
        );
        id
    }

    pub fn add_text_input(&mut self, value: &str) -> ElementId {
        self.insert(
            NodeInfo::new("input").with_attr("type", "text"),
            Surface::Field {
                value: value.to_string(),
            },
            None,
        )
    }

    pub fn add_textarea(&mut self, value: &str) -> ElementId {
        self.insert(
            NodeInfo::new("textarea"),
            Surface::Field {
                value: value.to_string(),
            },
            None,
        )
    }

    pub fn add_content_editable(&mut self, text: &str) -> ElementId {
        self.insert(
            NodeInfo::new("div").content_editable(),
            Surface::Text {
                text: text.to_string(),
            },
            None,
        )
    }

    /// Adds a `role="textbox"` widget whose text only changes through the given signals.
    pub fn add_rich_text_widget(&mut self, text: &str, honours: WidgetHonours) -> ElementId {
        self.add_widget_with(NodeInfo::new("div").with_attr("role", "textbox"), text, honours)
    }

    /// Adds a ProseMirror-style widget that renders each line as its own paragraph.
    pub fn add_paragraph_widget(&mut self, text: &str, honours: WidgetHonours) -> ElementId {
        let info = NodeInfo::new("div")
            .with_attr("role", "textbox")
            .with_class("ProseMirror");
        self.insert(
            info,
            Surface::Widget {
                model: text.to_string(),
                honours,
                paragraphs: true,
            },
            None,
        )
    }

    pub fn add_widget_with(
        &mut self,
        info: NodeInfo,
        text: &str,
        honours: WidgetHonours,
    ) -> ElementId {
        self.insert(
            info,
            Surface::Widget {
                model: text.to_string(),
                honours,
                paragraphs: false,
            },
            None,
        )
    }

    /// Adds a node that carries no text, e.g. a button or a plain `div`.
    pub fn add_element(&mut self, info: NodeInfo) -> ElementId {
        self.insert(info, Surface::Inert, None)
    }

    /// Registers the root of one of the overlay's own UI parts.
    pub fn add_overlay_part(&mut self, part: OverlayPart) -> ElementId {
        let id = self.insert(NodeInfo::new("div"), Surface::Inert, None);
        match part {
            OverlayPart::Trigger => self.trigger = Some(id),
            OverlayPart::Panel => self.panel = Some(id),
        }
        id
    }

    /// Adds a text field inside the overlay panel (the panel's own content box, for instance).
    pub fn add_panel_textarea(&mut self, panel: ElementId) -> ElementId {
        self.insert(
            NodeInfo::new("textarea").in_overlay_panel(),
            Surface::Field {
                value: String::new(),
            },
            Some(panel),
        )
    }

    pub fn detach(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attached = false;
        }
        if self.active == Some(id) {
            self.active = None;
        }
        if self.selection == Some(id) {
            self.selection = None;
        }
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.rect = rect;
        }
    }

    /// Moves focus without going through the overlay, as page scripts do.
    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn events_for(&self, id: ElementId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|recorded| recorded.target == id)
            .map(|recorded| recorded.event.clone())
            .collect()
    }

    pub fn event_types(&self, id: ElementId) -> Vec<String> {
        self.events_for(id)
            .iter()
            .map(|event| event.event_type().to_string())
            .collect()
    }

    pub fn count_events(&self, id: ElementId, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|recorded| recorded.target == id && recorded.event.event_type() == event_type)
            .count()
    }

    fn attached_node(&self, id: ElementId) -> Result<&HeadlessNode, DomError> {
        self.nodes
            .get(&id)
            .filter(|node| node.attached)
            .ok_or(DomError::Detached(id))
    }

    fn attached_node_mut(&mut self, id: ElementId) -> Result<&mut HeadlessNode, DomError> {
        self.nodes
            .get_mut(&id)
            .filter(|node| node.attached)
            .ok_or(DomError::Detached(id))
    }

    fn is_within(&self, root: Option<ElementId>, id: ElementId) -> bool {
        let Some(root) = root else {
            return false;
        };
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == root {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        false
    }
}

impl HostDocument for HeadlessDocument {
    fn node(&self, id: ElementId) -> Option<NodeInfo> {
        self.attached_node(id).ok().map(|node| node.info.clone())
    }

    fn is_attached(&self, id: ElementId) -> bool {
        self.attached_node(id).is_ok()
    }

    fn bounding_rect(&self, id: ElementId) -> Result<Rect, DomError> {
        Ok(self.attached_node(id)?.rect)
    }

    fn active_element(&self) -> Option<ElementId> {
        self.active.filter(|id| self.is_attached(*id))
    }

    fn overlay_contains(&self, part: OverlayPart, id: ElementId) -> bool {
        match part {
            OverlayPart::Trigger => self.is_within(self.trigger, id),
            OverlayPart::Panel => self.is_within(self.panel, id),
        }
    }

    fn focus(&mut self, id: ElementId) -> Result<(), DomError> {
        self.attached_node(id)?;
        if self.active != Some(id) {
            self.selection = None;
        }
        self.active = Some(id);
        Ok(())
    }

    fn value(&self, id: ElementId) -> Result<String, DomError> {
        match &self.attached_node(id)?.surface {
            Surface::Field { value } => Ok(value.clone()),
            _ => Err(DomError::Unsupported(id, "value")),
        }
    }

    fn set_value(&mut self, id: ElementId, new_value: &str) -> Result<(), DomError> {
        match &mut self.attached_node_mut(id)?.surface {
            Surface::Field { value } => {
                *value = new_value.to_string();
                Ok(())
            }
            _ => Err(DomError::Unsupported(id, "value")),
        }
    }

    fn text_content(&self, id: ElementId) -> Result<String, DomError> {
        match &self.attached_node(id)?.surface {
            // Like the DOM, a text field's value is not part of its text content.
            Surface::Field { .. } | Surface::Inert => Ok(String::new()),
            Surface::Widget {
                model,
                paragraphs: true,
                ..
            } => Ok(model.replace('\n', "")),
            surface => Ok(surface.text().to_string()),
        }
    }

    fn set_text_content(&mut self, id: ElementId, new_text: &str) -> Result<(), DomError> {
        match &mut self.attached_node_mut(id)?.surface {
            Surface::Text { text } => *text = new_text.to_string(),
            Surface::Widget { model, .. } => *model = new_text.to_string(),
            Surface::Field { .. } | Surface::Inert => {
                return Err(DomError::Unsupported(id, "text content"));
            }
        }
        Ok(())
    }

    fn select_all(&mut self, id: ElementId) -> Result<(), DomError> {
        self.attached_node(id)?;
        self.selection = Some(id);
        Ok(())
    }

    fn selection_text(&self) -> String {
        self.selection
            .and_then(|id| self.attached_node(id).ok())
            .map(|node| node.surface.text().to_string())
            .unwrap_or_default()
    }

    fn insert_text(&mut self, inserted: &str) -> bool {
        let Some(id) = self.active_element() else {
            return false;
        };
        let replace_all = self.selection == Some(id);
        let Ok(node) = self.attached_node_mut(id) else {
            return false;
        };
        let target = match &mut node.surface {
            Surface::Field { value } => value,
            Surface::Text { text } => text,
            Surface::Widget { model, honours, .. } if honours.insert_text_command => model,
            Surface::Widget { .. } | Surface::Inert => return false,
        };
        if replace_all {
            target.clear();
        }
        target.push_str(inserted);
        self.selection = None;
        true
    }

    fn dispatch(&mut self, id: ElementId, event: DomEvent) -> Result<(), DomError> {
        let node = self.attached_node_mut(id)?;
        if let (Surface::Widget { model, honours, .. }, DomEvent::BeforeInput(intent)) =
            (&mut node.surface, &event)
            && honours.before_input
        {
            match intent {
                InputIntent::DeleteContent => model.clear(),
                InputIntent::InsertText(text) => model.push_str(text),
            }
        }
        self.events.push(RecordedEvent { target: id, event });
        Ok(())
    }
}
