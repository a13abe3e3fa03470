//! Per-surface read/write strategies.
//!
//! Plain fields and content-editable regions re-derive their state from the DOM, so a direct
//! assignment followed by `input`/`change` notifications is enough. Rich-text widgets keep a model
//! of their own and only update it from the editing-intent events they listen for; for those the
//! write is a fixed sequence of signals followed by a direct replacement as a last resort.

use strum_macros::Display;

use crate::classify::EditableKind;
use crate::dom::DomError;
use crate::dom::DomEvent;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::dom::InputIntent;

/// How a write reached the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WriteMethod {
    /// Value or text content assigned directly.
    Direct,
    /// The widget accepted the editing-intent sequence.
    EditingIntents,
    /// The widget ignored every signal; its text content was replaced directly.
    DirectFallback,
}

pub trait InjectionStrategy: Sync {
    fn read(&self, doc: &mut dyn HostDocument, id: ElementId) -> Result<String, DomError>;

    /// Writes `text` into the element. A detached element yields [`DomError::Detached`] before
    /// anything is touched.
    fn write(
        &self,
        doc: &mut dyn HostDocument,
        id: ElementId,
        text: &str,
    ) -> Result<WriteMethod, DomError>;
}

pub fn strategy_for(kind: EditableKind) -> &'static dyn InjectionStrategy {
    match kind {
        EditableKind::PlainInput => &PlainInputStrategy,
        EditableKind::ContentEditable => &ContentEditableStrategy,
        EditableKind::RichTextWidget => &RichTextStrategy,
    }
}

fn ensure_attached(doc: &dyn HostDocument, id: ElementId) -> Result<(), DomError> {
    if doc.is_attached(id) {
        Ok(())
    } else {
        Err(DomError::Detached(id))
    }
}

fn notify_changed(doc: &mut dyn HostDocument, id: ElementId) -> Result<(), DomError> {
    doc.dispatch(id, DomEvent::Input)?;
    doc.dispatch(id, DomEvent::Change)
}

pub struct PlainInputStrategy;

impl InjectionStrategy for PlainInputStrategy {
    fn read(&self, doc: &mut dyn HostDocument, id: ElementId) -> Result<String, DomError> {
        ensure_attached(doc, id)?;
        doc.value(id)
    }

    fn write(
        &self,
        doc: &mut dyn HostDocument,
        id: ElementId,
        text: &str,
    ) -> Result<WriteMethod, DomError> {
        ensure_attached(doc, id)?;
        doc.set_value(id, text)?;
        notify_changed(doc, id)?;
        Ok(WriteMethod::Direct)
    }
}

pub struct ContentEditableStrategy;

impl InjectionStrategy for ContentEditableStrategy {
    fn read(&self, doc: &mut dyn HostDocument, id: ElementId) -> Result<String, DomError> {
        ensure_attached(doc, id)?;
        doc.text_content(id)
    }

    fn write(
        &self,
        doc: &mut dyn HostDocument,
        id: ElementId,
        text: &str,
    ) -> Result<WriteMethod, DomError> {
        ensure_attached(doc, id)?;
        doc.set_text_content(id, text)?;
        notify_changed(doc, id)?;
        Ok(WriteMethod::Direct)
    }
}

/// Best-effort strategy for editors that keep their own document model.
///
/// Every signal is sent regardless of which ones the widget reacts to; no widget-specific
/// branching happens here.
pub struct RichTextStrategy;

impl InjectionStrategy for RichTextStrategy {
    fn read(&self, doc: &mut dyn HostDocument, id: ElementId) -> Result<String, DomError> {
        ensure_attached(doc, id)?;
        doc.focus(id)?;
        doc.select_all(id)?;
        Ok(doc.selection_text())
    }

    fn write(
        &self,
        doc: &mut dyn HostDocument,
        id: ElementId,
        text: &str,
    ) -> Result<WriteMethod, DomError> {
        ensure_attached(doc, id)?;

        doc.focus(id)?;
        doc.select_all(id)?;
        doc.dispatch(id, DomEvent::BeforeInput(InputIntent::DeleteContent))?;
        doc.dispatch(
            id,
            DomEvent::BeforeInput(InputIntent::InsertText(text.to_string())),
        )?;

        // Listeners may have moved the caret; the insertion must replace everything.
        doc.select_all(id)?;
        let honoured = doc.insert_text(text);
        doc.dispatch(id, DomEvent::Input)?;

        if same_visible_text(&doc.text_content(id)?, text) {
            return Ok(WriteMethod::EditingIntents);
        }

        tracing::debug!(
            element = %id,
            insert_text_honoured = honoured,
            "rich-text widget ignored editing intents; replacing text content directly"
        );
        doc.set_text_content(id, text)?;
        doc.dispatch(id, DomEvent::Input)?;
        Ok(WriteMethod::DirectFallback)
    }
}

/// Widgets render line breaks as block elements, which `textContent` drops, so whitespace is
/// ignored when checking whether a write landed.
fn same_visible_text(rendered: &str, expected: &str) -> bool {
    let visible = |text: &str| text.chars().filter(|ch| !ch.is_whitespace()).collect::<String>();
    visible(rendered) == visible(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDocument;
    use crate::headless::WidgetHonours;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_input_round_trip_is_idempotent() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_text_input("teh cat sat");
        let strategy = strategy_for(EditableKind::PlainInput);

        let original = strategy.read(&mut doc, field).expect("read");
        strategy.write(&mut doc, field, &original).expect("write");
        assert_eq!(strategy.read(&mut doc, field).expect("read"), "teh cat sat");
    }

    #[test]
    fn plain_input_write_fires_input_then_change_once() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("old");

        let method = strategy_for(EditableKind::PlainInput)
            .write(&mut doc, field, "new")
            .expect("write");

        assert_eq!(method, WriteMethod::Direct);
        assert_eq!(doc.value(field).expect("value"), "new");
        assert_eq!(
            doc.event_types(field),
            vec!["input".to_string(), "change".to_string()]
        );
    }

    #[test]
    fn content_editable_round_trip_is_idempotent() {
        let mut doc = HeadlessDocument::new();
        let region = doc.add_content_editable("Hello wrld");
        let strategy = strategy_for(EditableKind::ContentEditable);

        let original = strategy.read(&mut doc, region).expect("read");
        strategy.write(&mut doc, region, &original).expect("write");
        assert_eq!(strategy.read(&mut doc, region).expect("read"), "Hello wrld");
        assert_eq!(doc.count_events(region, "input"), 1);
        assert_eq!(doc.count_events(region, "change"), 1);
    }

    #[test]
    fn rich_text_read_focuses_and_selects() {
        let mut doc = HeadlessDocument::new();
        let widget = doc.add_rich_text_widget("draft text", WidgetHonours::all());

        let text = strategy_for(EditableKind::RichTextWidget)
            .read(&mut doc, widget)
            .expect("read");

        assert_eq!(text, "draft text");
        assert_eq!(doc.active_element(), Some(widget));
    }

    #[test]
    fn rich_text_write_dispatches_the_full_sequence() {
        let mut doc = HeadlessDocument::new();
        let widget = doc.add_rich_text_widget("old", WidgetHonours::all());

        let method = strategy_for(EditableKind::RichTextWidget)
            .write(&mut doc, widget, "new text")
            .expect("write");

        assert_eq!(method, WriteMethod::EditingIntents);
        assert_eq!(
            doc.events_for(widget),
            vec![
                DomEvent::BeforeInput(InputIntent::DeleteContent),
                DomEvent::BeforeInput(InputIntent::InsertText("new text".to_string())),
                DomEvent::Input,
            ]
        );
        assert_eq!(doc.text_content(widget).expect("text"), "new text");
    }

    #[test]
    fn rich_text_write_lands_whichever_signal_the_widget_honours() {
        let cases = [
            WidgetHonours::before_input_only(),
            WidgetHonours::insert_text_only(),
            WidgetHonours::all(),
        ];
        for honours in cases {
            let mut doc = HeadlessDocument::new();
            let widget = doc.add_rich_text_widget("old", honours);
            let strategy = strategy_for(EditableKind::RichTextWidget);

            let method = strategy.write(&mut doc, widget, "X").expect("write");
            assert_eq!(method, WriteMethod::EditingIntents, "{honours:?}");
            assert_eq!(strategy.read(&mut doc, widget).expect("read"), "X");
        }
    }

    #[test]
    fn multi_line_write_into_a_paragraph_widget_is_not_overwritten() {
        let mut doc = HeadlessDocument::new();
        let widget = doc.add_paragraph_widget("old", WidgetHonours::all());
        let strategy = strategy_for(EditableKind::RichTextWidget);

        let method = strategy.write(&mut doc, widget, "a\nb").expect("write");

        assert_eq!(method, WriteMethod::EditingIntents);
        assert_eq!(doc.text_content(widget).expect("text"), "ab");
        assert_eq!(strategy.read(&mut doc, widget).expect("read"), "a\nb");
        assert_eq!(doc.count_events(widget, "input"), 1);
    }

    #[test]
    fn paragraph_widget_that_ignores_signals_still_gets_the_fallback() {
        let mut doc = HeadlessDocument::new();
        let widget = doc.add_paragraph_widget("old", WidgetHonours::none());

        let method = strategy_for(EditableKind::RichTextWidget)
            .write(&mut doc, widget, "a\nb")
            .expect("write");

        assert_eq!(method, WriteMethod::DirectFallback);
        assert_eq!(doc.count_events(widget, "input"), 2);
    }

    #[test]
    fn visible_text_comparison_ignores_only_whitespace() {
        assert!(same_visible_text("ab", "a\nb"));
        assert!(same_visible_text("a b\n", "a\n\nb"));
        assert!(!same_visible_text("ab", "a\nc"));
    }

    #[test]
    fn rich_text_write_falls_back_when_every_signal_is_ignored() {
        let mut doc = HeadlessDocument::new();
        let widget = doc.add_rich_text_widget("old", WidgetHonours::none());
        let strategy = strategy_for(EditableKind::RichTextWidget);

        let method = strategy.write(&mut doc, widget, "X").expect("write");

        assert_eq!(method, WriteMethod::DirectFallback);
        assert_eq!(strategy.read(&mut doc, widget).expect("read"), "X");
        assert_eq!(doc.count_events(widget, "input"), 2);
    }

    #[test]
    fn writes_to_detached_elements_touch_nothing() {
        for kind in [
            EditableKind::PlainInput,
            EditableKind::ContentEditable,
            EditableKind::RichTextWidget,
        ] {
            let mut doc = HeadlessDocument::new();
            let id = match kind {
                EditableKind::PlainInput => doc.add_text_input("keep"),
                EditableKind::ContentEditable => doc.add_content_editable("keep"),
                EditableKind::RichTextWidget => {
                    doc.add_rich_text_widget("keep", WidgetHonours::all())
                }
            };
            doc.detach(id);

            let err = strategy_for(kind)
                .write(&mut doc, id, "changed")
                .expect_err("detached write");
            assert_eq!(err, DomError::Detached(id));
            assert!(doc.events_for(id).is_empty());
        }
    }
}
