//! Tracks which editable surface the trigger belongs to and where the trigger sits.

use std::time::Duration;

use crate::classify::Classification;
use crate::classify::Classifier;
use crate::classify::EditableKind;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::dom::OverlayPart;
use crate::dom::Rect;

/// Horizontal gap between the target's right edge and the trigger.
pub const TRIGGER_OFFSET_PX: f64 = 5.0;

/// Grace period before a focus loss hides the trigger. Clicking the trigger itself moves focus
/// away from the target first.
pub const BLUR_DEBOUNCE: Duration = Duration::from_millis(300);

/// An editable surface the overlay may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub element: ElementId,
    pub kind: EditableKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerPlacement {
    pub top: f64,
    pub left: f64,
}

impl TriggerPlacement {
    pub fn beside(rect: Rect) -> Self {
        Self {
            top: rect.top,
            left: rect.right + TRIGGER_OFFSET_PX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerState {
    pub visible: bool,
    pub enabled: bool,
    pub placement: TriggerPlacement,
}

/// Identifies one pending blur check. Only the most recent token is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurToken(u64);

#[derive(Debug, Default)]
pub struct FocusTracker {
    target: Option<Target>,
    trigger: TriggerState,
    blur_generation: u64,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self {
            trigger: TriggerState {
                enabled: true,
                ..TriggerState::default()
            },
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn trigger(&self) -> TriggerState {
        self.trigger
    }

    /// Classifies the newly focused element and, when it is editable, makes it the target and
    /// reveals the trigger beside it. Returns the new target.
    pub fn on_focus_in<D: HostDocument + ?Sized>(
        &mut self,
        doc: &D,
        classifier: &Classifier,
        element: ElementId,
    ) -> Option<Target> {
        let Classification::Editable(kind) = classifier.classify_element(doc, element) else {
            tracing::trace!(element = %element, "focus on non-editable element ignored");
            return None;
        };

        let rect = match doc.bounding_rect(element) {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!("focused element vanished before placement: {err}");
                return None;
            }
        };

        let target = Target { element, kind };
        self.target = Some(target);
        self.trigger.visible = true;
        self.trigger.placement = TriggerPlacement::beside(rect);
        // A fresh focus supersedes any pending blur check.
        self.blur_generation += 1;
        Some(target)
    }

    /// Starts the blur debounce. The caller waits [`BLUR_DEBOUNCE`] and then calls
    /// [`FocusTracker::on_blur_deadline`] with the returned token.
    pub fn on_focus_out(&mut self) -> BlurToken {
        self.blur_generation += 1;
        BlurToken(self.blur_generation)
    }

    /// Hides the trigger unless focus settled on the panel, the trigger, or the target.
    /// Returns whether the trigger was hidden.
    pub fn on_blur_deadline<D: HostDocument + ?Sized>(&mut self, doc: &D, token: BlurToken) -> bool {
        if token.0 != self.blur_generation || !self.trigger.visible {
            return false;
        }

        let focus_retained = doc.active_element().is_some_and(|active| {
            doc.overlay_contains(OverlayPart::Panel, active)
                || doc.overlay_contains(OverlayPart::Trigger, active)
                || self.target.is_some_and(|target| target.element == active)
        });
        if focus_retained {
            return false;
        }

        self.trigger.visible = false;
        true
    }

    /// Re-applies the trigger position after a scroll or resize.
    pub fn on_viewport_changed<D: HostDocument + ?Sized>(&mut self, doc: &D) {
        let Some(target) = self.target else {
            return;
        };
        if !self.trigger.visible {
            return;
        }
        if let Ok(rect) = doc.bounding_rect(target.element) {
            self.trigger.placement = TriggerPlacement::beside(rect);
        }
    }

    pub fn set_trigger_enabled(&mut self, enabled: bool) {
        self.trigger.enabled = enabled;
    }

    /// Forgets the target, e.g. after it was found detached.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.trigger.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeInfo;
    use crate::headless::HeadlessDocument;
    use pretty_assertions::assert_eq;

    fn focus(
        tracker: &mut FocusTracker,
        doc: &mut HeadlessDocument,
        element: ElementId,
    ) -> Option<Target> {
        doc.focus(element).expect("focus");
        tracker.on_focus_in(&*doc, &Classifier::default(), element)
    }

    #[test]
    fn focusing_an_editable_places_trigger_beside_it() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("hello");
        doc.set_rect(field, Rect::new(100.0, 40.0, 300.0, 80.0));
        let mut tracker = FocusTracker::new();

        let target = focus(&mut tracker, &mut doc, field).expect("target");

        assert_eq!(target.kind, EditableKind::PlainInput);
        assert_eq!(
            tracker.trigger(),
            TriggerState {
                visible: true,
                enabled: true,
                placement: TriggerPlacement {
                    top: 100.0,
                    left: 345.0
                },
            }
        );
    }

    #[test]
    fn focusing_a_non_editable_keeps_previous_target() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("");
        let button = doc.add_element(NodeInfo::new("button"));
        let mut tracker = FocusTracker::new();

        focus(&mut tracker, &mut doc, field);
        assert_eq!(focus(&mut tracker, &mut doc, button), None);
        assert_eq!(tracker.target().map(|t| t.element), Some(field));
    }

    #[test]
    fn blur_deadline_hides_trigger_when_focus_left() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("");
        let mut tracker = FocusTracker::new();
        focus(&mut tracker, &mut doc, field);

        let token = tracker.on_focus_out();
        doc.blur();

        assert!(tracker.on_blur_deadline(&doc, token));
        assert!(!tracker.trigger().visible);
    }

    #[test]
    fn blur_deadline_tolerates_focus_on_trigger_or_panel() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("");
        let trigger = doc.add_overlay_part(OverlayPart::Trigger);
        let panel = doc.add_overlay_part(OverlayPart::Panel);
        let panel_field = doc.add_panel_textarea(panel);
        let mut tracker = FocusTracker::new();
        focus(&mut tracker, &mut doc, field);

        for holder in [trigger, panel_field, field] {
            let token = tracker.on_focus_out();
            doc.focus(holder).expect("focus");
            assert!(!tracker.on_blur_deadline(&doc, token));
            assert!(tracker.trigger().visible);
        }
    }

    #[test]
    fn refocus_invalidates_pending_blur() {
        let mut doc = HeadlessDocument::new();
        let first = doc.add_textarea("");
        let second = doc.add_textarea("");
        let mut tracker = FocusTracker::new();
        focus(&mut tracker, &mut doc, first);

        let stale = tracker.on_focus_out();
        focus(&mut tracker, &mut doc, second);
        doc.blur();

        assert!(!tracker.on_blur_deadline(&doc, stale));
        assert!(tracker.trigger().visible);
    }

    #[test]
    fn viewport_change_recomputes_position() {
        let mut doc = HeadlessDocument::new();
        let field = doc.add_textarea("");
        doc.set_rect(field, Rect::new(10.0, 10.0, 100.0, 20.0));
        let mut tracker = FocusTracker::new();
        focus(&mut tracker, &mut doc, field);

        doc.set_rect(field, Rect::new(-50.0, 10.0, 100.0, 20.0));
        tracker.on_viewport_changed(&doc);
        tracker.on_viewport_changed(&doc);

        assert_eq!(
            tracker.trigger().placement,
            TriggerPlacement {
                top: -50.0,
                left: 115.0
            }
        );
    }
}
