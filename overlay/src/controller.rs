//! The overlay state machine.
//!
//! One controller instance owns the focus state, the trigger and the panel model. Handlers receive
//! the host document explicitly; nothing here is global. Every transition re-checks the current
//! state first, so duplicate or stale deliveries of the same user action are rejected instead of
//! acting twice.

use texty_protocol::BridgeRequest;
use texty_protocol::CorrectionRequest;
use texty_protocol::CorrectionResult;
use texty_protocol::Settings;
use texty_protocol::SettingsField;
use texty_protocol::correction::error_message;
use thiserror::Error;

use crate::classify::Classifier;
use crate::dom::DomError;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::focus_tracker::BlurToken;
use crate::focus_tracker::FocusTracker;
use crate::focus_tracker::Target;
use crate::focus_tracker::TriggerState;
use crate::inject::WriteMethod;
use crate::inject::strategy_for;
use crate::panel::PanelField;
use crate::panel::PanelView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusState {
    NoTarget,
    TargetAcquired(Target),
    /// The panel is open for `target`; `snapshot` is the content read at open time.
    PanelOpen { target: Target, snapshot: String },
    Fixing {
        target: Target,
        snapshot: String,
        prompt: String,
        generation: RequestGeneration,
    },
}

impl FocusState {
    pub fn name(&self) -> &'static str {
        match self {
            FocusState::NoTarget => "NoTarget",
            FocusState::TargetAcquired(_) => "TargetAcquired",
            FocusState::PanelOpen { .. } => "PanelOpen",
            FocusState::Fixing { .. } => "Fixing",
        }
    }

    /// Element captured when the panel opened.
    pub fn captured_target(&self) -> Option<Target> {
        match self {
            FocusState::PanelOpen { target, .. } | FocusState::Fixing { target, .. } => {
                Some(*target)
            }
            FocusState::NoTarget | FocusState::TargetAcquired(_) => None,
        }
    }
}

/// Identifies one Fix request. A completion is only accepted while its generation is the one in
/// flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestGeneration(pub u64);

/// A correction the caller must send to the completion bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCorrection {
    pub generation: RequestGeneration,
    pub settings: Settings,
    pub request: CorrectionRequest,
}

impl PendingCorrection {
    pub fn bridge_request(&self) -> BridgeRequest {
        BridgeRequest::make_api_call(&self.settings, &self.request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    ClickOutside,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Written(WriteMethod),
    /// The target left the document; nothing was written.
    TargetDetached,
}

/// Result of editing a panel field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Updated,
    /// A settings field changed; the caller persists the whole value.
    SettingsChanged(Settings),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("`{action}` is not a valid action in state {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("settings are incomplete (missing: {})", format_fields(.0))]
    InvalidSettings(Vec<SettingsField>),

    #[error("panel inputs are disabled while a fix is in flight")]
    InputsDisabled,

    #[error("target {0} is no longer attached to the document")]
    DetachedTarget(ElementId),

    #[error(transparent)]
    Dom(#[from] DomError),
}

fn format_fields(fields: &[SettingsField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct OverlayController {
    state: FocusState,
    tracker: FocusTracker,
    classifier: Classifier,
    panel: PanelView,
    last_generation: u64,
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

impl OverlayController {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            state: FocusState::NoTarget,
            tracker: FocusTracker::new(),
            classifier,
            panel: PanelView::default(),
            last_generation: 0,
        }
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn panel(&self) -> &PanelView {
        &self.panel
    }

    pub fn trigger(&self) -> TriggerState {
        self.tracker.trigger()
    }

    fn invalid(&self, action: &'static str) -> OverlayError {
        OverlayError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: FocusState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "overlay transition");
        self.state = next;
    }

    /// Focus entered `element` anywhere in the document.
    ///
    /// While the panel is open the captured target is kept, whatever gains focus.
    pub fn focus_in<D: HostDocument + ?Sized>(
        &mut self,
        doc: &D,
        element: ElementId,
    ) -> Option<Target> {
        if let Some(captured) = self.state.captured_target() {
            if captured.element != element {
                tracing::debug!(
                    element = %element,
                    captured = %captured.element,
                    "focus moved while panel open; keeping captured target"
                );
            }
            return None;
        }

        let target = self.tracker.on_focus_in(doc, &self.classifier, element)?;
        self.transition(FocusState::TargetAcquired(target));
        Some(target)
    }

    /// Focus left some element. The caller must deliver the returned token to
    /// [`OverlayController::blur_deadline`] after [`crate::BLUR_DEBOUNCE`].
    pub fn focus_out(&mut self) -> BlurToken {
        self.tracker.on_focus_out()
    }

    /// Returns whether the trigger was hidden.
    pub fn blur_deadline<D: HostDocument + ?Sized>(&mut self, doc: &D, token: BlurToken) -> bool {
        let hidden = self.tracker.on_blur_deadline(doc, token);
        if hidden && matches!(self.state, FocusState::TargetAcquired(_)) {
            self.tracker.clear_target();
            self.transition(FocusState::NoTarget);
        }
        hidden
    }

    pub fn viewport_changed<D: HostDocument + ?Sized>(&mut self, doc: &D) {
        self.tracker.on_viewport_changed(doc);
    }

    /// Opens the panel for the current target, snapshotting its content.
    ///
    /// `settings` is the freshly loaded settings value; when it is incomplete the settings section
    /// is forced open and Fix/Apply stay disabled.
    pub fn activate_trigger<D: HostDocument>(
        &mut self,
        doc: &mut D,
        settings: Settings,
    ) -> Result<(), OverlayError> {
        let FocusState::TargetAcquired(target) = self.state else {
            return Err(self.invalid("activate trigger"));
        };
        if !self.tracker.trigger().enabled {
            return Err(self.invalid("activate trigger"));
        }

        let snapshot = match strategy_for(target.kind).read(doc, target.element) {
            Ok(snapshot) => snapshot,
            Err(DomError::Detached(element)) => {
                tracing::warn!(element = %element, "trigger activated for a detached target");
                self.tracker.clear_target();
                self.transition(FocusState::NoTarget);
                return Err(OverlayError::DetachedTarget(element));
            }
            Err(err) => return Err(err.into()),
        };

        self.panel.visible = true;
        self.panel.content = snapshot.clone();
        self.panel.settings = settings;
        self.panel.error = None;
        self.panel.set_busy(false);
        self.tracker.set_trigger_enabled(false);
        self.transition(FocusState::PanelOpen { target, snapshot });
        Ok(())
    }

    pub fn toggle_settings(&mut self) -> Result<(), OverlayError> {
        if self.state.captured_target().is_none() {
            return Err(self.invalid("toggle settings"));
        }
        self.panel.settings_expanded = !self.panel.settings_expanded;
        self.panel.revalidate();
        Ok(())
    }

    /// Records a user edit of one panel field.
    pub fn edit_field(
        &mut self,
        field: PanelField,
        value: impl Into<String>,
    ) -> Result<FieldEdit, OverlayError> {
        match self.state {
            FocusState::PanelOpen { .. } => {}
            FocusState::Fixing { .. } => return Err(OverlayError::InputsDisabled),
            FocusState::NoTarget | FocusState::TargetAcquired(_) => {
                return Err(self.invalid("edit field"));
            }
        }

        let value = value.into();
        match field {
            PanelField::Content => self.panel.content = value,
            PanelField::Prompt => self.panel.prompt = value,
            PanelField::Setting(setting) => {
                self.panel.settings.set(setting, value);
                self.panel.revalidate();
                return Ok(FieldEdit::SettingsChanged(self.panel.settings.clone()));
            }
        }
        Ok(FieldEdit::Updated)
    }

    /// Starts a Fix: disables the panel and returns the request to send.
    pub fn request_fix(&mut self) -> Result<PendingCorrection, OverlayError> {
        let FocusState::PanelOpen { target, snapshot } = &self.state else {
            return Err(self.invalid("fix"));
        };
        if !self.panel.fix_enabled {
            return Err(OverlayError::InvalidSettings(
                self.panel.settings.missing_fields(),
            ));
        }
        let (target, snapshot) = (*target, snapshot.clone());

        self.last_generation += 1;
        let generation = RequestGeneration(self.last_generation);
        let request = CorrectionRequest::new(self.panel.prompt.clone(), self.panel.content.clone());

        self.panel.error = None;
        self.panel.set_busy(true);
        self.transition(FocusState::Fixing {
            target,
            snapshot,
            prompt: request.system_prompt.clone(),
            generation,
        });

        Ok(PendingCorrection {
            generation,
            settings: self.panel.settings.clone(),
            request,
        })
    }

    /// Delivers a completion. Returns `false` when the result belongs to a request that is no
    /// longer in flight (panel closed or reopened since), in which case it is dropped.
    pub fn finish_correction(
        &mut self,
        generation: RequestGeneration,
        result: CorrectionResult,
    ) -> bool {
        let FocusState::Fixing {
            target,
            snapshot,
            generation: in_flight,
            ..
        } = &self.state
        else {
            tracing::debug!(?generation, "discarding completion: no fix in flight");
            return false;
        };
        if *in_flight != generation {
            tracing::debug!(?generation, ?in_flight, "discarding stale completion");
            return false;
        }
        let next = FocusState::PanelOpen {
            target: *target,
            snapshot: snapshot.clone(),
        };

        match result {
            CorrectionResult::Success { text } => self.panel.content = text,
            CorrectionResult::Failure { reason } => {
                tracing::warn!("correction failed: {reason}");
                self.panel.error = Some(error_message(&reason));
            }
        }
        self.panel.set_busy(false);
        self.transition(next);
        true
    }

    /// Writes the panel content back into the captured target and closes the panel.
    pub fn apply<D: HostDocument>(&mut self, doc: &mut D) -> Result<ApplyOutcome, OverlayError> {
        let FocusState::PanelOpen { target, .. } = self.state else {
            return Err(self.invalid("apply"));
        };
        if !self.panel.apply_enabled {
            return Err(OverlayError::InvalidSettings(
                self.panel.settings.missing_fields(),
            ));
        }

        let text = self.panel.content.clone();
        match strategy_for(target.kind).write(doc, target.element, &text) {
            Ok(method) => {
                tracing::info!(element = %target.element, kind = %target.kind, %method, "applied correction");
                self.close_panel(doc, true);
                Ok(ApplyOutcome::Written(method))
            }
            Err(DomError::Detached(element)) => {
                tracing::warn!(element = %element, "apply skipped: target detached");
                self.close_panel(doc, false);
                Ok(ApplyOutcome::TargetDetached)
            }
            Err(err) => {
                self.panel.error = Some(error_message(&err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Closes the panel without writing back. Valid while fixing: the in-flight result is then
    /// discarded when it arrives.
    pub fn close<D: HostDocument>(&mut self, doc: &mut D) -> Result<(), OverlayError> {
        if self.state.captured_target().is_none() {
            return Err(self.invalid("close"));
        }
        self.close_panel(doc, true);
        Ok(())
    }

    pub fn dismiss<D: HostDocument>(
        &mut self,
        doc: &mut D,
        reason: DismissReason,
    ) -> Result<(), OverlayError> {
        if self.state.captured_target().is_none() {
            return Err(self.invalid("dismiss"));
        }
        tracing::debug!(?reason, "panel dismissed");
        self.close_panel(doc, true);
        Ok(())
    }

    fn close_panel<D: HostDocument>(&mut self, doc: &mut D, refocus: bool) {
        let target = self.state.captured_target();
        self.panel.hide();
        self.tracker.set_trigger_enabled(true);
        self.tracker.clear_target();
        self.transition(FocusState::NoTarget);

        let Some(target) = target else {
            return;
        };
        if refocus
            && doc.is_attached(target.element)
            && let Err(err) = doc.focus(target.element)
        {
            tracing::debug!("could not return focus to target: {err}");
        }
    }
}
