//! Event loop driving an [`OverlayController`] from host notifications.
//!
//! Hosts push [`OverlayEvent`]s through an [`OverlayEventSender`]; timers and bridge replies come
//! back through the same channel, so every state change happens on the loop task in arrival order.
//! Failures are logged and never escape the loop.

use std::sync::Arc;

use texty_protocol::CorrectionResult;
use texty_protocol::Settings;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

use crate::bridge::CompletionBridge;
use crate::classify::Classifier;
use crate::controller::DismissReason;
use crate::controller::FieldEdit;
use crate::controller::OverlayController;
use crate::controller::OverlayError;
use crate::controller::RequestGeneration;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::focus_tracker::BLUR_DEBOUNCE;
use crate::focus_tracker::BlurToken;
use crate::panel::PanelControl;
use crate::panel::PanelField;
use crate::settings_store::SettingsStore;

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    FocusIn(ElementId),
    FocusOut,
    /// Scroll or resize.
    ViewportChanged,
    TriggerActivated,
    FieldEdited { field: PanelField, value: String },
    ControlActivated(PanelControl),
    Dismissed(DismissReason),
    BlurDeadline(BlurToken),
    CorrectionFinished {
        generation: RequestGeneration,
        result: CorrectionResult,
    },
    Shutdown,
}

pub type OverlayEventSender = UnboundedSender<OverlayEvent>;

pub struct OverlayRuntime<D, S, B> {
    controller: OverlayController,
    document: D,
    store: S,
    bridge: Arc<B>,
    event_tx: OverlayEventSender,
    event_rx: UnboundedReceiver<OverlayEvent>,
}

impl<D, S, B> OverlayRuntime<D, S, B>
where
    D: HostDocument,
    S: SettingsStore,
    B: CompletionBridge,
{
    pub fn new(document: D, store: S, bridge: B) -> Self {
        Self::with_classifier(document, store, bridge, Classifier::default())
    }

    pub fn with_classifier(document: D, store: S, bridge: B, classifier: Classifier) -> Self {
        let (event_tx, event_rx) = unbounded_channel();
        Self {
            controller: OverlayController::new(classifier),
            document,
            store,
            bridge: Arc::new(bridge),
            event_tx,
            event_rx,
        }
    }

    pub fn sender(&self) -> OverlayEventSender {
        self.event_tx.clone()
    }

    pub fn controller(&self) -> &OverlayController {
        &self.controller
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Processes events until [`OverlayEvent::Shutdown`] arrives.
    pub async fn run(mut self) {
        while let Some(event) = self.event_rx.recv().await {
            if matches!(event, OverlayEvent::Shutdown) {
                tracing::debug!("overlay runtime shutting down");
                break;
            }
            self.handle_event(event).await;
        }
    }

    /// Waits for the next queued event, including timer and bridge callbacks.
    pub async fn next_event(&mut self) -> Option<OverlayEvent> {
        self.event_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::FocusIn(element) => {
                self.controller.focus_in(&self.document, element);
            }
            OverlayEvent::FocusOut => {
                let token = self.controller.focus_out();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(BLUR_DEBOUNCE).await;
                    let _ = tx.send(OverlayEvent::BlurDeadline(token));
                });
            }
            OverlayEvent::BlurDeadline(token) => {
                self.controller.blur_deadline(&self.document, token);
            }
            OverlayEvent::ViewportChanged => self.controller.viewport_changed(&self.document),
            OverlayEvent::TriggerActivated => self.open_panel().await,
            OverlayEvent::FieldEdited { field, value } => self.edit_field(field, value).await,
            OverlayEvent::ControlActivated(control) => self.activate_control(control),
            OverlayEvent::Dismissed(reason) => {
                if let Err(err) = self.controller.dismiss(&mut self.document, reason) {
                    tracing::debug!("dismiss ignored: {err}");
                }
            }
            OverlayEvent::CorrectionFinished { generation, result } => {
                self.controller.finish_correction(generation, result);
            }
            OverlayEvent::Shutdown => {}
        }
    }

    async fn open_panel(&mut self) {
        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("failed to load settings, using defaults: {err}");
                Settings::default()
            }
        };
        if let Err(err) = self.controller.activate_trigger(&mut self.document, settings) {
            tracing::debug!("trigger activation ignored: {err}");
        }
    }

    async fn edit_field(&mut self, field: PanelField, value: String) {
        match self.controller.edit_field(field, value) {
            Ok(FieldEdit::SettingsChanged(settings)) => {
                if let Err(err) = self.store.save(&settings).await {
                    tracing::warn!("failed to save settings: {err}");
                }
            }
            Ok(FieldEdit::Updated) => {}
            Err(err) => tracing::debug!("field edit ignored: {err}"),
        }
    }

    fn activate_control(&mut self, control: PanelControl) {
        let outcome = match control {
            PanelControl::Fix => self.start_fix(),
            PanelControl::Apply => self.controller.apply(&mut self.document).map(|_| ()),
            PanelControl::Close => self.controller.close(&mut self.document),
            PanelControl::SettingsToggle => self.controller.toggle_settings(),
        };
        if let Err(err) = outcome {
            tracing::debug!(?control, "panel control ignored: {err}");
        }
    }

    fn start_fix(&mut self) -> Result<(), OverlayError> {
        let pending = self.controller.request_fix()?;
        let request = pending.bridge_request();
        let generation = pending.generation;
        let bridge = Arc::clone(&self.bridge);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = bridge.complete(request).await;
            let _ = tx.send(OverlayEvent::CorrectionFinished { generation, result });
        });
        Ok(())
    }
}
