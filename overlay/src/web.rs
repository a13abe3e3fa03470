//! Browser host: binds the overlay to the live page through `web-sys`.
//!
//! The page owns every node. [`WebDocument`] keeps a registry from [`ElementId`] to DOM elements and
//! re-checks `isConnected` before each use. The trigger and the panel are mounted in their own
//! shadow roots so page styles cannot reach them.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use js_sys::Promise;
use js_sys::Reflect;
use serde::Serialize;
use serde::de::DeserializeOwned;
use texty_protocol::BridgeRequest;
use texty_protocol::BridgeResponse;
use texty_protocol::CorrectionResult;
use texty_protocol::Settings;
use texty_protocol::settings::SETTINGS_STORAGE_KEY;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_futures::spawn_local;
use web_sys::AddEventListenerOptions;
use web_sys::Document;
use web_sys::Element;
use web_sys::Event;
use web_sys::EventInit;
use web_sys::EventTarget;
use web_sys::HtmlButtonElement;
use web_sys::HtmlDocument;
use web_sys::HtmlElement;
use web_sys::HtmlInputElement;
use web_sys::HtmlTextAreaElement;
use web_sys::InputEvent;
use web_sys::InputEventInit;
use web_sys::KeyboardEvent;
use web_sys::ShadowRoot;
use web_sys::ShadowRootInit;
use web_sys::ShadowRootMode;

use crate::controller::DismissReason;
use crate::controller::FieldEdit;
use crate::controller::OverlayController;
use crate::dom::DomError;
use crate::dom::DomEvent;
use crate::dom::ElementId;
use crate::dom::HostDocument;
use crate::dom::NodeInfo;
use crate::dom::OverlayPart;
use crate::dom::Rect;
use crate::focus_tracker::BLUR_DEBOUNCE;
use crate::panel::BUSY_DOM_ID;
use crate::panel::ERROR_DOM_ID;
use crate::panel::PanelControl;
use crate::panel::PanelField;
use crate::panel::SETTINGS_SECTION_DOM_ID;
use crate::settings_store::SettingsError;
use crate::settings_store::SettingsStore;

const TRIGGER_HOST_ID: &str = "texty-trigger-host";
const PANEL_HOST_ID: &str = "texty-panel-host";
const TRIGGER_DOM_ID: &str = "texty-trigger";
const BACKDROP_DOM_ID: &str = "texty-backdrop";
const INVALID_CLASS: &str = "texty-invalid";

fn js_error(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn host_error(err: JsValue) -> DomError {
    DomError::Host(js_error(&err))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    let json = serde_json::to_string(value).map_err(|err| err.to_string())?;
    js_sys::JSON::parse(&json).map_err(|err| js_error(&err))
}

fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, String> {
    let json = js_sys::JSON::stringify(value)
        .map_err(|err| js_error(&err))?
        .as_string()
        .ok_or_else(|| "value is not JSON-serializable".to_string())?;
    serde_json::from_str(&json).map_err(|err| err.to_string())
}

/// Resolves a dotted path below the global object, e.g. `chrome.runtime`.
fn global_path(path: &[&str]) -> Result<JsValue, String> {
    let mut value: JsValue = js_sys::global().into();
    for key in path {
        value = Reflect::get(&value, &JsValue::from_str(key)).map_err(|err| js_error(&err))?;
        if value.is_undefined() || value.is_null() {
            return Err(format!("`{}` is unavailable", path.join(".")));
        }
    }
    Ok(value)
}

async fn call_method(this: &JsValue, name: &str, arg: &JsValue) -> Result<JsValue, String> {
    let method: Function = Reflect::get(this, &JsValue::from_str(name))
        .map_err(|err| js_error(&err))?
        .dyn_into()
        .map_err(|_| format!("`{name}` is not a function"))?;
    let returned = method.call1(this, arg).map_err(|err| js_error(&err))?;
    let promise: Promise = returned
        .dyn_into()
        .map_err(|_| format!("`{name}` did not return a promise"))?;
    JsFuture::from(promise).await.map_err(|err| js_error(&err))
}

/// Settings kept in `chrome.storage.local` under [`SETTINGS_STORAGE_KEY`].
struct ExtensionStorage;

impl SettingsStore for ExtensionStorage {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let local =
            global_path(&["chrome", "storage", "local"]).map_err(SettingsError::Unavailable)?;
        let stored = call_method(&local, "get", &JsValue::from_str(SETTINGS_STORAGE_KEY))
            .await
            .map_err(SettingsError::Unavailable)?;
        let value = Reflect::get(&stored, &JsValue::from_str(SETTINGS_STORAGE_KEY))
            .map_err(|err| SettingsError::Unavailable(js_error(&err)))?;
        if value.is_undefined() || value.is_null() {
            return Ok(Settings::default());
        }
        from_js(&value).map_err(SettingsError::Malformed)
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let local =
            global_path(&["chrome", "storage", "local"]).map_err(SettingsError::Unavailable)?;
        let items = js_sys::Object::new();
        let value = to_js(settings).map_err(SettingsError::Malformed)?;
        Reflect::set(&items, &JsValue::from_str(SETTINGS_STORAGE_KEY), &value)
            .map_err(|err| SettingsError::Unavailable(js_error(&err)))?;
        call_method(&local, "set", &items)
            .await
            .map_err(SettingsError::Unavailable)?;
        Ok(())
    }
}

/// Sends one `makeApiCall` message through `chrome.runtime.sendMessage` and maps the single reply.
///
/// The extension's background worker relays the message to the `texty bridge` native host.
async fn complete_via_extension(request: BridgeRequest) -> CorrectionResult {
    let response = async {
        let runtime = global_path(&["chrome", "runtime"])?;
        let reply = call_method(&runtime, "sendMessage", &to_js(&request)?).await?;
        if reply.is_undefined() {
            return Err("completion bridge returned no reply".to_string());
        }
        from_js::<BridgeResponse>(&reply)
    }
    .await;

    match response {
        Ok(response) => response.into_correction_result(),
        Err(err) => {
            tracing::error!("completion bridge failed: {err}");
            CorrectionResult::failure(err)
        }
    }
}

pub struct WebDocument {
    document: Document,
    registry: RefCell<Vec<(ElementId, Element)>>,
    next_id: Cell<u64>,
    trigger_host: Element,
    panel_host: Element,
}

impl WebDocument {
    fn register(&self, element: Element) -> ElementId {
        let mut registry = self.registry.borrow_mut();
        // Drop handles whose node left the document; their ids are never reused.
        registry.retain(|(_, known)| known.is_connected());
        if let Some((id, _)) = registry.iter().find(|(_, known)| *known == element) {
            return *id;
        }
        let id = ElementId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        registry.push((id, element));
        id
    }

    fn element(&self, id: ElementId) -> Result<Element, DomError> {
        self.registry
            .borrow()
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, element)| element.clone())
            .filter(Element::is_connected)
            .ok_or(DomError::Detached(id))
    }
}

impl HostDocument for WebDocument {
    fn node(&self, id: ElementId) -> Option<NodeInfo> {
        let element = self.element(id).ok()?;
        let mut info = NodeInfo::new(element.tag_name());
        info.content_editable = element
            .dyn_ref::<HtmlElement>()
            .is_some_and(HtmlElement::is_content_editable);
        info.in_overlay_panel = self.panel_host.contains(Some(element.as_ref()));

        let classes = element.class_list();
        info.classes = (0..classes.length())
            .filter_map(|index| classes.item(index))
            .collect();
        for name in element.get_attribute_names().iter() {
            if let Some(name) = name.as_string()
                && let Some(value) = element.get_attribute(&name)
            {
                info.attributes.insert(name, value);
            }
        }
        // The reflected property, so a missing or invalid attribute reads as "text".
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            info.attributes.insert("type".to_string(), input.type_());
        }
        Some(info)
    }

    fn is_attached(&self, id: ElementId) -> bool {
        self.element(id).is_ok()
    }

    fn bounding_rect(&self, id: ElementId) -> Result<Rect, DomError> {
        let rect = self.element(id)?.get_bounding_client_rect();
        Ok(Rect::new(rect.top(), rect.left(), rect.width(), rect.height()))
    }

    fn active_element(&self) -> Option<ElementId> {
        self.document
            .active_element()
            .map(|element| self.register(element))
    }

    fn overlay_contains(&self, part: OverlayPart, id: ElementId) -> bool {
        let root = match part {
            OverlayPart::Trigger => &self.trigger_host,
            OverlayPart::Panel => &self.panel_host,
        };
        self.element(id)
            .is_ok_and(|element| root.contains(Some(element.as_ref())))
    }

    fn focus(&mut self, id: ElementId) -> Result<(), DomError> {
        let element = self.element(id)?;
        element
            .dyn_ref::<HtmlElement>()
            .ok_or(DomError::Unsupported(id, "focus"))?
            .focus()
            .map_err(host_error)
    }

    fn value(&self, id: ElementId) -> Result<String, DomError> {
        let element = self.element(id)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            Ok(input.value())
        } else if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            Ok(textarea.value())
        } else {
            Err(DomError::Unsupported(id, "value"))
        }
    }

    fn set_value(&mut self, id: ElementId, value: &str) -> Result<(), DomError> {
        let element = self.element(id)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        } else if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            textarea.set_value(value);
        } else {
            return Err(DomError::Unsupported(id, "value"));
        }
        Ok(())
    }

    fn text_content(&self, id: ElementId) -> Result<String, DomError> {
        Ok(self.element(id)?.text_content().unwrap_or_default())
    }

    fn set_text_content(&mut self, id: ElementId, text: &str) -> Result<(), DomError> {
        self.element(id)?.set_text_content(Some(text));
        Ok(())
    }

    fn select_all(&mut self, id: ElementId) -> Result<(), DomError> {
        let element = self.element(id)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            input.select();
            return Ok(());
        }
        if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            textarea.select();
            return Ok(());
        }
        let selection = web_sys::window()
            .ok_or_else(|| DomError::Host("no window".to_string()))?
            .get_selection()
            .map_err(host_error)?
            .ok_or(DomError::Unsupported(id, "selection"))?;
        selection.select_all_children(&element).map_err(host_error)
    }

    fn selection_text(&self) -> String {
        web_sys::window()
            .and_then(|window| window.get_selection().ok().flatten())
            .map(|selection| String::from(selection.to_string()))
            .unwrap_or_default()
    }

    fn insert_text(&mut self, text: &str) -> bool {
        self.document
            .dyn_ref::<HtmlDocument>()
            .and_then(|document| {
                document
                    .exec_command_with_show_ui_and_value("insertText", false, text)
                    .ok()
            })
            .unwrap_or(false)
    }

    fn dispatch(&mut self, id: ElementId, event: DomEvent) -> Result<(), DomError> {
        let element = self.element(id)?;
        let event: Event = match &event {
            DomEvent::Input | DomEvent::Change => {
                let init = EventInit::new();
                init.set_bubbles(true);
                Event::new_with_event_init_dict(event.event_type(), &init).map_err(host_error)?
            }
            DomEvent::BeforeInput(intent) => {
                let init = InputEventInit::new();
                init.set_bubbles(true);
                init.set_cancelable(true);
                init.set_input_type(intent.input_type());
                init.set_data(intent.data());
                InputEvent::new_with_event_init_dict(event.event_type(), &init)
                    .map_err(host_error)?
                    .into()
            }
        };
        element.dispatch_event(&event).map_err(host_error)?;
        Ok(())
    }
}

struct WebOverlay {
    controller: OverlayController,
    doc: WebDocument,
    trigger: HtmlButtonElement,
    panel: ShadowRoot,
}

type Shared = Rc<RefCell<WebOverlay>>;

/// Runs `f` against the overlay and re-renders. Handlers fired synchronously from inside another
/// handler (a write dispatching `focusin`, say) are deferred to a microtask.
fn with_overlay(shared: &Shared, f: impl FnOnce(&mut WebOverlay) + 'static) {
    match shared.try_borrow_mut() {
        Ok(mut overlay) => {
            f(&mut overlay);
            overlay.render();
        }
        Err(_) => {
            let shared = Rc::clone(shared);
            spawn_local(async move { with_overlay(&shared, f) });
        }
    }
}

impl WebOverlay {
    fn panel_element(&self, id: &str) -> Option<Element> {
        self.panel.get_element_by_id(id)
    }

    fn set_display(element: &Element, shown: bool) {
        if let Some(element) = element.dyn_ref::<HtmlElement>() {
            let _ = element
                .style()
                .set_property("display", if shown { "" } else { "none" });
        }
    }

    fn render(&self) {
        let trigger = self.controller.trigger();
        let style = self.trigger.style();
        let _ = style.set_property("display", if trigger.visible { "block" } else { "none" });
        let _ = style.set_property("top", &format!("{}px", trigger.placement.top));
        let _ = style.set_property("left", &format!("{}px", trigger.placement.left));
        self.trigger.set_disabled(!trigger.enabled);

        let view = self.controller.panel();
        Self::set_display(&self.doc.panel_host, view.visible);
        if !view.visible {
            return;
        }

        for field in PanelField::ALL {
            let Some(element) = self.panel_element(field.dom_id()) else {
                continue;
            };
            let value = view.field(field);
            if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
                if textarea.value() != value {
                    textarea.set_value(value);
                }
                textarea.set_disabled(view.inputs_disabled);
            } else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
                if input.value() != value {
                    input.set_value(value);
                }
                input.set_disabled(view.inputs_disabled);
            }
            if let PanelField::Setting(setting) = field {
                let _ = element
                    .class_list()
                    .toggle_with_force(INVALID_CLASS, view.is_field_invalid(setting));
            }
        }

        for control in PanelControl::ALL {
            if let Some(button) = self
                .panel_element(control.dom_id())
                .and_then(|element| element.dyn_into::<HtmlButtonElement>().ok())
            {
                button.set_disabled(!view.is_control_enabled(control));
            }
        }

        if let Some(error) = self.panel_element(ERROR_DOM_ID) {
            error.set_text_content(view.error.as_deref());
            Self::set_display(&error, view.error.is_some());
        }
        if let Some(busy) = self.panel_element(BUSY_DOM_ID) {
            Self::set_display(&busy, view.busy);
        }
        if let Some(section) = self.panel_element(SETTINGS_SECTION_DOM_ID) {
            Self::set_display(&section, view.settings_expanded);
        }
    }
}

fn panel_markup() -> String {
    let setting_rows: String = PanelField::ALL
        .into_iter()
        .filter_map(|field| match field {
            PanelField::Setting(setting) => Some(format!(
                r#"<label>{label}<input type="{kind}" id="{id}"></label>"#,
                label = setting.label(),
                kind = if matches!(setting, texty_protocol::SettingsField::ApiKey) {
                    "password"
                } else {
                    "text"
                },
                id = field.dom_id(),
            )),
            PanelField::Content | PanelField::Prompt => None,
        })
        .collect();

    format!(
        r#"<style>
  #{backdrop} {{ position: fixed; inset: 0; background: rgba(0, 0, 0, 0.3); }}
  .panel {{ position: fixed; top: 10%; left: 50%; transform: translateX(-50%); width: min(640px, 90vw);
            background: #fff; color: #222; border-radius: 8px; padding: 16px; font: 14px sans-serif;
            display: flex; flex-direction: column; gap: 8px; }}
  textarea {{ width: 100%; box-sizing: border-box; }}
  .{invalid} {{ outline: 2px solid #d33; }}
  #{error} {{ color: #d33; }}
</style>
<div id="{backdrop}"></div>
<div class="panel" role="dialog">
  <textarea id="{content}" rows="10"></textarea>
  <textarea id="{prompt}" rows="3"></textarea>
  <button id="{toggle}">Settings</button>
  <div id="{section}">{setting_rows}</div>
  <div id="{error}"></div>
  <div id="{busy}">Working...</div>
  <div>
    <button id="{fix}">Fix</button>
    <button id="{apply}">Apply</button>
    <button id="{close}">Close</button>
  </div>
</div>"#,
        backdrop = BACKDROP_DOM_ID,
        invalid = INVALID_CLASS,
        error = ERROR_DOM_ID,
        content = PanelField::Content.dom_id(),
        prompt = PanelField::Prompt.dom_id(),
        toggle = PanelControl::SettingsToggle.dom_id(),
        section = SETTINGS_SECTION_DOM_ID,
        busy = BUSY_DOM_ID,
        fix = PanelControl::Fix.dom_id(),
        apply = PanelControl::Apply.dom_id(),
        close = PanelControl::Close.dom_id(),
    )
}

fn listen(
    target: &EventTarget,
    event: &str,
    capture: bool,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    let options = AddEventListenerOptions::new();
    options.set_capture(capture);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        closure.as_ref().unchecked_ref(),
        &options,
    )?;
    // Listeners live as long as the page.
    closure.forget();
    Ok(())
}

fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn mount_host(document: &Document, id: &str) -> Result<(Element, ShadowRoot), JsValue> {
    let host = document.create_element("div")?;
    host.set_id(id);
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&host)?;
    let shadow = host.attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))?;
    Ok((host, shadow))
}

fn open_panel(shared: Shared) {
    spawn_local(async move {
        let settings = match ExtensionStorage.load().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("failed to load settings, using defaults: {err}");
                Settings::default()
            }
        };
        with_overlay(&shared, move |overlay| {
            if let Err(err) = overlay
                .controller
                .activate_trigger(&mut overlay.doc, settings)
            {
                tracing::debug!("trigger activation ignored: {err}");
            }
        });
    });
}

fn start_fix(shared: &Shared, overlay: &mut WebOverlay) {
    let pending = match overlay.controller.request_fix() {
        Ok(pending) => pending,
        Err(err) => {
            tracing::debug!("fix ignored: {err}");
            return;
        }
    };
    let shared = Rc::clone(shared);
    spawn_local(async move {
        let result = complete_via_extension(pending.bridge_request()).await;
        with_overlay(&shared, move |overlay| {
            overlay
                .controller
                .finish_correction(pending.generation, result);
        });
    });
}

fn handle_panel_click(shared: &Shared, overlay: &mut WebOverlay, id: &str) {
    if id == BACKDROP_DOM_ID {
        if let Err(err) = overlay
            .controller
            .dismiss(&mut overlay.doc, DismissReason::ClickOutside)
        {
            tracing::debug!("dismiss ignored: {err}");
        }
        return;
    }
    let Some(control) = PanelControl::ALL
        .into_iter()
        .find(|control| control.dom_id() == id)
    else {
        return;
    };
    let outcome = match control {
        PanelControl::Fix => {
            start_fix(shared, overlay);
            Ok(())
        }
        PanelControl::Apply => overlay.controller.apply(&mut overlay.doc).map(|_| ()),
        PanelControl::Close => overlay.controller.close(&mut overlay.doc),
        PanelControl::SettingsToggle => overlay.controller.toggle_settings(),
    };
    if let Err(err) = outcome {
        tracing::debug!(?control, "panel control ignored: {err}");
    }
}

fn handle_panel_input(overlay: &mut WebOverlay, element: &Element) {
    let Some(field) = PanelField::ALL
        .into_iter()
        .find(|field| field.dom_id() == element.id())
    else {
        return;
    };
    let value = if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        textarea.value()
    } else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else {
        return;
    };
    match overlay.controller.edit_field(field, value) {
        Ok(FieldEdit::SettingsChanged(settings)) => spawn_local(async move {
            if let Err(err) = ExtensionStorage.save(&settings).await {
                tracing::warn!("failed to save settings: {err}");
            }
        }),
        Ok(FieldEdit::Updated) => {}
        Err(err) => tracing::debug!("field edit ignored: {err}"),
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let (trigger_host, trigger_root) = mount_host(&document, TRIGGER_HOST_ID)?;
    let trigger: HtmlButtonElement = document.create_element("button")?.dyn_into()?;
    trigger.set_id(TRIGGER_DOM_ID);
    trigger.set_text_content(Some("\u{2728}"));
    let _ = trigger.style().set_property("position", "fixed");
    let _ = trigger.style().set_property("z-index", "2147483647");
    let _ = trigger.style().set_property("display", "none");
    trigger_root.append_child(&trigger)?;

    let (panel_host, panel) = mount_host(&document, PANEL_HOST_ID)?;
    panel.set_inner_html(&panel_markup());
    if let Some(host) = panel_host.dyn_ref::<HtmlElement>() {
        let _ = host.style().set_property("display", "none");
    }

    let shared: Shared = Rc::new(RefCell::new(WebOverlay {
        controller: OverlayController::default(),
        doc: WebDocument {
            document: document.clone(),
            registry: RefCell::default(),
            next_id: Cell::new(0),
            trigger_host,
            panel_host,
        },
        trigger: trigger.clone(),
        panel: panel.clone(),
    }));

    let state = Rc::clone(&shared);
    listen(&document, "focusin", true, move |event| {
        let Some(element) = event_element(&event) else {
            return;
        };
        with_overlay(&state, move |overlay| {
            let id = overlay.doc.register(element);
            overlay.controller.focus_in(&overlay.doc, id);
        });
    })?;

    let state = Rc::clone(&shared);
    listen(&document, "focusout", true, move |_| {
        let timer_state = Rc::clone(&state);
        with_overlay(&state, move |overlay| {
            let token = overlay.controller.focus_out();
            let Some(window) = web_sys::window() else {
                return;
            };
            let deadline = Closure::once(Box::new(move || {
                with_overlay(&timer_state, move |overlay| {
                    overlay.controller.blur_deadline(&overlay.doc, token);
                });
            }) as Box<dyn FnOnce()>);
            let delay = i32::try_from(BLUR_DEBOUNCE.as_millis()).unwrap_or(i32::MAX);
            if window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    deadline.as_ref().unchecked_ref(),
                    delay,
                )
                .is_ok()
            {
                deadline.forget();
            }
        });
    })?;

    let window_target: &EventTarget = window.as_ref();
    for event in ["scroll", "resize"] {
        let state = Rc::clone(&shared);
        listen(window_target, event, true, move |_| {
            with_overlay(&state, |overlay| {
                overlay.controller.viewport_changed(&overlay.doc);
            });
        })?;
    }

    let state = Rc::clone(&shared);
    listen(&document, "keydown", false, move |event| {
        let is_escape = event
            .dyn_ref::<KeyboardEvent>()
            .is_some_and(|key| key.key() == "Escape");
        if !is_escape {
            return;
        }
        with_overlay(&state, |overlay| {
            if !overlay.controller.panel().visible {
                return;
            }
            if let Err(err) = overlay
                .controller
                .dismiss(&mut overlay.doc, DismissReason::Escape)
            {
                tracing::debug!("dismiss ignored: {err}");
            }
        });
    })?;

    let state = Rc::clone(&shared);
    listen(&trigger, "click", false, move |_| open_panel(Rc::clone(&state)))?;

    let state = Rc::clone(&shared);
    listen(&panel, "click", false, move |event| {
        let Some(element) = event_element(&event) else {
            return;
        };
        let id = element.id();
        let shared = Rc::clone(&state);
        with_overlay(&state, move |overlay| handle_panel_click(&shared, overlay, &id));
    })?;

    let state = Rc::clone(&shared);
    listen(&panel, "input", false, move |event| {
        let Some(element) = event_element(&event) else {
            return;
        };
        with_overlay(&state, move |overlay| handle_panel_input(overlay, &element));
    })?;

    tracing::debug!("overlay attached");
    Ok(())
}
