//! Render-agnostic model of the correction panel.
//!
//! The host draws the panel however it likes; it only has to expose the addressable roles listed
//! in [`PanelField`] and [`PanelControl`] and mirror the flags in [`PanelView`].

use texty_protocol::DEFAULT_PROMPT;
use texty_protocol::Settings;
use texty_protocol::SettingsField;

/// Text-entry roles inside the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelField {
    Content,
    Prompt,
    Setting(SettingsField),
}

impl PanelField {
    pub const ALL: [PanelField; 5] = [
        PanelField::Content,
        PanelField::Prompt,
        PanelField::Setting(SettingsField::Endpoint),
        PanelField::Setting(SettingsField::ApiKey),
        PanelField::Setting(SettingsField::Model),
    ];

    /// DOM id of the field in the panel markup.
    pub fn dom_id(self) -> &'static str {
        match self {
            PanelField::Content => "texty-content",
            PanelField::Prompt => "texty-prompt",
            PanelField::Setting(SettingsField::Endpoint) => "texty-endpoint",
            PanelField::Setting(SettingsField::ApiKey) => "texty-api-key",
            PanelField::Setting(SettingsField::Model) => "texty-model",
        }
    }
}

/// Clickable roles inside the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelControl {
    Fix,
    Apply,
    Close,
    SettingsToggle,
}

impl PanelControl {
    pub const ALL: [PanelControl; 4] = [
        PanelControl::Fix,
        PanelControl::Apply,
        PanelControl::Close,
        PanelControl::SettingsToggle,
    ];

    pub fn dom_id(self) -> &'static str {
        match self {
            PanelControl::Fix => "texty-fix",
            PanelControl::Apply => "texty-apply",
            PanelControl::Close => "texty-close",
            PanelControl::SettingsToggle => "texty-settings-toggle",
        }
    }
}

pub const ERROR_DOM_ID: &str = "texty-error";
pub const BUSY_DOM_ID: &str = "texty-status";
pub const SETTINGS_SECTION_DOM_ID: &str = "texty-settings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub visible: bool,
    pub content: String,
    pub prompt: String,
    pub settings: Settings,
    pub settings_expanded: bool,
    /// Settings fields highlighted as required-but-empty.
    pub invalid_fields: Vec<SettingsField>,
    pub fix_enabled: bool,
    pub apply_enabled: bool,
    /// Content, prompt and settings inputs are read-only while a fix is in flight.
    pub inputs_disabled: bool,
    pub busy: bool,
    pub error: Option<String>,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            visible: false,
            content: String::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            settings: Settings::default(),
            settings_expanded: false,
            invalid_fields: Vec::new(),
            fix_enabled: false,
            apply_enabled: false,
            inputs_disabled: false,
            busy: false,
            error: None,
        }
    }
}

impl PanelView {
    pub fn field(&self, field: PanelField) -> &str {
        match field {
            PanelField::Content => &self.content,
            PanelField::Prompt => &self.prompt,
            PanelField::Setting(setting) => self.settings.get(setting),
        }
    }

    pub fn is_control_enabled(&self, control: PanelControl) -> bool {
        match control {
            PanelControl::Fix => self.fix_enabled,
            PanelControl::Apply => self.apply_enabled,
            PanelControl::Close | PanelControl::SettingsToggle => true,
        }
    }

    pub fn is_field_invalid(&self, field: SettingsField) -> bool {
        self.invalid_fields.contains(&field)
    }

    /// Re-derives validity flags from the current settings. Invalid settings force the settings
    /// section open; valid settings leave it as the user set it.
    pub(crate) fn revalidate(&mut self) {
        self.invalid_fields = self.settings.missing_fields();
        let valid = self.invalid_fields.is_empty();
        self.fix_enabled = valid && !self.busy;
        self.apply_enabled = valid && !self.busy;
        if !valid {
            self.settings_expanded = true;
        }
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.inputs_disabled = busy;
        self.revalidate();
    }

    /// Hides the panel and discards the snapshot; the prompt and settings persist.
    pub(crate) fn hide(&mut self) {
        self.visible = false;
        self.content.clear();
        self.error = None;
        self.set_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn invalid_settings_force_section_open_and_disable_actions() {
        let mut view = PanelView::default();
        view.revalidate();

        assert!(view.settings_expanded);
        assert!(!view.is_control_enabled(PanelControl::Fix));
        assert!(!view.is_control_enabled(PanelControl::Apply));
        assert!(view.is_control_enabled(PanelControl::Close));
        assert_eq!(view.invalid_fields, vec![SettingsField::ApiKey]);
    }

    #[test]
    fn busy_panel_disables_everything_but_close() {
        let mut view = PanelView {
            settings: Settings {
                api_key: "sk".to_string(),
                ..Settings::default()
            },
            ..PanelView::default()
        };
        view.set_busy(true);

        assert!(view.inputs_disabled);
        assert!(!view.fix_enabled);
        assert!(!view.apply_enabled);

        view.set_busy(false);
        assert!(view.fix_enabled);
        assert!(view.apply_enabled);
        assert!(!view.settings_expanded);
    }

    #[test]
    fn dom_ids_are_unique() {
        let mut ids: Vec<_> = PanelField::ALL.into_iter().map(PanelField::dom_id).collect();
        ids.extend(PanelControl::ALL.into_iter().map(PanelControl::dom_id));
        ids.extend([ERROR_DOM_ID, BUSY_DOM_ID, SETTINGS_SECTION_DOM_ID]);
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
