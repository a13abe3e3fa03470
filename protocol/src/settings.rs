use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Storage key under which the extension keeps its settings.
pub const SETTINGS_STORAGE_KEY: &str = "texty-settings";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the completion service.
///
/// The value is committed as a whole on every edit (last write wins), so there is no partial
/// update type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// Settings are usable only when every field is non-empty.
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fields that are currently empty, in display order.
    pub fn missing_fields(&self) -> Vec<SettingsField> {
        SettingsField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }

    pub fn get(&self, field: SettingsField) -> &str {
        match field {
            SettingsField::Endpoint => &self.endpoint,
            SettingsField::ApiKey => &self.api_key,
            SettingsField::Model => &self.model,
        }
    }

    pub fn set(&mut self, field: SettingsField, value: impl Into<String>) {
        let value = value.into();
        match field {
            SettingsField::Endpoint => self.endpoint = value,
            SettingsField::ApiKey => self.api_key = value,
            SettingsField::Model => self.model = value,
        }
    }
}

/// One of the three required settings fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SettingsField {
    Endpoint,
    ApiKey,
    Model,
}

impl SettingsField {
    pub const ALL: [SettingsField; 3] = [
        SettingsField::Endpoint,
        SettingsField::ApiKey,
        SettingsField::Model,
    ];

    /// Human-readable label used by the settings sub-section.
    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Endpoint => "API Endpoint",
            SettingsField::ApiKey => "API Key",
            SettingsField::Model => "Model Name",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_need_an_api_key() {
        let settings = Settings::default();
        assert!(!settings.is_valid());
        assert_eq!(settings.missing_fields(), vec![SettingsField::ApiKey]);
    }

    #[test]
    fn every_empty_field_is_reported_in_order() {
        let settings = Settings {
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
        };
        assert_eq!(settings.missing_fields(), SettingsField::ALL.to_vec());
    }

    #[test]
    fn serializes_with_extension_field_names() {
        let settings = Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "endpoint": DEFAULT_ENDPOINT,
                "apiKey": "sk-test",
                "model": DEFAULT_MODEL,
            })
        );
        assert!(settings.is_valid());
    }

    #[test]
    fn set_replaces_a_single_field() {
        let mut settings = Settings::default();
        settings.set(SettingsField::Model, "gpt-4o");
        assert_eq!(settings.get(SettingsField::Model), "gpt-4o");
        assert_eq!(SettingsField::ApiKey.to_string(), "apiKey");
    }

    #[test]
    fn partially_stored_settings_fill_in_defaults() {
        let settings: Settings =
            serde_json::from_value(serde_json::json!({ "apiKey": "sk-stored" })).expect("parse");
        assert_eq!(
            settings,
            Settings {
                api_key: "sk-stored".to_string(),
                ..Settings::default()
            }
        );
    }
}
