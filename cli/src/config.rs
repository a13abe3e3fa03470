use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use texty_overlay::SettingsError;
use texty_overlay::SettingsStore;
use texty_protocol::Settings;
use texty_protocol::SettingsField;
use texty_protocol::settings::SETTINGS_STORAGE_KEY;
use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::Table as TomlTable;
use toml_edit::value;

use crate::atomic_write::write_private_atomic;

/// File-backed settings in `~/.texty/config.toml`, under the `[texty-settings]` table.
///
/// Edits go through `toml_edit`, so comments and unrelated tables survive a save.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file, table, or keys fall back to [`Settings::default`] field by field.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(Settings::default());
        };
        let doc = content
            .parse::<DocumentMut>()
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(read_settings(&doc))
    }

    /// Writes the whole settings value. Refuses to overwrite a file that is not valid TOML.
    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();
        let mut doc = content
            .parse::<DocumentMut>()
            .with_context(|| format!("refusing to overwrite unparsable {}", self.path.display()))?;
        write_settings(&mut doc, settings);
        write_private_atomic(&self.path, &doc.to_string())
    }
}

impl SettingsStore for ConfigStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        self.load_settings()
            .map_err(|err| SettingsError::Malformed(format!("{err:#}")))
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.save_settings(settings)
            .map_err(|err| SettingsError::Unavailable(format!("{err:#}")))
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".texty").join("config.toml")
}

/// Snake-case key used in the TOML file.
fn toml_key(field: SettingsField) -> &'static str {
    match field {
        SettingsField::Endpoint => "endpoint",
        SettingsField::ApiKey => "api_key",
        SettingsField::Model => "model",
    }
}

fn read_settings(doc: &DocumentMut) -> Settings {
    let mut settings = Settings::default();
    let Some(table) = doc.get(SETTINGS_STORAGE_KEY).and_then(TomlItem::as_table) else {
        return settings;
    };
    for field in SettingsField::ALL {
        if let Some(stored) = table
            .get(toml_key(field))
            .and_then(TomlItem::as_value)
            .and_then(toml_edit::Value::as_str)
        {
            settings.set(field, stored);
        }
    }
    settings
}

fn write_settings(doc: &mut DocumentMut, settings: &Settings) {
    let table = ensure_table_for_write(doc, SETTINGS_STORAGE_KEY);
    for field in SettingsField::ALL {
        table[toml_key(field)] = value(settings.get(field));
    }
}

fn ensure_table_for_write<'a>(doc: &'a mut DocumentMut, key: &str) -> &'a mut TomlTable {
    if !doc.get(key).is_some_and(TomlItem::is_table) {
        let mut table = TomlTable::new();
        table.set_implicit(false);
        doc[key] = TomlItem::Table(table);
    }
    match doc[key].as_table_mut() {
        Some(table) => table,
        None => unreachable!("`{key}` was just made a table"),
    }
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("config.toml"));
        assert_eq!(store.load_settings().expect("load"), Settings::default());
    }

    #[test]
    fn missing_keys_fall_back_individually() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"[texty-settings]
api_key = "sk-file"
"#,
        )
        .expect("write config");

        let settings = ConfigStore::new(path).load_settings().expect("load");

        assert_eq!(
            settings,
            Settings {
                api_key: "sk-file".to_string(),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn save_preserves_comments_and_other_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"# top comment

[texty-settings] # keep me
# inner comment
model = "old-model"

[other]
key = 1
"#,
        )
        .expect("write config");
        let store = ConfigStore::new(path.clone());
        let settings = Settings {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            api_key: "sk-new".to_string(),
            model: "llama3".to_string(),
        };

        store.save_settings(&settings).expect("save");

        let updated = std::fs::read_to_string(&path).expect("read updated");
        assert!(updated.contains("# top comment"));
        assert!(updated.contains("# inner comment"));
        assert!(updated.contains("[other]"));
        assert!(updated.contains(r#"model = "llama3""#));
        assert!(!updated.contains("old-model"));
        assert_eq!(store.load_settings().expect("reload"), settings);
    }

    #[test]
    fn invalid_toml_is_reported_and_never_clobbered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let broken = "[texty-settings\napi_key = \"sk\"\n";
        std::fs::write(&path, broken).expect("write config");
        let store = ConfigStore::new(path.clone());

        assert!(store.load_settings().is_err());
        assert!(store.save_settings(&Settings::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), broken);
    }

    #[tokio::test]
    async fn settings_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("nested").join("config.toml"));
        let settings = Settings {
            api_key: "sk-store".to_string(),
            ..Settings::default()
        };

        store.save(&settings).await.expect("save");

        assert_eq!(store.load().await.expect("load"), settings);
    }

    #[test]
    fn default_config_path_uses_texty_home_dir() {
        let home = Path::new("home");
        assert_eq!(
            default_config_path(home),
            home.join(".texty").join("config.toml")
        );
    }
}
