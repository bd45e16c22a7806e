//! Cursor stored in the configuration file.
//!
//! The cursor is the top-level `last_id` key. The file is re-read on every
//! access, and a write replaces the whole document: it is serialized to a
//! sibling temp file which is then renamed over the original. Keys this crate
//! does not know about are carried over untouched.

use std::path::PathBuf;

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use tokio::fs;
use tracing::{debug, instrument};

use super::StateStore;
use crate::config::ConfigFormat;
use crate::error::{AppError, Result};
use crate::models::PostDetail;

const CURSOR_KEY: &str = "last_id";

#[derive(Debug, Clone)]
pub struct ConfigFileStore {
    path: PathBuf,
    format: ConfigFormat,
}

impl ConfigFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self { path, format }
    }

    async fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::persistence(format!("cannot read {}: {e}", self.path.display()))
        })
    }

    /// Read the document, set `last_id`, and serialize it again.
    fn with_cursor(&self, content: &str, id: &str) -> Result<String> {
        match self.format {
            ConfigFormat::Json => {
                let mut doc: JsonValue = serde_json::from_str(content)
                    .map_err(|e| AppError::persistence(format!("config is not valid JSON: {e}")))?;
                let map = doc
                    .as_object_mut()
                    .ok_or_else(|| AppError::persistence("config root is not a JSON object"))?;
                map.insert(CURSOR_KEY.into(), JsonValue::String(id.into()));
                Ok(serde_json::to_string_pretty(&doc)? + "\n")
            }
            ConfigFormat::Yaml => {
                let mut doc: YamlValue = serde_yaml::from_str(content)
                    .map_err(|e| AppError::persistence(format!("config is not valid YAML: {e}")))?;
                let map = doc
                    .as_mapping_mut()
                    .ok_or_else(|| AppError::persistence("config root is not a YAML mapping"))?;
                map.insert(CURSOR_KEY.into(), YamlValue::String(id.into()));
                serde_yaml::to_string(&doc)
                    .map_err(|e| AppError::persistence(format!("cannot serialize YAML: {e}")))
            }
        }
    }

    fn cursor_of(&self, content: &str) -> Result<Option<String>> {
        let cursor = match self.format {
            ConfigFormat::Json => {
                let doc: JsonValue = serde_json::from_str(content)
                    .map_err(|e| AppError::persistence(format!("config is not valid JSON: {e}")))?;
                doc.get(CURSOR_KEY).and_then(scalar_json)
            }
            ConfigFormat::Yaml => {
                let doc: YamlValue = serde_yaml::from_str(content)
                    .map_err(|e| AppError::persistence(format!("config is not valid YAML: {e}")))?;
                doc.get(CURSOR_KEY).and_then(scalar_yaml)
            }
        };
        Ok(cursor)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Ids are strings upstream, but a hand-edited file may hold a bare number.
fn scalar_json(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_yaml(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl StateStore for ConfigFileStore {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn last_seen_id(&self) -> Result<Option<String>> {
        let content = self.read().await?;
        self.cursor_of(&content)
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), id = %post.id()))]
    async fn set_last_seen(&self, post: &PostDetail) -> Result<()> {
        let content = self.read().await?;
        let updated = self.with_cursor(&content, post.id())?;

        let tmp = self.temp_path();
        fs::write(&tmp, updated).await.map_err(|e| {
            AppError::persistence(format!("cannot write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::persistence(format!("cannot replace {}: {e}", self.path.display()))
        })?;
        debug!("Cursor written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedEntry;

    fn post(id: &str) -> PostDetail {
        PostDetail::new(&FeedEntry {
            id: id.into(),
            text: "t".into(),
            detail_link: "https://example.com/d".into(),
            image_url: None,
            video_url: None,
        })
    }

    #[tokio::test]
    async fn test_json_roundtrip_preserves_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"webhook_url": "https://example.com/hook", "cookies": {"a": "b"}}"#,
        )
        .unwrap();

        let store = ConfigFileStore::new(&path);
        assert_eq!(store.last_seen_id().await.unwrap(), None);

        store.set_last_seen(&post("123")).await.unwrap();
        assert_eq!(store.last_seen_id().await.unwrap().as_deref(), Some("123"));

        store.set_last_seen(&post("124")).await.unwrap();
        assert_eq!(store.last_seen_id().await.unwrap().as_deref(), Some("124"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: JsonValue = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["webhook_url"], "https://example.com/hook");
        assert_eq!(doc["cookies"]["a"], "b");
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_yaml_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "webhook_url: https://example.com/hook\nlast_id: 99\n").unwrap();

        let store = ConfigFileStore::new(&path);
        assert_eq!(store.last_seen_id().await.unwrap().as_deref(), Some("99"));
        store.set_last_seen(&post("100")).await.unwrap();
        assert_eq!(store.last_seen_id().await.unwrap().as_deref(), Some("100"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("webhook_url"));
    }

    #[tokio::test]
    async fn test_null_cursor_reads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"last_id": null}"#).unwrap();
        let store = ConfigFileStore::new(&path);
        assert_eq!(store.last_seen_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_persistence_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigFileStore::new(tmp.path().join("absent.json"));
        let err = store.last_seen_id().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ConfigFileStore::new(&path);
        assert!(store.set_last_seen(&post("1")).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
