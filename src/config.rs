//! Settings persistence.
//!
//! The settings file is a flat JSON object. A fixed schema (see
//! [`Settings`]) is reconciled against the file on [`ConfigStore::init`];
//! per-song lyric delays live beside it as open-ended `"<song path>.delay"`
//! keys that reconciliation leaves alone.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DELAY_SUFFIX: &str = ".delay";
pub const MIN_FRAME_RATE: u32 = 10;
pub const MAX_FRAME_RATE: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Gr,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[Language::En, Language::Gr]
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Gr => "gr",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "gr" => Ok(Language::Gr),
            other => Err(format!("Unknown language '{}' (expected en or gr)", other)),
        }
    }
}

/// Song that was loaded when the player last closed and where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSong {
    pub song: String,
    pub timestamp: f64,
}

/// Typed view of the fixed settings schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub volume: u8,
    pub is_muted: bool,
    #[serde(with = "last_song_serde")]
    pub last_song: Option<LastSong>,
    pub download_dir: String,
    pub language: Language,
    pub max_frame_rate: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let download_dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Settings {
            volume: 100,
            is_muted: false,
            last_song: None,
            download_dir: download_dir.display().to_string(),
            language: Language::En,
            max_frame_rate: 60,
        }
    }
}

impl Settings {
    /// The schema as the flat mapping written to disk.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "volume".into(),
                reason: format!("{} is outside 0 - 100", self.volume),
            });
        }
        if let Some(last) = &self.last_song {
            let ok = last.timestamp >= 0.0
                && Duration::try_from_secs_f64(last.timestamp).is_ok();
            if !ok {
                return Err(ConfigError::InvalidValue {
                    key: "last_song".into(),
                    reason: format!("timestamp {} is not a playback position", last.timestamp),
                });
            }
        }
        validate_frame_rate(self.max_frame_rate)
    }
}

pub fn validate_frame_rate(frames: u32) -> Result<(), ConfigError> {
    if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&frames) {
        return Err(ConfigError::InvalidValue {
            key: "max_frame_rate".into(),
            reason: format!(
                "{} is outside {} - {}",
                frames, MIN_FRAME_RATE, MAX_FRAME_RATE
            ),
        });
    }
    Ok(())
}

fn settings_from(map: Map<String, Value>) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_value(Value::Object(map))?;
    settings.validate()?;
    Ok(settings)
}

/// `last_song` is stored as `{}` when nothing has been played yet.
mod last_song_serde {
    use super::LastSong;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(v: &Option<LastSong>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(last) => last.serialize(s),
            None => serde_json::Map::new().serialize(s),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<LastSong>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Key under which the lyric delay of a song is stored.
pub fn delay_key(song_path: &Path) -> String {
    format!("{}{}", song_path.display(), DELAY_SUFFIX)
}

fn is_delay_key(key: &str) -> bool {
    key.ends_with(DELAY_SUFFIX)
}

/// Durable key/value store backed by one JSON file.
///
/// Every mutation rewrites the whole file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    defaults: Map<String, Value>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, defaults: &Settings) -> Self {
        Self::with_schema(path, defaults.to_map())
    }

    /// Build a store over an arbitrary default mapping.
    pub fn with_schema(path: impl Into<PathBuf>, defaults: Map<String, Value>) -> Self {
        ConfigStore {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    fn write(&self, data: &Map<String, Value>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Load the whole persisted mapping.
    pub fn read(&self) -> Result<Map<String, Value>, ConfigError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::MissingFile(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    /// Create the file from the defaults if needed, then reconcile its keys.
    pub fn init(&self) -> Result<(), ConfigError> {
        if !self.path.exists() {
            self.write(&self.defaults)?;
        }
        self.sync()
    }

    /// Add schema keys missing from the file and drop keys the schema does
    /// not declare. Delay keys are exempt from removal.
    pub fn sync(&self) -> Result<(), ConfigError> {
        let mut data = self.read()?;
        let before = data.len();
        data.retain(|k, _| self.defaults.contains_key(k) || is_delay_key(k));
        let mut changed = data.len() != before;
        for (k, v) in &self.defaults {
            if !data.contains_key(k) {
                data.insert(k.clone(), v.clone());
                changed = true;
            }
        }
        if changed {
            tracing::debug!(path = %self.path.display(), "reconciled config keys");
            self.write(&data)?;
        }
        Ok(())
    }

    /// Value for `key`, or `default` when absent or unreadable.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.read()
            .ok()
            .and_then(|mut data| data.remove(key))
            .unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().map(|d| d.contains_key(key)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Update an existing key.
    pub fn edit(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        let mut data = self.read()?;
        match data.get_mut(key) {
            Some(slot) => *slot = value,
            None => return Err(ConfigError::key_missing(key)),
        }
        self.write(&data)
    }

    /// Insert a new key.
    pub fn add(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        let mut data = self.read()?;
        if data.contains_key(key) {
            return Err(ConfigError::key_exists(key));
        }
        data.insert(key.to_string(), value);
        self.write(&data)
    }

    pub fn remove_key(&self, key: &str) -> Result<(), ConfigError> {
        let mut data = self.read()?;
        if data.remove(key).is_none() {
            return Err(ConfigError::key_missing(key));
        }
        self.write(&data)
    }

    /// Overwrite the file with an empty mapping.
    pub fn clear(&self) -> Result<(), ConfigError> {
        self.write(&Map::new())
    }

    /// Merge `other` into the stored mapping, overwriting shared keys.
    pub fn update(&self, other: &Map<String, Value>) -> Result<(), ConfigError> {
        let mut data = self.read()?;
        data.extend(other.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write(&data)
    }

    /// Union of both stores' mappings, persisted into `self`.
    pub fn union(&self, other: &ConfigStore) -> Result<Map<String, Value>, ConfigError> {
        let theirs = other.read()?;
        self.update(&theirs)?;
        self.read()
    }

    pub fn purge(&self) -> Result<(), ConfigError> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    pub fn restore_default(&self) -> Result<(), ConfigError> {
        if self.path.exists() {
            self.purge()?;
        }
        self.init()
    }

    // ── Typed schema access ─────────────────────────────────────────────

    /// Read the schema keys as [`Settings`], filling gaps from the defaults.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let data = self.read()?;
        let mut merged = self.defaults.clone();
        for (k, v) in data {
            if merged.contains_key(&k) {
                merged.insert(k, v);
            }
        }
        settings_from(merged)
    }

    /// Reset every schema key whose stored value does not parse or validate
    /// back to its default. Returns the keys that were reset.
    pub fn repair(&self) -> Result<Vec<String>, ConfigError> {
        let data = self.read()?;
        let mut reset = Vec::new();
        for (key, default) in &self.defaults {
            let Some(stored) = data.get(key) else {
                continue;
            };
            let mut candidate = self.defaults.clone();
            candidate.insert(key.clone(), stored.clone());
            if settings_from(candidate).is_err() {
                self.edit(key, default.clone())?;
                reset.push(key.clone());
            }
        }
        Ok(reset)
    }

    pub fn set_volume(&self, volume: u8) -> Result<(), ConfigError> {
        if volume > 100 {
            return Err(ConfigError::InvalidValue {
                key: "volume".into(),
                reason: format!("{} is outside 0 - 100", volume),
            });
        }
        self.edit("volume", Value::from(volume))
    }

    pub fn set_muted(&self, muted: bool) -> Result<(), ConfigError> {
        self.edit("is_muted", Value::Bool(muted))
    }

    pub fn set_last_song(&self, last: Option<&LastSong>) -> Result<(), ConfigError> {
        let value = match last {
            Some(last) => serde_json::to_value(last)?,
            None => Value::Object(Map::new()),
        };
        self.edit("last_song", value)
    }

    pub fn set_language(&self, language: Language) -> Result<(), ConfigError> {
        self.edit("language", Value::from(language.code()))
    }

    pub fn set_max_frame_rate(&self, frames: u32) -> Result<(), ConfigError> {
        validate_frame_rate(frames)?;
        self.edit("max_frame_rate", Value::from(frames))
    }

    pub fn set_download_dir(&self, dir: &Path) -> Result<(), ConfigError> {
        self.edit("download_dir", Value::from(dir.display().to_string()))
    }

    // ── Per-song lyric delays ───────────────────────────────────────────

    /// Lyric delay in seconds stored under `key`, if any.
    pub fn delay(&self, key: &str) -> Option<f64> {
        self.get(key, Value::Null).as_f64()
    }

    /// Insert or overwrite a delay.
    pub fn set_delay(&self, key: &str, secs: f64) -> Result<(), ConfigError> {
        let value = serde_json::Number::from_f64(secs)
            .map(Value::Number)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("{} is not a finite number", secs),
            })?;
        if self.contains(key) {
            self.edit(key, value)
        } else {
            self.add(key, value)
        }
    }

    /// Drop a delay. Returns whether one was stored.
    pub fn remove_delay(&self, key: &str) -> Result<bool, ConfigError> {
        if !self.contains(key) {
            return Ok(false);
        }
        self.remove_key(key)?;
        Ok(true)
    }

    /// Move a delay to a new key, e.g. after a song rename.
    pub fn rename_delay(&self, old_key: &str, new_key: &str) -> Result<bool, ConfigError> {
        match self.delay(old_key) {
            Some(secs) => {
                self.remove_key(old_key)?;
                self.set_delay(new_key, secs)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl PartialEq for ConfigStore {
    fn eq(&self, other: &Self) -> bool {
        match (self.read(), other.read()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<Map<String, Value>> for ConfigStore {
    fn eq(&self, other: &Map<String, Value>) -> bool {
        self.read().map(|d| &d == other).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn defaults() -> Settings {
        Settings {
            volume: 50,
            is_muted: false,
            last_song: None,
            download_dir: "/tmp/downloads".into(),
            language: Language::En,
            max_frame_rate: 60,
        }
    }

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("config.json"), &defaults())
    }

    #[test]
    fn init_writes_defaults_verbatim() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        assert_eq!(cfg.read().unwrap(), defaults().to_map());
        assert_eq!(cfg.read().unwrap()["last_song"], json!({}));
    }

    #[test]
    fn oversized_resume_timestamp_is_invalid() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.edit("last_song", json!({"song": "a.mp3", "timestamp": 1e300}))
            .unwrap();
        assert!(matches!(
            cfg.settings(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "last_song"
        ));
        cfg.edit("last_song", json!({"song": "a.mp3", "timestamp": -1.0}))
            .unwrap();
        assert!(cfg.settings().is_err());
    }

    #[test]
    fn repair_resets_only_bad_keys() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.edit("volume", json!(150)).unwrap();
        cfg.edit("max_frame_rate", json!(500)).unwrap();
        cfg.edit("last_song", json!("x")).unwrap();
        cfg.edit("language", json!("gr")).unwrap();
        cfg.add("songs/a.mp3.delay", json!(0.5)).unwrap();
        assert!(cfg.settings().is_err());

        let mut reset = cfg.repair().unwrap();
        reset.sort();
        assert_eq!(reset, vec!["last_song", "max_frame_rate", "volume"]);

        let s = cfg.settings().unwrap();
        assert_eq!(s.volume, 50);
        assert_eq!(s.max_frame_rate, 60);
        assert_eq!(s.last_song, None);
        assert_eq!(s.language, Language::Gr);
        assert_eq!(cfg.delay("songs/a.mp3.delay"), Some(0.5));
        assert!(cfg.repair().unwrap().is_empty());
    }

    #[test]
    fn read_before_init_is_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(store(&dir).read(), Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn init_reconciles_keys_but_keeps_delays() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        fs::write(
            cfg.path(),
            r#"{"volume": 20, "stale": 1, "songs/a.mp3.delay": 1.5}"#,
        )
        .unwrap();
        cfg.init().unwrap();
        let data = cfg.read().unwrap();
        assert_eq!(data["volume"], json!(20));
        assert!(!data.contains_key("stale"));
        assert_eq!(data["songs/a.mp3.delay"], json!(1.5));
        assert_eq!(data["max_frame_rate"], json!(60));
    }

    #[test]
    fn add_twice_conflicts() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.add("k", json!(1)).unwrap();
        assert!(matches!(
            cfg.add("k", json!(2)),
            Err(ConfigError::KeyConflict { .. })
        ));
        assert_eq!(cfg.get("k", Value::Null), json!(1));
    }

    #[test]
    fn edit_missing_key_conflicts() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        assert!(matches!(
            cfg.edit("never", json!(1)),
            Err(ConfigError::KeyConflict { .. })
        ));
        cfg.edit("volume", json!(70)).unwrap();
        assert_eq!(cfg.get("volume", Value::Null), json!(70));
    }

    #[test]
    fn get_returns_default_when_absent() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        assert_eq!(cfg.get("volume", json!("fallback")), json!("fallback"));
        cfg.init().unwrap();
        assert_eq!(cfg.get("nope", json!(3)), json!(3));
    }

    #[test]
    fn restore_default_resets_everything() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.edit("volume", json!(1)).unwrap();
        cfg.set_delay("x.mp3.delay", 2.0).unwrap();
        cfg.restore_default().unwrap();
        assert_eq!(cfg.read().unwrap(), defaults().to_map());
    }

    #[test]
    fn remove_clear_and_purge() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.remove_key("language").unwrap();
        assert!(!cfg.contains("language"));
        assert!(cfg.remove_key("language").is_err());
        cfg.clear().unwrap();
        assert!(cfg.is_empty());
        cfg.purge().unwrap();
        assert!(!cfg.path().exists());
    }

    #[test]
    fn equality_and_union() {
        let dir = TempDir::new().unwrap();
        let left = store(&dir);
        let right = ConfigStore::new(dir.path().join("other.json"), &defaults());
        left.init().unwrap();
        right.init().unwrap();
        assert!(left == right);

        right.add("extra", json!(true)).unwrap();
        assert!(left != right);

        let merged = left.union(&right).unwrap();
        assert_eq!(merged["extra"], json!(true));
        assert!(left == right);
        assert!(left == merged);
    }

    #[test]
    fn settings_round_trip_through_typed_setters() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.set_volume(30).unwrap();
        cfg.set_muted(true).unwrap();
        cfg.set_language(Language::Gr).unwrap();
        cfg.set_last_song(Some(&LastSong {
            song: "a.mp3".into(),
            timestamp: 12.5,
        }))
        .unwrap();
        let s = cfg.settings().unwrap();
        assert_eq!(s.volume, 30);
        assert!(s.is_muted);
        assert_eq!(s.language, Language::Gr);
        assert_eq!(s.last_song.unwrap().song, "a.mp3");
        assert_eq!(cfg.read().unwrap()["language"], json!("gr"));
    }

    #[test]
    fn frame_rate_is_range_checked() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        assert!(cfg.set_max_frame_rate(9).is_err());
        assert!(cfg.set_max_frame_rate(121).is_err());
        cfg.set_max_frame_rate(120).unwrap();
        assert_eq!(cfg.settings().unwrap().max_frame_rate, 120);
    }

    #[test]
    fn settings_rejects_out_of_range_values_on_disk() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        cfg.edit("max_frame_rate", json!(500)).unwrap();
        assert!(matches!(
            cfg.settings(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn delays_add_edit_rename_remove() {
        let dir = TempDir::new().unwrap();
        let cfg = store(&dir);
        cfg.init().unwrap();
        let key = delay_key(Path::new("songs/a.mp3"));
        assert_eq!(key, "songs/a.mp3.delay");
        assert_eq!(cfg.delay(&key), None);

        cfg.set_delay(&key, 1.5).unwrap();
        cfg.set_delay(&key, -0.5).unwrap();
        assert_eq!(cfg.delay(&key), Some(-0.5));

        let new_key = delay_key(Path::new("songs/b.mp3"));
        assert!(cfg.rename_delay(&key, &new_key).unwrap());
        assert_eq!(cfg.delay(&key), None);
        assert_eq!(cfg.delay(&new_key), Some(-0.5));

        assert!(cfg.remove_delay(&new_key).unwrap());
        assert!(!cfg.remove_delay(&new_key).unwrap());
        assert!(cfg.set_delay(&key, f64::NAN).is_err());
    }

    #[test]
    fn language_parses_codes() {
        assert_eq!("GR".parse::<Language>().unwrap(), Language::Gr);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::all().len(), 2);
    }
}
