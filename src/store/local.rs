//! Device-local key/value persistence
//!
//! Values are JSON strings under fixed keys. Reads never fail: a missing or
//! unreadable value falls back to its default. Writes log failures and carry on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::StoreError;
use crate::model::{
    Language, LibrarySnapshot, MediaItem, PlayedItem, Playlist, Preferences, Session, Theme,
    RECENTLY_PLAYED_LIMIT,
};

const KEY_RECENTLY_PLAYED: &str = "neontunes_recently_played";
const KEY_HISTORY: &str = "neontunes_history";
const KEY_LIKED_SONGS: &str = "neontunes_liked_songs";
const KEY_PLAYLISTS: &str = "neontunes_playlists";
const KEY_THEME: &str = "neontunes_theme";
const KEY_LANGUAGE: &str = "neontunes_language";
const KEY_LAST_IDENTITY: &str = "neontunes_last_identity";
const KEY_SESSION: &str = "neontunes_session";

/// Flat string key/value storage.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// All keys in one JSON object on disk, rewritten on every change.
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Local store is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read local store");
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Typed access to the device-local cache.
#[derive(Clone)]
pub struct LocalPreferenceStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl LocalPreferenceStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// File-backed store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::open(path)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.backend.get(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Ignoring unreadable stored value");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Local store read failed");
                T::default()
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|raw| self.backend.set(key, raw));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Local store write failed");
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        self.backend.get(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Local store read failed");
            None
        })
    }

    fn write_raw(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value.to_string()) {
            tracing::warn!(key, error = %e, "Local store write failed");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!(key, error = %e, "Local store remove failed");
        }
    }

    pub fn recently_played(&self) -> Vec<PlayedItem> {
        let mut items: Vec<PlayedItem> = self.read(KEY_RECENTLY_PLAYED);
        items.truncate(RECENTLY_PLAYED_LIMIT);
        items
    }

    pub fn set_recently_played(&self, items: &[PlayedItem]) {
        let end = items.len().min(RECENTLY_PLAYED_LIMIT);
        self.write(KEY_RECENTLY_PLAYED, &items[..end]);
    }

    pub fn history(&self) -> Vec<PlayedItem> {
        self.read(KEY_HISTORY)
    }

    pub fn set_history(&self, items: &[PlayedItem]) {
        self.write(KEY_HISTORY, items);
    }

    pub fn liked_songs(&self) -> Vec<MediaItem> {
        self.read(KEY_LIKED_SONGS)
    }

    pub fn set_liked_songs(&self, items: &[MediaItem]) {
        self.write(KEY_LIKED_SONGS, items);
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.read(KEY_PLAYLISTS)
    }

    pub fn set_playlists(&self, playlists: &[Playlist]) {
        self.write(KEY_PLAYLISTS, playlists);
    }

    /// Theme and language are stored as bare names, not JSON.
    pub fn theme(&self) -> Theme {
        self.read_raw(KEY_THEME)
            .and_then(|raw| Theme::parse(&raw))
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write_raw(KEY_THEME, theme.as_str());
    }

    pub fn language(&self) -> Language {
        self.read_raw(KEY_LANGUAGE)
            .and_then(|raw| Language::parse(&raw))
            .unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) {
        self.write_raw(KEY_LANGUAGE, language.as_str());
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            theme: self.theme(),
            language: self.language(),
        }
    }

    pub fn set_preferences(&self, preferences: Preferences) {
        self.set_theme(preferences.theme);
        self.set_language(preferences.language);
    }

    /// The uid of the most recent signed-in identity, kept across sign-out.
    pub fn last_identity(&self) -> Option<String> {
        self.read_raw(KEY_LAST_IDENTITY).filter(|uid| !uid.is_empty())
    }

    pub fn set_last_identity(&self, uid: &str) {
        self.write_raw(KEY_LAST_IDENTITY, uid);
    }

    pub fn session(&self) -> Option<Session> {
        self.read(KEY_SESSION)
    }

    pub fn set_session(&self, session: Option<&Session>) {
        match session {
            Some(session) => self.write(KEY_SESSION, session),
            None => self.remove(KEY_SESSION),
        }
    }

    /// Everything the library needs on startup.
    pub fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            history: self.history(),
            recently_played: self.recently_played(),
            liked_songs: self.liked_songs(),
            playlists: self.playlists(),
            preferences: self.preferences(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> MediaItem {
        MediaItem { id: id.to_string(), title: id.to_uppercase(), ..Default::default() }
    }

    #[test]
    fn missing_values_fall_back_to_defaults() {
        let store = LocalPreferenceStore::in_memory();
        assert!(store.history().is_empty());
        assert!(store.liked_songs().is_empty());
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.language(), Language::All);
        assert!(store.last_identity().is_none());
        assert!(store.session().is_none());
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let backend = Arc::new(MemoryBackend::default());
        backend.set(KEY_LIKED_SONGS, "not json".into()).unwrap();
        backend.set(KEY_THEME, "sepia".into()).unwrap();
        let store = LocalPreferenceStore::new(backend);
        assert!(store.liked_songs().is_empty());
        assert_eq!(store.theme(), Theme::Dark);
    }

    #[test]
    fn recently_played_is_truncated_on_write() {
        let store = LocalPreferenceStore::in_memory();
        let items: Vec<PlayedItem> = (0..15)
            .map(|i| PlayedItem::now(item(&format!("v{i}")), Language::All))
            .collect();
        store.set_recently_played(&items);
        let stored = store.recently_played();
        assert_eq!(stored.len(), RECENTLY_PLAYED_LIMIT);
        assert_eq!(stored[0].item.id, "v0");
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalPreferenceStore::open(&path);
        store.set_liked_songs(&[item("a"), item("b")]);
        store.set_theme(Theme::Neon);
        store.set_language(Language::Ta);
        store.set_last_identity("uid-1");
        store.set_playlists(&[Playlist::new("Road", Some(item("a")))]);

        let reopened = LocalPreferenceStore::open(&path);
        assert_eq!(reopened.liked_songs(), vec![item("a"), item("b")]);
        assert_eq!(reopened.preferences(), Preferences { theme: Theme::Neon, language: Language::Ta });
        assert_eq!(reopened.last_identity().as_deref(), Some("uid-1"));
        assert_eq!(reopened.playlists()[0].tracks, vec![item("a")]);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ nope").unwrap();
        let store = LocalPreferenceStore::open(&path);
        assert!(store.history().is_empty());
        store.set_theme(Theme::Blue);
        assert_eq!(LocalPreferenceStore::open(&path).theme(), Theme::Blue);
    }

    #[test]
    fn session_can_be_cleared() {
        let store = LocalPreferenceStore::in_memory();
        let session = Session {
            uid: "u".into(),
            id_token: "t".into(),
            refresh_token: Some("r".into()),
            expires_at: None,
        };
        store.set_session(Some(&session));
        assert_eq!(store.session(), Some(session));
        store.set_session(None);
        assert!(store.session().is_none());
    }
}
