//! crates/stichelbuch_core/src/store.rs
//!
//! The persistent store. Mirrors the `Model` into two independently keyed JSON blobs
//! behind a `KeyValueStore` port: loads them once at startup and rewrites whichever
//! blob changed after every transition.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{seed_stories, Person, SessionState, Story, StoryId, View};
use crate::engine::Model;
use crate::ports::{KeyValueStore, PortError, PortResult};

/// Key holding the story collection.
pub const STORIES_KEY: &str = "stichelbuch_stories";
/// Key holding the session/preference state.
pub const SESSION_KEY: &str = "stichelbuch_state";

/// Which halves of the model a transition touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub stories: bool,
    pub session: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.stories || self.session
    }
}

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct StoryRecord {
    id: String,
    person: String,
    term: String,
    category: String,
    story: String,
    #[serde(default)]
    visible: Option<bool>,
    #[serde(default)]
    order: Option<i64>,
}

impl StoryRecord {
    fn from_domain(story: &Story) -> Self {
        Self {
            id: story.id.as_str().to_string(),
            person: story.person.as_str().to_string(),
            term: story.term.clone(),
            category: story.category.clone(),
            story: story.story.clone(),
            visible: Some(story.visible),
            order: Some(story.order),
        }
    }

    fn to_domain(self) -> Option<Story> {
        let person = match self.person.parse::<Person>() {
            Ok(person) => person,
            Err(e) => {
                warn!(story_id = %self.id, "Dropping stored story: {}", e);
                return None;
            }
        };
        Some(Story {
            id: StoryId::new(self.id),
            person,
            term: self.term,
            category: self.category,
            story: self.story,
            visible: self.visible.unwrap_or(true),
            order: self.order.unwrap_or(0),
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    selected_person: Option<String>,
    #[serde(default)]
    selected_story_id: Option<String>,
    #[serde(default)]
    is_logged_in: bool,
    #[serde(default)]
    favorites: Vec<String>,
    #[serde(default)]
    read_status: Vec<String>,
    #[serde(default)]
    dark_mode: bool,
}

impl SessionRecord {
    fn from_domain(session: &SessionState) -> Self {
        Self {
            view: Some(session.view.as_str().to_string()),
            selected_person: session.selected_person.map(|p| p.as_str().to_string()),
            selected_story_id: session
                .selected_story_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            is_logged_in: session.is_logged_in,
            favorites: session.favorites.iter().map(|id| id.as_str().to_string()).collect(),
            read_status: session.read_status.iter().map(|id| id.as_str().to_string()).collect(),
            dark_mode: session.dark_mode,
        }
    }

    fn to_domain(self) -> SessionState {
        let view = self
            .view
            .as_deref()
            .and_then(View::parse)
            .unwrap_or(View::Login);
        let selected_person = self.selected_person.and_then(|p| p.parse::<Person>().ok());
        SessionState {
            view,
            selected_person,
            selected_story_id: self.selected_story_id.map(StoryId::new),
            is_logged_in: self.is_logged_in,
            favorites: self.favorites.into_iter().map(StoryId::new).collect::<BTreeSet<_>>(),
            read_status: self.read_status.into_iter().map(StoryId::new).collect::<BTreeSet<_>>(),
            dark_mode: self.dark_mode,
        }
    }
}

//=========================================================================================
// Blob Codec
//=========================================================================================

pub fn encode_stories(stories: &[Story]) -> serde_json::Result<String> {
    let records: Vec<StoryRecord> = stories.iter().map(StoryRecord::from_domain).collect();
    serde_json::to_string(&records)
}

/// Parses a stored collection. Unknown subjects are dropped and duplicate ids keep
/// their first occurrence.
pub fn decode_stories(blob: &str) -> serde_json::Result<Vec<Story>> {
    let records: Vec<StoryRecord> = serde_json::from_str(blob)?;
    let mut seen = HashSet::new();
    Ok(records
        .into_iter()
        .filter_map(StoryRecord::to_domain)
        .filter(|story| {
            let fresh = seen.insert(story.id.clone());
            if !fresh {
                warn!(story_id = %story.id, "Dropping stored story with duplicate id");
            }
            fresh
        })
        .collect())
}

pub fn encode_session(session: &SessionState) -> serde_json::Result<String> {
    serde_json::to_string(&SessionRecord::from_domain(session))
}

pub fn decode_session(blob: &str) -> serde_json::Result<SessionState> {
    let record: SessionRecord = serde_json::from_str(blob)?;
    Ok(record.to_domain())
}

//=========================================================================================
// StateStore
//=========================================================================================

/// Loads and saves the model through a `KeyValueStore`.
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads both blobs. Never fails: anything absent, unreadable or malformed is
    /// replaced by the seed collection or the default session.
    pub async fn load(&self) -> Model {
        let stories = match self.read(STORIES_KEY).await {
            Some(blob) => decode_stories(&blob).unwrap_or_else(|e| {
                warn!("Stored stories are malformed, falling back to seed: {}", e);
                seed_stories()
            }),
            None => seed_stories(),
        };
        let session = match self.read(SESSION_KEY).await {
            Some(blob) => decode_session(&blob).unwrap_or_else(|e| {
                warn!("Stored session is malformed, falling back to defaults: {}", e);
                SessionState::default()
            }),
            None => SessionState::default(),
        };
        debug!(stories = stories.len(), "Loaded state");
        Model::new(stories, session)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Failed to read stored blob: {}", e);
                None
            }
        }
    }

    pub async fn save_stories(&self, stories: &[Story]) -> PortResult<()> {
        let blob = encode_stories(stories).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.kv.set(STORIES_KEY, &blob).await
    }

    pub async fn save_session(&self, session: &SessionState) -> PortResult<()> {
        let blob = encode_session(session).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.kv.set(SESSION_KEY, &blob).await
    }

    /// Writes the blobs flagged in `changes`, stories first.
    pub async fn persist(&self, model: &Model, changes: Changes) -> PortResult<()> {
        if changes.stories {
            self.save_stories(&model.stories).await?;
        }
        if changes.session {
            self.save_session(&model.session).await?;
        }
        Ok(())
    }
}

//=========================================================================================
// InMemoryStore
//=========================================================================================

/// A volatile `KeyValueStore`, handy for tests and throwaway runs.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str)]) -> (Arc<InMemoryStore>, StateStore) {
        let kv = Arc::new(InMemoryStore::new());
        {
            let mut map = kv.entries.lock().unwrap();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        (kv.clone(), StateStore::new(kv))
    }

    #[tokio::test]
    async fn empty_storage_loads_seed_and_defaults() {
        let (_, store) = store_with(&[]);
        let model = store.load().await;
        assert_eq!(model.stories, seed_stories());
        assert_eq!(model.session, SessionState::default());
    }

    #[tokio::test]
    async fn malformed_blobs_fall_back() {
        let (_, store) = store_with(&[(STORIES_KEY, "{not json"), (SESSION_KEY, "42")]);
        let model = store.load().await;
        assert_eq!(model.stories, seed_stories());
        assert_eq!(model.session, SessionState::default());
    }

    #[tokio::test]
    async fn legacy_fields_get_defaults() {
        let stories = r#"[{"id":"1","person":"Fatih","term":"T","category":"C","story":"S"},
                          {"id":"2","person":"Nobody","term":"T","category":"C","story":"S"},
                          {"id":"1","person":"Andre","term":"Dup","category":"C","story":"S"}]"#;
        let session = r#"{"view":"terms","isLoggedIn":true,"darkMode":true}"#;
        let (_, store) = store_with(&[(STORIES_KEY, stories), (SESSION_KEY, session)]);

        let model = store.load().await;
        assert_eq!(model.stories.len(), 1);
        assert!(model.stories[0].visible);
        assert_eq!(model.stories[0].order, 0);
        assert_eq!(model.stories[0].person, Person::Fatih);

        assert_eq!(model.session.view, View::Terms);
        assert!(model.session.is_logged_in);
        assert!(model.session.dark_mode);
        assert!(model.session.favorites.is_empty());
        assert!(model.session.read_status.is_empty());
    }

    #[tokio::test]
    async fn persisted_state_reloads_equivalently() {
        let (kv, store) = store_with(&[]);
        let mut session = SessionState {
            view: View::Story,
            selected_person: Some(Person::Soufiane),
            selected_story_id: Some(StoryId::new("hg-1")),
            is_logged_in: true,
            dark_mode: true,
            ..SessionState::default()
        };
        session.favorites.insert(StoryId::new("hg-1"));
        session.read_status.insert(StoryId::new("42"));
        let model = Model::new(seed_stories(), session);

        store
            .persist(&model, Changes { stories: true, session: true })
            .await
            .unwrap();

        let reloaded = StateStore::new(kv).load().await;
        assert_eq!(reloaded.stories, model.stories);
        assert_eq!(reloaded.session, model.session);
    }

    #[tokio::test]
    async fn persist_only_writes_changed_blobs() {
        let (kv, store) = store_with(&[]);
        let model = Model::new(seed_stories(), SessionState::default());
        store
            .persist(&model, Changes { stories: false, session: true })
            .await
            .unwrap();
        assert!(kv.get(STORIES_KEY).await.unwrap().is_none());
        assert!(kv.get(SESSION_KEY).await.unwrap().is_some());
    }

    #[test]
    fn session_blob_uses_camel_case_names() {
        let blob = encode_session(&SessionState::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        for key in [
            "view",
            "selectedPerson",
            "selectedStoryId",
            "isLoggedIn",
            "favorites",
            "readStatus",
            "darkMode",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["view"], "login");
    }
}
