//! crates/stichelbuch_core/src/engine.rs
//!
//! The mutation engine. Every operation takes the current `Model` by reference and
//! returns the next one; nothing here touches storage or decides what gets rendered.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{
    Person, SessionState, Story, StoryDraft, StoryId, ValidStory, View, SHARED_SECRET,
};
use crate::error::{Rejection, ValidationError};
use crate::ports::RandomSource;

/// The story collection together with the session/preference state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub stories: Vec<Story>,
    pub session: SessionState,
    // Highest numeric id ever seen or issued; new ids are always above it.
    last_issued: i64,
}

impl Model {
    pub fn new(stories: Vec<Story>, session: SessionState) -> Self {
        let last_issued = stories
            .iter()
            .filter_map(|s| s.id.as_str().parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            stories,
            session,
            last_issued,
        }
    }

    //=====================================================================================
    // Queries
    //=====================================================================================

    pub fn find_story(&self, id: &StoryId) -> Option<&Story> {
        self.stories.iter().find(|s| &s.id == id)
    }

    /// Stories not hidden, in collection order.
    pub fn visible_stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.iter().filter(|s| s.visible)
    }

    /// Visible stories for `person` (all when `None`) whose term or category contains
    /// `search` case-insensitively, sorted ascending by `order`.
    pub fn list_stories(&self, person: Option<Person>, search: &str) -> Vec<&Story> {
        let needle = search.to_lowercase();
        let mut listing: Vec<&Story> = self
            .visible_stories()
            .filter(|s| person.map_or(true, |p| s.person == p))
            .filter(|s| {
                needle.is_empty()
                    || s.term.to_lowercase().contains(&needle)
                    || s.category.to_lowercase().contains(&needle)
            })
            .collect();
        // Stable, so equal orders keep collection order.
        listing.sort_by_key(|s| s.order);
        listing
    }

    //=====================================================================================
    // Session transitions
    //=====================================================================================

    pub fn login(&self, password: &str) -> Result<Model, Rejection> {
        if password != SHARED_SECRET {
            return Err(Rejection::InvalidPassword);
        }
        let mut next = self.clone();
        next.session.is_logged_in = true;
        next.session.view = View::Home;
        Ok(next)
    }

    /// Drops the login and the navigation position; favorites, read markers and
    /// theme survive.
    pub fn logout(&self) -> Model {
        let mut next = self.clone();
        next.session.is_logged_in = false;
        next.session.view = View::Login;
        next.session.selected_person = None;
        next.session.selected_story_id = None;
        next
    }

    pub fn navigate(
        &self,
        view: View,
        person: Option<Person>,
        story_id: Option<StoryId>,
    ) -> Model {
        let mut next = self.clone();
        next.session.view = view;
        next.session.selected_person = person;
        next.session.selected_story_id = story_id;
        next
    }

    pub fn toggle_theme(&self) -> Model {
        let mut next = self.clone();
        next.session.dark_mode = !next.session.dark_mode;
        next
    }

    pub fn toggle_favorite(&self, id: &StoryId) -> Model {
        let mut next = self.clone();
        if self.find_story(id).is_some() {
            toggle(&mut next.session.favorites, id);
        }
        next
    }

    pub fn toggle_read_status(&self, id: &StoryId) -> Model {
        let mut next = self.clone();
        if self.find_story(id).is_some() {
            toggle(&mut next.session.read_status, id);
        }
        next
    }

    //=====================================================================================
    // Collection mutations
    //=====================================================================================

    /// Validates `draft`, then replaces the story it names or appends a new one.
    /// Returns the next model and the id of the saved story.
    pub fn create_or_update_story(
        &self,
        draft: &StoryDraft,
        now: DateTime<Utc>,
    ) -> Result<(Model, StoryId), ValidationError> {
        let valid = draft.validate()?;
        Ok(self.upsert(valid, now))
    }

    fn upsert(&self, valid: ValidStory, now: DateTime<Utc>) -> (Model, StoryId) {
        let mut next = self.clone();

        if let Some(id) = valid.id.as_ref() {
            if let Some(slot) = next.stories.iter_mut().find(|s| &s.id == id) {
                *slot = Story {
                    id: id.clone(),
                    person: valid.person,
                    term: valid.term,
                    category: valid.category,
                    story: valid.story,
                    visible: valid.visible.unwrap_or(true),
                    order: valid.order.unwrap_or(0),
                };
                debug!(story_id = %id, "Story replaced");
                return (next, id.clone());
            }
        }

        let id = next.issue_id(now);
        let order = next.stories.len() as i64 + 1;
        next.stories.push(Story {
            id: id.clone(),
            person: valid.person,
            term: valid.term,
            category: valid.category,
            story: valid.story,
            visible: true,
            order,
        });
        debug!(story_id = %id, order, "Story created");
        (next, id)
    }

    /// Removes the story and purges it from favorites and read markers.
    /// Navigation consequences are left to the caller.
    pub fn delete_story(&self, id: &StoryId) -> Model {
        let mut next = self.clone();
        next.stories.retain(|s| &s.id != id);
        next.session.favorites.remove(id);
        next.session.read_status.remove(id);
        next
    }

    /// Opens a uniformly chosen visible story, or returns the model unchanged when
    /// every story is hidden.
    pub fn pick_random(&self, rng: &mut dyn RandomSource) -> Model {
        let visible: Vec<&Story> = self.visible_stories().collect();
        if visible.is_empty() {
            return self.clone();
        }
        let index = rng.pick_index(visible.len()).min(visible.len() - 1);
        let picked = visible[index];
        self.navigate(View::Story, Some(picked.person), Some(picked.id.clone()))
    }

    /// Next free numeric id at or after `now`, kept above everything issued before.
    /// Once the top of the range is taken, the free id closest above `now` is used.
    fn issue_id(&mut self, now: DateTime<Utc>) -> StoryId {
        let taken: HashSet<i64> = self
            .stories
            .iter()
            .filter_map(|s| s.id.as_str().parse::<i64>().ok())
            .collect();
        let now_ms = now.timestamp_millis().max(0);
        let start = now_ms.max(self.last_issued.saturating_add(1));
        let candidate = (start..=i64::MAX)
            .chain(now_ms..start)
            .chain((0..now_ms).rev())
            .find(|n| !taken.contains(n))
            .unwrap_or(start);
        self.last_issued = self.last_issued.max(candidate);
        StoryId::new(candidate.to_string())
    }
}

fn toggle(set: &mut BTreeSet<StoryId>, id: &StoryId) {
    if !set.remove(id) {
        set.insert(id.clone());
    }
}
