//! crates/stichelbuch_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or wire format; the
//! persisted shape lives in `store.rs` and the HTTP shape in the api service.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The shared secret that unlocks the book. Compared exactly, case-sensitive.
pub const SHARED_SECRET: &str = "Hundegesicht";

/// Category pre-filled into every fresh draft.
pub const DEFAULT_CATEGORY: &str = "Allgemein";

//=========================================================================================
// Subjects
//=========================================================================================

/// One of the fixed subjects a story can be about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Person {
    Andre,
    Erhan,
    Fatih,
    Orhan,
    Soufiane,
}

impl Person {
    /// Every subject, sorted ascending by name.
    pub const ALL: [Person; 5] = [
        Person::Andre,
        Person::Erhan,
        Person::Fatih,
        Person::Orhan,
        Person::Soufiane,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Person::Andre => "Andre",
            Person::Erhan => "Erhan",
            Person::Fatih => "Fatih",
            Person::Orhan => "Orhan",
            Person::Soufiane => "Soufiane",
        }
    }

    /// The subject a new draft gets when nobody is selected.
    pub fn default_subject() -> Person {
        Person::ALL[0]
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown person: {0}")]
pub struct UnknownPerson(pub String);

impl FromStr for Person {
    type Err = UnknownPerson;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Person::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPerson(s.to_string()))
    }
}

//=========================================================================================
// Stories
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoryId(String);

impl StoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label shown under a story, e.g. `7` becomes `#0007`.
    pub fn display_label(&self) -> String {
        format!("#{:0>4}", self.0)
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single curated insider story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub id: StoryId,
    pub person: Person,
    pub term: String,
    pub category: String,
    pub story: String,
    pub visible: bool,
    pub order: i64,
}

/// An in-progress story held by the editor. Every field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryDraft {
    pub id: Option<StoryId>,
    pub person: Option<Person>,
    pub term: Option<String>,
    pub category: Option<String>,
    pub story: Option<String>,
    pub visible: Option<bool>,
    pub order: Option<i64>,
}

/// A draft that passed validation. Only `StoryDraft::validate` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStory {
    pub id: Option<StoryId>,
    pub person: Person,
    pub term: String,
    pub category: String,
    pub story: String,
    pub visible: Option<bool>,
    pub order: Option<i64>,
}

impl StoryDraft {
    /// A blank draft for a new story about `person` (or the default subject).
    pub fn fresh(person: Option<Person>) -> Self {
        Self {
            person: Some(person.unwrap_or_else(Person::default_subject)),
            category: Some(DEFAULT_CATEGORY.to_string()),
            term: Some(String::new()),
            story: Some(String::new()),
            ..Self::default()
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Checks that person, term, category and story are all present and non-blank.
    pub fn validate(&self) -> Result<ValidStory, ValidationError> {
        fn filled(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }

        let mut missing = Vec::new();
        if self.person.is_none() {
            missing.push("person");
        }
        let term = filled(&self.term);
        if term.is_none() {
            missing.push("term");
        }
        let category = filled(&self.category);
        if category.is_none() {
            missing.push("category");
        }
        let story = filled(&self.story);
        if story.is_none() {
            missing.push("story");
        }

        match (self.person, term, category, story) {
            (Some(person), Some(term), Some(category), Some(story)) => Ok(ValidStory {
                id: self.id.clone(),
                person,
                term: term.to_string(),
                category: category.to_string(),
                story: story.to_string(),
                visible: self.visible,
                order: self.order,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }
}

impl From<&Story> for StoryDraft {
    fn from(story: &Story) -> Self {
        Self {
            id: Some(story.id.clone()),
            person: Some(story.person),
            term: Some(story.term.clone()),
            category: Some(story.category.clone()),
            story: Some(story.story.clone()),
            visible: Some(story.visible),
            order: Some(story.order),
        }
    }
}

/// The collection a first launch starts from.
pub fn seed_stories() -> Vec<Story> {
    vec![Story {
        id: StoryId::new("hg-1"),
        person: Person::Erhan,
        term: "Hundegesicht".to_string(),
        category: "Insider".to_string(),
        story: "Das ultimative Passwort und der Inbegriff der Stichel-Kultur. Wer dieses \
                Gesicht zieht, hat die Diskussion bereits gewonnen. Es ist mehr als nur ein \
                Begriff, es ist eine Lebenseinstellung, die den Kern der Stichelbuch-Saga markiert."
            .to_string(),
        visible: true,
        order: 1,
    }]
}

//=========================================================================================
// Session & Preferences
//=========================================================================================

/// The screens the book can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Home,
    PersonsList,
    Terms,
    Story,
    Editor,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Login => "login",
            View::Home => "home",
            View::PersonsList => "persons_list",
            View::Terms => "terms",
            View::Story => "story",
            View::Editor => "editor",
        }
    }

    pub fn parse(value: &str) -> Option<View> {
        match value {
            "login" => Some(View::Login),
            "home" => Some(View::Home),
            "persons_list" => Some(View::PersonsList),
            "terms" => Some(View::Terms),
            "story" => Some(View::Story),
            "editor" => Some(View::Editor),
            _ => None,
        }
    }
}

// Navigation position, login gate and personal markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub view: View,
    pub selected_person: Option<Person>,
    pub selected_story_id: Option<StoryId>,
    pub is_logged_in: bool,
    pub favorites: BTreeSet<StoryId>,
    pub read_status: BTreeSet<StoryId>,
    pub dark_mode: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            view: View::Login,
            selected_person: None,
            selected_story_id: None,
            is_logged_in: false,
            favorites: BTreeSet::new(),
            read_status: BTreeSet::new(),
            dark_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persons_are_sorted_by_name() {
        let names: Vec<&str> = Person::ALL.iter().map(Person::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(Person::default_subject(), Person::Andre);
    }

    #[test]
    fn person_parsing_is_exact() {
        assert_eq!("Orhan".parse::<Person>(), Ok(Person::Orhan));
        assert!("orhan".parse::<Person>().is_err());
        assert!("Bob".parse::<Person>().is_err());
    }

    #[test]
    fn display_label_pads_short_ids() {
        assert_eq!(StoryId::new("7").display_label(), "#0007");
        assert_eq!(StoryId::new("hg-1").display_label(), "#hg-1");
        assert_eq!(StoryId::new("1700000000000").display_label(), "#1700000000000");
    }

    #[test]
    fn fresh_draft_uses_defaults() {
        let draft = StoryDraft::fresh(None);
        assert_eq!(draft.person, Some(Person::Andre));
        assert_eq!(draft.category.as_deref(), Some(DEFAULT_CATEGORY));
        assert!(draft.is_new());

        let draft = StoryDraft::fresh(Some(Person::Fatih));
        assert_eq!(draft.person, Some(Person::Fatih));
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let draft = StoryDraft {
            person: Some(Person::Erhan),
            term: Some("  ".to_string()),
            category: None,
            story: Some("Body".to_string()),
            ..StoryDraft::default()
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingFields(vec!["term", "category"]))
        );
    }

    #[test]
    fn validation_keeps_identity_fields() {
        let seed = seed_stories().remove(0);
        let valid = StoryDraft::from(&seed).validate().expect("seed is valid");
        assert_eq!(valid.id, Some(seed.id));
        assert_eq!(valid.order, Some(1));
        assert_eq!(valid.visible, Some(true));
    }

    #[test]
    fn view_names_round_trip() {
        for view in [
            View::Login,
            View::Home,
            View::PersonsList,
            View::Terms,
            View::Story,
            View::Editor,
        ] {
            assert_eq!(View::parse(view.as_str()), Some(view));
        }
        assert_eq!(View::parse("settings"), None);
    }
}
