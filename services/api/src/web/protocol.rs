//! services/api/src/web/protocol.rs
//!
//! Defines the message protocol between the browser front-end and the API server.
//! The same `ClientMessage` travels as a REST body or a WebSocket text frame; the
//! server answers with a `Snapshot` of everything the front-end renders.

use serde::{Deserialize, Serialize};
use stichelbuch_core::domain::UnknownPerson;
use stichelbuch_core::{Action, DraftEdit, Person, Story, StoryBook, StoryDraft, StoryId};
use utoipa::ToSchema;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The actions a client can request. Password and logout have dedicated REST routes
/// but are accepted here too so a WebSocket-only client works.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Login { password: String },
    Logout { confirmed: bool },
    GoHome,
    ShowPersons,
    ShowAllStories,
    SelectPerson { person: String },
    OpenStory { id: String },
    Back,
    SetSearch { text: String },
    Surprise,
    ToggleTheme,
    ToggleFavorite { id: String },
    ToggleReadStatus { id: String },
    NewStory {
        #[serde(default)]
        person: Option<String>,
    },
    EditStory { id: String },
    EditDraft {
        #[serde(default)]
        person: Option<String>,
        #[serde(default)]
        term: Option<String>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        story: Option<String>,
    },
    CancelEdit,
    SaveDraft,
    DeleteStory { id: String, confirmed: bool },
}

impl ClientMessage {
    /// Converts the wire message into a core action; only subject names can be invalid.
    pub fn into_action(self) -> Result<Action, UnknownPerson> {
        let parse_person = |p: Option<String>| p.map(|p| p.parse::<Person>()).transpose();
        Ok(match self {
            ClientMessage::Login { password } => Action::Login { password },
            ClientMessage::Logout { confirmed } => Action::Logout { confirmed },
            ClientMessage::GoHome => Action::GoHome,
            ClientMessage::ShowPersons => Action::ShowPersons,
            ClientMessage::ShowAllStories => Action::ShowAllStories,
            ClientMessage::SelectPerson { person } => Action::SelectPerson(person.parse()?),
            ClientMessage::OpenStory { id } => Action::OpenStory(StoryId::new(id)),
            ClientMessage::Back => Action::Back,
            ClientMessage::SetSearch { text } => Action::SetSearch(text),
            ClientMessage::Surprise => Action::Surprise,
            ClientMessage::ToggleTheme => Action::ToggleTheme,
            ClientMessage::ToggleFavorite { id } => Action::ToggleFavorite(StoryId::new(id)),
            ClientMessage::ToggleReadStatus { id } => Action::ToggleReadStatus(StoryId::new(id)),
            ClientMessage::NewStory { person } => Action::NewStory {
                person: parse_person(person)?,
            },
            ClientMessage::EditStory { id } => Action::EditStory(StoryId::new(id)),
            ClientMessage::EditDraft {
                person,
                term,
                category,
                story,
            } => Action::EditDraft(DraftEdit {
                person: parse_person(person)?,
                term,
                category,
                story,
            }),
            ClientMessage::CancelEdit => Action::CancelEdit,
            ClientMessage::SaveDraft => Action::SaveDraft,
            ClientMessage::DeleteStory { id, confirmed } => Action::DeleteStory {
                id: StoryId::new(id),
                confirmed,
            },
        })
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full renderable state after a transition.
    State(Snapshot),

    /// Reports a malformed client message.
    Error { message: String },
}

/// One story as the front-end shows it in a listing or on its detail page.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct StoryCard {
    pub id: String,
    /// `#0007`-style label shown under the story.
    pub display_id: String,
    pub person: String,
    pub term: String,
    pub category: String,
    pub story: String,
    pub order: i64,
    pub favorite: bool,
    pub read: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct DraftView {
    pub id: Option<String>,
    pub person: Option<String>,
    pub term: String,
    pub category: String,
    pub story: String,
    pub is_new: bool,
}

/// Everything the rendering layer needs to draw the current screen.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Snapshot {
    /// The effective screen, after the login gate and dangling-reference fallbacks.
    pub view: String,
    pub is_logged_in: bool,
    pub dark_mode: bool,
    pub selected_person: Option<String>,
    pub selected_story_id: Option<String>,
    pub favorites: Vec<String>,
    pub read_status: Vec<String>,
    pub search: String,
    pub login_error: bool,
    pub validation_error: Option<String>,
    pub persons: Vec<String>,
    pub stories: Vec<StoryCard>,
    pub story_count: usize,
    pub selected_story: Option<StoryCard>,
    pub draft: Option<DraftView>,
}

impl Snapshot {
    pub fn from_book(book: &StoryBook) -> Self {
        let session = book.session();
        let card = |story: &Story| StoryCard {
            id: story.id.to_string(),
            display_id: story.id.display_label(),
            person: story.person.to_string(),
            term: story.term.clone(),
            category: story.category.clone(),
            story: story.story.clone(),
            order: story.order,
            favorite: book.is_favorite(&story.id),
            read: book.is_read(&story.id),
        };
        let stories: Vec<StoryCard> = book.visible_listing().into_iter().map(card).collect();

        Self {
            view: book.current_view().as_str().to_string(),
            is_logged_in: session.is_logged_in,
            dark_mode: session.dark_mode,
            selected_person: session.selected_person.map(|p| p.to_string()),
            selected_story_id: session.selected_story_id.as_ref().map(|id| id.to_string()),
            favorites: session.favorites.iter().map(|id| id.to_string()).collect(),
            read_status: session.read_status.iter().map(|id| id.to_string()).collect(),
            search: book.search().to_string(),
            login_error: book.login_error(),
            validation_error: book.validation_error().map(|e| e.to_string()),
            persons: book.persons().iter().map(|p| p.to_string()).collect(),
            story_count: stories.len(),
            stories,
            selected_story: book.selected_story().map(card),
            draft: book.draft().map(draft_view),
        }
    }
}

fn draft_view(draft: &StoryDraft) -> DraftView {
    DraftView {
        id: draft.id.as_ref().map(|id| id.to_string()),
        person: draft.person.map(|p| p.to_string()),
        term: draft.term.clone().unwrap_or_default(),
        category: draft.category.clone().unwrap_or_default(),
        story: draft.story.clone().unwrap_or_default(),
        is_new: draft.is_new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"select_person","person":"Fatih"}"#).unwrap();
        assert_eq!(msg.into_action(), Ok(Action::SelectPerson(Person::Fatih)));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"new_story"}"#).unwrap();
        assert_eq!(msg.into_action(), Ok(Action::NewStory { person: None }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"edit_draft","term":"Neu"}"#).unwrap();
        assert_eq!(
            msg.into_action(),
            Ok(Action::EditDraft(DraftEdit {
                term: Some("Neu".to_string()),
                ..DraftEdit::default()
            }))
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"select_person","person":"Nobody"}"#).unwrap();
        assert!(msg.into_action().is_err());
    }

    #[test]
    fn state_message_is_flattened_under_its_tag() {
        use stichelbuch_core::domain::seed_stories;
        use stichelbuch_core::{Model, SessionState};

        let book = StoryBook::new(Model::new(seed_stories(), SessionState::default()));
        let json = serde_json::to_value(ServerMessage::State(Snapshot::from_book(&book))).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["view"], "login");
        assert_eq!(json["persons"][0], "Andre");
    }
}
