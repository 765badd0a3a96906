//! crates/stichelbuch_core/src/view.rs
//!
//! The view-state machine. `StoryBook` owns the `Model` plus the transient input a
//! rendering layer feeds it (search text, the editor draft, the login error flag),
//! turns discrete actions into transitions, and derives everything that is shown.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{Person, SessionState, Story, StoryDraft, StoryId, View};
use crate::engine::Model;
use crate::error::{Rejection, ValidationError};
use crate::ports::RandomSource;
use crate::store::Changes;

/// How long the "access denied" indicator stays up after a failed login.
pub const LOGIN_ERROR_DISPLAY: Duration = Duration::from_secs(2);

//=========================================================================================
// Actions & Transitions
//=========================================================================================

/// Partial update of the editor draft. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEdit {
    pub person: Option<Person>,
    pub term: Option<String>,
    pub category: Option<String>,
    pub story: Option<String>,
}

/// Everything the rendering layer can ask the book to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login { password: String },
    /// Fired by the timer scheduled through `Effect::ScheduleLoginErrorClear`.
    ClearLoginError { ticket: u64 },
    Logout { confirmed: bool },
    GoHome,
    ShowPersons,
    ShowAllStories,
    SelectPerson(Person),
    OpenStory(StoryId),
    Back,
    SetSearch(String),
    Surprise,
    ToggleTheme,
    ToggleFavorite(StoryId),
    ToggleReadStatus(StoryId),
    NewStory { person: Option<Person> },
    EditStory(StoryId),
    EditDraft(DraftEdit),
    CancelEdit,
    SaveDraft,
    DeleteStory { id: StoryId, confirmed: bool },
}

/// Follow-up work the host has to schedule on the book's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ScheduleLoginErrorClear { ticket: u64, after: Duration },
}

/// What one `dispatch` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Parts of the model that must be written back to storage.
    pub changes: Changes,
    pub effect: Option<Effect>,
    pub rejected: Option<Rejection>,
}

impl Transition {
    fn rejected(reason: Rejection) -> Self {
        Self {
            rejected: Some(reason),
            ..Self::default()
        }
    }
}

//=========================================================================================
// StoryBook
//=========================================================================================

pub struct StoryBook {
    model: Model,
    search: String,
    draft: Option<StoryDraft>,
    login_error: Option<u64>,
    next_ticket: u64,
    validation_error: Option<ValidationError>,
}

impl StoryBook {
    pub fn new(model: Model) -> Self {
        // Drafts are never persisted; a restart inside the editor starts over.
        let draft = (model.session.is_logged_in && model.session.view == View::Editor)
            .then(|| StoryDraft::fresh(model.session.selected_person));
        Self {
            model,
            search: String::new(),
            draft,
            login_error: None,
            next_ticket: 1,
            validation_error: None,
        }
    }

    pub fn dispatch(
        &mut self,
        action: Action,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Transition {
        let before = self.model.clone();
        let mut transition = self.apply(action, rng, now);
        transition.changes = Changes {
            stories: before.stories != self.model.stories,
            session: before.session != self.model.session,
        };
        transition
    }

    fn apply(
        &mut self,
        action: Action,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Transition {
        match action {
            Action::Login { password } => return self.login(&password),
            Action::ClearLoginError { ticket } => {
                if self.login_error == Some(ticket) {
                    self.login_error = None;
                }
                return Transition::default();
            }
            _ if !self.model.session.is_logged_in => {
                debug!(?action, "Ignoring action while logged out");
                return Transition::rejected(Rejection::NotLoggedIn);
            }
            _ => {}
        }

        match action {
            Action::Login { .. } | Action::ClearLoginError { .. } => {}
            Action::Logout { confirmed } => {
                if confirmed {
                    info!("Logged out");
                    self.model = self.model.logout();
                    self.search.clear();
                    self.draft = None;
                    self.validation_error = None;
                    self.login_error = None;
                }
            }
            Action::GoHome => self.go(View::Home, None, None),
            Action::ShowPersons => self.go(View::PersonsList, None, None),
            Action::ShowAllStories => self.go(View::Terms, None, None),
            Action::SelectPerson(person) => self.go(View::Terms, Some(person), None),
            Action::OpenStory(id) => {
                if let Some(person) = self.model.find_story(&id).map(|s| s.person) {
                    self.go(View::Story, Some(person), Some(id));
                }
            }
            Action::Back => self.back(),
            Action::SetSearch(text) => self.search = text,
            Action::Surprise => self.model = self.model.pick_random(rng),
            Action::ToggleTheme => self.model = self.model.toggle_theme(),
            Action::ToggleFavorite(id) => self.model = self.model.toggle_favorite(&id),
            Action::ToggleReadStatus(id) => self.model = self.model.toggle_read_status(&id),
            Action::NewStory { person } => {
                self.draft = Some(StoryDraft::fresh(person));
                self.validation_error = None;
                self.go(View::Editor, None, None);
            }
            Action::EditStory(id) => {
                if let Some(story) = self.model.find_story(&id) {
                    self.draft = Some(StoryDraft::from(story));
                    self.validation_error = None;
                    self.go(View::Editor, None, None);
                }
            }
            Action::EditDraft(edit) => {
                if let Some(draft) = self.draft.as_mut() {
                    apply_edit(draft, edit);
                }
            }
            Action::CancelEdit => self.cancel_edit(),
            Action::SaveDraft => return self.save_draft(now),
            Action::DeleteStory { id, confirmed } => {
                if confirmed {
                    self.delete_story(&id);
                }
            }
        }
        Transition::default()
    }

    fn go(&mut self, view: View, person: Option<Person>, story_id: Option<StoryId>) {
        self.model = self.model.navigate(view, person, story_id);
    }

    fn login(&mut self, password: &str) -> Transition {
        match self.model.login(password) {
            Ok(next) => {
                info!("Login succeeded");
                self.model = next;
                self.login_error = None;
                Transition::default()
            }
            Err(reason) => {
                warn!("Login rejected");
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                self.login_error = Some(ticket);
                Transition {
                    effect: Some(Effect::ScheduleLoginErrorClear {
                        ticket,
                        after: LOGIN_ERROR_DISPLAY,
                    }),
                    ..Transition::rejected(reason)
                }
            }
        }
    }

    fn back(&mut self) {
        let person = self.model.session.selected_person;
        match self.current_view() {
            View::PersonsList => self.go(View::Home, None, None),
            View::Terms if person.is_some() => self.go(View::PersonsList, None, None),
            View::Terms => self.go(View::Home, None, None),
            View::Story => self.go(View::Terms, person, None),
            View::Editor => self.cancel_edit(),
            View::Home | View::Login => {}
        }
    }

    fn cancel_edit(&mut self) {
        let Some(draft) = self.draft.take() else {
            return;
        };
        self.validation_error = None;
        match draft.id {
            Some(id) => self.go(View::Story, draft.person, Some(id)),
            None => {
                let person = self.model.session.selected_person;
                self.go(View::Terms, person, None);
            }
        }
    }

    fn save_draft(&mut self, now: DateTime<Utc>) -> Transition {
        let Some(draft) = self.draft.as_ref() else {
            return Transition::default();
        };
        match self.model.create_or_update_story(draft, now) {
            Ok((next, id)) => {
                let person = next.find_story(&id).map(|s| s.person);
                self.model = next.navigate(View::Story, person, Some(id));
                self.draft = None;
                self.validation_error = None;
                Transition::default()
            }
            Err(e) => {
                debug!("Draft rejected: {}", e);
                self.validation_error = Some(e.clone());
                Transition::rejected(e.into())
            }
        }
    }

    fn delete_story(&mut self, id: &StoryId) {
        let was_open = self.model.session.view == View::Story
            && self.model.session.selected_story_id.as_ref() == Some(id);
        self.model = self.model.delete_story(id);
        info!(story_id = %id, "Story deleted");
        if was_open {
            let person = self.model.session.selected_person;
            self.go(View::Terms, person, None);
        }
    }

    //=====================================================================================
    // Presentation
    //=====================================================================================

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn session(&self) -> &SessionState {
        &self.model.session
    }

    /// The screen to render. Logged-out sessions always see the login screen, and a
    /// story or editor with nothing to show falls back to the listing.
    pub fn current_view(&self) -> View {
        let session = &self.model.session;
        if !session.is_logged_in {
            return View::Login;
        }
        match session.view {
            View::Story if self.selected_story().is_none() => View::Terms,
            View::Editor if self.draft.is_none() => View::Terms,
            view => view,
        }
    }

    /// Visible stories for the selected person and the current search text. Empty
    /// while logged out.
    pub fn visible_listing(&self) -> Vec<&Story> {
        if !self.model.session.is_logged_in {
            return Vec::new();
        }
        self.model
            .list_stories(self.model.session.selected_person, &self.search)
    }

    pub fn selected_story(&self) -> Option<&Story> {
        if !self.model.session.is_logged_in {
            return None;
        }
        self.model
            .session
            .selected_story_id
            .as_ref()
            .and_then(|id| self.model.find_story(id))
    }

    pub fn persons(&self) -> &'static [Person] {
        &Person::ALL
    }

    pub fn draft(&self) -> Option<&StoryDraft> {
        self.draft.as_ref().filter(|_| self.model.session.is_logged_in)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn login_error(&self) -> bool {
        self.login_error.is_some()
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn is_favorite(&self, id: &StoryId) -> bool {
        self.model.session.favorites.contains(id)
    }

    pub fn is_read(&self, id: &StoryId) -> bool {
        self.model.session.read_status.contains(id)
    }
}

fn apply_edit(draft: &mut StoryDraft, edit: DraftEdit) {
    if let Some(person) = edit.person {
        draft.person = Some(person);
    }
    if let Some(term) = edit.term {
        draft.term = Some(term);
    }
    if let Some(category) = edit.category {
        draft.category = Some(category);
    }
    if let Some(story) = edit.story {
        draft.story = Some(story);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{seed_stories, DEFAULT_CATEGORY, SHARED_SECRET};
    use crate::engine::tests::{at, ScriptedRandom};

    fn book() -> StoryBook {
        StoryBook::new(Model::new(seed_stories(), SessionState::default()))
    }

    fn run(book: &mut StoryBook, action: Action) -> Transition {
        book.dispatch(action, &mut ScriptedRandom(vec![0]), at(1_700_000_000_000))
    }

    fn logged_in() -> StoryBook {
        let mut book = book();
        run(&mut book, Action::Login { password: SHARED_SECRET.to_string() });
        book
    }

    fn hg1() -> StoryId {
        StoryId::new("hg-1")
    }

    #[test]
    fn logged_out_book_hides_every_story() {
        let session = SessionState {
            view: View::Story,
            selected_story_id: Some(hg1()),
            ..SessionState::default()
        };
        let book = StoryBook::new(Model::new(seed_stories(), session));
        assert_eq!(book.current_view(), View::Login);
        assert!(book.visible_listing().is_empty());
        assert!(book.selected_story().is_none());
        assert!(book.draft().is_none());
    }

    #[test]
    fn starts_on_login_and_gates_actions() {
        let mut book = book();
        assert_eq!(book.current_view(), View::Login);

        let t = run(&mut book, Action::GoHome);
        assert_eq!(t.rejected, Some(Rejection::NotLoggedIn));
        assert!(!t.changes.any());
        assert_eq!(book.current_view(), View::Login);
    }

    #[test]
    fn stored_view_is_ignored_while_logged_out() {
        let session = SessionState {
            view: View::Terms,
            ..SessionState::default()
        };
        let book = StoryBook::new(Model::new(seed_stories(), session));
        assert_eq!(book.current_view(), View::Login);
    }

    #[test]
    fn failed_login_raises_error_until_its_own_ticket_clears_it() {
        let mut book = book();
        let first = run(&mut book, Action::Login { password: "wrong".to_string() });
        assert_eq!(first.rejected, Some(Rejection::InvalidPassword));
        assert!(!first.changes.any());
        assert!(book.login_error());
        let Some(Effect::ScheduleLoginErrorClear { ticket: t1, after }) = first.effect else {
            panic!("expected a clear timer");
        };
        assert_eq!(after, LOGIN_ERROR_DISPLAY);

        let second = run(&mut book, Action::Login { password: "still wrong".to_string() });
        let Some(Effect::ScheduleLoginErrorClear { ticket: t2, .. }) = second.effect else {
            panic!("expected a clear timer");
        };
        assert_ne!(t1, t2);

        // The first timer fires late; the newer error must survive it.
        run(&mut book, Action::ClearLoginError { ticket: t1 });
        assert!(book.login_error());
        run(&mut book, Action::ClearLoginError { ticket: t2 });
        assert!(!book.login_error());
        assert!(!book.session().is_logged_in);
    }

    #[test]
    fn successful_login_lands_on_home() {
        let mut book = book();
        run(&mut book, Action::Login { password: "nope".to_string() });
        let t = run(&mut book, Action::Login { password: SHARED_SECRET.to_string() });
        assert_eq!(t.rejected, None);
        assert!(t.changes.session);
        assert!(!t.changes.stories);
        assert!(!book.login_error());
        assert_eq!(book.current_view(), View::Home);
    }

    #[test]
    fn browsing_by_person_and_back() {
        let mut book = logged_in();
        run(&mut book, Action::ShowPersons);
        assert_eq!(book.current_view(), View::PersonsList);
        assert_eq!(book.persons()[0], Person::Andre);

        run(&mut book, Action::SelectPerson(Person::Erhan));
        assert_eq!(book.current_view(), View::Terms);
        assert_eq!(book.visible_listing().len(), 1);

        run(&mut book, Action::OpenStory(hg1()));
        assert_eq!(book.current_view(), View::Story);
        assert_eq!(book.selected_story().map(|s| s.term.as_str()), Some("Hundegesicht"));

        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Terms);
        assert_eq!(book.session().selected_person, Some(Person::Erhan));

        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::PersonsList);
        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Home);
    }

    #[test]
    fn opening_from_full_listing_scopes_to_story_person() {
        let mut book = logged_in();
        run(&mut book, Action::ShowAllStories);
        assert_eq!(book.session().selected_person, None);

        run(&mut book, Action::OpenStory(hg1()));
        assert_eq!(book.current_view(), View::Story);
        assert_eq!(book.session().selected_person, Some(Person::Erhan));

        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Terms);
        assert_eq!(book.session().selected_person, Some(Person::Erhan));
    }

    #[test]
    fn all_stories_listing_goes_back_home() {
        let mut book = logged_in();
        run(&mut book, Action::ShowAllStories);
        assert_eq!(book.session().selected_person, None);
        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Home);
    }

    #[test]
    fn search_narrows_listing_without_touching_storage() {
        let mut book = logged_in();
        run(&mut book, Action::ShowAllStories);
        let t = run(&mut book, Action::SetSearch("INSID".to_string()));
        assert!(!t.changes.any());
        assert_eq!(book.visible_listing().len(), 1);

        run(&mut book, Action::SetSearch("zzz".to_string()));
        assert!(book.visible_listing().is_empty());
    }

    #[test]
    fn surprise_opens_a_visible_story() {
        let mut book = logged_in();
        run(&mut book, Action::Surprise);
        assert_eq!(book.current_view(), View::Story);
        assert_eq!(book.session().selected_person, Some(Person::Erhan));
        assert_eq!(book.session().selected_story_id, Some(hg1()));
    }

    #[test]
    fn new_story_round_trip_through_editor() {
        let mut book = logged_in();
        run(&mut book, Action::SelectPerson(Person::Orhan));
        run(&mut book, Action::NewStory { person: Some(Person::Orhan) });
        assert_eq!(book.current_view(), View::Editor);
        let draft = book.draft().unwrap();
        assert_eq!(draft.person, Some(Person::Orhan));
        assert_eq!(draft.category.as_deref(), Some(DEFAULT_CATEGORY));

        // Incomplete draft stays in the editor untouched.
        let t = run(&mut book, Action::SaveDraft);
        assert!(matches!(t.rejected, Some(Rejection::Validation(_))));
        assert!(!t.changes.any());
        assert_eq!(book.current_view(), View::Editor);
        assert!(book.validation_error().is_some());

        run(
            &mut book,
            Action::EditDraft(DraftEdit {
                term: Some("Test".to_string()),
                story: Some("Body".to_string()),
                ..DraftEdit::default()
            }),
        );
        let t = run(&mut book, Action::SaveDraft);
        assert_eq!(t.rejected, None);
        assert!(t.changes.stories);
        assert!(t.changes.session);
        assert_eq!(book.current_view(), View::Story);
        assert!(book.draft().is_none());
        assert!(book.validation_error().is_none());

        let saved = book.selected_story().unwrap();
        assert_eq!(saved.term, "Test");
        assert_eq!(saved.person, Person::Orhan);
        assert_eq!(saved.order, 2);
    }

    #[test]
    fn cancel_returns_to_origin() {
        let mut book = logged_in();
        run(&mut book, Action::SelectPerson(Person::Fatih));
        run(&mut book, Action::NewStory { person: Some(Person::Fatih) });
        // The editor drops the person filter; the draft keeps the preference.
        assert_eq!(book.session().selected_person, None);
        assert_eq!(book.draft().and_then(|d| d.person), Some(Person::Fatih));
        run(&mut book, Action::CancelEdit);
        assert_eq!(book.current_view(), View::Terms);
        assert_eq!(book.session().selected_person, None);

        run(&mut book, Action::EditStory(hg1()));
        assert_eq!(book.current_view(), View::Editor);
        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Story);
        assert_eq!(book.session().selected_story_id, Some(hg1()));
    }

    #[test]
    fn editing_keeps_id_and_overwrites_fields() {
        let mut book = logged_in();
        run(&mut book, Action::EditStory(hg1()));
        run(
            &mut book,
            Action::EditDraft(DraftEdit {
                category: Some("Legende".to_string()),
                ..DraftEdit::default()
            }),
        );
        run(&mut book, Action::SaveDraft);
        assert_eq!(book.model().stories.len(), 1);
        let story = book.selected_story().unwrap();
        assert_eq!(story.id, hg1());
        assert_eq!(story.category, "Legende");
        assert_eq!(story.order, 1);
    }

    #[test]
    fn delete_needs_confirmation_and_leaves_open_story() {
        let mut book = logged_in();
        run(&mut book, Action::SelectPerson(Person::Erhan));
        run(&mut book, Action::OpenStory(hg1()));
        run(&mut book, Action::ToggleFavorite(hg1()));
        run(&mut book, Action::ToggleReadStatus(hg1()));
        assert!(book.is_favorite(&hg1()));
        assert!(book.is_read(&hg1()));

        let t = run(&mut book, Action::DeleteStory { id: hg1(), confirmed: false });
        assert!(!t.changes.any());
        assert_eq!(book.model().stories.len(), 1);

        let t = run(&mut book, Action::DeleteStory { id: hg1(), confirmed: true });
        assert!(t.changes.stories && t.changes.session);
        assert!(book.model().stories.is_empty());
        assert!(!book.is_favorite(&hg1()));
        assert!(!book.is_read(&hg1()));
        assert_eq!(book.current_view(), View::Terms);
        assert_eq!(book.session().selected_person, Some(Person::Erhan));
    }

    #[test]
    fn dangling_story_falls_back_to_listing() {
        let session = SessionState {
            view: View::Story,
            selected_story_id: Some(StoryId::new("gone")),
            is_logged_in: true,
            ..SessionState::default()
        };
        let mut book = StoryBook::new(Model::new(seed_stories(), session));
        assert_eq!(book.current_view(), View::Terms);
        assert!(book.selected_story().is_none());

        run(&mut book, Action::Back);
        assert_eq!(book.current_view(), View::Home);
    }

    #[test]
    fn restart_inside_editor_opens_fresh_draft() {
        let session = SessionState {
            view: View::Editor,
            selected_person: Some(Person::Soufiane),
            is_logged_in: true,
            ..SessionState::default()
        };
        let book = StoryBook::new(Model::new(seed_stories(), session));
        assert_eq!(book.current_view(), View::Editor);
        assert_eq!(book.draft().and_then(|d| d.person), Some(Person::Soufiane));
    }

    #[test]
    fn logout_requires_confirmation_and_clears_transients() {
        let mut book = logged_in();
        run(&mut book, Action::ToggleTheme);
        run(&mut book, Action::ToggleFavorite(hg1()));
        run(&mut book, Action::SetSearch("hund".to_string()));

        run(&mut book, Action::Logout { confirmed: false });
        assert_eq!(book.current_view(), View::Home);

        let t = run(&mut book, Action::Logout { confirmed: true });
        assert!(t.changes.session);
        assert_eq!(book.current_view(), View::Login);
        assert_eq!(book.search(), "");
        assert!(book.session().dark_mode);
        assert!(book.is_favorite(&hg1()));
    }
}
