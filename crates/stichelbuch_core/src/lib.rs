pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod store;
pub mod view;

pub use domain::{
    Person, SessionState, Story, StoryDraft, StoryId, ValidStory, View, DEFAULT_CATEGORY,
    SHARED_SECRET,
};
pub use engine::Model;
pub use error::{Rejection, ValidationError};
pub use ports::{KeyValueStore, PortError, PortResult, RandomSource};
pub use store::{Changes, InMemoryStore, StateStore};
pub use view::{Action, DraftEdit, Effect, StoryBook, Transition, LOGIN_ERROR_DISPLAY};
