pub mod db;
pub mod models;
pub mod notes;
pub mod schema;
pub mod store;
pub mod tags;
pub mod time_serde;

mod error;

pub use error::Error;
pub use models::{AttachedTag, Note, Tag};
pub use store::{BoxFuture, NoteStore, TagMatch};

pub type Result<T, E = Error> = std::result::Result<T, E>;
