pub mod models;
pub mod pii;

pub use models::{
    Cinema, CinemaDraft, FieldError, Movie, MovieDraft, Role, ShowtimeDay, ShowtimeRecord,
    ShowtimeSlot, Theme, UserRecord,
};
pub use pii::Masked;
