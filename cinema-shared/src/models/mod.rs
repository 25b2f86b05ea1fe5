mod cinema;
mod movie;
mod theme;
mod user;

pub use cinema::{Cinema, CinemaDraft};
pub use movie::{Movie, MovieDraft, ShowtimeDay, ShowtimeRecord, ShowtimeSlot};
pub use theme::Theme;
pub use user::{Role, UserRecord};

use serde::{Deserialize, Deserializer, Serialize};

/// A single inline validation message bound to a form field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
}

/// Backend ids arrive either as JSON strings or integers.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
    })
}
