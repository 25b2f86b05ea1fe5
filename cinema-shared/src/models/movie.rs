use serde::{Deserialize, Deserializer, Serialize};

use super::{id_from_string_or_number, FieldError};

/// A movie as returned by the catalog backend. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default, alias = "genre", deserialize_with = "one_or_many")]
    pub genres: Vec<String>,
    /// Running time in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, alias = "poster")]
    pub poster_url: Option<String>,
    #[serde(default, alias = "heroImage")]
    pub hero_image_url: Option<String>,
    #[serde(default, alias = "description")]
    pub synopsis: Option<String>,
    #[serde(default, alias = "trailer")]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub showtimes: Vec<ShowtimeDay>,
}

impl Movie {
    /// Looks up a screening slot by date and time.
    pub fn showtime_slot(&self, date: &str, time: &str) -> Option<&ShowtimeSlot> {
        self.showtimes
            .iter()
            .filter(|day| day.date == date)
            .flat_map(|day| day.times.iter())
            .find(|slot| slot.time() == time)
    }

    pub fn has_showtime(&self, date: &str, time: &str) -> bool {
        self.showtime_slot(date, time).is_some()
    }
}

/// All screenings of a movie on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeDay {
    pub date: String,
    #[serde(default, alias = "slots", alias = "showtimes")]
    pub times: Vec<ShowtimeSlot>,
}

/// Backends send either bare `"HH:MM"` strings or richer records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ShowtimeSlot {
    Time(String),
    Detailed(ShowtimeRecord),
}

impl ShowtimeSlot {
    pub fn time(&self) -> &str {
        match self {
            ShowtimeSlot::Time(time) => time,
            ShowtimeSlot::Detailed(record) => &record.time,
        }
    }

    pub fn room(&self) -> Option<&str> {
        match self {
            ShowtimeSlot::Time(_) => None,
            ShowtimeSlot::Detailed(record) => record.room.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeRecord {
    pub time: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default, alias = "availability")]
    pub available_seats: Option<u32>,
}

/// Admin-editable fields of a licensed movie.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieDraft {
    pub title: String,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub showtimes: Vec<ShowtimeDay>,
}

impl MovieDraft {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }
        match self.duration {
            Some(0) | None => errors.push(FieldError::new("duration", "Duration must be greater than zero")),
            Some(_) => {}
        }
        if let Some(rating) = self.rating {
            if !(0.0..=10.0).contains(&rating) {
                errors.push(FieldError::new("rating", "Rating must be between 0 and 10"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(genre)) => vec![genre],
        Some(OneOrMany::Many(genres)) => genres,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_accepts_both_showtime_shapes() {
        let json = r#"
            {
                "id": 42,
                "title": "Dune",
                "genre": "Sci-Fi",
                "duration": 155,
                "poster": "https://cdn.example/dune.jpg",
                "showtimes": [
                    { "date": "2024-12-25", "times": ["18:00", "21:30"] },
                    { "date": "2024-12-26", "times": [{ "time": "20:00", "room": "Sala 3", "availableSeats": 40 }] }
                ]
            }
        "#;
        let movie: Movie = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(movie.id, "42");
        assert_eq!(movie.genres, vec!["Sci-Fi".to_string()]);
        assert_eq!(movie.poster_url.as_deref(), Some("https://cdn.example/dune.jpg"));
        assert!(movie.has_showtime("2024-12-25", "21:30"));
        assert_eq!(movie.showtime_slot("2024-12-26", "20:00").unwrap().room(), Some("Sala 3"));
        assert!(!movie.has_showtime("2024-12-26", "18:00"));
    }

    #[test]
    fn test_draft_validation_reports_every_field() {
        let draft = MovieDraft {
            title: "  ".to_string(),
            duration: Some(0),
            rating: Some(11.0),
            ..Default::default()
        };
        let errors = draft.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "duration", "rating"]);
    }
}
