use serde::{Deserialize, Serialize};

use super::{id_from_string_or_number, FieldError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cinema {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "roomCount")]
    pub rooms: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CinemaDraft {
    pub name: String,
    pub address: String,
    pub city: String,
    pub rooms: u32,
}

impl CinemaDraft {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for (field, value) in [("name", &self.name), ("address", &self.address), ("city", &self.city)] {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "This field is required"));
            }
        }
        if self.rooms == 0 {
            errors.push(FieldError::new("rooms", "A cinema needs at least one room"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
