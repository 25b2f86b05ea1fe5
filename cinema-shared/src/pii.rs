use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for secrets (tokens, passwords) that hides its value from Debug and
/// Display output. Serialization still writes the real value, since tokens have
/// to reach the storage layer and the upstream APIs intact.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl Masked<String> {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secret() {
        let token = Masked("eyJhbGciOi.secret".to_string());
        assert_eq!(format!("{:?}", token), "********");
        assert_eq!(format!("{}", token), "********");
        assert_eq!(token.as_str(), "eyJhbGciOi.secret");
    }

    #[test]
    fn test_serializes_real_value() {
        let token = Masked("abc".to_string());
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
        let back: Masked<String> = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, token);
    }
}
