use serde::Deserialize;

/// Shortest trimmed query that is worth a round trip to the search endpoint.
pub const MIN_QUERY_LEN: usize = 1;

#[derive(Debug, Default, Deserialize)]
pub struct MovieSearchQuery {
    #[serde(default, alias = "query")]
    pub q: Option<String>,
}

impl MovieSearchQuery {
    /// The trimmed query, if it passes the length guard.
    pub fn searchable(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| is_searchable(q))
    }
}

pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_QUERY_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_guard() {
        assert!(!is_searchable(""));
        assert!(!is_searchable("   "));
        assert!(is_searchable("a"));

        let query: MovieSearchQuery = serde_json::from_str(r#"{ "query": "  dune " }"#).unwrap();
        assert_eq!(query.searchable(), Some("dune"));
        assert_eq!(MovieSearchQuery::default().searchable(), None);
    }
}
