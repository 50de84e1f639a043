//! Inverted index from search tokens to movie ids.

use std::collections::{BTreeSet, HashMap};

use super::types::{MovieId, MovieRecord};

/// Maps lower-cased tokens (titles, alternate titles, genres, tags) to the
/// ids carrying them.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    tokens: HashMap<String, BTreeSet<MovieId>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index holding the title of every record.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MovieRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.add(&record.title, record.id);
        }
        index
    }

    /// Associate `token` with `id`. Adding the same pair twice has no effect;
    /// blank tokens are ignored.
    pub fn add(&mut self, token: &str, id: MovieId) {
        let token = normalize(token);
        if token.is_empty() {
            return;
        }
        self.tokens.entry(token).or_default().insert(id);
    }

    /// Ids owning a stored token that occurs within the lower-cased query.
    pub fn find(&self, query: &str) -> BTreeSet<MovieId> {
        let query = normalize(query);
        if query.is_empty() {
            return BTreeSet::new();
        }
        self.tokens
            .iter()
            .filter(|(token, _)| query.contains(token.as_str()))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str, id: MovieId) -> bool {
        self.tokens
            .get(&normalize(token))
            .map(|ids| ids.contains(&id))
            .unwrap_or(false)
    }
}

fn normalize(token: &str) -> String {
    token.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(id: MovieId, title: &str) -> MovieRecord {
        MovieRecord::new(id, PathBuf::from(format!("/movies/{}", title)), "")
    }

    #[test]
    fn test_add_lowercases_tokens() {
        let mut index = SearchIndex::new();
        index.add("Green Mile.mkv", 1);
        index.add("Fight Club.mkv", 2);

        assert!(index.contains("green mile.mkv", 1));
        assert!(index.contains("FIGHT CLUB.MKV", 2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut index = SearchIndex::new();
        index.add("drama", 1);
        index.add("Drama", 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.find("drama"), BTreeSet::from([1]));
    }

    #[test]
    fn test_find_matches_tokens_contained_in_query() {
        let index = SearchIndex::from_records(&[
            record(1, "Back to the Future 1.mkv"),
            record(2, "Back to the Future 2.mkv"),
            record(3, "The Replacements.mkv"),
        ]);

        assert_eq!(index.find("back to the future 1.mkv"), BTreeSet::from([1]));
        assert_eq!(
            index.find("back to the future 1.mkv or back to the future 2.mkv"),
            BTreeSet::from([1, 2])
        );
        assert!(index.find("Futur").is_empty());
    }

    #[test]
    fn test_find_ignores_case() {
        let index = SearchIndex::from_records(&[
            record(1, "Brave Heart.mkv"),
            record(2, "Rush Hour 1.mkv"),
        ]);
        assert_eq!(index.find("RUSH HOUR 1.MKV"), BTreeSet::from([2]));
    }

    #[test]
    fn test_find_matches_any_token_of_a_record() {
        let mut index = SearchIndex::from_records(&[record(1, "star wars 1.avi")]);
        index.add("Science Fiction", 1);
        index.add("collection one", 1);

        assert_eq!(index.find("best science fiction"), BTreeSet::from([1]));
        assert_eq!(index.find("Collection One"), BTreeSet::from([1]));
    }

    #[test]
    fn test_blank_tokens_and_queries_match_nothing() {
        let mut index = SearchIndex::new();
        index.add("   ", 1);
        assert!(index.is_empty());

        index.add("gladiator.mkv", 2);
        assert!(index.find("").is_empty());
        assert!(index.find("nothing here").is_empty());
    }
}
