//! Note records for the demo application.
//!
//! The renderer only needs summaries (id, title, last update), looked up by
//! a free-text query. [`NoteStore`] is an in-memory source shared between
//! request tasks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use dashmap::DashMap;

use crate::{Result, StrikeError};

/// Summary of one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Local>,
}

/// Anything that can answer note searches.
pub trait NoteSource: Send + Sync {
    /// Notes whose title matches `query`; an empty query matches all.
    ///
    /// # Errors
    /// `StrikeError::Lookup` when the source cannot be queried.
    fn search_notes(&self, query: &str) -> Result<Vec<Note>>;
}

/// Thread-safe in-memory note store.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Arc<DashMap<String, Note>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with a few sample notes.
    pub fn seeded() -> Self {
        let store = Self::new();
        let now = Local::now();
        store.upsert(Note {
            id: "1".into(),
            title: "Meeting Notes".into(),
            updated_at: now - Duration::minutes(30),
        });
        store.upsert(Note {
            id: "2".into(),
            title: "Make a thing".into(),
            updated_at: now - Duration::days(3),
        });
        store.upsert(Note {
            id: "3".into(),
            title: "A note with a very long title because sometimes you need more words".into(),
            updated_at: now - Duration::days(40),
        });
        store.upsert(Note {
            id: "4".into(),
            title: "I wrote this note today".into(),
            updated_at: now,
        });
        store
    }

    /// Insert or replace a note by id.
    pub fn upsert(&self, note: Note) {
        self.notes.insert(note.id.clone(), note);
    }

    pub fn remove(&self, id: &str) -> Option<Note> {
        self.notes.remove(id).map(|(_, note)| note)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteSource for NoteStore {
    /// Case-insensitive title search, newest first.
    fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let needle = query.trim().to_lowercase();
        let mut found: Vec<Note> = self
            .notes
            .iter()
            .filter(|entry| needle.is_empty() || entry.title.to_lowercase().contains(&needle))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

/// A source that always fails; useful to exercise lookup error paths.
#[derive(Debug, Clone)]
pub struct UnavailableSource(pub String);

impl NoteSource for UnavailableSource {
    fn search_notes(&self, _query: &str) -> Result<Vec<Note>> {
        Err(StrikeError::Lookup(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_returns_all_newest_first() {
        let store = NoteStore::seeded();
        let notes = store.search_notes("").unwrap();
        assert_eq!(notes.len(), 4);
        assert!(notes
            .windows(2)
            .all(|w| w[0].updated_at >= w[1].updated_at));
    }

    #[test]
    fn search_is_case_insensitive() {
        let store = NoteStore::seeded();
        let notes = store.search_notes("MEETING").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "1");
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = NoteStore::new();
        let now = Local::now();
        store.upsert(Note {
            id: "a".into(),
            title: "first".into(),
            updated_at: now,
        });
        store.upsert(Note {
            id: "a".into(),
            title: "second".into(),
            updated_at: now,
        });
        assert_eq!(store.len(), 1);
        assert_eq!(store.search_notes("second").unwrap().len(), 1);
        assert!(store.remove("a").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn unavailable_source_fails_with_lookup() {
        let err = UnavailableSource("offline".into())
            .search_notes("x")
            .unwrap_err();
        assert!(matches!(err, StrikeError::Lookup(_)));
    }
}
