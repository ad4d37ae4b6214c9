use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created: DateTime<Utc>,
}

impl Note {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteBook {
    notes: Vec<Note>,
}

impl NoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Prepends a note. A note needs a title or a body.
    pub fn add(&mut self, title: &str, body: &str, created: DateTime<Utc>) -> Result<(), String> {
        let title = title.trim();
        let body = body.trim();
        if title.is_empty() && body.is_empty() {
            return Err("note needs a title or a body".to_string());
        }
        self.notes.insert(
            0,
            Note {
                title: title.to_string(),
                body: body.to_string(),
                created,
            },
        );
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Note, String> {
        if index >= self.notes.len() {
            return Err(format!("note not found: {}", index + 1));
        }
        Ok(self.notes.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::NoteBook;

    #[test]
    fn notes_are_prepended_and_need_content() {
        let mut book = NoteBook::new();
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        book.add("", "  first body ", created).expect("add");
        book.add("Ideas", "", created).expect("add");
        assert!(book.add("  ", " ", created).is_err());

        assert_eq!(book.len(), 2);
        assert_eq!(book.notes()[0].display_title(), "Ideas");
        assert_eq!(book.notes()[1].display_title(), "Untitled");
        assert_eq!(book.notes()[1].body, "first body");
    }

    #[test]
    fn delete_by_position() {
        let mut book = NoteBook::new();
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        book.add("a", "", created).expect("add");
        book.add("b", "", created).expect("add");

        let removed = book.delete(1).expect("delete");
        assert_eq!(removed.title, "a");
        assert!(book.delete(3).is_err());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn created_is_stored_as_rfc3339() {
        let mut book = NoteBook::new();
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        book.add("t", "b", created).expect("add");
        let json = serde_json::to_string(&book).expect("encode");
        assert!(json.contains("\"created\":\"2026-03-01T08:00:00Z\""));
    }
}
