use std::time::Duration;

use tracing::info;

use crate::calendar::EventIndex;
use crate::notes::NoteBook;
use crate::preferences::UiPreferences;
use crate::stopwatch::{Stopwatch, StopwatchState};
use crate::storage::{StorageError, Store};
use crate::todos::TodoList;

pub const TODOS_KEY: &str = "dash_todos";
pub const NOTES_KEY: &str = "dash_notes";
pub const EVENTS_KEY: &str = "dash_events";
pub const UI_KEY: &str = "dash_ui";
pub const STOPWATCH_KEY: &str = "dash_stopwatch";

/// Everything the dashboard persists, owned in one place. Mutations go
/// through the public fields; callers persist a group with its `save_*`
/// method right after changing it.
pub struct AppState {
    store: Store,
    pub todos: TodoList,
    pub notes: NoteBook,
    pub events: EventIndex,
    pub ui: UiPreferences,
    pub stopwatch: Stopwatch,
}

impl AppState {
    pub fn load(store: Store, sample_interval: Duration) -> Self {
        let todos = store.get(TODOS_KEY, TodoList::new());
        let notes = store.get(NOTES_KEY, NoteBook::new());
        let mut events = store.get(EVENTS_KEY, EventIndex::new());
        let pruned = events.prune();
        let ui = store.get(UI_KEY, UiPreferences::default());
        let stopwatch_state = store.get(STOPWATCH_KEY, StopwatchState::default());

        info!(
            dir = %store.dir().display(),
            todos = todos.len(),
            notes = notes.len(),
            event_days = events.day_count(),
            pruned_event_days = pruned,
            laps = stopwatch_state.laps.len(),
            "loaded dashboard state"
        );

        Self {
            store,
            todos,
            notes,
            events,
            ui,
            stopwatch: Stopwatch::new(stopwatch_state, sample_interval),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn save_todos(&self) -> Result<(), StorageError> {
        self.store.set(TODOS_KEY, &self.todos)
    }

    pub fn save_notes(&self) -> Result<(), StorageError> {
        self.store.set(NOTES_KEY, &self.notes)
    }

    pub fn save_events(&self) -> Result<(), StorageError> {
        self.store.set(EVENTS_KEY, &self.events)
    }

    pub fn save_ui(&self) -> Result<(), StorageError> {
        self.store.set(UI_KEY, &self.ui)
    }

    pub fn save_stopwatch(&self) -> Result<(), StorageError> {
        self.store.set(STOPWATCH_KEY, self.stopwatch.state())
    }

    pub fn save_all(&self) -> Result<(), StorageError> {
        self.save_todos()?;
        self.save_notes()?;
        self.save_events()?;
        self.save_ui()?;
        self.save_stopwatch()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use chrono::Utc;

    use super::{AppState, EVENTS_KEY};
    use crate::calendar::DateKey;
    use crate::preferences::Theme;
    use crate::storage::Store;

    fn temp_dir(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("deskboard_{}_{}", name, std::process::id()));
        path
    }

    #[test]
    fn empty_directory_loads_defaults() {
        let state = AppState::load(Store::open(temp_dir("app_empty")), Duration::from_millis(10));
        assert!(state.todos.is_empty());
        assert!(state.notes.is_empty());
        assert_eq!(state.events.day_count(), 0);
        assert_eq!(state.ui.theme, Theme::Light);
        assert!(state.stopwatch.laps().is_empty());
    }

    #[test]
    fn saved_groups_survive_reload() {
        let dir = temp_dir("app_reload");
        let mut state = AppState::load(Store::open(&dir), Duration::from_millis(10));
        state.todos.add("water plants", Some("home")).expect("add");
        state.notes.add("Idea", "tui", Utc::now()).expect("add");
        let key = DateKey::from_ymd(2026, 10, 16).expect("date");
        state.events.add(&key, "Review").expect("add");
        state.ui.toggle_theme();
        let t0 = Instant::now();
        state.stopwatch.start(t0);
        state.stopwatch.lap(t0 + Duration::from_millis(1200)).expect("lap");
        state.save_all().expect("save should succeed");

        let reloaded = AppState::load(Store::open(&dir), Duration::from_millis(10));
        assert_eq!(reloaded.todos, state.todos);
        assert_eq!(reloaded.notes, state.notes);
        assert_eq!(reloaded.events.events(&key), ["Review".to_string()]);
        assert_eq!(reloaded.ui.theme, Theme::Dark);
        assert_eq!(reloaded.stopwatch.laps(), state.stopwatch.laps());
        // Elapsed time is process-local.
        assert_eq!(reloaded.stopwatch.elapsed_ms(), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_event_lists_are_pruned_on_load() {
        let dir = temp_dir("app_prune");
        let store = Store::open(&dir);
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join(format!("{EVENTS_KEY}.json")),
            r#"{"2026-01-01":[],"2026-01-02":["x"]}"#,
        )
        .expect("write");

        let state = AppState::load(store, Duration::from_millis(10));
        assert_eq!(state.events.day_count(), 1);
        let _ = fs::remove_dir_all(dir);
    }
}
