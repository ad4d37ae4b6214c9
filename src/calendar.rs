use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const GRID_CELLS: usize = 42;
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DD` for a calendar day, always taken from UTC midnight of that
/// day so the key never depends on the viewer's offset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        let midnight = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()?;
        Some(Self(midnight.format(DATE_KEY_FORMAT).to_string()))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DATE_KEY_FORMAT).to_string())
    }

    /// Accepts only the canonical form of a real date.
    pub fn parse(raw: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(raw.trim(), DATE_KEY_FORMAT).ok()?;
        let key = Self::from_date(date);
        (key.0 == raw.trim()).then_some(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DATE_KEY_FORMAT).ok()
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    year: i32,
    month: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn navigate(&mut self, delta_months: i32) {
        let index = self.year * 12 + self.month as i32 - 1 + delta_months;
        self.year = index.div_euclid(12);
        self.month = index.rem_euclid(12) as u32 + 1;
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn title(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    /// Trailing day of the previous month.
    Leading { day: u32 },
    Day {
        day: u32,
        key: DateKey,
        has_event: bool,
    },
    Filler,
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub cursor: MonthCursor,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    pub fn weeks(&self) -> std::slice::Chunks<'_, CalendarCell> {
        self.cells.chunks(7)
    }

    pub fn day_cell(&self, day: u32) -> Option<&CalendarCell> {
        self.cells
            .iter()
            .find(|cell| matches!(cell, CalendarCell::Day { day: value, .. } if *value == day))
    }
}

/// Six Sunday-first weeks: previous-month tail, the month itself, then blank
/// filler up to [`GRID_CELLS`].
pub fn render(cursor: MonthCursor, events: &EventIndex) -> MonthGrid {
    let first = cursor.first_day();
    let leading = first.weekday().num_days_from_sunday();
    let mut previous = cursor;
    previous.navigate(-1);
    let previous_last = previous.days_in_month();

    let mut cells = Vec::with_capacity(GRID_CELLS);
    for day in (previous_last + 1 - leading)..=previous_last {
        cells.push(CalendarCell::Leading { day });
    }

    for day in 1..=cursor.days_in_month() {
        let Some(key) = DateKey::from_ymd(cursor.year, cursor.month, day) else {
            continue;
        };
        let has_event = events.has_events(&key);
        cells.push(CalendarCell::Day {
            day,
            key,
            has_event,
        });
    }

    while cells.len() < GRID_CELLS {
        cells.push(CalendarCell::Filler);
    }

    MonthGrid { cursor, cells }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventIndex {
    days: BTreeMap<DateKey, Vec<String>>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self, key: &DateKey) -> &[String] {
        self.days.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_events(&self, key: &DateKey) -> bool {
        !self.events(key).is_empty()
    }

    pub fn contains_key(&self, key: &DateKey) -> bool {
        self.days.contains_key(key)
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Appends to the end of the day's list. Returns the new position.
    pub fn add(&mut self, key: &DateKey, text: &str) -> Result<usize, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("event text is required".to_string());
        }
        let list = self.days.entry(key.clone()).or_default();
        list.push(text.to_string());
        Ok(list.len() - 1)
    }

    pub fn remove(&mut self, key: &DateKey, index: usize) -> Option<String> {
        let list = self.days.get_mut(key)?;
        if index >= list.len() {
            return None;
        }
        let removed = list.remove(index);
        if list.is_empty() {
            self.days.remove(key);
        }
        Some(removed)
    }

    pub fn select(&mut self, key: DateKey) -> SelectedDay<'_> {
        SelectedDay { index: self, key }
    }

    /// Drops any empty lists, e.g. from a hand-edited document.
    pub fn prune(&mut self) -> usize {
        let before = self.days.len();
        self.days.retain(|_, list| !list.is_empty());
        before - self.days.len()
    }

    pub fn upcoming(&self, from: &DateKey, limit: usize) -> Vec<(&DateKey, &str)> {
        self.days
            .range(from.clone()..)
            .flat_map(|(key, list)| list.iter().map(move |event| (key, event.as_str())))
            .take(limit)
            .collect()
    }
}

/// Event operations scoped to one selected day.
pub struct SelectedDay<'a> {
    index: &'a mut EventIndex,
    key: DateKey,
}

impl SelectedDay<'_> {
    pub fn key(&self) -> &DateKey {
        &self.key
    }

    pub fn events(&self) -> &[String] {
        self.index.events(&self.key)
    }

    pub fn add(&mut self, text: &str) -> Result<usize, String> {
        self.index.add(&self.key, text)
    }

    pub fn remove(&mut self, position: usize) -> Option<String> {
        self.index.remove(&self.key, position)
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .map(|date| (date - Duration::days(1)).day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{render, CalendarCell, DateKey, EventIndex, MonthCursor, GRID_CELLS};

    #[test]
    fn date_keys_come_from_utc_midnight() {
        let key = DateKey::from_ymd(2024, 2, 29).expect("leap day should exist");
        assert_eq!(key.as_str(), "2024-02-29");
        assert!(DateKey::from_ymd(2023, 2, 29).is_none());
        assert!(DateKey::from_ymd(2024, 13, 1).is_none());
    }

    #[test]
    fn date_keys_round_trip() {
        let cursor = MonthCursor::new(2024, 2).expect("month should exist");
        let grid = render(cursor, &EventIndex::new());
        for cell in &grid.cells {
            if let CalendarCell::Day { key, .. } = cell {
                let reparsed = DateKey::parse(key.as_str()).expect("key should parse");
                assert_eq!(&reparsed, key);
            }
        }
        assert!(DateKey::parse("2024-2-9").is_none());
        assert!(DateKey::parse("2024-02-30").is_none());
    }

    #[test]
    fn january_2024_grid_has_42_cells() {
        let cursor = MonthCursor::new(2024, 1).expect("month should exist");
        let grid = render(cursor, &EventIndex::new());
        assert_eq!(grid.cells.len(), GRID_CELLS);
        // 2024-01-01 is a Monday, so one trailing December day leads.
        assert_eq!(grid.cells[0], CalendarCell::Leading { day: 31 });
        match &grid.cells[1] {
            CalendarCell::Day { day, key, .. } => {
                assert_eq!(*day, 1);
                assert_eq!(key.as_str(), "2024-01-01");
            }
            other => panic!("expected January 1, got {other:?}"),
        }
        assert_eq!(grid.cells[32], CalendarCell::Filler);
        assert_eq!(grid.weeks().count(), 6);
    }

    #[test]
    fn grid_flags_days_with_events() {
        let mut events = EventIndex::new();
        let key = DateKey::from_ymd(2024, 3, 15).expect("date should exist");
        events.add(&key, "Dentist").expect("event should be added");

        let grid = render(MonthCursor::new(2024, 3).expect("month"), &events);
        match grid.day_cell(15) {
            Some(CalendarCell::Day { has_event, .. }) => assert!(*has_event),
            other => panic!("expected day 15, got {other:?}"),
        }
        match grid.day_cell(16) {
            Some(CalendarCell::Day { has_event, .. }) => assert!(!*has_event),
            other => panic!("expected day 16, got {other:?}"),
        }
    }

    #[test]
    fn navigate_crosses_year_boundaries() {
        let mut cursor = MonthCursor::new(2024, 1).expect("month");
        cursor.navigate(-1);
        assert_eq!((cursor.year(), cursor.month()), (2023, 12));
        cursor.navigate(14);
        assert_eq!((cursor.year(), cursor.month()), (2025, 2));
        assert_eq!(cursor.title(), "February 2025");
    }

    #[test]
    fn removing_last_event_drops_the_key() {
        let mut events = EventIndex::new();
        let key = DateKey::from_ymd(2024, 5, 1).expect("date");
        let mut day = events.select(key.clone());
        day.add("Standup").expect("event should be added");
        assert_eq!(day.events(), ["Standup".to_string()]);
        assert_eq!(day.remove(0).as_deref(), Some("Standup"));

        assert!(!events.contains_key(&key));
        assert_eq!(events, EventIndex::new());
        assert_eq!(
            serde_json::to_string(&events).expect("encode"),
            "{}"
        );
    }

    #[test]
    fn add_preserves_insertion_order_and_rejects_blank() {
        let mut events = EventIndex::new();
        let key = DateKey::from_ymd(2024, 5, 2).expect("date");
        events.add(&key, "first").expect("add");
        events.add(&key, "  second  ").expect("add");
        assert!(events.add(&key, "   ").is_err());
        assert_eq!(events.events(&key), ["first".to_string(), "second".to_string()]);

        assert!(events.remove(&key, 5).is_none());
        assert_eq!(events.remove(&key, 0).as_deref(), Some("first"));
        assert_eq!(events.events(&key), ["second".to_string()]);
    }

    #[test]
    fn prune_and_upcoming() {
        let mut events: EventIndex =
            serde_json::from_str(r#"{"2024-06-01":[],"2024-06-03":["b"],"2024-05-30":["a"]}"#)
                .expect("decode");
        assert_eq!(events.prune(), 1);

        let from = DateKey::from_date(NaiveDate::from_ymd_opt(2024, 5, 31).expect("date"));
        let upcoming = events.upcoming(&from, 10);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].0.as_str(), "2024-06-03");
    }
}
