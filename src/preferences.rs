use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetId {
    Clock,
    Todo,
    Notes,
    Calendar,
    Stopwatch,
    Transit,
    Weather,
    News,
}

impl WidgetId {
    pub const ALL: [WidgetId; 8] = [
        WidgetId::Clock,
        WidgetId::Todo,
        WidgetId::Notes,
        WidgetId::Calendar,
        WidgetId::Stopwatch,
        WidgetId::Transit,
        WidgetId::Weather,
        WidgetId::News,
    ];

    /// Stable id used as the key of the collapsed map.
    pub fn id(self) -> &'static str {
        match self {
            WidgetId::Clock => "widget-clock",
            WidgetId::Todo => "widget-todo",
            WidgetId::Notes => "widget-notes",
            WidgetId::Calendar => "widget-calendar",
            WidgetId::Stopwatch => "widget-stopwatch",
            WidgetId::Transit => "widget-transit",
            WidgetId::Weather => "widget-weather",
            WidgetId::News => "widget-news",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WidgetId::Clock => "Clock",
            WidgetId::Todo => "To-Do",
            WidgetId::Notes => "Notes",
            WidgetId::Calendar => "Calendar",
            WidgetId::Stopwatch => "Stopwatch",
            WidgetId::Transit => "Transit",
            WidgetId::Weather => "Weather",
            WidgetId::News => "News",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub theme: Theme,
    // Keyed by `WidgetId::id`; unknown ids from older documents are kept.
    #[serde(default)]
    pub collapsed: BTreeMap<String, bool>,
}

impl UiPreferences {
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn is_collapsed(&self, widget: WidgetId) -> bool {
        self.collapsed.get(widget.id()).copied().unwrap_or(false)
    }

    /// Returns the new collapsed flag.
    pub fn toggle_collapsed(&mut self, widget: WidgetId) -> bool {
        let collapsed = !self.is_collapsed(widget);
        self.collapsed.insert(widget.id().to_string(), collapsed);
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::{Theme, UiPreferences, WidgetId};

    #[test]
    fn theme_and_collapse_toggle() {
        let mut prefs = UiPreferences::default();
        assert_eq!(prefs.toggle_theme(), Theme::Dark);
        assert_eq!(prefs.toggle_theme(), Theme::Light);

        assert!(prefs.toggle_collapsed(WidgetId::News));
        assert!(prefs.is_collapsed(WidgetId::News));
        assert!(!prefs.toggle_collapsed(WidgetId::News));
        assert!(!prefs.is_collapsed(WidgetId::Todo));
    }

    #[test]
    fn decodes_stored_document() {
        let prefs: UiPreferences =
            serde_json::from_str(r#"{"theme":"dark","collapsed":{"widget-todo":true,"widget-old":true}}"#)
                .expect("decode");
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.is_collapsed(WidgetId::Todo));
        assert_eq!(prefs.collapsed.len(), 2);
    }
}
