use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Todo {
    pub fn tag_label(&self) -> Option<&str> {
        self.tag.as_deref().filter(|tag| !tag.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TodoFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TodoFilter {
    pub fn next(self) -> Self {
        match self {
            TodoFilter::All => TodoFilter::Pending,
            TodoFilter::Pending => TodoFilter::Completed,
            TodoFilter::Completed => TodoFilter::All,
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Pending => !todo.completed,
            TodoFilter::Completed => todo.completed,
        }
    }
}

impl Display for TodoFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TodoFilter::All => "all",
            TodoFilter::Pending => "pending",
            TodoFilter::Completed => "completed",
        };
        f.write_str(label)
    }
}

impl FromStr for TodoFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TodoFilter::All),
            "pending" => Ok(TodoFilter::Pending),
            "completed" | "done" => Ok(TodoFilter::Completed),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// The to-do list, newest first. Every index taken or returned refers to the
/// full list, never to a filtered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoList {
    items: Vec<Todo>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Todo> {
        self.items.get(index)
    }

    pub fn add(&mut self, text: &str, tag: Option<&str>) -> Result<(), String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("task text is required".to_string());
        }
        let tag = tag
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);
        self.items.insert(
            0,
            Todo {
                text: text.to_string(),
                completed: false,
                tag,
            },
        );
        Ok(())
    }

    /// Returns the new completion flag.
    pub fn toggle(&mut self, index: usize) -> Result<bool, String> {
        let todo = self.item_mut(index)?;
        todo.completed = !todo.completed;
        Ok(todo.completed)
    }

    pub fn edit(&mut self, index: usize, text: &str) -> Result<(), String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("task text is required".to_string());
        }
        self.item_mut(index)?.text = text.to_string();
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Todo, String> {
        if index >= self.items.len() {
            return Err(format!("task not found: {}", index + 1));
        }
        Ok(self.items.remove(index))
    }

    /// Returns how many tasks were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|todo| !todo.completed);
        before - self.items.len()
    }

    pub fn filtered(&self, filter: TodoFilter) -> Vec<(usize, &Todo)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, todo)| filter.matches(todo))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!("{} tasks", self.items.len())
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut Todo, String> {
        self.items
            .get_mut(index)
            .ok_or_else(|| format!("task not found: {}", index + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::{TodoFilter, TodoList};

    fn sample() -> TodoList {
        let mut list = TodoList::new();
        list.add("buy milk", Some("home")).expect("add");
        list.add("write report", None).expect("add");
        list.add("call bank", Some("  ")).expect("add");
        list
    }

    #[test]
    fn add_prepends_and_normalizes_tags() {
        let list = sample();
        let texts = list.items().iter().map(|todo| todo.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["call bank", "write report", "buy milk"]);
        assert_eq!(list.items()[0].tag, None);
        assert_eq!(list.items()[2].tag.as_deref(), Some("home"));
        assert_eq!(list.summary(), "3 tasks");
    }

    #[test]
    fn rejects_blank_text() {
        let mut list = TodoList::new();
        assert!(list.add("   ", None).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn filtered_views_keep_full_list_indices() {
        let mut list = sample();
        list.toggle(1).expect("toggle");

        let pending = list.filtered(TodoFilter::Pending);
        let indices = pending.iter().map(|(index, _)| *index).collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 2]);

        // Toggling through a filtered index hits the right task.
        let (index, _) = pending[1];
        list.toggle(index).expect("toggle");
        assert!(list.get(2).expect("task").completed);

        let completed = list.filtered(TodoFilter::Completed);
        assert_eq!(completed.len(), 2);
        assert_eq!(list.filtered(TodoFilter::All).len(), 3);
    }

    #[test]
    fn edit_delete_and_clear_completed() {
        let mut list = sample();
        list.edit(0, "call the bank").expect("edit");
        assert_eq!(list.items()[0].text, "call the bank");
        assert!(list.edit(9, "x").is_err());

        list.toggle(0).expect("toggle");
        assert_eq!(list.clear_completed(), 1);
        assert_eq!(list.len(), 2);

        let removed = list.delete(1).expect("delete");
        assert_eq!(removed.text, "buy milk");
        assert!(list.delete(4).is_err());
    }

    #[test]
    fn decodes_documents_with_empty_tag_strings() {
        let list: TodoList =
            serde_json::from_str(r#"[{"text":"a","completed":true,"tag":""}]"#).expect("decode");
        assert!(list.items()[0].completed);
        assert_eq!(list.items()[0].tag.as_deref(), Some(""));
        assert_eq!("done".parse::<TodoFilter>(), Ok(TodoFilter::Completed));
    }
}
