//! Property lists: space-separated names of sibling concepts, written either
//! quoted (`"Name Surname"`) or bracketed (`[Name Surname]`).

use std::collections::HashMap;
use std::sync::RwLock;

/// Split a quoted property list into its element names.
///
/// Elements are separated by exactly one space. Empty lists, other
/// separators, leading/trailing or doubled spaces and dotted names are
/// rejected with a message naming the problem.
pub fn split_property_list(text: &str) -> Result<Vec<String>, String> {
    if text.trim().is_empty() {
        return Err("property list is empty".to_owned());
    }
    if let Some(c) = text
        .chars()
        .find(|c| (c.is_whitespace() && *c != ' ') || matches!(c, ',' | ';' | '|'))
    {
        return Err(format!(
            "property list '{}' contains separator {:?}; separate names with a single space",
            text, c
        ));
    }
    if text.starts_with(' ') || text.ends_with(' ') {
        return Err(format!(
            "property list '{}' has leading or trailing spaces",
            text
        ));
    }
    if text.contains("  ") {
        return Err(format!(
            "property list '{}' separates names with more than one space",
            text
        ));
    }
    let items: Vec<String> = text.split(' ').map(str::to_owned).collect();
    if let Some(dotted) = items.iter().find(|i| i.contains('.')) {
        return Err(format!(
            "property list element '{}' must be a bare name without a dot",
            dotted
        ));
    }
    Ok(items)
}

/// Memo of [`split_property_list`] results keyed by the literal list text.
///
/// Owned by a compilation job, or shared between jobs through an `Arc`.
/// Reads take the shared lock; a poisoned lock is recovered since entries
/// are inserted whole.
#[derive(Debug, Default)]
pub struct ParseCache {
    lists: RwLock<HashMap<String, Result<Vec<String>, String>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>, String> {
        {
            let lists = self.lists.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = lists.get(text) {
                return hit.clone();
            }
        }
        let result = split_property_list(text);
        let mut lists = self.lists.write().unwrap_or_else(|e| e.into_inner());
        lists.entry(text.to_owned()).or_insert_with(|| result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.lists.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
