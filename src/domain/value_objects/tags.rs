use serde::{Deserialize, Serialize};
use std::fmt;

/// 選択中タグの集合。挿入順を保ち、重複は持たない。
/// API へはカンマ区切り文字列として渡す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TagSelection(Vec<String>);

impl TagSelection {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_joined(joined: &str) -> Self {
        let mut selection = Self::new();
        for tag in joined.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() && !selection.contains(tag) {
                selection.0.push(tag.to_string());
            }
        }
        selection
    }

    /// 含まれていれば外し、なければ末尾に足す。
    pub fn toggle(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        if let Some(pos) = self.0.iter().position(|t| t == tag) {
            self.0.remove(pos);
        } else {
            self.0.push(tag.to_string());
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for TagSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_joined())
    }
}

impl From<String> for TagSelection {
    fn from(joined: String) -> Self {
        Self::from_joined(&joined)
    }
}

impl From<TagSelection> for String {
    fn from(selection: TagSelection) -> Self {
        selection.to_joined()
    }
}
