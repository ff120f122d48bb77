// Immutable, named source text.
//
// A `Document` is either *live* -- backed by an in-memory string and
// readable -- or a *shell* left over from deserialization, which knows
// only its own name and refuses any content access.

use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Content {
    Live(String),
    Shell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    name: String,
    content: Content,
}

/// Raised when content is requested from a deserialized shell document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalState(pub String);

impl fmt::Display for IllegalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal state: {}", self.0)
    }
}

impl std::error::Error for IllegalState {}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Document {
        Document {
            name: name.into(),
            content: Content::Live(content.into()),
        }
    }

    /// A document with a name but no readable content, as produced by
    /// deserializing a persisted `Environment`.
    pub fn shell(name: impl Into<String>) -> Document {
        Document {
            name: name.into(),
            content: Content::Shell,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shell(&self) -> bool {
        matches!(self.content, Content::Shell)
    }

    /// Character length of the document. Fails on a shell document.
    pub fn length(&self) -> Result<usize, IllegalState> {
        Ok(self.read_content()?.chars().count())
    }

    /// The full text. Cached at construction time for live documents;
    /// fails for shells.
    pub fn read_content(&self) -> Result<&str, IllegalState> {
        match &self.content {
            Content::Live(s) => Ok(s.as_str()),
            Content::Shell => Err(IllegalState(format!(
                "document {:?} has no content (deserialized shell)",
                self.name
            ))),
        }
    }

    /// Slice out the substring addressed by a half-open `[position, position+length)`
    /// character range. Fails on a shell document or an out-of-bounds range.
    pub fn slice(&self, position: usize, length: usize) -> Result<&str, IllegalState> {
        let content = self.read_content()?;
        let end = position + length;
        let chars: Vec<(usize, char)> = content.char_indices().collect();
        if position == chars.len() && length == 0 {
            return Ok("");
        }
        let byte_start = chars.get(position).map(|(b, _)| *b).ok_or_else(|| {
            IllegalState(format!("position {} out of range in {:?}", position, self.name))
        })?;
        let byte_end = if end >= chars.len() {
            content.len()
        } else {
            chars[end].0
        };
        Ok(&content[byte_start..byte_end])
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Document {}

impl std::hash::Hash for Document {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}
