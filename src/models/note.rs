use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const UNTITLED: &str = "New Note";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub created_at: u64,
    pub modified_at: u64,
    pub word_wrap: bool,
}

pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

impl Note {
    pub fn new() -> Self {
        let timestamp = now_timestamp();

        Self {
            id: Uuid::new_v4(),
            content: String::new(),
            created_at: timestamp,
            modified_at: timestamp,
            word_wrap: true,
        }
    }

    /// First non-empty line of the content, kept verbatim.
    pub fn title(&self) -> &str {
        self.content
            .split('\n')
            .find(|line| !line.is_empty())
            .unwrap_or(UNTITLED)
    }

    pub fn touch(&mut self) {
        self.modified_at = now_timestamp().max(self.created_at);
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.touch();
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}
