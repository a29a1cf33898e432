//! History queries
//!
//! Substring search and backwards pagination over a room's history. Results
//! are computed on demand and never stored.

use serde::Serialize;

use crate::chat::ChatMessage;
use crate::error::CoreError;
use crate::room::RoomStore;
use crate::types::{MessageId, RoomId};

/// Default number of messages per `load_more_messages` page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of older messages
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}

impl Page {
    fn empty() -> Self {
        Self {
            messages: Vec::new(),
            has_more: false,
        }
    }
}

/// Case-insensitive substring search over text bodies, oldest-first
///
/// File messages never match.
pub fn search(store: &RoomStore, room_id: &RoomId, query: &str) -> Result<Vec<ChatMessage>, CoreError> {
    if query.is_empty() {
        return Err(CoreError::InvalidQuery);
    }
    let room = store.room(room_id)?;
    let needle = query.to_lowercase();

    Ok(room
        .messages()
        .iter()
        .filter(|m| {
            m.text()
                .is_some_and(|body| body.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect())
}

/// Up to `page_size` messages immediately preceding `before`
///
/// An unknown `before` id, or the oldest message, yields an empty page.
pub fn older_than(
    store: &RoomStore,
    room_id: &RoomId,
    before: MessageId,
    page_size: usize,
) -> Result<Page, CoreError> {
    let messages = store.room(room_id)?.messages();

    let Some(index) = messages.iter().position(|m| m.id == before) else {
        return Ok(Page::empty());
    };
    if index == 0 {
        return Ok(Page::empty());
    }

    let start = index.saturating_sub(page_size);
    Ok(Page {
        messages: messages.range(start..index).cloned().collect(),
        has_more: start > 0,
    })
}
