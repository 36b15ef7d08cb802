#![allow(dead_code)]

use std::sync::Arc;

use inbox_service::gateway::SessionRegistry;
use inbox_service::models::{MessageBody, StoryFrame};
use inbox_service::store::MemoryStore;

pub fn setup() -> (Arc<MemoryStore>, SessionRegistry) {
    (Arc::new(MemoryStore::new()), SessionRegistry::new())
}

pub fn text(content: &str) -> MessageBody {
    MessageBody::text(content).expect("valid text body")
}

pub fn frame(media_ref: &str) -> StoryFrame {
    StoryFrame {
        media_ref: media_ref.into(),
        caption: None,
        overlay: None,
    }
}
