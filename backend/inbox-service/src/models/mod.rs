pub mod conversation;
pub mod message;
pub mod notification;
pub mod story;

pub use conversation::{Conversation, ConversationDto, ParticipantPair};
pub use message::{MediaKind, Message, MessageBody, MessageDto};
pub use notification::{Notification, NotificationDto, NotificationKind, SubjectRef};
pub use story::{Story, StoryDto, StoryFrame};
