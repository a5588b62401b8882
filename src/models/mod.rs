pub mod conversation;
pub mod membership;
pub mod message;

pub use conversation::{Conversation, ConversationType, LastMessage, ParticipantInfo};
pub use membership::MembershipProjection;
pub use message::{Attachment, Message, MessageType, OutgoingMessage};
