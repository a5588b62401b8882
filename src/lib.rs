pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use identity::{IdentityProvider, StaticIdentity, StoreUserDirectory, UserDirectory, UserProfile};
pub use models::{
    Attachment, Conversation, ConversationType, LastMessage, MembershipProjection, Message,
    MessageType, OutgoingMessage, ParticipantInfo,
};
pub use services::chat_service::ChatService;
pub use services::fanout::{FanoutCoordinator, FanoutReport};
pub use store::{memory::MemoryStore, Document, DocumentStore, FieldOp, Filter, OrderBy};
pub use sync::LiveSyncManager;
