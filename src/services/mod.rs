pub mod chat_service;
pub mod directory;
pub mod fanout;
pub mod message_service;
pub mod read_state;

pub use chat_service::ChatService;
pub use directory::ConversationDirectory;
pub use fanout::{FanoutCoordinator, FanoutReport};
pub use message_service::MessageService;
pub use read_state::ReadStateTracker;
