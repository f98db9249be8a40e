mod channel;
mod context;
mod session;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::Context;
pub use session::{NodePrompt, Session, SessionId, Turn};
