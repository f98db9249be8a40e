/// Flow lifecycle events.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// A draft definition was stored.
    Deployed,
    /// The publish gate accepted the flow.
    Published(FlowPublishedEvent),
    /// The published flag was reverted.
    Unpublished,
}

impl FlowEvent {
    pub fn str(&self) -> &str {
        match self {
            FlowEvent::Deployed => "Deployed",
            FlowEvent::Published(_) => "Published",
            FlowEvent::Unpublished => "Unpublished",
        }
    }
}

/// Event emitted when a flow version goes live.
#[derive(Debug, Clone)]
pub struct FlowPublishedEvent {
    pub version: String,
    pub published_by: String,
}
