//! Human approval of extracted events
//!
//! Links posted in chat become drafts; an allowlisted admin reacting with
//! the approval emoji publishes the draft to the calendar.

mod links;
mod ports;
mod state;
mod store;
mod workflow;

pub use links::find_first_url;
pub use ports::{ChatTransport, EventService, ServiceError, TransportError};
pub use state::ApprovalState;
pub use store::{ChatId, InMemoryPendingStore, MessageKey, PendingApproval, PendingStore};
pub use workflow::{
    AdminAllowlist, ApprovalWorkflow, ChatEvent, EventOutcome, IgnoreReason, IncomingMessage, MessageOutcome,
    ReactionEvent, ReactionOutcome, WorkflowSettings, GREETING,
};
