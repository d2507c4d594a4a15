//! Conversation flow: plan first, generate after approval.
//!
//! | Phase              | User says            | Turn                     |
//! |--------------------|----------------------|--------------------------|
//! | nothing proposed   | anything             | planner                  |
//! | proposed           | approval keyword     | approve, then builder    |
//! | proposed           | change request       | planner again            |
//! | approved           | anything             | builder                  |
//!
//! A message opening with a generation verb goes to the builder in any phase.

mod intent;
pub mod prompts;
mod session;
mod state;

pub use intent::{IntentMatcher, TurnPlan};
pub use session::{ChatSession, TurnOutcome};
pub use state::ConversationState;
