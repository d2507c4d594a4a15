use serde::Serialize;
use sitecraft_common::{PLANNING_APPROVED, PLANNING_PROPOSED, Transcript};

/// Planning phase of a conversation.
///
/// Never stored on its own: it is rebuilt from the marker messages in the
/// transcript, so a reloaded project resumes in the same phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    pub proposed: bool,
    pub approved: bool,
}

impl ConversationState {
    pub fn from_transcript(transcript: &Transcript) -> Self {
        Self {
            proposed: transcript.has_marker(PLANNING_PROPOSED),
            approved: transcript.has_marker(PLANNING_APPROVED),
        }
    }
}
