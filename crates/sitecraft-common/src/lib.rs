//! Shared domain types for the Sitecraft site builder.
//!
//! These types cross module boundaries (chat, preview, server, storage) and
//! define the persisted and wire shapes. Behaviour lives in the `sitecraft`
//! crate; this crate only carries data and its invariants.

pub mod fragment;
pub mod message;
pub mod region;
pub mod reply;
pub mod video;

pub use fragment::{DEFAULT_FRAGMENT_NAME, Fragment, Page};
pub use message::{Message, PLANNING_APPROVED, PLANNING_PROPOSED, Role, Transcript};
pub use region::{InvalidRegion, SelectionRegion};
pub use reply::AssistantReply;
pub use video::{DownloadResult, Platform, VideoMetadata};
