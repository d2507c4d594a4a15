//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                |
//! |------------|---------------------------------|
//! | `project`  | `Init`, `Project`               |
//! | `chat`     | `Chat`                          |
//! | `edit`     | `Patch`, `Preview`, `Crop`      |
//! | `fragment` | `Fragment`, `Select`            |
//! | `video`    | `Video`                         |
//! | `serve`    | `Serve`                         |
//! | `config`   | `Config`                        |

pub mod chat;
pub mod config;
pub mod edit;
pub mod fragment;
pub mod project;
pub mod serve;
pub mod video;

pub use chat::cmd_chat;
pub use config::cmd_config;
pub use edit::{CropSelection, cmd_crop, cmd_patch, cmd_preview};
pub use fragment::{cmd_fragment, cmd_select};
pub use project::{cmd_init, cmd_project};
pub use serve::cmd_serve;
pub use video::cmd_video;
