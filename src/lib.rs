pub mod chat;
pub mod config;
pub mod context;
pub mod dom;
pub mod errors;
pub mod init;
pub mod logging;
pub mod notify;
pub mod patch;
pub mod preview;
pub mod promote;
pub mod provider;
pub mod refine;
pub mod region;
pub mod server;
pub mod store;
pub mod util;
pub mod video;
