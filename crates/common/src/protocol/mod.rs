pub mod commands;
pub mod notification;

pub use commands::{Command, Target, ACTIVE_TARGET};
pub use notification::{describe_block, BlockMessage, Notification};
