pub mod commands;

pub use commands::{BlogCommands, Cli, CommentCommands, Commands, DonateArgs, SubmitArgs};
