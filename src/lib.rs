pub mod commands;
pub mod config;
pub mod controller;
pub mod events;
pub mod helper;
pub mod notify;
pub mod queue;
pub mod response_context;
pub mod selection;
pub mod session;
pub mod source;
pub mod state;
pub mod voice;
