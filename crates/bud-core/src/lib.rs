pub mod args;
pub mod command;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod error;
mod handlers;
pub mod history;
pub mod io;
pub mod longtask;
pub mod paths;
pub mod poll;
pub mod properties;
pub mod response;
pub mod seed;
pub mod stack;
pub mod storage;
pub mod store;
pub mod timefmt;
pub mod types;
pub mod webhook;

pub use dispatch::{Bot, CommandRequest};
pub use error::{BudError, Result};
