pub mod health;
pub mod history;
pub mod slack;
pub mod tasks;
