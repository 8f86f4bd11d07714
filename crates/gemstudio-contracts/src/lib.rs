pub mod chat;
pub mod events;
pub mod operations;
pub mod parts;
