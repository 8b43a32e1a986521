pub mod conversation;
pub mod gateway;
pub mod message;
