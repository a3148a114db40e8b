// Adapters layer: concrete implementations of the domain ports

pub mod converter;
pub mod source;
pub mod storage;
pub mod store;
pub mod telegram;
