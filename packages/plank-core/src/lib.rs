pub mod board;
pub mod calendar;
pub mod config;
pub mod drag;
pub mod engine;
pub mod invariants;
pub mod search;
pub mod service;
pub mod slug;
pub mod storage;
pub mod stores;
pub mod types;
