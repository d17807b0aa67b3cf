//! Transport and paging for the remote record store.

mod basic;
mod client;
pub mod auth;
pub mod pager;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use pager::{PageFetcher, Record};
