//! Supabase REST (PostgREST) access.

mod client;

pub use client::{PostgrestStore, parse_content_range};
