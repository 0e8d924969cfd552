//! Supabase holdings for the Folio portfolio tracker
//!
//! This crate reads the `exchanges` and `assets` tables of a Supabase
//! project and groups them into per-exchange holdings.
//!
//! Configure it with environment variables:
//! - `SUPABASE_URL` - Project URL
//! - `SUPABASE_ANON_KEY` - Project anon key
//! - `SUPABASE_ACCESS_TOKEN` - Optional user JWT for row-level security

pub mod client;
pub mod types;

pub use client::{SupabaseClient, SupabaseCredentials};
pub use types::{group_holdings, AssetRow, ExchangeRow};
