//! Operator authorization and status transitions for the expert application review console.
//!
//! The [`review`] module holds the decision logic: who may change an application's status,
//! when the shared account must escalate to an individual credential, and how the change is
//! attributed. [`supabase`] provides the live store and identity provider behind it.

pub mod config;
pub mod error;
pub mod review;
pub mod supabase;
pub mod telemetry;
