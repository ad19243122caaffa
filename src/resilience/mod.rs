//! Resilience helpers for local infrastructure.
//!
//! Remote catalog fetches are deliberately **not** retried here: a failed
//! sync waits for the next change notification or foreground resume.

pub mod retry;
