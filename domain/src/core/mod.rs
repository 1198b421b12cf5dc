//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: the failure taxonomy surfaced to callers
//! - [`string`]: UTF-8 safe truncation and identifier tokenizing

pub mod error;
pub mod string;
