//! Core domain concepts shared across all subdomains.
//!
//! - [`repo::RepoRef`] - a validated reference to a remote repository
//! - [`locale::Locale`] - the language the analysis is written in
//! - [`error::DomainError`] - domain-level errors

pub mod error;
pub mod locale;
pub mod repo;
