//! enumlookup Library
//!
//! ENUM (E.164 Number Mapping, RFC 6116) lookups: telephone numbers are
//! turned into reversed-digit DNS names and resolved to service URIs
//! through NAPTR records, with per-domain success or failure reporting.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::{
    query_name, DomainResult, DomainSuffix, E164Number, EnumBackend, EnumQuery, EnumRecord,
    FailureKind, QueryOptions, QueryReport,
};
pub use crate::domain::config::EnumConfig;
pub use crate::domain::error::{EnumError, EnumResult};
pub use crate::infrastructure::create_backend;
