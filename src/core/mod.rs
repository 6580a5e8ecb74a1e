// Core module - ENUM resolution logic
pub mod backend;
pub mod naptr;
pub mod number;
pub mod query;
pub mod record;

pub use backend::EnumBackend;
pub use number::{query_name, DomainSuffix, E164Number};
pub use query::{DomainResult, EnumQuery, FailureKind, QueryOptions, QueryReport};
pub use record::EnumRecord;
