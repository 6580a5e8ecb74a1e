use crate::core::number::{DomainSuffix, E164Number};
use crate::core::record::EnumRecord;
use crate::domain::error::EnumResult;
use async_trait::async_trait;

/// A source of ENUM records for a number under one domain suffix.
///
/// Implementations return `EnumError::InvalidQuery` when the backend rejects
/// the query, `EnumError::NotFound` when nothing is published, and any other
/// error for backend failures. Returned records are sorted by order and
/// preference.
#[async_trait]
pub trait EnumBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Look up the records of `number` under `domain`, flagging the records
    /// whose enumservice is in `services`
    async fn lookup(
        &self,
        number: &E164Number,
        domain: &DomainSuffix,
        services: &[String],
    ) -> EnumResult<Vec<EnumRecord>>;
}
