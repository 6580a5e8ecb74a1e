use crate::core::backend::EnumBackend;
use crate::core::number::{DomainSuffix, E164Number};
use crate::core::record::EnumRecord;
use crate::domain::config::EnumConfig;
use crate::domain::error::{EnumError, EnumResult};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Options applied to every query
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Domains used when a query names none
    pub default_domains: Vec<String>,
    /// Enumservice types reported as found
    pub services: Vec<String>,
    /// Per-domain lookup timeout
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&EnumConfig::default())
    }
}

impl From<&EnumConfig> for QueryOptions {
    fn from(config: &EnumConfig) -> Self {
        Self {
            default_domains: config.lookup.default_domains.clone(),
            services: config.lookup.services.clone(),
            timeout: Duration::from_millis(config.global.timeout_ms),
        }
    }
}

/// Why a domain lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidDomain,
    InvalidQuery,
    NotFound,
    Backend,
}

impl From<&EnumError> for FailureKind {
    fn from(error: &EnumError) -> Self {
        match error {
            EnumError::InvalidDomain(_) => FailureKind::InvalidDomain,
            EnumError::InvalidQuery { .. } => FailureKind::InvalidQuery,
            EnumError::NotFound { .. } => FailureKind::NotFound,
            _ => FailureKind::Backend,
        }
    }
}

/// Records or failure reason of a single domain lookup
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DomainOutcome {
    Success {
        records: Vec<EnumRecord>,
    },
    Failure {
        reason: String,
        #[serde(skip)]
        kind: FailureKind,
    },
}

/// Result of looking up a number under one domain
#[derive(Debug, Clone, Serialize)]
pub struct DomainResult {
    pub number: String,
    pub domain: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: DomainOutcome,
}

impl DomainResult {
    fn succeeded(number: &E164Number, domain: String, records: Vec<EnumRecord>) -> Self {
        Self {
            number: number.to_string(),
            domain,
            success: true,
            outcome: DomainOutcome::Success { records },
        }
    }

    fn failed(number: &E164Number, domain: String, error: &EnumError) -> Self {
        Self {
            number: number.to_string(),
            domain,
            success: false,
            outcome: DomainOutcome::Failure {
                reason: error.to_string(),
                kind: FailureKind::from(error),
            },
        }
    }

    /// Records of a successful lookup, empty on failure
    pub fn records(&self) -> &[EnumRecord] {
        match &self.outcome {
            DomainOutcome::Success { records } => records,
            DomainOutcome::Failure { .. } => &[],
        }
    }

    /// Failure reason, if the lookup failed
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            DomainOutcome::Success { .. } => None,
            DomainOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    /// Failure kind, if the lookup failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            DomainOutcome::Success { .. } => None,
            DomainOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Results of one query across all its domains, in query order
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query_id: Uuid,
    pub number: String,
    pub results: Vec<DomainResult>,
}

impl QueryReport {
    /// Result for a domain, matched after normalization
    pub fn get(&self, domain: &str) -> Option<&DomainResult> {
        let domain = DomainSuffix::parse(domain).ok()?;
        self.results.iter().find(|r| r.domain == domain.as_str())
    }

    /// Number of domains that returned records
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Exit status of the query: 0 when any domain succeeded, 2 when nothing
    /// was found, 1 when every query was rejected as invalid and 3 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success_count() > 0 {
            return 0;
        }

        let kinds: Vec<FailureKind> = self.results.iter().filter_map(|r| r.failure_kind()).collect();
        if kinds.contains(&FailureKind::NotFound) {
            2
        } else if kinds
            .iter()
            .all(|k| matches!(k, FailureKind::InvalidQuery | FailureKind::InvalidDomain))
        {
            1
        } else {
            3
        }
    }
}

/// ENUM query runner over a lookup backend
pub struct EnumQuery {
    backend: Box<dyn EnumBackend>,
    options: QueryOptions,
}

impl EnumQuery {
    /// Create a new query runner
    pub fn new(backend: Box<dyn EnumBackend>, options: QueryOptions) -> Self {
        Self { backend, options }
    }

    /// Options in effect
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Look up `search` under each of `domains`, or under the default domains
    /// when none are given.
    ///
    /// An invalid number fails the whole query. Per-domain problems are
    /// reported in the matching `DomainResult`. Domains are queried one at a
    /// time and duplicates are queried once.
    pub async fn query(&self, search: &str, domains: &[String]) -> EnumResult<QueryReport> {
        let number = E164Number::parse(search)?;
        let domains = if domains.is_empty() {
            self.options.default_domains.as_slice()
        } else {
            domains
        };
        if domains.is_empty() {
            return Err(EnumError::Config {
                message: "No domains to query and no default domains configured".to_string(),
            });
        }

        let query_id = Uuid::new_v4();
        let span = info_span!("enum_query", %query_id, %number, backend = self.backend.name());

        async {
            let mut seen = HashSet::new();
            let mut results = Vec::with_capacity(domains.len());

            for raw in domains {
                let key = DomainSuffix::parse(raw)
                    .map(|d| d.as_str().to_string())
                    .unwrap_or_else(|_| raw.trim().to_string());
                if !seen.insert(key) {
                    debug!("Skipping duplicate domain '{}'", raw);
                    continue;
                }
                results.push(self.lookup_domain(&number, raw).await);
            }

            let report = QueryReport {
                query_id,
                number: number.to_string(),
                results,
            };
            info!(
                "Query finished: {}/{} domains returned records",
                report.success_count(),
                report.results.len()
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Look up `search` under a single domain
    pub async fn query_domain(&self, search: &str, domain: &str) -> EnumResult<DomainResult> {
        let number = E164Number::parse(search)?;
        Ok(self.lookup_domain(&number, domain).await)
    }

    async fn lookup_domain(&self, number: &E164Number, raw_domain: &str) -> DomainResult {
        let domain = match DomainSuffix::parse(raw_domain) {
            Ok(domain) => domain,
            Err(e) => {
                warn!("{}", e);
                return DomainResult::failed(number, raw_domain.trim().to_string(), &e);
            }
        };

        debug!("Looking up {} under {}", number, domain);
        let lookup = self.backend.lookup(number, &domain, &self.options.services);
        let outcome = match tokio::time::timeout(self.options.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(EnumError::Timeout {
                timeout_ms: self.options.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(records) => {
                info!("{}: {} record(s)", domain, records.len());
                DomainResult::succeeded(number, domain.to_string(), records)
            }
            Err(e) => {
                info!("{}: {}", domain, e);
                DomainResult::failed(number, domain.to_string(), &e)
            }
        }
    }
}
