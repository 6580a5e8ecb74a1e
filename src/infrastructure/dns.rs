//! DNS backend resolving ENUM numbers through NAPTR lookups.
//!
//! Query names are built from the reversed digits of the number under each
//! domain suffix. Terminal (`u`) records are turned into URIs, non-terminal
//! records are followed a bounded number of times.

use crate::core::backend::EnumBackend;
use crate::core::naptr::{resolve, NaptrRecord, NaptrSource};
use crate::core::number::{DomainSuffix, E164Number};
use crate::core::record::EnumRecord;
use crate::domain::error::{EnumError, EnumResult};
use async_trait::async_trait;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::{Name, RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolver settings for the DNS backend
#[derive(Debug, Clone)]
pub struct DnsSettings {
    /// Nameservers to query; empty uses the system configuration
    pub nameservers: Vec<IpAddr>,
    pub port: u16,
    pub attempts: usize,
    pub use_tcp: bool,
    pub timeout: Duration,
}

impl DnsSettings {
    /// Build settings from configured nameserver strings
    pub fn new(
        nameservers: &[String],
        port: u16,
        attempts: usize,
        use_tcp: bool,
        timeout: Duration,
    ) -> EnumResult<Self> {
        let nameservers = nameservers
            .iter()
            .map(|ns| {
                ns.trim().parse::<IpAddr>().map_err(|e| EnumError::Config {
                    message: format!("Invalid nameserver address '{}': {}", ns, e),
                })
            })
            .collect::<EnumResult<Vec<_>>>()?;

        Ok(Self {
            nameservers,
            port,
            attempts: attempts.max(1),
            use_tcp,
            timeout,
        })
    }

    fn resolver_parts(&self) -> (ResolverConfig, ResolverOpts) {
        let (config, mut opts) = if self.nameservers.is_empty() {
            match hickory_resolver::system_conf::read_system_conf() {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("Failed to read system resolver configuration, using defaults: {}", e);
                    (ResolverConfig::default(), ResolverOpts::default())
                }
            }
        } else {
            let group = if self.use_tcp {
                NameServerConfigGroup::from(
                    self.nameservers
                        .iter()
                        .map(|ip| NameServerConfig::new(SocketAddr::new(*ip, self.port), Protocol::Tcp))
                        .collect::<Vec<_>>(),
                )
            } else {
                NameServerConfigGroup::from_ips_clear(&self.nameservers, self.port, true)
            };
            (ResolverConfig::from_parts(None, Vec::new(), group), ResolverOpts::default())
        };

        opts.timeout = self.timeout;
        opts.attempts = self.attempts;
        // Query names are always fully qualified
        opts.ndots = 0;
        (config, opts)
    }
}

/// ENUM backend querying DNS directly
pub struct DnsBackend {
    resolver: TokioAsyncResolver,
}

impl DnsBackend {
    /// Create a backend with its own resolver
    pub fn new(settings: &DnsSettings) -> Self {
        let (config, opts) = settings.resolver_parts();
        info!(
            "DNS backend using {} nameserver(s)",
            if settings.nameservers.is_empty() {
                "system".to_string()
            } else {
                settings.nameservers.len().to_string()
            }
        );
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl NaptrSource for DnsBackend {
    async fn naptr(&self, name: &str) -> EnumResult<Option<Vec<NaptrRecord>>> {
        let name = Name::from_ascii(name)
            .map_err(|e| EnumError::Resolver(format!("Invalid query name {}: {}", name, e)))?;

        let lookup = match self.resolver.lookup(name.clone(), RecordType::NAPTR).await {
            Ok(lookup) => lookup,
            Err(e) => {
                return match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => {
                        debug!("No NAPTR records at {}", name);
                        Ok(None)
                    }
                    _ => Err(EnumError::Resolver(format!("NAPTR lookup for {} failed: {}", name, e))),
                };
            }
        };

        let naptrs: Vec<NaptrRecord> = lookup
            .iter()
            .filter_map(|rdata| {
                if let RData::NAPTR(naptr) = rdata {
                    Some(NaptrRecord {
                        order: naptr.order(),
                        preference: naptr.preference(),
                        flags: String::from_utf8_lossy(naptr.flags()).into_owned(),
                        services: String::from_utf8_lossy(naptr.services()).into_owned(),
                        regexp: String::from_utf8_lossy(naptr.regexp()).into_owned(),
                        replacement: naptr.replacement().to_utf8(),
                    })
                } else {
                    None
                }
            })
            .collect();

        debug!("{} NAPTR record(s) at {}", naptrs.len(), name);
        Ok(Some(naptrs))
    }
}

#[async_trait]
impl EnumBackend for DnsBackend {
    fn name(&self) -> &'static str {
        "dns"
    }

    async fn lookup(
        &self,
        number: &E164Number,
        domain: &DomainSuffix,
        services: &[String],
    ) -> EnumResult<Vec<EnumRecord>> {
        resolve(self, number, domain, services).await
    }
}
