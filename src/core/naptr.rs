use crate::core::number::{query_name, DomainSuffix, E164Number};
use crate::core::record::{sort_records, EnumRecord};
use crate::domain::error::{EnumError, EnumResult};
use async_trait::async_trait;
use regex::RegexBuilder;
use tracing::{debug, warn};

/// Maximum number of non-terminal rewrites followed for a single lookup
pub const MAX_REWRITE_DEPTH: usize = 5;

/// A raw NAPTR record as returned by DNS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaptrRecord {
    pub order: u16,
    pub preference: u16,
    pub flags: String,
    pub services: String,
    pub regexp: String,
    pub replacement: String,
}

impl NaptrRecord {
    /// Terminal records carry the `u` flag and yield a URI
    pub fn is_terminal(&self) -> bool {
        self.flags.eq_ignore_ascii_case("u")
    }

    /// Non-terminal records have no flags and point at another name
    pub fn is_rewrite(&self) -> bool {
        self.flags.is_empty() && !is_root(&self.replacement)
    }
}

fn is_root(name: &str) -> bool {
    name.is_empty() || name == "."
}

/// One `type[:subtype...]` entry of an enumservice, e.g. `voice:tel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceType {
    pub kind: String,
    pub subtypes: Vec<String>,
}

impl ServiceType {
    fn parse(spec: &str) -> Option<Self> {
        let mut pieces = spec.split(':');
        let kind = pieces.next().unwrap_or_default();
        if kind.is_empty() {
            return None;
        }

        Some(Self {
            kind: kind.to_string(),
            subtypes: pieces.filter(|s| !s.is_empty()).map(str::to_string).collect(),
        })
    }
}

/// Parsed enumservice. `E2U+sip+voice:tel` carries the types `sip` and
/// `voice` (subtype `tel`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumservice {
    pub types: Vec<ServiceType>,
}

impl Enumservice {
    /// Parse a NAPTR services field. Accepts `E2U+type[:subtype][+type...]`
    /// and the older `type+E2U` form; anything else is not an ENUM service.
    pub fn parse(services: &str) -> Option<Self> {
        let lower = services.trim().to_ascii_lowercase();
        let parts: Vec<&str> = lower.split('+').collect();

        let specs: &[&str] = match parts.as_slice() {
            ["e2u", specs @ ..] if !specs.is_empty() => specs,
            [spec, "e2u"] => std::slice::from_ref(spec),
            _ => return None,
        };

        let types = specs
            .iter()
            .map(|spec| ServiceType::parse(spec))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { types })
    }

    /// Whether any of the service types is wanted. No wanted types means
    /// every service is wanted.
    pub fn matches(&self, wanted: &[String]) -> bool {
        wanted.is_empty()
            || self
                .types
                .iter()
                .any(|t| wanted.iter().any(|w| w.trim().eq_ignore_ascii_case(&t.kind)))
    }
}

/// Apply an RFC 3402 substitution expression (`!ere!repl!flags`) to the
/// application-unique string.
///
/// Returns `Ok(None)` when the expression is empty or does not match.
pub fn apply_regexp(expression: &str, aus: &str) -> EnumResult<Option<String>> {
    let mut chars = expression.chars();
    let delim = match chars.next() {
        Some(c) => c,
        None => return Ok(None),
    };
    if delim.is_ascii_digit() || delim == '\\' || delim == 'i' {
        return Err(EnumError::Parse(format!("invalid regexp delimiter in '{}'", expression)));
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if next == delim => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => {
                    return Err(EnumError::Parse(format!("dangling escape in '{}'", expression)));
                }
            },
            c if c == delim => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);

    if parts.len() != 3 {
        return Err(EnumError::Parse(format!("malformed regexp '{}'", expression)));
    }
    let (ere, repl, flags) = (&parts[0], &parts[1], &parts[2]);
    let case_insensitive = match flags.as_str() {
        "" => false,
        "i" => true,
        other => {
            return Err(EnumError::Parse(format!("unknown regexp flags '{}'", other)));
        }
    };

    let regex = RegexBuilder::new(ere)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| EnumError::Parse(format!("invalid regexp '{}': {}", ere, e)))?;

    let captures = match regex.captures(aus) {
        Some(captures) => captures,
        None => return Ok(None),
    };
    let matched = captures.get(0).map_or(0..0, |m| m.range());

    let mut expanded = String::new();
    let mut repl_chars = repl.chars();
    while let Some(c) = repl_chars.next() {
        if c != '\\' {
            expanded.push(c);
            continue;
        }
        match repl_chars.next() {
            Some(d) if d.is_ascii_digit() => {
                let index = d.to_digit(10).unwrap_or_default() as usize;
                if let Some(group) = captures.get(index) {
                    expanded.push_str(group.as_str());
                }
            }
            Some(other) => expanded.push(other),
            None => expanded.push('\\'),
        }
    }

    Ok(Some(format!("{}{}{}", &aus[..matched.start], expanded, &aus[matched.end..])))
}

/// Outcome of evaluating one NAPTR answer set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Terminal records converted to ENUM records, sorted
    pub records: Vec<EnumRecord>,
    /// Replacement names of non-terminal records, in processing order
    pub rewrites: Vec<String>,
}

/// Turn a NAPTR answer set into ENUM records for the given number.
///
/// Non-ENUM services, unknown flags and records whose expression fails or
/// does not match are skipped.
pub fn evaluate(mut naptrs: Vec<NaptrRecord>, number: &E164Number, wanted: &[String]) -> Evaluation {
    naptrs.sort_by_key(|n| (n.order, n.preference));

    let mut evaluation = Evaluation::default();
    for naptr in naptrs {
        let service = match Enumservice::parse(&naptr.services) {
            Some(service) => service,
            None if naptr.is_rewrite() => {
                evaluation.rewrites.push(naptr.replacement.clone());
                continue;
            }
            None => {
                debug!("Skipping non-ENUM service '{}'", naptr.services);
                continue;
            }
        };

        if naptr.is_rewrite() {
            evaluation.rewrites.push(naptr.replacement.clone());
            continue;
        }
        if !naptr.is_terminal() {
            debug!("Skipping NAPTR with unsupported flags '{}'", naptr.flags);
            continue;
        }

        match apply_regexp(&naptr.regexp, number.as_str()) {
            Ok(Some(uri)) => evaluation.records.push(EnumRecord {
                order: naptr.order,
                preference: naptr.preference,
                service: naptr.services.clone(),
                service_found: service.matches(wanted),
                uri,
            }),
            Ok(None) => debug!("Regexp '{}' does not match {}", naptr.regexp, number),
            Err(e) => warn!("Ignoring NAPTR record: {}", e),
        }
    }

    sort_records(&mut evaluation.records);
    evaluation
}

/// A source of NAPTR record sets
#[async_trait]
pub trait NaptrSource: Send + Sync {
    /// NAPTR records at a fully qualified name; `None` when the name has none
    async fn naptr(&self, name: &str) -> EnumResult<Option<Vec<NaptrRecord>>>;
}

/// Check that a fully qualified name fits DNS limits (RFC 1035)
pub fn is_valid_query_name(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| !label.is_empty() && label.len() <= 63)
}

/// Resolve a number under a domain from a NAPTR source.
///
/// Terminal records of the first answer set that has any are returned.
/// Otherwise the first non-terminal record is followed, at most
/// [`MAX_REWRITE_DEPTH`] times.
pub async fn resolve(
    source: &dyn NaptrSource,
    number: &E164Number,
    domain: &DomainSuffix,
    services: &[String],
) -> EnumResult<Vec<EnumRecord>> {
    let invalid = || EnumError::InvalidQuery {
        number: number.to_string(),
        domain: domain.to_string(),
    };
    let not_found = || EnumError::NotFound {
        number: number.to_string(),
        domain: domain.to_string(),
    };

    let mut name = query_name(number, domain);
    if !is_valid_query_name(&name) {
        return Err(invalid());
    }

    for depth in 0..=MAX_REWRITE_DEPTH {
        let naptrs = match source.naptr(&name).await? {
            Some(naptrs) if !naptrs.is_empty() => naptrs,
            _ => return Err(not_found()),
        };

        let evaluation = evaluate(naptrs, number, services);
        if !evaluation.records.is_empty() {
            return Ok(evaluation.records);
        }

        match evaluation.rewrites.into_iter().next() {
            Some(next) if depth < MAX_REWRITE_DEPTH => {
                debug!("Following non-terminal NAPTR {} -> {}", name, next);
                if !is_valid_query_name(&next) {
                    return Err(invalid());
                }
                name = next;
            }
            Some(_) => warn!("Rewrite limit reached at {}", name),
            None => return Err(not_found()),
        }
    }

    Err(not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naptr(order: u16, preference: u16, flags: &str, services: &str, regexp: &str) -> NaptrRecord {
        NaptrRecord {
            order,
            preference,
            flags: flags.to_string(),
            services: services.to_string(),
            regexp: regexp.to_string(),
            replacement: ".".to_string(),
        }
    }

    #[test]
    fn test_enumservice_forms() {
        let sip = Enumservice::parse("E2U+sip").unwrap();
        assert_eq!(sip.types.len(), 1);
        assert_eq!(sip.types[0].kind, "sip");
        assert!(sip.types[0].subtypes.is_empty());

        let voice = Enumservice::parse("E2U+voice:tel").unwrap();
        assert_eq!(voice.types[0].kind, "voice");
        assert_eq!(voice.types[0].subtypes, vec!["tel"]);

        let legacy = Enumservice::parse("sip+E2U").unwrap();
        assert_eq!(legacy.types[0].kind, "sip");

        let multi = Enumservice::parse("E2U+sip+voice:tel").unwrap();
        let kinds: Vec<&str> = multi.types.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["sip", "voice"]);
        assert_eq!(multi.types[1].subtypes, vec!["tel"]);

        assert!(Enumservice::parse("SIP+D2U").is_none());
        assert!(Enumservice::parse("E2U+").is_none());
        assert!(Enumservice::parse("E2U").is_none());
        assert!(Enumservice::parse("E2U+sip+").is_none());
        assert!(Enumservice::parse("").is_none());
    }

    #[test]
    fn test_enumservice_matching() {
        let sip = Enumservice::parse("E2U+sip").unwrap();
        assert!(sip.matches(&[]));
        assert!(sip.matches(&["SIP".to_string()]));
        assert!(!sip.matches(&["email".to_string(), "web".to_string()]));

        let multi = Enumservice::parse("E2U+sip+voice:tel").unwrap();
        assert!(multi.matches(&["voice".to_string()]));
        assert!(multi.matches(&["sip".to_string()]));
        assert!(!multi.matches(&["tel".to_string()]));
    }

    #[test]
    fn test_apply_regexp_catch_all() {
        let uri = apply_regexp("!^.*$!sip:info@example.com!", "+420234680499").unwrap();
        assert_eq!(uri.as_deref(), Some("sip:info@example.com"));
    }

    #[test]
    fn test_apply_regexp_backreference() {
        let uri = apply_regexp("!^\\+420(.*)$!sip:\\1@example.cz!", "+420234680499").unwrap();
        assert_eq!(uri.as_deref(), Some("sip:234680499@example.cz"));

        let whole = apply_regexp("/^(.*)$/tel:\\1/", "+4202").unwrap();
        assert_eq!(whole.as_deref(), Some("tel:+4202"));

        let full_match = apply_regexp("!^.*$!tel:\\0!", "+4202").unwrap();
        assert_eq!(full_match.as_deref(), Some("tel:+4202"));
    }

    #[test]
    fn test_apply_regexp_escaped_delimiter() {
        let uri = apply_regexp("!^.*$!http://example.com/a\\!b!", "+1").unwrap();
        assert_eq!(uri.as_deref(), Some("http://example.com/a!b"));
    }

    #[test]
    fn test_apply_regexp_case_flag() {
        assert_eq!(apply_regexp("!^X$!a!", "x").unwrap(), None);
        assert_eq!(apply_regexp("!^X$!a!i", "x").unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_apply_regexp_no_match() {
        assert_eq!(apply_regexp("!^\\+1(.*)$!sip:\\1@x!", "+420").unwrap(), None);
        assert_eq!(apply_regexp("", "+420").unwrap(), None);
    }

    #[test]
    fn test_apply_regexp_malformed() {
        assert!(apply_regexp("!^.*$!sip:x", "+1").is_err());
        assert!(apply_regexp("!^.*$!a!b!c", "+1").is_err());
        assert!(apply_regexp("1^.*$1a1", "+1").is_err());
        assert!(apply_regexp("!^.*$!a!g", "+1").is_err());
        assert!(apply_regexp("!(!a!", "+1").is_err());
    }

    #[test]
    fn test_evaluate_orders_and_filters() {
        let number = E164Number::parse("+420234680499").unwrap();
        let naptrs = vec![
            naptr(100, 20, "u", "E2U+email:mailto", "!^.*$!mailto:info@example.cz!"),
            naptr(100, 10, "u", "E2U+sip", "!^.*$!sip:info@example.cz!"),
            naptr(50, 10, "u", "SIP+D2U", "!^.*$!sip:ignored!"),
            naptr(10, 10, "s", "E2U+sip", "!^.*$!sip:unsupported!"),
            naptr(200, 10, "u", "E2U+web:http", "!^\\+1.*$!http://nomatch!"),
        ];

        let evaluation = evaluate(naptrs, &number, &["sip".to_string()]);
        assert!(evaluation.rewrites.is_empty());
        assert_eq!(evaluation.records.len(), 2);
        assert_eq!(evaluation.records[0].uri, "sip:info@example.cz");
        assert!(evaluation.records[0].service_found);
        assert_eq!(evaluation.records[1].service, "E2U+email:mailto");
        assert!(!evaluation.records[1].service_found);
    }

    #[test]
    fn test_evaluate_collects_rewrites() {
        let number = E164Number::parse("+4202").unwrap();
        let mut rewrite = naptr(10, 10, "", "E2U+sip", "");
        rewrite.replacement = "2.0.2.4.enum.example.net.".to_string();

        let evaluation = evaluate(vec![rewrite], &number, &[]);
        assert!(evaluation.records.is_empty());
        assert_eq!(evaluation.rewrites, vec!["2.0.2.4.enum.example.net."]);
    }

    /// In-memory zone keyed by fully qualified name
    struct Zone(std::collections::HashMap<String, Vec<NaptrRecord>>);

    #[async_trait]
    impl NaptrSource for Zone {
        async fn naptr(&self, name: &str) -> EnumResult<Option<Vec<NaptrRecord>>> {
            Ok(self.0.get(name).cloned())
        }
    }

    fn target() -> (E164Number, DomainSuffix) {
        (E164Number::parse("+4202").unwrap(), DomainSuffix::parse("e164.arpa").unwrap())
    }

    #[test]
    fn test_query_name_limits() {
        assert!(is_valid_query_name("2.0.2.4.e164.arpa."));
        assert!(!is_valid_query_name("."));
        assert!(!is_valid_query_name(&format!("{}.arpa.", "a".repeat(64))));
        assert!(!is_valid_query_name(&"a.".repeat(130)));
    }

    #[tokio::test]
    async fn test_resolve_terminal_records() {
        let (number, domain) = target();
        let mut zone = std::collections::HashMap::new();
        zone.insert(
            "2.0.2.4.e164.arpa.".to_string(),
            vec![naptr(10, 10, "u", "E2U+sip", "!^.*$!sip:info@example.cz!")],
        );

        let records = resolve(&Zone(zone), &number, &domain, &[]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uri, "sip:info@example.cz");
    }

    #[tokio::test]
    async fn test_resolve_follows_rewrite() {
        let (number, domain) = target();
        let mut rewrite = naptr(10, 10, "", "", "");
        rewrite.replacement = "2.0.2.4.enum.example.net.".to_string();
        let mut zone = std::collections::HashMap::new();
        zone.insert("2.0.2.4.e164.arpa.".to_string(), vec![rewrite]);
        zone.insert(
            "2.0.2.4.enum.example.net.".to_string(),
            vec![naptr(10, 10, "u", "E2U+sip", "!^\\+(.*)$!sip:\\1@example.net!")],
        );

        let records = resolve(&Zone(zone), &number, &domain, &[]).await.unwrap();
        assert_eq!(records[0].uri, "sip:4202@example.net");
    }

    #[tokio::test]
    async fn test_resolve_rewrite_loop_is_bounded() {
        let (number, domain) = target();
        let mut rewrite = naptr(10, 10, "", "", "");
        rewrite.replacement = "2.0.2.4.e164.arpa.".to_string();
        let mut zone = std::collections::HashMap::new();
        zone.insert("2.0.2.4.e164.arpa.".to_string(), vec![rewrite]);

        let err = resolve(&Zone(zone), &number, &domain, &[]).await.unwrap_err();
        assert!(matches!(err, EnumError::NotFound { .. }));
    }

    /// Zone with `hops` chained rewrites from the number's name, the last
    /// target holding a terminal record
    fn rewrite_chain(hops: usize) -> Zone {
        let mut zone = std::collections::HashMap::new();
        let mut name = "2.0.2.4.e164.arpa.".to_string();
        for hop in 1..=hops {
            let next = format!("hop{}.example.net.", hop);
            let mut rewrite = naptr(10, 10, "", "", "");
            rewrite.replacement = next.clone();
            zone.insert(name, vec![rewrite]);
            name = next;
        }
        zone.insert(name, vec![naptr(10, 10, "u", "E2U+sip", "!^.*$!sip:end@example.net!")]);
        Zone(zone)
    }

    #[tokio::test]
    async fn test_resolve_follows_rewrites_up_to_limit() {
        let (number, domain) = target();
        let records = resolve(&rewrite_chain(MAX_REWRITE_DEPTH), &number, &domain, &[])
            .await
            .unwrap();
        assert_eq!(records[0].uri, "sip:end@example.net");
    }

    #[tokio::test]
    async fn test_resolve_stops_past_rewrite_limit() {
        let (number, domain) = target();
        let err = resolve(&rewrite_chain(MAX_REWRITE_DEPTH + 1), &number, &domain, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EnumError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let (number, domain) = target();
        let mut zone = std::collections::HashMap::new();
        zone.insert(
            "2.0.2.4.e164.arpa.".to_string(),
            vec![naptr(10, 10, "u", "SIP+D2U", "!^.*$!sip:x!")],
        );

        let empty = Zone(std::collections::HashMap::new());
        assert!(matches!(
            resolve(&empty, &number, &domain, &[]).await,
            Err(EnumError::NotFound { .. })
        ));
        assert!(matches!(
            resolve(&Zone(zone), &number, &domain, &[]).await,
            Err(EnumError::NotFound { .. })
        ));
    }
}
