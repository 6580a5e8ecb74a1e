use crate::domain::error::{EnumError, EnumResult};
use serde::Serialize;
use std::fmt;

/// Maximum number of digits in an E.164 number
pub const MAX_E164_DIGITS: usize = 15;

/// A normalized E.164 number, always of the form `+<digits>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct E164Number(String);

impl E164Number {
    /// Normalize a user-supplied search string.
    ///
    /// Surrounding whitespace and inner spaces are removed and a leading `+`
    /// is added when missing. The result must be `+` followed by at most
    /// fifteen digits.
    pub fn parse(search: &str) -> EnumResult<Self> {
        let mut normalized = search.trim().replace(' ', "");
        if !normalized.starts_with('+') {
            normalized.insert(0, '+');
        }

        let digits = &normalized[1..];
        if digits.is_empty()
            || digits.len() > MAX_E164_DIGITS
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(EnumError::InvalidSearchString(normalized));
        }

        Ok(Self(normalized))
    }

    /// The number including its leading `+`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits without the leading `+`
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for E164Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized domain suffix, always starting with `.` and never ending with one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DomainSuffix(String);

impl DomainSuffix {
    /// Normalize a domain suffix: trim, lowercase, add a leading dot and drop
    /// a trailing one.
    ///
    /// Labels must be ASCII letters, digits, `-` or `_`, at most 63 bytes
    /// each. Internationalized names have to be given in their `xn--` form.
    pub fn parse(domain: &str) -> EnumResult<Self> {
        let trimmed = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let labels = trimmed.trim_start_matches('.');

        if labels.is_empty() || !labels.split('.').all(is_valid_label) {
            return Err(EnumError::InvalidDomain(domain.trim().to_string()));
        }

        Ok(Self(format!(".{}", labels)))
    }

    /// The suffix including its leading `.`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The suffix without its leading `.`
    pub fn zone(&self) -> &str {
        &self.0[1..]
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl fmt::Display for DomainSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the fully qualified ENUM query name: reversed digits separated by
/// dots, followed by the domain suffix and the root label.
pub fn query_name(number: &E164Number, domain: &DomainSuffix) -> String {
    let mut name = String::with_capacity(number.digits().len() * 2 + domain.as_str().len() + 1);
    for digit in number.digits().chars().rev() {
        name.push(digit);
        name.push('.');
    }
    name.push_str(domain.zone());
    name.push('.');
    name
}
