use crate::domain::error::{EnumError, EnumResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A resolved ENUM entry: one service URI for a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumRecord {
    /// NAPTR order, lower is processed first
    pub order: u16,
    /// NAPTR preference among records of equal order
    #[serde(rename = "pref")]
    pub preference: u16,
    /// Service field as published, e.g. `E2U+sip`
    pub service: String,
    /// Whether the service matched one of the requested enumservices
    #[serde(rename = "servicefound")]
    pub service_found: bool,
    /// Resulting URI
    pub uri: String,
}

impl EnumRecord {
    /// Parse one line of the `order|pref|service|servicefound|uri` format.
    ///
    /// Fields are trimmed. The URI is the remainder of the line so a `|`
    /// inside it survives.
    pub fn parse_line(line: &str) -> EnumResult<Self> {
        let fields: Vec<&str> = line.splitn(5, '|').map(str::trim).collect();
        if fields.len() < 5 {
            return Err(EnumError::Parse(format!(
                "expected 5 fields, got {} in '{}'",
                fields.len(),
                line.trim()
            )));
        }

        let order = fields[0]
            .parse::<u16>()
            .map_err(|e| EnumError::Parse(format!("invalid order '{}': {}", fields[0], e)))?;
        let preference = fields[1]
            .parse::<u16>()
            .map_err(|e| EnumError::Parse(format!("invalid preference '{}': {}", fields[1], e)))?;

        Ok(Self {
            order,
            preference,
            service: fields[2].to_string(),
            service_found: parse_flag(fields[3]),
            uri: fields[4].to_string(),
        })
    }

    /// Parse a whole script output, ignoring blank lines
    pub fn parse_lines(output: &str) -> EnumResult<Vec<Self>> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Self::parse_line)
            .collect()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl fmt::Display for EnumRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.order,
            self.preference,
            self.service,
            if self.service_found { 1 } else { 0 },
            self.uri
        )
    }
}

impl FromStr for EnumRecord {
    type Err = EnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

/// Sort records by order, then preference. Ties keep their original position.
pub fn sort_records(records: &mut [EnumRecord]) {
    records.sort_by_key(|record| (record.order, record.preference));
}
