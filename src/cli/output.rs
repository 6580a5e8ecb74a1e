use crate::cli::args::OutputFormat;
use crate::core::query::{DomainResult, QueryReport};
use crate::domain::config::{BackendConfig, EnumConfig};
use std::fmt::Write as _;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_report(&self, report: &QueryReport) -> Result<(), OutputError>;
    fn write_query_name(&self, number: &str, domain: &str, name: &str) -> Result<(), OutputError>;
    fn write_config(&self, config: &EnumConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Formatting error: {0}")]
    FormatError(#[from] std::fmt::Error),
}

impl From<OutputError> for crate::domain::error::EnumError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Render a query report in the given format
pub fn render_report(format: OutputFormat, report: &QueryReport) -> Result<String, OutputError> {
    let mut out = String::new();
    match format {
        OutputFormat::Text => {
            writeln!(out, "Number: {}", report.number)?;
            for result in &report.results {
                writeln!(out, "Domain: {}", result.domain)?;
                match result.reason() {
                    None => {
                        writeln!(out, "  Status: success")?;
                        if result.records().is_empty() {
                            writeln!(out, "  Records: none")?;
                        } else {
                            writeln!(out, "  Records:")?;
                            for record in result.records() {
                                writeln!(out, "    {}", record)?;
                            }
                        }
                    }
                    Some(reason) => {
                        writeln!(out, "  Status: failed")?;
                        writeln!(out, "  Reason: {}", reason)?;
                    }
                }
            }
        }
        OutputFormat::Lines => {
            for result in &report.results {
                for record in result.records() {
                    writeln!(out, "{}", record)?;
                }
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Table => {
            let rows: Vec<RecordTableRow> = report.results.iter().flat_map(RecordTableRow::rows).collect();
            if !rows.is_empty() {
                writeln!(out, "{}", Table::new(rows))?;
            }
        }
        OutputFormat::Csv => {
            writeln!(out, "domain,number,success,order,pref,service,servicefound,uri,reason")?;
            for result in &report.results {
                for row in RecordTableRow::rows(result) {
                    writeln!(
                        out,
                        "{},{},{},{},{},{},{},{},{}",
                        csv_field(&row.domain),
                        csv_field(&result.number),
                        result.success,
                        row.order,
                        row.pref,
                        csv_field(&row.service),
                        row.found,
                        csv_field(&row.uri),
                        csv_field(result.reason().unwrap_or_default()),
                    )?;
                }
            }
        }
    }
    Ok(out)
}

/// Render the configuration in the given format
pub fn render_config(format: OutputFormat, config: &EnumConfig) -> Result<String, OutputError> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
        }
        _ => {
            writeln!(out, "enumlookup Configuration:")?;
            writeln!(out, "  Log level: {}", config.global.log_level)?;
            writeln!(out, "  Timeout: {}ms", config.global.timeout_ms)?;
            writeln!(out, "  Default domains: {}", config.lookup.default_domains.join(", "))?;
            if config.lookup.services.is_empty() {
                writeln!(out, "  Services: all")?;
            } else {
                writeln!(out, "  Services: {}", config.lookup.services.join(", "))?;
            }
            writeln!(out, "  Backend: {}", config.backend.kind())?;
            match &config.backend {
                BackendConfig::Dns { nameservers, port, attempts, use_tcp } => {
                    if nameservers.is_empty() {
                        writeln!(out, "    Nameservers: system")?;
                    } else {
                        writeln!(out, "    Nameservers: {}", nameservers.join(", "))?;
                    }
                    writeln!(out, "    Port: {}", port)?;
                    writeln!(out, "    Attempts: {}", attempts)?;
                    writeln!(out, "    TCP: {}", use_tcp)?;
                }
                BackendConfig::Script { script_path, module_dir, interpreter, interpreter_args } => {
                    writeln!(out, "    Script: {}", script_path.display())?;
                    if let Some(dir) = module_dir {
                        writeln!(out, "    Module directory: {}", dir.display())?;
                    }
                    if let Some(interpreter) = interpreter {
                        writeln!(out, "    Interpreter: {} {}", interpreter, interpreter_args.join(" "))?;
                    }
                }
            }
        }
    }
    Ok(out)
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_report(&self, report: &QueryReport) -> Result<(), OutputError> {
        print!("{}", render_report(self.format, report)?);

        // The lines format carries records only; failures go to stderr
        if self.format == OutputFormat::Lines {
            for result in &report.results {
                if let Some(reason) = result.reason() {
                    self.write_error(reason)?;
                }
            }
        }
        Ok(())
    }

    fn write_query_name(&self, number: &str, domain: &str, name: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "number": number,
                    "domain": domain,
                    "name": name,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => println!("{}", name),
        }
        Ok(())
    }

    fn write_config(&self, config: &EnumConfig) -> Result<(), OutputError> {
        print!("{}", render_config(self.format, config)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Table row for one record, or one failed domain
#[derive(Tabled)]
struct RecordTableRow {
    domain: String,
    order: String,
    pref: String,
    service: String,
    found: String,
    uri: String,
    status: String,
}

impl RecordTableRow {
    fn rows(result: &DomainResult) -> Vec<Self> {
        if let Some(reason) = result.reason() {
            return vec![Self {
                domain: result.domain.clone(),
                order: String::new(),
                pref: String::new(),
                service: String::new(),
                found: String::new(),
                uri: String::new(),
                status: reason.to_string(),
            }];
        }

        result
            .records()
            .iter()
            .map(|record| Self {
                domain: result.domain.clone(),
                order: record.order.to_string(),
                pref: record.preference.to_string(),
                service: record.service.clone(),
                found: if record.service_found { "yes" } else { "no" }.to_string(),
                uri: record.uri.clone(),
                status: "ok".to_string(),
            })
            .collect()
    }
}

/// Quote a CSV field when needed
fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::EnumBackend;
    use crate::core::number::{DomainSuffix, E164Number};
    use crate::core::query::{EnumQuery, QueryOptions};
    use crate::core::record::EnumRecord;
    use crate::domain::error::{EnumError, EnumResult};
    use async_trait::async_trait;

    struct OneDomainBackend;

    #[async_trait]
    impl EnumBackend for OneDomainBackend {
        fn name(&self) -> &'static str {
            "one-domain"
        }

        async fn lookup(
            &self,
            number: &E164Number,
            domain: &DomainSuffix,
            _services: &[String],
        ) -> EnumResult<Vec<EnumRecord>> {
            if domain.as_str() != ".e164.arpa" {
                return Err(EnumError::NotFound {
                    number: number.to_string(),
                    domain: domain.to_string(),
                });
            }
            Ok(vec![
                EnumRecord::parse_line("10|10|E2U+sip|1|sip:info@example.com").unwrap(),
                EnumRecord::parse_line("20|10|E2U+web:http|0|http://example.com/a,b").unwrap(),
            ])
        }
    }

    async fn report() -> QueryReport {
        let query = EnumQuery::new(Box::new(OneDomainBackend), QueryOptions::default());
        let domains = vec!["e164.arpa".to_string(), "e164.org".to_string()];
        query.query("+420234680499", &domains).await.unwrap()
    }

    #[tokio::test]
    async fn test_text_output() {
        let text = render_report(OutputFormat::Text, &report().await).unwrap();
        assert!(text.starts_with("Number: +420234680499\n"));
        assert!(text.contains("Domain: .e164.arpa\n  Status: success"));
        assert!(text.contains("    10|10|E2U+sip|1|sip:info@example.com\n"));
        assert!(text.contains("Domain: .e164.org\n  Status: failed\n  Reason: Not found"));
    }

    #[tokio::test]
    async fn test_lines_output() {
        let lines = render_report(OutputFormat::Lines, &report().await).unwrap();
        assert_eq!(
            lines,
            "10|10|E2U+sip|1|sip:info@example.com\n20|10|E2U+web:http|0|http://example.com/a,b\n"
        );
    }

    #[tokio::test]
    async fn test_csv_output_quotes_fields() {
        let csv = render_report(OutputFormat::Csv, &report().await).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with(",\"http://example.com/a,b\","));
        assert!(lines[3].starts_with(".e164.org,+420234680499,false,,,,,,"));
    }

    #[tokio::test]
    async fn test_table_output() {
        let table = render_report(OutputFormat::Table, &report().await).unwrap();
        assert!(table.contains("sip:info@example.com"));
        assert!(table.contains("Not found - number '+420234680499', domain '.e164.org'"));
    }

    #[tokio::test]
    async fn test_json_output() {
        let json = render_report(OutputFormat::Json, &report().await).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][0]["records"][1]["servicefound"], false);
    }

    #[test]
    fn test_config_text() {
        let text = render_config(OutputFormat::Text, &EnumConfig::default()).unwrap();
        assert!(text.contains("Default domains: .e164.arpa"));
        assert!(text.contains("Nameservers: system"));
    }
}
