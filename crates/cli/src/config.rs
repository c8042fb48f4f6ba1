//! Command-line configuration.
//!
//! Global options can also be set through the environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HL7V3_SCHEMA_VERSION` | 2011 | Schema dialect (2006 or 2011) |
//! | `HL7V3_TIMESTAMP_FORMAT` | canonical | Written timestamp format (canonical or legacy) |
//! | `HL7V3_INDENT` | 2 | Indentation of written XML, 0 for a single line |
//! | `HL7V3_LOG_LEVEL` | warn | Log level |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hl7v3::{AcknowledgementType, InteractionName, SchemaVersion};
use hl7v3_serde::{CodecOptions, TimestampFormat};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Largest accepted `--indent`.
const MAX_INDENT: usize = 16;

#[derive(Debug, Clone, Parser)]
#[command(name = "hl7v3", version)]
#[command(about = "Inspect, normalize and acknowledge HL7 V3 messages")]
pub struct CliConfig {
    /// Schema dialect of the messages (2006 or 2011).
    #[arg(long, global = true, env = "HL7V3_SCHEMA_VERSION", default_value = "2011")]
    pub schema_version: String,

    /// Timestamp format used when writing (canonical or legacy).
    #[arg(long, global = true, env = "HL7V3_TIMESTAMP_FORMAT", default_value = "canonical")]
    pub timestamp_format: String,

    /// Spaces of indentation in written XML; 0 writes a single line.
    #[arg(long, global = true, env = "HL7V3_INDENT", default_value = "2")]
    pub indent: usize,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "HL7V3_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Read a message and describe it.
    Inspect {
        /// Message file, or `-` for standard input.
        file: PathBuf,

        /// Interaction the message must be; any interaction when omitted.
        #[arg(long)]
        interaction_id: Option<String>,

        /// Print the decoded message as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read a message and write it back in canonical form.
    Normalize {
        /// Message file, or `-` for standard input.
        file: PathBuf,

        /// Output file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write an acknowledgement for a request message.
    Acknowledge {
        /// Request file, or `-` for standard input.
        file: PathBuf,

        /// Acknowledgement type (AA, AE, AR, CA, CE, CR).
        #[arg(long = "type", default_value = "AA")]
        type_code: String,

        /// Error detail as CODE:TEXT, using the national error code system.
        /// May be repeated.
        #[arg(long = "detail")]
        details: Vec<String>,

        /// Interaction of the acknowledgement message.
        #[arg(long, default_value = "MCCI_IN000002UV01")]
        interaction: String,

        /// Output file; standard output when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl CliConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.schema_version.parse::<SchemaVersion>() {
            errors.push(format!("Invalid schema version: {e}"));
        }

        if let Err(e) = self.timestamp_format.parse::<TimestampFormat>() {
            errors.push(format!("Invalid timestamp format: {e}"));
        }

        if self.indent > MAX_INDENT {
            errors.push(format!("Indent cannot exceed {MAX_INDENT}"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if let Command::Acknowledge {
            type_code,
            details,
            interaction,
            ..
        } = &self.command
        {
            match type_code.parse::<AcknowledgementType>() {
                Ok(parsed) if !details.is_empty() && !parsed.is_error() && !parsed.is_accept() => {
                    errors.push(format!(
                        "Acknowledgement type {parsed} cannot carry error details; use AE or CE"
                    ));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("Invalid acknowledgement type: {e}")),
            }
            if let Err(e) = InteractionName::new(interaction.as_str()) {
                errors.push(format!("Invalid interaction: {e}"));
            }
            for detail in details {
                if parse_detail(detail).is_none() {
                    errors.push(format!("Detail '{detail}' is not in CODE:TEXT form"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Codec options for the configured dialect and output layout.
    ///
    /// Call after [`CliConfig::validate`]; unparsable values fall back to
    /// their defaults.
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            schema_version: self.schema_version.parse().unwrap_or_default(),
            timestamp_format: self.timestamp_format.parse().unwrap_or_default(),
            xml_declaration: true,
            indent: self.indent,
        }
    }
}

/// Splits a `CODE:TEXT` detail argument.
pub fn parse_detail(detail: &str) -> Option<(&str, &str)> {
    let (code, text) = detail.split_once(':')?;
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some((code, text.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["hl7v3", "inspect", "message.xml"]);
        assert_eq!(config.schema_version, "2011");
        assert_eq!(config.indent, 2);
        assert!(config.validate().is_ok());

        let options = config.codec_options();
        assert_eq!(options.schema_version, SchemaVersion::V2011);
        assert_eq!(options.timestamp_format, TimestampFormat::Canonical);
        assert!(options.xml_declaration);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = parse(&[
            "hl7v3",
            "normalize",
            "in.xml",
            "--schema-version",
            "2006",
            "--timestamp-format",
            "legacy",
            "--indent",
            "0",
        ]);
        let options = config.codec_options();
        assert_eq!(options.schema_version, SchemaVersion::V2006);
        assert_eq!(options.timestamp_format, TimestampFormat::Legacy);
        assert_eq!(options.indent, 0);
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = parse(&[
            "hl7v3",
            "--schema-version",
            "2019",
            "--log-level",
            "loud",
            "acknowledge",
            "in.xml",
            "--type",
            "OK",
            "--detail",
            "no-separator",
        ]);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("schema version")));
        assert!(errors.iter().any(|e| e.contains("log level")));
        assert!(errors.iter().any(|e| e.contains("acknowledgement type")));
        assert!(errors.iter().any(|e| e.contains("no-separator")));
    }

    #[test]
    fn test_reject_with_details_is_refused() {
        let config = parse(&[
            "hl7v3",
            "acknowledge",
            "in.xml",
            "--type",
            "AR",
            "--detail",
            "E-104: Patient not found",
        ]);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("AE or CE"));

        let config = parse(&[
            "hl7v3",
            "acknowledge",
            "in.xml",
            "--type",
            "AA",
            "--detail",
            "E-104: Patient not found",
        ]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_detail() {
        assert_eq!(parse_detail("E-104: Patient not found"), Some(("E-104", "Patient not found")));
        assert_eq!(parse_detail("E-1:"), Some(("E-1", "")));
        assert_eq!(parse_detail(":text"), None);
        assert_eq!(parse_detail("text"), None);
    }
}
