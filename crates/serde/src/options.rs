//! Codec configuration.

use std::fmt;
use std::str::FromStr;

use hl7v3::SchemaVersion;
use serde::{Deserialize, Serialize};

/// How timestamps are written. Every accepted format is read regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    /// `yyyyMMddHHmmss.ffff` followed by the UTC offset as `+HHMM`.
    #[default]
    Canonical,
    /// `yyyyMMddHHmmss.fff` in UTC, without an offset.
    Legacy,
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFormat::Canonical => f.write_str("canonical"),
            TimestampFormat::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "canonical" => Ok(TimestampFormat::Canonical),
            "legacy" => Ok(TimestampFormat::Legacy),
            other => Err(format!(
                "unknown timestamp format '{other}' (expected canonical or legacy)"
            )),
        }
    }
}

/// Options shared by the reader and the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Dialect: decides how the acknowledgement type is encoded.
    pub schema_version: SchemaVersion,
    pub timestamp_format: TimestampFormat,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the root when
    /// writing a whole document.
    pub xml_declaration: bool,
    /// Indent written XML by this many spaces; 0 writes everything on one line.
    pub indent: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            schema_version: SchemaVersion::V2011,
            timestamp_format: TimestampFormat::Canonical,
            xml_declaration: false,
            indent: 0,
        }
    }
}

impl CodecOptions {
    pub fn for_version(schema_version: SchemaVersion) -> Self {
        Self {
            schema_version,
            ..Default::default()
        }
    }
}
