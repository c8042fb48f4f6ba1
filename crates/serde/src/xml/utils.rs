//! Helpers and constants shared by the XML reader and writer.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::Event;

pub use hl7v3::{HL7_NAMESPACE, HL7_PREFIX, ITS_VERSION};

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Qualifies a local name with the `hl7` prefix.
pub fn qualified(local: &str) -> String {
    format!("{HL7_PREFIX}:{local}")
}

/// Returns `true` if `name` can be used as the local name of the root element.
pub fn is_valid_local_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Resolves entity and character references in a raw attribute or text value.
///
/// Malformed references are kept as written.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(raw) {
        Ok(value) => value,
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Checks that a stored XML fragment is well-formed on its own.
pub fn check_fragment(fragment: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(fragment);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(e)) => {
                if depth == 0 {
                    return Err(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ));
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(format!("{depth} unclosed element(s)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("receiver"), "hl7:receiver");
    }

    #[test]
    fn test_is_valid_local_name() {
        assert!(is_valid_local_name("MCCI_IN000002UV01"));
        assert!(is_valid_local_name("message"));
        assert!(!is_valid_local_name(""));
        assert!(!is_valid_local_name("hl7:message"));
        assert!(!is_valid_local_name("1abc"));
        assert!(!is_valid_local_name("a b"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a &amp; b"), "a & b");
        assert_eq!(unescape("&#65;"), "A");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape("broken &"), "broken &");
    }

    #[test]
    fn test_check_fragment() {
        assert!(check_fragment("<hl7:a><hl7:b/></hl7:a>").is_ok());
        assert!(check_fragment("").is_ok());
        assert!(check_fragment("<hl7:a>").is_err());
        assert!(check_fragment("</hl7:a>").is_err());
        assert!(check_fragment("<a></b>").is_err());
    }
}
