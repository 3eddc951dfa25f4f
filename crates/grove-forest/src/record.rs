//! Line records of the text model format: comma-separated `KEY=VALUE` fields.
//!
//! String values are double-quoted with `\"`, `\\` and `\n` escapes, so they
//! may contain commas, equals signs, and newlines. Reals are written with
//! Rust's shortest round-trip formatting, which parses back bit-for-bit.

use std::fmt::{Display, Write as _};
use std::str::FromStr;

use crate::error::ForestError;

/// Separator between labels in a categorical split's label list.
const LABEL_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq)]
struct Field {
    key: String,
    value: String,
}

/// One parsed line of a model stream.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    line: usize,
    fields: Vec<Field>,
}

impl Record {
    /// Parse `text` (without its trailing newline) found on one-based `line`.
    pub(crate) fn parse(line: usize, text: &str) -> Result<Self, ForestError> {
        let malformed = |reason: &str| ForestError::MalformedRecord {
            line,
            reason: reason.to_string(),
        };

        let mut fields = Vec::new();
        let mut chars = text.chars().peekable();
        loop {
            let mut key = String::new();
            for c in chars.by_ref() {
                if c == '=' {
                    break;
                }
                key.push(c);
            }
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(malformed("field without a key"));
            }

            let mut value = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some(other @ ('"' | '\\')) => value.push(other),
                            _ => return Err(malformed("invalid escape in quoted value")),
                        },
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(malformed("unterminated quoted value"));
                }
                match chars.next() {
                    None => {
                        fields.push(Field { key, value });
                        break;
                    }
                    Some(',') => fields.push(Field { key, value }),
                    Some(_) => return Err(malformed("unexpected text after quoted value")),
                }
            } else {
                let mut ended = true;
                for c in chars.by_ref() {
                    if c == ',' {
                        ended = false;
                        break;
                    }
                    value.push(c);
                }
                fields.push(Field {
                    key,
                    value: value.trim().to_string(),
                });
                if ended {
                    break;
                }
            }
        }

        Ok(Self { line, fields })
    }

    /// One-based line number this record was read from.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    /// Key of the first field, which names the record type.
    pub(crate) fn kind(&self) -> &str {
        self.fields.first().map_or("", |f| f.key.as_str())
    }

    /// Value of the first field.
    pub(crate) fn head(&self) -> &str {
        self.fields.first().map_or("", |f| f.value.as_str())
    }

    /// Return a field's value if present.
    pub(crate) fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == field)
            .map(|f| f.value.as_str())
    }

    /// Return a required field's value.
    pub(crate) fn require(&self, field: &'static str) -> Result<&str, ForestError> {
        self.get(field).ok_or(ForestError::MissingField {
            line: self.line,
            field,
        })
    }

    /// Parse a required field with [`FromStr`].
    pub(crate) fn parse_field<T: FromStr>(&self, field: &'static str) -> Result<T, ForestError> {
        let raw = self.require(field)?;
        raw.parse().map_err(|_| ForestError::InvalidValue {
            line: self.line,
            field,
            raw: raw.to_string(),
        })
    }
}

/// Builds one record line field by field.
#[derive(Debug, Default)]
pub(crate) struct RecordBuilder {
    line: String,
}

impl RecordBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn start_field(&mut self, key: &str) {
        if !self.line.is_empty() {
            self.line.push(',');
        }
        self.line.push_str(key);
        self.line.push('=');
    }

    /// Append an unquoted field (numbers, booleans, tags).
    #[must_use]
    pub(crate) fn raw(mut self, key: &str, value: impl Display) -> Self {
        self.start_field(key);
        // Writing into a String cannot fail.
        let _ = write!(self.line, "{value}");
        self
    }

    /// Append a quoted string field.
    #[must_use]
    pub(crate) fn text(mut self, key: &str, value: &str) -> Self {
        self.start_field(key);
        self.line.push('"');
        for c in value.chars() {
            match c {
                '"' => self.line.push_str("\\\""),
                '\\' => self.line.push_str("\\\\"),
                '\n' => self.line.push_str("\\n"),
                other => self.line.push(other),
            }
        }
        self.line.push('"');
        self
    }

    /// Finish the record, returning the line without a trailing newline.
    pub(crate) fn build(self) -> String {
        self.line
    }
}

/// Join labels into one string, escaping the separator.
pub(crate) fn join_labels<'a>(labels: impl IntoIterator<Item = &'a String>) -> String {
    let mut out = String::new();
    for (i, label) in labels.into_iter().enumerate() {
        if i > 0 {
            out.push(LABEL_SEPARATOR);
        }
        for c in label.chars() {
            if c == LABEL_SEPARATOR || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [`join_labels`].
pub(crate) fn split_labels(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    let mut labels = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c == LABEL_SEPARATOR => labels.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    labels.push(current);
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_and_quoted_fields() {
        let rec = Record::parse(3, r#"FOREST=Regressor,TARGET="N:y",INTERCEPT=0.5"#).unwrap();
        assert_eq!(rec.line(), 3);
        assert_eq!(rec.kind(), "FOREST");
        assert_eq!(rec.head(), "Regressor");
        assert_eq!(rec.get("TARGET"), Some("N:y"));
        let icept: f64 = rec.parse_field("INTERCEPT").unwrap();
        assert_eq!(icept, 0.5);
    }

    #[test]
    fn quoted_values_keep_commas_and_escapes() {
        let line = RecordBuilder::new()
            .raw("TREE", 0)
            .text("COSTS", r#"{"a":1,"b":2}"#)
            .text("NOTE", "line\nbreak \\ done")
            .build();
        let rec = Record::parse(1, &line).unwrap();
        assert_eq!(rec.get("COSTS"), Some(r#"{"a":1,"b":2}"#));
        assert_eq!(rec.get("NOTE"), Some("line\nbreak \\ done"));
    }

    #[test]
    fn empty_quoted_value() {
        let rec = Record::parse(1, r#"A="",B=1"#).unwrap();
        assert_eq!(rec.get("A"), Some(""));
        assert_eq!(rec.get("B"), Some("1"));
    }

    #[test]
    fn reals_round_trip_exactly() {
        for value in [0.1, 5.2, -1e-300, 1.0 / 3.0, f64::MAX] {
            let line = RecordBuilder::new().raw("X", value).build();
            let rec = Record::parse(1, &line).unwrap();
            let back: f64 = rec.parse_field("X").unwrap();
            assert_eq!(back.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn missing_and_invalid_fields() {
        let rec = Record::parse(7, "TREE=0,WEIGHT=abc").unwrap();
        assert!(matches!(
            rec.require("NODE"),
            Err(ForestError::MissingField { line: 7, field: "NODE" })
        ));
        assert!(matches!(
            rec.parse_field::<f64>("WEIGHT"),
            Err(ForestError::InvalidValue { line: 7, field: "WEIGHT", .. })
        ));
    }

    #[test]
    fn malformed_lines_rejected() {
        for bad in [r#"A="open"#, "=1", r#"A="x"y"#, r#"A="\q""#] {
            assert!(
                matches!(Record::parse(1, bad), Err(ForestError::MalformedRecord { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn label_lists_round_trip() {
        let labels: Vec<String> = vec!["a".into(), "b:c".into(), "d\\e".into(), String::new()];
        let joined = join_labels(&labels);
        assert_eq!(split_labels(&joined), labels);
        assert!(split_labels("").is_empty());
    }
}
