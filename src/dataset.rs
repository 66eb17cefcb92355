//! PIZZA dataset records, one JSON object per line.
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DatasetError;

/// One utterance with its annotated targets. The released files prefix keys
/// with the split name (`train.SRC`, `dev.EXR`, ...), which is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  #[serde(rename = "SRC", alias = "train.SRC", alias = "dev.SRC", alias = "test.SRC")]
  pub src: String,
  #[serde(
    rename = "EXR",
    alias = "train.EXR",
    alias = "dev.EXR",
    alias = "test.EXR",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub exr: Option<String>,
  #[serde(
    rename = "TOP",
    alias = "train.TOP",
    alias = "dev.TOP",
    alias = "test.TOP",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub top: Option<String>,
  #[serde(
    rename = "CF",
    alias = "train.CF",
    alias = "dev.CF",
    alias = "test.CF",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub cf: Option<String>,
  #[serde(
    rename = "PCFG_ERR",
    alias = "train.PCFG_ERR",
    alias = "dev.PCFG_ERR",
    alias = "test.PCFG_ERR",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub pcfg_err: Option<bool>,
  #[serde(
    rename = "TOP-DECOUPLED",
    alias = "train.TOP-DECOUPLED",
    alias = "dev.TOP-DECOUPLED",
    alias = "test.TOP-DECOUPLED",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub top_decoupled: Option<String>,
}

/// Which annotated target of a record to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetField {
  #[default]
  Exr,
  Top,
  Cf,
  TopDecoupled,
}

impl fmt::Display for TargetField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Exr => write!(f, "EXR"),
      Self::Top => write!(f, "TOP"),
      Self::Cf => write!(f, "CF"),
      Self::TopDecoupled => write!(f, "TOP-DECOUPLED"),
    }
  }
}

impl FromStr for TargetField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "exr" => Ok(Self::Exr),
      "top" => Ok(Self::Top),
      "cf" => Ok(Self::Cf),
      "top-decoupled" | "top_decoupled" => Ok(Self::TopDecoupled),
      other => Err(format!("unknown target field {}", other)),
    }
  }
}

impl Record {
  pub fn target(&self, field: TargetField) -> Option<&str> {
    match field {
      TargetField::Exr => self.exr.as_deref(),
      TargetField::Top => self.top.as_deref(),
      TargetField::Cf => self.cf.as_deref(),
      TargetField::TopDecoupled => self.top_decoupled.as_deref(),
    }
  }
}

/// Reads JSON-lines records, skipping blank lines. Line numbers in errors
/// start at 1.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>, DatasetError> {
  let mut records = Vec::new();
  for (idx, line) in reader.lines().enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let record = serde_json::from_str(&line).map_err(|source| DatasetError::Json {
      line: idx + 1,
      source,
    })?;
    records.push(record);
  }
  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;

  const LINES: &str = r#"{"train.SRC": "two large pies with ham", "train.EXR": "(ORDER (PIZZAORDER (NUMBER 2 ) (SIZE LARGE ) (TOPPING HAM ) ) )", "train.TOP": "(ORDER (PIZZAORDER (NUMBER two ) (SIZE large ) pies with (TOPPING ham ) ) )", "train.PCFG_ERR": false}

{"SRC": "a coke", "EXR": "(ORDER (DRINKORDER (NUMBER 1 ) (DRINKTYPE COKE ) ) )", "TOP-DECOUPLED": "(ORDER (DRINKORDER (NUMBER a ) (DRINKTYPE coke ) ) )"}
"#;

  #[test]
  fn reads_prefixed_and_plain_keys() {
    let records = read_records(LINES.as_bytes()).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].src, "two large pies with ham");
    assert_eq!(records[0].pcfg_err, Some(false));
    assert!(records[0].target(TargetField::Top).unwrap().contains("pies with"));
    assert_eq!(records[0].target(TargetField::Cf), None);

    assert_eq!(
      records[1].target(TargetField::TopDecoupled),
      Some("(ORDER (DRINKORDER (NUMBER a ) (DRINKTYPE coke ) ) )")
    );
    assert_eq!(records[1].top, None);
  }

  #[test]
  fn reports_bad_line() {
    let err = read_records("{\"SRC\": \"ok\"}\n{not json}\n".as_bytes()).unwrap_err();
    assert!(matches!(err, DatasetError::Json { line: 2, .. }));
  }

  #[test]
  fn target_field_names() {
    assert_eq!("exr".parse(), Ok(TargetField::Exr));
    assert_eq!("TOP-DECOUPLED".parse(), Ok(TargetField::TopDecoupled));
    assert!("src".parse::<TargetField>().is_err());
    assert_eq!(TargetField::TopDecoupled.to_string(), "TOP-DECOUPLED");
  }
}
