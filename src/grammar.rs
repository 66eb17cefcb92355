use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::Err;

pub const ORDER: &str = "ORDER";
pub const PIZZAORDER: &str = "PIZZAORDER";
pub const DRINKORDER: &str = "DRINKORDER";
pub const NOT: &str = "NOT";
pub const COMPLEX_TOPPING: &str = "COMPLEX_TOPPING";
pub const NUMBER: &str = "NUMBER";
pub const SIZE: &str = "SIZE";
pub const TOPPING: &str = "TOPPING";
pub const STYLE: &str = "STYLE";
pub const QUANTITY: &str = "QUANTITY";
pub const DRINKTYPE: &str = "DRINKTYPE";
pub const CONTAINERTYPE: &str = "CONTAINERTYPE";
pub const VOLUME: &str = "VOLUME";

/// What a constructor label stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  /// Top-level semantic constructor (ORDER, PIZZAORDER, ...)
  Intent,
  /// Composite constructor nested under an intent (NOT, COMPLEX_TOPPING, ...)
  Slot,
  /// Leaf-level entity (NUMBER, SIZE, ...)
  Entity,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Intent => write!(f, "intent"),
      Self::Slot => write!(f, "slot"),
      Self::Entity => write!(f, "entity"),
    }
  }
}

/// Strict grammars reject labels they don't declare, lenient ones keep them as
/// opaque constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
  #[default]
  Strict,
  Lenient,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Strict => write!(f, "strict"),
      Self::Lenient => write!(f, "lenient"),
    }
  }
}

/// The set of constructors the tokenizer, parser and matcher accept.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
  pub root: String,
  pub mode: Mode,
  constructors: HashMap<String, Role>,
}

impl Default for Grammar {
  fn default() -> Self {
    Self::pizza()
  }
}

impl Grammar {
  pub fn new(root: impl Into<String>, constructors: HashMap<String, Role>, mode: Mode) -> Self {
    Self {
      root: root.into(),
      mode,
      constructors,
    }
  }

  /// The PIZZA dataset grammar.
  pub fn pizza() -> Self {
    let intents = [ORDER, PIZZAORDER, DRINKORDER].map(|l| (l, Role::Intent));
    let slots = [NOT, COMPLEX_TOPPING].map(|l| (l, Role::Slot));
    let entities = [
      NUMBER,
      SIZE,
      TOPPING,
      STYLE,
      QUANTITY,
      DRINKTYPE,
      CONTAINERTYPE,
      VOLUME,
    ]
    .map(|l| (l, Role::Entity));

    let constructors = intents
      .into_iter()
      .chain(slots)
      .chain(entities)
      .map(|(l, r)| (l.to_string(), r))
      .collect();

    Self::new(ORDER, constructors, Mode::Strict)
  }

  pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Err> {
    let src = fs::read_to_string(path.as_ref())
      .map_err(|e| format!("reading grammar {}: {}", path.as_ref().display(), e))?;
    src.parse()
  }

  pub fn with_mode(mut self, mode: Mode) -> Self {
    self.mode = mode;
    self
  }

  pub fn role(&self, label: &str) -> Option<Role> {
    self.constructors.get(label).copied()
  }

  pub fn is_declared(&self, label: &str) -> bool {
    self.constructors.contains_key(label)
  }

  /// Whether a token directly after `(` should be read as a constructor label.
  pub fn is_label(&self, s: &str) -> bool {
    self.is_declared(s) || (self.mode == Mode::Lenient && looks_like_label(s))
  }

  pub fn len(&self) -> usize {
    self.constructors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.constructors.is_empty()
  }

  fn labels_with(&self, role: Role) -> Vec<&str> {
    let mut labels = self
      .constructors
      .iter()
      .filter(|(_, r)| **r == role)
      .map(|(l, _)| l.as_str())
      .collect::<Vec<_>>();
    labels.sort_unstable();
    labels
  }
}

/// Upper-case identifier, optionally with underscore-separated segments.
pub fn looks_like_label(s: &str) -> bool {
  lazy_static! {
    static ref LABEL: Regex = Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$").unwrap();
  }
  LABEL.is_match(s)
}

/// Writes the grammar back out in the declaration format read by
/// `parse_grammar`.
impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "root {};", self.root)?;
    for role in [Role::Intent, Role::Slot, Role::Entity] {
      let labels = self.labels_with(role);
      if !labels.is_empty() {
        writeln!(f, "{} {};", role, labels.join(" "))?;
      }
    }
    writeln!(f, "mode {};", self.mode)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pizza_roles() {
    let g = Grammar::pizza();
    assert_eq!(g.role(ORDER), Some(Role::Intent));
    assert_eq!(g.role(NOT), Some(Role::Slot));
    assert_eq!(g.role(TOPPING), Some(Role::Entity));
    assert_eq!(g.role("HAM"), None);
    assert_eq!(g.len(), 13);
  }

  #[test]
  fn lenient_accepts_label_shaped_tokens() {
    let strict = Grammar::pizza();
    let lenient = Grammar::pizza().with_mode(Mode::Lenient);

    assert!(!strict.is_label("CRUST_TYPE"));
    assert!(lenient.is_label("CRUST_TYPE"));
    assert!(lenient.is_label("TOPPING"));
    assert!(!lenient.is_label("ham"));
    assert!(!lenient.is_label("_HAM"));
    assert!(!lenient.is_label("HAM__X"));
  }

  #[test]
  fn reads_grammar_file() {
    let g = Grammar::read_from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/grammars/pizza.grammar")).unwrap();
    assert_eq!(g, Grammar::pizza());

    let dir = tempfile::tempdir().unwrap();
    assert!(Grammar::read_from_file(dir.path().join("missing.grammar")).is_err());

    let bad = dir.path().join("bad.grammar");
    fs::write(&bad, "intent ORDER").unwrap();
    assert!(Grammar::read_from_file(&bad).is_err());
  }

  #[test]
  fn display_round_trips() {
    let g = Grammar::pizza();
    let reparsed: Grammar = g.to_string().parse().unwrap();
    assert_eq!(reparsed, g);
  }
}
