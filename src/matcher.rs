use std::fmt;

use crate::canonical::{Canon, canonicalize};
use crate::errors::MatcherError;
use crate::grammar::{Grammar, Mode};
use crate::syntree::{Node, Tree};

/// One structural difference between a prediction and its reference.
/// `expected` is `None` for an unexpected predicted entry, `actual` is `None`
/// for a missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
  pub path: Vec<String>,
  pub expected: Option<String>,
  pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path = self.path.join("/");
    match (&self.expected, &self.actual) {
      (Some(e), Some(a)) => write!(f, "{}: expected {}, found {}", path, e, a),
      (Some(e), None) => write!(f, "{}: missing {}", path, e),
      (None, Some(a)) => write!(f, "{}: unexpected {}", path, a),
      (None, None) => write!(f, "{}", path),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
  pub is_match: bool,
  pub mismatches: Vec<Mismatch>,
}

impl MatchResult {
  fn from_mismatches(mismatches: Vec<Mismatch>) -> Self {
    Self {
      is_match: mismatches.is_empty(),
      mismatches,
    }
  }
}

/// Compares predicted trees against gold trees under the dataset's semantics:
/// order-insensitive, with negation scope expanded (see [`crate::canonical`]).
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'g> {
  grammar: &'g Grammar,
}

impl<'g> Matcher<'g> {
  pub fn new(grammar: &'g Grammar) -> Self {
    Self { grammar }
  }

  /// Disagreement between the trees is reported in the result, never as an
  /// error. Errors only mean one of the trees is not a valid tree.
  pub fn compare(&self, predicted: &Tree, gold: &Tree) -> Result<MatchResult, MatcherError> {
    let predicted = self.canonical(predicted)?;
    let gold = self.canonical(gold)?;

    let mut mismatches = Vec::new();
    diff(&predicted, &gold, &mut Vec::new(), &mut mismatches);
    Ok(MatchResult::from_mismatches(mismatches))
  }

  fn canonical(&self, tree: &Tree) -> Result<Canon, MatcherError> {
    self.validate(tree)?;
    canonicalize(tree).ok_or_else(|| MatcherError::WrongRoot {
      expected: self.grammar.root.clone(),
      found: tree.root_label().unwrap_or_default().to_string(),
    })
  }

  /// Checks the invariants every parsed tree has: the grammar's root label,
  /// entities with words, constructors with children, and, for strict
  /// grammars, only declared labels.
  pub fn validate(&self, tree: &Tree) -> Result<(), MatcherError> {
    match tree.root_label() {
      Some(label) if label == self.grammar.root => {}
      other => {
        return Err(MatcherError::WrongRoot {
          expected: self.grammar.root.clone(),
          found: other.unwrap_or_default().to_string(),
        });
      }
    }
    if tree.root().is_entity() {
      return Err(MatcherError::EntityRoot {
        label: self.grammar.root.clone(),
      });
    }
    self.validate_node(tree.root(), &mut Vec::new())
  }

  fn validate_node(&self, node: &Node, path: &mut Vec<String>) -> Result<(), MatcherError> {
    let label = match node.label() {
      Some(label) => label,
      None => return Ok(()),
    };
    path.push(label.to_string());

    if self.grammar.mode == Mode::Strict && !self.grammar.is_declared(label) {
      return Err(MatcherError::UnknownLabel {
        label: label.to_string(),
        path: path.join("/"),
      });
    }

    match node {
      Node::Entity(e) if e.words.is_empty() => {
        return Err(MatcherError::EmptyEntity {
          label: label.to_string(),
          path: path.join("/"),
        });
      }
      Node::Intent(c) | Node::Slot(c) if c.children.is_empty() => {
        return Err(MatcherError::EmptyConstructor {
          label: label.to_string(),
          path: path.join("/"),
        });
      }
      _ => {}
    }

    for child in node.children() {
      self.validate_node(child, path)?;
    }
    path.pop();
    Ok(())
  }
}

/// Appends the differences between `predicted` and `gold` to `out`.
fn diff(predicted: &Canon, gold: &Canon, path: &mut Vec<String>, out: &mut Vec<Mismatch>) {
  if predicted.key() == gold.key() {
    return;
  }

  if !predicted.same_slot(gold) || predicted.is_leaf() || predicted.quantity() != gold.quantity() {
    out.push(Mismatch {
      path: path.clone(),
      expected: Some(gold.to_string()),
      actual: Some(predicted.to_string()),
    });
    return;
  }

  path.push(gold.label().to_string());
  diff_children(predicted.children(), gold.children(), path, out);
  path.pop();
}

/// Pairs children one-to-one: identical entries first, then leftovers of the
/// same kind, which are diffed further. What is left is missing or
/// unexpected.
fn diff_children(predicted: &[Canon], gold: &[Canon], path: &mut Vec<String>, out: &mut Vec<Mismatch>) {
  let mut remaining = predicted.iter().map(Some).collect::<Vec<_>>();

  let mut unmatched_gold = Vec::new();
  for g in gold {
    let exact = remaining
      .iter()
      .position(|p| p.is_some_and(|p| p.key() == g.key()));
    match exact {
      Some(idx) => remaining[idx] = None,
      None => unmatched_gold.push(g),
    }
  }

  for g in unmatched_gold {
    let similar = remaining
      .iter()
      .position(|p| p.is_some_and(|p| p.same_slot(g)));
    match similar.and_then(|idx| remaining[idx].take()) {
      Some(p) => diff(p, g, path, out),
      None => out.push(Mismatch {
        path: path.clone(),
        expected: Some(g.to_string()),
        actual: None,
      }),
    }
  }

  for p in remaining.into_iter().flatten() {
    out.push(Mismatch {
      path: path.clone(),
      expected: None,
      actual: Some(p.to_string()),
    });
  }
}
