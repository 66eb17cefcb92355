//! The normal form trees are compared in. Two trees mean the same order
//! exactly when their canonical forms are equal.
//!
//! Normalization:
//! - non-semantic words are dropped
//! - `(NOT a b)` becomes one negated entry per child, at any depth
//! - `(TOPPING NOT x)` is read as `(NOT (TOPPING x))`
//! - `(COMPLEX_TOPPING (TOPPING x) (QUANTITY q))` becomes a single topping
//!   entry keyed by (negated, topping, quantity)
//! - every child list is sorted, which makes comparison order-insensitive;
//!   repeated children are kept, so `(TOPPING HAM)` twice is not once
//! - entity values are the resolved value where there is one, else the raw
//!   words, lowercased with whitespace collapsed
use std::fmt;

use crate::grammar::{COMPLEX_TOPPING, NOT, QUANTITY, TOPPING};
use crate::syntree::{Constituent, Entity, Node, Tree};
use crate::utils::normalize_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
  Value(String),
  Children(Vec<Canon>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canon {
  label: String,
  negated: bool,
  quantity: Option<String>,
  body: Body,
  key: String,
}

impl Canon {
  fn leaf(label: &str, value: String) -> Self {
    Self::build(label.to_string(), false, None, Body::Value(value))
  }

  fn branch(label: &str, mut children: Vec<Canon>) -> Self {
    children.sort_by(|a, b| a.key.cmp(&b.key));
    Self::build(label.to_string(), false, None, Body::Children(children))
  }

  fn build(label: String, negated: bool, quantity: Option<String>, body: Body) -> Self {
    let mut key = match &body {
      Body::Value(v) => format!("({} {} )", label, v),
      Body::Children(cs) => {
        let mut key = format!("({}", label);
        for c in cs.iter() {
          key.push(' ');
          key.push_str(&c.key);
        }
        key.push_str(" )");
        key
      }
    };
    if let Some(q) = &quantity {
      key = format!("({} ({} {} ) {} )", COMPLEX_TOPPING, QUANTITY, q, key);
    }
    if negated {
      key = format!("({} {} )", NOT, key);
    }
    Self {
      label,
      negated,
      quantity,
      body,
      key,
    }
  }

  fn negate(self) -> Self {
    Self::build(self.label, !self.negated, self.quantity, self.body)
  }

  fn with_quantity(self, quantity: String) -> Self {
    Self::build(self.label, self.negated, Some(quantity), self.body)
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn negated(&self) -> bool {
    self.negated
  }

  pub fn quantity(&self) -> Option<&str> {
    self.quantity.as_deref()
  }

  pub fn children(&self) -> &[Canon] {
    match &self.body {
      Body::Children(cs) => cs,
      Body::Value(_) => &[],
    }
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self.body, Body::Value(_))
  }

  /// Rendering of the canonical form; equal keys mean equal meaning.
  pub fn key(&self) -> &str {
    &self.key
  }

  /// Whether `other` is the same kind of entry, so that a difference between
  /// the two is worth describing in detail rather than as missing/unexpected.
  pub fn same_slot(&self, other: &Canon) -> bool {
    self.label == other.label && self.negated == other.negated && self.is_leaf() == other.is_leaf()
  }
}

impl fmt::Display for Canon {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.key)
  }
}

/// Canonical form of a whole tree. `None` if the root is a bare word or
/// expands into more than one entry, neither of which a valid tree has.
pub fn canonicalize(tree: &Tree) -> Option<Canon> {
  let mut forms = canonicalize_node(tree.root());
  if forms.len() == 1 { forms.pop() } else { None }
}

/// Canonical entries for a node. A NOT node yields one entry per child, a
/// word yields none, everything else exactly one.
pub fn canonicalize_node(node: &Node) -> Vec<Canon> {
  match node {
    Node::Word(_) => Vec::new(),
    Node::Entity(e) => vec![entity(e)],
    Node::Intent(c) | Node::Slot(c) => constituent(c),
  }
}

fn entity(e: &Entity) -> Canon {
  let words = match &e.resolved {
    Some(value) => value.tokens(),
    None => e.words.as_slice(),
  };

  // (TOPPING NOT x) == (NOT (TOPPING x))
  if e.label == TOPPING && e.resolved.is_none() && words.len() > 1 && words[0].eq_ignore_ascii_case(NOT) {
    return Canon::leaf(&e.label, normalize_text(&words[1..].join(" "))).negate();
  }

  Canon::leaf(&e.label, normalize_text(&words.join(" ")))
}

fn constituent(c: &Constituent) -> Vec<Canon> {
  let children = c.children.iter().flat_map(canonicalize_node).collect::<Vec<_>>();

  match c.label.as_str() {
    NOT => children.into_iter().map(Canon::negate).collect(),
    COMPLEX_TOPPING => match fold_complex_topping(&children) {
      Some(topping) => vec![topping],
      None => vec![Canon::branch(&c.label, children)],
    },
    _ => vec![Canon::branch(&c.label, children)],
  }
}

/// One plain topping plus at most one quantity fold into a quantified topping.
/// Anything else keeps its COMPLEX_TOPPING structure.
fn fold_complex_topping(children: &[Canon]) -> Option<Canon> {
  let mut topping = None;
  let mut quantity = None;

  for child in children {
    match &child.body {
      Body::Value(_) if child.label == TOPPING && child.quantity.is_none() && topping.is_none() => {
        topping = Some(child)
      }
      Body::Value(v) if child.label == QUANTITY && !child.negated && quantity.is_none() => {
        quantity = Some(v.clone())
      }
      _ => return None,
    }
  }

  let topping = topping?.clone();
  Some(match quantity {
    Some(q) => topping.with_quantity(q),
    None => topping,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::Grammar;
  use crate::parse::parse_str;

  fn canon(s: &str) -> Canon {
    canonicalize(&parse_str(s, &Grammar::pizza()).unwrap()).unwrap()
  }

  #[test]
  fn sorts_children() {
    assert_eq!(
      canon("(ORDER (PIZZAORDER (NUMBER 2)(TOPPING HAM)(TOPPING OLIVES)))"),
      canon("(ORDER (PIZZAORDER (TOPPING OLIVES)(NUMBER 2)(TOPPING HAM)))"),
    );
  }

  #[test]
  fn expands_negation() {
    let grouped = canon("(ORDER (PIZZAORDER (NOT (TOPPING PEPPERS)(TOPPING ONIONS))))");
    let inline = canon("(ORDER (PIZZAORDER (TOPPING NOT PEPPERS)(TOPPING NOT ONIONS)))");
    let single = canon("(ORDER (PIZZAORDER (NOT (TOPPING PEPPERS))(NOT (TOPPING ONIONS))))");

    assert_eq!(grouped, inline);
    assert_eq!(grouped, single);
    assert_eq!(
      grouped.key(),
      "(ORDER (PIZZAORDER (NOT (TOPPING onions ) ) (NOT (TOPPING peppers ) ) ) )"
    );
  }

  #[test]
  fn folds_complex_toppings() {
    let c = canon("(ORDER (PIZZAORDER (COMPLEX_TOPPING (QUANTITY EXTRA) (TOPPING CHEESE))))");
    let topping = &c.children()[0].children()[0];
    assert_eq!(topping.label(), "TOPPING");
    assert_eq!(topping.quantity(), Some("extra"));
    assert!(!topping.negated());

    let c = canon("(ORDER (PIZZAORDER (NOT (COMPLEX_TOPPING (TOPPING CHEESE) (QUANTITY EXTRA)))))");
    let topping = &c.children()[0].children()[0];
    assert!(topping.negated());
    assert_eq!(topping.key(), "(NOT (COMPLEX_TOPPING (QUANTITY extra ) (TOPPING cheese ) ) )");
  }

  #[test]
  fn unusual_complex_topping_keeps_structure() {
    let c = canon("(ORDER (PIZZAORDER (COMPLEX_TOPPING (TOPPING HAM) (TOPPING CHEESE))))");
    let complex = &c.children()[0].children()[0];
    assert_eq!(complex.label(), "COMPLEX_TOPPING");
    assert_eq!(complex.children().len(), 2);
  }

  #[test]
  fn repeated_children_count() {
    let twice = canon("(ORDER (PIZZAORDER (TOPPING HAM)(TOPPING ham)))");
    assert_ne!(twice, canon("(ORDER (PIZZAORDER (TOPPING HAM)))"));
    assert_eq!(twice.children()[0].children().len(), 2);
    assert_ne!(
      canon("(ORDER (PIZZAORDER (TOPPING HAM)) (PIZZAORDER (TOPPING HAM)))"),
      canon("(ORDER (PIZZAORDER (TOPPING HAM)))"),
    );
  }

  #[test]
  fn ignores_words_and_case() {
    assert_eq!(
      canon("(ORDER i want (PIZZAORDER (NUMBER two ) pies with (TOPPING Green  Peppers ) ) )"),
      canon("(ORDER (PIZZAORDER (TOPPING green peppers) (NUMBER TWO)))"),
    );
  }
}
