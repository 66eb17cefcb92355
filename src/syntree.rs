use std::fmt;

use crate::resolve::ResolvedValue;

/// An internal node: a constructor with at least one nested subtree among its
/// children.
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent {
  pub label: String,
  pub children: Vec<Node>,
}

impl Constituent {
  pub fn new(label: impl Into<String>, children: Vec<Node>) -> Self {
    Self {
      label: label.into(),
      children,
    }
  }
}

/// A leaf constructor holding words, e.g. `(SIZE extra large )`.
#[derive(Debug, PartialEq, Clone)]
pub struct Entity {
  pub label: String,
  pub words: Vec<String>,
  pub resolved: Option<ResolvedValue>,
}

impl Entity {
  pub fn new<S: Into<String>>(label: impl Into<String>, words: impl IntoIterator<Item = S>) -> Self {
    Self {
      label: label.into(),
      words: words.into_iter().map(Into::into).collect(),
      resolved: None,
    }
  }

  pub fn text(&self) -> String {
    self.words.join(" ")
  }

  pub fn with_resolved(mut self, value: ResolvedValue) -> Self {
    self.resolved = Some(value);
    self
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Node {
  /// ORDER, PIZZAORDER, DRINKORDER
  Intent(Constituent),
  /// Composite constructor nested under an intent, or an unknown label kept by
  /// a lenient grammar
  Slot(Constituent),
  Entity(Entity),
  /// A word sitting directly inside an internal node, as in TOP's
  /// `(ORDER i want (PIZZAORDER ...) please )`. Carries no semantics.
  Word(String),
}

impl Node {
  pub fn label(&self) -> Option<&str> {
    match self {
      Self::Intent(c) | Self::Slot(c) => Some(c.label.as_str()),
      Self::Entity(e) => Some(e.label.as_str()),
      Self::Word(_) => None,
    }
  }

  pub fn is_entity(&self) -> bool {
    matches!(self, Self::Entity(_))
  }

  pub fn is_word(&self) -> bool {
    matches!(self, Self::Word(_))
  }

  pub fn get_constituent(&self) -> Option<&Constituent> {
    match self {
      Self::Intent(c) | Self::Slot(c) => Some(c),
      _ => None,
    }
  }

  pub fn get_entity(&self) -> Option<&Entity> {
    match self {
      Self::Entity(e) => Some(e),
      _ => None,
    }
  }

  pub fn children(&self) -> &[Node] {
    match self {
      Self::Intent(c) | Self::Slot(c) => &c.children,
      _ => &[],
    }
  }

  /// Rebuilds an internal node of the same kind with new children.
  fn with_children(&self, children: Vec<Node>) -> Self {
    match self {
      Self::Intent(c) => Self::Intent(Constituent::new(c.label.clone(), children)),
      Self::Slot(c) => Self::Slot(Constituent::new(c.label.clone(), children)),
      other => other.clone(),
    }
  }

  /// Applies `f` to every entity leaf, rebuilding the tree around the results.
  pub fn map_entities<F>(&self, f: &mut F) -> Node
  where
    F: FnMut(&Entity) -> Entity,
  {
    match self {
      Self::Entity(e) => Self::Entity(f(e)),
      Self::Word(_) => self.clone(),
      Self::Intent(c) | Self::Slot(c) => {
        let children = c.children.iter().map(|child| child.map_entities(f)).collect();
        self.with_children(children)
      }
    }
  }

  /// Copy of this node without non-semantic words.
  pub fn semantics_only(&self) -> Node {
    match self {
      Self::Intent(c) | Self::Slot(c) => {
        let children = c
          .children
          .iter()
          .filter(|child| !child.is_word())
          .map(|child| child.semantics_only())
          .collect();
        self.with_children(children)
      }
      other => other.clone(),
    }
  }

  /// Order-insensitive equality: labels must agree and the children must pair
  /// up one-to-one. Entity words are compared in order, and resolved values
  /// are not consulted.
  pub fn unordered_eq(&self, other: &Node) -> bool {
    match (self, other) {
      (Self::Word(a), Self::Word(b)) => a == b,
      (Self::Entity(a), Self::Entity(b)) => a.label == b.label && a.words == b.words,
      (Self::Intent(a), Self::Intent(b)) | (Self::Slot(a), Self::Slot(b)) => {
        if a.label != b.label || a.children.len() != b.children.len() {
          return false;
        }
        let mut taken = vec![false; b.children.len()];
        a.children.iter().all(|child| {
          let found = b
            .children
            .iter()
            .enumerate()
            .find(|(idx, candidate)| !taken[*idx] && child.unordered_eq(candidate));
          match found {
            Some((idx, _)) => {
              taken[idx] = true;
              true
            }
            None => false,
          }
        })
      }
      _ => false,
    }
  }

  /// Count of constructor nodes in this subtree, words excluded.
  pub fn size(&self) -> usize {
    match self {
      Self::Word(_) => 0,
      Self::Entity(_) => 1,
      Self::Intent(c) | Self::Slot(c) => 1 + c.children.iter().map(Node::size).sum::<usize>(),
    }
  }
}

/// Bracketed notation, `(LABEL child ... )`, as used by the dataset.
impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Word(w) => write!(f, "{}", w),
      Self::Entity(e) => write!(f, "({} {} )", e.label, e.text()),
      Self::Intent(c) | Self::Slot(c) => {
        write!(f, "({}", c.label)?;
        for child in c.children.iter() {
          write!(f, " {}", child)?;
        }
        write!(f, " )")
      }
    }
  }
}

/// Indented multi-line rendering, one constructor per line.
pub struct Pretty<'a>(&'a Node);

impl fmt::Display for Pretty<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      Node::Word(w) => write!(f, "{}", w),
      Node::Entity(e) => match &e.resolved {
        Some(value) => write!(f, "{}: {} => {}", e.label, e.text(), value),
        None => write!(f, "{}: {}", e.label, e.text()),
      },
      Node::Intent(c) | Node::Slot(c) => {
        write!(f, "{}", c.label)?;
        for child in c.children.iter() {
          let fmt = format!("{}", Pretty(child));
          for line in fmt.lines() {
            write!(f, "\n  {}", line)?;
          }
        }
        Ok(())
      }
    }
  }
}

/// A parsed semantic tree. Owns its nodes and is never mutated; operations
/// that change it return a new tree.
#[derive(Debug, PartialEq, Clone)]
pub struct Tree {
  root: Node,
}

impl Tree {
  /// Wraps a node without checking it. Trees built this way are validated by
  /// the matcher before comparison.
  pub fn from_root(root: Node) -> Self {
    Self { root }
  }

  pub fn root(&self) -> &Node {
    &self.root
  }

  pub fn root_label(&self) -> Option<&str> {
    self.root.label()
  }

  pub fn semantics_only(&self) -> Tree {
    Tree::from_root(self.root.semantics_only())
  }

  pub fn map_entities<F>(&self, mut f: F) -> Tree
  where
    F: FnMut(&Entity) -> Entity,
  {
    Tree::from_root(self.root.map_entities(&mut f))
  }

  pub fn entities(&self) -> Vec<&Entity> {
    fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Entity>) {
      match node {
        Node::Entity(e) => out.push(e),
        Node::Word(_) => {}
        Node::Intent(c) | Node::Slot(c) => c.children.iter().for_each(|child| walk(child, out)),
      }
    }
    let mut out = Vec::new();
    walk(&self.root, &mut out);
    out
  }

  pub fn is_unordered_exact_match(&self, other: &Tree) -> bool {
    self.root.unordered_eq(&other.root)
  }

  pub fn pretty(&self) -> String {
    Pretty(&self.root).to_string()
  }

  /// Renders entities by their resolved value where there is one, which
  /// gives EXR notation for a resolved tree.
  pub fn to_resolved_string(&self) -> String {
    self
      .root
      .map_entities(&mut |e: &Entity| match &e.resolved {
        Some(value) => Entity::new(e.label.clone(), value.tokens().iter().cloned()),
        None => e.clone(),
      })
      .to_string()
  }
}

impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.root)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn topping(text: &str) -> Node {
    Node::Entity(Entity::new("TOPPING", text.split(' ')))
  }

  fn pizza(children: Vec<Node>) -> Tree {
    Tree::from_root(Node::Intent(Constituent::new(
      "ORDER",
      vec![Node::Intent(Constituent::new("PIZZAORDER", children))],
    )))
  }

  #[test]
  fn renders_bracketed() {
    let t = pizza(vec![
      Node::Entity(Entity::new("NUMBER", ["2"])),
      topping("HAM"),
    ]);
    assert_eq!(t.to_string(), "(ORDER (PIZZAORDER (NUMBER 2 ) (TOPPING HAM ) ) )");
  }

  #[test]
  fn pretty_indents() {
    let t = pizza(vec![topping("green peppers")]);
    assert_eq!(t.pretty(), "ORDER\n  PIZZAORDER\n    TOPPING: green peppers");
  }

  #[test]
  fn unordered_eq_ignores_child_order() {
    let a = pizza(vec![topping("HAM"), topping("OLIVES")]);
    let b = pizza(vec![topping("OLIVES"), topping("HAM")]);
    let c = pizza(vec![topping("HAM"), topping("HAM")]);
    assert!(a.is_unordered_exact_match(&b));
    assert!(!a.is_unordered_exact_match(&c));
    assert!(!c.is_unordered_exact_match(&a));
  }

  #[test]
  fn semantics_only_drops_words() {
    let t = Tree::from_root(Node::Intent(Constituent::new(
      "ORDER",
      vec![
        Node::Word("i".into()),
        Node::Word("want".into()),
        Node::Intent(Constituent::new("PIZZAORDER", vec![topping("ham")])),
      ],
    )));
    assert_eq!(t.semantics_only(), pizza(vec![topping("ham")]));
    assert_eq!(t.root().size(), 3);
  }
}
