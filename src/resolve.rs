//! Entity resolution: mapping the raw words under an entity constructor to a
//! canonical value, e.g. `(SIZE extra large size )` to `(SIZE EXTRA_LARGE )`.
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::UnresolvableEntityError;
use crate::grammar::{DRINKORDER, NUMBER, PIZZAORDER};
use crate::syntree::{Constituent, Entity, Node, Tree};
use crate::utils::{normalize_text, to_prefix_notation};
use crate::Err;

/// Catalog file names of the PIZZA grammar, by entity type.
pub const PIZZA_CATALOG_FILES: &[(&str, &str)] = &[
  ("TOPPING", "topping.txt"),
  ("NUMBER", "number.txt"),
  ("SIZE", "size.txt"),
  ("STYLE", "style.txt"),
  ("DRINKTYPE", "drinks.txt"),
  ("VOLUME", "drink_volume.txt"),
  ("CONTAINERTYPE", "container.txt"),
  ("QUANTITY", "quant_qualifier.txt"),
];

/// Canonical tokens an entity resolves to: `EXTRA_LARGE`, or `2 LITER` for a
/// volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedValue(Vec<String>);

impl ResolvedValue {
  pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
    Self(tokens.into_iter().map(Into::into).collect())
  }

  pub fn tokens(&self) -> &[String] {
    &self.0
  }

  /// Reads a catalog value such as `EXTRA_LARGE` or `VOLUME(2,LITER)`. A head
  /// constructor naming the entity type itself is dropped.
  pub fn from_notation(entity_type: &str, notation: &str) -> Self {
    let prefix = to_prefix_notation(notation);
    let mut tokens = Vec::new();
    for (idx, tok) in prefix.split_whitespace().enumerate() {
      match tok.strip_prefix('(') {
        Some(head) if idx == 0 && head == entity_type => {}
        Some(head) => tokens.push(head.to_string()),
        None if tok == ")" => {}
        None => tokens.push(tok.to_string()),
      }
    }
    Self(tokens)
  }
}

impl fmt::Display for ResolvedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.join(" "))
  }
}

/// Maps entity words to canonical values. Implementations must be pure: the
/// same input always gives the same answer, and they are shared across
/// evaluation threads.
pub trait Resolver: Sync {
  /// Whether this resolver has a table for `entity_type` at all.
  fn covers(&self, entity_type: &str) -> bool;

  fn resolve(&self, entity_type: &str, words: &[String]) -> Result<ResolvedValue, UnresolvableEntityError>;
}

/// Phrase to value table for one entity type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogTable(HashMap<String, ResolvedValue>);

impl CatalogTable {
  /// Parses tab-separated `phrase<TAB>value` lines. Blank lines are skipped.
  pub fn parse(entity_type: &str, src: &str) -> Result<Self, Err> {
    let mut entries = HashMap::new();
    for (lineno, line) in src.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      let (phrase, value) = line
        .split_once('\t')
        .ok_or_else(|| format!("{} catalog line {}: expected phrase<TAB>value", entity_type, lineno + 1))?;
      entries.insert(
        normalize_text(phrase),
        ResolvedValue::from_notation(entity_type, value.trim()),
      );
    }
    Ok(Self(entries))
  }

  pub fn get(&self, phrase: &str) -> Option<&ResolvedValue> {
    self.0.get(&normalize_text(phrase))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// A resolver backed by catalog tables, one per entity type. Read-only once
/// built, so it can be shared across evaluation threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
  tables: HashMap<String, CatalogTable>,
}

impl Catalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_table(&mut self, entity_type: impl Into<String>, table: CatalogTable) {
    self.tables.insert(entity_type.into(), table);
  }

  pub fn with_table(mut self, entity_type: &str, src: &str) -> Result<Self, Err> {
    let table = CatalogTable::parse(entity_type, src)?;
    self.insert_table(entity_type, table);
    Ok(self)
  }

  /// Loads the PIZZA catalog files found in `dir`. Missing files are skipped,
  /// a missing directory is an error.
  pub fn read_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, Err> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
      return Err(format!("catalog directory {} not found", dir.display()).into());
    }
    let mut catalog = Self::new();

    for (entity_type, filename) in PIZZA_CATALOG_FILES {
      let path = dir.join(filename);
      if !path.is_file() {
        warn!(path = %path.display(), "catalog file not found, {} will not be resolved", entity_type);
        continue;
      }
      let src = fs::read_to_string(&path).map_err(|e| format!("reading {}: {}", path.display(), e))?;
      let table = CatalogTable::parse(entity_type, &src)?;
      debug!(entity_type, entries = table.len(), "loaded catalog");
      catalog.insert_table(*entity_type, table);
    }

    Ok(catalog)
  }

  pub fn table(&self, entity_type: &str) -> Option<&CatalogTable> {
    self.tables.get(entity_type)
  }
}

impl Resolver for Catalog {
  fn covers(&self, entity_type: &str) -> bool {
    self.tables.contains_key(entity_type)
  }

  fn resolve(&self, entity_type: &str, words: &[String]) -> Result<ResolvedValue, UnresolvableEntityError> {
    let text = words.join(" ");
    self
      .table(entity_type)
      .and_then(|table| table.get(&text))
      .cloned()
      .ok_or_else(|| UnresolvableEntityError {
        entity_type: entity_type.to_string(),
        text,
      })
  }
}

/// A tree with resolved entities, plus the entities that could not be
/// resolved. Those keep their raw words.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
  pub tree: Tree,
  pub unresolved: Vec<UnresolvableEntityError>,
}

/// Resolves every entity leaf the resolver covers. Failures never abort:
/// they are collected and the leaf falls back to its raw text.
pub fn resolve_tree(tree: &Tree, resolver: &dyn Resolver) -> Resolution {
  let mut unresolved = Vec::new();
  let tree = tree.map_entities(|entity| {
    if !resolver.covers(&entity.label) {
      return entity.clone();
    }
    match resolver.resolve(&entity.label, &entity.words) {
      Ok(value) => entity.clone().with_resolved(value),
      Err(err) => {
        debug!(%err, "falling back to raw text");
        unresolved.push(err);
        Entity {
          resolved: None,
          ..entity.clone()
        }
      }
    }
  });
  Resolution { tree, unresolved }
}

/// Gives every PIZZAORDER and DRINKORDER without a NUMBER the default
/// `(NUMBER 1 )`, which EXR always spells out.
pub fn add_default_numbers(tree: &Tree) -> Tree {
  fn walk(node: &Node) -> Node {
    match node {
      Node::Intent(c) if c.label == PIZZAORDER || c.label == DRINKORDER => {
        let mut children = c.children.clone();
        if !children.iter().any(|child| child.label() == Some(NUMBER)) {
          children.push(Node::Entity(
            Entity::new(NUMBER, ["1"]).with_resolved(ResolvedValue::new(["1"])),
          ));
        }
        Node::Intent(Constituent::new(c.label.clone(), children))
      }
      Node::Intent(c) => Node::Intent(Constituent::new(c.label.clone(), c.children.iter().map(walk).collect())),
      Node::Slot(c) => Node::Slot(Constituent::new(c.label.clone(), c.children.iter().map(walk).collect())),
      other => other.clone(),
    }
  }
  Tree::from_root(walk(tree.root()))
}

/// Turns a (TOP) tree into one comparable with EXR: drops non-semantic words,
/// resolves entities and adds default numbers.
pub fn resolve_into_target(tree: &Tree, resolver: &dyn Resolver) -> Resolution {
  let Resolution { tree, unresolved } = resolve_tree(&tree.semantics_only(), resolver);
  Resolution {
    tree: add_default_numbers(&tree),
    unresolved,
  }
}
