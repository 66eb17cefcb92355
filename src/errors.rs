use thiserror::Error;

/// Malformed bracket/word stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
  #[error("empty input")]
  Empty,
  #[error("unmatched ')' at byte {offset}")]
  UnmatchedClose { offset: usize },
}

/// Grammar violation while building a tree. `index` is the position of the
/// offending token in the token sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
  #[error("empty tree")]
  EmptyTree,
  #[error("expected '(' at token {index}")]
  ExpectedOpen { index: usize },
  #[error("expected a constructor label at token {index}, found {found}")]
  ExpectedLabel { index: usize, found: String },
  #[error("unknown constructor {label} at token {index}")]
  UnknownLabel { index: usize, label: String },
  #[error("constructor label {label} at token {index} where a word or subtree was expected")]
  UnexpectedLabel { index: usize, label: String },
  #[error("constructor {label} at token {index} has no children")]
  EmptyConstructor { index: usize, label: String },
  #[error("constructor {label} opened at token {index} is never closed")]
  Unclosed { index: usize, label: String },
  #[error("more than one root, second starts at token {index}")]
  MultipleRoots { index: usize },
  #[error("tree must be rooted at {expected}, found {found}")]
  WrongRoot { expected: String, found: String },
  #[error("root {label} holds only words, an order needs at least one nested constructor")]
  EntityRoot { label: String },
}

impl ParseError {
  /// Token index the error points at, if any.
  pub fn index(&self) -> Option<usize> {
    match self {
      Self::EmptyTree | Self::WrongRoot { .. } | Self::EntityRoot { .. } => None,
      Self::ExpectedOpen { index }
      | Self::ExpectedLabel { index, .. }
      | Self::UnknownLabel { index, .. }
      | Self::UnexpectedLabel { index, .. }
      | Self::EmptyConstructor { index, .. }
      | Self::Unclosed { index, .. }
      | Self::MultipleRoots { index } => Some(*index),
    }
  }
}

/// Failure to turn a string into a tree. Keeps the input for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
  #[error("could not tokenize {input:?}: {source}")]
  Tokenize {
    input: String,
    #[source]
    source: TokenizeError,
  },
  #[error("could not parse {input:?}: {source}")]
  Parse {
    input: String,
    #[source]
    source: ParseError,
  },
}

/// No catalog entry for the given words. Recoverable: callers fall back to
/// the raw text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no {entity_type} entry for {text:?}")]
pub struct UnresolvableEntityError {
  pub entity_type: String,
  pub text: String,
}

/// A tree handed to the matcher breaks the tree invariants. This points at a
/// bug upstream of the matcher, not at bad user data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
  #[error("tree must be rooted at {expected}, found {found}")]
  WrongRoot { expected: String, found: String },
  #[error("root {label} holds only words")]
  EntityRoot { label: String },
  #[error("entity {label} at {path} has no words")]
  EmptyEntity { label: String, path: String },
  #[error("constructor {label} at {path} has no children")]
  EmptyConstructor { label: String, path: String },
  #[error("unknown constructor {label} at {path}")]
  UnknownLabel { label: String, path: String },
}

/// Why a single (predicted, gold) pair could not be scored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
  #[error("predicted: {0}")]
  Predicted(#[source] TreeError),
  #[error("gold: {0}")]
  Gold(#[source] TreeError),
  #[error(transparent)]
  Matcher(#[from] MatcherError),
}

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("invalid record on line {line}: {source}")]
  Json {
    line: usize,
    #[source]
    source: serde_json::Error,
  },
}
