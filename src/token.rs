use regex::Regex;
use std::fmt;

use crate::errors::TokenizeError;
use crate::grammar::Grammar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  Open,
  Close,
  /// Constructor name directly following `(`
  Label(String),
  Word(String),
}

impl Token {
  pub fn text(&self) -> &str {
    match self {
      Self::Open => "(",
      Self::Close => ")",
      Self::Label(s) | Self::Word(s) => s,
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.text())
  }
}

/// Splits a bracketed expression into tokens. Parentheses always stand alone,
/// even when glued to a word as in `(ORDER` or `HAM)`; whitespace and commas
/// separate words.
///
/// ```
/// use ordertree::{grammar::Grammar, token::{tokenize, Token}};
///
/// let tokens = tokenize("(SIZE extra large)", &Grammar::pizza()).unwrap();
/// assert_eq!(tokens, vec![
///   Token::Open,
///   Token::Label("SIZE".into()),
///   Token::Word("extra".into()),
///   Token::Word("large".into()),
///   Token::Close,
/// ]);
/// ```
pub fn tokenize(s: &str, grammar: &Grammar) -> Result<Vec<Token>, TokenizeError> {
  lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[()]|[^\s(),]+").unwrap();
  }

  let mut tokens = Vec::new();
  let mut depth = 0usize;

  for m in TOKEN.find_iter(s) {
    let token = match m.as_str() {
      "(" => {
        depth += 1;
        Token::Open
      }
      ")" => {
        if depth == 0 {
          return Err(TokenizeError::UnmatchedClose { offset: m.start() });
        }
        depth -= 1;
        Token::Close
      }
      text => {
        let after_open = matches!(tokens.last(), Some(Token::Open));
        if after_open && grammar.is_label(text) {
          Token::Label(text.to_string())
        } else {
          Token::Word(text.to_string())
        }
      }
    };
    tokens.push(token);
  }

  if tokens.is_empty() {
    Err(TokenizeError::Empty)
  } else {
    Ok(tokens)
  }
}
