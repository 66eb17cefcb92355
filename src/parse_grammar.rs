use regex::Regex;
/// Simple recursive-descent parsing of grammar declaration files
use std::collections::HashMap;
use std::str::FromStr;

use crate::grammar::{Grammar, Mode, Role};
use crate::Err;

/// Parses a grammar from its declarations, e.g.
///
/// ```text
/// // the PIZZA grammar
/// root ORDER;
/// intent ORDER PIZZAORDER DRINKORDER;
/// slot NOT COMPLEX_TOPPING;
/// entity NUMBER SIZE TOPPING STYLE QUANTITY;
/// mode strict;
/// ```
///
/// `root` defaults to ORDER and `mode` to strict.
impl FromStr for Grammar {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (statements, s) = parse_statements(s)?;
    assert!(s.is_empty());

    let mut root = None;
    let mut mode = Mode::Strict;
    let mut constructors: HashMap<String, Role> = HashMap::new();

    for statement in statements {
      match statement {
        Statement::Root(name) => root = Some(name),
        Statement::Mode(m) => mode = m,
        Statement::Declare(role, names) => {
          for name in names {
            if let Some(prev) = constructors.insert(name.clone(), role) {
              if prev != role {
                return Err(format!("{} declared as both {} and {}", name, prev, role).into());
              }
            }
          }
        }
      }
    }

    if constructors.is_empty() {
      return Err("no constructors declared".into());
    }

    let root = root.unwrap_or_else(|| crate::grammar::ORDER.to_string());
    if constructors.get(&root) != Some(&Role::Intent) {
      return Err(format!("root {} must be declared as an intent", root).into());
    }

    Ok(Self::new(root, constructors, mode))
  }
}

#[derive(Debug, PartialEq)]
enum Statement {
  Root(String),
  Mode(Mode),
  Declare(Role, Vec<String>),
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(m) = re.find(s) {
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, s).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, s).into())
  }
}

/// Tries to skip whitespace and // comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"(\s|//[^\n]*)+");
  optional_re(&*WHITESPACE_OR_COMMENT, s).1
}

/// Tries to parse a constructor name made of letters, numbers and _
fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"[A-Za-z][A-Za-z0-9_]*");
  needed_re(&*NAME, s).map_err(|err| format!("name: {}", err).into())
}

fn parse_keyword(s: &str) -> ParseResult<'_, &str> {
  regex_static!(KEYWORD, r"[a-z]+");
  needed_re(&*KEYWORD, s).map_err(|err| format!("keyword: {}", err).into())
}

/// Names up to the terminating ;
fn parse_names(s: &str) -> ParseResult<'_, Vec<String>> {
  let mut names = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), rem) = optional_char(';', rem) {
      return Ok((names, rem));
    }
    if rem.is_empty() {
      return Err("missing ; at end of input".into());
    }
    let (name, s) = parse_name(rem)?;
    names.push(name.to_string());
    rem = s;
  }
}

/// keyword, arguments, terminated by ;
fn parse_statement(s: &str) -> ParseResult<'_, Statement> {
  let (keyword, s) = parse_keyword(s)?;
  let s = skip_whitespace(s);

  match keyword {
    "root" => {
      let (name, s) = parse_name(s).map_err(|e| -> Err { format!("root: {}", e).into() })?;
      let s = skip_whitespace(s);
      let (_, s) = needed_char(';', s)?;
      Ok((Statement::Root(name.to_string()), s))
    }
    "mode" => {
      let (name, s) = parse_keyword(s).map_err(|e| -> Err { format!("mode: {}", e).into() })?;
      let mode = match name {
        "strict" => Mode::Strict,
        "lenient" => Mode::Lenient,
        other => return Err(format!("unknown mode {}", other).into()),
      };
      let s = skip_whitespace(s);
      let (_, s) = needed_char(';', s)?;
      Ok((Statement::Mode(mode), s))
    }
    "intent" | "slot" | "entity" => {
      let role = match keyword {
        "intent" => Role::Intent,
        "slot" => Role::Slot,
        _ => Role::Entity,
      };
      let (names, s) =
        parse_names(s).map_err(|e| -> Err { format!("{} declaration: {}", keyword, e).into() })?;
      Ok((Statement::Declare(role, names), s))
    }
    other => Err(format!("unknown statement {}", other).into()),
  }
}

fn parse_statements(s: &str) -> ParseResult<'_, Vec<Statement>> {
  let mut statements = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((statements, rem));
    }
    let (statement, s) = parse_statement(rem)?;
    statements.push(statement);
    rem = s;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_declarations() {
    let g: Grammar = r#"
      // drinks only
      root ORDER;
      intent ORDER DRINKORDER;
      entity NUMBER DRINKTYPE // trailing comment
        VOLUME;
      mode lenient;
    "#
    .parse()
    .unwrap();

    assert_eq!(g.root, "ORDER");
    assert_eq!(g.mode, Mode::Lenient);
    assert_eq!(g.role("DRINKORDER"), Some(Role::Intent));
    assert_eq!(g.role("VOLUME"), Some(Role::Entity));
    assert_eq!(g.role("PIZZAORDER"), None);
  }

  #[test]
  fn pizza_declarations_match_builtin() {
    let g: Grammar = r#"
      intent ORDER PIZZAORDER DRINKORDER;
      slot NOT COMPLEX_TOPPING;
      entity NUMBER SIZE TOPPING STYLE QUANTITY DRINKTYPE CONTAINERTYPE VOLUME;
    "#
    .parse()
    .unwrap();

    assert_eq!(g, Grammar::pizza());

    let shipped: Grammar = include_str!("../grammars/pizza.grammar").parse().unwrap();
    assert_eq!(shipped, Grammar::pizza());
  }

  #[test]
  fn rejects_bad_declarations() {
    assert!("".parse::<Grammar>().is_err());
    assert!("intent ORDER".parse::<Grammar>().is_err());
    assert!("intent ORDER; entity ORDER;".parse::<Grammar>().is_err());
    assert!("root PIZZAORDER; intent ORDER;".parse::<Grammar>().is_err());
    assert!("intent ORDER; mode sloppy;".parse::<Grammar>().is_err());
    assert!("intent ORDER; rule X;".parse::<Grammar>().is_err());
  }
}
