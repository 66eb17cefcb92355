//! Recursive-descent parsing of bracketed TOP/EXR strings into trees
use tracing::trace;

use crate::errors::{ParseError, TreeError};
use crate::grammar::{Grammar, Mode, Role, looks_like_label};
use crate::syntree::{Constituent, Entity, Node, Tree};
use crate::token::{Token, tokenize};

/// Tokenizes and parses `s`. Nothing is returned unless the whole input forms
/// a single well-formed tree.
pub fn parse_str(s: &str, grammar: &Grammar) -> Result<Tree, TreeError> {
  let tokens = tokenize(s, grammar).map_err(|source| TreeError::Tokenize {
    input: s.to_string(),
    source,
  })?;
  parse(&tokens, grammar).map_err(|source| TreeError::Parse {
    input: s.to_string(),
    source,
  })
}

/// Builds a tree from a token sequence. The root must be the grammar's root
/// constructor, and exactly one top-level tree is allowed.
pub fn parse(tokens: &[Token], grammar: &Grammar) -> Result<Tree, ParseError> {
  if tokens.is_empty() {
    return Err(ParseError::EmptyTree);
  }

  let mut parser = Parser {
    tokens,
    grammar,
    pos: 0,
  };
  let root = parser.parse_node()?;

  if parser.pos < tokens.len() {
    return Err(ParseError::MultipleRoots { index: parser.pos });
  }

  match root.label() {
    Some(label) if label == grammar.root => {}
    other => {
      return Err(ParseError::WrongRoot {
        expected: grammar.root.clone(),
        found: other.unwrap_or_default().to_string(),
      });
    }
  }
  if root.is_entity() {
    return Err(ParseError::EntityRoot {
      label: grammar.root.clone(),
    });
  }

  trace!(nodes = root.size(), "parsed tree");
  Ok(Tree::from_root(root))
}

struct Parser<'a> {
  tokens: &'a [Token],
  grammar: &'a Grammar,
  pos: usize,
}

impl Parser<'_> {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// `( LABEL content* )`, where content is words or nested subtrees
  fn parse_node(&mut self) -> Result<Node, ParseError> {
    let open_index = self.pos;
    match self.peek() {
      Some(Token::Open) => self.pos += 1,
      Some(_) => return Err(ParseError::ExpectedOpen { index: self.pos }),
      None => return Err(ParseError::EmptyTree),
    }

    let label = self.parse_label()?;

    let mut children = Vec::new();
    let mut has_subtree = false;
    loop {
      match self.peek() {
        None => {
          return Err(ParseError::Unclosed {
            index: open_index,
            label,
          });
        }
        Some(Token::Close) => {
          self.pos += 1;
          break;
        }
        Some(Token::Open) => {
          children.push(self.parse_node()?);
          has_subtree = true;
        }
        Some(Token::Word(w)) => {
          children.push(Node::Word(w.clone()));
          self.pos += 1;
        }
        Some(Token::Label(l)) => {
          return Err(ParseError::UnexpectedLabel {
            index: self.pos,
            label: l.clone(),
          });
        }
      }
    }

    if children.is_empty() {
      return Err(ParseError::EmptyConstructor {
        index: open_index,
        label,
      });
    }

    if !has_subtree {
      let words = children.into_iter().filter_map(|c| match c {
        Node::Word(w) => Some(w),
        _ => None,
      });
      return Ok(Node::Entity(Entity::new(label, words)));
    }

    let constituent = Constituent::new(label, children);
    Ok(match self.grammar.role(&constituent.label) {
      Some(Role::Intent) => Node::Intent(constituent),
      // entities with nested structure and unknown lenient labels are kept
      // as opaque slots
      _ => Node::Slot(constituent),
    })
  }

  fn parse_label(&mut self) -> Result<String, ParseError> {
    let index = self.pos;
    match self.peek() {
      Some(Token::Label(l)) => {
        let label = l.clone();
        self.pos += 1;
        Ok(label)
      }
      Some(Token::Word(w)) if self.grammar.mode == Mode::Strict && looks_like_label(w) => {
        Err(ParseError::UnknownLabel {
          index,
          label: w.clone(),
        })
      }
      Some(token) => Err(ParseError::ExpectedLabel {
        index,
        found: token.to_string(),
      }),
      None => Err(ParseError::Unclosed {
        index: index - 1,
        label: String::new(),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn g() -> Grammar {
    Grammar::pizza()
  }

  #[test]
  fn parses_exr() {
    let t = parse_str(
      "(ORDER (PIZZAORDER (NUMBER 1) (TOPPING HAM) (COMPLEX_TOPPING (TOPPING ONIONS) (QUANTITY EXTRA))))",
      &g(),
    )
    .unwrap();

    let order = t.root().get_constituent().unwrap();
    assert_eq!(order.label, "ORDER");
    let pizza = &order.children[0];
    assert!(matches!(pizza, Node::Intent(c) if c.label == "PIZZAORDER"));
    assert_eq!(pizza.children().len(), 3);
    assert_eq!(
      pizza.children()[1].get_entity(),
      Some(&Entity::new("TOPPING", ["HAM"]))
    );
    assert!(pizza.children()[0].is_entity());
    assert!(matches!(&pizza.children()[2], Node::Slot(c) if c.label == "COMPLEX_TOPPING"));
  }

  #[test]
  fn parses_top_with_words() {
    let t = parse_str(
      "(ORDER can i have (PIZZAORDER (NUMBER a ) (SIZE large ) (TOPPING bbq pulled pork ) ) please )",
      &g(),
    )
    .unwrap();

    let children = t.root().children();
    assert_eq!(children.len(), 5);
    assert_eq!(children[0], Node::Word("can".into()));
    assert_eq!(children[4], Node::Word("please".into()));
    assert_eq!(
      children[3].children()[2],
      Node::Entity(Entity::new("TOPPING", ["bbq", "pulled", "pork"]))
    );
  }

  #[test]
  fn round_trips_through_display() {
    for s in [
      "(ORDER (PIZZAORDER (NUMBER 2)(TOPPING HAM)(TOPPING OLIVES)))",
      "(ORDER i want (PIZZAORDER (NOT no (TOPPING peppers ) or (TOPPING onions ) ) ) thanks )",
      "(ORDER (DRINKORDER (NUMBER 2) (VOLUME 20 fl ounce) (DRINKTYPE COKE) (CONTAINERTYPE CAN)))",
    ] {
      let t = parse_str(s, &g()).unwrap();
      let again = parse_str(&t.to_string(), &g()).unwrap();
      assert_eq!(t, again, "round trip of {}", s);
    }
  }

  #[test]
  fn unclosed_input_fails() {
    let err = parse_str("(ORDER (PIZZAORDER", &g()).unwrap_err();
    assert!(matches!(
      err,
      TreeError::Parse {
        source: ParseError::Unclosed { index: 2, .. },
        ..
      }
    ));

    let err = parse_str("(ORDER (PIZZAORDER (TOPPING ham)", &g()).unwrap_err();
    assert!(matches!(
      err,
      TreeError::Parse {
        source: ParseError::Unclosed { index: 2, .. },
        ..
      }
    ));
  }

  #[test]
  fn grammar_violations() {
    let cases = [
      ("ham", ParseError::ExpectedOpen { index: 0 }),
      (
        "(ORDER (PIZZAORDER (TOPPING )))",
        ParseError::EmptyConstructor {
          index: 4,
          label: "TOPPING".into(),
        },
      ),
      (
        "(ORDER (ham))",
        ParseError::ExpectedLabel {
          index: 3,
          found: "ham".into(),
        },
      ),
      (
        "(ORDER (CRUST thin))",
        ParseError::UnknownLabel {
          index: 3,
          label: "CRUST".into(),
        },
      ),
      (
        "(ORDER (()))",
        ParseError::ExpectedLabel {
          index: 3,
          found: "(".into(),
        },
      ),
      ("(ORDER (TOPPING ham)) (ORDER (TOPPING ham))", ParseError::MultipleRoots { index: 7 }),
      (
        "(PIZZAORDER (TOPPING ham))",
        ParseError::WrongRoot {
          expected: "ORDER".into(),
          found: "PIZZAORDER".into(),
        },
      ),
    ];

    for (input, expected) in cases {
      let tokens = tokenize(input, &g()).unwrap();
      let err = parse(&tokens, &g()).unwrap_err();
      assert_eq!(err, expected, "parsing {}", input);
      if let Some(index) = err.index() {
        assert!(index < tokens.len(), "index {} out of range for {}", index, input);
      }
    }
  }

  #[test]
  fn errors_point_at_tokens() {
    let err_of = |s: &str| parse_str(s, &g()).unwrap_err();
    let at = |s: &str| match err_of(s) {
      TreeError::Parse { source, .. } => source.index(),
      TreeError::Tokenize { .. } => panic!("{} should tokenize", s),
    };

    assert_eq!(at("(ORDER (ham))"), Some(3));
    assert_eq!(at("(ORDER (PIZZAORDER (TOPPING )))"), Some(4));
    assert_eq!(at("(ORDER (PIZZAORDER"), Some(2));
    assert_eq!(at("(PIZZAORDER (TOPPING ham))"), None);
  }

  #[test]
  fn word_only_root_is_rejected() {
    let err = parse_str("(ORDER hello there)", &g()).unwrap_err();
    assert!(matches!(
      err,
      TreeError::Parse {
        source: ParseError::EntityRoot { .. },
        ..
      }
    ));
    assert!(parse_str("(ORDER hello (PIZZAORDER (TOPPING ham)))", &g()).is_ok());
  }

  #[test]
  fn label_in_word_position() {
    let tokens = vec![
      Token::Open,
      Token::Label("ORDER".into()),
      Token::Label("TOPPING".into()),
      Token::Close,
    ];
    assert_eq!(
      parse(&tokens, &g()),
      Err(ParseError::UnexpectedLabel {
        index: 2,
        label: "TOPPING".into(),
      })
    );
    assert_eq!(parse(&[], &g()), Err(ParseError::EmptyTree));
  }

  #[test]
  fn lenient_keeps_unknown_labels() {
    let g = Grammar::pizza().with_mode(Mode::Lenient);
    let t = parse_str("(ORDER (PIZZAORDER (CRUST (STYLE thin))))", &g).unwrap();
    let pizza = &t.root().children()[0];
    assert!(matches!(&pizza.children()[0], Node::Slot(c) if c.label == "CRUST"));

    let t = parse_str("(ORDER (PIZZAORDER (CRUST thin)))", &g).unwrap();
    let pizza = &t.root().children()[0];
    assert_eq!(pizza.children()[0], Node::Entity(Entity::new("CRUST", ["thin"])));
  }
}
