#[macro_use]
extern crate lazy_static;

pub mod canonical;
pub mod dataset;
pub mod errors;
pub mod evaluate;
pub mod grammar;
pub mod matcher;
pub mod parse;
pub mod parse_grammar;
pub mod resolve;
pub mod syntree;
pub mod token;
pub mod utils;

use tracing::warn;

pub use crate::errors::{MatcherError, ParseError, TokenizeError, TreeError, UnresolvableEntityError};
pub use crate::grammar::Grammar;
pub use crate::matcher::{MatchResult, Matcher, Mismatch};
pub use crate::parse::{parse, parse_str};
pub use crate::resolve::{Catalog, Resolver};
pub use crate::syntree::{Node, Tree};
pub use crate::utils::Err;

/// Parses `s`, logging and swallowing the error. The string-level match
/// helpers treat an unparsable side as "no match".
fn tree_if_possible(s: &str, grammar: &Grammar) -> Option<Tree> {
  match parse_str(s, grammar) {
    Ok(tree) => Some(tree),
    Err(err) => {
      warn!(%err, "no tree for input");
      None
    }
  }
}

/// Plain unordered exact match: same constructors, same words (non-semantic
/// ones included), children in any order. `false` if either side doesn't
/// parse.
pub fn is_unordered_exact_match(a: &str, b: &str, grammar: &Grammar) -> bool {
  match (tree_if_possible(a, grammar), tree_if_possible(b, grammar)) {
    (Some(a), Some(b)) => a.is_unordered_exact_match(&b),
    _ => false,
  }
}

/// Like [`is_unordered_exact_match`], but ignoring words that sit outside of
/// entities, as in TOP's `(ORDER i'd like (PIZZAORDER ...) )`.
pub fn is_semantics_only_unordered_exact_match(a: &str, b: &str, grammar: &Grammar) -> bool {
  match (tree_if_possible(a, grammar), tree_if_possible(b, grammar)) {
    (Some(a), Some(b)) => a.semantics_only().is_unordered_exact_match(&b.semantics_only()),
    _ => false,
  }
}

/// Resolves `predicted` (typically TOP) into target form and compares it with
/// `gold` (EXR) using the semantic matcher.
pub fn is_unordered_exact_match_post_er(
  predicted: &str,
  gold: &str,
  grammar: &Grammar,
  resolver: &dyn Resolver,
) -> bool {
  let (predicted, gold) = match (tree_if_possible(predicted, grammar), tree_if_possible(gold, grammar)) {
    (Some(p), Some(g)) => (p, g),
    _ => return false,
  };
  let predicted = resolve::resolve_into_target(&predicted, resolver).tree;
  match Matcher::new(grammar).compare(&predicted, &gold) {
    Ok(result) => result.is_match,
    Err(err) => {
      warn!(%err, "trees could not be compared");
      false
    }
  }
}

#[test]
fn test_string_helpers() {
  let g = Grammar::pizza();

  let top_a = "(ORDER can i have (PIZZAORDER (NUMBER a ) (TOPPING ham ) (TOPPING olives ) ) please )";
  let top_b = "(ORDER (PIZZAORDER (TOPPING olives ) (NUMBER a ) (TOPPING ham ) ) )";

  assert!(is_unordered_exact_match(top_a, top_a, &g));
  assert!(!is_unordered_exact_match(top_a, top_b, &g));
  assert!(is_semantics_only_unordered_exact_match(top_a, top_b, &g));
  assert!(!is_unordered_exact_match(top_a, "(ORDER (PIZZAORDER", &g));
  assert!(!is_semantics_only_unordered_exact_match("", top_b, &g));

  let catalog = Catalog::new()
    .with_table("NUMBER", include_str!("../catalogs/number.txt"))
    .and_then(|c| c.with_table("TOPPING", include_str!("../catalogs/topping.txt")))
    .unwrap();
  let exr = "(ORDER (PIZZAORDER (NUMBER 1 ) (TOPPING HAM ) (TOPPING OLIVES ) ) )";
  assert!(is_unordered_exact_match_post_er(top_a, exr, &g, &catalog));
  assert!(!is_unordered_exact_match_post_er(top_a, "(ORDER (PIZZAORDER (TOPPING HAM ) ) )", &g, &catalog));
}
