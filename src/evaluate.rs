//! Exact-match evaluation over many (predicted, gold) pairs.
use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::errors::EvalError;
use crate::grammar::Grammar;
use crate::matcher::{MatchResult, Matcher};
use crate::parse::parse_str;
use crate::resolve::{Resolver, resolve_into_target};

/// What happened to one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Match,
  Mismatch(MatchResult),
  /// The pair could not be compared. Other pairs are unaffected.
  Failed(EvalError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalReport {
  pub total: usize,
  pub exact_matches: usize,
  pub mismatches: usize,
  pub failures: usize,
}

impl EvalReport {
  fn record(mut self, outcome: &Outcome) -> Self {
    self.total += 1;
    match outcome {
      Outcome::Match => self.exact_matches += 1,
      Outcome::Mismatch(_) => self.mismatches += 1,
      Outcome::Failed(_) => self.failures += 1,
    }
    self
  }

  fn merge(self, other: Self) -> Self {
    Self {
      total: self.total + other.total,
      exact_matches: self.exact_matches + other.exact_matches,
      mismatches: self.mismatches + other.mismatches,
      failures: self.failures + other.failures,
    }
  }

  pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
    outcomes.iter().fold(Self::default(), Self::record)
  }

  /// Exact matches over all pairs, failures included. 0 for no pairs.
  pub fn accuracy(&self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      self.exact_matches as f64 / self.total as f64
    }
  }
}

impl fmt::Display for EvalReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} pairs: {} exact matches ({:.2}%), {} mismatches, {} failures",
      self.total,
      self.exact_matches,
      self.accuracy() * 100.0,
      self.mismatches,
      self.failures
    )
  }
}

/// Scores predictions against gold targets. With a resolver, predictions are
/// first turned into target form (words dropped, entities resolved, default
/// numbers added) before comparison.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
  grammar: &'a Grammar,
  resolver: Option<&'a dyn Resolver>,
}

impl<'a> Evaluator<'a> {
  pub fn new(grammar: &'a Grammar) -> Self {
    Self {
      grammar,
      resolver: None,
    }
  }

  pub fn with_resolver(mut self, resolver: &'a dyn Resolver) -> Self {
    self.resolver = Some(resolver);
    self
  }

  pub fn evaluate_pair(&self, predicted: &str, gold: &str) -> Outcome {
    match self.try_evaluate_pair(predicted, gold) {
      Ok(result) if result.is_match => Outcome::Match,
      Ok(result) => Outcome::Mismatch(result),
      Err(err) => {
        debug!(%err, "pair failed");
        Outcome::Failed(err)
      }
    }
  }

  fn try_evaluate_pair(&self, predicted: &str, gold: &str) -> Result<MatchResult, EvalError> {
    let predicted = parse_str(predicted, self.grammar).map_err(EvalError::Predicted)?;
    let gold = parse_str(gold, self.grammar).map_err(EvalError::Gold)?;

    let predicted = match self.resolver {
      Some(resolver) => resolve_into_target(&predicted, resolver).tree,
      None => predicted,
    };

    Ok(Matcher::new(self.grammar).compare(&predicted, &gold)?)
  }

  /// Evaluates every pair in parallel, keeping outcomes in input order.
  pub fn outcomes<S: AsRef<str> + Sync>(&self, pairs: &[(S, S)]) -> Vec<Outcome> {
    pairs
      .par_iter()
      .map(|(predicted, gold)| self.evaluate_pair(predicted.as_ref(), gold.as_ref()))
      .collect()
  }

  pub fn evaluate<S: AsRef<str> + Sync>(&self, pairs: &[(S, S)]) -> EvalReport {
    let report = pairs
      .par_iter()
      .map(|(predicted, gold)| self.evaluate_pair(predicted.as_ref(), gold.as_ref()))
      .fold(EvalReport::default, |report, outcome| report.record(&outcome))
      .reduce(EvalReport::default, EvalReport::merge);

    info!(
      total = report.total,
      exact_matches = report.exact_matches,
      failures = report.failures,
      "evaluation finished"
    );
    report
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::{ParseError, TreeError};
  use crate::resolve::Catalog;

  fn catalog() -> Catalog {
    Catalog::new()
      .with_table("NUMBER", include_str!("../catalogs/number.txt"))
      .and_then(|c| c.with_table("SIZE", include_str!("../catalogs/size.txt")))
      .and_then(|c| c.with_table("TOPPING", include_str!("../catalogs/topping.txt")))
      .and_then(|c| c.with_table("DRINKTYPE", include_str!("../catalogs/drinks.txt")))
      .unwrap()
  }

  #[test]
  fn isolates_failures() {
    let g = Grammar::pizza();
    let pairs = vec![
      (
        "(ORDER (PIZZAORDER (TOPPING HAM)(TOPPING OLIVES)))",
        "(ORDER (PIZZAORDER (TOPPING OLIVES)(TOPPING HAM)))",
      ),
      (
        "(ORDER (PIZZAORDER (TOPPING HAM)))",
        "(ORDER (PIZZAORDER (TOPPING HAM)(TOPPING OLIVES)))",
      ),
      ("(ORDER (PIZZAORDER", "(ORDER (PIZZAORDER (TOPPING HAM)))"),
      ("(ORDER (PIZZAORDER (TOPPING HAM)))", ")"),
    ];

    let evaluator = Evaluator::new(&g);
    let report = evaluator.evaluate(&pairs);
    assert_eq!(
      report,
      EvalReport {
        total: 4,
        exact_matches: 1,
        mismatches: 1,
        failures: 2,
      }
    );
    assert_eq!(report.accuracy(), 0.25);

    let outcomes = evaluator.outcomes(&pairs);
    assert_eq!(EvalReport::from_outcomes(&outcomes), report);
    assert_eq!(outcomes[0], Outcome::Match);
    assert!(matches!(&outcomes[1], Outcome::Mismatch(r) if r.mismatches.len() == 1));
    assert!(matches!(
      &outcomes[2],
      Outcome::Failed(EvalError::Predicted(TreeError::Parse {
        source: ParseError::Unclosed { .. },
        ..
      }))
    ));
    assert!(matches!(&outcomes[3], Outcome::Failed(EvalError::Gold(TreeError::Tokenize { .. }))));
  }

  #[test]
  fn resolves_predictions() {
    let g = Grammar::pizza();
    let c = catalog();
    let pairs = vec![
      (
        "(ORDER i want (PIZZAORDER (SIZE extra large ) pie with (TOPPING ham ) ) )".to_string(),
        "(ORDER (PIZZAORDER (NUMBER 1 ) (SIZE EXTRA_LARGE ) (TOPPING HAM ) ) )".to_string(),
      ),
      (
        "(ORDER (DRINKORDER (NUMBER two ) (DRINKTYPE diet cokes ) ) )".to_string(),
        "(ORDER (DRINKORDER (NUMBER 2 ) (DRINKTYPE DIET_COKE ) ) )".to_string(),
      ),
    ];

    let plain = Evaluator::new(&g).evaluate(&pairs);
    assert_eq!(plain.exact_matches, 0);

    // "diet cokes" has no catalog entry and stays unresolved
    let resolved = Evaluator::new(&g).with_resolver(&c).evaluate(&pairs);
    assert_eq!(resolved.exact_matches, 1);
    assert_eq!(resolved.mismatches, 1);
    assert_eq!(resolved.to_string(), "2 pairs: 1 exact matches (50.00%), 1 mismatches, 0 failures");
  }

  #[test]
  fn empty_batch() {
    let g = Grammar::pizza();
    let pairs: Vec<(String, String)> = Vec::new();
    let report = Evaluator::new(&g).evaluate(&pairs);
    assert_eq!(report.total, 0);
    assert_eq!(report.accuracy(), 0.0);
  }
}
