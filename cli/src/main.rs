use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ordertree::dataset::{TargetField, read_records};
use ordertree::evaluate::{EvalReport, Evaluator, Outcome};
use ordertree::grammar::Mode;
use ordertree::resolve::resolve_into_target;
use ordertree::{Catalog, Err, Grammar, Matcher, parse_str};

#[derive(Parser)]
#[command(name = "ordertree", version, about = "Parse and compare PIZZA order trees")]
struct Cli {
  /// Grammar file declaring the constructors (defaults to the PIZZA grammar)
  #[arg(short, long, global = true)]
  grammar: Option<PathBuf>,

  /// Keep undeclared labels instead of rejecting them
  #[arg(long, global = true)]
  lenient: bool,

  /// Debug logging (RUST_LOG overrides this)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Parse a tree and print it back
  Parse {
    expr: String,
    /// Print one constructor per line
    #[arg(long)]
    pretty: bool,
  },
  /// Compare a predicted tree against a gold tree
  Match {
    predicted: String,
    gold: String,
    /// Resolve the prediction's entities with the catalogs in this directory
    #[arg(long)]
    catalogs: Option<PathBuf>,
  },
  /// Score predictions (one tree per line) against a JSON-lines dataset
  Eval {
    dataset: PathBuf,
    predictions: PathBuf,
    /// Which target of each record to compare against
    #[arg(long, default_value = "exr")]
    field: TargetField,
    /// Resolve the predictions' entities with the catalogs in this directory
    #[arg(long)]
    catalogs: Option<PathBuf>,
  },
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn load_grammar(cli: &Cli) -> Result<Grammar, Err> {
  let grammar = match &cli.grammar {
    Some(path) => Grammar::read_from_file(path)?,
    None => Grammar::pizza(),
  };
  Ok(if cli.lenient { grammar.with_mode(Mode::Lenient) } else { grammar })
}

fn parse(g: &Grammar, expr: &str, pretty: bool) -> Result<(), Err> {
  let tree = parse_str(expr, g)?;
  if pretty {
    println!("{}", tree.pretty());
  } else {
    println!("{}", tree);
  }
  Ok(())
}

fn compare(g: &Grammar, predicted: &str, gold: &str, catalogs: Option<&PathBuf>) -> Result<bool, Err> {
  let mut predicted = parse_str(predicted, g)?;
  let gold = parse_str(gold, g)?;

  if let Some(dir) = catalogs {
    let catalog = Catalog::read_from_dir(dir)?;
    let resolution = resolve_into_target(&predicted, &catalog);
    for err in resolution.unresolved.iter() {
      println!("unresolved: {}", err);
    }
    predicted = resolution.tree;
    debug!(tree = %predicted, "resolved prediction");
  }

  let result = Matcher::new(g).compare(&predicted, &gold)?;
  if result.is_match {
    println!("match");
  } else {
    println!("no match");
    for mismatch in result.mismatches.iter() {
      println!("  {}", mismatch);
    }
  }
  Ok(result.is_match)
}

fn eval(
  g: &Grammar,
  dataset: &PathBuf,
  predictions: &PathBuf,
  field: TargetField,
  catalogs: Option<&PathBuf>,
) -> Result<(), Err> {
  let records = read_records(BufReader::new(File::open(dataset)?))?;
  let predictions = BufReader::new(File::open(predictions)?)
    .lines()
    .collect::<Result<Vec<_>, _>>()?;

  if predictions.len() != records.len() {
    return Err(
      format!(
        "{} predictions for {} records in {}",
        predictions.len(),
        records.len(),
        dataset.display()
      )
      .into(),
    );
  }

  let mut pairs = Vec::with_capacity(records.len());
  for (idx, (record, predicted)) in records.iter().zip(predictions).enumerate() {
    let gold = record
      .target(field)
      .ok_or_else(|| format!("record {} has no {} target", idx + 1, field))?;
    pairs.push((predicted, gold.to_string()));
  }
  info!(pairs = pairs.len(), %field, "evaluating");

  let catalog = catalogs.map(Catalog::read_from_dir).transpose()?;
  let mut evaluator = Evaluator::new(g);
  if let Some(catalog) = &catalog {
    evaluator = evaluator.with_resolver(catalog);
  }

  let outcomes = evaluator.outcomes(&pairs);
  for (idx, outcome) in outcomes.iter().enumerate() {
    match outcome {
      Outcome::Match => {}
      Outcome::Mismatch(result) => {
        debug!(line = idx + 1, mismatches = result.mismatches.len(), "mismatch");
      }
      Outcome::Failed(err) => println!("line {}: {}", idx + 1, err),
    }
  }

  println!("{}", EvalReport::from_outcomes(&outcomes));
  Ok(())
}

fn main() -> Result<(), Err> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let g = load_grammar(&cli)?;
  debug!(root = %g.root, mode = %g.mode, constructors = g.len(), "grammar loaded");

  match &cli.command {
    Command::Parse { expr, pretty } => parse(&g, expr, *pretty),
    Command::Match {
      predicted,
      gold,
      catalogs,
    } => {
      if !compare(&g, predicted, gold, catalogs.as_ref())? {
        std::process::exit(1);
      }
      Ok(())
    }
    Command::Eval {
      dataset,
      predictions,
      field,
      catalogs,
    } => eval(&g, dataset, predictions, *field, catalogs.as_ref()),
  }
}
