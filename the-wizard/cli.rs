use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
  ValueEnum,
};
use the_wizard::flows::EntityKind;

#[derive(Parser, Debug)]
#[command(name = "the-wizard", about, version, long_about = None)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  pub verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  pub log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  pub config_file: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Annotate a model entity by searching a database live
  Annotate {
    /// JSON catalog mapping database ids to items
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Kind of entity, decides the recommended databases
    #[arg(long, default_value_t = EntityKind::Other)]
    kind: EntityKind,

    /// Name of the entity; also pre-fills the query
    #[arg(long)]
    name: Option<String>,

    /// Artificial lookup latency
    #[arg(long = "latency-ms", value_name = "MS", default_value_t = 0)]
    latency_ms: u64,
  },
  /// Search for a biomodel and pick one of the matches
  Browse {
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    #[arg(long = "latency-ms", value_name = "MS", default_value_t = 0)]
    latency_ms: u64,
  },
  /// Pick one entry from a JSON list of items
  Choose {
    #[arg(long, value_name = "FILE")]
    items: PathBuf,

    /// What the items are, decides the title and prompt
    #[arg(long, value_enum, default_value_t = ChoiceKind::RateLaw)]
    kind: ChoiceKind,
  },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChoiceKind {
  RateLaw,
  Annotation,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
      "the-wizard",
      "annotate",
      "--catalog",
      "catalog.json",
      "--kind",
      "species",
      "-vv",
    ])
    .unwrap();
    assert_eq!(cli.verbosity, 2);
    let Command::Annotate { kind, name, .. } = cli.command else {
      panic!("expected annotate");
    };
    assert_eq!(kind, EntityKind::Species);
    assert_eq!(name, None);
  }

  #[test]
  fn choose_kind_defaults_to_rate_law() {
    let cli = Cli::try_parse_from(["the-wizard", "choose", "--items", "laws.json"]).unwrap();
    let Command::Choose { kind, .. } = cli.command else {
      panic!("expected choose");
    };
    assert_eq!(kind, ChoiceKind::RateLaw);

    let cli = Cli::try_parse_from([
      "the-wizard",
      "choose",
      "--items",
      "hits.json",
      "--kind",
      "annotation",
    ])
    .unwrap();
    let Command::Choose { kind, .. } = cli.command else {
      panic!("expected choose");
    };
    assert_eq!(kind, ChoiceKind::Annotation);
  }

  #[test]
  fn rejects_unknown_kind() {
    let result = Cli::try_parse_from([
      "the-wizard",
      "annotate",
      "--catalog",
      "c.json",
      "--kind",
      "planet",
    ]);
    assert!(result.is_err());
  }
}
