use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use coalesce_types::EntityId;

#[derive(Parser)]
#[command(
    name = "coalesce",
    about = "Fold duplicate records into a survivor, relationships included",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Merge configuration (TOML). Defaults apply when absent.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a schema and list each type's mergeable relationships
    Check(CheckArgs),
    /// Merge donor records into a survivor
    Merge(MergeArgs),
    /// Check whether two records are equivalent
    Equivalent(EquivalentArgs),
    /// Show a record's attributes and related records
    Show(ShowArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(long)]
    pub schema: PathBuf,
}

/// Schema and dataset shared by every command that reads records.
#[derive(Args)]
pub struct Source {
    #[arg(long)]
    pub schema: PathBuf,
    #[arg(long)]
    pub data: PathBuf,
    #[arg(long = "type", value_name = "TYPE")]
    pub entity_type: String,
}

#[derive(Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub source: Source,
    #[arg(long)]
    pub survivor: EntityId,
    /// Donors in priority order; repeat the flag for each
    #[arg(long = "donor", required = true)]
    pub donors: Vec<EntityId>,
    /// Where to write the resulting dataset; defaults to overwriting --data
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Report what the merge would do and leave the dataset untouched
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct EquivalentArgs {
    #[command(flatten)]
    pub source: Source,
    pub a: EntityId,
    pub b: EntityId,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub source: Source,
    pub id: EntityId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["coalesce", "check", "--schema", "s.toml"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert_eq!(args.schema, PathBuf::from("s.toml"));
        } else { panic!("wrong command"); }
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_merge() {
        let cli = Cli::try_parse_from([
            "coalesce", "merge", "--schema", "s.toml", "--data", "d.json", "--type", "Company",
            "--survivor", "1", "--donor", "3", "--donor", "#2",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.source.entity_type, "Company");
            assert_eq!(args.survivor, EntityId::new(1));
            assert_eq!(args.donors, vec![EntityId::new(3), EntityId::new(2)]);
            assert!(!args.dry_run);
            assert!(args.output.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_merge_dry_run_with_output() {
        let cli = Cli::try_parse_from([
            "coalesce", "merge", "--schema", "s.toml", "--data", "d.json", "--type", "Company",
            "--survivor", "1", "--donor", "2", "--dry-run", "-o", "out.json",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert!(args.dry_run);
            assert_eq!(args.output, Some(PathBuf::from("out.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn merge_requires_a_donor() {
        let result = Cli::try_parse_from([
            "coalesce", "merge", "--schema", "s.toml", "--data", "d.json", "--type", "Company",
            "--survivor", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn merge_rejects_bad_id() {
        let result = Cli::try_parse_from([
            "coalesce", "merge", "--schema", "s.toml", "--data", "d.json", "--type", "Company",
            "--survivor", "one", "--donor", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_equivalent() {
        let cli = Cli::try_parse_from([
            "coalesce", "equivalent", "--schema", "s.toml", "--data", "d.json", "--type", "Phonenumber", "1", "2",
        ])
        .unwrap();
        if let Command::Equivalent(args) = cli.command {
            assert_eq!((args.a, args.b), (EntityId::new(1), EntityId::new(2)));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show_with_globals() {
        let cli = Cli::try_parse_from([
            "coalesce", "show", "--schema", "s.toml", "--data", "d.json", "--type", "Person", "7",
            "--format", "json", "-v", "--config", "merge.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("merge.toml")));
        assert!(matches!(cli.command, Command::Show(ShowArgs { id, .. }) if id == EntityId::new(7)));
    }
}
