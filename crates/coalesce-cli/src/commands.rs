use std::fs;
use std::path::Path;

use anyhow::Context;
use coalesce_merge::{mergeable_relationships, MergeConfig, MergeEngine, MergeOutcome};
use coalesce_schema::{Schema, SchemaDef};
use coalesce_store::{Dataset, EntityStore, InMemoryEntityStore};
use coalesce_types::{Entity, EntityId, EntityRef, EntityType};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Check(args) => cmd_check(args, cli.format),
        Command::Merge(args) => cmd_merge(args, config, cli.format),
        Command::Equivalent(args) => cmd_equivalent(args, config, cli.format),
        Command::Show(args) => cmd_show(args, cli.format),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> anyhow::Result<MergeConfig> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(MergeConfig::default());
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    MergeConfig::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let schema = SchemaDef::from_toml_str(&text)
        .and_then(SchemaDef::into_schema)
        .with_context(|| format!("loading schema {}", path.display()))?;
    Ok(schema)
}

/// Load the schema and dataset, and resolve the requested type against it.
fn open_store(source: &Source) -> anyhow::Result<(InMemoryEntityStore, EntityType)> {
    let schema = load_schema(&source.schema)?;
    let entity_type = schema
        .model(&source.entity_type)
        .context("resolving --type")?
        .name()
        .clone();
    let text = fs::read_to_string(&source.data)
        .with_context(|| format!("reading {}", source.data.display()))?;
    let dataset = Dataset::from_json_str(&text)
        .with_context(|| format!("parsing {}", source.data.display()))?;
    let store = InMemoryEntityStore::from_dataset(schema, &dataset)
        .with_context(|| format!("loading {}", source.data.display()))?;
    debug!(records = dataset.record_count(), "dataset loaded");
    Ok((store, entity_type))
}

fn fetch(store: &InMemoryEntityStore, entity_type: &EntityType, id: EntityId) -> anyhow::Result<Entity> {
    let entity = EntityRef::new(entity_type.clone(), id);
    store
        .find(&entity)
        .with_context(|| format!("{entity} not found"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TypeSummary {
    entity_type: String,
    attributes: Vec<String>,
    /// Mergeable relationships as `name (cardinality)`, in declaration order.
    mergeable: Vec<String>,
    excluded: Vec<String>,
}

fn summarize(schema: &Schema) -> Vec<TypeSummary> {
    schema
        .models()
        .map(|model| TypeSummary {
            entity_type: model.name().to_string(),
            attributes: model.attribute_names().map(str::to_string).collect(),
            mergeable: mergeable_relationships(model)
                .into_iter()
                .map(|rel| format!("{} ({})", rel.name, rel.cardinality))
                .collect(),
            excluded: model
                .relationships()
                .iter()
                .filter(|rel| model.excludes(&rel.name))
                .map(|rel| rel.name.clone())
                .collect(),
        })
        .collect()
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(&args.schema)?;
    let summary = summarize(&schema);
    if format == OutputFormat::Json {
        return print_json(&summary);
    }
    println!("{} Schema valid: {} types", "✓".green().bold(), summary.len().to_string().bold());
    for ty in &summary {
        println!("{}", ty.entity_type.yellow().bold());
        println!("  attributes: {}", ty.attributes.join(", "));
        if ty.mergeable.is_empty() {
            println!("  merges: {}", "(none)".dimmed());
        } else {
            println!("  merges: {}", ty.mergeable.join(", ").cyan());
        }
        if !ty.excluded.is_empty() {
            println!("  excluded: {}", ty.excluded.join(", ").dimmed());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

fn run_merge(args: &MergeArgs, config: MergeConfig) -> anyhow::Result<(InMemoryEntityStore, MergeOutcome)> {
    let (store, entity_type) = open_store(&args.source)?;
    let survivor = EntityRef::new(entity_type.clone(), args.survivor);
    let donors: Vec<EntityRef> = args
        .donors
        .iter()
        .map(|id| EntityRef::new(entity_type.clone(), *id))
        .collect();

    let engine = MergeEngine::new(config);
    let outcome = if args.dry_run {
        engine.preview(&store, &survivor, &donors)
    } else {
        engine.merge(&store, &survivor, &donors)
    }
    .with_context(|| format!("merging into {survivor}"))?;
    Ok((store, outcome))
}

fn cmd_merge(args: MergeArgs, config: MergeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (store, outcome) = run_merge(&args, config)?;

    if !args.dry_run {
        let target = args.output.as_deref().unwrap_or(&args.source.data);
        let json = store.to_dataset().to_json_pretty()?;
        fs::write(target, json).with_context(|| format!("writing {}", target.display()))?;
        debug!(path = %target.display(), "dataset written");
    }

    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    let report = &outcome.report;
    let verb = if args.dry_run { "Would merge" } else { "Merged" };
    println!(
        "{} {verb} {} donor(s) into {}",
        "✓".green().bold(),
        args.donors.len(),
        outcome.survivor.entity_ref().to_string().yellow().bold()
    );
    for filled in &report.filled {
        println!("  {} {} from {}", "filled".green(), filled.attribute.bold(), filled.source);
    }
    for moved in &report.reassigned {
        println!(
            "  {} {} via {} ({} → {})",
            "moved".cyan(),
            moved.record,
            moved.relationship,
            moved.from,
            moved.to
        );
    }
    for nested in &report.nested {
        println!(
            "  {} {} into {} via {}",
            "merged".blue(),
            nested.donor,
            nested.survivor,
            nested.relationship
        );
    }
    for deleted in &report.deleted {
        println!("  {} {}", "deleted".red(), deleted);
    }
    if args.dry_run {
        println!("{}", "Dry run: dataset left unchanged.".dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// equivalent
// ---------------------------------------------------------------------------

fn cmd_equivalent(args: EquivalentArgs, config: MergeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (store, entity_type) = open_store(&args.source)?;
    let a = fetch(&store, &entity_type, args.a)?;
    let b = fetch(&store, &entity_type, args.b)?;
    let equivalent = MergeEngine::new(config).equivalent(store.schema(), &a, &b);

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "a": a.entity_ref(),
            "b": b.entity_ref(),
            "equivalent": equivalent,
        }));
    }
    if equivalent {
        println!("{} {} and {} are equivalent", "✓".green().bold(), a.entity_ref(), b.entity_ref());
    } else {
        println!("{} {} and {} differ", "✗".red().bold(), a.entity_ref(), b.entity_ref());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RelatedView {
    relationship: String,
    records: Vec<EntityRef>,
}

#[derive(Debug, Serialize)]
struct RecordView {
    record: Entity,
    /// One entry per relationship, in declaration order.
    related: Vec<RelatedView>,
}

fn view(store: &InMemoryEntityStore, entity_type: &EntityType, id: EntityId) -> anyhow::Result<RecordView> {
    let record = fetch(store, entity_type, id)?;
    let entity = record.entity_ref();
    let names: Vec<String> = store
        .schema()
        .relationships(entity_type.as_str())?
        .iter()
        .map(|rel| rel.name.clone())
        .collect();

    let tx = store.begin()?;
    let mut related = Vec::with_capacity(names.len());
    for name in names {
        let records: Vec<EntityRef> = tx
            .get_related(&entity, &name)
            .with_context(|| format!("following {entity}.{name}"))?
            .into_vec()
            .iter()
            .map(Entity::entity_ref)
            .collect();
        related.push(RelatedView { relationship: name, records });
    }
    Ok(RecordView { record, related })
}

fn cmd_show(args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (store, entity_type) = open_store(&args.source)?;
    let view = view(&store, &entity_type, args.id)?;
    if format == OutputFormat::Json {
        return print_json(&view);
    }

    println!("{}", view.record.entity_ref().to_string().yellow().bold());
    for (name, value) in &view.record.attributes {
        println!("  {name}: {value}");
    }
    for RelatedView { relationship: name, records } in &view.related {
        let ids: Vec<String> = records.iter().map(ToString::to_string).collect();
        let shown = if ids.is_empty() { "(none)".dimmed().to_string() } else { ids.join(", ") };
        println!("  {} {}", format!("{name}:").cyan(), shown);
    }
    Ok(())
}
