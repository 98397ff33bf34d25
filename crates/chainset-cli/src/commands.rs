use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use chainset_engine::{ComparerConfig, DifferenceComparer};
use chainset_store::{EntrySource, MemoryStore, SnapshotGenerator};
use chainset_types::{
    difference_from_json, difference_to_json_pretty, plan_to_json, Difference, DifferenceType,
    Identity, RefTag, ReferenceDifference,
};

use crate::cli::*;

type Record = Value;
type Key = String;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = || Session::new(&cli);
    match &cli.command {
        Command::Diff(args) => session()?.cmd_diff(args),
        Command::Plan(args) => session()?.cmd_plan(args),
        Command::Progress(args) => session()?.cmd_progress(args),
        Command::Squash(args) => session()?.cmd_squash(args),
        Command::Apply(args) => session()?.cmd_apply(args),
        Command::Generate(args) => cmd_generate(args, cli.format),
    }
}

/// Render the key field of a record in its JSON form, so `7` and `"7"` stay
/// distinct keys.
fn render_key(record: &Value, field: &str) -> String {
    record.get(field).map(Value::to_string).unwrap_or_default()
}

fn load_config(cli: &Cli) -> anyhow::Result<ComparerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ComparerConfig::from_toml_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ComparerConfig::default(),
    };
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if cli.skip_validation {
        config.skip_validation = true;
    }
    Ok(config)
}

struct Session {
    key_field: String,
    format: OutputFormat,
    comparer: DifferenceComparer<Record, Key>,
}

impl Session {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli)?;
        debug!(chunk_size = config.chunk_size, skip_validation = config.skip_validation, "loaded config");
        let field = cli.key.clone();
        let identity = Identity::new(move |record: &Value| render_key(record, &field));
        Ok(Self {
            key_field: cli.key.clone(),
            format: cli.format,
            comparer: DifferenceComparer::with_config(identity, config)?,
        })
    }

    fn identity(&self) -> &Identity<Record, Key> {
        self.comparer.identity()
    }

    fn check_key_field(&self, path: &Path, index: usize, record: &Value) -> anyhow::Result<()> {
        if record.get(&self.key_field).is_none() {
            bail!(
                "{}: record {index} has no `{}` field",
                path.display(),
                self.key_field
            );
        }
        Ok(())
    }

    fn load_snapshot(&self, path: &Path) -> anyhow::Result<Vec<Record>> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let records: Vec<Value> =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        for (index, record) in records.iter().enumerate() {
            self.check_key_field(path, index, record)?;
        }
        Ok(records)
    }

    fn load_store(&self, path: &Path) -> anyhow::Result<MemoryStore<Record, Key>> {
        let records = self.load_snapshot(path)?;
        MemoryStore::with_entries(self.identity().clone(), records)
            .with_context(|| format!("loading {}", path.display()))
    }

    fn load_difference(&self, path: &Path) -> anyhow::Result<Difference<Record, Key>> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let entries: Vec<Value> =
            serde_json::from_str(&text).with_context(|| format!("parsing difference {}", path.display()))?;
        for (index, entry) in entries.iter().enumerate() {
            for side in ["before", "after"] {
                match entry.get(side) {
                    None | Some(Value::Null) => {}
                    Some(record) => self.check_key_field(path, index, record)?,
                }
            }
        }
        difference_from_json(self.identity(), &text)
            .with_context(|| format!("parsing difference {}", path.display()))
    }

    fn cmd_diff(&self, args: &DiffArgs) -> anyhow::Result<()> {
        let difference = if args.planned {
            let before = self.load_store(&args.snapshots.before)?;
            let after = self.load_store(&args.snapshots.after)?;
            let plan = self.comparer.reference_difference(before.keys()?, after.keys()?)?;
            let page_size = self.comparer.config().chunk_size;
            let mut pages1 = before.paged(page_size)?;
            let mut pages2 = after.paged(page_size)?;
            let difference = self
                .comparer
                .materialize_difference(plan, &mut pages1, &mut pages2);
            if let Some(err) = pages1.take_error().or_else(|| pages2.take_error()) {
                return Err(err.into());
            }
            debug!(pages = pages1.pages_fetched() + pages2.pages_fetched(), "streamed snapshots");
            difference?
        } else {
            let before = self.load_snapshot(&args.snapshots.before)?;
            let after = self.load_snapshot(&args.snapshots.after)?;
            self.comparer.difference(&before, &after)?
        };
        self.print_difference(&difference)
    }

    fn cmd_plan(&self, args: &PairArgs) -> anyhow::Result<()> {
        let key = |r: &Record| render_key(r, &self.key_field);
        let before = self.load_snapshot(&args.before)?;
        let after = self.load_snapshot(&args.after)?;
        let plan = self
            .comparer
            .reference_difference(before.iter().map(key), after.iter().map(key))?;
        match self.format {
            OutputFormat::Json => println!("{}", plan_to_json(&plan)?),
            OutputFormat::Text => print_plan(&plan),
        }
        Ok(())
    }

    fn cmd_progress(&self, args: &ProgressArgs) -> anyhow::Result<()> {
        let first = self.load_difference(&args.first)?;
        let second = self.load_difference(&args.second)?;
        let progressed = self
            .comparer
            .progression(&first, &second)
            .context("differences don't share a base snapshot")?;
        self.print_difference(&progressed)
    }

    fn cmd_squash(&self, args: &SquashArgs) -> anyhow::Result<()> {
        let chain = args
            .differences
            .iter()
            .map(|path| self.load_difference(path))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let squashed = self
            .comparer
            .squash(&chain)
            .context("differences don't form a chain")?;
        self.print_difference(&squashed)
    }

    fn cmd_apply(&self, args: &ApplyArgs) -> anyhow::Result<()> {
        let store = self.load_store(&args.snapshot)?;
        let difference = self.load_difference(&args.difference)?;
        let applied = store
            .apply_difference(&difference)
            .with_context(|| format!("applying {}", args.difference.display()))?;
        match self.format {
            OutputFormat::Json => println!("{}", store.export_json()?),
            OutputFormat::Text => {
                println!(
                    "{} Applied {} changes, {} entries stored",
                    "✓".green().bold(),
                    applied.to_string().bold(),
                    store.len()?
                );
                println!("{}", store.export_json()?);
            }
        }
        Ok(())
    }

    fn print_difference(&self, difference: &Difference<Record, Key>) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", difference_to_json_pretty(difference)?),
            OutputFormat::Text => {
                for entry in difference {
                    let key = entry.key();
                    match entry.kind() {
                        DifferenceType::Add => println!("  {} {}", "+".green().bold(), key.green()),
                        DifferenceType::Delete => println!("  {} {}", "-".red().bold(), key.red()),
                        DifferenceType::Update => println!("  {} {}", "~".yellow().bold(), key.yellow()),
                    }
                }
                if difference.is_empty() {
                    println!("No changes.");
                } else {
                    println!(
                        "{} changes: {} added, {} removed, {} modified",
                        difference.len().to_string().bold(),
                        difference.additions(),
                        difference.removals(),
                        difference.modifications()
                    );
                }
            }
        }
        Ok(())
    }
}

fn print_plan(plan: &[ReferenceDifference<Key>]) {
    let tag = |t: Option<RefTag>| match t {
        Some(t) => format!("{t:?}"),
        None => "-".into(),
    };
    for planned in plan {
        println!(
            "  {:<7} {}  {} -> {}",
            planned.kind().to_string().cyan(),
            planned.key().bold(),
            tag(planned.before_tag()).dimmed(),
            tag(planned.after_tag()).dimmed()
        );
    }
    println!("{} planned", plan.len().to_string().bold());
}

fn cmd_generate(args: &GenerateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut generator = SnapshotGenerator::new(args.entries, args.ids);
    generator.templates = args.templates;
    generator.seed = args.seed;
    let snapshot = generator.generate()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }
    Ok(())
}
