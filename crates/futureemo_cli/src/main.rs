//! Command-line front end for the annotation store.
//!
//! # Responsibility
//! - Map subcommands onto core services.
//! - Render results as plain text or JSON (`--json`).
//! - Gate admin commands behind the configured admin key.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use futureemo_core::{
    export_labels_csv, init_logging, open_db, AdminGuard, AdminOverride, Category,
    ConfigOverrides, EngineConfig, Item, ItemDetail, ItemListQuery, ItemService, ItemStatus,
    LabelService, ReviewService, SqliteItemRepository, SqliteLabelRepository,
    SubmitLabelRequest,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "futureemo", version, about = "FutureEmo annotation consensus CLI")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(long, global = true, help = "SQLite database path")]
    db: Option<PathBuf>,
    #[arg(long, global = true, help = "TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Directory for rolling log files")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Admin key presented for admin commands")]
    key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seed items from a one-column CSV file (first row is a header).
    Seed { file: PathBuf },
    /// Submit one label.
    Submit {
        item: String,
        #[arg(long)]
        annotator: String,
        #[arg(long)]
        label: String,
    },
    /// Items an annotator should label next.
    Batch {
        #[arg(long)]
        annotator: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// One item with its labels and agreement figures.
    Item { id: String },
    /// Item detail listing, newest first.
    Items {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        min_labels: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Corpus-wide Fleiss' Kappa.
    Reliability,
    /// Per-annotator quality figures.
    Annotators {
        #[arg(long)]
        session_gap: Option<u64>,
    },
    /// Corpus progress counts.
    Overview,
    /// Replace an item's consensus.
    Override {
        id: String,
        #[arg(value_enum)]
        action: OverrideAction,
        #[arg(long, required_if_eq("action", "resolve"))]
        label: Option<String>,
    },
    /// Write the CSV label report.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Open,
    Resolved,
    NeedsReview,
}

impl From<StatusArg> for ItemStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Open => ItemStatus::Open,
            StatusArg::Resolved => ItemStatus::Resolved,
            StatusArg::NeedsReview => ItemStatus::NeedsReview,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OverrideAction {
    Resolve,
    Reopen,
    Escalate,
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(&ConfigOverrides {
        config_path: cli.config.clone(),
        db_path: cli.db.clone(),
        admin_key: None,
        log_level: cli.log_level.clone(),
        log_dir: cli.log_dir.clone(),
    })?;

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    if let Err(err) = init_logging(&config.log_level, &config.absolute_log_dir(&cwd)) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let guard = AdminGuard::new(config.admin_key.clone());
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let items = || SqliteItemRepository::try_new(&conn);
    let labels = || SqliteLabelRepository::try_new(&conn);
    let review = || -> anyhow::Result<_> { Ok(ReviewService::new(items()?, labels()?)) };

    match cli.command {
        Commands::Seed { file } => {
            let texts = read_seed_file(&file)?;
            let service = ItemService::with_batch_policy(items()?, config.batch_policy());
            let summary = service.seed_items(&texts)?;
            print_one(cli.json, summary, |s| {
                format!("inserted={} skipped={}", s.inserted, s.skipped)
            })?;
        }
        Commands::Submit {
            item,
            annotator,
            label,
        } => {
            let receipt = LabelService::new(labels()?).submit_label(&SubmitLabelRequest {
                item_id: item,
                annotator_name: annotator,
                value: label,
            })?;
            print_one(cli.json, receipt, |r| {
                format!(
                    "{}\t{}\t{}\tlabels={}",
                    r.item_id,
                    r.status,
                    label_or_dash(r.resolved_label),
                    r.label_count
                )
            })?;
        }
        Commands::Batch { annotator, limit } => {
            let service = ItemService::with_batch_policy(items()?, config.batch_policy());
            let batch = service.next_batch(&annotator, limit)?;
            print_out(cli.json, &batch, item_row)?;
        }
        Commands::Item { id } => {
            let detail = review()?.get_item_detail(&id)?;
            print_one(cli.json, detail, detail_text)?;
        }
        Commands::Items {
            status,
            min_labels,
            limit,
            offset,
        } => {
            guard.authorize(cli.key.as_deref())?;
            let query = ItemListQuery {
                status: status.map(ItemStatus::from),
                min_label_count: min_labels,
                limit,
                offset,
            };
            let details = review()?.list_item_details(&query)?;
            print_out(cli.json, &details, |detail| item_row(&detail.item))?;
        }
        Commands::Reliability => {
            guard.authorize(cli.key.as_deref())?;
            let report = review()?.corpus_reliability()?;
            print_one(cli.json, report, |r| {
                if !r.has_data() {
                    return "no data: no item has two or more labels yet".to_string();
                }
                let distribution: Vec<String> = r
                    .category_distribution
                    .iter()
                    .map(|share| format!("{}={}%", share.category, share.percent))
                    .collect();
                format!(
                    "kappa={} ({})\nitems={} mean_raters={}\np_bar={} p_bar_e={}\n{}",
                    number_or_dash(r.kappa),
                    r.interpretation.map_or("-", |band| band.as_str()),
                    r.total_items,
                    number_or_dash(r.mean_raters_per_item),
                    number_or_dash(r.p_bar),
                    number_or_dash(r.p_bar_e),
                    distribution.join(" ")
                )
            })?;
        }
        Commands::Annotators { session_gap } => {
            guard.authorize(cli.key.as_deref())?;
            let gap = session_gap.unwrap_or(config.session_gap_seconds);
            if gap == 0 {
                bail!("--session-gap must be positive");
            }
            let stats = review()?.annotator_stats(gap)?;
            print_out(cli.json, &stats, |s| {
                format!(
                    "{}\ttotal={}\tagree={}\tdisagree={}\trate={}\tavg_gap_s={}",
                    s.annotator_name,
                    s.total_labels,
                    s.agreement_count,
                    s.disagreement_count,
                    number_or_dash(s.disagreement_rate),
                    number_or_dash(s.avg_gap_seconds)
                )
            })?;
        }
        Commands::Overview => {
            guard.authorize(cli.key.as_deref())?;
            let overview = review()?.overview()?;
            print_one(cli.json, overview, |o| {
                format!(
                    "items={} labels={} labeled={} multi_labeled={}\nopen={} resolved={} needs_review={}\nunanimous={} split={} agreement_rate={}",
                    o.total_items,
                    o.total_labels,
                    o.items_with_any_label,
                    o.items_with_multiple_labels,
                    o.open_items,
                    o.resolved_items,
                    o.needs_review_items,
                    o.unanimity.agreement_count,
                    o.unanimity.disagreement_count,
                    number_or_dash(o.unanimity.agreement_rate)
                )
            })?;
        }
        Commands::Override { id, action, label } => {
            guard.authorize(cli.key.as_deref())?;
            let decision = match action {
                OverrideAction::Resolve => {
                    let label = label.unwrap_or_default();
                    let category = Category::parse(label.trim()).with_context(|| {
                        format!(
                            "--label must be one of Hope, Fear, Determination, Neutral; got `{label}`"
                        )
                    })?;
                    AdminOverride::Resolve(category)
                }
                OverrideAction::Reopen => AdminOverride::Reopen,
                OverrideAction::Escalate => AdminOverride::Escalate,
            };
            let service = ItemService::with_batch_policy(items()?, config.batch_policy());
            let item = service.override_item(&id, decision)?;
            print_one(cli.json, item, item_row)?;
        }
        Commands::Export { output } => {
            guard.authorize(cli.key.as_deref())?;
            let report = export_labels_csv(&review()?)?;
            match output {
                Some(path) => std::fs::write(&path, report)
                    .with_context(|| format!("failed to write `{}`", path.display()))?,
                None => println!("{report}"),
            }
        }
    }

    Ok(())
}

/// Item texts from a seed file: one per line after the header row.
///
/// A line wrapped in double quotes is unquoted and its doubled quotes
/// collapsed.
fn read_seed_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    Ok(seed_texts(&content))
}

fn seed_texts(content: &str) -> Vec<String> {
    content
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            match line
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
            {
                Some(inner) => inner.replace("\"\"", "\""),
                None => line.to_string(),
            }
        })
        .collect()
}

fn item_row(item: &Item) -> String {
    format!(
        "{}\t{}\t{}\tlabels={}{}\t{}",
        item.uuid,
        item.status(),
        label_or_dash(item.resolved_label()),
        item.label_count,
        if item.is_override { "\toverride" } else { "" },
        item.text
    )
}

fn detail_text(detail: &ItemDetail) -> String {
    let mut lines = vec![item_row(&detail.item)];
    for label in &detail.labels {
        lines.push(format!(
            "  {}\t{}\t{}",
            label.annotator_name, label.value, label.submitted_at
        ));
    }
    let agreement = &detail.agreement;
    lines.push(format!(
        "raters={} agreement={} majority={} kappa={}",
        agreement.rater_count,
        agreement
            .agreement_pct
            .map_or_else(|| "-".to_string(), |pct| format!("{pct}%")),
        label_or_dash(agreement.majority_label),
        number_or_dash(agreement.kappa)
    ));
    lines.join("\n")
}

fn label_or_dash(label: Option<Category>) -> &'static str {
    label.map_or("-", Category::as_str)
}

fn number_or_dash(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{seed_texts, Cli};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn seed_texts_skip_header_and_blank_lines() {
        let content = "comment\nfirst one\n\n  second one  \n\"quoted, with \"\"quotes\"\"\"\n";
        assert_eq!(
            seed_texts(content),
            ["first one", "second one", "quoted, with \"quotes\""]
        );
    }

    #[test]
    fn header_only_file_yields_nothing() {
        assert!(seed_texts("comment\n").is_empty());
    }
}
