use anyhow::Context;
use campus_core::config::{orphan_policy_from_env_value, snapshot_format_from_env_value};
use campus_core::constants::{ORPHAN_POLICY_ENV, SNAPSHOT_FORMAT_ENV};
use campus_core::{
    group_json_by_field, Comment, CommentWire, CommentWithReplies, CoreConfig, OrphanPolicy,
    SnapshotFormat, ThreadService,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus community comment-thread tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the reply tree of a comment snapshot
    Tree {
        /// Snapshot file (.json, .yaml or .yml)
        path: PathBuf,
        /// What to do with comments whose parent is missing
        #[arg(long, value_enum)]
        orphans: Option<OrphansArg>,
        /// Snapshot format, overriding the file extension
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Output style
        #[arg(long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// Group the items of a JSON array by one of their fields
    Group {
        /// JSON file holding an array of objects
        path: PathBuf,
        /// Field to group by
        #[arg(long)]
        by: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OrphansArg {
    Drop,
    #[value(alias = "promote-to-root")]
    Promote,
}

impl From<OrphansArg> for OrphanPolicy {
    fn from(arg: OrphansArg) -> Self {
        match arg {
            OrphansArg::Drop => OrphanPolicy::Drop,
            OrphansArg::Promote => OrphanPolicy::PromoteToRoot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl From<FormatArg> for SnapshotFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => SnapshotFormat::Json,
            FormatArg::Yaml => SnapshotFormat::Yaml,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Text,
    Json,
    Yaml,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("campus=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tree {
            path,
            orphans,
            format,
            output,
        }) => {
            let cfg = resolve_config(orphans, format)?;
            tracing::info!(
                "building comment tree from {} (orphans: {})",
                path.display(),
                cfg.orphan_policy().as_str()
            );
            let service = ThreadService::new(cfg);
            let forest = service
                .thread_from_path(&path)
                .with_context(|| format!("failed to build tree for {}", path.display()))?;

            match output {
                Output::Text => print!("{}", render_text(&forest)),
                Output::Json => println!("{}", CommentWire::render_forest_json(&forest)?),
                Output::Yaml => print!("{}", CommentWire::render_forest_yaml(&forest)?),
            }
        }
        Some(Commands::Group { path, by }) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            let groups = group_json_by_field(&value, &by)?;
            if groups.is_empty() {
                println!("No items.");
            }
            for (key, items) in groups.iter() {
                println!("{}\t{}", key, items.len());
            }
        }
        None => {
            println!("Use 'campus --help' for commands");
        }
    }

    Ok(())
}

/// Command-line flags win over environment variables.
fn resolve_config(
    orphans: Option<OrphansArg>,
    format: Option<FormatArg>,
) -> anyhow::Result<CoreConfig> {
    let orphan_policy = match orphans {
        Some(arg) => arg.into(),
        None => orphan_policy_from_env_value(std::env::var(ORPHAN_POLICY_ENV).ok())?,
    };
    let snapshot_format = match format {
        Some(arg) => Some(arg.into()),
        None => snapshot_format_from_env_value(std::env::var(SNAPSHOT_FORMAT_ENV).ok())?,
    };
    Ok(CoreConfig::new(orphan_policy, snapshot_format))
}

/// Indented `author: body` lines, one per comment, with the number of direct replies.
fn render_text(forest: &[CommentWithReplies<Comment>]) -> String {
    if forest.is_empty() {
        return "No comments.\n".to_string();
    }

    let mut out = String::new();
    let mut pending: Vec<(&CommentWithReplies<Comment>, usize)> =
        forest.iter().rev().map(|root| (root, 0)).collect();
    while let Some((node, level)) = pending.pop() {
        let suffix = match node.replies.len() {
            0 => String::new(),
            1 => " (1 reply)".to_string(),
            n => format!(" ({n} replies)"),
        };
        out.push_str(&format!(
            "{}- {}: {}{}\n",
            "  ".repeat(level),
            node.comment.author.display_name,
            node.comment.body,
            suffix
        ));
        pending.extend(node.replies.iter().rev().map(|reply| (reply, level + 1)));
    }
    out
}
