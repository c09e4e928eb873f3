use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::ChapterToggleMode;
use crate::provider::ProviderKind;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for persisted history (default: ROADMAP_DATA_DIR, then the platform data dir).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Whether toggling a chapter also sets its resources (default: ROADMAP_CHAPTER_TOGGLE or cascade).
    #[arg(long, global = true, value_enum)]
    pub chapter_toggle: Option<ChapterToggleMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Generate(GenerateArgs),
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    Chapter {
        #[command(subcommand)]
        command: ChapterCommand,
    },
    Resource {
        #[command(subcommand)]
        command: ResourceCommand,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Topic to build a learning roadmap for.
    #[arg(long)]
    pub topic: String,

    /// Backend that generates the roadmap.
    #[arg(long, value_enum, default_value_t = ProviderKind::Primary)]
    pub provider: ProviderKind,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List stored roadmaps, most recent first.
    List,
    /// Print a stored roadmap.
    Show(HistoryShowArgs),
    /// Remove every stored roadmap.
    Clear,
}

#[derive(Debug, Args)]
pub struct HistoryShowArgs {
    /// Topic of the stored roadmap (case-insensitive).
    pub topic: String,

    /// Chapter to print in detail (default: the first chapter).
    #[arg(long)]
    pub chapter: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ChapterCommand {
    /// Flip a chapter's completion.
    Toggle(ChapterTargetArgs),
}

#[derive(Debug, Args)]
pub struct ChapterTargetArgs {
    /// Topic of the stored roadmap (case-insensitive).
    #[arg(long)]
    pub topic: String,

    /// Chapter id, e.g. `chapter-1`.
    #[arg(long)]
    pub chapter: String,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// Flip a resource's completion.
    ToggleComplete(ResourceTargetArgs),
    /// Flip whether a resource was helpful.
    ToggleHelpful(ResourceTargetArgs),
}

#[derive(Debug, Args)]
pub struct ResourceTargetArgs {
    /// Topic of the stored roadmap (case-insensitive).
    #[arg(long)]
    pub topic: String,

    /// Chapter id that owns the resource.
    #[arg(long)]
    pub chapter: String,

    /// Resource url as stored in the roadmap.
    #[arg(long)]
    pub url: String,
}
