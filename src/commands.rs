use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{ChapterTargetArgs, Cli, GenerateArgs, HistoryShowArgs, ResourceTargetArgs};
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::history::{HistoryStore, LocalFsBackend};
use crate::model::ChapterToggleMode;
use crate::provider::ProviderSet;
use crate::summary;

/// Everything a command needs, built once per process.
pub struct Session {
    pub providers: ProviderSet,
    pub history: HistoryStore,
    pub toggle_mode: ChapterToggleMode,
}

impl Session {
    pub async fn open(cli: &Cli, config: &AppConfig) -> anyhow::Result<Self> {
        let data_dir = config
            .resolve_data_dir(cli.data_dir.clone())
            .context("resolve data dir")?;
        let providers = ProviderSet::from_config(config).context("build providers")?;
        let history = HistoryStore::open(Arc::new(LocalFsBackend::new(&data_dir))).await;
        let toggle_mode = cli.chapter_toggle.unwrap_or(config.chapter_toggle);

        tracing::debug!(
            data_dir = %data_dir.display(),
            history = history.len(),
            ?toggle_mode,
            "session opened"
        );

        Ok(Self {
            providers,
            history,
            toggle_mode,
        })
    }

    fn controller(&mut self) -> Controller<'_> {
        Controller::new(self.providers.clone(), &mut self.history, self.toggle_mode)
    }
}

pub async fn generate(session: &mut Session, args: GenerateArgs) -> anyhow::Result<String> {
    let mut ctl = session.controller();
    ctl.generate(&args.topic, args.provider).await?;

    let roadmap = ctl
        .current_roadmap()
        .context("controller has no roadmap after generation")?;
    summary::roadmap_overview(roadmap, ctl.selected_chapter_id())
}

pub fn history_list(session: &Session) -> anyhow::Result<String> {
    summary::history_listing(session.history.entries())
}

pub fn history_show(session: &mut Session, args: HistoryShowArgs) -> anyhow::Result<String> {
    let mut ctl = session.controller();
    load_topic(&mut ctl, &args.topic)?;
    if let Some(chapter) = args.chapter {
        ctl.select_chapter(chapter);
    }

    let roadmap = ctl
        .current_roadmap()
        .context("controller has no roadmap after load")?;
    summary::roadmap_overview(roadmap, ctl.selected_chapter_id())
}

pub async fn history_clear(session: &mut Session) -> anyhow::Result<String> {
    let removed = session.history.len();
    session
        .history
        .clear_history()
        .await
        .context("clear history")?;
    tracing::info!(removed, "history cleared");
    Ok(format!("removed {removed} roadmap(s) from history\n"))
}

pub async fn toggle_chapter(
    session: &mut Session,
    args: ChapterTargetArgs,
) -> anyhow::Result<String> {
    let mut ctl = session.controller();
    load_topic(&mut ctl, &args.topic)?;

    if !ctl.toggle_chapter_complete(&args.chapter).await {
        anyhow::bail!("chapter not found in {:?}: {}", args.topic, args.chapter);
    }
    ctl.select_chapter(args.chapter);
    overview(&ctl)
}

pub async fn toggle_resource_complete(
    session: &mut Session,
    args: ResourceTargetArgs,
) -> anyhow::Result<String> {
    let mut ctl = session.controller();
    load_topic(&mut ctl, &args.topic)?;

    if !ctl.toggle_resource_complete(&args.chapter, &args.url).await {
        anyhow::bail!(
            "resource not found in {:?} chapter {}: {}",
            args.topic,
            args.chapter,
            args.url
        );
    }
    ctl.select_chapter(args.chapter);
    overview(&ctl)
}

pub async fn toggle_resource_helpful(
    session: &mut Session,
    args: ResourceTargetArgs,
) -> anyhow::Result<String> {
    let mut ctl = session.controller();
    load_topic(&mut ctl, &args.topic)?;

    if !ctl.toggle_resource_helpful(&args.chapter, &args.url).await {
        anyhow::bail!(
            "resource not found in {:?} chapter {}: {}",
            args.topic,
            args.chapter,
            args.url
        );
    }
    ctl.select_chapter(args.chapter);
    overview(&ctl)
}

fn load_topic(ctl: &mut Controller<'_>, topic: &str) -> anyhow::Result<()> {
    if !ctl.load_topic_from_history(topic) {
        anyhow::bail!("no roadmap in history for topic: {topic}");
    }
    Ok(())
}

fn overview(ctl: &Controller<'_>) -> anyhow::Result<String> {
    let roadmap = ctl.current_roadmap().context("no current roadmap")?;
    summary::roadmap_overview(roadmap, ctl.selected_chapter_id())
}
