use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use roadmap_builder::cli::{ChapterCommand, Cli, Command, HistoryCommand, ResourceCommand};
use roadmap_builder::commands::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    roadmap_builder::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = roadmap_builder::config::AppConfig::from_env().context("load config")?;
    let mut session = Session::open(&cli, &config).await.context("open session")?;

    let output = match cli.command {
        Command::Generate(args) => commands::generate(&mut session, args)
            .await
            .context("generate")?,
        Command::History {
            command: HistoryCommand::List,
        } => commands::history_list(&session).context("history list")?,
        Command::History {
            command: HistoryCommand::Show(args),
        } => commands::history_show(&mut session, args).context("history show")?,
        Command::History {
            command: HistoryCommand::Clear,
        } => commands::history_clear(&mut session)
            .await
            .context("history clear")?,
        Command::Chapter {
            command: ChapterCommand::Toggle(args),
        } => commands::toggle_chapter(&mut session, args)
            .await
            .context("chapter toggle")?,
        Command::Resource {
            command: ResourceCommand::ToggleComplete(args),
        } => commands::toggle_resource_complete(&mut session, args)
            .await
            .context("resource toggle-complete")?,
        Command::Resource {
            command: ResourceCommand::ToggleHelpful(args),
        } => commands::toggle_resource_helpful(&mut session, args)
            .await
            .context("resource toggle-helpful")?,
    };

    print!("{output}");
    Ok(())
}
