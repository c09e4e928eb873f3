use anyhow::Context as _;

/// Filter used when `RUST_LOG` is unset: this crate at `info`, HTTP and
/// runtime dependencies only at `warn`.
pub const DEFAULT_FILTER: &str = "warn,roadmap_builder=info";

/// Logs go to stderr so stdout stays the command's output.
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;
    let directives = filter.to_string();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    tracing::debug!(filter = %directives, "logging initialized");
    Ok(())
}
