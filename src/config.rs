use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

use crate::model::ChapterToggleMode;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemma-2-27b-it";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub referer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub openrouter: OpenRouterConfig,
    pub http_timeout: Duration,
    pub chapter_toggle: ChapterToggleMode,
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |name: &str| {
            var(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let gemini = GeminiConfig {
            api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            base_url: base_url(
                "ROADMAP_GEMINI_BASE_URL",
                non_empty("ROADMAP_GEMINI_BASE_URL"),
                DEFAULT_GEMINI_BASE_URL,
            )?,
            model: non_empty("ROADMAP_GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_owned()),
        };

        let openrouter = OpenRouterConfig {
            api_key: non_empty("OPENROUTER_API_KEY"),
            base_url: base_url(
                "ROADMAP_OPENROUTER_BASE_URL",
                non_empty("ROADMAP_OPENROUTER_BASE_URL"),
                DEFAULT_OPENROUTER_BASE_URL,
            )?,
            model: non_empty("ROADMAP_OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_owned()),
            referer: non_empty("ROADMAP_OPENROUTER_REFERER"),
        };

        let http_timeout = match non_empty("ROADMAP_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().with_context(|| {
                    format!("invalid ROADMAP_HTTP_TIMEOUT_SECS={raw:?}. expected whole seconds")
                })?;
                if secs == 0 {
                    anyhow::bail!("ROADMAP_HTTP_TIMEOUT_SECS must be > 0");
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let chapter_toggle = match non_empty("ROADMAP_CHAPTER_TOGGLE") {
            Some(raw) => ChapterToggleMode::parse(&raw).with_context(|| {
                format!(
                    "invalid ROADMAP_CHAPTER_TOGGLE={raw:?}. expected one of: cascade, chapter-only"
                )
            })?,
            None => ChapterToggleMode::default(),
        };

        Ok(Self {
            gemini,
            openrouter,
            http_timeout,
            chapter_toggle,
            data_dir: non_empty("ROADMAP_DATA_DIR").map(PathBuf::from),
        })
    }

    /// `--data-dir` wins over `ROADMAP_DATA_DIR`, which wins over the platform data dir.
    pub fn resolve_data_dir(&self, flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        if let Some(dir) = flag.or_else(|| self.data_dir.clone()) {
            return Ok(dir);
        }
        let base = dirs::data_dir().context("no platform data directory; pass --data-dir")?;
        Ok(base.join("roadmap-builder"))
    }
}

fn base_url(name: &str, raw: Option<String>, default: &str) -> anyhow::Result<String> {
    let Some(raw) = raw else {
        return Ok(default.to_owned());
    };
    let parsed = url::Url::parse(&raw).with_context(|| format!("invalid {name}={raw:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{name} must be http/https: {raw}");
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        AppConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_env() -> anyhow::Result<()> {
        let config = config(&[])?;
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.openrouter.model, DEFAULT_OPENROUTER_MODEL);
        assert_eq!(config.http_timeout, Duration::from_secs(300));
        assert_eq!(config.chapter_toggle, ChapterToggleMode::Cascade);
        assert!(config.data_dir.is_none());
        Ok(())
    }

    #[test]
    fn gemini_key_falls_back_to_api_key() -> anyhow::Result<()> {
        let legacy = config(&[("API_KEY", "legacy")])?;
        assert_eq!(legacy.gemini.api_key.as_deref(), Some("legacy"));

        let both = config(&[("API_KEY", "legacy"), ("GEMINI_API_KEY", "preferred")])?;
        assert_eq!(both.gemini.api_key.as_deref(), Some("preferred"));
        Ok(())
    }

    #[test]
    fn blank_values_are_ignored() -> anyhow::Result<()> {
        let config = config(&[("OPENROUTER_API_KEY", "   "), ("ROADMAP_GEMINI_MODEL", "")])?;
        assert_eq!(config.openrouter.api_key, None);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        Ok(())
    }

    #[test]
    fn overrides_are_applied() -> anyhow::Result<()> {
        let config = config(&[
            ("ROADMAP_OPENROUTER_BASE_URL", "http://127.0.0.1:9000/api/v1/"),
            ("ROADMAP_HTTP_TIMEOUT_SECS", "12"),
            ("ROADMAP_CHAPTER_TOGGLE", "chapter-only"),
            ("ROADMAP_DATA_DIR", "/tmp/roadmaps"),
        ])?;
        assert_eq!(config.openrouter.base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(config.http_timeout, Duration::from_secs(12));
        assert_eq!(config.chapter_toggle, ChapterToggleMode::ChapterOnly);
        assert_eq!(
            config.resolve_data_dir(None)?,
            PathBuf::from("/tmp/roadmaps")
        );
        assert_eq!(
            config.resolve_data_dir(Some(PathBuf::from("/elsewhere")))?,
            PathBuf::from("/elsewhere")
        );
        Ok(())
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("ROADMAP_HTTP_TIMEOUT_SECS", "soon")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("ROADMAP_HTTP_TIMEOUT_SECS"));

        let err = config(&[("ROADMAP_GEMINI_BASE_URL", "ftp://example.com")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("ROADMAP_GEMINI_BASE_URL"));

        let err = config(&[("ROADMAP_CHAPTER_TOGGLE", "sometimes")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("ROADMAP_CHAPTER_TOGGLE"));
    }
}
