use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Article,
    Documentation,
    Book,
    Interactive,
}

impl ResourceKind {
    /// Case-insensitive match against the names the generation schema allows.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "video" => Some(Self::Video),
            "article" => Some(Self::Article),
            "documentation" => Some(Self::Documentation),
            "book" => Some(Self::Book),
            "interactive" => Some(Self::Interactive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Documentation => "documentation",
            Self::Book => "book",
            Self::Interactive => "interactive",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    /// Identity key within the owning chapter.
    pub url: String,
    pub is_completed: bool,
    pub is_helpful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub description: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub description: String,
    pub learning_objectives: Vec<String>,
    pub key_concepts: Vec<String>,
    pub resources: Vec<Resource>,
    pub exercises: Vec<Exercise>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub topic: String,
    pub chapters: Vec<Chapter>,
}

/// How toggling a chapter's completion treats the resources inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ChapterToggleMode {
    /// Every resource in the chapter follows the chapter's new state.
    #[default]
    Cascade,
    /// Only the chapter flag flips.
    ChapterOnly,
}

impl ChapterToggleMode {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "cascade" => Ok(Self::Cascade),
            "chapter-only" | "chapter_only" => Ok(Self::ChapterOnly),
            other => anyhow::bail!("unsupported chapter toggle mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFlag {
    Completed,
    Helpful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

impl Roadmap {
    /// Matches the key history deduplicates on.
    pub fn same_topic(&self, topic: &str) -> bool {
        self.topic.to_lowercase() == topic.to_lowercase()
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn first_chapter_id(&self) -> Option<&str> {
        self.chapters.first().map(|c| c.id.as_str())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.chapters.iter().filter(|c| c.is_completed).count(),
            total: self.chapters.len(),
        }
    }

    /// Returns a copy with the chapter's completion flipped, or `None` when no
    /// chapter has `chapter_id`. `self` is left untouched.
    pub fn with_chapter_toggled(&self, chapter_id: &str, mode: ChapterToggleMode) -> Option<Self> {
        let idx = self.chapters.iter().position(|c| c.id == chapter_id)?;

        let mut next = self.clone();
        let chapter = &mut next.chapters[idx];
        chapter.is_completed = !chapter.is_completed;
        if mode == ChapterToggleMode::Cascade {
            let completed = chapter.is_completed;
            for resource in &mut chapter.resources {
                resource.is_completed = completed;
            }
        }
        Some(next)
    }

    /// Returns a copy with one resource flag flipped, or `None` when the
    /// chapter or the resource url does not exist.
    pub fn with_resource_toggled(
        &self,
        chapter_id: &str,
        resource_url: &str,
        flag: ResourceFlag,
    ) -> Option<Self> {
        let ch_idx = self.chapters.iter().position(|c| c.id == chapter_id)?;
        let res_idx = self.chapters[ch_idx]
            .resources
            .iter()
            .position(|r| r.url == resource_url)?;

        let mut next = self.clone();
        let resource = &mut next.chapters[ch_idx].resources[res_idx];
        match flag {
            ResourceFlag::Completed => resource.is_completed = !resource.is_completed,
            ResourceFlag::Helpful => resource.is_helpful = !resource.is_helpful,
        }
        Some(next)
    }
}
