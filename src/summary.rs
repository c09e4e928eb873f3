use std::fmt::{self, Write as _};

use crate::model::{Chapter, Roadmap};

/// One line per stored roadmap: index, topic, chapter progress.
pub fn history_listing(entries: &[Roadmap]) -> anyhow::Result<String> {
    if entries.is_empty() {
        return Ok("history is empty\n".to_owned());
    }

    let mut out = String::new();
    for (idx, roadmap) in entries.iter().enumerate() {
        let progress = roadmap.progress();
        writeln!(
            out,
            "{}. {} ({}/{} chapters, {}%)",
            idx + 1,
            roadmap.topic,
            progress.completed,
            progress.total,
            progress.percent()
        )?;
    }
    Ok(out)
}

/// Chapter list with completion marks, then the selected chapter in detail.
pub fn roadmap_overview(
    roadmap: &Roadmap,
    selected_chapter_id: Option<&str>,
) -> anyhow::Result<String> {
    let progress = roadmap.progress();
    let mut out = String::new();
    writeln!(
        out,
        "{} ({}/{} chapters, {}%)",
        roadmap.topic,
        progress.completed,
        progress.total,
        progress.percent()
    )?;

    for (idx, chapter) in roadmap.chapters.iter().enumerate() {
        let pointer = if Some(chapter.id.as_str()) == selected_chapter_id {
            ">"
        } else {
            " "
        };
        writeln!(
            out,
            "{pointer} [{}] {}. {} ({})",
            mark(chapter.is_completed),
            idx + 1,
            chapter.title,
            chapter.id
        )?;
    }

    if let Some(id) = selected_chapter_id {
        match roadmap.chapter(id) {
            Some(chapter) => {
                out.push('\n');
                write_chapter(&mut out, chapter)?;
            }
            None => {
                writeln!(out, "\nno chapter selected")?;
            }
        }
    }
    Ok(out)
}

fn write_chapter(out: &mut String, chapter: &Chapter) -> fmt::Result {
    writeln!(out, "## {}", chapter.title)?;
    writeln!(out, "{}", chapter.description)?;

    if !chapter.learning_objectives.is_empty() {
        writeln!(out, "\nLearning objectives:")?;
        for objective in &chapter.learning_objectives {
            writeln!(out, "- {objective}")?;
        }
    }
    if !chapter.key_concepts.is_empty() {
        writeln!(out, "\nKey concepts: {}", chapter.key_concepts.join(", "))?;
    }
    if !chapter.resources.is_empty() {
        writeln!(out, "\nResources:")?;
        for resource in &chapter.resources {
            let helpful = if resource.is_helpful { " (helpful)" } else { "" };
            writeln!(
                out,
                "- [{}] {}: {} <{}>{helpful}",
                mark(resource.is_completed),
                resource.kind.as_str(),
                resource.title,
                resource.url
            )?;
        }
    }
    if !chapter.exercises.is_empty() {
        writeln!(out, "\nExercises:")?;
        for exercise in &chapter.exercises {
            writeln!(
                out,
                "- ({}) {}",
                exercise.difficulty.as_str(),
                exercise.description
            )?;
        }
    }
    Ok(())
}

fn mark(done: bool) -> char {
    if done { 'x' } else { ' ' }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::roadmap;

    #[test]
    fn listing_shows_progress() -> anyhow::Result<()> {
        let mut done = roadmap("Rust");
        done.chapters[0].is_completed = true;
        let listing = history_listing(&[done, roadmap("Go")])?;
        assert_eq!(
            listing,
            "1. Rust (1/3 chapters, 33%)\n2. Go (0/3 chapters, 0%)\n"
        );
        assert_eq!(history_listing(&[])?, "history is empty\n");
        Ok(())
    }

    #[test]
    fn overview_details_selected_chapter() -> anyhow::Result<()> {
        let mut map = roadmap("Rust");
        map.chapters[0].resources[1].is_helpful = true;
        let text = roadmap_overview(&map, Some("chapter-1"))?;

        assert!(text.starts_with("Rust (0/3 chapters, 0%)\n"));
        assert!(text.contains("> [ ] 1. Chapter chapter-1 (chapter-1)"));
        assert!(text.contains("## Chapter chapter-1"));
        assert!(text.contains(
            "- [ ] article: Read https://a.example/2 <https://a.example/2> (helpful)"
        ));
        assert!(text.contains("- (easy) Practice"));
        Ok(())
    }

    #[test]
    fn overview_reports_unknown_selection() -> anyhow::Result<()> {
        let text = roadmap_overview(&roadmap("Rust"), Some("nope"))?;
        assert!(text.ends_with("\nno chapter selected\n"));
        assert!(!text.contains("##"));
        Ok(())
    }
}
