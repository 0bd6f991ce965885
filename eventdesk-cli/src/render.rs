//! TUI rendering traits for eventdesk types.
//!
//! Extension traits that add colored terminal rendering to eventdesk-core
//! types using owo_colors.

use eventdesk_core::event::{CategorizedEvents, Event};
use eventdesk_core::form::{FormSchema, Question, SaveReport};
use eventdesk_core::session::LoadOutcome;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Event {
    fn render(&self) -> String {
        let id = match &self.public_id {
            Some(id) => format!("#{id}"),
            None => "#?".to_string(),
        };
        let when = match (self.start(), self.end()) {
            (Some(start), Some(end)) if start.date() == end.date() => format!(
                "{} {}-{}",
                start.format("%a %b %-d"),
                start.format("%H:%M"),
                end.format("%H:%M")
            ),
            (Some(start), Some(end)) => {
                format!("{} - {}", start.format("%b %-d %H:%M"), end.format("%b %-d %H:%M"))
            }
            _ => "dates unknown".to_string(),
        };
        let hidden = if self.is_visible { "" } else { " (hidden)" };

        format!(
            "{} {}{} {}",
            id.dimmed(),
            self.name.bold(),
            hidden.dimmed(),
            format!("{when} @ {}", self.location_name).dimmed()
        )
    }
}

impl Render for CategorizedEvents {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        let sections = [
            ("Happening now", &self.current),
            ("Upcoming", &self.upcoming),
            ("Past", &self.past),
        ];
        for (title, events) in sections {
            if events.is_empty() {
                continue;
            }
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("{} {}", title.bold(), format!("({})", events.len()).dimmed()));
            lines.extend(events.iter().map(|e| format!("  {}", e.render())));
        }

        if lines.is_empty() {
            lines.push("No events found".dimmed().to_string());
        }

        let total = self.current.len() + self.upcoming.len() + self.past.len();
        lines.push(String::new());
        lines.push(format!(
            "{} {}, {} now, {} upcoming, {} past",
            total,
            pluralize("event", total),
            self.current.len(),
            self.upcoming.len(),
            self.past.len()
        ));
        if self.skipped > 0 {
            lines.push(
                format!("{} skipped (unreadable dates)", self.skipped)
                    .yellow()
                    .to_string(),
            );
        }

        lines.join("\n")
    }
}

impl Render for Question {
    fn render(&self) -> String {
        let title = format!("Question {}", self.rank() + 1);
        let title = if self.required {
            format!("{} {}", title.bold(), "*".red())
        } else {
            title.bold().to_string()
        };
        let label = if self.label.trim().is_empty() {
            "(no label)".dimmed().to_string()
        } else {
            self.label.clone()
        };

        let mut lines = vec![format!(
            "{title}  {label} {}",
            format!("[{}]", self.data_type).dimmed()
        )];

        if self.data_type.is_choice() {
            if self.options.is_empty() {
                lines.push(format!("     {}", "no options yet".yellow()));
            }
            for (i, option) in self.options.iter().enumerate() {
                lines.push(format!("     {} {}", format!("{}.", i + 1).dimmed(), option));
            }
        }

        lines.join("\n")
    }
}

impl Render for FormSchema {
    fn render(&self) -> String {
        if self.is_empty() {
            return "   No questions yet".dimmed().to_string();
        }
        self.iter()
            .map(|q| format!("   {}", q.render()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Render for SaveReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        let summary = format!(
            "Saved {} {} for event {}",
            self.created,
            pluralize("question", self.created),
            self.event_id
        );
        if self.is_clean() {
            lines.push(summary.green().to_string());
        } else {
            lines.push(summary.yellow().to_string());
        }

        for failure in &self.failures {
            lines.push(format!(
                "   {} {}: {}",
                "x".red(),
                failure.label,
                failure.error.dimmed()
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("   {} {}", "!".yellow(), warning));
        }

        lines.join("\n")
    }
}

impl Render for LoadOutcome {
    fn render(&self) -> String {
        match self {
            LoadOutcome::AlreadyLoaded => String::new(),
            LoadOutcome::Loaded { questions: 0 } => {
                "No form yet, starting from scratch".dimmed().to_string()
            }
            LoadOutcome::Loaded { questions } => format!(
                "Loaded {} {}",
                questions,
                pluralize("question", *questions)
            )
            .dimmed()
            .to_string(),
            LoadOutcome::Degraded { warning } => {
                format!("{warning}. Starting from an empty form.").yellow().to_string()
            }
        }
    }
}

/// Simple pluralization helper
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
