use anyhow::{Context, Result};
use eventdesk_core::event::EventId;
use eventdesk_core::feature::{FeatureCategory, FeatureFlags, features_in};
use eventdesk_core::store::TableStore;
use owo_colors::OwoColorize;

use crate::utils::tui::create_spinner;

pub async fn run<S: TableStore + Sync>(store: &S, event: &str) -> Result<()> {
    let event_id: EventId = event.parse()?;

    let spinner = create_spinner(format!("Loading features for event {event_id}"));
    let result = FeatureFlags::new(store).load(event_id).await;
    spinner.finish_and_clear();

    let active = result.with_context(|| format!("Could not load features for event {event_id}"))?;

    for category in FeatureCategory::ALL {
        println!("{}", category.title().bold());

        let mut any = false;
        for feature in features_in(category) {
            any = true;
            let status = if active.get(&feature.id).copied().unwrap_or(false) {
                "on".green().to_string()
            } else {
                "off".dimmed().to_string()
            };
            println!("  {} {} {}", status, feature.name, format!("({})", feature.key).dimmed());
            println!("      {}", feature.description.dimmed());
        }
        if !any {
            println!("  {}", "Coming soon".dimmed());
        }
    }

    Ok(())
}
