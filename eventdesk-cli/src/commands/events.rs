use anyhow::{Context, Result};
use chrono::Local;
use eventdesk_core::event::{EventRegistry, categorize};
use eventdesk_core::store::TableStore;

use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run<S: TableStore + Sync>(store: &S, host_id: i64) -> Result<()> {
    let spinner = create_spinner(format!("Loading events for host {host_id}"));
    let result = EventRegistry::new(store).list_for_host(host_id).await;
    spinner.finish_and_clear();

    let events = result.with_context(|| format!("Could not load events for host {host_id}"))?;
    let categorized = categorize(events, Local::now().naive_local());

    println!("{}", categorized.render());

    Ok(())
}
