use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Args;
use dialoguer::{Confirm, Input, Select};
use eventdesk_core::EventDeskError;
use eventdesk_core::event::{EVENT_TYPES, EventRegistry, NewEvent};
use eventdesk_core::store::TableStore;
use owo_colors::OwoColorize;

use crate::utils::tui::create_spinner;

#[derive(Args, Debug, Default)]
pub struct NewArgs {
    /// Event name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// One of the event categories (case-insensitive)
    #[arg(long = "type")]
    pub event_type: Option<String>,

    /// Host creating the event (defaults to default_host_id from config)
    #[arg(long)]
    pub host: Option<i64>,

    /// Venue name
    #[arg(long)]
    pub venue: Option<String>,

    /// Street address of the venue
    #[arg(long)]
    pub address: Option<String>,

    /// Start date/time (e.g., "2025-03-20 15:00")
    #[arg(short, long)]
    pub start: Option<String>,

    /// End date/time (defaults to one hour after the start)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Expected attendance
    #[arg(long)]
    pub capacity: Option<i64>,

    /// Keep the event out of public listings
    #[arg(long)]
    pub hidden: bool,
}

impl NewArgs {
    fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.description.is_some()
            && self.event_type.is_some()
            && self.venue.is_some()
            && self.address.is_some()
            && self.start.is_some()
            && self.capacity.is_some()
    }
}

pub async fn run<S: TableStore + Sync>(store: &S, args: NewArgs, default_host_id: i64) -> Result<()> {
    let interactive = !args.is_complete();

    let name = text_or_prompt(args.name, "  Name")?;
    let description = text_or_prompt(args.description, "  Description")?;

    let event_type = match args.event_type {
        Some(t) => resolve_event_type(&t)?.to_string(),
        None => {
            let selection = Select::new()
                .with_prompt("  Type")
                .items(&EVENT_TYPES)
                .default(0)
                .interact()?;
            EVENT_TYPES[selection].to_string()
        }
    };

    let location_name = text_or_prompt(args.venue, "  Venue")?;
    let detailed_address = text_or_prompt(args.address, "  Address")?;

    let start = match args.start {
        Some(s) => parse_datetime(&s)?,
        None => prompt_with_retry("  Starts (YYYY-MM-DD HH:MM)", parse_datetime)?,
    };

    let end = match args.end {
        Some(e) => parse_datetime(&e)?,
        None if interactive => prompt_end(start)?,
        None => default_end(start),
    };

    let capacity = match args.capacity {
        Some(c) => c,
        None => Input::<i64>::new()
            .with_prompt("  Expected attendance")
            .interact_text()?,
    };

    let is_visible = if args.hidden {
        false
    } else if interactive {
        Confirm::new()
            .with_prompt("  Visible to the public?")
            .default(true)
            .interact()?
    } else {
        true
    };

    let event = NewEvent {
        name,
        description,
        event_type,
        host_id: args.host.unwrap_or(default_host_id),
        location_name,
        detailed_address,
        start,
        end,
        capacity,
        is_visible,
    };

    if let Err(EventDeskError::Validation(issues)) = event.validate() {
        for issue in &issues {
            eprintln!("  {}", issue.red());
        }
        anyhow::bail!("Event not created");
    }

    let spinner = create_spinner(format!("Creating {}", event.name));
    let result = EventRegistry::new(store).create(&event).await;
    spinner.finish_and_clear();

    let event_id = result.context("Could not create the event")?;

    if interactive {
        println!();
    }
    println!("{}", format!("  Created: {} (event #{event_id})", event.name).green());

    Ok(())
}

fn text_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Prompt the user with retry on parse errors.
fn prompt_with_retry<F>(prompt: &str, parse: F) -> Result<NaiveDateTime>
where
    F: Fn(&str) -> Result<NaiveDateTime>,
{
    loop {
        let input: String = Input::new().with_prompt(prompt).interact_text()?;
        match parse(&input) {
            Ok(result) => return Ok(result),
            Err(e) => {
                eprintln!("  {}", e.to_string().red());
            }
        }
    }
}

fn prompt_end(start: NaiveDateTime) -> Result<NaiveDateTime> {
    loop {
        let input: String = Input::new()
            .with_prompt("  Ends (1 hour later)")
            .default(String::new())
            .show_default(false)
            .interact_text()?;
        if input.trim().is_empty() {
            return Ok(default_end(start));
        }
        match parse_datetime(&input) {
            Ok(end) => return Ok(end),
            Err(e) => {
                eprintln!("  {}", e.to_string().red());
            }
        }
    }
}

fn default_end(start: NaiveDateTime) -> NaiveDateTime {
    start + Duration::hours(1)
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]`, the same with a `T` separator, or a
/// bare date (midnight).
fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();

    let timed = [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok());

    timed
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))
}

fn resolve_event_type(input: &str) -> Result<&'static str> {
    let wanted = input.trim().to_lowercase();
    EVENT_TYPES
        .iter()
        .copied()
        .find(|t| t.to_lowercase() == wanted)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown event type '{}'. Available:\n  {}",
                input,
                EVENT_TYPES.join("\n  ")
            )
        })
}
