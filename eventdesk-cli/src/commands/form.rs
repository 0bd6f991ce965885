use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};
use eventdesk_core::EventDeskError;
use eventdesk_core::form::codec::{decode_type, type_code};
use eventdesk_core::form::{DataType, FormSchema, QuestionId, SchemaSynchronizer};
use eventdesk_core::session::{EditingSession, SessionState};
use eventdesk_core::store::TableStore;
use owo_colors::OwoColorize;
use serde::Deserialize;

use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn show<S: TableStore + Sync>(store: &S, event: &str) -> Result<()> {
    let spinner = create_spinner(format!("Loading form for event {event}"));
    let result = SchemaSynchronizer::new(store).load(event).await;
    spinner.finish_and_clear();

    let schema = result.with_context(|| format!("Could not load the form for event {event}"))?;

    println!("{}", format!("Registration form for event {event}").bold());
    println!("{}", schema.render());

    Ok(())
}

pub async fn apply<S: TableStore + Sync>(store: &S, event: &str, file: &Path) -> Result<()> {
    let schema = load_form_file(file)?;

    println!("{}", format!("Registration form for event {event}").bold());
    println!("{}", schema.render());
    println!();

    let spinner = create_spinner(format!("Saving {} questions", schema.len()));
    let result = SchemaSynchronizer::new(store).save(&schema, event).await;
    spinner.finish_and_clear();

    let report = result.with_context(|| format!("Could not save the form for event {event}"))?;
    println!("{}", report.render());

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} questions were not saved",
            report.failures.len(),
            schema.len()
        );
    }

    Ok(())
}

/// A form file: `[[questions]]` tables with `label`, `type` (label or
/// code, default Text), `required` and `options`.
#[derive(Debug, Deserialize)]
struct FormFile {
    #[serde(default)]
    questions: Vec<QuestionSpec>,
}

#[derive(Debug, Deserialize)]
struct QuestionSpec {
    label: String,

    #[serde(rename = "type", default)]
    data_type: Option<String>,

    #[serde(default)]
    required: bool,

    #[serde(default)]
    options: Vec<String>,
}

fn load_form_file(path: &Path) -> Result<FormSchema> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_form(&contents).with_context(|| format!("Invalid form file {}", path.display()))
}

fn parse_form(contents: &str) -> Result<FormSchema> {
    let file: FormFile = toml::from_str(contents)?;

    let mut schema = FormSchema::new();
    for spec in file.questions {
        let data_type = match spec.data_type.as_deref() {
            Some(raw) => resolve_type(raw)?,
            None => DataType::default(),
        };
        schema.push(spec.label, data_type, spec.required, spec.options);
    }
    Ok(schema)
}

/// A type given either by its code (`single_choice`) or its label
/// (`Single choice`).
fn resolve_type(raw: &str) -> Result<DataType, EventDeskError> {
    let raw = raw.trim();
    if let Some(data_type) = DataType::from_code(raw) {
        return Ok(data_type);
    }
    Ok(decode_type(type_code(raw)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Edit,
    Remove,
    MoveUp,
    MoveDown,
    Options,
    Preview,
    Save,
    Reload,
    Quit,
}

impl Action {
    const ALL: [Action; 10] = [
        Action::Add,
        Action::Edit,
        Action::Remove,
        Action::MoveUp,
        Action::MoveDown,
        Action::Options,
        Action::Preview,
        Action::Save,
        Action::Reload,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Action::Add => "Add a question",
            Action::Edit => "Edit a question",
            Action::Remove => "Remove a question",
            Action::MoveUp => "Move a question up",
            Action::MoveDown => "Move a question down",
            Action::Options => "Edit answer options",
            Action::Preview => "Preview",
            Action::Save => "Save",
            Action::Reload => "Discard changes and reload",
            Action::Quit => "Quit",
        };
        write!(f, "{label}")
    }
}

pub async fn edit<S: TableStore + Sync>(store: &S, event: &str) -> Result<()> {
    let sync = SchemaSynchronizer::new(store);
    let mut session = EditingSession::new(event);

    let spinner = create_spinner(format!("Loading form for event {event}"));
    let outcome = session.ensure_loaded(&sync).await;
    spinner.finish_and_clear();

    println!("{}", format!("Registration form for event {event}").bold());
    println!("{}", outcome.render());
    println!("{}", session.schema().render());

    loop {
        println!();
        let selection = Select::new()
            .with_prompt("What next?")
            .items(&Action::ALL)
            .default(0)
            .interact()?;

        match Action::ALL[selection] {
            Action::Add => {
                let id = session.schema_mut().add_question();
                edit_question(session.schema_mut(), id)?;
            }
            Action::Edit => {
                if let Some(id) = pick_question(session.schema(), "Which question?")? {
                    edit_question(session.schema_mut(), id)?;
                }
            }
            Action::Remove => {
                if let Some(id) = pick_question(session.schema(), "Remove which question?")? {
                    let confirmed = Confirm::new()
                        .with_prompt("Remove this question?")
                        .default(false)
                        .interact()?;
                    if confirmed {
                        session.schema_mut().remove_question(id);
                    }
                }
            }
            Action::MoveUp => {
                if let Some(index) = pick_index(session.schema(), "Move which question up?")? {
                    session.schema_mut().move_up(index);
                }
            }
            Action::MoveDown => {
                if let Some(index) = pick_index(session.schema(), "Move which question down?")? {
                    session.schema_mut().move_down(index);
                }
            }
            Action::Options => {
                if let Some(id) = pick_question(session.schema(), "Options of which question?")? {
                    if session.schema().get(id).is_some_and(|q| q.data_type.is_choice()) {
                        edit_options(session.schema_mut(), id)?;
                    } else {
                        println!("{}", "Only choice questions have answer options".dimmed());
                    }
                }
            }
            Action::Preview => {
                println!("{}", session.schema().render());
            }
            Action::Save => {
                let spinner = create_spinner("Saving form");
                let result = session.save(&sync).await;
                spinner.finish_and_clear();

                match result {
                    Ok(report) => println!("{}", report.render()),
                    Err(e) => eprintln!("{}", e.to_string().red()),
                }
            }
            Action::Reload => {
                if session.state() == SessionState::Editing && !confirm_discard()? {
                    continue;
                }
                let spinner = create_spinner("Reloading form");
                let outcome = session.reload(&sync).await;
                spinner.finish_and_clear();

                println!("{}", outcome.render());
                println!("{}", session.schema().render());
            }
            Action::Quit => {
                if session.state() == SessionState::Editing && !confirm_discard()? {
                    continue;
                }
                break;
            }
        }
    }

    Ok(())
}

fn confirm_discard() -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt("Discard unsaved changes?")
        .default(false)
        .interact()?)
}

fn question_items(schema: &FormSchema) -> Vec<String> {
    schema
        .iter()
        .map(|q| {
            let label = if q.label.trim().is_empty() { "(no label)" } else { &q.label };
            format!("{}. {} [{}]", q.rank() + 1, label, q.data_type)
        })
        .collect()
}

fn pick_index(schema: &FormSchema, prompt: &str) -> Result<Option<usize>> {
    if schema.is_empty() {
        println!("{}", "No questions yet".dimmed());
        return Ok(None);
    }
    Ok(Select::new()
        .with_prompt(prompt)
        .items(&question_items(schema))
        .default(0)
        .interact_opt()?)
}

fn pick_question(schema: &FormSchema, prompt: &str) -> Result<Option<QuestionId>> {
    Ok(pick_index(schema, prompt)?.map(|index| schema.questions()[index].id()))
}

fn edit_question(schema: &mut FormSchema, id: QuestionId) -> Result<()> {
    let Some(question) = schema.question_mut(id) else {
        return Ok(());
    };

    question.label = Input::<String>::new()
        .with_prompt("  Label")
        .with_initial_text(question.label.clone())
        .interact_text()?;

    let labels: Vec<&str> = DataType::ALL.iter().map(|t| t.label()).collect();
    let current = DataType::ALL
        .iter()
        .position(|t| *t == question.data_type)
        .unwrap_or(0);
    let selection = Select::new()
        .with_prompt("  Type")
        .items(&labels)
        .default(current)
        .interact()?;
    question.data_type = DataType::ALL[selection];

    question.required = Confirm::new()
        .with_prompt("  Required?")
        .default(question.required)
        .interact()?;

    let needs_options = question.data_type.is_choice() && question.options.is_empty();
    if needs_options {
        edit_options(schema, id)?;
    }

    Ok(())
}

fn edit_options(schema: &mut FormSchema, id: QuestionId) -> Result<()> {
    const ADD: usize = 0;
    const RENAME: usize = 1;
    const REMOVE: usize = 2;

    loop {
        let Some(question) = schema.get(id) else {
            return Ok(());
        };
        println!("{}", question.render());

        let selection = Select::new()
            .with_prompt("  Options")
            .items(&["Add option", "Rename option", "Remove option", "Done"])
            .default(ADD)
            .interact()?;

        match selection {
            ADD => {
                let text: String = Input::new().with_prompt("    Option").interact_text()?;
                schema.add_option(id);
                let last = schema.get(id).map_or(0, |q| q.options.len().saturating_sub(1));
                schema.set_option(id, last, text)?;
            }
            RENAME | REMOVE => {
                let options = schema.get(id).map(|q| q.options.clone()).unwrap_or_default();
                if options.is_empty() {
                    println!("{}", "    No options yet".dimmed());
                    continue;
                }
                let Some(index) = Select::new()
                    .with_prompt("    Which option?")
                    .items(&options)
                    .default(0)
                    .interact_opt()?
                else {
                    continue;
                };

                if selection == RENAME {
                    let text: String = Input::new()
                        .with_prompt("    Option")
                        .with_initial_text(options[index].clone())
                        .interact_text()?;
                    schema.set_option(id, index, text)?;
                } else {
                    schema.remove_option(id, index)?;
                }
            }
            _ => return Ok(()),
        }
    }
}
