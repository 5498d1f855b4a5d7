//! registrant-grid - group placement and wait list listings from the command line.
//!
//! Reads a registration snapshot, applies the stored filters of the chosen
//! view, and prints one page of enriched rows. `place` writes new group
//! memberships back to the snapshot.

mod args;
mod config;
mod output;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use registrant_grid_core::filter::attribute::{parse_stored_values, to_stored_values};
use registrant_grid_core::filter::bar::CREATED_RANGE_KEY;
use registrant_grid_core::filter::strategy::strategy_for_key;
use registrant_grid_core::filter::{DateRange, DefaultAttributeFilter, FilterBar, FilterKey};
use registrant_grid_core::models::PersonField;
use registrant_grid_core::{
    place_in_groups, FieldCatalog, GridError, GridRequest, JsonPreferenceStore, PlacementOptions,
    PlacementSelections, RegistrantGrid, RegistrationData, Snapshot, ViewKind, ViewProfile,
};

use args::{Command, ListArgs, USAGE};
use config::Config;

// ============================================================================
// Constants
// ============================================================================

/// Log file name prefix inside `log_dir`
const LOG_FILE: &str = "registrant-grid.log";

/// Line break used inside placement failure messages
const MESSAGE_BREAK: &str = "<br />";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and also to a daily file when `log_dir` is set. The
/// returned guard must live until exit so the file writer flushes.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = args::parse(&argv)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let _guard = init_tracing(config.log_dir.as_deref());
    info!("registrant-grid starting");

    let snapshot_path = config.snapshot_path()?;
    match command {
        Command::List(list) => run_list(&config, &snapshot_path, &list),
        Command::ApplyFilter {
            view,
            instance_id,
            values,
        } => run_apply_filter(&config, &snapshot_path, view, instance_id, &values),
        Command::ClearFilter { view, instance_id } => {
            run_clear_filter(&config, &snapshot_path, view, instance_id)
        }
        Command::Place {
            selections,
            copy_attributes,
        } => run_place(&snapshot_path, &selections, copy_attributes),
        Command::Help => Ok(()),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_list(config: &Config, snapshot_path: &Path, list: &ListArgs) -> Result<()> {
    let data = Snapshot::load(snapshot_path)?;
    let prefs = JsonPreferenceStore::open(&config.cache_dir()?)?;
    let profile = ViewProfile::for_kind(list.view);
    let grid = RegistrantGrid::new(&data, profile)
        .with_graduation(config.graduation())
        .with_group_url_template(config.group_url_template());

    let catalog = grid.catalog(list.instance_id)?;
    let bar = profile.filter_bar(template_id(&data, list.instance_id)?);
    let filters = bar.load(&prefs, &catalog);

    let as_of = list.as_of.unwrap_or_else(|| Local::now().date_naive());
    let mut request = GridRequest::new(list.instance_id, as_of);
    request.created_range = filters
        .get(&FilterKey::CreatedRange)
        .map(DateRange::parse)
        .filter(|r| !r.is_empty());
    request.filters = filters;
    request.parent_group_id = list.parent_group_id;
    request.sort = list.sort;
    request.page = list.page - 1;
    request.page_size = config.page_size();
    request.exporting = list.export;

    let page = grid.bind(&request)?;
    let (header, rows) = output::cells(&page, list.view, list.export);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if list.export {
        output::write_csv(&mut out, &header, &rows)?;
        return Ok(());
    }

    let summary = bar.summary(&prefs, &catalog, &data, &DefaultAttributeFilter);
    output::write_summary(&mut out, &summary)?;
    if !summary.is_empty() {
        if let Some(age) = prefs.age_display() {
            output::write_saved_note(&mut out, &age, prefs.path())?;
            writeln!(out)?;
        }
    }
    output::write_table(&mut out, &header, &rows)?;
    writeln!(
        out,
        "\nPage {} of {} ({} registrants)",
        page.page + 1,
        page.page_count(),
        page.total
    )?;
    Ok(())
}

fn run_apply_filter(
    config: &Config,
    snapshot_path: &Path,
    view: ViewKind,
    instance_id: i64,
    inputs: &[(String, String)],
) -> Result<()> {
    let data = Snapshot::load(snapshot_path)?;
    let mut prefs = JsonPreferenceStore::open(&config.cache_dir()?)?;
    let profile = ViewProfile::for_kind(view);
    let grid = RegistrantGrid::new(&data, profile);

    let catalog = grid.catalog(instance_id)?;
    let bar = profile.filter_bar(template_id(&data, instance_id)?);
    let mut values = bar.load(&prefs, &catalog);

    for (name, value) in inputs {
        let (key, value) = filter_input(name, value, &catalog)?;
        values.set(key, value);
    }
    bar.apply(&mut prefs, &catalog, &values)?;

    print_summary(&bar, &prefs, &catalog, &data)
}

fn run_clear_filter(
    config: &Config,
    snapshot_path: &Path,
    view: ViewKind,
    instance_id: i64,
) -> Result<()> {
    let data = Snapshot::load(snapshot_path)?;
    let mut prefs = JsonPreferenceStore::open(&config.cache_dir()?)?;
    let profile = ViewProfile::for_kind(view);
    let catalog = RegistrantGrid::new(&data, profile).catalog(instance_id)?;
    let bar = profile.filter_bar(template_id(&data, instance_id)?);

    let mut values = bar.load(&prefs, &catalog);
    bar.clear(&mut prefs, &mut values)?;
    println!("Filters cleared.");
    Ok(())
}

fn run_place(snapshot_path: &Path, selections: &PlacementSelections, copy_attributes: bool) -> Result<()> {
    let mut data = Snapshot::load(snapshot_path)?;
    let outcome = place_in_groups(&mut data, selections, &PlacementOptions { copy_attributes });

    if !outcome.is_success() {
        bail!("{}", outcome.message.replace(MESSAGE_BREAK, "\n  "));
    }
    if outcome.placed > 0 {
        data.save(snapshot_path)?;
    }
    println!("{}", outcome.message);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn template_id(data: &Snapshot, instance_id: i64) -> Result<i64> {
    Ok(data
        .instance(instance_id)
        .ok_or(GridError::InstanceNotFound(instance_id))?
        .template_id)
}

/// Map a typed `name=value` pair to its filter key and input value.
///
/// Attribute keys win over built-in names. Attribute values that are not a
/// JSON array are taken as a single value.
fn filter_input(name: &str, value: &str, catalog: &FieldCatalog) -> Result<(FilterKey, String)> {
    if catalog.attribute_by_key(name).is_some() {
        let stored = match parse_stored_values(value) {
            Some(_) => value.to_string(),
            None if value.trim().is_empty() => String::new(),
            None => to_stored_values(&[value.to_string()]),
        };
        return Ok((FilterKey::Attribute(name.to_string()), stored));
    }

    if name == CREATED_RANGE_KEY {
        return Ok((FilterKey::CreatedRange, value.to_string()));
    }

    let strategy = strategy_for_key(name)
        .with_context(|| format!("Unknown filter '{}'", name))?;
    let always_shown = matches!(strategy.field, PersonField::FirstName | PersonField::LastName);
    if !always_shown && !catalog.has_builtin(strategy.field) {
        warn!(filter = name, "Filter field not on this template's grid");
        bail!("'{}' is not shown on this registration template's grid", name);
    }
    Ok((FilterKey::Builtin(strategy.field), value.to_string()))
}

fn print_summary(
    bar: &FilterBar,
    prefs: &JsonPreferenceStore,
    catalog: &FieldCatalog,
    data: &Snapshot,
) -> Result<()> {
    let summary = bar.summary(prefs, catalog, data, &DefaultAttributeFilter);
    if summary.is_empty() {
        println!("No filters applied.");
        return Ok(());
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::write_summary(&mut out, &summary)?;
    if let Some(age) = prefs.age_display() {
        output::write_saved_note(&mut out, &age, prefs.path())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrant_grid_core::models::{
        AttributeDefinition, AttributeEntity, AttributeFieldType, FieldSource, FormFieldDefinition,
        RegistrationForm, RegistrationTemplate,
    };
    use registrant_grid_core::build_catalog;

    fn catalog() -> FieldCatalog {
        let data = Snapshot {
            attributes: vec![AttributeDefinition {
                id: 40,
                key: "ShirtSize".into(),
                name: "Shirt Size".into(),
                field_type: AttributeFieldType::Text,
                entity: AttributeEntity::Registrant,
                qualifier_group_id: None,
                default_value: None,
            }],
            ..Default::default()
        };
        let template = RegistrationTemplate {
            id: 1,
            name: "Camp".into(),
            forms: vec![RegistrationForm {
                id: 1,
                name: "Main".into(),
                fields: vec![
                    FormFieldDefinition {
                        id: 1,
                        source: FieldSource::PersonField,
                        person_field: Some(PersonField::Email),
                        attribute_id: None,
                        order: 0,
                        show_on_grid: true,
                    },
                    FormFieldDefinition {
                        id: 2,
                        source: FieldSource::RegistrantAttribute,
                        person_field: None,
                        attribute_id: Some(40),
                        order: 1,
                        show_on_grid: true,
                    },
                ],
            }],
        };
        build_catalog(&template, &data)
    }

    #[test]
    fn test_filter_input_keys() {
        let catalog = catalog();
        assert_eq!(
            filter_input("Email", "jane@", &catalog).unwrap(),
            (FilterKey::Builtin(PersonField::Email), "jane@".to_string())
        );
        assert_eq!(
            filter_input("Last Name", "Doe", &catalog).unwrap().0,
            FilterKey::Builtin(PersonField::LastName)
        );
        assert_eq!(
            filter_input("Date Range", "2024-01-01,", &catalog).unwrap().0,
            FilterKey::CreatedRange
        );
        assert!(filter_input("Grade", "4", &catalog).is_err());
        assert!(filter_input("Nope", "x", &catalog).is_err());
    }

    #[test]
    fn test_attribute_input_wrapped_as_array() {
        let catalog = catalog();
        let (key, value) = filter_input("ShirtSize", "Large", &catalog).unwrap();
        assert_eq!(key, FilterKey::Attribute("ShirtSize".into()));
        assert_eq!(value, r#"["Large"]"#);

        let (_, value) = filter_input("ShirtSize", r#"["S","M"]"#, &catalog).unwrap();
        assert_eq!(value, r#"["S","M"]"#);
    }
}
