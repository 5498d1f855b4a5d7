//! Command-line argument parsing.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use registrant_grid_core::filter::SortSpec;
use registrant_grid_core::{PlacementSelections, ViewKind};

pub const USAGE: &str = "\
Usage: registrant-grid <command> [options]

Commands:
  list          --instance <id> [--view placement|waitlist] [--parent-group <id>]
                [--sort \"<column> [asc|desc]\"] [--page <n>] [--export] [--as-of <YYYY-MM-DD>]
  apply-filter  --instance <id> [--view placement|waitlist] <name>=<value>...
  clear-filter  --instance <id> [--view placement|waitlist]
  place         <group id>:<registrant id>[,<registrant id>...]... [--copy-attributes]
  help";

#[derive(Debug, Clone, PartialEq)]
pub struct ListArgs {
    pub view: ViewKind,
    pub instance_id: i64,
    pub parent_group_id: Option<i64>,
    pub sort: Option<SortSpec>,
    /// One-based, as typed.
    pub page: usize,
    pub export: bool,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List(ListArgs),
    ApplyFilter {
        view: ViewKind,
        instance_id: i64,
        values: Vec<(String, String)>,
    },
    ClearFilter {
        view: ViewKind,
        instance_id: i64,
    },
    Place {
        selections: PlacementSelections,
        copy_attributes: bool,
    },
    Help,
}

/// Parse arguments after the program name.
pub fn parse(args: &[String]) -> Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "list" => parse_list(rest),
        "apply-filter" => {
            let mut view = ViewKind::GroupPlacement;
            let mut instance_id = None;
            let mut values = Vec::new();
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--view" => view = parse_view(next_value(&mut iter, arg)?)?,
                    "--instance" => instance_id = Some(parse_id(next_value(&mut iter, arg)?)?),
                    other => match other.split_once('=') {
                        Some((name, value)) => values.push((name.trim().to_string(), value.to_string())),
                        None => bail!("Expected <name>=<value>, got '{}'", other),
                    },
                }
            }
            Ok(Command::ApplyFilter {
                view,
                instance_id: require_instance(instance_id)?,
                values,
            })
        }
        "clear-filter" => {
            let mut view = ViewKind::GroupPlacement;
            let mut instance_id = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--view" => view = parse_view(next_value(&mut iter, arg)?)?,
                    "--instance" => instance_id = Some(parse_id(next_value(&mut iter, arg)?)?),
                    other => bail!("Unknown option '{}'", other),
                }
            }
            Ok(Command::ClearFilter {
                view,
                instance_id: require_instance(instance_id)?,
            })
        }
        "place" => {
            let mut selections = PlacementSelections::new();
            let mut copy_attributes = false;
            for arg in rest {
                if arg == "--copy-attributes" {
                    copy_attributes = true;
                    continue;
                }
                let (group, registrants) = arg
                    .split_once(':')
                    .with_context(|| format!("Expected <group id>:<registrant ids>, got '{}'", arg))?;
                let entry = selections.entry(parse_id(group)?).or_default();
                for id in registrants.split(',').filter(|s| !s.trim().is_empty()) {
                    entry.insert(parse_id(id)?);
                }
            }
            if selections.is_empty() {
                bail!("Nothing to place");
            }
            Ok(Command::Place {
                selections,
                copy_attributes,
            })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn parse_list(rest: &[String]) -> Result<Command> {
    let mut view = ViewKind::GroupPlacement;
    let mut instance_id = None;
    let mut parent_group_id = None;
    let mut sort = None;
    let mut page = 1;
    let mut export = false;
    let mut as_of = None;

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--view" => view = parse_view(next_value(&mut iter, arg)?)?,
            "--instance" => instance_id = Some(parse_id(next_value(&mut iter, arg)?)?),
            "--parent-group" => parent_group_id = Some(parse_id(next_value(&mut iter, arg)?)?),
            "--sort" => {
                let value = next_value(&mut iter, arg)?;
                sort = Some(
                    SortSpec::parse(value).with_context(|| format!("Invalid sort '{}'", value))?,
                );
            }
            "--page" => {
                let value = next_value(&mut iter, arg)?;
                page = value
                    .parse::<usize>()
                    .ok()
                    .filter(|p| *p > 0)
                    .with_context(|| format!("Invalid page '{}'", value))?;
            }
            "--export" => export = true,
            "--as-of" => {
                let value = next_value(&mut iter, arg)?;
                as_of = Some(
                    NaiveDate::parse_from_str(value, "%Y-%m-%d")
                        .with_context(|| format!("Invalid date '{}'", value))?,
                );
            }
            other => bail!("Unknown option '{}'", other),
        }
    }

    Ok(Command::List(ListArgs {
        view,
        instance_id: require_instance(instance_id)?,
        parent_group_id,
        sort,
        page,
        export,
        as_of,
    }))
}

fn next_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("Missing value for {}", flag))
}

fn parse_view(value: &str) -> Result<ViewKind> {
    match value.to_ascii_lowercase().as_str() {
        "placement" | "group-placement" | "groupplacements" => Ok(ViewKind::GroupPlacement),
        "waitlist" | "wait-list" | "wl" => Ok(ViewKind::WaitList),
        other => bail!("Unknown view '{}'", other),
    }
}

fn parse_id(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid id '{}'", value))
}

fn require_instance(instance_id: Option<i64>) -> Result<i64> {
    instance_id.context("--instance is required")
}
