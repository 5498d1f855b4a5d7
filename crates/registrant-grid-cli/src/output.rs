//! Terminal table and CSV rendering of a bound grid page.

use std::io::{self, Write};
use std::path::Path;

use registrant_grid_core::filter::FilterSummary;
use registrant_grid_core::models::{AttributeValueKey, PersonField};
use registrant_grid_core::{FormFieldKind, GridPage, ViewKind};

/// Column gap in the text table
const COLUMN_GAP: &str = "  ";

/// Header row plus one row of cells per registrant on the page.
///
/// Exports get an address column even when the template does not show one.
pub fn cells(page: &GridPage<'_>, kind: ViewKind, exporting: bool) -> (Vec<String>, Vec<Vec<String>>) {
    let extra_address = exporting && !page.catalog.has_builtin(PersonField::Address);
    let mut header = vec!["Id".to_string(), "Registrant".to_string()];
    header.extend(page.catalog.iter().map(|f| f.label().to_string()));
    if extra_address {
        header.push(PersonField::Address.label().to_string());
    }
    header.push(match kind {
        ViewKind::GroupPlacement => "Group".to_string(),
        ViewKind::WaitList => "Position".to_string(),
    });

    let rows = page
        .rows
        .iter()
        .map(|registrant| {
            let row = page.enrichment.get(registrant.id);
            let mut cells = vec![
                registrant.id.to_string(),
                row.map(|r| r.person_name.clone()).unwrap_or_default(),
            ];
            for field in &page.catalog {
                let value = match (&field.kind, row) {
                    (FormFieldKind::Builtin(person_field), Some(r)) => r.value(*person_field),
                    (FormFieldKind::Attribute(attribute), Some(r)) => {
                        r.attribute(&AttributeValueKey::new(attribute))
                    }
                    (_, None) => "",
                };
                cells.push(value.to_string());
            }
            if extra_address {
                cells.push(row.map(|r| r.value(PersonField::Address)).unwrap_or("").to_string());
            }
            cells.push(match kind {
                ViewKind::GroupPlacement => row.and_then(|r| r.group.clone()).unwrap_or_default(),
                ViewKind::WaitList => row
                    .and_then(|r| r.wait_list_position)
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            });
            cells
        })
        .collect();

    (header, rows)
}

pub fn write_table(out: &mut impl Write, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(COLUMN_GAP)
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(header))?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join(COLUMN_GAP))?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

pub fn write_csv(out: &mut impl Write, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let line = |cells: &[String]| cells.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(",");
    writeln!(out, "{}", line(header))?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

pub fn write_summary(out: &mut impl Write, summary: &[FilterSummary]) -> io::Result<()> {
    if summary.is_empty() {
        return Ok(());
    }
    writeln!(out, "Filtered by:")?;
    for entry in summary {
        writeln!(out, "  {}: {}", entry.name, entry.value)?;
    }
    writeln!(out)
}

/// Where the stored filters live and how long ago they were written.
pub fn write_saved_note(out: &mut impl Write, age: &str, path: &Path) -> io::Result<()> {
    writeln!(out, "Filters saved {} ({})", age, path.display())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
