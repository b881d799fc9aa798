//! Archive walking and column projection.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Seek};

#[cfg(feature = "parallel")]
use std::io::{BufRead, BufReader};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use module_storage_types::ModuleDependencyRow;
use zip::ZipArchive;

use crate::types::{ArchiveError, EntryFilter};

/// Fixed RF2 column indices used by the storage engine.
pub mod columns {
    /// Release date of the row (column 1).
    pub const EFFECTIVE_TIME: usize = 1;
    /// Active flag, `"0"` or `"1"` (column 2).
    pub const ACTIVE: usize = 2;
    /// Module the row belongs to (column 3).
    pub const MODULE_ID: usize = 3;
    /// Component the row refers to (column 5).
    pub const REFERENCED_COMPONENT_ID: usize = 5;
    /// Module Dependency rows only: effective time of the dependent
    /// module (column 6).
    pub const SOURCE_EFFECTIVE_TIME: usize = 6;
    /// Module Dependency rows only: effective time of the depended-upon
    /// module (column 7).
    pub const TARGET_EFFECTIVE_TIME: usize = 7;
}

/// Projects `column_indices` out of every qualifying line of every
/// qualifying entry in the archive.
///
/// Header lines (first field `id` or `alternateIdentifier`) are skipped;
/// remaining lines are split on tab with trailing empty fields preserved.
/// A column index beyond a line's field count projects as an empty
/// string. Row order across entries is not significant.
///
/// Any zip or I/O failure yields an empty result set; this function
/// never fails.
pub fn extract_columns<R: Read + Seek>(
    reader: R,
    filter: &EntryFilter,
    column_indices: &[usize],
) -> Vec<Vec<String>> {
    match try_extract(reader, filter, column_indices) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("failed to extract columns from RF2 archive: {e}");
            Vec::new()
        }
    }
}

/// Collects the distinct module ids present across all qualifying files.
///
/// This is how a package's full module composition is discovered.
pub fn unique_module_ids<R: Read + Seek>(reader: R, snapshot_only: bool) -> BTreeSet<String> {
    let filter = if snapshot_only {
        EntryFilter::snapshot()
    } else {
        EntryFilter::all_folders()
    };

    extract_columns(reader, &filter, &[columns::MODULE_ID])
        .into_iter()
        .filter_map(|mut row| {
            let id = row.remove(0);
            (!id.is_empty()).then_some(id)
        })
        .collect()
}

/// Extracts the active rows of the package's Module Dependency Reference
/// Set, identified by filename.
pub fn module_dependency_rows<R: Read + Seek>(reader: R) -> Vec<ModuleDependencyRow> {
    let filter = EntryFilter::all_folders().matching("ModuleDependency");
    let projection = [
        columns::ACTIVE,
        columns::MODULE_ID,
        columns::REFERENCED_COMPONENT_ID,
        columns::SOURCE_EFFECTIVE_TIME,
        columns::TARGET_EFFECTIVE_TIME,
    ];

    extract_columns(reader, &filter, &projection)
        .into_iter()
        .filter(|row| row[0] != "0")
        .map(|row| ModuleDependencyRow::new(&row[1], &row[2], &row[3], &row[4]))
        .collect()
}

/// Summarises the package's module versions: for each module id, the
/// numerically greatest effective time seen across qualifying files.
///
/// Rows with a non-numeric effective time are ignored.
pub fn latest_module_versions<R: Read + Seek>(
    reader: R,
    snapshot_only: bool,
) -> BTreeMap<String, u32> {
    let filter = if snapshot_only {
        EntryFilter::snapshot()
    } else {
        EntryFilter::all_folders()
    };

    let mut latest: BTreeMap<String, u32> = BTreeMap::new();
    for row in extract_columns(reader, &filter, &[columns::MODULE_ID, columns::EFFECTIVE_TIME]) {
        let Ok(effective_time) = row[1].parse::<u32>() else {
            continue;
        };
        if row[0].is_empty() {
            continue;
        }
        let entry = latest.entry(row[0].clone()).or_insert(effective_time);
        if effective_time > *entry {
            *entry = effective_time;
        }
    }
    latest
}

fn try_extract<R: Read + Seek>(
    reader: R,
    filter: &EntryFilter,
    column_indices: &[usize],
) -> Result<Vec<Vec<String>>, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut rows = Vec::new();

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !filter.qualifies(&name) {
            continue;
        }
        tracing::debug!("extracting columns from archive entry {name}");
        rows.extend(project_entry(entry, column_indices)?);
    }

    Ok(rows)
}

/// Projects the requested columns from one entry, decoding lines in
/// parallel with rayon.
#[cfg(feature = "parallel")]
fn project_entry<R: Read>(
    reader: R,
    column_indices: &[usize],
) -> Result<Vec<Vec<String>>, ArchiveError> {
    let lines = read_lines_skip_headers(reader)?;

    Ok(lines
        .par_iter()
        .map(|line| project_line(line, column_indices))
        .collect())
}

/// Projects the requested columns from one entry, decoding lines
/// sequentially via csv.
#[cfg(not(feature = "parallel"))]
fn project_entry<R: Read>(
    reader: R,
    column_indices: &[usize],
) -> Result<Vec<Vec<String>>, ArchiveError> {
    let mut tsv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    while tsv_reader.read_record(&mut record)? {
        let first = record.get(0).unwrap_or("");
        if first == "id" || first == "alternateIdentifier" {
            continue;
        }
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(
            column_indices
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect(),
        );
    }

    Ok(rows)
}

/// Reads all lines of an entry, skipping header and empty lines.
#[cfg(feature = "parallel")]
fn read_lines_skip_headers<R: Read>(reader: R) -> Result<Vec<String>, ArchiveError> {
    let reader = BufReader::new(reader);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || is_header(&line) {
            continue;
        }
        lines.push(line);
    }
    Ok(lines)
}

#[cfg(feature = "parallel")]
fn is_header(line: &str) -> bool {
    let first_field = line.split('\t').next().unwrap_or("");
    first_field == "id" || first_field == "alternateIdentifier"
}

/// Splits one line on tab, preserving trailing empty fields, and projects
/// the requested columns in order.
#[cfg(feature = "parallel")]
fn project_line(line: &str, column_indices: &[usize]) -> Vec<String> {
    let fields: Vec<&str> = line.split('\t').collect();
    column_indices
        .iter()
        .map(|&i| fields.get(i).copied().unwrap_or("").to_string())
        .collect()
}
