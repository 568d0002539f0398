//! Joined CSV tables for a finished linkage run.
//!
//! Each table holds one row per pair: the two record indices, then every
//! raw column of the left record, then every raw column of the right record.
//! Column headers are prefixed with the source name (`zagat.name`).

use std::io::Write;
use std::path::{Path, PathBuf};

use visigrid_linkage::{Disposition, RecordPair, RecordSet};

/// File name for the table holding one disposition.
pub fn table_name(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Match => "matches.csv",
        Disposition::Possible => "possibles.csv",
        Disposition::NonMatch => "nonmatches.csv",
    }
}

fn header(left: &RecordSet, right: &RecordSet) -> Vec<String> {
    let mut header = vec![
        format!("{}_index", left.source),
        format!("{}_index", right.source),
    ];
    header.extend(left.columns.iter().map(|c| format!("{}.{}", left.source, c)));
    header.extend(right.columns.iter().map(|c| format!("{}.{}", right.source, c)));
    header
}

/// Write one joined table to any writer.
pub fn write_pairs<W: Write>(
    writer: W,
    left: &RecordSet,
    right: &RecordSet,
    pairs: &[RecordPair],
) -> Result<(), String> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    wtr.write_record(header(left, right)).map_err(|e| e.to_string())?;

    for pair in pairs {
        let a = left
            .get(pair.left)
            .ok_or_else(|| format!("left index {} out of range", pair.left))?;
        let b = right
            .get(pair.right)
            .ok_or_else(|| format!("right index {} out of range", pair.right))?;

        let mut row = vec![pair.left.to_string(), pair.right.to_string()];
        row.extend(a.raw.iter().cloned());
        row.extend(b.raw.iter().cloned());
        wtr.write_record(&row).map_err(|e| e.to_string())?;
    }

    wtr.flush().map_err(|e| e.to_string())
}

/// Write all three tables into `dir`, creating it if needed. Returns the
/// paths written, in match / possible / non-match order.
pub fn write_tables(
    dir: &Path,
    left: &RecordSet,
    right: &RecordSet,
    tables: [(Disposition, &[RecordPair]); 3],
) -> Result<Vec<PathBuf>, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;

    let mut written = Vec::with_capacity(tables.len());
    for (disposition, pairs) in tables {
        let path = dir.join(table_name(disposition));
        let file = std::fs::File::create(&path)
            .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
        write_pairs(std::io::BufWriter::new(file), left, right, pairs)
            .map_err(|e| format!("write error in {}: {e}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
