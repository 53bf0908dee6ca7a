#![forbid(unsafe_code)]

//! CSV export of the collected rows.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::record::{COLUMNS, Field, VideoRecord};

/// Writes `rows` to `path` with a header line, replacing any existing file.
///
/// Output goes to a sibling temp file first and is renamed into place, so an
/// interrupted run never leaves a truncated CSV behind.
pub fn write_csv(path: &Path, rows: &[VideoRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write_rows(&mut out, rows).with_context(|| format!("writing {}", path.display()))?;
        out.flush()?;
    }
    // NamedTempFile creates files with mode 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn write_rows(out: &mut impl Write, rows: &[VideoRecord]) -> std::io::Result<()> {
    writeln!(out, "{}", COLUMNS.join(","))?;
    for row in rows {
        let line = row
            .fields()
            .iter()
            .map(render_field)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn render_field(field: &Field<'_>) -> String {
    match field {
        Field::Text(text) => escape(text),
        Field::Integer(value) => value.to_string(),
        Field::Null => String::new(),
    }
}

/// Quotes a cell when it contains a delimiter, quote or line break.
fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
