// Record producers and parsers for each section of the grid text format.
//
// Every function here works on single lines without any reader or writer.
// Parsers return a plain message; the caller attaches the line number.

use cubesheet_core::{CellKey, Selection, Shape};
use cubesheet_engine::{AttrValue, AttributeEntry, Attributes, CodeArray};
use serde::de::DeserializeOwned;

/// Sections in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Shape,
    Grid,
    Attributes,
    RowHeights,
    ColWidths,
    Macros,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Shape,
        Section::Grid,
        Section::Attributes,
        Section::RowHeights,
        Section::ColWidths,
        Section::Macros,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Shape => "shape",
            Section::Grid => "grid",
            Section::Attributes => "attributes",
            Section::RowHeights => "row_heights",
            Section::ColWidths => "col_widths",
            Section::Macros => "macros",
        }
    }

    pub fn header(&self) -> String {
        format!("[{}]", self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// Section name if `line` looks like `[name]`.
///
/// Only lowercase letters and underscores count, so a list literal such as
/// `[1, 2]` in the macro text is not mistaken for a header.
pub fn header_name(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_');
    valid.then_some(name)
}

// ============================================================================
// Producers
// ============================================================================

pub fn shape_line(shape: Shape) -> String {
    let [rows, cols, tables] = shape.as_array();
    format!("{rows}\t{cols}\t{tables}")
}

/// One `row\tcol\ttab\tcode` line per stored cell, sorted by key.
pub fn grid_lines(grid: &CodeArray) -> Vec<String> {
    let store = grid.data_array().dict_grid();
    let mut cells: Vec<(&CellKey, &String)> = store.iter().collect();
    cells.sort_by_key(|(key, _)| **key);
    cells
        .into_iter()
        .map(|(key, code)| format!("{}\t{}\t{}\t{}", key.row, key.col, key.table, code))
        .collect()
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// JSON has no infinities or NaN, so those floats get bare tokens that no
/// JSON value can be confused with.
fn attr_token(value: &AttrValue) -> Result<String, String> {
    match value {
        AttrValue::Float(f) if f.is_nan() => Ok("nan".to_string()),
        AttrValue::Float(f) if f.is_infinite() => {
            Ok(if *f > 0.0 { "inf" } else { "-inf" }.to_string())
        }
        other => json(other),
    }
}

fn parse_attr_token(field: &str) -> Result<AttrValue, String> {
    match field {
        "nan" => Ok(AttrValue::Float(f64::NAN)),
        "inf" => Ok(AttrValue::Float(f64::INFINITY)),
        "-inf" => Ok(AttrValue::Float(f64::NEG_INFINITY)),
        _ => from_json(field, "attribute value"),
    }
}

/// Five selection parts, the table, then alternating attribute name/value.
pub fn attribute_line(entry: &AttributeEntry) -> Result<String, String> {
    let sel = &entry.selection;
    let mut parts = vec![
        json(&sel.block_tl)?,
        json(&sel.block_br)?,
        json(&sel.rows)?,
        json(&sel.cols)?,
        json(&sel.cells)?,
        entry.table.to_string(),
    ];
    for (name, value) in &entry.changes {
        parts.push(json(name)?);
        parts.push(attr_token(value)?);
    }
    Ok(parts.join("\t"))
}

/// `index\ttab\tsize` lines for row heights or column widths, sorted.
pub fn size_lines<'a, I>(sizes: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a (usize, usize), &'a f64)>,
{
    let mut entries: Vec<_> = sizes.into_iter().collect();
    entries.sort_by_key(|(key, _)| **key);
    entries
        .into_iter()
        .map(|((index, table), size)| format!("{index}\t{table}\t{size}"))
        .collect()
}

// ============================================================================
// Parsers
// ============================================================================

fn parse_index(field: &str, what: &str) -> Result<usize, String> {
    field
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what} '{field}'"))
}

fn fields<'a>(line: &'a str, expected: usize, what: &str) -> Result<Vec<&'a str>, String> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != expected {
        return Err(format!(
            "{what} record needs {expected} fields, found {}",
            parts.len()
        ));
    }
    Ok(parts)
}

pub fn parse_shape(line: &str) -> Result<Shape, String> {
    let parts = fields(line, 3, "shape")?;
    Ok(Shape::new(
        parse_index(parts[0], "row count")?,
        parse_index(parts[1], "column count")?,
        parse_index(parts[2], "table count")?,
    ))
}

/// The code may itself contain tabs: only the first three split.
pub fn parse_grid(line: &str) -> Result<(CellKey, String), String> {
    let parts: Vec<&str> = line.splitn(4, '\t').collect();
    let [row, col, table, code] = parts[..] else {
        return Err(format!("grid record needs row, col, table and code, found {} field(s)", parts.len()));
    };
    let key = CellKey::new(
        parse_index(row, "row")?,
        parse_index(col, "column")?,
        parse_index(table, "table")?,
    );
    Ok((key, code.to_string()))
}

fn from_json<T: DeserializeOwned>(field: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(field).map_err(|e| format!("invalid {what} '{field}': {e}"))
}

pub fn parse_attribute(line: &str) -> Result<AttributeEntry, String> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 6 || (parts.len() - 6) % 2 != 0 {
        return Err(format!(
            "attribute record needs 6 fields plus name/value pairs, found {}",
            parts.len()
        ));
    }

    let selection = Selection::new(
        from_json(parts[0], "block corners")?,
        from_json(parts[1], "block corners")?,
        from_json(parts[2], "row list")?,
        from_json(parts[3], "column list")?,
        from_json(parts[4], "cell list")?,
    );
    let table = parse_index(parts[5], "table")?;

    let mut changes = Attributes::new();
    for pair in parts[6..].chunks(2) {
        let name: String = from_json(pair[0], "attribute name")?;
        let value = parse_attr_token(pair[1])?;
        changes.insert(name, value);
    }

    Ok(AttributeEntry::new(selection, table, changes))
}

/// `index\ttab\tsize` as used by both row heights and column widths.
pub fn parse_size(line: &str) -> Result<((usize, usize), f64), String> {
    let parts = fields(line, 3, "size")?;
    let index = parse_index(parts[0], "index")?;
    let table = parse_index(parts[1], "table")?;
    let size = parts[2]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid size '{}'", parts[2]))?;
    Ok(((index, table), size))
}
