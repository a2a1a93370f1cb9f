// Whole-grid save and load in the sectioned text format

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cubesheet_core::Shape;
use cubesheet_engine::{CodeArray, GridOptions};

use crate::error::FormatError;
use crate::records::{self, header_name, Section};

/// Write every section of `grid` to `writer`.
pub fn write_to<W: Write>(grid: &CodeArray, mut writer: W) -> Result<(), FormatError> {
    let store = grid.data_array().dict_grid();
    if let Some((key, _)) = store.iter().find(|(_, code)| code.contains(['\n', '\r'])) {
        return Err(FormatError::MultilineCode(*key));
    }

    for section in Section::ALL {
        writeln!(writer, "{}", section.header())?;
        let lines = match section {
            Section::Shape => vec![records::shape_line(grid.shape())],
            Section::Grid => records::grid_lines(grid),
            Section::Attributes => grid
                .cell_attributes()
                .entries()
                .iter()
                .map(records::attribute_line)
                .collect::<Result<_, _>>()
                .map_err(FormatError::Encode)?,
            Section::RowHeights => records::size_lines(grid.data_array().row_heights()),
            Section::ColWidths => records::size_lines(grid.data_array().col_widths()),
            Section::Macros => grid.macros().lines().map(str::to_string).collect(),
        };
        for line in lines {
            writeln!(writer, "{line}")?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Build a grid from the records in `reader`.
///
/// Records are applied to a fresh grid and the undo history is cleared
/// afterwards, so loading is not itself undoable.
pub fn read_from<R: BufRead>(reader: R, options: GridOptions) -> Result<CodeArray, FormatError> {
    let mut grid = CodeArray::with_options(Shape::new(0, 0, 0), options);
    let mut section: Option<Section> = None;
    let mut skipping = false;
    let mut macro_lines: Vec<String> = Vec::new();
    let mut count = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if let Some(name) = header_name(line) {
            if let Some(current) = section {
                log::debug!("read {} record(s) from [{}]", count, current.name());
            }
            count = 0;
            section = Section::from_name(name);
            skipping = section.is_none();
            if skipping {
                log::warn!("skipping unknown section [{}] at line {}", name, line_no);
            }
            continue;
        }

        let parse_err = |message: String| FormatError::Parse { line: line_no, message };

        match section {
            Some(Section::Macros) => macro_lines.push(line.to_string()),
            _ if line.is_empty() || skipping => continue,
            None => return Err(parse_err("record before the first section header".to_string())),
            Some(Section::Shape) => {
                let shape = records::parse_shape(line).map_err(parse_err)?;
                grid.set_shape(shape)?;
            }
            Some(Section::Grid) => {
                let (key, code) = records::parse_grid(line).map_err(parse_err)?;
                grid.set(key, &code)?;
            }
            Some(Section::Attributes) => {
                let entry = records::parse_attribute(line).map_err(parse_err)?;
                grid.append_attributes(entry.selection, entry.table, entry.changes)?;
            }
            Some(Section::RowHeights) => {
                let ((row, table), height) = records::parse_size(line).map_err(parse_err)?;
                grid.set_row_height(row, table, height);
            }
            Some(Section::ColWidths) => {
                let ((col, table), width) = records::parse_size(line).map_err(parse_err)?;
                grid.set_col_width(col, table, width);
            }
        }
        count += 1;
    }

    if let Some(current) = section {
        log::debug!("read {} record(s) from [{}]", count, current.name());
    }

    grid.set_macros(macro_lines.join("\n"));
    grid.reset();
    Ok(grid)
}

pub fn save(grid: &CodeArray, path: &Path) -> Result<(), FormatError> {
    let file = File::create(path)?;
    write_to(grid, BufWriter::new(file))
}

pub fn load(path: &Path, options: GridOptions) -> Result<CodeArray, FormatError> {
    let file = File::open(path)?;
    read_from(BufReader::new(file), options)
}
