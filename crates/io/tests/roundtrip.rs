use std::path::PathBuf;

use cubesheet_core::{CellKey, Selection, Shape};
use cubesheet_engine::{AttrValue, Attributes, CodeArray, GridOptions, Value};
use cubesheet_io::{load, read_from, save, write_to, FormatError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn key(row: usize, col: usize, table: usize) -> CellKey {
    CellKey::new(row, col, table)
}

fn to_text(grid: &CodeArray) -> String {
    let mut out = Vec::new();
    write_to(grid, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn fixture_loads() {
    let grid = load(&fixtures_dir().join("sample.grid"), GridOptions::default()).unwrap();

    assert_eq!(grid.shape(), Shape::new(20, 5, 2));
    assert_eq!(grid.get(key(1, 0, 0)).unwrap(), Value::Int(20));
    assert_eq!(grid.get(key(2, 0, 0)).unwrap(), Value::Int(30));
    assert_eq!(grid.global("total"), Some(Value::Int(30)));
    assert_eq!(grid.code(&key(0, 1, 1)).unwrap(), Some("\"tab\there\""));

    let attrs = grid.cell_attributes();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs.get_attr(&key(0, 0, 0), "bgcolor"), Some(AttrValue::Int(16711680)));
    assert_eq!(attrs.get_attr(&key(1, 0, 0), "bgcolor"), Some(AttrValue::Int(255)));
    assert_eq!(
        attrs.get_attr(&key(1, 0, 0), "fontweight"),
        Some(AttrValue::Text("bold".to_string()))
    );

    assert_eq!(grid.data_array().row_heights().get(&(0, 0)), Some(&40.5));
    assert_eq!(grid.data_array().col_widths().get(&(1, 1)), Some(&200.0));
    assert_eq!(grid.macros(), "base = 100\n\n# comment\n[1, 2]");
    assert!(!grid.unredo().can_undo());
}

#[test]
fn write_then_read_preserves_everything() {
    let mut grid = CodeArray::new(Shape::new(10, 4, 3));
    grid.set(key(0, 0, 0), "1.5").unwrap();
    grid.set(key(9, 3, 2), "S[0, 0, 0] + 1").unwrap();
    grid.set(key(4, 1, 1), "'x' * 3").unwrap();

    let mut changes = Attributes::new();
    changes.insert("textcolor".to_string(), AttrValue::Int(42));
    changes.insert("angle".to_string(), AttrValue::Float(90.0));
    grid.append_attributes(Selection::whole_cols(vec![1, 3]), 2, changes).unwrap();
    grid.freeze(key(4, 1, 1)).unwrap();

    grid.set_row_height(3, 0, 18.0);
    grid.set_col_width(2, 1, 75.25);
    grid.set_macros("offset = 7\noffset * 2");

    let text = to_text(&grid);
    let loaded = read_from(text.as_bytes(), GridOptions::default()).unwrap();

    assert_eq!(loaded.shape(), grid.shape());
    assert_eq!(loaded.get(key(9, 3, 2)).unwrap(), Value::Float(2.5));
    assert_eq!(loaded.get(key(4, 1, 1)).unwrap(), Value::from("xxx"));
    assert_eq!(loaded.cell_attributes().entries(), grid.cell_attributes().entries());
    assert_eq!(loaded.data_array().row_heights(), grid.data_array().row_heights());
    assert_eq!(loaded.data_array().col_widths(), grid.data_array().col_widths());
    assert_eq!(loaded.macros(), grid.macros());

    // A second pass produces identical text.
    assert_eq!(to_text(&loaded), text);
}

#[test]
fn grid_lines_are_sorted_by_key() {
    let mut grid = CodeArray::new(Shape::new(5, 5, 1));
    grid.set(key(3, 0, 0), "c").unwrap();
    grid.set(key(0, 4, 0), "b").unwrap();
    grid.set(key(0, 1, 0), "a").unwrap();

    let text = to_text(&grid);
    let grid_section: Vec<&str> = text
        .lines()
        .skip_while(|l| *l != "[grid]")
        .skip(1)
        .take_while(|l| !l.starts_with('['))
        .collect();
    assert_eq!(grid_section, vec!["0\t1\t0\ta", "0\t4\t0\tb", "3\t0\t0\tc"]);
}

#[test]
fn save_and_load_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.grid");

    let mut grid = CodeArray::new(Shape::new(3, 3, 1));
    grid.set(key(2, 2, 0), "sum(range(5))").unwrap();
    save(&grid, &path).unwrap();

    let loaded = load(&path, GridOptions::default()).unwrap();
    assert_eq!(loaded.get(key(2, 2, 0)).unwrap(), Value::Int(10));
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("absent.grid"), GridOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::Io(_)));
}

#[test]
fn crlf_line_endings_are_accepted() {
    let text = "[shape]\r\n2\t2\t1\r\n[grid]\r\n0\t0\t0\t3 * 3\r\n";
    let grid = read_from(text.as_bytes(), GridOptions::default()).unwrap();
    assert_eq!(grid.get(key(0, 0, 0)).unwrap(), Value::Int(9));
}

#[test]
fn frozen_non_finite_values_survive_reload() {
    let mut grid = CodeArray::new(Shape::new(3, 1, 1));
    grid.set(key(0, 0, 0), "1e308 * 10").unwrap();
    grid.set(key(1, 0, 0), "-1e308 * 10").unwrap();
    grid.freeze(key(0, 0, 0)).unwrap();
    grid.freeze(key(1, 0, 0)).unwrap();

    let loaded = read_from(to_text(&grid).as_bytes(), GridOptions::default()).unwrap();
    assert_eq!(loaded.get(key(0, 0, 0)).unwrap(), Value::Float(f64::INFINITY));
    assert_eq!(loaded.get(key(1, 0, 0)).unwrap(), Value::Float(f64::NEG_INFINITY));
}
