//! Code-cell extraction for Jupyter notebooks.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

#[must_use]
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"))
}

/// Concatenates the code cells of a notebook document into one script.
///
/// IPython magics (`%`, `%%`) and shell escapes (`!`) are dropped since they
/// are not Python.
pub fn code_cells(document: &str) -> Result<String, serde_json::Error> {
    let notebook: Notebook = serde_json::from_str(document)?;
    let mut script = String::new();
    for cell in notebook.cells {
        if cell.cell_type != "code" {
            continue;
        }
        for line in cell.source.into_text().lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('%') || trimmed.starts_with('!') {
                continue;
            }
            script.push_str(line);
            script.push('\n');
        }
        script.push('\n');
    }
    Ok(script)
}
