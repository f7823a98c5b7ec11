#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory that disappears with the test.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// Builds a semicolon-separated French export with `rows` data rows. Every
/// row whose 1-based index is listed in `undated` carries an `N/A` date.
/// Odd rows are income of 100.00, even rows expenses of 40.00.
pub fn french_export(rows: usize, undated: &[usize]) -> String {
    let mut text = String::from("Date;Libellé;Montant;Type;Catégorie;Client\n");
    for idx in 1..=rows {
        let date = if undated.contains(&idx) {
            "N/A".to_string()
        } else {
            format!("{:02}/{:02}/2024", (idx % 28) + 1, (idx % 12) + 1)
        };
        let (amount, kind, category) = if idx % 2 == 1 {
            ("100,00", "Recette", "Ventes")
        } else {
            ("40,00", "Dépense", "Achats")
        };
        text.push_str(&format!(
            "{date};Opération {idx};{amount};{kind};{category};Client {}\n",
            idx % 7
        ));
    }
    text
}
