//! Input tree and archive fixtures

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// Bytes written into every fixture image; unique per item and file so a mock
/// service can tell uploads apart
pub fn image_bytes(item: &str, file: &str) -> Vec<u8> {
    format!("image:{item}/{file}").into_bytes()
}

/// Create `<root>/<item>/` with one fixture image per file name
pub fn make_item_dir(root: &Path, item: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(item);
    std::fs::create_dir_all(&dir).unwrap();
    for file in files {
        std::fs::write(dir.join(file), image_bytes(item, file)).unwrap();
    }
    dir
}

/// A ZIP archive as the service returns it, holding the given panels
pub fn panels_zip(panels: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in panels {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Ledger lines in file order
pub fn ledger_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content.lines().map(String::from).collect(),
        Err(_) => Vec::new(),
    }
}

/// Ledger identifiers, sorted
pub fn ledger_ids(path: &Path) -> Vec<String> {
    let mut ids: Vec<String> = ledger_lines(path)
        .iter()
        .filter_map(|line| line.split(',').next().map(String::from))
        .collect();
    ids.sort();
    ids
}
