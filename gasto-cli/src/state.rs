use anyhow::{Context, Result};
use gasto_pipeline::KeywordTable;
use std::fs;
use std::path::{Path, PathBuf};

/// `$GASTO_HOME`, or `~/.gasto`
pub fn gasto_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GASTO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".gasto"))
}

pub fn ensure_gasto_home() -> Result<PathBuf> {
    let dir = gasto_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn keywords_path() -> Result<PathBuf> {
    Ok(ensure_gasto_home()?.join("keywords.json"))
}

/// Learned table if one was saved, otherwise the built-in seed
pub fn load_keyword_table(path: &Path) -> Result<KeywordTable> {
    if !path.exists() {
        return Ok(KeywordTable::seeded());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    KeywordTable::from_json(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_keyword_table(path: &Path, table: &KeywordTable) -> Result<()> {
    let json = table.to_json_pretty()?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_falls_back_to_seed() {
        let path = std::env::temp_dir().join("gasto-missing-keywords.json");
        let _ = fs::remove_file(&path);
        let table = load_keyword_table(&path).unwrap();
        assert_eq!(table.category_names(), KeywordTable::seeded().category_names());
    }

    #[test]
    fn test_table_save_and_load() {
        let path = std::env::temp_dir().join(format!("gasto-keywords-{}.json", std::process::id()));
        let table = KeywordTable::seeded();
        table.add_keyword("Saúde", "drogaria xyz").unwrap();
        save_keyword_table(&path, &table).unwrap();

        let back = load_keyword_table(&path).unwrap();
        assert_eq!(back.lookup("drogaria xyz").unwrap().category, "Saúde");
        let _ = fs::remove_file(&path);
    }
}
