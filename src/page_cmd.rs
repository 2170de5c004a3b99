//! `pagecheck page ...` commands.
//!
//! Each command talks to the server at `[client].base_url` through
//! [`HttpPageStore`] and prints the resulting page as pretty JSON.
//!
//! # Usage
//!
//! ```bash
//! pagecheck page create --content '{"html": "<p>hi</p>", "text": "hi", "annotations": []}'
//! pagecheck page get 550e8400-e29b-41d4-a716-446655440000
//! pagecheck page update 550e8400-e29b-41d4-a716-446655440000 --file page.json
//! pagecheck page delete 550e8400-e29b-41d4-a716-446655440000
//! ```

use anyhow::{bail, Context, Result};
use std::path::Path;

use pagecheck_core::models::Page;
use pagecheck_core::store::PageStore;

use crate::client::HttpPageStore;
use crate::config::Config;

/// Reads page content from an inline JSON string or a file.
pub fn read_content(inline: Option<&str>, file: Option<&Path>) -> Result<serde_json::Value> {
    let raw = match (inline, file) {
        (Some(_), Some(_)) => bail!("pass either --content or --file, not both"),
        (Some(s), None) => s.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content file: {}", path.display()))?,
        (None, None) => bail!("page content is required (--content or --file)"),
    };
    serde_json::from_str(&raw).with_context(|| "Content is not valid JSON")
}

fn print_page(page: &Page) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(page)?);
    Ok(())
}

pub async fn run_create(config: &Config, content: serde_json::Value) -> Result<()> {
    let store = HttpPageStore::from_config(&config.client)?;
    let page = store.create(Some(content)).await?;
    print_page(&page)
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = HttpPageStore::from_config(&config.client)?;
    let page = store.get(id).await?;
    print_page(&page)
}

pub async fn run_update(config: &Config, id: &str, content: serde_json::Value) -> Result<()> {
    let store = HttpPageStore::from_config(&config.client)?;
    let page = store.update(id, Some(content)).await?;
    print_page(&page)
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = HttpPageStore::from_config(&config.client)?;
    store.delete(id).await?;
    println!("deleted {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_inline_content() {
        let v = read_content(Some(r#"{"text": "hi"}"#), None).unwrap();
        assert_eq!(v, json!({"text": "hi"}));
    }

    #[test]
    fn test_read_file_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("page.json");
        std::fs::write(&path, r#"{"html": "<p>x</p>"}"#).unwrap();
        let v = read_content(None, Some(&path)).unwrap();
        assert_eq!(v["html"], "<p>x</p>");
    }

    #[test]
    fn test_read_content_requires_exactly_one_source() {
        assert!(read_content(None, None).is_err());
        assert!(read_content(Some("{}"), Some(Path::new("x.json"))).is_err());
        assert!(read_content(Some("{not json"), None).is_err());
    }
}
