//! `pagecheck check` and `pagecheck annotate`.
//!
//! `check` runs the configured fact checker on a piece of text. `annotate`
//! drives a full [`EditorSession`] round trip against the server: load the
//! page, fact-check the text, save.

use anyhow::Result;

use pagecheck_core::factcheck::FactCheckResult;

use crate::client::HttpPageStore;
use crate::config::Config;
use crate::factcheck::create_checker;
use crate::session::{EditorSession, NoticeLevel, SessionOptions};

fn print_verdict(result: &FactCheckResult) {
    let verdict = if result.is_factual {
        "factual"
    } else {
        "not factual"
    };
    println!(
        "{} ({}% confidence)",
        verdict,
        (result.confidence * 100.0).round()
    );
    println!("{}", result.explanation);
    if !result.sources.is_empty() {
        println!("sources: {}", result.sources.join(", "));
    }
}

pub async fn run_check(config: &Config, text: &str) -> Result<()> {
    let checker = create_checker(&config.fact_check)?;
    let result = checker.check(text).await?;
    print_verdict(&result);
    Ok(())
}

pub async fn run_annotate(config: &Config, id: &str, text: &str) -> Result<()> {
    let store = std::sync::Arc::new(HttpPageStore::from_config(&config.client)?);
    let checker = create_checker(&config.fact_check)?;
    let session = EditorSession::for_page(
        id,
        store,
        checker,
        SessionOptions::from_config(&config.editor),
    );

    session.load(id).await?;
    let annotation = session.request_fact_check(text).await?;
    let page = session.save().await?;

    for notice in session.take_notices() {
        if notice.level == NoticeLevel::Error {
            eprintln!("Warning: {}", notice.message);
        }
    }

    if let Some(fc) = &annotation.fact_check {
        println!(
            "{}: {} ({}% confidence)",
            annotation.id,
            if fc.is_factual { "factual" } else { "not factual" },
            fc.percent()
        );
        println!("{}", fc.explanation);
    }
    println!(
        "saved page {} with {} annotations",
        page.id,
        session.annotations().len()
    );
    Ok(())
}
