use anyhow::{Context, Result};
use simple_translator::{
    DocumentAdapter, IntervalFrameClock, LanguageBundle, MemoryDocument, TranslationTable,
    Translator, TranslatorConfig,
};
use std::sync::Arc;
use tracing::info;

const AREA_HTML: &str = r#"<header>
<span translateId="HEADER_DESCRIPTION">Here goes page header!</span>
</header>
<div class="content" translateId="ABOUT_SECTION">Hello there, this is my about Page</div>
<footer translateId="FOOTER_CONTENTS">All rights reserved &copy; 2020</footer>"#;

fn current_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

fn demo_translations() -> TranslationTable {
    TranslationTable::new()
        .with_language(
            "en",
            LanguageBundle::new()
                .with("HEADER_DESCRIPTION", "Here goes page header!")
                .with("ABOUT_SECTION", "Hello there, this is my about Page.")
                .with_producer("FOOTER_CONTENTS", || {
                    format!("All rights reserved &copy; 2020 - Time: {}", current_time())
                }),
        )
        .with_language(
            "de",
            LanguageBundle::new()
                .with("HEADER_DESCRIPTION", "Hier geht der Seitenkopf!")
                .with("ABOUT_SECTION", "Hallo, das ist meine About-Seite.")
                .with_producer("FOOTER_CONTENTS", || {
                    format!("Alle Rechte vorbehalten &copy; 2020 - Zeit: {}", current_time())
                }),
        )
        .with_language(
            "rs",
            LanguageBundle::new()
                .with("HEADER_DESCRIPTION", "Ovde ide heder!")
                .with("ABOUT_SECTION", "Pozdrav, ovo je stranica o meni.")
                .with_producer("FOOTER_CONTENTS", || {
                    format!("Sva prava zadrzana &copy 2020 - Vreme: {}", current_time())
                }),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simple_translator=info".parse()?),
        )
        .init();

    let config = TranslatorConfig::from_env()?;
    let sections: usize = std::env::var("DEMO_SECTIONS")
        .ok()
        .map(|v| v.parse::<usize>().context("DEMO_SECTIONS must be a number"))
        .transpose()?
        .unwrap_or(100);

    let translations = match std::env::var("TRANSLATIONS_FILE") {
        Ok(path) => TranslationTable::from_json_file(path)?,
        Err(_) => demo_translations(),
    };

    info!("Generating {} sections", sections);
    let document = Arc::new(MemoryDocument::new());
    for _ in 0..sections {
        document.append_markup(AREA_HTML);
    }

    let translator = Translator::new(
        &config,
        translations.clone(),
        document.clone(),
        Arc::new(IntervalFrameClock::new(config.frame_interval)),
    )?;

    info!("Reloading elements");
    translator.rescan();

    if let Some(task) = translator.on_document_ready()? {
        task.await.context("Initial render pass failed")?;
    }

    for language in translations.languages() {
        let report = translator
            .set_language(Some(language))?
            .await
            .context("Render pass failed")?;
        info!(
            "Rendered '{}' in {} batches ({} elements)",
            language, report.batches, report.total
        );

        if let Some(first) = document
            .marked_elements(translator.marker_attribute())
            .first()
        {
            info!("First element now reads: {}", document.content(first.id)?);
        }
    }

    println!("{}", serde_json::to_string_pretty(&translator.metrics())?);
    Ok(())
}
