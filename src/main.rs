use anyhow::Result;
use bookwright::core::config::Config;
use bookwright::core::io::NativeStorage;
use bookwright::core::model::{Outline, ProgressSnapshot};
use bookwright::services::export::{export_book, ExportFormat};
use bookwright::services::llm::create_llm;
use bookwright::services::setup::run_setup;
use bookwright::services::workflow::WorkflowManager;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let storage = NativeStorage::new();
    let llm = create_llm(&config)?;
    let mut manager = WorkflowManager::new(&config, llm);

    // 1. Topic, parameters and a confirmed outline
    loop {
        let request = run_setup(&config, &storage).await?;
        println!("Generating outline...");
        match manager.generate_outline(&request.topic, request.params).await {
            Ok(outline) => print_outline(outline),
            Err(e) if config.unattended => return Err(e.into()),
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        }

        if config.unattended
            || Confirm::new("Generate the book from this outline?")
                .with_default(true)
                .prompt()?
        {
            break;
        }
        manager.discard_outline()?;
    }

    // 2. Sections, retrying from the same outline on failure
    let book = loop {
        let total = manager.outline().map(Outline::total_sections).unwrap_or(0);
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        let bar_task = tokio::spawn(follow_progress(manager.subscribe(), pb.clone()));

        let token = manager.cancellation_token();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping after the current section");
                token.cancel();
            }
        });

        let result = manager.generate_book().await;
        ctrl_c.abort();
        bar_task.abort();

        match result {
            Ok(book) => {
                pb.finish_with_message(format!("{} words", book.word_count()));
                break book;
            }
            Err(e) => {
                pb.abandon_with_message("stopped");
                eprintln!("{}", e);
                if config.unattended
                    || !Confirm::new("Retry from the confirmed outline?")
                        .with_default(true)
                        .prompt()?
                {
                    return Err(e.into());
                }
            }
        }
    };

    // 3. Export
    for format in [ExportFormat::Markdown, ExportFormat::Html] {
        let path = export_book(&book, format, &config.output_folder, &storage).await?;
        println!("Saved {}", path);
    }

    Ok(())
}

async fn follow_progress(mut rx: watch::Receiver<ProgressSnapshot>, pb: ProgressBar) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        pb.set_length(snapshot.progress.total as u64);
        pb.set_position(snapshot.progress.completed as u64);
        pb.set_message(format!(
            "{} ({} words)",
            snapshot.progress.task, snapshot.progress.word_count
        ));
    }
}

fn print_outline(outline: &Outline) {
    println!("\n{}\n", outline.title);
    println!("  {}", outline.introduction.title);
    for (i, chapter) in outline.chapters.iter().enumerate() {
        println!("  {}. {}", i + 1, chapter.title);
        for section in &chapter.sections {
            println!("     - {}", section);
        }
    }
    println!("  {}", outline.conclusion.title);
    println!(
        "\n{} chapters, {} sections\n",
        outline.chapters.len(),
        outline.total_sections()
    );
}
