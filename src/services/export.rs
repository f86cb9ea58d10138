use anyhow::Result;
use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use regex::Regex;
use std::path::Path;

use crate::core::io::Storage;
use crate::core::locale;
use crate::core::model::{GeneratedBook, SectionContent};
use crate::utils::text::slugify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }

    pub fn render(&self, book: &GeneratedBook) -> String {
        match self {
            ExportFormat::Markdown => render_markdown(book),
            ExportFormat::Html => render_html(book),
        }
    }
}

/// `[text](url)` becomes `text`.
pub fn strip_markdown_links(line: &str) -> String {
    match Regex::new(r"\[([^\]]*)\]\(([^)]*)\)") {
        Ok(re) => re.replace_all(line, "$1").into_owned(),
        Err(e) => {
            log::warn!("Could not build link pattern: {}", e);
            line.to_string()
        }
    }
}

fn push_md_section(out: &mut String, level: &str, section: &SectionContent) {
    out.push_str(&format!("{} {}\n\n", level, section.title));
    if !section.text.is_empty() {
        out.push_str(section.text.trim());
        out.push_str("\n\n");
    }
}

pub fn render_markdown(book: &GeneratedBook) -> String {
    markdown_body(book, false)
}

fn markdown_body(book: &GeneratedBook, plain_references: bool) -> String {
    let s = locale::strings(book.language);
    let mut out = format!("# {}\n\n", book.title);

    push_md_section(&mut out, "##", &book.introduction);
    for (i, chapter) in book.chapters.iter().enumerate() {
        out.push_str(&format!("## {} {}: {}\n\n", s.chapter, i + 1, chapter.title));
        for section in &chapter.sections {
            push_md_section(&mut out, "###", section);
        }
    }
    push_md_section(&mut out, "##", &book.conclusion);

    if !book.references.is_empty() {
        out.push_str(&format!("## {}\n\n", s.references));
        for reference in &book.references {
            if plain_references {
                out.push_str(&strip_markdown_links(reference));
            } else {
                out.push_str(reference);
            }
            out.push_str("\n\n");
        }
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

/// Markdown to HTML. Raw HTML in the model's text is shown as text.
fn markdown_to_html(md: &str) -> String {
    let parser = Parser::new_ext(md, Options::empty()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(md.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    html::push_html(&mut out, std::iter::once(Event::Text(CowStr::from(text))));
    out
}

pub fn render_html(book: &GeneratedBook) -> String {
    let mut out = format!(
        "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
        book.language.code(),
        escape_text(&book.title)
    );
    out.push_str(&markdown_to_html(&markdown_body(book, true)));
    out.push_str("</body>\n</html>\n");
    out
}

/// Writes the rendered book to `<folder>/<slug>.<ext>`, adding `-2`, `-3`...
/// when the name is taken. Returns the path written.
pub async fn export_book(
    book: &GeneratedBook,
    format: ExportFormat,
    folder: &str,
    storage: &dyn Storage,
) -> Result<String> {
    let slug = slugify(&book.title);
    let ext = format.extension();
    let folder = Path::new(folder);

    let mut path = folder.join(format!("{}.{}", slug, ext)).to_string_lossy().to_string();
    let mut n = 2;
    while storage.exists(&path).await? {
        path = folder.join(format!("{}-{}.{}", slug, n, ext)).to_string_lossy().to_string();
        n += 1;
    }

    storage.write(&path, format.render(book).as_bytes()).await?;
    log::info!("Exported {} ({} words) to {}", book.title, book.word_count(), path);
    Ok(path)
}
