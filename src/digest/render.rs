//! Digest rendering in Markdown or HTML.

use minijinja::{context, Environment};
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;

use crate::config::OutputFormat;
use crate::digest::aggregate::Aggregate;
use crate::models::{Paper, RunSummary};

const TEMPLATE_NAME: &str = "unread-papers.md";

const MARKDOWN_TEMPLATE: &str = r#"# Google Scholar Alert Digest

**Date**: {{ date }}
**Unread emails**: {{ unread_emails }}
**Paper titles**: {{ total_papers }}
**Uniq paper titles**: {{ uniq_papers }}
{% for entry in papers %}
 - [{{ entry.paper.title }}]({{ entry.paper.url }}) ({{ entry.count }})
{%- if entry.paper.abstract.full %}
   <details>
    <summary>{{ entry.paper.abstract.first_line }}</summary>{{ entry.paper.abstract.rest_lines }}
   </details>
{%- endif %}
{%- endfor %}
"#;

/// Template failures mean the template and its context disagree
#[derive(Debug, thiserror::Error)]
#[error("digest template execution failed: {0}")]
pub struct RenderError(#[from] minijinja::Error);

#[derive(Debug, Serialize)]
struct Entry<'a> {
    paper: &'a Paper,
    count: usize,
}

/// Render the digest in the requested format.
pub fn render(
    summary: &RunSummary,
    aggregate: &Aggregate,
    format: OutputFormat,
) -> Result<String, RenderError> {
    let markdown = render_markdown(summary, aggregate)?;
    Ok(match format {
        OutputFormat::Markdown => markdown,
        OutputFormat::Html => markdown_to_html(&markdown),
    })
}

/// Render the Markdown digest, papers ordered by descending count.
pub fn render_markdown(summary: &RunSummary, aggregate: &Aggregate) -> Result<String, RenderError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(TEMPLATE_NAME, MARKDOWN_TEMPLATE)?;

    let papers: Vec<Entry> = aggregate
        .sorted()
        .into_iter()
        .map(|(paper, count)| Entry { paper, count })
        .collect();

    let template = env.get_template(TEMPLATE_NAME)?;
    let report = template.render(context! {
        date => summary.date(),
        unread_emails => summary.unread_emails,
        total_papers => summary.total_papers,
        uniq_papers => summary.unique_papers,
        papers => papers,
    })?;
    Ok(report)
}

/// Convert Markdown to HTML and wrap it in a minimal document.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut content = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut content, parser);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n  <head><meta charset=\"UTF-8\"></head>\n  <body>{}</body>\n</html>\n",
        content
    )
}
