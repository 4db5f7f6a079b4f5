// ABOUTME: Converts fetched block trees and page properties to Markdown
// ABOUTME: Depth-aware block rendering, table grids, and YAML frontmatter assembly

use crate::api::ApiClient;
use crate::model::{Block, BlockKind, Icon, Page, PropertyValue, RichText};
use crate::properties::{extract_title, serialize_property};
use crate::util::to_snake_case;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde_json::{json, Map, Value};

// ──────────────────────────────────────────────
// Rich text → inline markdown
// ──────────────────────────────────────────────

/// Render annotated runs to one inline string. Each run is wrapped
/// independently, in fixed order: code, bold, italic, strikethrough, then
/// the link around the styled result. Markdown-special characters in the
/// source text are not escaped.
pub fn render_rich_text(runs: &[RichText]) -> String {
    runs.iter()
        .map(|run| {
            let mut text = run.plain_text.clone();
            let a = &run.annotations;
            if a.code {
                text = format!("`{}`", text);
            }
            if a.bold {
                text = format!("**{}**", text);
            }
            if a.italic {
                text = format!("_{}_", text);
            }
            if a.strikethrough {
                text = format!("~~{}~~", text);
            }
            if let Some(href) = &run.href {
                text = format!("[{}]({})", text, href);
            }
            text
        })
        .collect()
}

// ──────────────────────────────────────────────
// Blocks → markdown
// ──────────────────────────────────────────────

/// Render a block sequence at the given nesting depth; blocks joined by
/// newlines, blank renders filtered out.
pub fn render_blocks(blocks: &[Block], depth: usize) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        if let Some(md) = render_block(block, depth) {
            if !md.is_empty() {
                lines.push(md);
            }
        }
    }
    lines.join("\n")
}

fn with_children(line: String, children: &[Block], depth: usize) -> String {
    if children.is_empty() {
        return line;
    }
    let child_md = render_blocks(children, depth);
    if child_md.is_empty() {
        line
    } else if line.is_empty() {
        child_md
    } else {
        format!("{}\n{}", line, child_md)
    }
}

fn render_block(block: &Block, depth: usize) -> Option<String> {
    let indent = "  ".repeat(depth);
    let children = &block.children;

    match &block.kind {
        BlockKind::Paragraph { paragraph } => {
            let text = render_rich_text(&paragraph.rich_text);
            let line = if text.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, text)
            };
            Some(with_children(line, children, depth + 1))
        }

        // Headings are never indented; nested content renders after them.
        BlockKind::Heading1 { heading_1 } => Some(with_children(
            format!("# {}", render_rich_text(&heading_1.rich_text)),
            children,
            depth + 1,
        )),
        BlockKind::Heading2 { heading_2 } => Some(with_children(
            format!("## {}", render_rich_text(&heading_2.rich_text)),
            children,
            depth + 1,
        )),
        BlockKind::Heading3 { heading_3 } => Some(with_children(
            format!("### {}", render_rich_text(&heading_3.rich_text)),
            children,
            depth + 1,
        )),

        BlockKind::BulletedListItem { bulleted_list_item } => Some(with_children(
            format!("{}- {}", indent, render_rich_text(&bulleted_list_item.rich_text)),
            children,
            depth + 1,
        )),
        BlockKind::NumberedListItem { numbered_list_item } => Some(with_children(
            format!("{}1. {}", indent, render_rich_text(&numbered_list_item.rich_text)),
            children,
            depth + 1,
        )),
        BlockKind::ToDo { to_do } => {
            let check = if to_do.checked { "[x]" } else { "[ ]" };
            Some(with_children(
                format!("{}- {} {}", indent, check, render_rich_text(&to_do.rich_text)),
                children,
                depth + 1,
            ))
        }
        BlockKind::Toggle { toggle } => Some(with_children(
            format!("{}**{}**", indent, render_rich_text(&toggle.rich_text)),
            children,
            depth + 1,
        )),
        BlockKind::Quote { quote } => Some(with_children(
            format!("{}> {}", indent, render_rich_text(&quote.rich_text)),
            children,
            depth + 1,
        )),

        // Callout children are intentionally not rendered.
        BlockKind::Callout { callout } => {
            let emoji = match &callout.icon {
                Some(Icon::Emoji { emoji }) => format!("{} ", emoji),
                _ => String::new(),
            };
            Some(format!("{}> {}{}", indent, emoji, render_rich_text(&callout.rich_text)))
        }

        BlockKind::Code { code } => Some(format!(
            "```{}\n{}\n```",
            code.language,
            render_rich_text(&code.rich_text)
        )),
        BlockKind::Divider => Some("---".to_string()),
        BlockKind::Equation { equation } => Some(format!("$${}$$", equation.expression)),

        BlockKind::Image { image } => {
            let caption = if image.caption.is_empty() {
                "image".to_string()
            } else {
                render_rich_text(&image.caption)
            };
            Some(format!("{}![{}]({})", indent, caption, image.source.url()))
        }
        BlockKind::Video { video } => {
            Some(format!("{}[video]({})", indent, video.source.url()))
        }
        BlockKind::File { file } => {
            let name = file.name.as_deref().unwrap_or("file");
            Some(format!("{}[{}]({})", indent, name, file.source.url()))
        }
        BlockKind::Pdf { pdf } => Some(format!("{}[PDF]({})", indent, pdf.source.url())),

        BlockKind::Bookmark { bookmark } => {
            Some(format!("{}[{}]({})", indent, bookmark.url, bookmark.url))
        }
        BlockKind::Embed { embed } => {
            Some(format!("{}[{}]({})", indent, embed.url, embed.url))
        }
        BlockKind::LinkPreview { link_preview } => {
            Some(format!("{}[{}]({})", indent, link_preview.url, link_preview.url))
        }

        BlockKind::ChildPage { child_page } => {
            Some(format!("{}_📄 {}_", indent, child_page.title))
        }
        BlockKind::ChildDatabase { child_database } => {
            Some(format!("{}_🗄️ {}_", indent, child_database.title))
        }

        BlockKind::Table { table } => {
            let rows: Vec<&Block> = children
                .iter()
                .filter(|c| matches!(c.kind, BlockKind::TableRow { .. }))
                .collect();
            if rows.is_empty() {
                None
            } else {
                Some(render_table(&rows, table.has_column_header))
            }
        }
        // Consumed by the parent table block.
        BlockKind::TableRow { .. } => None,

        // Transparent containers: only their children, at the same depth.
        BlockKind::ColumnList | BlockKind::Column | BlockKind::SyncedBlock => {
            if children.is_empty() {
                None
            } else {
                Some(render_blocks(children, depth))
            }
        }

        BlockKind::Breadcrumb
        | BlockKind::TableOfContents
        | BlockKind::Template
        | BlockKind::LinkToPage
        | BlockKind::Unsupported
        | BlockKind::Unknown => None,
    }
}

fn render_table(rows: &[&Block], has_header: bool) -> String {
    let parsed: Vec<Vec<String>> = rows
        .iter()
        .map(|row| match &row.kind {
            BlockKind::TableRow { table_row } => {
                table_row.cells.iter().map(|cell| render_rich_text(cell)).collect()
            }
            _ => Vec::new(),
        })
        .collect();

    if parsed.is_empty() {
        return String::new();
    }

    let col_count = parsed.iter().map(Vec::len).max().unwrap_or(0);

    let render_row = |cells: &Vec<String>| -> String {
        let padded: Vec<String> = (0..col_count)
            .map(|i| format!(" {} ", cells.get(i).map(String::as_str).unwrap_or("")))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut lines = Vec::new();
    if has_header {
        lines.push(render_row(&parsed[0]));
        lines.push(format!("|{}|", vec![" --- "; col_count].join("|")));
        lines.extend(parsed[1..].iter().map(render_row));
    } else {
        lines.extend(parsed.iter().map(render_row));
    }

    lines.join("\n")
}

// ──────────────────────────────────────────────
// Frontmatter + document assembly
// ──────────────────────────────────────────────

/// Build the YAML frontmatter block: title first, then every non-title
/// property (snake-cased, nulls skipped), fixed source fields, and any
/// caller-supplied extras merged last.
pub fn build_frontmatter(
    page: &Page,
    extra: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut data = Map::new();
    data.insert("title".into(), json!(extract_title(&page.properties)));

    for (name, prop) in &page.properties {
        if matches!(prop, PropertyValue::Title { .. }) {
            continue;
        }
        let value = serialize_property(prop);
        if value.is_null() {
            continue;
        }
        data.insert(to_snake_case(name), value);
    }

    data.insert("notion_id".into(), json!(page.id));
    data.insert("notion_url".into(), json!(page.url));
    data.insert(
        "last_synced".into(),
        json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    for (key, value) in extra {
        data.insert(key.clone(), value.clone());
    }

    let yaml = serde_yaml::to_string(&data).map_err(|e| {
        Error::Sync(format!("Failed to serialize frontmatter: {}", e))
    })?;

    Ok(format!("---\n{}---\n", yaml))
}

/// Fetch and render a page body. Any fetch or render failure degrades to an
/// empty body; a single page never aborts the batch.
pub async fn page_body_markdown(client: &ApiClient, page_id: &str) -> String {
    match client.fetch_block_tree(page_id).await {
        Ok(blocks) => render_blocks(&blocks, 0),
        Err(err) => {
            warn!("Failed to convert page body for {}: {}", page_id, err);
            String::new()
        }
    }
}

/// Assemble the full output document: frontmatter, `# title` heading
/// (omitted when the title is empty), then the rendered body.
pub async fn page_to_markdown(client: &ApiClient, page: &Page) -> Result<String> {
    let title = extract_title(&page.properties);
    let body = page_body_markdown(client, &page.id).await;
    let frontmatter = build_frontmatter(page, &Map::new(), Utc::now())?;
    let heading = if title.is_empty() {
        String::new()
    } else {
        format!("# {}\n\n", title)
    };
    Ok(format!("{}\n{}{}", frontmatter, heading, body))
}
