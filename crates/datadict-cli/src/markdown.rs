//! Markdown to ratatui text conversion for copilot answers.
//!
//! Answers are markdown with embedded SQL. Fenced blocks without a language
//! and bare SQL answers are highlighted as SQL.

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Language assumed for unlabelled code.
const DEFAULT_CODE_LANG: &str = "sql";

/// Statement keywords that mark an answer as bare SQL.
const SQL_LEADS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP",
];

const THEME: &str = "base16-ocean.dark";

/// Convert copilot answer text to styled lines.
///
/// Code lines wider than `width` are cut with an ellipsis rather than wrapped.
pub fn render_markdown(text: &str, width: usize) -> Vec<Line<'static>> {
    if looks_like_sql(text) {
        let mut out = Vec::new();
        push_code_block(&mut out, text.trim(), DEFAULT_CODE_LANG, width);
        return out;
    }
    Renderer::new(width).run(text)
}

/// Whether `text` is a bare SQL statement rather than markdown.
#[must_use]
pub fn looks_like_sql(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with("```") {
        return false;
    }
    let first = trimmed
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    SQL_LEADS.iter().any(|kw| first.eq_ignore_ascii_case(kw))
}

// =============================================================================
// Highlighting
// =============================================================================

fn syntaxes() -> &'static SyntaxSet {
    static SET: OnceLock<SyntaxSet> = OnceLock::new();
    SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    static THEMES: OnceLock<ThemeSet> = OnceLock::new();
    let themes = THEMES.get_or_init(ThemeSet::load_defaults);
    &themes.themes[THEME]
}

fn to_style(style: syntect::highlighting::Style) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Highlight `code`, one span list per source line.
fn highlight(code: &str, lang: &str) -> Vec<Vec<Span<'static>>> {
    let set = syntaxes();
    let syntax = set
        .find_syntax_by_token(lang)
        .or_else(|| set.find_syntax_by_extension(lang))
        .unwrap_or_else(|| set.find_syntax_plain_text());
    let mut hl = HighlightLines::new(syntax, theme());

    LinesWithEndings::from(code)
        .map(|line| match hl.highlight_line(line, set) {
            Ok(ranges) => ranges
                .into_iter()
                .filter_map(|(style, piece)| {
                    let piece = piece.trim_end_matches(['\n', '\r']);
                    (!piece.is_empty()).then(|| Span::styled(piece.to_string(), to_style(style)))
                })
                .collect(),
            Err(_) => vec![Span::styled(
                line.trim_end_matches(['\n', '\r']).to_string(),
                Style::default().fg(Color::Yellow),
            )],
        })
        .collect()
}

/// Cut spans so their total character count fits `max`, marking the cut.
fn clip(spans: &[Span<'static>], max: usize) -> Vec<Span<'static>> {
    let total: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    if total <= max {
        return spans.to_vec();
    }

    let mut budget = max.saturating_sub(1);
    let mut out = Vec::new();
    for span in spans {
        if budget == 0 {
            break;
        }
        let len = span.content.chars().count();
        if len <= budget {
            out.push(span.clone());
            budget -= len;
        } else {
            let head: String = span.content.chars().take(budget).collect();
            out.push(Span::styled(head, span.style));
            budget = 0;
        }
    }
    out.push(Span::styled("…", Style::default().fg(Color::DarkGray)));
    out
}

/// Append a framed, highlighted code block.
fn push_code_block(out: &mut Vec<Line<'static>>, code: &str, lang: &str, width: usize) {
    let frame = Style::default().fg(Color::DarkGray);
    let rule = |n: usize| "─".repeat(n.min(44));

    out.push(Line::from(vec![
        Span::styled("╭─ ", frame),
        Span::styled(
            lang.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", rule(width.saturating_sub(lang.len() + 5))), frame),
    ]));

    let max_code = width.saturating_sub(4);
    for spans in highlight(code, lang) {
        let mut line = vec![Span::styled("│ ", frame)];
        line.extend(clip(&spans, max_code));
        out.push(Line::from(line));
    }

    out.push(Line::from(Span::styled(
        format!("╰{}", rule(width.saturating_sub(2))),
        frame,
    )));
}

// =============================================================================
// Markdown
// =============================================================================

/// Event-driven builder of styled lines.
struct Renderer {
    width: usize,
    out: Vec<Line<'static>>,
    line: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// `Some` while inside a code block: (language, content).
    code: Option<(String, String)>,
    /// One entry per open list: next number for ordered lists.
    lists: Vec<Option<u64>>,
    /// Cells of the table row being built.
    row: Option<Vec<String>>,
    in_table_head: bool,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            out: Vec::new(),
            line: Vec::new(),
            styles: vec![Style::default()],
            code: None,
            lists: Vec::new(),
            row: None,
            in_table_head: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn end_line(&mut self) {
        if !self.line.is_empty() {
            self.out.push(Line::from(std::mem::take(&mut self.line)));
        }
    }

    fn blank(&mut self) {
        self.end_line();
        if self.out.last().is_some_and(|l| l.spans.is_empty()) {
            return;
        }
        self.out.push(Line::default());
    }

    fn text(&mut self, text: &str) {
        if let Some((_, content)) = self.code.as_mut() {
            content.push_str(text);
            return;
        }
        if let Some(row) = self.row.as_mut() {
            if let Some(cell) = row.last_mut() {
                cell.push_str(text);
            }
            return;
        }

        let style = self.style();
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.end_line();
            }
            if !part.is_empty() {
                self.line.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn run(mut self, text: &str) -> Vec<Line<'static>> {
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
        for event in Parser::new_ext(text, options) {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(t) => self.text(&t),
                Event::Code(code) => {
                    if let Some(row) = self.row.as_mut() {
                        if let Some(cell) = row.last_mut() {
                            cell.push_str(&code);
                        }
                    } else {
                        self.line.push(Span::styled(
                            code.to_string(),
                            Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40)),
                        ));
                    }
                }
                Event::SoftBreak | Event::HardBreak => self.end_line(),
                Event::Rule => {
                    self.end_line();
                    self.out.push(Line::from(Span::styled(
                        "─".repeat(self.width.min(60)),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                _ => {}
            }
        }

        self.end_line();
        while self.out.last().is_some_and(|l| l.spans.is_empty()) {
            self.out.pop();
        }
        self.out
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                if !self.out.is_empty() {
                    self.blank();
                }
                let marker = match level {
                    HeadingLevel::H1 => "▌ ",
                    HeadingLevel::H2 => "▍ ",
                    _ => "▏ ",
                };
                self.line
                    .push(Span::styled(marker, Style::default().fg(Color::Magenta)));
                self.push_style(|s| s.fg(Color::Magenta).add_modifier(Modifier::BOLD));
            }
            Tag::BlockQuote(_) => {
                self.end_line();
                self.line
                    .push(Span::styled("┃ ", Style::default().fg(Color::Blue)));
                self.push_style(|s| s.fg(Color::Blue));
            }
            Tag::CodeBlock(kind) => {
                self.end_line();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        lang.split_whitespace().next().unwrap_or(DEFAULT_CODE_LANG).to_string()
                    }
                    _ => DEFAULT_CODE_LANG.to_string(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.end_line();
                self.lists.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let b = format!("{indent}{n}. ");
                        *n += 1;
                        b
                    }
                    _ => format!("{indent}• "),
                };
                self.line
                    .push(Span::styled(bullet, Style::default().fg(Color::Cyan)));
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { .. } => {
                self.push_style(|s| s.fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Tag::Table(_) => self.end_line(),
            Tag::TableHead => {
                self.in_table_head = true;
                self.row = Some(Vec::new());
            }
            Tag::TableRow => self.row = Some(Vec::new()),
            Tag::TableCell => {
                if let Some(row) = self.row.as_mut() {
                    row.push(String::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.end_line();
            }
            TagEnd::Paragraph => self.blank(),
            TagEnd::BlockQuote(_) | TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough
            | TagEnd::Link => self.pop_style(),
            TagEnd::CodeBlock => {
                if let Some((lang, content)) = self.code.take() {
                    push_code_block(&mut self.out, content.trim_end(), &lang, self.width);
                    self.blank();
                }
            }
            TagEnd::List(_) => {
                self.end_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.end_line(),
            TagEnd::TableHead | TagEnd::TableRow => {
                let header = std::mem::take(&mut self.in_table_head);
                if let Some(cells) = self.row.take() {
                    self.push_table_row(&cells, header);
                }
            }
            TagEnd::Table => self.blank(),
            _ => {}
        }
    }

    fn push_table_row(&mut self, cells: &[String], header: bool) {
        let frame = Style::default().fg(Color::DarkGray);
        let cell_style = if header {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut spans = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", frame));
            }
            spans.push(Span::styled(cell.trim().to_string(), cell_style));
        }
        self.out.push(Line::from(spans));

        if header {
            let width: usize = cells.iter().map(|c| c.trim().chars().count() + 3).sum();
            self.out.push(Line::from(Span::styled(
                "─".repeat(width.min(self.width)),
                frame,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn bare_sql_detection() {
        assert!(looks_like_sql("SELECT * FROM orders"));
        assert!(looks_like_sql("  with recent as (select 1) select * from recent"));
        assert!(!looks_like_sql("The orders table stores purchases."));
        assert!(!looks_like_sql("```sql\nSELECT 1\n```"));
        assert!(!looks_like_sql("Selection of tables"));
    }

    #[test]
    fn bare_sql_renders_as_code_block() {
        let lines = plain(&render_markdown("SELECT id\nFROM orders", 60));
        assert!(lines[0].starts_with("╭─ sql"));
        assert!(lines[1].starts_with("│ "));
        assert!(lines[1].contains("SELECT"));
        assert!(lines[2].contains("FROM orders"));
        assert!(lines.last().unwrap().starts_with('╰'));
    }

    #[test]
    fn unlabelled_fence_defaults_to_sql() {
        let lines = plain(&render_markdown("Try this:\n\n```\nSELECT 1\n```", 60));
        assert_eq!(lines[0], "Try this:");
        assert!(lines.iter().any(|l| l.starts_with("╭─ sql")));
    }

    #[test]
    fn long_code_lines_are_clipped() {
        let sql = format!("SELECT {}", "x".repeat(200));
        let lines = render_markdown(&sql, 40);
        let body: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(body.ends_with('…'));
        assert!(body.chars().count() <= 40);
    }

    #[test]
    fn lists_and_emphasis() {
        let lines = plain(&render_markdown("Tables:\n\n1. **orders**\n2. *customers*\n", 80));
        assert_eq!(lines[0], "Tables:");
        assert!(lines.contains(&"1. orders".to_string()));
        assert!(lines.contains(&"2. customers".to_string()));
    }

    #[test]
    fn tables_render_as_rows() {
        let md = "| Name | Type |\n|------|------|\n| email | VARCHAR |\n";
        let lines = plain(&render_markdown(md, 80));
        assert_eq!(lines[0], "Name │ Type");
        assert!(lines[1].starts_with('─'));
        assert_eq!(lines[2], "email │ VARCHAR");
    }

    #[test]
    fn streaming_prefix_renders() {
        // Partially streamed answers end mid-construct.
        let lines = render_markdown("The **orders", 80);
        assert!(!lines.is_empty());
        let lines = render_markdown("```sql\nSELECT", 80);
        assert!(!lines.is_empty());
    }
}
