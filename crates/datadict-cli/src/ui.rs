//! UI rendering with ratatui.
//!
//! Two-column layout: sources and tables on the left, the selected table's
//! details above the copilot on the right, with a header bar on top and a
//! status bar below.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};
use ratatui::Frame;

use chrono::NaiveDateTime;
use datadict_client::{ColumnInfo, DbType, SchemaTable};
use datadict_copilot::{QueryMode, SessionSnapshot};

use crate::app::{App, InputMode};
use crate::markdown::render_markdown;

/// Horizontal padding for chat content.
const CHAT_PADDING: u16 = 2;

/// Columns listed in the table detail pane before "+N more".
const DETAIL_COLUMNS: usize = 10;

/// Columns shown in the quality snapshot.
const DETAIL_METRICS: usize = 5;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let snapshot = app.session.snapshot();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Min(5),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header_bar(frame, app, main_layout[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(main_layout[1]);

    let left_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(content_layout[0]);

    render_sources_panel(frame, app, left_layout[0]);
    render_tables_panel(frame, app, left_layout[1]);

    if let Some(table) = app.selected_table() {
        let right_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(content_layout[1]);
        render_table_detail(frame, table, right_layout[0]);
        render_copilot_column(frame, app, &snapshot, right_layout[1]);
    } else {
        render_copilot_column(frame, app, &snapshot, content_layout[1]);
    }
    render_status_bar(frame, app, &snapshot, main_layout[2]);

    match app.input_mode {
        InputMode::CreatingSource => render_create_source_dialog(frame, app, area),
        InputMode::ConfirmingDelete => render_confirm_delete_dialog(frame, app, area),
        InputMode::FilteringTables => render_filter_dialog(frame, app, area),
        InputMode::Normal => {}
    }
}

/// Truncate a string in the middle with ellipsis if it exceeds `max_len` characters.
fn truncate_middle(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        return s.to_string();
    }
    if max_len < 5 {
        return s.chars().take(max_len).collect();
    }
    let keep = (max_len - 3) / 2;
    let start: String = s.chars().take(keep).collect();
    let end: String = s.chars().skip(len - keep).collect();
    format!("{start}...{end}")
}

fn width_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Render the header bar with title, counters, and API status.
fn render_header_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (status_text, status_style) = if app.refresh_error.is_some() {
        ("disconnected", Style::default().fg(Color::Red))
    } else {
        ("connected", Style::default().fg(Color::Green))
    };

    let title = "DATADICT AI";
    let stats = app.stats.as_ref().map_or_else(String::new, |s| {
        format!(
            "  {} sources · {} tables · {} PII cols · health {:.1}%",
            s.sources, s.tables, s.pii_columns, s.health_score
        )
    });

    let max_url_width = (area.width as usize / 3).saturating_sub(15);
    let display_url = truncate_middle(app.api_url(), max_url_width);
    let right_len = display_url.chars().count() + status_text.len() + 3;
    let used = title.len() + stats.chars().count() + right_len;

    let line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(stats, Style::default().fg(Color::White)),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::raw(display_url),
        Span::raw(" ["),
        Span::styled(status_text, status_style),
        Span::raw("]"),
    ]);

    let header = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Render the source list.
fn render_sources_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Sources ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let items: Vec<ListItem> = app
        .sources
        .iter()
        .map(|source| {
            let kind_style = match source.kind() {
                Some(DbType::Postgres) => Style::default().fg(Color::Blue),
                Some(DbType::Mysql) => Style::default().fg(Color::Yellow),
                Some(DbType::Snowflake) => Style::default().fg(Color::Cyan),
                Some(DbType::Mssql) => Style::default().fg(Color::Red),
                None => Style::default().fg(Color::Gray),
            };
            ListItem::new(Line::from(vec![
                Span::raw(source.name.clone()),
                Span::styled(format!(" {}", source.db_type), kind_style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_source);

    frame.render_stateful_widget(list, area, &mut state);

    if app.sources.is_empty() {
        let inner = Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2), 1);
        let hint = Paragraph::new("No sources. Esc then n to add one.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, inner);
    }
}

/// Render the tables of the selected source that pass the filter.
fn render_tables_panel(frame: &mut Frame, app: &App, area: Rect) {
    let tables = app.filtered_tables();

    let mut title = app
        .selected_source()
        .map_or_else(|| " Tables".to_string(), |s| format!(" Tables: {}", s.name));
    if !app.table_filter.is_empty() {
        title.push_str(&format!(" ({}/{}) /{}", tables.len(), app.tables.len(), app.table_filter));
    }
    title.push(' ');

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let items: Vec<ListItem> = tables
        .iter()
        .map(|table| {
            let mut spans = vec![
                Span::raw(table.qualified_name()),
                Span::styled(
                    format!(" {} cols", table.columns.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            let sensitive = table.sensitive_columns();
            if sensitive > 0 {
                spans.push(Span::styled(
                    format!(" PII:{sensitive}"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.selected_table);

    frame.render_stateful_widget(list, area, &mut state);
}

/// Render summary, columns, and quality snapshot of one table.
fn render_table_detail(frame: &mut Frame, table: &SchemaTable, area: Rect) {
    let mut title = format!(" {} ", table.qualified_name());
    if let Some(updated_at) = table.updated_at {
        let now = chrono::Utc::now().naive_utc();
        title.push_str(&format!("· synced {} ", format_age(updated_at, now)));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(inner);

    let column_width = (layout[0].width as usize).saturating_sub(1) / 2;
    let overview = Paragraph::new(Text::from(table_overview_lines(table, column_width)))
        .wrap(Wrap { trim: false });
    frame.render_widget(overview, layout[0]);

    let quality = Paragraph::new(Text::from(quality_lines(table, layout[1].width as usize)))
        .block(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(quality, layout[1]);
}

fn section_heading(label: String) -> Line<'static> {
    Line::from(Span::styled(
        label,
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
    ))
}

/// Summary and the first columns, two per line.
fn table_overview_lines(table: &SchemaTable, column_width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![section_heading("AI SUMMARY".to_string())];
    let summary = table
        .ai_summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    lines.push(match summary {
        Some(summary) => Line::from(Span::styled(
            summary.to_string(),
            Style::default().fg(Color::White),
        )),
        None => Line::from(Span::styled(
            "No summary available.",
            Style::default().fg(Color::DarkGray),
        )),
    });
    lines.push(Line::from(""));

    lines.push(section_heading(format!("COLUMNS ({})", table.columns.len())));
    let shown = &table.columns[..table.columns.len().min(DETAIL_COLUMNS)];
    for pair in shown.chunks(2) {
        let mut spans = column_cell(&pair[0], column_width);
        if let Some(second) = pair.get(1) {
            spans.push(Span::raw(" "));
            spans.extend(column_cell(second, column_width));
        }
        lines.push(Line::from(spans));
    }
    if table.columns.len() > DETAIL_COLUMNS {
        lines.push(Line::from(Span::styled(
            format!("+ {} more columns", table.columns.len() - DETAIL_COLUMNS),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// One column as `name type [TAGS]`, padded to `width`.
fn column_cell(column: &ColumnInfo, width: usize) -> Vec<Span<'static>> {
    let tags = if column.is_sensitive() {
        format!(" [{}]", column.tags.join(","))
    } else {
        String::new()
    };
    let name_width = width.saturating_sub(column.data_type.chars().count() + tags.chars().count() + 1);
    let name = truncate_middle(&column.name, name_width.max(4));
    let used = name.chars().count() + 1 + column.data_type.chars().count() + tags.chars().count();

    vec![
        Span::styled(name, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(column.data_type.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled(tags, Style::default().fg(Color::Red)),
        Span::raw(" ".repeat(width.saturating_sub(used))),
    ]
}

/// Fill rate per profiled column, as a percentage and a bar.
fn quality_lines(table: &SchemaTable, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![section_heading(" QUALITY".to_string())];
    let rates = table.fill_rates();
    if rates.is_empty() {
        lines.push(Line::from(Span::styled(
            " Not profiled yet.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    let bar_width = width.saturating_sub(3).max(1);
    for (column, fill) in rates.into_iter().take(DETAIL_METRICS) {
        let label = truncate_middle(&column, width.saturating_sub(13).max(4));
        lines.push(Line::from(vec![
            Span::styled(format!(" {label}"), Style::default().fg(Color::White)),
            Span::styled(format!(" {fill:.1}% fill"), Style::default().fg(Color::DarkGray)),
        ]));
        let filled = bar_cells(fill, bar_width);
        lines.push(Line::from(vec![
            Span::raw(" "),
            Span::styled("█".repeat(filled), Style::default().fg(Color::Blue)),
            Span::styled(
                "░".repeat(bar_width - filled),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    lines
}

/// Number of filled cells for a percentage in a bar of `width` cells.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_cells(percent: f64, width: usize) -> usize {
    let cells = (percent.clamp(0.0, 100.0) / 100.0 * f64::from(width_u16(width))).round();
    (cells as usize).min(width)
}

/// Coarse age of a timestamp relative to `now`.
fn format_age(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let age = now.signed_duration_since(at);
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}d ago", age.num_days())
    }
}

/// Render the right column containing the transcript and input.
fn render_copilot_column(frame: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let title = format!(" Copilot [{}] ", snapshot.mode.label());

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Transcript
            Constraint::Length(1), // Separator line
            Constraint::Length(1), // Input line
        ])
        .split(inner_area);

    let chat_area_full = inner_layout[0];
    let chat_area = Rect::new(
        chat_area_full.x + CHAT_PADDING,
        chat_area_full.y,
        chat_area_full.width.saturating_sub(CHAT_PADDING * 2 + 1),
        chat_area_full.height,
    );

    let text = Text::from(transcript_lines(app, snapshot, chat_area.width as usize));
    let visible_lines = chat_area.height as usize;
    let total_wrapped_lines = calculate_wrapped_line_count(&text, chat_area.width as usize);

    // chat_scroll counts lines up from the bottom.
    let max_scroll = total_wrapped_lines.saturating_sub(visible_lines);
    let effective_scroll = app.chat_scroll.min(max_scroll);
    let scroll_offset = max_scroll.saturating_sub(effective_scroll);

    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .scroll((width_u16(scroll_offset), 0));
    frame.render_widget(paragraph, chat_area);

    if total_wrapped_lines > visible_lines {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(total_wrapped_lines)
            .position(scroll_offset)
            .viewport_content_length(visible_lines);
        frame.render_stateful_widget(scrollbar, chat_area_full, &mut scrollbar_state);
    }

    render_input_line(frame, app, snapshot, inner_layout[1], inner_layout[2]);
}

/// Build the transcript as styled lines.
fn transcript_lines(app: &App, snapshot: &SessionSnapshot, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let last = snapshot.turns.len().saturating_sub(1);

    for (i, turn) in snapshot.turns.iter().enumerate() {
        if turn.is_user() {
            lines.push(Line::from(vec![
                Span::styled(
                    "[You] ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(turn.content.clone(), Style::default().fg(Color::White)),
            ]));
        } else {
            lines.push(Line::from(Span::styled(
                "[Copilot]",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            lines.extend(render_markdown(&turn.content, width));
            if snapshot.streaming && i == last {
                lines.push(Line::from(Span::styled(
                    "▌",
                    Style::default().fg(Color::Green),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    if snapshot.busy {
        lines.push(Line::from(Span::styled(
            "[Copilot]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(vec![
            Span::styled(app.spinner_char(), Style::default().fg(Color::Yellow)),
            Span::styled(" thinking...", Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines
}

/// Render the input line at the bottom of the copilot column.
fn render_input_line(
    frame: &mut Frame,
    app: &App,
    snapshot: &SessionSnapshot,
    separator_area: Rect,
    input_area: Rect,
) {
    let separator = Paragraph::new("─".repeat(separator_area.width as usize))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, separator_area);

    let in_modal = app.input_mode != InputMode::Normal;
    let prompt = if app.command_mode { ": " } else { "> " };
    let input_text = if in_modal { "" } else { app.input.as_str() };

    let placeholder = app.input.is_empty() && !in_modal && !app.command_mode;
    let body = if placeholder {
        Span::styled(
            match snapshot.mode {
                QueryMode::Structured => "Describe the query you need, e.g. top customers by revenue",
                QueryMode::Conversational => {
                    "Ask about your schema, e.g. which table contains customer contact information?"
                }
            },
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::styled(input_text.to_string(), Style::default().fg(Color::White))
    };

    let input_line = Line::from(vec![
        Span::styled(
            prompt,
            Style::default().fg(if app.command_mode { Color::DarkGray } else { Color::Cyan }),
        ),
        body,
    ]);
    frame.render_widget(Paragraph::new(input_line), input_area);

    if !in_modal && !app.command_mode && !snapshot.streaming {
        frame.set_cursor_position((
            input_area.x + width_u16(prompt.len() + app.cursor_position),
            input_area.y,
        ));
    }
}

/// Render the status bar.
fn render_status_bar(frame: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let mode_badge = match snapshot.mode {
        QueryMode::Structured => {
            Span::styled(" SQL ", Style::default().fg(Color::Black).bg(Color::Blue))
        }
        QueryMode::Conversational => {
            Span::styled(" CHAT ", Style::default().fg(Color::Black).bg(Color::Magenta))
        }
    };
    let input_badge = if app.command_mode {
        Span::styled(" CMD ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" INSERT ", Style::default().fg(Color::Black).bg(Color::Green))
    };

    let mut spans = vec![mode_badge, input_badge];

    if let Some(ref error) = app.error_message {
        spans.push(Span::styled(" ERROR: ", Style::default().fg(Color::Red).bold()));
        spans.push(Span::styled(error.clone(), Style::default().fg(Color::Red)));
    } else if let Some(ref refresh_error) = app.refresh_error {
        spans.push(Span::styled(" ⚠ ", Style::default().fg(Color::Yellow).bold()));
        spans.push(Span::styled(refresh_error.clone(), Style::default().fg(Color::Yellow)));
    } else if let Some(ref status) = app.status_message {
        spans.push(Span::styled(format!(" {status}"), Style::default().fg(Color::Green)));
    } else if app.command_mode {
        for (key, label) in [
            ("q", "quit "),
            ("m", "mode "),
            ("r", "reset "),
            ("n", "new "),
            ("d", "delete "),
            ("s/S", "sync/all "),
            ("e", "export "),
            ("/", "filter "),
            ("j/k", "scroll"),
        ] {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(format!(":{label}")));
        }
    } else {
        spans.extend([
            Span::raw(" "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":send "),
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::raw(":source "),
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(":table "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":commands"),
        ]);
    }

    let status_bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

/// Render the new source dialog.
fn render_create_source_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog_width = 90.min(area.width.saturating_sub(4));
    let dialog_height = 12.min(area.height.saturating_sub(4));

    let dialog_area = Rect::new(
        area.x + (area.width.saturating_sub(dialog_width)) / 2,
        area.y + (area.height.saturating_sub(dialog_height)) / 2,
        dialog_width,
        dialog_height,
    );

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Register Source ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Label
            Constraint::Length(3), // Input box
            Constraint::Length(4), // URL examples
            Constraint::Length(1), // Help text
        ])
        .split(inner);

    let label = Paragraph::new("Enter: <name> <db_type> <connection-url>")
        .style(Style::default().fg(Color::White));
    frame.render_widget(label, layout[0]);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(input_block);
    frame.render_widget(input, layout[1]);

    let examples: Vec<Line> = DbType::ALL
        .iter()
        .map(|db| {
            Line::from(vec![
                Span::styled(format!("{:<10}", db.as_str()), Style::default().fg(Color::Cyan)),
                Span::styled(db.placeholder(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(examples), layout[2]);

    let help = Paragraph::new("Press Enter to register, Esc to cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, layout[3]);

    frame.set_cursor_position((
        layout[1].x + width_u16(app.cursor_position) + 1,
        layout[1].y + 1,
    ));
}

/// Render the confirm delete dialog.
fn render_confirm_delete_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog_area = centered_rect(50, 25, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Confirm Delete ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let (name, registered) = app.selected_source().map_or(("?".to_string(), None), |s| {
        (
            s.name.clone(),
            s.created_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
        )
    });

    let mut lines = vec![Line::from(format!("Delete source '{name}'?"))];
    if let Some(registered) = registered {
        lines.push(Line::from(Span::styled(
            format!("Registered {registered}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.extend([
        Line::from(""),
        Line::from("All extracted metadata for this source will be removed."),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", Style::default().fg(Color::Red).bold()),
            Span::raw(" Yes  "),
            Span::styled("[n]", Style::default().fg(Color::Green).bold()),
            Span::raw(" No"),
        ]),
    ]);

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, inner);
}

/// Render the table filter prompt.
fn render_filter_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 6.min(area.height.saturating_sub(2));

    let dialog_area = Rect::new(
        area.x + (area.width.saturating_sub(dialog_width)) / 2,
        area.y + (area.height.saturating_sub(dialog_height)) / 2,
        dialog_width,
        dialog_height,
    );

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Filter Tables ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Input box
            Constraint::Length(1), // Help text
        ])
        .split(inner);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(input, layout[0]);

    let help = Paragraph::new("Matches table names and summaries. Empty clears, Esc cancels.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, layout[1]);

    frame.set_cursor_position((
        layout[0].x + width_u16(app.cursor_position) + 1,
        layout[0].y + 1,
    ));
}

/// Calculate the number of visual lines after text wrapping.
fn calculate_wrapped_line_count(text: &Text, available_width: usize) -> usize {
    if available_width == 0 {
        return text.lines.len();
    }

    text.lines
        .iter()
        .map(|line| line.width().div_ceil(available_width).max(1))
        .sum()
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
