//! DataDict CLI - terminal dashboard with the AI Copilot.
//!
//! This is the entry point for the `ddai` binary.

mod app;
mod markdown;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use datadict_client::{ClientConfig, DashboardClient};
use datadict_copilot::{CopilotConfig, PartialFailurePolicy, QueryMode, SessionController};

use app::{App, InputMode, REFRESH_INTERVAL};

/// DataDict CLI - browse schema metadata and ask the AI Copilot.
#[derive(Parser, Debug)]
#[command(name = "ddai")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard API URL.
    #[arg(long, env = "DATADICT_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Copilot mode at startup (structured/sql or conversational/chat).
    #[arg(long, env = "DATADICT_COPILOT_MODE", default_value = "structured")]
    mode: QueryMode,

    /// Append a note to answers whose stream was cut off.
    #[arg(long, default_value = "false")]
    annotate_interrupted: bool,

    /// Directory exported dictionaries are written to.
    #[arg(long, env = "DATADICT_EXPORT_DIR", default_value = ".")]
    export_dir: PathBuf,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("ddai=debug,datadict_copilot=debug,datadict_client=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let client = Arc::new(DashboardClient::new(ClientConfig::with_base_url(&args.api_url))?);

    let copilot_config = CopilotConfig {
        initial_mode: args.mode,
        partial_failure_policy: if args.annotate_interrupted {
            PartialFailurePolicy::Annotate
        } else {
            PartialFailurePolicy::Retain
        },
        ..CopilotConfig::default()
    };
    let session = SessionController::new(client.clone(), copilot_config);

    tracing::info!(
        api_url = %args.api_url,
        session_id = %session.session_id(),
        mode = %args.mode,
        "Starting ddai"
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client, session, args.export_dir);

    if let Err(e) = app.refresh().await {
        app.refresh_error = Some(format!("Failed to load sources: {e}"));
    }

    let result = run_event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop.
///
/// Redraws immediately whenever the copilot session changes so streamed
/// text appears as it arrives.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    let mut session_changes = app.session.subscribe();
    let mut refresh_interval = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        app.tick_animation();
        terminal.draw(|f| ui::render(f, app))?;

        let tick_rate = if app.needs_immediate_redraw() {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            () = tokio::time::sleep(tick_rate) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        handle_input(app, evt).await;
                    }
                }
            }

            // Copilot state changed; loop around to redraw.
            Ok(()) = session_changes.changed() => {}

            _ = refresh_interval.tick() => {
                if app.input_mode == InputMode::Normal && !app.needs_immediate_redraw() {
                    match app.refresh().await {
                        Ok(()) => app.refresh_error = None,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to refresh sources");
                            app.refresh_error = Some(format!("Refresh failed: {e}"));
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle input events.
async fn handle_input(app: &mut App, event: Event) {
    match event {
        Event::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return;
            }

            match app.input_mode {
                InputMode::Normal => handle_normal_mode(app, key.code, key.modifiers).await,
                InputMode::CreatingSource => handle_create_source_mode(app, key.code).await,
                InputMode::ConfirmingDelete => handle_confirm_delete_mode(app, key.code).await,
                InputMode::FilteringTables => handle_filter_mode(app, key.code),
            }
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(3),
            MouseEventKind::ScrollDown => app.scroll_chat_down(3),
            _ => {}
        },
        _ => {}
    }
}

/// Handle input in normal mode.
///
/// - Up/Down select sources
/// - Tab/Shift-Tab select tables
/// - Typing goes to the copilot input (when not in command mode)
/// - Esc toggles command mode
async fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Esc {
        if app.command_mode {
            app.command_mode = false;
        } else if app.error_message.is_some() {
            app.clear_error();
        } else {
            app.command_mode = true;
        }
        return;
    }

    match code {
        KeyCode::PageUp => {
            app.scroll_chat_up(10);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_chat_down(10);
            return;
        }
        KeyCode::Up | KeyCode::Down => {
            if code == KeyCode::Up {
                app.select_prev_source();
            } else {
                app.select_next_source();
            }
            if let Err(e) = app.load_schema().await {
                app.set_error(format!("Failed to load schema: {e}"));
            }
            return;
        }
        KeyCode::Tab => {
            app.select_next_table();
            return;
        }
        KeyCode::BackTab => {
            app.select_prev_table();
            return;
        }
        _ => {}
    }

    if app.command_mode {
        handle_command_mode(app, code).await;
    } else {
        handle_input_mode(app, code, modifiers);
    }
}

/// Handle input in command mode (Esc was pressed).
async fn handle_command_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('m') => app.toggle_mode(),
        KeyCode::Char('r') => app.reset_conversation(),
        KeyCode::Char('n') => app.enter_dialog_mode(InputMode::CreatingSource),
        KeyCode::Char('d') => {
            if app.selected_source().is_some() {
                app.enter_dialog_mode(InputMode::ConfirmingDelete);
            }
        }
        KeyCode::Char('s') => {
            if let Err(e) = app.sync_selected_source().await {
                app.set_error(e.to_string());
            }
        }
        KeyCode::Char('S') => {
            if let Err(e) = app.sync_all().await {
                app.set_error(e.to_string());
            }
        }
        KeyCode::Char('e') => {
            if let Err(e) = app.export_selected_source().await {
                app.set_error(e.to_string());
            }
        }
        KeyCode::Char('/') => app.start_table_filter(),
        KeyCode::Char('j') => app.scroll_chat_down(1),
        KeyCode::Char('k') => app.scroll_chat_up(1),
        KeyCode::Enter | KeyCode::Char('i') => app.command_mode = false,
        _ => {}
    }
}

/// Handle input in insert mode (typing goes to the copilot input).
fn handle_input_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Enter => app.submit_query(),
        KeyCode::Char('a') if ctrl => app.move_cursor_start(),
        KeyCode::Char('e') if ctrl => app.move_cursor_end(),
        KeyCode::Char('u') if ctrl => app.clear_input(),
        KeyCode::Char('w') if ctrl => app.delete_word(),
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        _ => {}
    }
}

/// Handle input in the new source dialog.
async fn handle_create_source_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.exit_dialog_mode(),
        KeyCode::Enter => {
            if !app.input.trim().is_empty() {
                let line = app.take_input();
                if let Err(e) = app.create_source(&line).await {
                    app.set_error(e.to_string());
                }
            }
            app.exit_dialog_mode();
        }
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        _ => {}
    }
}

/// Handle input in the table filter prompt.
fn handle_filter_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.exit_dialog_mode(),
        KeyCode::Enter => {
            let filter = app.take_input();
            app.apply_table_filter(&filter);
            app.exit_dialog_mode();
        }
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        _ => {}
    }
}

/// Handle input in the confirm delete dialog.
async fn handle_confirm_delete_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('y' | 'Y') => {
            if let Err(e) = app.delete_selected_source().await {
                app.set_error(e.to_string());
            }
            app.exit_dialog_mode();
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc => app.exit_dialog_mode(),
        _ => {}
    }
}
