//! Application state.
//!
//! This module manages the TUI application state and coordinates between
//! the UI, the dashboard client, and the copilot session.
//!
//! The copilot transcript is owned by the [`SessionController`]; the app only
//! submits queries and reads snapshots of it when rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use datadict_client::{
    ClientError, DashboardClient, DashboardStats, DatabaseSource, DbType, SchemaTable,
};
use datadict_copilot::{QueryMode, SessionController};

/// Error type for dashboard actions triggered from the TUI.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The dashboard API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Writing an exported file failed.
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    /// The user input could not be interpreted.
    #[error("{0}")]
    Invalid(String),
}

/// Input mode for special operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal operation mode.
    #[default]
    Normal,
    /// Registering a new source (prompting for `name db_type url`).
    CreatingSource,
    /// Confirming source deletion.
    ConfirmingDelete,
    /// Editing the table filter.
    FilteringTables,
}

/// Application state.
pub struct App {
    /// HTTP client for the dashboard.
    client: Arc<DashboardClient>,
    /// Copilot conversation.
    pub session: SessionController,
    /// Registered sources.
    pub sources: Vec<DatabaseSource>,
    /// Currently selected source index.
    pub selected_source: Option<usize>,
    /// Tables of the selected source.
    pub tables: Vec<SchemaTable>,
    /// Filter applied to table names and summaries.
    pub table_filter: String,
    /// Selected index into the filtered tables.
    pub selected_table: Option<usize>,
    /// Dashboard counters.
    pub stats: Option<DashboardStats>,
    /// Current input buffer.
    pub input: String,
    /// Cursor position in input, in characters.
    pub cursor_position: usize,
    /// Current input mode.
    pub input_mode: InputMode,
    /// Single-key commands instead of typing (entered with Esc).
    pub command_mode: bool,
    /// Chat scroll position, in lines up from the bottom.
    pub chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Error message to display.
    pub error_message: Option<String>,
    /// Last refresh error to display to user.
    pub refresh_error: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Animation frame counter for loading indicators.
    pub animation_frame: usize,
    /// Directory exported dictionaries are written to.
    export_dir: PathBuf,
    /// Saved chat input when entering a dialog mode.
    saved_chat_input: Option<(String, usize)>,
}

impl App {
    /// Create a new application.
    #[must_use]
    pub fn new(client: Arc<DashboardClient>, session: SessionController, export_dir: PathBuf) -> Self {
        Self {
            client,
            session,
            sources: Vec::new(),
            selected_source: None,
            tables: Vec::new(),
            table_filter: String::new(),
            selected_table: None,
            stats: None,
            input: String::new(),
            cursor_position: 0,
            input_mode: InputMode::Normal,
            command_mode: false,
            chat_scroll: 0,
            status_message: None,
            error_message: None,
            refresh_error: None,
            should_quit: false,
            animation_frame: 0,
            export_dir,
            saved_chat_input: None,
        }
    }

    /// Enter a dialog mode, saving the current chat input.
    pub fn enter_dialog_mode(&mut self, mode: InputMode) {
        self.saved_chat_input = Some((std::mem::take(&mut self.input), self.cursor_position));
        self.cursor_position = 0;
        self.command_mode = false;
        self.input_mode = mode;
    }

    /// Exit dialog mode, restoring the saved chat input.
    pub fn exit_dialog_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if let Some((input, cursor)) = self.saved_chat_input.take() {
            self.input = input;
            self.cursor_position = cursor;
        } else {
            self.clear_input();
        }
    }

    /// Tick the animation frame (call on each render).
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Get current spinner character for loading animation.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// Get the currently selected source.
    #[must_use]
    pub fn selected_source(&self) -> Option<&DatabaseSource> {
        self.selected_source.and_then(|i| self.sources.get(i))
    }

    /// Get the API URL for display.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.client.base_url()
    }

    /// Set the status message (also clears any error).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    /// Set the error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Clear the error message.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    // =========================================================================
    // Copilot
    // =========================================================================

    /// Submit the input line to the copilot.
    ///
    /// The input is kept if the session is still waiting for an earlier
    /// answer, so the user can resend it.
    pub fn submit_query(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }

        match self.session.submit(&self.input) {
            Some(dispatch) => {
                self.clear_input();
                self.chat_scroll = 0;
                self.status_message = None;
                tokio::spawn(dispatch.run());
            }
            None => self.set_status("Still waiting for the previous answer"),
        }
    }

    /// Switch between SQL and chat mode.
    pub fn toggle_mode(&mut self) {
        let mode = self.session.toggle_mode();
        self.set_status(format!("Copilot mode: {}", mode.label()));
    }

    /// Start a fresh conversation.
    pub fn reset_conversation(&mut self) {
        self.session.reset();
        self.chat_scroll = 0;
        self.set_status("Conversation reset");
    }

    /// Current copilot mode.
    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.session.mode()
    }

    /// Check if UI needs high-frequency redraws (waiting or streaming).
    #[must_use]
    pub fn needs_immediate_redraw(&self) -> bool {
        self.session.is_busy() || self.session.is_streaming()
    }

    // =========================================================================
    // Source List Navigation
    // =========================================================================

    /// Move selection up in the source list.
    pub fn select_prev_source(&mut self) {
        if self.sources.is_empty() {
            return;
        }

        self.selected_source = Some(match self.selected_source {
            Some(0) | None => self.sources.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Move selection down in the source list.
    pub fn select_next_source(&mut self) {
        if self.sources.is_empty() {
            return;
        }

        self.selected_source = Some(match self.selected_source {
            Some(i) if i + 1 >= self.sources.len() => 0,
            Some(i) => i + 1,
            None => 0,
        });
    }

    // =========================================================================
    // Table List
    // =========================================================================

    /// Tables of the selected source that pass the filter.
    #[must_use]
    pub fn filtered_tables(&self) -> Vec<&SchemaTable> {
        self.tables
            .iter()
            .filter(|t| t.matches(&self.table_filter))
            .collect()
    }

    /// The table shown in the detail pane.
    #[must_use]
    pub fn selected_table(&self) -> Option<&SchemaTable> {
        let index = self.selected_table?;
        self.filtered_tables().get(index).copied()
    }

    /// Move selection down in the filtered table list.
    pub fn select_next_table(&mut self) {
        let len = self.filtered_tables().len();
        if len == 0 {
            return;
        }
        self.selected_table = Some(match self.selected_table {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        });
    }

    /// Move selection up in the filtered table list.
    pub fn select_prev_table(&mut self) {
        let len = self.filtered_tables().len();
        if len == 0 {
            return;
        }
        self.selected_table = Some(match self.selected_table {
            Some(i) if i > 0 && i < len => i - 1,
            _ => len - 1,
        });
    }

    /// Open the filter prompt, prefilled with the current filter.
    pub fn start_table_filter(&mut self) {
        self.enter_dialog_mode(InputMode::FilteringTables);
        self.input.clone_from(&self.table_filter);
        self.move_cursor_end();
    }

    /// Replace the table filter. An empty filter shows every table.
    pub fn apply_table_filter(&mut self, filter: &str) {
        self.table_filter = filter.trim().to_string();
        self.reset_table_selection();

        if self.table_filter.is_empty() {
            self.set_status("Table filter cleared");
        } else {
            let shown = self.filtered_tables().len();
            self.set_status(format!(
                "Filter \"{}\": {shown} of {} tables",
                self.table_filter,
                self.tables.len()
            ));
        }
    }

    fn reset_table_selection(&mut self) {
        self.selected_table = if self.filtered_tables().is_empty() {
            None
        } else {
            Some(0)
        };
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older messages).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_add(amount);
    }

    /// Scroll chat down (view newer messages).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn input_chars(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input_chars() {
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete the word before the cursor.
    pub fn delete_word(&mut self) {
        while self.cursor_position > 0 {
            self.delete_char();
            let prev = self
                .cursor_position
                .checked_sub(1)
                .and_then(|i| self.input.chars().nth(i));
            if prev == Some(' ') {
                break;
            }
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input_chars() {
            self.cursor_position += 1;
        }
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input_chars();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Take the current input (clears it).
    pub fn take_input(&mut self) -> String {
        let input = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        input
    }

    // =========================================================================
    // API Operations
    // =========================================================================

    /// Refresh the source list and dashboard counters.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.refresh_sources().await?;
        self.stats = Some(self.client.get_stats().await?);
        Ok(())
    }

    /// Refresh the source list from the API.
    ///
    /// Reloads the schema if the selected source changed.
    pub async fn refresh_sources(&mut self) -> Result<(), ClientError> {
        let previous = self.selected_source().map(|s| s.id);
        self.sources = self.client.list_sources().await?;

        self.selected_source = match previous {
            Some(id) => self.sources.iter().position(|s| s.id == id),
            None => None,
        };
        if self.selected_source.is_none() && !self.sources.is_empty() {
            self.selected_source = Some(0);
        }

        if self.selected_source().map(|s| s.id) != previous {
            self.load_schema().await?;
        }

        Ok(())
    }

    /// Load the tables of the selected source.
    pub async fn load_schema(&mut self) -> Result<(), ClientError> {
        self.tables = match self.selected_source() {
            Some(source) => self.client.get_schema(source.id).await?,
            None => Vec::new(),
        };
        self.reset_table_selection();
        Ok(())
    }

    /// Register a source from dialog input of the form `name db_type url`.
    pub async fn create_source(&mut self, line: &str) -> Result<(), ActionError> {
        let (name, db_type, url) = parse_source_line(line)?;
        let source = self.client.create_source(&name, db_type, &url).await?;
        self.set_status(format!("Registered source: {} (extraction started)", source.name));
        self.refresh_sources().await?;

        if let Some(i) = self.sources.iter().position(|s| s.id == source.id) {
            self.selected_source = Some(i);
            self.load_schema().await?;
        }

        Ok(())
    }

    /// Delete the selected source.
    pub async fn delete_selected_source(&mut self) -> Result<(), ClientError> {
        if let Some(source) = self.selected_source() {
            let name = source.name.clone();
            let id = source.id;
            let result = self.client.delete_source(id).await;
            match result {
                Ok(()) => self.set_status(format!("Deleted source: {name}")),
                Err(e) if e.is_not_found() => {
                    self.set_status(format!("Source {name} was already deleted"));
                }
                Err(e) => return Err(e),
            }
            self.refresh().await?;
        }
        Ok(())
    }

    /// Trigger re-extraction of the selected source.
    pub async fn sync_selected_source(&mut self) -> Result<(), ClientError> {
        if let Some(source) = self.selected_source() {
            let (id, name) = (source.id, source.name.clone());
            let result = self.client.sync_source(id).await;
            match result {
                Ok(()) => self.set_status(format!("Sync triggered for {name}")),
                Err(e) if e.is_not_found() => {
                    self.set_error(format!("Source {name} no longer exists"));
                    self.refresh_sources().await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Trigger re-extraction of every source.
    pub async fn sync_all(&mut self) -> Result<(), ClientError> {
        self.client.sync_all().await?;
        self.set_status("Sync triggered for all sources");
        Ok(())
    }

    /// Download the selected source's dictionary to `<name>_dictionary.md`.
    pub async fn export_selected_source(&mut self) -> Result<(), ActionError> {
        let Some(source) = self.selected_source() else {
            return Err(ActionError::Invalid("No source selected".to_string()));
        };
        let (id, name) = (source.id, source.name.clone());

        let markdown = self.client.export_markdown(id).await?;
        let path = write_export(&self.export_dir, &name, &markdown).await?;

        self.set_status(format!("Exported {}", path.display()));
        Ok(())
    }
}

/// Parse `name db_type connection_url`.
///
/// The URL is the remainder of the line, so it may contain spaces.
pub fn parse_source_line(line: &str) -> Result<(String, DbType, String), ActionError> {
    const USAGE: &str = "Expected: <name> <postgres|mysql|snowflake|mssql> <connection-url>";

    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let name = parts.next().filter(|s| !s.is_empty());
    let db_type = parts.next();
    let url = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match (name, db_type, url) {
        (Some(name), Some(db_type), Some(url)) => {
            let db_type = db_type
                .parse::<DbType>()
                .map_err(|e| ActionError::Invalid(e.to_string()))?;
            Ok((name.to_string(), db_type, url.to_string()))
        }
        _ => Err(ActionError::Invalid(USAGE.to_string())),
    }
}

/// File name for an exported dictionary.
#[must_use]
pub fn export_file_name(source_name: &str) -> String {
    let safe: String = source_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}_dictionary.md")
}

async fn write_export(dir: &Path, source_name: &str, markdown: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(export_file_name(source_name));
    tokio::fs::write(&path, markdown).await?;
    Ok(path)
}

/// Refresh interval for sources and stats.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[cfg(test)]
mod tests {
    use datadict_client::ClientConfig;
    use datadict_copilot::{ScriptedBackend, ScriptedStep};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn app_with(backend: Arc<ScriptedBackend>) -> App {
        let client = Arc::new(DashboardClient::new(ClientConfig::default()).unwrap());
        let session = SessionController::with_defaults(backend);
        App::new(client, session, PathBuf::from("."))
    }

    fn app() -> App {
        app_with(Arc::new(ScriptedBackend::new()))
    }

    fn app_for(server: &MockServer) -> App {
        let client = Arc::new(DashboardClient::new(ClientConfig::with_base_url(server.uri())).unwrap());
        let session = SessionController::with_defaults(Arc::new(ScriptedBackend::new()));
        App::new(client, session, PathBuf::from("."))
    }

    fn table(name: &str, summary: Option<&str>) -> SchemaTable {
        SchemaTable {
            id: 1,
            source_id: 1,
            schema_name: Some("public".to_string()),
            table_name: name.to_string(),
            columns: Vec::new(),
            relationships: None,
            ai_summary: summary.map(str::to_string),
            quality_metrics: None,
            updated_at: None,
        }
    }

    fn source(id: i64, name: &str) -> DatabaseSource {
        DatabaseSource {
            id,
            name: name.to_string(),
            db_type: "postgres".to_string(),
            connection_url: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn input_editing_handles_multibyte() {
        let mut app = app();
        for c in "größe".chars() {
            app.insert_char(c);
        }
        app.move_cursor_left();
        app.delete_char();
        assert_eq!(app.input, "gröe");
        app.move_cursor_start();
        app.delete_char_forward();
        assert_eq!(app.input, "röe");
        app.move_cursor_end();
        app.insert_char('€');
        assert_eq!(app.input, "röe€");
        assert_eq!(app.cursor_position, 4);
    }

    #[test]
    fn delete_word_stops_at_space() {
        let mut app = app();
        for c in "describe orders".chars() {
            app.insert_char(c);
        }
        app.delete_word();
        assert_eq!(app.input, "describe ");
    }

    #[test]
    fn dialog_mode_restores_chat_input() {
        let mut app = app();
        for c in "half typed".chars() {
            app.insert_char(c);
        }
        app.enter_dialog_mode(InputMode::CreatingSource);
        assert!(app.input.is_empty());
        app.insert_char('x');
        app.exit_dialog_mode();
        assert_eq!(app.input, "half typed");
        assert_eq!(app.cursor_position, 10);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn source_selection_wraps() {
        let mut app = app();
        app.select_next_source();
        assert_eq!(app.selected_source, None);

        app.sources = vec![source(1, "crm"), source(2, "billing")];
        app.select_next_source();
        assert_eq!(app.selected_source, Some(0));
        app.select_next_source();
        assert_eq!(app.selected_source, Some(1));
        app.select_next_source();
        assert_eq!(app.selected_source, Some(0));
        app.select_prev_source();
        assert_eq!(app.selected_source().unwrap().name, "billing");
    }

    #[test]
    fn table_filter_narrows_selection() {
        let mut app = app();
        app.tables = vec![
            table("orders", Some("Customer purchases")),
            table("customers", Some("Contact details")),
            table("ledger", None),
        ];
        app.apply_table_filter("");
        assert_eq!(app.selected_table().unwrap().table_name, "orders");

        app.apply_table_filter(" PURCHASE ");
        assert_eq!(app.table_filter, "PURCHASE");
        assert_eq!(app.filtered_tables().len(), 1);
        assert_eq!(app.selected_table().unwrap().table_name, "orders");
        assert!(app.status_message.as_deref().unwrap().contains("1 of 3"));

        app.apply_table_filter("invoice");
        assert!(app.filtered_tables().is_empty());
        assert!(app.selected_table().is_none());
        app.select_next_table();
        assert!(app.selected_table.is_none());

        app.apply_table_filter("");
        assert_eq!(app.filtered_tables().len(), 3);
    }

    #[test]
    fn table_selection_wraps() {
        let mut app = app();
        app.tables = vec![table("a", None), table("b", None)];
        app.select_next_table();
        assert_eq!(app.selected_table().unwrap().table_name, "a");
        app.select_next_table();
        assert_eq!(app.selected_table().unwrap().table_name, "b");
        app.select_next_table();
        assert_eq!(app.selected_table().unwrap().table_name, "a");
        app.select_prev_table();
        assert_eq!(app.selected_table().unwrap().table_name, "b");
    }

    #[test]
    fn filter_prompt_is_prefilled_and_restores_chat_input() {
        let mut app = app();
        for c in "draft".chars() {
            app.insert_char(c);
        }
        app.table_filter = "ord".to_string();

        app.start_table_filter();
        assert_eq!(app.input_mode, InputMode::FilteringTables);
        assert_eq!(app.input, "ord");
        assert_eq!(app.cursor_position, 3);

        app.insert_char('e');
        let filter = app.take_input();
        app.apply_table_filter(&filter);
        app.exit_dialog_mode();
        assert_eq!(app.table_filter, "orde");
        assert_eq!(app.input, "draft");
    }

    #[tokio::test]
    async fn deleting_a_missing_source_is_reported_and_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/sources/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Source not found"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sources": 0, "tables": 0, "pii_columns": 0, "health_score": 100.0
            })))
            .mount(&server)
            .await;

        let mut app = app_for(&server);
        app.sources = vec![source(7, "crm")];
        app.selected_source = Some(0);

        app.delete_selected_source().await.unwrap();

        assert_eq!(app.status_message.as_deref(), Some("Source crm was already deleted"));
        assert!(app.sources.is_empty());
        assert!(app.selected_source.is_none());
    }

    #[tokio::test]
    async fn syncing_a_missing_source_refreshes_the_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sync/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Source not found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 8, "name": "billing", "db_type": "mysql", "connection_url": "mysql://h/b"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/schema/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut app = app_for(&server);
        app.sources = vec![source(7, "crm")];
        app.selected_source = Some(0);

        app.sync_selected_source().await.unwrap();

        assert_eq!(app.error_message.as_deref(), Some("Source crm no longer exists"));
        assert_eq!(app.selected_source().unwrap().name, "billing");
    }

    #[tokio::test]
    async fn other_sync_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sync/7"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let mut app = app_for(&server);
        app.sources = vec![source(7, "crm")];
        app.selected_source = Some(0);

        let err = app.sync_selected_source().await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn parse_source_line_accepts_url_remainder() {
        let (name, db_type, url) =
            parse_source_line("crm postgres postgresql://u:p@localhost:5432/crm").unwrap();
        assert_eq!(name, "crm");
        assert_eq!(db_type, DbType::Postgres);
        assert_eq!(url, "postgresql://u:p@localhost:5432/crm");

        let (_, db_type, url) =
            parse_source_line("dw mssql mssql+pyodbc://u:p@h/db?driver=ODBC Driver 17").unwrap();
        assert_eq!(db_type, DbType::Mssql);
        assert!(url.ends_with("ODBC Driver 17"));
    }

    #[test]
    fn parse_source_line_rejects_bad_input() {
        assert!(matches!(parse_source_line(""), Err(ActionError::Invalid(_))));
        assert!(matches!(parse_source_line("crm postgres"), Err(ActionError::Invalid(_))));
        let err = parse_source_line("crm oracle oracle://x").unwrap_err();
        assert!(err.to_string().contains("unknown database type"));
    }

    #[test]
    fn export_file_name_is_safe() {
        assert_eq!(export_file_name("crm"), "crm_dictionary.md");
        assert_eq!(export_file_name("sales/eu prod"), "sales_eu_prod_dictionary.md");
    }

    #[tokio::test]
    async fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "crm", "# Data Dictionary: crm\n")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("crm_dictionary.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Data Dictionary: crm\n");
    }

    #[tokio::test]
    async fn blank_input_is_not_submitted() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut app = app_with(backend.clone());
        app.insert_char(' ');
        app.submit_query();
        assert_eq!(app.input, " ");
        assert_eq!(app.session.transcript_len(), 1);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn busy_session_keeps_input() {
        let backend = Arc::new(ScriptedBackend::new());
        let release = backend.push_deferred();
        let mut app = app_with(backend.clone());

        for c in "first".chars() {
            app.insert_char(c);
        }
        app.submit_query();
        assert!(app.input.is_empty());
        assert!(app.needs_immediate_redraw());

        for c in "second".chars() {
            app.insert_char(c);
        }
        app.submit_query();
        assert_eq!(app.input, "second");
        assert!(app.status_message.is_some());

        release.send(ScriptedStep::Answer("done".into())).ok();
    }

    #[tokio::test]
    async fn redraw_follows_busy_and_streaming() {
        let backend = Arc::new(ScriptedBackend::new());
        let feed = backend.push_feed();
        let app = app_with(backend);
        app.session.set_mode(QueryMode::Conversational);
        assert!(!app.needs_immediate_redraw());

        let mut rx = app.session.subscribe();
        let task = tokio::spawn(app.session.submit("q").unwrap().run());
        assert!(app.needs_immediate_redraw());

        feed.send_text("partial");
        while !(app.session.is_streaming() && !app.session.is_busy()) {
            rx.changed().await.unwrap();
        }
        assert!(app.needs_immediate_redraw());

        drop(feed);
        task.await.unwrap();
        assert!(!app.needs_immediate_redraw());
    }

    #[test]
    fn toggle_mode_and_reset() {
        let mut app = app();
        app.toggle_mode();
        assert_eq!(app.mode(), QueryMode::Conversational);
        app.chat_scroll = 5;
        app.reset_conversation();
        assert_eq!(app.chat_scroll, 0);
        assert_eq!(app.session.transcript_len(), 1);
    }
}
