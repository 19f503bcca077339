use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::client::{AnalysisResult, AnalyzeError, PredictClient};
use crate::config::AppConfig;
use crate::paste::parse_dropped_paths;
use crate::upload::{Applied, UploadState, View};

/// How long a status message stays in the info line
const STATUS_SECONDS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Alert,
    FileBrowser,
    Help,
}

/// Reply for one analyze click, tagged with its request id
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub id: u64,
    pub result: Result<AnalysisResult, AnalyzeError>,
}

#[derive(Debug, Clone)]
pub struct BrowserEntry {
    pub name: String,
    pub is_dir: bool,
    pub path: PathBuf,
}

pub struct App {
    pub popup: Popup,
    pub upload: UploadState,
    pub config: AppConfig,
    // Where config changes are written back; None keeps them in memory
    config_path: Option<PathBuf>,
    client: PredictClient,

    outcome_tx: UnboundedSender<AnalysisOutcome>,
    outcome_rx: UnboundedReceiver<AnalysisOutcome>,

    // Blocking alert text (Popup::Alert)
    pub alert_message: Option<String>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // File browser state
    pub browser_path: PathBuf,
    pub browser_entries: Vec<BrowserEntry>,
    pub browser_selected: usize,

    pub feedback_scroll: u16,
    pub analysis_started: Option<Instant>,
}

impl App {
    pub fn new(config: AppConfig, config_path: Option<PathBuf>, client: PredictClient) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let browser_path = start_directory(&config);

        Self {
            popup: Popup::None,
            upload: UploadState::new(),
            config,
            config_path,
            client,

            outcome_tx,
            outcome_rx,

            alert_message: None,

            status_message: None,
            status_message_time: None,

            browser_path,
            browser_entries: Vec::new(),
            browser_selected: 0,

            feedback_scroll: 0,
            analysis_started: None,
        }
    }

    pub fn server_url(&self) -> &str {
        self.client.url()
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    fn show_alert(&mut self, message: String) {
        self.alert_message = Some(message);
        self.popup = Popup::Alert;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        match self.upload.view {
            View::Upload => self.handle_upload_key(key),
            View::Results => self.handle_results_key(key),
        }
        Ok(())
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('o') | KeyCode::Char('b') => self.start_file_browser(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.upload.selected_file.is_some() {
                    self.analyze();
                } else {
                    self.start_file_browser();
                }
            }
            KeyCode::Char('a') => self.analyze(),
            KeyCode::Char('r') | KeyCode::Esc => self.reset(),
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Esc => self.reset(),
            KeyCode::Char('j') | KeyCode::Down => {
                self.feedback_scroll = self.feedback_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.feedback_scroll = self.feedback_scroll.saturating_sub(1);
            }
            KeyCode::PageDown => self.feedback_scroll = self.feedback_scroll.saturating_add(10),
            KeyCode::PageUp => self.feedback_scroll = self.feedback_scroll.saturating_sub(10),
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Alert => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    self.alert_message = None;
                    self.popup = Popup::None;
                }
            }
            Popup::FileBrowser => self.handle_browser_key(key),
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
            }
            Popup::None => {}
        }
        Ok(())
    }

    /// Dropped files arrive as pasted text
    pub fn handle_paste(&mut self, text: &str) {
        // The drop zone is hidden behind the results view
        if self.popup == Popup::Alert || self.upload.view == View::Results {
            return;
        }

        let paths = parse_dropped_paths(text);
        if paths.is_empty() {
            tracing::debug!("Paste did not contain any paths");
            return;
        }
        if paths.len() > 1 {
            tracing::debug!("{} files dropped, keeping the first", paths.len());
        }

        self.select_file(&paths[..1]);
        if self.popup == Popup::FileBrowser {
            self.popup = Popup::None;
        }
    }

    /// A left click on the drop zone opens the file browser
    pub fn handle_mouse(&mut self, mouse: MouseEvent, drop_zone: Rect) {
        if self.popup != Popup::None || self.upload.view != View::Upload {
            return;
        }
        if mouse.kind == MouseEventKind::Down(MouseButton::Left)
            && drop_zone.contains(Position::new(mouse.column, mouse.row))
        {
            self.start_file_browser();
        }
    }

    fn select_file(&mut self, paths: &[PathBuf]) {
        if !self.upload.select_files(paths) {
            return;
        }

        if let Some(file) = &self.upload.selected_file {
            tracing::info!("Selected {}", file.path.display());
            let dir = file.path.parent().map(Path::to_path_buf);
            if let Some(dir) = dir.filter(|d| Some(d) != self.config.last_directory.as_ref()) {
                // Only the directory is written back; a --server override stays in memory
                if let Some(path) = &self.config_path {
                    if let Err(e) = AppConfig::remember_directory(path, &dir) {
                        tracing::warn!("Failed to save config: {}", e);
                    }
                }
                self.config.last_directory = Some(dir);
            }
        }
    }

    fn analyze(&mut self) {
        let Some(request) = self.upload.begin_analyze() else {
            return;
        };

        tracing::info!("Analyzing {} (request {})", request.file.name, request.id);
        self.analysis_started = Some(Instant::now());

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = client.predict(&request.file.path).await;
            // Receiver only goes away on shutdown
            let _ = tx.send(AnalysisOutcome { id: request.id, result });
        });
    }

    fn reset(&mut self) {
        if let Some(id) = self.upload.in_flight() {
            if self.upload.is_current(id) {
                tracing::warn!("Reset while request {} is in flight; its reply will still be shown", id);
            }
        }
        self.upload.reset();
        self.feedback_scroll = 0;
        self.analysis_started = None;
    }

    fn apply_outcome(&mut self, outcome: AnalysisOutcome) {
        let AnalysisOutcome { id, result } = outcome;

        if !self.upload.is_current(id) {
            tracing::warn!("Reply for request {} arrived after the view moved on; applying it anyway", id);
            self.set_status("Late reply from an earlier analysis");
        }

        if let Err(e) = &result {
            if e.is_transport() {
                tracing::error!("Analysis request {} failed: {}", id, e);
            } else {
                tracing::info!("Prediction service rejected request {}: {}", id, e);
            }
        }

        match self.upload.complete_analyze(id, &result) {
            Applied::Shown => {
                self.feedback_scroll = 0;
                if let Some(started) = self.analysis_started.take() {
                    tracing::info!("Analysis {} finished in {:.1}s", id, started.elapsed().as_secs_f32());
                }
                if let Ok(result) = &result {
                    self.notify_done(result);
                }
            }
            Applied::Alerted(message) => {
                self.analysis_started = None;
                self.show_alert(message);
            }
        }
    }

    fn notify_done(&self, result: &AnalysisResult) {
        if !self.config.notifications {
            return;
        }
        let body = format!("{} ({}% match)", result.role, result.match_percentage);
        if let Err(e) = notify_rust::Notification::new()
            .summary("Resume analysis ready")
            .body(&body)
            .icon("document-properties")
            .show()
        {
            tracing::debug!("Notification failed: {}", e);
        }
    }

    fn start_file_browser(&mut self) {
        self.popup = Popup::FileBrowser;
        self.browser_path = start_directory(&self.config);
        self.browser_selected = 0;
        self.refresh_browser();
    }

    fn refresh_browser(&mut self) {
        self.browser_entries = list_directory(&self.browser_path, self.config.show_hidden);
        if self.browser_selected >= self.browser_entries.len() {
            self.browser_selected = 0;
        }
    }

    fn enter_directory(&mut self, path: PathBuf) {
        self.browser_path = path;
        self.browser_selected = 0;
        self.refresh_browser();
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.popup = Popup::None;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.browser_entries.is_empty() {
                    self.browser_selected = (self.browser_selected + 1) % self.browser_entries.len();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if !self.browser_entries.is_empty() {
                    self.browser_selected = self.browser_selected.checked_sub(1)
                        .unwrap_or(self.browser_entries.len() - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(entry) = self.browser_entries.get(self.browser_selected).cloned() {
                    if entry.is_dir {
                        self.enter_directory(entry.path);
                    } else {
                        self.popup = Popup::None;
                        self.select_file(&[entry.path]);
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(parent) = self.browser_path.parent() {
                    let parent = parent.to_path_buf();
                    self.enter_directory(parent);
                }
            }
            KeyCode::Char('~') => {
                self.enter_directory(dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")));
            }
            KeyCode::Char('.') => {
                self.config.show_hidden = !self.config.show_hidden;
                self.refresh_browser();
            }
            _ => {}
        }
    }

    pub fn tick(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }

        // Clear status message after a few seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_SECONDS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}

fn start_directory(config: &AppConfig) -> PathBuf {
    config
        .last_directory
        .clone()
        .filter(|d| d.is_dir())
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Directory listing for the browser: `..` first, then folders, then files,
/// each sorted case-insensitively. Every file type is offered.
fn list_directory(path: &Path, show_hidden: bool) -> Vec<BrowserEntry> {
    let mut entries = Vec::new();

    if let Some(parent) = path.parent() {
        entries.push(BrowserEntry {
            name: "..".to_string(),
            is_dir: true,
            path: parent.to_path_buf(),
        });
    }

    let read = match std::fs::read_dir(path) {
        Ok(read) => read,
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", path.display(), e);
            return entries;
        }
    };

    let (mut dirs, mut files): (Vec<_>, Vec<_>) = read
        .flatten()
        .map(|entry| BrowserEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            is_dir: entry.path().is_dir(),
            path: entry.path(),
        })
        .filter(|entry| show_hidden || !entry.name.starts_with('.'))
        .partition(|entry| entry.is_dir);

    dirs.sort_by_key(|e| e.name.to_lowercase());
    files.sort_by_key(|e| e.name.to_lowercase());

    entries.extend(dirs);
    entries.extend(files);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{Phase, ANALYZE_LABEL, TRANSPORT_ALERT};
    use crossterm::event::KeyModifiers;

    fn test_app() -> App {
        // Port 9 (discard) refuses connections, so requests fail fast
        let client = PredictClient::new("http://127.0.0.1:9/predict", "resume");
        App::new(AppConfig::default(), None, client)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn success() -> AnalysisResult {
        AnalysisResult {
            role: "Java Developer".to_string(),
            match_percentage: 72.0,
            ai_feedback: "1. Strengths".to_string(),
            filename: None,
        }
    }

    #[test]
    fn test_list_directory_orders_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("b.pdf"), "x").unwrap();
        std::fs::write(dir.path().join("A.docx"), "x").unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();

        let names: Vec<String> = list_directory(dir.path(), false)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["..", "alpha", "Zeta", "A.docx", "b.pdf"]);

        let with_hidden = list_directory(dir.path(), true);
        assert!(with_hidden.iter().any(|e| e.name == ".hidden"));
    }

    #[test]
    fn test_paste_selects_first_file() {
        let mut app = test_app();
        app.handle_paste("'/tmp/first cv.pdf' /tmp/second.pdf");
        assert_eq!(app.upload.filename_label, "Selected: first cv.pdf");
        assert!(app.upload.control.enabled);
    }

    #[test]
    fn test_paste_ignored_while_results_shown() {
        let mut app = test_app();
        app.handle_paste("/srv/resumes/cv.pdf");
        let id = app.upload.begin_analyze().unwrap().id;
        app.apply_outcome(AnalysisOutcome { id, result: Ok(success()) });
        assert_eq!(app.upload.view, View::Results);

        app.handle_paste("/srv/resumes/other.pdf");
        assert_eq!(app.upload.filename_label, "Selected: cv.pdf");
        assert!(!app.upload.control.enabled);
    }

    #[test]
    fn test_server_override_not_saved_with_last_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        AppConfig::default().save_to(&config_path).unwrap();

        let config = AppConfig {
            server_url: "http://override.example:9999".to_string(),
            ..AppConfig::default()
        };
        let client = PredictClient::from_config(&config);
        let mut app = App::new(config, Some(config_path.clone()), client);
        app.handle_paste("/srv/resumes/cv.pdf");

        let saved = std::fs::read_to_string(&config_path).unwrap();
        assert!(!saved.contains("override.example"));
        let saved: AppConfig = toml::from_str(&saved).unwrap();
        assert_eq!(saved.server_url, crate::config::DEFAULT_SERVER_URL);
        assert_eq!(saved.last_directory, Some(PathBuf::from("/srv/resumes")));
        assert_eq!(app.server_url(), "http://override.example:9999/predict");
    }

    #[test]
    fn test_empty_paste_is_ignored() {
        let mut app = test_app();
        app.handle_paste("   ");
        assert!(app.upload.selected_file.is_none());
        assert!(!app.upload.control.enabled);
    }

    #[test]
    fn test_alert_blocks_input_until_dismissed() {
        let mut app = test_app();
        app.show_alert("No file selected".to_string());

        app.handle_paste("/tmp/cv.pdf");
        assert!(app.upload.selected_file.is_none());

        app.handle_key(key(KeyCode::Char('o'))).unwrap();
        assert_eq!(app.popup, Popup::Alert);

        app.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.popup, Popup::None);
        assert!(app.alert_message.is_none());
    }

    #[test]
    fn test_mouse_click_on_drop_zone_opens_browser() {
        let mut app = test_app();
        let zone = Rect::new(10, 5, 20, 6);
        let click = |column, row| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };

        app.handle_mouse(click(0, 0), zone);
        assert_eq!(app.popup, Popup::None);

        app.handle_mouse(click(12, 7), zone);
        assert_eq!(app.popup, Popup::FileBrowser);
    }

    #[test]
    fn test_outcome_error_shows_alert_and_reverts() {
        let mut app = test_app();
        app.upload.select_files(&["/tmp/cv.pdf"]);
        let request = app.upload.begin_analyze().unwrap();

        app.outcome_tx
            .send(AnalysisOutcome {
                id: request.id,
                result: Err(AnalyzeError::Application("Unsupported file".to_string())),
            })
            .unwrap();
        app.tick();

        assert_eq!(app.popup, Popup::Alert);
        assert_eq!(app.alert_message.as_deref(), Some("Unsupported file"));
        assert_eq!(app.upload.view, View::Upload);
        assert!(app.upload.control.enabled);
        assert_eq!(app.upload.control.label, ANALYZE_LABEL);
    }

    #[test]
    fn test_outcome_success_shows_results() {
        let mut app = test_app();
        app.upload.select_files(&["/tmp/cv.pdf"]);
        let request = app.upload.begin_analyze().unwrap();

        app.outcome_tx
            .send(AnalysisOutcome { id: request.id, result: Ok(success()) })
            .unwrap();
        app.tick();

        assert_eq!(app.popup, Popup::None);
        assert_eq!(app.upload.phase(), Phase::ResultsShown);
        assert!(app.status_message.is_none());

        app.handle_key(key(KeyCode::Char('r'))).unwrap();
        assert_eq!(app.upload.phase(), Phase::Idle);
        assert!(app.upload.filename_label.is_empty());
    }

    #[test]
    fn test_late_outcome_is_flagged() {
        let mut app = test_app();
        app.upload.select_files(&["/tmp/cv.pdf"]);
        let request = app.upload.begin_analyze().unwrap();
        app.reset();

        app.outcome_tx
            .send(AnalysisOutcome { id: request.id, result: Ok(success()) })
            .unwrap();
        app.tick();

        assert_eq!(app.upload.view, View::Results);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_analyze_connection_failure_alerts_generic() {
        let mut app = test_app();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        std::fs::write(&path, "resume").unwrap();
        app.upload.select_files(&[path]);

        app.handle_key(key(KeyCode::Char('a'))).unwrap();
        assert_eq!(app.upload.phase(), Phase::Analyzing);

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), app.outcome_rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.apply_outcome(outcome);

        assert_eq!(app.alert_message.as_deref(), Some(TRANSPORT_ALERT));
        assert_eq!(app.upload.phase(), Phase::FileSelected);
    }
}
