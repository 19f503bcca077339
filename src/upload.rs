//! Upload-and-review state
//!
//! Everything the screen shows is derived from `UploadState`: which view is
//! up, the selected file, the analyze control and the result fields. The
//! event dispatcher in `app` calls the transition methods and performs the
//! I/O they ask for; nothing in here touches the terminal or the network.

use std::path::{Path, PathBuf};

use crate::client::{AnalysisResult, AnalyzeError};
use crate::feedback::format_feedback;

pub const ANALYZE_LABEL: &str = "Analyze Resume";
pub const ANALYZING_LABEL: &str = "Analyzing...";
pub const TRANSPORT_ALERT: &str = "Something went wrong during analysis.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Upload,
    Results,
}

/// Where the widget is in its lifecycle, derived from the state fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FileSelected,
    Analyzing,
    ResultsShown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { path, name }
    }
}

/// The analyze button: enabled flag, label and loader indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeControl {
    pub enabled: bool,
    pub label: &'static str,
    pub loading: bool,
}

impl Default for AnalyzeControl {
    fn default() -> Self {
        Self {
            enabled: false,
            label: ANALYZE_LABEL,
            loading: false,
        }
    }
}

/// Display fields of the results view
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDisplay {
    pub predicted_role: String,
    pub match_value: String,
    pub match_percentage: f64,
    /// Feedback after markup substitution
    pub ai_feedback: String,
    pub filename: Option<String>,
}

impl ResultDisplay {
    fn from_result(result: &AnalysisResult) -> Self {
        Self {
            predicted_role: result.role.clone(),
            match_value: format!("{}%", result.match_percentage),
            match_percentage: result.match_percentage,
            ai_feedback: format_feedback(&result.ai_feedback),
            filename: result.filename.clone(),
        }
    }
}

/// What the dispatcher has to send for one analyze click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub id: u64,
    pub file: SelectedFile,
}

/// Result of applying an analysis outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Shown,
    Alerted(String),
}

#[derive(Debug, Clone)]
pub struct UploadState {
    pub selected_file: Option<SelectedFile>,
    pub view: View,
    pub control: AnalyzeControl,
    pub filename_label: String,
    pub result: Option<ResultDisplay>,
    /// Request currently awaited, if any. Reset and reselect do not clear it.
    in_flight: Option<u64>,
    next_request_id: u64,
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadState {
    pub fn new() -> Self {
        Self {
            selected_file: None,
            view: View::Upload,
            control: AnalyzeControl::default(),
            filename_label: String::new(),
            result: None,
            in_flight: None,
            next_request_id: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.view, self.control.loading, &self.selected_file) {
            (View::Results, _, _) => Phase::ResultsShown,
            (View::Upload, true, _) => Phase::Analyzing,
            (View::Upload, false, Some(_)) => Phase::FileSelected,
            (View::Upload, false, None) => Phase::Idle,
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Take the first of the given files. An empty list changes nothing.
    ///
    /// Returns whether a file was selected.
    pub fn select_files<P: AsRef<Path>>(&mut self, files: &[P]) -> bool {
        let Some(first) = files.first() else {
            return false;
        };

        let file = SelectedFile::new(first.as_ref());
        self.filename_label = format!("Selected: {}", file.name);
        self.selected_file = Some(file);
        self.control.enabled = true;
        true
    }

    /// Start an analysis for the selected file.
    ///
    /// Returns `None` when there is nothing to send or the control is
    /// disabled (a request is already running).
    pub fn begin_analyze(&mut self) -> Option<AnalyzeRequest> {
        let file = self.selected_file.clone()?;
        if !self.control.enabled {
            return None;
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(id);

        self.control.enabled = false;
        self.control.label = ANALYZING_LABEL;
        self.control.loading = true;

        Some(AnalyzeRequest { id, file })
    }

    /// Whether an outcome for `id` belongs to the request the user is
    /// currently waiting on.
    pub fn is_current(&self, id: u64) -> bool {
        self.in_flight == Some(id) && self.control.loading
    }

    /// Apply the outcome of request `id`. Late outcomes (after a reset or a
    /// newer request) are applied as well; callers can check `is_current`
    /// first to flag them.
    pub fn complete_analyze(
        &mut self,
        id: u64,
        outcome: &Result<AnalysisResult, AnalyzeError>,
    ) -> Applied {
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }

        match outcome {
            Ok(result) => {
                self.display_results(result);
                Applied::Shown
            }
            Err(err) => {
                let message = match err {
                    AnalyzeError::Application(message) => message.clone(),
                    _ => TRANSPORT_ALERT.to_string(),
                };
                self.view = View::Upload;
                self.reset_control();
                Applied::Alerted(message)
            }
        }
    }

    fn display_results(&mut self, result: &AnalysisResult) {
        self.view = View::Results;
        self.result = Some(ResultDisplay::from_result(result));
    }

    /// Clear the selection and go back to the upload view
    pub fn reset(&mut self) {
        self.view = View::Upload;
        self.selected_file = None;
        self.filename_label.clear();
        self.reset_control();
    }

    fn reset_control(&mut self) {
        self.control = AnalyzeControl {
            enabled: true,
            label: ANALYZE_LABEL,
            loading: false,
        };
    }
}
