//! Per-user pipeline context.
//!
//! A [`Session`] carries one user's upload, column selection and date window
//! between interactions. Each handler runs one pipeline stage and only
//! touches its own session; nothing here is process-wide. The normalized
//! dataset is memoised per (dataset, mapping) pair and dropped whenever
//! either changes.

use std::{collections::HashMap, fmt};

use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info};
use uuid::Uuid;

use crate::{
    aggregate::aggregate,
    dataset::{Dataset, UploadOptions, read_upload},
    error::{PipelineError, PipelineResult},
    filter::{DateWindow, filter_by_window},
    mapping::{RoleMapping, RoleSelection},
    normalize::{NormalizeOptions, NormalizedDataset, normalize},
    report::{ChartRole, DEFAULT_TITLE, Report},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    SelectColumns,
    Visualize,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub title: String,
    pub upload: UploadOptions,
    pub normalize: NormalizeOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            upload: UploadOptions::default(),
            normalize: NormalizeOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    settings: SessionSettings,
    step: Step,
    dataset: Option<Dataset>,
    mapping: Option<RoleMapping>,
    window: (Option<NaiveDate>, Option<NaiveDate>),
    normalized: Option<NormalizedDataset>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            step: Step::Upload,
            dataset: None,
            mapping: None,
            window: (None, None),
            normalized: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn mapping(&self) -> Option<&RoleMapping> {
        self.mapping.as_ref()
    }

    /// Parses an upload and replaces whatever this session held before.
    pub fn upload(&mut self, filename: &str, bytes: &[u8]) -> PipelineResult<&Dataset> {
        let dataset = read_upload(filename, bytes, &self.settings.upload)?;
        self.mapping = None;
        self.normalized = None;
        self.window = (None, None);
        self.step = Step::SelectColumns;
        Ok(self.dataset.insert(dataset))
    }

    /// Validates a column selection against the uploaded dataset.
    pub fn select_columns(&mut self, selection: &RoleSelection) -> PipelineResult<&RoleMapping> {
        let dataset = self.dataset.as_ref().ok_or(PipelineError::NoDataset)?;
        let mapping = selection.validate(dataset)?;
        if self.mapping.as_ref() != Some(&mapping) {
            self.normalized = None;
            self.window = (None, None);
        }
        self.step = Step::Visualize;
        Ok(self.mapping.insert(mapping))
    }

    /// Stores the date window; `None` bounds fall back to the observed range.
    pub fn set_window(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.window = (start, end);
    }

    pub fn normalized(&mut self) -> PipelineResult<&NormalizedDataset> {
        self.ensure_normalized()?;
        self.normalized.as_ref().ok_or(PipelineError::MappingNotSelected)
    }

    /// Observed `(min, max)` dates, used by callers as the default window.
    pub fn observed_range(&mut self) -> PipelineResult<Option<(NaiveDate, NaiveDate)>> {
        Ok(self.normalized()?.date_range())
    }

    /// Runs filter and aggregation over the memoised normalized dataset.
    pub fn report(&mut self) -> PipelineResult<Report> {
        self.ensure_normalized()?;
        let (Some(mapping), Some(normalized)) = (self.mapping.as_ref(), self.normalized.as_ref())
        else {
            return Err(PipelineError::MappingNotSelected);
        };
        let (start, end) = self.window;
        let window = DateWindow::resolve(normalized, start, end);
        let filtered = match &window {
            Some(window) => filter_by_window(normalized, window),
            None => normalized.clone(),
        };
        let report = Report::new(
            &self.settings.title,
            mapping,
            window,
            normalized.drop_summary(),
            aggregate(&filtered, mapping),
        );
        info!(
            "Report '{}' covers {} row(s); charts: {}",
            self.settings.title,
            filtered.len(),
            report.chart_roles().iter().map(ChartRole::as_str).join(", ")
        );
        Ok(report)
    }

    fn ensure_normalized(&mut self) -> PipelineResult<()> {
        let dataset = self.dataset.as_ref().ok_or(PipelineError::NoDataset)?;
        let mapping = self
            .mapping
            .as_ref()
            .ok_or(PipelineError::MappingNotSelected)?;
        if self.normalized.is_some() {
            debug!("Reusing memoised normalized dataset");
            return Ok(());
        }
        self.normalized = Some(normalize(dataset, mapping, &self.settings.normalize));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Owns the sessions of every connected user, keyed by [`SessionId`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, settings: SessionSettings) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id, Session::new(settings));
        debug!("Opened session {id}");
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn close(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
