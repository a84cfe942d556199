use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::{DashboardState, Pipeline, ViewBundle};
use crate::data::loader::DatasetCache;
use crate::data::model::RollTable;
use crate::error::{DashboardError, DashboardResult};

// ---------------------------------------------------------------------------
// Radar playback
// ---------------------------------------------------------------------------

/// Which episode frame the radar chart shows, and whether it auto-advances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadarPlayback {
    pub frame: usize,
    pub playing: bool,
    /// `egui` time of the last automatic step.
    pub last_step: f64,
}

impl RadarPlayback {
    /// Advance one frame if `interval` seconds passed since the last step.
    /// Wraps around after the last frame.
    pub fn tick(&mut self, now: f64, interval: f64, frames: usize) {
        if !self.playing || frames == 0 {
            return;
        }
        if now - self.last_step >= interval {
            self.frame = (self.frame + 1) % frames;
            self.last_step = now;
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    pipeline: Pipeline,

    /// Loaded table (None until a dataset loads).
    pub dataset: Option<Arc<RollTable>>,
    pub dataset_path: Option<PathBuf>,

    /// Sidebar controls.
    pub controls: DashboardState,

    /// Views for the current controls (cached until a control changes).
    pub views: Option<ViewBundle>,
    dirty: bool,

    /// Per-character colours shared by every chart.
    pub color_map: Option<ColorMap>,

    pub radar: RadarPlayback,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            pipeline: config.pipeline(),
            config,
            dataset: None,
            dataset_path: None,
            controls: DashboardState {
                episode_range: (0, 0),
                selected_character: None,
                include_guests: true,
            },
            views: None,
            dirty: false,
            color_map: None,
            radar: RadarPlayback::default(),
            status_message: None,
        }
    }

    /// Ingest a newly loaded table: reset controls and colours, compute views.
    pub fn set_dataset(&mut self, path: &Path, dataset: Arc<RollTable>) {
        self.controls = DashboardState::for_table(&dataset);
        self.color_map = Some(ColorMap::new(dataset.characters()));
        self.radar = RadarPlayback::default();
        self.dataset = Some(dataset);
        self.dataset_path = Some(path.to_path_buf());
        self.status_message = None;
        self.dirty = true;
        self.refresh();
    }

    /// Load `path` through the process-wide cache. On failure the current
    /// dataset stays and the error is kept for the top bar.
    pub fn open(&mut self, path: &Path) -> DashboardResult<()> {
        match DatasetCache::global().get_or_load(path) {
            Ok(table) => {
                self.set_dataset(path, table);
                Ok(())
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    pub fn set_episode_range(&mut self, min: i64, max: i64) {
        let mut controls = self.controls.clone();
        controls.episode_range = (min, max);
        if let Some(ds) = &self.dataset {
            controls.clamp_to(ds);
        }
        self.update_controls(controls);
    }

    pub fn set_selected_character(&mut self, character: String) {
        let mut controls = self.controls.clone();
        controls.selected_character = Some(character);
        self.update_controls(controls);
    }

    pub fn set_include_guests(&mut self, include: bool) {
        let mut controls = self.controls.clone();
        controls.include_guests = include;
        self.update_controls(controls);
    }

    fn update_controls(&mut self, controls: DashboardState) {
        if controls != self.controls {
            self.controls = controls;
            self.dirty = true;
        }
    }

    /// Recompute the views if a control changed since the last call.
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.views = self
            .dataset
            .as_ref()
            .map(|ds| self.pipeline.compute_views(ds, &self.controls));

        let frames = self
            .views
            .as_ref()
            .map_or(0, |v| v.category_distribution.episodes.len());
        if self.radar.frame >= frames {
            self.radar.frame = 0;
        }
    }

    /// Write the current views as pretty JSON.
    pub fn export(&self, path: &Path) -> DashboardResult<()> {
        let views = self.views.as_ref().ok_or_else(|| DashboardError::DataUnavailable {
            path: self.dataset_path.clone().unwrap_or_default(),
            reason: "no dataset loaded".into(),
        })?;
        write_views(views, path)
    }
}

/// Serialize a view bundle to `path`.
pub fn write_views(views: &ViewBundle, path: &Path) -> DashboardResult<()> {
    let json = serde_json::to_string_pretty(views).map_err(|e| DashboardError::Export {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, json).map_err(|source| DashboardError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Exported views to {}", path.display());
    Ok(())
}
