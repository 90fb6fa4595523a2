//! The pitview desktop app: selector cascade, load pipeline, chart stack.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use egui::{Color32, Frame, Layout, Margin, RichText, Ui};
use egui_dropdown::DropDownBox;
use log::{debug, info, warn};

use crate::axis::{AxisDomain, AxisMode, map_axis};
use crate::cardata::{CarSample, decode_car_stream};
use crate::catalog::{
    self, CatalogIndex, DriverRoster, SessionDescriptor, catalog_path, resolve_session,
};
use crate::errors::PitviewError;
use crate::laps::{LapBoundary, extract_lap_boundaries};
use crate::series::{BuiltChart, build_charts};
use crate::source::{DataCache, FsTelemetrySource, TelemetrySource};
use crate::state::{ViewEvent, ViewPhase, transition};
use crate::sync::{ChartPatch, ChartSyncState, SyncCoordinator};

mod charts;
pub mod config;

use config::AppConfig;

/// Marker drawn on a chart after a hover patch.
pub(crate) struct HoverMarker {
    pub(crate) x: f64,
    pub(crate) flip_left: bool,
}

/// One rendered chart plus its interaction state.
pub(crate) struct ChartView {
    pub(crate) built: BuiltChart,
    pub(crate) pending: Vec<ChartPatch>,
    pub(crate) marker: Option<HoverMarker>,
    pub(crate) last_bounds: Option<(f64, f64)>,
}

impl ChartView {
    fn new(built: BuiltChart) -> Self {
        Self {
            built,
            pending: Vec::new(),
            marker: None,
            last_bounds: None,
        }
    }
}

/// Everything built for the current session view; discarded wholesale on the
/// next load.
pub(crate) struct LoadedView {
    pub(crate) driver_label: String,
    pub(crate) domain: AxisDomain,
    pub(crate) charts: Vec<ChartView>,
    pub(crate) coordinator: SyncCoordinator,
}

struct LoadRequest {
    generation: u64,
    source: Arc<FsTelemetrySource>,
    descriptor: SessionDescriptor,
    racing_number: String,
    axis_mode: AxisMode,
    cached_boundaries: Option<Arc<Vec<LapBoundary>>>,
}

struct LoadedData {
    samples: Vec<CarSample>,
    boundaries: Arc<Vec<LapBoundary>>,
    /// Set when the worker parsed a lap stream the UI should cache.
    fresh_boundaries: Option<String>,
    warnings: Vec<String>,
}

struct LoadReply {
    generation: u64,
    result: Result<LoadedData, String>,
}

/// Runs the fetch+decode part of a load. Car data is required; the lap
/// stream degrades to an empty boundary set with a warning.
fn run_load(request: &LoadRequest) -> Result<LoadedData, String> {
    let mut warnings = Vec::new();

    let car_data_path = request.descriptor.car_data_path();
    let raw = request
        .source
        .fetch_text(&car_data_path)
        .map_err(|e| e.to_string())?;
    let samples = decode_car_stream(&raw, &request.racing_number);

    let mut fresh_boundaries = None;
    let boundaries = if request.axis_mode == AxisMode::Lap {
        if let Some(cached) = &request.cached_boundaries {
            debug!("using cached lap boundaries");
            cached.clone()
        } else {
            let lap_path = request.descriptor.lap_stream_path();
            match request.source.fetch_text(&lap_path) {
                Ok(lap_raw) => {
                    let parsed = extract_lap_boundaries(&lap_raw);
                    if parsed.is_empty() {
                        warnings
                            .push("Lap stream contained no usable lap data.".to_string());
                    }
                    fresh_boundaries = Some(lap_path);
                    Arc::new(parsed)
                }
                Err(e) => {
                    warn!("lap stream unavailable: {e}");
                    warnings.push("No lap data found for this session.".to_string());
                    Arc::new(Vec::new())
                }
            }
        }
    } else {
        request
            .cached_boundaries
            .clone()
            .unwrap_or_else(|| Arc::new(Vec::new()))
    };

    Ok(LoadedData {
        samples,
        boundaries,
        fresh_boundaries,
        warnings,
    })
}

/// Maps the driver selection to a racing number. With a roster the label
/// picked from the dropdown resolves through it; without one (roster fetch
/// failed) the field is taken as a raw car number, so a missing driver list
/// degrades driver filtering instead of blocking the load.
fn resolve_racing_number(
    roster: Option<&DriverRoster>,
    selection: &str,
) -> Result<String, PitviewError> {
    match roster {
        Some(roster) => catalog::driver_options(roster)
            .into_iter()
            .find(|(_, label)| label == selection)
            .and_then(|(tla, _)| catalog::find_driver(roster, &tla))
            .map(|driver| driver.racing_number.clone())
            .ok_or_else(|| PitviewError::DriverNotFound {
                tla: selection.to_string(),
            }),
        None => {
            let number = selection.trim();
            if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                return Err(PitviewError::DriverNotFound {
                    tla: selection.to_string(),
                });
            }
            Ok(number.to_string())
        }
    }
}

pub struct PitviewApp {
    config: AppConfig,
    source: Option<Arc<FsTelemetrySource>>,
    phase: ViewPhase,

    years: Vec<String>,
    selected_year: String,
    selected_gp: String,
    selected_session: String,
    selected_driver: String,
    previous_selection: (String, String, String),
    axis_mode: AxisMode,

    catalog_cache: DataCache<CatalogIndex>,
    roster_cache: DataCache<DriverRoster>,
    lap_cache: DataCache<Vec<LapBoundary>>,
    catalog: Option<Arc<CatalogIndex>>,
    roster: Option<Arc<DriverRoster>>,

    generation: u64,
    load_tx: Sender<LoadReply>,
    load_rx: Receiver<LoadReply>,

    pub(crate) view: Option<LoadedView>,
    warnings: Vec<String>,
}

impl PitviewApp {
    pub fn new(config: AppConfig, _cc: &eframe::CreationContext<'_>) -> Self {
        let (load_tx, load_rx) = mpsc::channel();
        let mut app = Self {
            config,
            source: None,
            phase: ViewPhase::NoSelection,
            years: Vec::new(),
            selected_year: String::new(),
            selected_gp: String::new(),
            selected_session: String::new(),
            selected_driver: String::new(),
            previous_selection: Default::default(),
            axis_mode: AxisMode::Time,
            catalog_cache: DataCache::default(),
            roster_cache: DataCache::default(),
            lap_cache: DataCache::default(),
            catalog: None,
            roster: None,
            generation: 0,
            load_tx,
            load_rx,
            view: None,
            warnings: Vec::new(),
        };
        if let Some(dir) = app.config.data_dir.clone() {
            app.set_data_dir(dir);
        }
        app
    }

    fn set_data_dir(&mut self, dir: std::path::PathBuf) {
        let source = Arc::new(FsTelemetrySource::new(dir.clone()));
        self.years = source.years();
        self.source = Some(source);
        self.config.data_dir = Some(dir);
        if let Err(e) = self.config.save() {
            warn!("could not persist config: {e}");
        }
        // A new data directory invalidates everything loaded so far.
        self.catalog_cache.clear();
        self.roster_cache.clear();
        self.lap_cache.clear();
        self.catalog = None;
        self.roster = None;
        self.view = None;
        self.selected_year.clear();
        self.selected_gp.clear();
        self.selected_session.clear();
        self.selected_driver.clear();
        self.phase = ViewPhase::NoSelection;
        if self.years.contains(&self.config.preferred_year) {
            let year = self.config.preferred_year.clone();
            self.select_year(year);
        } else if let Some(year) = self.years.last().cloned() {
            self.select_year(year);
        }
    }

    fn select_year(&mut self, year: String) {
        self.selected_year = year.clone();
        self.selected_gp.clear();
        self.selected_session.clear();
        self.selected_driver.clear();
        self.roster = None;
        self.phase = transition(&self.phase, &ViewEvent::CatalogRequested);
        let Some(source) = self.source.clone() else {
            return;
        };
        let path = catalog_path(&year);
        match self
            .catalog_cache
            .get_or_load(&path, || source.fetch_json(&path))
        {
            Ok(index) => {
                self.catalog = Some(index);
                self.phase = transition(&self.phase, &ViewEvent::CatalogLoaded);
            }
            Err(e) => {
                self.catalog = None;
                self.phase = transition(
                    &self.phase,
                    &ViewEvent::CatalogFailed {
                        message: format!("Could not load the {year} catalog: {e}"),
                    },
                );
            }
        }
    }

    /// Resolves the current (gp, session) selection against the loaded
    /// catalog; the label shown in the dropdown maps back to the session
    /// name here.
    fn resolved_descriptor(&self) -> Option<SessionDescriptor> {
        let catalog = self.catalog.as_ref()?;
        let session_name = catalog::session_options(catalog, &self.selected_gp)
            .into_iter()
            .find(|(_, label)| *label == self.selected_session)
            .map(|(name, _)| name)?;
        resolve_session(catalog, &self.selected_year, &self.selected_gp, &session_name).ok()
    }

    fn refresh_roster(&mut self) {
        self.roster = None;
        let Some(descriptor) = self.resolved_descriptor() else {
            return;
        };
        let Some(source) = self.source.clone() else {
            return;
        };
        let path = descriptor.driver_list_path();
        match self
            .roster_cache
            .get_or_load(&path, || source.fetch_json(&path))
        {
            Ok(roster) => self.roster = Some(roster),
            Err(e) => {
                // Degrade: no driver filtering without a roster, but the
                // selection itself survives.
                warn!("roster unavailable: {e}");
                self.warnings
                    .push("Driver list unavailable for this session.".to_string());
            }
        }
    }

    fn selection_complete(&self) -> bool {
        !self.selected_year.is_empty()
            && !self.selected_gp.is_empty()
            && !self.selected_session.is_empty()
            && !self.selected_driver.is_empty()
    }

    fn request_load(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        let Some(descriptor) = self.resolved_descriptor() else {
            self.phase = ViewPhase::Error {
                message: "The selected session could not be resolved.".to_string(),
            };
            self.view = None;
            return;
        };
        let racing_number =
            match resolve_racing_number(self.roster.as_deref(), &self.selected_driver) {
                Ok(number) => number,
                Err(e) => {
                    self.phase = ViewPhase::Error {
                        message: e.to_string(),
                    };
                    self.view = None;
                    return;
                }
            };

        self.generation += 1;
        self.warnings.clear();
        self.phase = transition(
            &self.phase,
            &ViewEvent::LoadRequested {
                generation: self.generation,
            },
        );

        let request = LoadRequest {
            generation: self.generation,
            source,
            cached_boundaries: self.lap_cache.get(&descriptor.lap_stream_path()),
            descriptor,
            racing_number,
            axis_mode: self.axis_mode,
        };
        let tx = self.load_tx.clone();
        thread::spawn(move || {
            let result = run_load(&request);
            let _ = tx.send(LoadReply {
                generation: request.generation,
                result,
            });
        });
    }

    fn poll_load(&mut self) {
        while let Ok(reply) = self.load_rx.try_recv() {
            if reply.generation != self.generation {
                debug!("discarding stale load (generation {})", reply.generation);
                continue;
            }
            match reply.result {
                Ok(data) => {
                    if let Some(path) = &data.fresh_boundaries {
                        self.lap_cache
                            .insert(path.clone(), (*data.boundaries).clone());
                    }
                    self.warnings.extend(data.warnings.iter().cloned());
                    self.finish_load(&data);
                    self.phase = transition(
                        &self.phase,
                        &ViewEvent::FetchCompleted {
                            generation: reply.generation,
                        },
                    );
                }
                Err(message) => {
                    // Never leave stale charts next to an error display.
                    self.view = None;
                    self.phase = transition(
                        &self.phase,
                        &ViewEvent::FetchFailed {
                            generation: reply.generation,
                            message,
                        },
                    );
                }
            }
        }
    }

    fn finish_load(&mut self, data: &LoadedData) {
        let mapping = map_axis(&data.samples, &data.boundaries, self.axis_mode);
        if mapping.degraded {
            self.warnings
                .push("No lap data available; showing the time axis instead.".to_string());
        }
        let charts = build_charts(&data.samples, &mapping.xs);
        let sync_states = charts
            .iter()
            .map(|c| ChartSyncState {
                xs: c.xs.clone(),
                visible: (0.0, 0.0),
            })
            .collect();
        info!(
            "loaded {} samples into {} charts ({:?} axis)",
            data.samples.len(),
            charts.len(),
            mapping.domain
        );
        self.view = Some(LoadedView {
            driver_label: self.selected_driver.clone(),
            domain: mapping.domain,
            charts: charts.into_iter().map(ChartView::new).collect(),
            coordinator: SyncCoordinator::new(sync_states),
        });
    }

    fn show_selectors(&mut self, ui: &mut Ui) {
        ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
            if ui.button("📂 Data folder").clicked()
                && let Some(dir) = rfd::FileDialog::new().pick_folder()
            {
                self.set_data_dir(dir);
            }

            let previous_year = self.selected_year.clone();
            ui.separator();
            ui.label(RichText::new("Year: ").color(Color32::WHITE));
            ui.add(
                DropDownBox::from_iter(
                    self.years.iter(),
                    "year_dropbox",
                    &mut self.selected_year,
                    |ui, text| ui.selectable_label(false, text),
                )
                .filter_by_input(false),
            );
            if previous_year != self.selected_year && !self.selected_year.is_empty() {
                let year = self.selected_year.clone();
                self.select_year(year);
            }

            if let Some(catalog) = self.catalog.clone() {
                ui.separator();
                ui.label(RichText::new("GP: ").color(Color32::WHITE));
                ui.add(
                    DropDownBox::from_iter(
                        catalog::meeting_options(&catalog),
                        "gp_dropbox",
                        &mut self.selected_gp,
                        |ui, text| ui.selectable_label(false, text),
                    )
                    .filter_by_input(false),
                );

                if !self.selected_gp.is_empty() {
                    ui.separator();
                    ui.label(RichText::new("Session: ").color(Color32::WHITE));
                    let session_labels: Vec<String> =
                        catalog::session_options(&catalog, &self.selected_gp)
                            .into_iter()
                            .map(|(_, label)| label)
                            .collect();
                    ui.add(
                        DropDownBox::from_iter(
                            session_labels,
                            "session_dropbox",
                            &mut self.selected_session,
                            |ui, text| ui.selectable_label(false, text),
                        )
                        .filter_by_input(false),
                    );
                }
            }

            if !self.selected_session.is_empty() {
                ui.separator();
                if let Some(roster) = self.roster.clone() {
                    ui.label(RichText::new("Driver: ").color(Color32::WHITE));
                    let driver_labels: Vec<String> = catalog::driver_options(&roster)
                        .into_iter()
                        .map(|(_, label)| label)
                        .collect();
                    ui.add(
                        DropDownBox::from_iter(
                            driver_labels,
                            "driver_dropbox",
                            &mut self.selected_driver,
                            |ui, text| ui.selectable_label(false, text),
                        )
                        .filter_by_input(false),
                    );
                } else {
                    // No roster for this session; take a raw car number.
                    ui.label(RichText::new("Car #: ").color(Color32::WHITE));
                    ui.text_edit_singleline(&mut self.selected_driver);
                }
            }

            ui.separator();
            let previous_mode = self.axis_mode;
            ui.radio_value(&mut self.axis_mode, AxisMode::Time, "Time");
            ui.radio_value(&mut self.axis_mode, AxisMode::Lap, "Lap");
            if previous_mode != self.axis_mode && self.view.is_some() {
                // Series are rebuilt per axis mode; rerun the load.
                self.request_load();
            }

            ui.separator();
            let loading = matches!(self.phase, ViewPhase::DataLoading { .. });
            if ui
                .add_enabled(
                    self.selection_complete() && !loading,
                    egui::Button::new("Load data"),
                )
                .clicked()
            {
                self.request_load();
            }
        });
    }

    fn handle_selection_changes(&mut self) {
        let current = (
            self.selected_gp.clone(),
            self.selected_session.clone(),
            self.selected_driver.clone(),
        );
        if current == self.previous_selection {
            return;
        }
        let (previous_gp, previous_session, _) = self.previous_selection.clone();
        if current.0 != previous_gp {
            self.selected_session.clear();
            self.selected_driver.clear();
            self.roster = None;
        } else if current.1 != previous_session {
            self.selected_driver.clear();
            if !self.selected_session.is_empty() {
                self.refresh_roster();
            }
        }
        self.previous_selection = (
            self.selected_gp.clone(),
            self.selected_session.clone(),
            self.selected_driver.clone(),
        );
        self.phase = transition(&self.phase, &ViewEvent::SelectionChanged);
    }

    fn status_line(&self) -> (String, Color32) {
        match &self.phase {
            ViewPhase::NoSelection => (
                "Pick a data folder and a year to begin.".to_string(),
                Color32::GRAY,
            ),
            ViewPhase::CatalogLoading => ("Loading catalog…".to_string(), Color32::GRAY),
            ViewPhase::AwaitingSelection => (
                "Select a Grand Prix, session and driver, then load the data.".to_string(),
                Color32::GRAY,
            ),
            ViewPhase::DataLoading { .. } => ("Loading session data…".to_string(), Color32::GRAY),
            ViewPhase::Rendered => (
                format!(
                    "{} — {} — {} — {}",
                    self.selected_year,
                    self.selected_gp,
                    self.selected_session,
                    self.selected_driver
                ),
                Color32::WHITE,
            ),
            ViewPhase::Error { message } => (message.clone(), Color32::RED),
        }
    }
}

impl eframe::App for PitviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load();

        egui::TopBottomPanel::top("selectors")
            .frame(Frame::default().inner_margin(Margin::same(5)))
            .show(ctx, |ui| {
                self.show_selectors(ui);
            });
        self.handle_selection_changes();

        egui::CentralPanel::default()
            .frame(Frame::default().inner_margin(Margin::same(5)))
            .show(ctx, |ui| {
                let (status, color) = self.status_line();
                ui.label(RichText::new(status).color(color));
                for warning in &self.warnings {
                    ui.label(RichText::new(warning).color(Color32::ORANGE));
                }
                ui.separator();
                if self.view.is_some() {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        self.charts_view(ui);
                    });
                }
            });

        if matches!(self.phase, ViewPhase::DataLoading { .. }) {
            ctx.request_repaint();
        }
    }
}
