//! Application shell and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use egui_extras::{Column, TableBuilder};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use log::info;

mod aggregation;
mod calendar;
mod export;
use export::{save_entries_csv, save_entries_json, save_graph_svg};
mod graph;
use graph::{Graph, build_graph};
mod projection;
use projection::{Position, SURFACE_SIZE};
mod store;
use store::{EntryStore, JsonFileStore, Key, StoreError, resolve_data_file};
mod svg;
mod trend;

const TOAST_DURATION: Duration = Duration::from_secs(3);
const GRAPH_MAX_SIZE: f32 = 420.0;
/// Room kept below the entry list for the form.
const FORM_HEIGHT: f32 = 48.0;

/// Days and weights written by the debug view's sample seeding.
const SAMPLE_DAYS: [u32; 5] = [1, 5, 12, 18, 25];
const SAMPLE_WEIGHTS: [f64; 5] = [80.0, 79.5, 79.0, 78.0, 77.5];

/// A single weight measurement in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub weight: f64,
    pub timestamp: DateTime<Local>,
}

impl Entry {
    pub fn new(weight: f64, timestamp: DateTime<Local>) -> Self {
        Self { weight, timestamp }
    }

    /// Store key: the timestamp in milliseconds.
    pub fn key(&self) -> Key {
        self.timestamp.timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    const LB_PER_KG: f64 = 2.204_622_621_8;

    fn factor(self) -> f64 {
        match self {
            WeightUnit::Kg => 1.0,
            WeightUnit::Lb => Self::LB_PER_KG,
        }
    }

    fn from_kg(self, kg: f64) -> f64 {
        kg * self.factor()
    }

    fn to_kg(self, value: f64) -> f64 {
        value / self.factor()
    }

    fn symbol(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }

    fn toggled(self) -> Self {
        match self {
            WeightUnit::Kg => WeightUnit::Lb,
            WeightUnit::Lb => WeightUnit::Kg,
        }
    }
}

/// Format a kilogram value in `unit` with at most two decimals.
fn format_weight(kg: f64, unit: WeightUnit) -> String {
    let text = format!("{:.2}", unit.from_kg(kg));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", unit.symbol())
}

#[derive(Debug, Error, PartialEq)]
enum InputError {
    #[error("enter a weight first")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("{0} is not a valid weight")]
    OutOfRange(f64),
}

/// Parse the weight form field, returning kilograms.
fn parse_weight(input: &str, unit: WeightUnit) -> Result<f64, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InputError::Empty);
    }
    let value: f64 = input
        .parse()
        .map_err(|_| InputError::NotANumber(input.to_string()))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(InputError::OutOfRange(value));
    }
    Ok(unit.to_kg(value))
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum View {
    Main,
    Debug,
}

fn default_true() -> bool {
    true
}

fn default_view() -> View {
    View::Main
}

fn default_unit() -> WeightUnit {
    WeightUnit::Kg
}

/// Persistent configuration for user preferences.
///
/// Stored as JSON in the config directory. Every field has a serde default so
/// files written by older versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default = "default_unit")]
    unit: WeightUnit,
    #[serde(default = "default_true")]
    show_trend: bool,
    #[serde(default = "default_true")]
    show_points: bool,
    /// Overrides the default entry store location.
    #[serde(default)]
    data_file: Option<String>,
    #[serde(default = "default_view")]
    last_view: View,
}

impl Settings {
    const FILE: &'static str = "waight_settings.json";

    fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed settings {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                if let Err(e) = std::fs::write(&path, data) {
                    log::warn!("Failed to save settings to {}: {e}", path.display());
                }
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit: WeightUnit::Kg,
            show_trend: true,
            show_points: true,
            data_file: None,
            last_view: View::Main,
        }
    }
}

struct WaightApp {
    store: Option<Box<dyn EntryStore>>,
    entries: Vec<Entry>,
    month: NaiveDate,
    settings: Settings,
    weight_input: String,
    graph_error: Option<String>,
    status: Option<(String, Instant)>,
    settings_dirty: bool,
}

impl Default for WaightApp {
    fn default() -> Self {
        let settings = Settings::load();
        let store: Option<Box<dyn EntryStore>> =
            match resolve_data_file(settings.data_file.as_deref()) {
                Some(path) => match JsonFileStore::open(&path) {
                    Ok(store) => Some(Box::new(store)),
                    Err(e) => {
                        log::error!("Failed to open entry store {}: {e}", path.display());
                        None
                    }
                },
                None => {
                    log::error!("No config directory to keep entries in");
                    None
                }
            };
        let mut app = Self::new(settings, store);
        if app.store.is_none() {
            app.set_status("Entry store unavailable, see log for details".into());
        }
        app
    }
}

impl WaightApp {
    fn new(settings: Settings, store: Option<Box<dyn EntryStore>>) -> Self {
        let mut app = Self {
            store,
            entries: Vec::new(),
            month: calendar::first_day(Local::now().date_naive()),
            settings,
            weight_input: String::new(),
            graph_error: None,
            status: None,
            settings_dirty: false,
        };
        if let Err(e) = app.refetch() {
            log::error!("Failed to read entries: {e}");
        }
        app
    }

    fn store_mut(&mut self) -> Result<&mut Box<dyn EntryStore>, StoreError> {
        self.store.as_mut().ok_or(StoreError::NotReady)
    }

    /// Replace the entry snapshot with the store's current contents.
    fn refetch(&mut self) -> Result<(), StoreError> {
        if let Some(store) = &self.store {
            self.entries = store.get_all()?;
        }
        Ok(())
    }

    fn submit(&mut self) -> Result<(), AppError> {
        let weight = parse_weight(&self.weight_input, self.settings.unit)?;
        let entry = Entry::new(weight, Local::now());
        info!("Recording {weight} kg at {}", entry.timestamp);
        self.store_mut()?.add(entry)?;
        self.weight_input.clear();
        self.refetch()?;
        Ok(())
    }

    fn remove(&mut self, key: Key) -> Result<(), AppError> {
        info!("Deleting entry {key}");
        self.store_mut()?.delete(key)?;
        self.refetch()?;
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), AppError> {
        info!("Clearing all entries");
        self.store_mut()?.clear()?;
        self.refetch()?;
        Ok(())
    }

    /// Replace the store contents with a handful of entries in the displayed
    /// month.
    fn seed_sample_data(&mut self) -> Result<(), AppError> {
        let month = self.month;
        let store = self.store_mut()?;
        store.clear()?;
        for (day, weight) in SAMPLE_DAYS.into_iter().zip(SAMPLE_WEIGHTS) {
            let timestamp = month
                .with_day(day)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .and_then(|t| Local.from_local_datetime(&t).earliest());
            if let Some(timestamp) = timestamp {
                store.add(Entry::new(weight, timestamp))?;
            }
        }
        info!("Seeded sample entries for {}", month.format("%Y-%m"));
        self.refetch()?;
        Ok(())
    }

    /// Switch units, converting whatever is typed in the weight field.
    fn toggle_unit(&mut self) {
        let from = self.settings.unit;
        let to = from.toggled();
        if let Ok(kg) = parse_weight(&self.weight_input, from) {
            self.weight_input = format!("{:.2}", to.from_kg(kg));
        }
        self.settings.unit = to;
        self.settings_dirty = true;
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }

    fn report(&mut self, result: Result<(), AppError>) {
        if let Err(e) = result {
            log::error!("{e}");
            self.set_status(e.to_string());
        }
    }

    fn export_entries(&mut self, json: bool) {
        let dialog = if json {
            FileDialog::new().add_filter("JSON", &["json"])
        } else {
            FileDialog::new().add_filter("CSV", &["csv"])
        };
        let Some(path) = dialog.save_file() else {
            return;
        };
        let res = if json {
            save_entries_json(&path, &self.entries).map_err(|e| e.to_string())
        } else {
            save_entries_csv(&path, &self.entries).map_err(|e| e.to_string())
        };
        match res {
            Ok(()) => info!("Exported {} entries to {}", self.entries.len(), path.display()),
            Err(e) => {
                log::error!("Failed to export entries: {e}");
                self.set_status(format!("Export failed: {e}"));
            }
        }
    }

    fn export_graph(&mut self) {
        if let Some(path) = FileDialog::new().add_filter("SVG", &["svg"]).save_file() {
            let graph = build_graph(&self.entries, self.month);
            if let Err(e) = save_graph_svg(&path, &graph) {
                log::error!("Failed to export graph: {e}");
                self.set_status(format!("Export failed: {e}"));
            }
        }
    }

    fn month_navigation(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("◀").on_hover_text("Previous month").clicked() {
                self.month = calendar::previous_month(self.month);
            }
            ui.label(self.month.format("%B %Y").to_string());
            if ui.button("▶").on_hover_text("Next month").clicked() {
                self.month = calendar::next_month(self.month);
            }
            if ui.button("Today").clicked() {
                self.month = calendar::first_day(Local::now().date_naive());
            }
        });
    }

    /// Draw the graph, replacing it with an error panel if building it fails.
    fn graph_section(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = self.graph_error.clone() {
            let mut retry = false;
            ui.group(|ui| {
                ui.heading("Error creating graph");
                egui::CollapsingHeader::new("Error").show(ui, |ui| {
                    ui.monospace(&err);
                });
                retry = ui.button("Try again").clicked();
            });
            if retry {
                self.graph_error = None;
                let res = self.refetch().map_err(AppError::from);
                self.report(res);
            }
            return;
        }

        let entries = &self.entries;
        let month = self.month;
        match std::panic::catch_unwind(AssertUnwindSafe(|| build_graph(entries, month))) {
            Ok(graph) => paint_graph(ui, &graph, &self.settings),
            Err(payload) => {
                let msg = panic_message(&*payload);
                log::error!("Graph rendering failed: {msg}");
                self.graph_error = Some(msg);
            }
        }
    }

    fn entry_list(&mut self, ui: &mut egui::Ui) {
        let unit = self.settings.unit;
        let mut remove = None;
        let height = (ui.available_height() - FORM_HEIGHT).max(0.0);
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(height)
            .column(Column::auto().at_least(90.0))
            .column(Column::remainder())
            .column(Column::auto())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Weight");
                });
                header.col(|ui| {
                    ui.strong("Recorded");
                });
                header.col(|_| {});
            })
            .body(|mut body| {
                for e in &self.entries {
                    body.row(24.0, |mut row| {
                        row.col(|ui| {
                            ui.label(format_weight(e.weight, unit));
                        });
                        row.col(|ui| {
                            ui.label(e.timestamp.format("%x %H:%M").to_string());
                        });
                        row.col(|ui| {
                            if ui.button("🗑").on_hover_text("Delete").clicked() {
                                remove = Some(e.key());
                            }
                        });
                    });
                }
            });
        if let Some(key) = remove {
            let res = self.remove(key);
            self.report(res);
        }
    }

    fn entry_form(&mut self, ui: &mut egui::Ui) {
        if self.store.is_none() {
            return;
        }
        ui.horizontal(|ui| {
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.weight_input)
                    .hint_text("Enter weight")
                    .desired_width(140.0),
            );
            if ui
                .button(self.settings.unit.symbol())
                .on_hover_text("Switch unit")
                .clicked()
            {
                self.toggle_unit();
            }
            let enter = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("➕ Add").clicked() || enter {
                let res = self.submit();
                self.report(res);
            }
        });
    }

    fn debug_tools(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Seed sample data").clicked() {
                let res = self.seed_sample_data();
                self.report(res);
            }
            if ui.button("Clear all").clicked() {
                let res = self.clear_all();
                self.report(res);
            }
        });
        ui.label(format!("{} entries in store", self.entries.len()));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Paint a graph on a square region scaled from the 100x100 surface.
fn paint_graph(ui: &mut egui::Ui, graph: &Graph, settings: &Settings) {
    let side = ui.available_width().min(GRAPH_MAX_SIZE);
    let (response, painter) = ui.allocate_painter(egui::vec2(side, side), egui::Sense::hover());
    let rect = response.rect;
    let scale = rect.width() / SURFACE_SIZE as f32;
    let to_screen = |p: Position| rect.min + egui::vec2(p.x as f32 * scale, p.y as f32 * scale);

    let axis_color = ui.visuals().weak_text_color();
    let axis_stroke = egui::Stroke::new(1.0, axis_color);
    let font = egui::FontId::proportional(11.0);
    let tick = 2.0;

    painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

    for t in &graph.y_ticks {
        let a = to_screen(Position { x: 0.0, y: t.position });
        let b = to_screen(Position { x: tick, y: t.position });
        painter.line_segment([a, b], axis_stroke);
        painter.text(
            b + egui::vec2(3.0, 0.0),
            egui::Align2::LEFT_CENTER,
            format_weight(t.weight, settings.unit),
            font.clone(),
            axis_color,
        );
    }
    for t in &graph.x_ticks {
        let a = to_screen(Position { x: t.position, y: SURFACE_SIZE });
        let b = to_screen(Position { x: t.position, y: SURFACE_SIZE - tick });
        painter.line_segment([a, b], axis_stroke);
        painter.text(
            b - egui::vec2(0.0, 2.0),
            egui::Align2::CENTER_BOTTOM,
            t.day.to_string(),
            font.clone(),
            axis_color,
        );
    }

    if settings.show_trend {
        if let Some(seg) = graph.trend {
            painter.line_segment(
                [to_screen(seg.from), to_screen(seg.to)],
                egui::Stroke::new(1.5, ui.visuals().text_color()),
            );
        }
    }
    if settings.show_points {
        for p in &graph.points {
            painter.circle_filled(to_screen(*p), 4.0, egui::Color32::RED);
        }
    }

    if let Some(pos) = response.hover_pos() {
        let local = (pos - rect.min) / scale;
        let projector = graph.projector();
        let day = projector.unproject_x(local.x as f64);
        let kg = projector.unproject_y(local.y as f64);
        response.on_hover_text(format!(
            "Day {:.1}, {}",
            day,
            format_weight(kg, settings.unit)
        ));
    }

    if let Some(r) = graph.regression.filter(|r| r.slope.is_finite()) {
        ui.label(format!(
            "Trend: {} per week",
            format_weight(r.slope * 7.0, settings.unit)
        ));
    }
}

impl App for WaightApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Export Entries CSV").clicked() {
                        self.export_entries(false);
                        ui.close_menu();
                    }
                    if ui.button("Export Entries JSON").clicked() {
                        self.export_entries(true);
                        ui.close_menu();
                    }
                    if ui.button("Export Graph SVG").clicked() {
                        self.export_graph();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("View", |ui| {
                    let view = self.settings.last_view;
                    ui.radio_value(&mut self.settings.last_view, View::Main, "Main");
                    ui.radio_value(&mut self.settings.last_view, View::Debug, "Debug");
                    let trend = ui.checkbox(&mut self.settings.show_trend, "Show trend line");
                    let points = ui.checkbox(&mut self.settings.show_points, "Show points");
                    if view != self.settings.last_view || trend.changed() || points.changed() {
                        self.settings_dirty = true;
                    }
                });
            });
        });

        let expired = self
            .status
            .as_ref()
            .is_some_and(|(_, start)| start.elapsed() >= TOAST_DURATION);
        if expired {
            self.status = None;
        }
        if let Some((msg, _)) = &self.status {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.label(msg.as_str());
            });
            ctx.request_repaint_after(TOAST_DURATION);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.settings.last_view {
                View::Main => ui.heading("Waight"),
                View::Debug => ui.heading("Debug"),
            };
            self.month_navigation(ui);
            self.graph_section(ui);
            ui.separator();
            match self.settings.last_view {
                View::Main => {
                    self.entry_list(ui);
                    ui.separator();
                    self.entry_form(ui);
                }
                View::Debug => self.debug_tools(ui),
            }
        });

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([480.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Waight",
        options,
        Box::new(|_cc| Box::new(WaightApp::default())),
    )
}
