pub(crate) mod charts;
pub(crate) mod config;

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Datelike;
use egui::{
    Align, Color32, Direction, Frame, Layout, Margin, RichText, Ui, Visuals, style::Widgets,
};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Line, MarkerShape, Plot, PlotPoints, Points};
use log::{error, info};

use config::AppConfig;
use pitwall::analysis::{
    FastestLap, LapTimeSummary, average_sector_times, build_lap_table, fastest_laps,
    lap_telemetry, lap_time_summary,
};
use pitwall::errors::DashboardError;
use pitwall::provider::{
    MIN_SEASON, ScheduleCache, SessionCache, SessionKey, SessionKind, SessionProvider,
};
use pitwall::session::SessionData;

pub(crate) const PALETTE_CARBON: Color32 = Color32::from_rgb(16, 16, 18);
pub(crate) const PALETTE_GRAPHITE: Color32 = Color32::from_rgb(38, 38, 44);
pub(crate) const PALETTE_RACING_RED: Color32 = Color32::from_rgb(225, 6, 0);

/// Series colors cycled per selected driver.
const DRIVER_COLORS: [Color32; 10] = [
    Color32::from_rgb(54, 117, 214),
    Color32::from_rgb(232, 115, 44),
    Color32::from_rgb(76, 175, 80),
    Color32::from_rgb(211, 47, 47),
    Color32::from_rgb(156, 91, 182),
    Color32::from_rgb(0, 172, 193),
    Color32::from_rgb(251, 192, 45),
    Color32::from_rgb(236, 64, 122),
    Color32::from_rgb(141, 110, 99),
    Color32::from_rgb(158, 158, 158),
];

/// Number of drivers pre-selected when a session finishes loading.
const DEFAULT_DRIVER_SELECTION: usize = 3;

#[derive(Clone, Copy, PartialEq)]
enum Tab {
    LapAnalysis,
    Telemetry,
    Statistics,
}

#[derive(Clone, Copy)]
struct TableSort {
    column: usize,
    ascending: bool,
}

struct LoadedSession {
    key: SessionKey,
    data: Arc<SessionData>,
}

pub struct DashboardApp {
    provider: Arc<dyn SessionProvider>,
    app_config: AppConfig,
    schedule_cache: ScheduleCache,
    session_cache: SessionCache,
    current_year: u16,

    // session selection
    year: u16,
    event: String,
    kind: SessionKind,
    schedule_error: Option<(u16, String)>,

    // in-flight load, polled every frame
    load_rx: Option<Receiver<(SessionKey, Result<SessionData, DashboardError>)>>,
    loading_key: Option<SessionKey>,
    load_error: Option<String>,

    // loaded session and view selections
    loaded: Option<LoadedSession>,
    selected_drivers: Vec<String>,
    tab: Tab,
    telemetry_driver: String,
    telemetry_lap: Option<u32>,
    fastest_sort: TableSort,
    summary_sort: TableSort,
}

impl DashboardApp {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_RACING_RED,
            faint_bg_color: PALETTE_GRAPHITE,
            extreme_bg_color: PALETTE_CARBON,
            panel_fill: PALETTE_CARBON,
            button_frame: true,
            window_fill: PALETTE_CARBON,
            widgets: Widgets::dark(),
            striped: true,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let current_year = chrono::Utc::now().year() as u16;
        let year = app_config.year.clamp(MIN_SEASON, current_year);
        let kind =
            SessionKind::from_code(&app_config.session_code).unwrap_or(SessionKind::Race);
        let event = app_config.event.clone().unwrap_or_default();
        let session_cache =
            SessionCache::new(Duration::from_secs(app_config.session_cache_ttl_s));

        Self {
            provider,
            app_config,
            schedule_cache: ScheduleCache::default(),
            session_cache,
            current_year,
            year,
            event,
            kind,
            schedule_error: None,
            load_rx: None,
            loading_key: None,
            load_error: None,
            loaded: None,
            selected_drivers: Vec::new(),
            tab: Tab::LapAnalysis,
            telemetry_driver: String::new(),
            telemetry_lap: None,
            fastest_sort: TableSort {
                column: 1,
                ascending: true,
            },
            summary_sort: TableSort {
                column: 1,
                ascending: true,
            },
        }
    }

    /// Fetches the selected year's schedule unless it is cached or already
    /// failed for this year; a year change clears the failure and retries.
    fn ensure_schedule(&mut self) -> Vec<String> {
        if let Some((failed_year, _)) = &self.schedule_error
            && *failed_year != self.year
        {
            self.schedule_error = None;
        }

        if self.schedule_cache.get(self.year).is_none() && self.schedule_error.is_none() {
            match self.provider.event_schedule(self.year) {
                Ok(events) => self.schedule_cache.insert(self.year, events),
                Err(e) => {
                    error!("Error fetching the {} schedule: {}", self.year, e);
                    self.schedule_error = Some((self.year, e.to_string()));
                }
            }
        }

        let events = self
            .schedule_cache
            .get(self.year)
            .map(|e| e.to_vec())
            .unwrap_or_default();
        if !events.is_empty() && !events.contains(&self.event) {
            self.event = events[0].clone();
        }
        events
    }

    fn trigger_load(&mut self) {
        let key = SessionKey {
            year: self.year,
            event: self.event.clone(),
            kind: self.kind,
        };

        if let Some(data) = self.session_cache.get(&key) {
            info!("Using cached session data for {} {}", key.event, key.year);
            self.install_session(key, data);
            return;
        }

        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        let request = key.clone();
        thread::spawn(move || {
            let result = provider.load_session(request.year, &request.event, request.kind);
            // the receiver may have been dropped if the app exited
            let _ = tx.send((request, result));
        });
        self.load_rx = Some(rx);
        self.loading_key = Some(key);
    }

    fn poll_load(&mut self) {
        let Some(rx) = &self.load_rx else {
            return;
        };
        match rx.try_recv() {
            Ok((key, result)) => {
                self.load_rx = None;
                if self.loading_key.as_ref() != Some(&key) {
                    // a superseded request; the newer one is still pending
                    return;
                }
                self.loading_key = None;
                match result {
                    Ok(data) => {
                        let data = Arc::new(data);
                        self.session_cache.insert(key.clone(), Arc::clone(&data));
                        self.install_session(key, data);
                    }
                    Err(e) => {
                        error!("Error loading session data: {}", e);
                        self.load_error = Some(e.to_string());
                    }
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.load_rx = None;
                self.loading_key = None;
                self.load_error = Some("Session load worker stopped unexpectedly".to_string());
            }
        }
    }

    /// Replaces the loaded session wholesale and resets the view selections.
    fn install_session(&mut self, key: SessionKey, data: Arc<SessionData>) {
        self.load_error = None;
        self.selected_drivers = data
            .driver_abbreviations()
            .into_iter()
            .take(DEFAULT_DRIVER_SELECTION)
            .collect();
        self.telemetry_driver = self.selected_drivers.first().cloned().unwrap_or_default();
        self.telemetry_lap = None;
        self.loaded = Some(LoadedSession { key, data });
    }

    fn show_selectors(&mut self, ui: &mut Ui) {
        let events = self.ensure_schedule();

        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label(RichText::new("Year: ").color(Color32::WHITE));
            egui::ComboBox::from_id_salt("year_select")
                .selected_text(self.year.to_string())
                .show_ui(ui, |ui| {
                    for year in (MIN_SEASON..=self.current_year).rev() {
                        ui.selectable_value(&mut self.year, year, year.to_string());
                    }
                });

            ui.separator();
            ui.label(RichText::new("Grand Prix: ").color(Color32::WHITE));
            egui::ComboBox::from_id_salt("event_select")
                .selected_text(self.event.clone())
                .width(220.0)
                .show_ui(ui, |ui| {
                    for event in &events {
                        ui.selectable_value(&mut self.event, event.clone(), event);
                    }
                });

            ui.separator();
            ui.label(RichText::new("Session: ").color(Color32::WHITE));
            egui::ComboBox::from_id_salt("session_select")
                .selected_text(self.kind.provider_name())
                .show_ui(ui, |ui| {
                    for kind in SessionKind::ALL {
                        ui.selectable_value(&mut self.kind, kind, kind.provider_name());
                    }
                });

            ui.separator();
            if self.loading_key.is_some() {
                ui.spinner();
                ui.label("Loading session data...");
            } else if ui.button("Load session").clicked() && !self.event.is_empty() {
                self.trigger_load();
            }
        });

        if let Some((_, message)) = &self.schedule_error {
            ui.label(
                RichText::new(format!("Could not fetch the schedule: {}", message))
                    .color(Color32::RED),
            );
        }
    }

    fn show_driver_selection(&mut self, ui: &mut Ui, data: &SessionData) {
        let all = data.driver_abbreviations();
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("Drivers: ").color(Color32::WHITE));
            for abbreviation in &all {
                let mut selected = self.selected_drivers.contains(abbreviation);
                if ui.checkbox(&mut selected, abbreviation).changed() {
                    if selected {
                        self.selected_drivers.push(abbreviation.clone());
                        // keep the session's natural driver ordering
                        let order = &all;
                        self.selected_drivers
                            .sort_by_key(|d| order.iter().position(|a| a == d));
                    } else {
                        self.selected_drivers.retain(|d| d != abbreviation);
                    }
                }
            }
        });
        if !self.selected_drivers.contains(&self.telemetry_driver) {
            self.telemetry_driver = self.selected_drivers.first().cloned().unwrap_or_default();
            self.telemetry_lap = None;
        }
    }

    fn lap_analysis_view(&mut self, ui: &mut Ui, data: &SessionData) {
        let Some(records) = build_lap_table(data, &self.selected_drivers) else {
            no_data_label(ui);
            return;
        };

        ui.label(RichText::new("Lap times").color(Color32::WHITE).strong());
        let (lines, markers) = charts::lap_time_series(&records);
        Plot::new("lap_times")
            .legend(Legend::default())
            .height(320.0)
            .x_axis_label("Lap")
            .y_axis_label("Lap time (s)")
            .show(ui, |plot_ui| {
                for (idx, line) in lines.iter().enumerate() {
                    plot_ui.line(
                        Line::new(line.driver.clone(), PlotPoints::new(line.points.clone()))
                            .color(driver_color(idx)),
                    );
                }
                for group in &markers {
                    let color = lines
                        .iter()
                        .position(|l| l.driver == group.driver)
                        .map(driver_color)
                        .unwrap_or(Color32::WHITE);
                    plot_ui.points(
                        Points::new(
                            format!("{} ({})", group.driver, group.compound),
                            PlotPoints::new(group.points.clone()),
                        )
                        .shape(compound_marker(&group.compound))
                        .radius(4.0)
                        .color(color),
                    );
                }
            });

        ui.separator();
        ui.label(
            RichText::new("Average sector times")
                .color(Color32::WHITE)
                .strong(),
        );
        let averages = average_sector_times(&records);
        let group_width = 0.8 / averages.len() as f64;
        Plot::new("sector_times")
            .legend(Legend::default())
            .height(260.0)
            .y_axis_label("Time (s)")
            .x_axis_formatter(|mark, _range| match mark.value.round() as i64 {
                1 => "Sector 1".to_string(),
                2 => "Sector 2".to_string(),
                3 => "Sector 3".to_string(),
                _ => String::new(),
            })
            .show(ui, |plot_ui| {
                for (idx, average) in averages.iter().enumerate() {
                    let offset =
                        (idx as f64 - (averages.len() as f64 - 1.0) / 2.0) * group_width;
                    let sectors = [average.sector1_s, average.sector2_s, average.sector3_s];
                    let bars = sectors
                        .iter()
                        .enumerate()
                        .filter_map(|(sector, mean)| {
                            mean.map(|m| {
                                Bar::new((sector + 1) as f64 + offset, m).width(group_width)
                            })
                        })
                        .collect();
                    plot_ui.bar_chart(
                        BarChart::new(average.driver.clone(), bars).color(driver_color(idx)),
                    );
                }
            });
    }

    fn telemetry_view(&mut self, ui: &mut Ui, data: &SessionData) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            ui.label(RichText::new("Driver: ").color(Color32::WHITE));
            let previous_driver = self.telemetry_driver.clone();
            egui::ComboBox::from_id_salt("telemetry_driver")
                .selected_text(self.telemetry_driver.clone())
                .show_ui(ui, |ui| {
                    for driver in &self.selected_drivers {
                        ui.selectable_value(&mut self.telemetry_driver, driver.clone(), driver);
                    }
                });
            if previous_driver != self.telemetry_driver {
                self.telemetry_lap = None;
            }

            ui.separator();
            ui.label(RichText::new("Lap: ").color(Color32::WHITE));
            let lap_numbers: Vec<u32> = data
                .driver(&self.telemetry_driver)
                .map(|d| d.laps.iter().map(|l| l.number).collect())
                .unwrap_or_default();
            egui::ComboBox::from_id_salt("telemetry_lap")
                .selected_text(
                    self.telemetry_lap
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "Fastest".to_string()),
                )
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.telemetry_lap, None, "Fastest");
                    for number in lap_numbers {
                        ui.selectable_value(
                            &mut self.telemetry_lap,
                            Some(number),
                            number.to_string(),
                        );
                    }
                });
        });

        if self.telemetry_driver.is_empty() {
            no_data_label(ui);
            return;
        }

        // a stale lap selection falls back to the fastest lap rather than
        // erroring; a driver with no telemetry at all renders nothing
        let trace = lap_telemetry(data, &self.telemetry_driver, self.telemetry_lap)
            .or_else(|| lap_telemetry(data, &self.telemetry_driver, None));
        let Some(trace) = trace else {
            no_data_label(ui);
            return;
        };

        let channels = charts::telemetry_channels(&trace);
        ui.label(RichText::new(&channels.title).color(Color32::WHITE).strong());
        Plot::new("telemetry_trace")
            .legend(Legend::default())
            .height(360.0)
            .x_axis_label("Distance (m)")
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new("Speed", PlotPoints::new(channels.speed.clone()))
                        .color(Color32::from_rgb(54, 117, 214)),
                );
                if let Some(throttle) = &channels.throttle {
                    plot_ui.line(
                        Line::new("Throttle", PlotPoints::new(throttle.clone()))
                            .color(Color32::GREEN),
                    );
                }
                if let Some(brake) = &channels.brake {
                    plot_ui.line(
                        Line::new("Brake", PlotPoints::new(brake.clone())).color(Color32::RED),
                    );
                }
            });
    }

    fn statistics_view(&mut self, ui: &mut Ui, data: &SessionData) {
        ui.label(RichText::new("Fastest laps").color(Color32::WHITE).strong());
        let mut fastest = fastest_laps(data, &self.selected_drivers);
        if fastest.is_empty() {
            no_data_label(ui);
        } else {
            sort_fastest(&mut fastest, self.fastest_sort);
            self.show_fastest_table(ui, &fastest);
        }

        ui.separator();
        ui.label(
            RichText::new("Average lap times")
                .color(Color32::WHITE)
                .strong(),
        );
        match build_lap_table(data, &self.selected_drivers) {
            None => no_data_label(ui),
            Some(records) => {
                let mut summary = lap_time_summary(&records);
                sort_summary(&mut summary, self.summary_sort);
                self.show_summary_table(ui, &summary);
            }
        }
    }

    fn show_fastest_table(&mut self, ui: &mut Ui, rows: &[FastestLap]) {
        ui.push_id("fastest_laps_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(80.0))
                .column(Column::auto().at_least(100.0))
                .column(Column::auto().at_least(60.0))
                .column(Column::auto().at_least(120.0))
                .header(22.0, |mut header| {
                    let sort = &mut self.fastest_sort;
                    header.col(|ui| sort_header(ui, "Driver", 0, sort));
                    header.col(|ui| sort_header(ui, "Time", 1, sort));
                    header.col(|ui| sort_header(ui, "Lap", 2, sort));
                    header.col(|ui| sort_header(ui, "Speed trap (km/h)", 3, sort));
                })
                .body(|mut body| {
                    for row in rows {
                        body.row(20.0, |mut table_row| {
                            table_row.col(|ui| {
                                ui.label(&row.driver);
                            });
                            table_row.col(|ui| {
                                ui.label(charts::format_lap_time(row.time_s));
                            });
                            table_row.col(|ui| {
                                ui.label(row.lap_number.to_string());
                            });
                            table_row.col(|ui| {
                                ui.label(
                                    row.speed_trap_kmh
                                        .map(|s| format!("{:.1}", s))
                                        .unwrap_or_else(|| "-".to_string()),
                                );
                            });
                        });
                    }
                });
        });
    }

    fn show_summary_table(&mut self, ui: &mut Ui, rows: &[LapTimeSummary]) {
        ui.push_id("lap_summary_table", |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(80.0))
                .column(Column::auto().at_least(110.0))
                .column(Column::auto().at_least(90.0))
                .column(Column::auto().at_least(110.0))
                .header(22.0, |mut header| {
                    let sort = &mut self.summary_sort;
                    header.col(|ui| sort_header(ui, "Driver", 0, sort));
                    header.col(|ui| sort_header(ui, "Average time", 1, sort));
                    header.col(|ui| sort_header(ui, "Std dev", 2, sort));
                    header.col(|ui| sort_header(ui, "Laps completed", 3, sort));
                })
                .body(|mut body| {
                    for row in rows {
                        body.row(20.0, |mut table_row| {
                            table_row.col(|ui| {
                                ui.label(&row.driver);
                            });
                            table_row.col(|ui| {
                                ui.label(charts::format_lap_time(row.mean_s));
                            });
                            table_row.col(|ui| {
                                ui.label(
                                    row.std_dev_s
                                        .map(|s| format!("{:.3}", s))
                                        .unwrap_or_else(|| "-".to_string()),
                                );
                            });
                            table_row.col(|ui| {
                                ui.label(row.laps_completed.to_string());
                            });
                        });
                    }
                });
        });
    }
}

impl eframe::App for DashboardApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.year = self.year;
        self.app_config.event = if self.event.is_empty() {
            None
        } else {
            Some(self.event.clone())
        };
        self.app_config.session_code = self.kind.code().to_string();

        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(rect) = ctx.input(|i| i.viewport().outer_rect) {
            self.app_config.window_position = rect.min.into();
        }

        self.poll_load();

        egui::TopBottomPanel::top("SessionSelector")
            .frame(
                Frame::default()
                    .fill(Color32::TRANSPARENT)
                    .inner_margin(Margin::same(8)),
            )
            .show(ctx, |local_ui| {
                self.show_selectors(local_ui);
            });

        egui::CentralPanel::default()
            .frame(
                Frame::default()
                    .fill(Color32::TRANSPARENT)
                    .inner_margin(Margin::same(8)),
            )
            .show(ctx, |local_ui| {
                if let Some(message) = &self.load_error {
                    local_ui.label(
                        RichText::new(format!("Could not load session data: {}", message))
                            .color(Color32::RED)
                            .strong(),
                    );
                    local_ui.separator();
                }

                let Some(loaded) = &self.loaded else {
                    local_ui.with_layout(
                        Layout::centered_and_justified(Direction::TopDown),
                        |ui| {
                            ui.label(
                                RichText::new("Select a season, Grand Prix, and session, then load it to begin.")
                                    .color(Color32::GRAY),
                            );
                        },
                    );
                    return;
                };

                let data = Arc::clone(&loaded.data);
                let session_title = format!(
                    "{} {} - {}",
                    loaded.key.event, loaded.key.year, loaded.key.kind
                );
                local_ui.label(
                    RichText::new(session_title)
                        .color(Color32::WHITE)
                        .strong()
                        .size(16.0),
                );
                self.show_driver_selection(local_ui, &data);
                local_ui.separator();

                local_ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.tab, Tab::LapAnalysis, "Lap Analysis");
                    ui.selectable_value(&mut self.tab, Tab::Telemetry, "Telemetry");
                    ui.selectable_value(&mut self.tab, Tab::Statistics, "Statistics");
                });
                local_ui.separator();

                egui::ScrollArea::vertical().show(local_ui, |ui| {
                    if self.selected_drivers.is_empty() {
                        no_data_label(ui);
                        return;
                    }
                    match self.tab {
                        Tab::LapAnalysis => self.lap_analysis_view(ui, &data),
                        Tab::Telemetry => self.telemetry_view(ui, &data),
                        Tab::Statistics => self.statistics_view(ui, &data),
                    }
                });
            });

        // keep polling the load channel even without input events
        if self.loading_key.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn no_data_label(ui: &mut Ui) {
    ui.label(
        RichText::new("No data available for the current selection")
            .color(Color32::GRAY)
            .strong(),
    );
}

fn driver_color(index: usize) -> Color32 {
    DRIVER_COLORS[index % DRIVER_COLORS.len()]
}

fn compound_marker(compound: &str) -> MarkerShape {
    match compound {
        "SOFT" => MarkerShape::Circle,
        "MEDIUM" => MarkerShape::Square,
        "HARD" => MarkerShape::Diamond,
        "INTERMEDIATE" => MarkerShape::Up,
        "WET" => MarkerShape::Down,
        _ => MarkerShape::Cross,
    }
}

fn sort_header(ui: &mut Ui, label: &str, column: usize, sort: &mut TableSort) {
    let marker = if sort.column == column {
        if sort.ascending { " ^" } else { " v" }
    } else {
        ""
    };
    if ui
        .button(RichText::new(format!("{}{}", label, marker)).strong())
        .clicked()
    {
        if sort.column == column {
            sort.ascending = !sort.ascending;
        } else {
            sort.column = column;
            sort.ascending = true;
        }
    }
}

fn sort_fastest(rows: &mut [FastestLap], sort: TableSort) {
    rows.sort_by(|a, b| {
        let ordering = match sort.column {
            0 => a.driver.cmp(&b.driver),
            2 => a.lap_number.cmp(&b.lap_number),
            3 => a
                .speed_trap_kmh
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.speed_trap_kmh.unwrap_or(f64::NEG_INFINITY)),
            _ => a.time_s.total_cmp(&b.time_s),
        };
        if sort.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

fn sort_summary(rows: &mut [LapTimeSummary], sort: TableSort) {
    rows.sort_by(|a, b| {
        let ordering = match sort.column {
            0 => a.driver.cmp(&b.driver),
            2 => a
                .std_dev_s
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.std_dev_s.unwrap_or(f64::NEG_INFINITY)),
            3 => a.laps_completed.cmp(&b.laps_completed),
            _ => a.mean_s.total_cmp(&b.mean_s),
        };
        if sort.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}
