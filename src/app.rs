use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use pathspeed::settings::{SettingsField, TestConfiguration};
use pathspeed::speedtest::{
    HttpTransport, Measurement, PhaseStatus, SpeedTest, TestPhase, TestSnapshot, Unit,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

// Keep last 200 samples per chart
const MAX_CHART_SAMPLES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Main,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Download,
    Upload,
    Ping,
}

impl Panel {
    pub fn next(self) -> Self {
        match self {
            Panel::Download => Panel::Upload,
            Panel::Upload => Panel::Ping,
            Panel::Ping => Panel::Download,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Download => Panel::Ping,
            Panel::Upload => Panel::Download,
            Panel::Ping => Panel::Upload,
        }
    }
}

pub struct App {
    pub snapshot: TestSnapshot,
    pub should_quit: bool,

    // UI state
    pub view: AppView,
    pub selected_panel: Panel,
    pub expanded: bool,

    // Settings
    pub settings: TestConfiguration,
    pub selected_setting: SettingsField,

    // Chart history, in Mbps, rebuilt from observed snapshots
    pub download_samples: Vec<f64>,
    pub upload_samples: Vec<f64>,

    phase_started: Option<Instant>,
    transport: HttpTransport,
    speedtest: Arc<SpeedTest<HttpTransport>>,
    snapshots: watch::Receiver<TestSnapshot>,
}

impl App {
    pub fn new(transport: HttpTransport, settings: TestConfiguration) -> Self {
        let speedtest = Arc::new(SpeedTest::new(transport.clone(), settings));
        let snapshots = speedtest.subscribe();
        Self {
            snapshot: TestSnapshot::default(),
            should_quit: false,
            view: AppView::Main,
            selected_panel: Panel::Download,
            expanded: false,
            settings,
            selected_setting: SettingsField::PingFrequency,
            download_samples: Vec::new(),
            upload_samples: Vec::new(),
            phase_started: None,
            transport,
            speedtest,
            snapshots,
        }
    }

    pub fn phase(&self) -> TestPhase {
        self.snapshot.phase()
    }

    fn is_idle(&self) -> bool {
        !self.snapshot.is_running
    }

    pub fn handle_key_event(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match self.view {
            AppView::Main => self.handle_main_key(key),
            AppView::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_main_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Char('s') => {
                if self.is_idle() {
                    self.view = AppView::Settings;
                }
                None
            }
            KeyCode::Enter => {
                if self.expanded {
                    self.expanded = false;
                    None
                } else if self.is_idle() {
                    Some(AppAction::StartTest)
                } else {
                    self.expanded = true;
                    None
                }
            }
            KeyCode::Esc => {
                self.expanded = false;
                None
            }
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('j') => {
                if !self.expanded {
                    self.selected_panel = self.selected_panel.next();
                }
                None
            }
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('k') => {
                if !self.expanded {
                    self.selected_panel = self.selected_panel.prev();
                }
                None
            }
            KeyCode::Char(' ') => {
                self.expanded = !self.expanded;
                None
            }
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.apply_settings();
                self.view = AppView::Main;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_setting = self.selected_setting.prev();
                None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected_setting = self.selected_setting.next();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.adjust_setting(false);
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.adjust_setting(true);
                None
            }
            _ => None,
        }
    }

    fn adjust_setting(&mut self, increase: bool) {
        let s = self.settings;
        self.settings = match self.selected_setting {
            SettingsField::PingFrequency => {
                let n = s.ping_frequency();
                s.with_ping_frequency(if increase { n + 1 } else { n.saturating_sub(1) })
            }
            SettingsField::TestDuration => {
                let secs = s.test_duration_secs();
                s.with_test_duration_secs(if increase { secs + 5 } else { secs.saturating_sub(5) })
            }
            SettingsField::SpeedUnit => {
                let unit = s.speed_unit();
                s.with_speed_unit(if increase { unit.next() } else { unit.prev() })
            }
        };
    }

    /// Rebuilds the engine when the settings changed; only while idle.
    fn apply_settings(&mut self) {
        if self.settings == *self.speedtest.config() || !self.is_idle() {
            return;
        }
        self.speedtest = Arc::new(SpeedTest::new(self.transport.clone(), self.settings));
        self.snapshots = self.speedtest.subscribe();
    }

    pub fn start_test(&mut self) {
        if self.speedtest.start_test().is_some() {
            self.download_samples.clear();
            self.upload_samples.clear();
            self.phase_started = None;
            self.expanded = false;
        }
    }

    /// Pulls the newest snapshot, if any, and extends chart history.
    pub fn poll_snapshot(&mut self) {
        if !self.snapshots.has_changed().unwrap_or(false) {
            return;
        }
        let next = self.snapshots.borrow_and_update().clone();

        let entering_transfer = (next.download_status == PhaseStatus::Running
            && self.snapshot.download_status != PhaseStatus::Running)
            || (next.upload_status == PhaseStatus::Running
                && self.snapshot.upload_status != PhaseStatus::Running);
        if entering_transfer {
            self.phase_started = Some(Instant::now());
        }

        if next.download_status == PhaseStatus::Running
            && next.download_speed != self.snapshot.download_speed
        {
            push_sample(&mut self.download_samples, as_mbps(&next.download_speed));
        }
        if next.upload_status == PhaseStatus::Running
            && next.upload_speed != self.snapshot.upload_speed
        {
            push_sample(&mut self.upload_samples, as_mbps(&next.upload_speed));
        }

        self.snapshot = next;
    }

    /// Fraction of the active transfer phase's time budget already spent.
    pub fn phase_progress(&self) -> f64 {
        let budget = self.speedtest.config().test_duration().as_secs_f64();
        self.phase_started
            .map(|started| (started.elapsed().as_secs_f64() / budget).min(1.0))
            .unwrap_or(0.0)
    }
}

fn push_sample(samples: &mut Vec<f64>, value: f64) {
    samples.push(value);
    if samples.len() > MAX_CHART_SAMPLES {
        samples.remove(0);
    }
}

pub fn as_mbps(measurement: &Measurement) -> f64 {
    match measurement.unit {
        Unit::Kbps => measurement.value / 1000.0,
        _ => measurement.value,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AppAction {
    Quit,
    StartTest,
}

pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
