mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use drivethru::{
    app_dirs::AppDirs,
    audio::{AudioSink, Silence, SoundEngine},
    catalog::BuiltinMenu,
    code::{Bits, CODE_WIDTH},
    config::{Config, ConfigStore, FileConfigStore},
    error::Result as GameResult,
    evaluator::{Outcome, Phase},
    highscore::{HighscoreStore, MemoryHighscoreStore, SqliteHighscoreStore},
    mode::GameMode,
    runtime::{Clock, CrosstermEventSource, FixedTicker, GameEvent, Runner, SystemClock},
    session::GameSession,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// drive-thru order taking, one binary code at a time
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal drive-thru where every order comes as a five-bit code. Read the order at the window, show it on your fingers in the kitchen, and serve before the timer runs out."
)]
pub struct Cli {
    /// game mode to start on the menu
    #[clap(short = 'm', long, value_enum)]
    mode: Option<GameMode>,

    /// milliseconds between frame ticks
    #[clap(short = 't', long)]
    tick_rate: Option<u64>,

    /// number of menu items on display at once
    #[clap(short = 'd', long)]
    deals: Option<usize>,

    /// disable music and sound effects
    #[clap(long)]
    no_sound: bool,

    /// keep highscores in memory instead of the local database
    #[clap(long)]
    in_memory: bool,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the stored config
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate_ms = tick_rate.max(1);
        }
        if let Some(deals) = self.deals {
            config.deals_count = deals.max(1);
        }
        if self.no_sound {
            config.sound = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Menu,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
}

pub struct App {
    pub session: GameSession,
    pub state: AppState,
    pub menu_index: usize,
    pub fingers: Bits,
    pub notice: Option<String>,
    clock: Box<dyn Clock>,
}

impl App {
    pub fn new(session: GameSession, clock: Box<dyn Clock>) -> Self {
        let menu_index = GameMode::ALL
            .iter()
            .position(|m| *m == session.mode())
            .unwrap_or(0);

        Self {
            session,
            state: AppState::Menu,
            menu_index,
            fingers: [0; CODE_WIDTH],
            notice: None,
            clock,
        }
    }

    pub fn selected_mode(&self) -> GameMode {
        GameMode::ALL[self.menu_index % GameMode::ALL.len()]
    }

    /// The fingers as the session expects them, e.g. "01001"
    pub fn shown(&self) -> String {
        self.fingers.iter().map(|b| b.to_string()).collect()
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn on_tick(&mut self) {
        let now = self.now();
        if let Some(outcome) = self.session.tick(now) {
            info!(?outcome, "round ended by timer");
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        match self.state {
            AppState::Menu => self.on_menu_key(key),
            AppState::Playing => {
                if key.code == KeyCode::Char('q') {
                    return KeyAction::Quit;
                }
                self.on_play_key(key);
                KeyAction::Continue
            }
        }
    }

    fn on_menu_key(&mut self, key: KeyEvent) -> KeyAction {
        let count = GameMode::ALL.len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_index = (self.menu_index + count - 1) % count;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.menu_index = (self.menu_index + 1) % count;
            }
            KeyCode::Enter => {
                let now = self.now();
                let result = self.session.start_round(self.selected_mode(), now);
                if self.report(result).is_some() {
                    self.fingers = [0; CODE_WIDTH];
                    self.state = AppState::Playing;
                }
            }
            _ => {}
        }
        KeyAction::Continue
    }

    fn on_play_key(&mut self, key: KeyEvent) {
        let now = self.now();
        self.notice = None;

        if key.code == KeyCode::Char('b') {
            self.back_to_menu();
            return;
        }
        if key.code == KeyCode::Char('m') {
            let result = self.session.change_mode(self.session.mode().next(), now);
            if self.report(result).is_some() {
                self.fingers = [0; CODE_WIDTH];
            }
            return;
        }

        match self.session.phase() {
            Phase::Idle => self.state = AppState::Menu,
            Phase::Awaiting => match key.code {
                KeyCode::Char(c @ '1'..='5') if !self.session.is_paused() => {
                    let idx = c as usize - '1' as usize;
                    self.fingers[idx] ^= 1;
                }
                KeyCode::Tab => {
                    self.session.toggle_scene(now);
                }
                KeyCode::Esc | KeyCode::Char('p') => {
                    self.session.toggle_pause(now);
                }
                KeyCode::Enter if self.session.validate_affordance_visible() => {
                    let shown = self.shown();
                    let result = self.session.submit(&shown, now);
                    self.report(result);
                }
                KeyCode::Char(' ') => {
                    let shown = self.shown();
                    let result = self.session.confirm_gesture(&shown, now);
                    self.report(result);
                }
                _ => {}
            },
            Phase::Resolved(Outcome::Correct) => {
                if matches!(key.code, KeyCode::Char('c') | KeyCode::Enter) {
                    let result = self.session.continue_round(now);
                    if self.report(result).is_some() {
                        self.fingers = [0; CODE_WIDTH];
                    }
                }
            }
            Phase::Resolved(_) => match key.code {
                KeyCode::Char('r') | KeyCode::Enter => {
                    let result = self.session.retry(now);
                    if self.report(result).is_some() {
                        self.fingers = [0; CODE_WIDTH];
                    }
                }
                KeyCode::Esc => self.back_to_menu(),
                _ => {}
            },
        }
    }

    fn back_to_menu(&mut self) {
        self.session.back_to_menu();
        self.fingers = [0; CODE_WIDTH];
        self.state = AppState::Menu;
    }

    /// Surface a failed operation on screen instead of aborting
    fn report<T>(&mut self, result: GameResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if e.is_recoverable() {
                    info!("{}", e);
                } else {
                    warn!("{}", e);
                }
                self.notice = Some(e.to_string());
                None
            }
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn build_audio(config: &Config) -> Box<dyn AudioSink> {
    if !config.sound {
        return Box::new(Silence);
    }
    match SoundEngine::new() {
        Some(engine) => Box::new(engine),
        None => {
            warn!("no audio output available, playing silently");
            Box::new(Silence)
        }
    }
}

fn build_highscores(cli: &Cli) -> Box<dyn HighscoreStore> {
    if cli.in_memory {
        return Box::new(MemoryHighscoreStore::new());
    }
    let Some(path) = AppDirs::db_path() else {
        return Box::new(MemoryHighscoreStore::new());
    };
    match SqliteHighscoreStore::open(&path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("failed to open highscores at {:?}: {}", path, e);
            Box::new(MemoryHighscoreStore::new())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);
    if cli.save_config {
        config_store.save(&config)?;
        info!("saved config to {:?}", config_store.path());
    }
    info!(?config, "starting");

    let session = GameSession::new(
        config.mode,
        Box::new(BuiltinMenu),
        build_audio(&config),
        build_highscores(&cli),
    )
    .with_deals_count(config.deals_count);
    let mut app = App::new(session, Box::new(SystemClock::new()));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(config.tick_rate_ms)),
    );

    loop {
        terminal.draw(|f| ui::screen::current_screen(&app.state).render(&*app, f))?;

        match runner.step() {
            GameEvent::Tick => app.on_tick(),
            GameEvent::Resize => {}
            GameEvent::Key(key) => {
                if app.on_key(key) == KeyAction::Quit {
                    break;
                }
            }
        }
    }

    app.session.back_to_menu();
    Ok(())
}
