pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use hark::{
    app_dirs::AppDirs,
    audio::{AudioNarrator, SilentNarrator, SpeechCommand, SystemNarrator, ToneCommand, ToneOutput},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    diagnostics::TracingDiagnostics,
    engine::{GameEngine, GameState},
    error::WordListError,
    runtime::{CrosstermEventSource, FixedTicker, HarkEvent, HarkEventSource, Runner, Ticker},
    words::{WordList, WordSet},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 50;
const LOG_ENV: &str = "HARK_LOG";

/// listen-and-type terminal game
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Hear a word, type it as fast as you can. A three second countdown, a spoken word, and your time and wpm once you get it right."
)]
pub struct Cli {
    /// built-in word set to draw from (remembered for next time)
    #[clap(short = 'l', long, value_enum)]
    word_set: Option<WordSet>,

    /// read words from a file, one per line (# starts a comment)
    #[clap(short = 'f', long, conflicts_with = "words")]
    word_file: Option<PathBuf>,

    /// dictate only this word; repeat for more
    #[clap(short = 'w', long = "word")]
    words: Vec<String>,

    /// no speech and no beeps for this run
    #[clap(short = 'm', long)]
    mute: bool,

    /// skip the countdown beeps for this run
    #[clap(long)]
    no_beeps: bool,

    /// text-to-speech command line, the word is appended (remembered for next time)
    #[clap(long)]
    speech_command: Option<String>,

    /// tone command with {freq}, {secs} or {ms} placeholders (remembered for next time)
    #[clap(long)]
    tone_command: Option<String>,

    /// enable ctrl+d to reveal the current word
    #[clap(long)]
    debug: bool,
}

impl Cli {
    /// Fold the persistent flags into the stored config.
    fn merge_config(&self, mut config: Config) -> Config {
        if let Some(word_set) = self.word_set {
            config.word_set = word_set;
        }
        if let Some(cmd) = &self.speech_command {
            config.speech_command = Some(cmd.clone());
        }
        if let Some(cmd) = &self.tone_command {
            config.tone_command = Some(cmd.clone());
        }
        config
    }

    /// Settings for this run only: the merged config plus one-off switches.
    fn effective_config(&self, config: &Config) -> Config {
        let mut effective = config.clone();
        if self.mute {
            effective.speech = false;
            effective.beeps = false;
        }
        if self.no_beeps {
            effective.beeps = false;
        }
        effective
    }

    fn load_words(&self, config: &Config) -> Result<WordList, WordListError> {
        if !self.words.is_empty() {
            Ok(WordList::new(self.words.iter()))
        } else if let Some(path) = &self.word_file {
            WordList::from_file(path)
        } else {
            WordList::builtin(config.word_set)
        }
    }
}

fn build_narrator(config: &Config) -> Box<dyn AudioNarrator> {
    if !config.speech && !config.beeps {
        info!("audio muted");
        return Box::new(SilentNarrator);
    }

    let narrator = system_narrator(config);
    match narrator.speech() {
        Some(cmd) => info!(program = %cmd.program, "speech enabled"),
        None if config.speech => warn!("no speech program found; words will not be spoken"),
        None => info!("speech disabled"),
    }
    info!(tones = ?narrator.tones(), "tone output");

    Box::new(narrator)
}

/// Host programs for speech and tones, honouring overrides and switches.
fn system_narrator(config: &Config) -> SystemNarrator {
    let overridden = config.speech_command.is_some() || config.tone_command.is_some();
    if config.speech && config.beeps && !overridden {
        return SystemNarrator::detect();
    }

    let speech = if config.speech {
        config
            .speech_command
            .as_deref()
            .and_then(SpeechCommand::parse)
            .or_else(SpeechCommand::detect)
    } else {
        None
    };
    let tones = if !config.beeps {
        ToneOutput::Off
    } else if let Some(cmd) = config.tone_command.as_deref().and_then(ToneCommand::parse) {
        ToneOutput::Command(cmd)
    } else {
        ToneOutput::detect()
    };

    SystemNarrator::new(speech, tones)
}

/// Route tracing to a log file; the terminal belongs to the TUI.
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

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub struct App<N: AudioNarrator = Box<dyn AudioNarrator>, C: Clock = SystemClock> {
    pub engine: GameEngine<N, C>,
    pub debug: bool,
    /// One-line message under the game area, e.g. a start failure or a revealed word
    pub notice: Option<String>,
}

impl<N: AudioNarrator, C: Clock> App<N, C> {
    pub fn new(engine: GameEngine<N, C>, debug: bool) -> Self {
        Self {
            engine,
            debug,
            notice: None,
        }
    }

    fn start(&mut self) {
        match self.engine.start_test() {
            Ok(()) => self.notice = None,
            Err(e) => {
                warn!(error = %e, "could not start a round");
                self.notice = Some(e.to_string());
            }
        }
    }

    /// One loop step. Polls before a key is handled so a narration that has
    /// already ended counts the key towards the running round.
    pub fn on_event(&mut self, event: HarkEvent) -> KeyAction {
        self.engine.poll();
        let action = match event {
            HarkEvent::Key(key) => self.handle_key(key),
            HarkEvent::Resize | HarkEvent::Tick => KeyAction::Continue,
        };
        self.engine.poll();
        action
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return KeyAction::Quit,
            KeyCode::Char('c') if ctrl => return KeyAction::Quit,
            KeyCode::Char('r') if ctrl => self.start(),
            KeyCode::Char('d') if ctrl => {
                if self.debug {
                    self.engine.reveal_word();
                    let word = &self.engine.session().target_word;
                    self.notice = Some(if word.is_empty() {
                        "no word yet".to_string()
                    } else {
                        format!("word: {word}")
                    });
                }
            }
            KeyCode::Enter => {
                if matches!(self.engine.state(), GameState::Idle | GameState::Finished) {
                    self.start();
                }
            }
            KeyCode::Tab => self.engine.replay_audio(),
            KeyCode::Backspace => {
                if self.engine.state() == GameState::Running {
                    let mut typed = self.engine.session().typed_input.clone();
                    typed.pop();
                    self.engine.submit_input(&typed);
                }
            }
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                if self.engine.state() == GameState::Running {
                    let mut typed = self.engine.session().typed_input.clone();
                    typed.push(c);
                    self.engine.submit_input(&typed);
                }
            }
            _ => {}
        }
        KeyAction::Continue
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let config = cli.merge_config(store.load());
    if let Err(e) = store.save(&config) {
        warn!(error = %e, path = %store.path().display(), "could not save config");
    }
    let config = cli.effective_config(&config);

    let words = match cli.load_words(&config) {
        Ok(words) => words,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };
    info!(words = words.len(), "word list loaded");

    let engine = GameEngine::new(Arc::new(words), build_narrator(&config))
        .with_diagnostics(TracingDiagnostics);
    let mut app = App::new(engine, cli.debug);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B, E, T, N, C>(
    terminal: &mut Terminal<B>,
    app: &mut App<N, C>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    E: HarkEventSource,
    T: Ticker,
    N: AudioNarrator,
    C: Clock,
{
    loop {
        terminal.draw(|f| ui(app, f))?;

        let event = runner.step_until(app.engine.next_deadline());
        if app.on_event(event) == KeyAction::Quit {
            break;
        }
    }

    app.engine.reset_game();
    Ok(())
}

fn ui<N: AudioNarrator, C: Clock>(app: &App<N, C>, f: &mut Frame) {
    f.render_widget(app, f.area());
}
