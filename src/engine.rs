use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::audio::{AudioNarrator, SpeechCompletion, SpeechOutcome, SpeechSignal, Tone};
use crate::clock::{Clock, SystemClock};
use crate::diagnostics::DiagnosticPort;
use crate::error::GameError;
use crate::scheduler::{Generation, Scheduler, Timer, TimerKind};
use crate::util::Score;
use crate::words::WordList;

/// First number shown by the countdown
pub const COUNTDOWN_START: u8 = 3;
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
/// How long a finished round's score stays up before the game resets itself
pub const FINISHED_DISPLAY: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum GameState {
    #[default]
    Idle,
    Countdown,
    Preparing,
    Running,
    Finished,
}

/// Per-round state. Replaced wholesale on start and reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub target_word: String,
    pub typed_input: String,
    pub started_at: Option<Instant>,
    pub countdown_remaining: u8,
    pub score: Option<Score>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            target_word: String::new(),
            typed_input: String::new(),
            started_at: None,
            countdown_remaining: COUNTDOWN_START,
            score: None,
        }
    }
}

/// How the typed text relates to the target, for colouring the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFeedback {
    /// No round is accepting input
    Inactive,
    Empty,
    OnTrack,
    Mismatch,
    Complete,
}

/// Read-only snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct GameView<'a> {
    pub state: GameState,
    pub target_word: &'a str,
    pub typed_input: &'a str,
    pub score: Option<Score>,
    pub countdown_remaining: u8,
    pub feedback: InputFeedback,
}

pub fn matches_target(typed: &str, target: &str) -> bool {
    typed.to_lowercase() == target.to_lowercase()
}

/// Drives a listen-and-type round: countdown, narration, timing and scoring.
///
/// Single-threaded. Timers and narration completions are only acted upon from
/// [`GameEngine::poll`], which the caller runs on every tick of its event loop.
pub struct GameEngine<N: AudioNarrator, C: Clock = SystemClock> {
    words: Arc<WordList>,
    narrator: N,
    clock: C,
    rng: StdRng,
    diagnostics: Option<Box<dyn DiagnosticPort>>,
    state: GameState,
    session: Session,
    scheduler: Scheduler,
    generation: Generation,
    speech_tx: Sender<SpeechSignal>,
    speech_rx: Receiver<SpeechSignal>,
    tones_warned: bool,
}

impl<N: AudioNarrator> GameEngine<N, SystemClock> {
    pub fn new(words: Arc<WordList>, narrator: N) -> Self {
        Self::with_clock(words, narrator, SystemClock)
    }
}

impl<N: AudioNarrator, C: Clock> GameEngine<N, C> {
    pub fn with_clock(words: Arc<WordList>, narrator: N, clock: C) -> Self {
        let (speech_tx, speech_rx) = mpsc::channel();
        Self {
            words,
            narrator,
            clock,
            rng: StdRng::from_entropy(),
            diagnostics: None,
            state: GameState::Idle,
            session: Session::default(),
            scheduler: Scheduler::new(),
            generation: Generation::default(),
            speech_tx,
            speech_rx,
            tones_warned: false,
        }
    }

    /// Replace the word picker's randomness, e.g. with a seeded rng in tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_diagnostics<D: DiagnosticPort + 'static>(mut self, port: D) -> Self {
        self.diagnostics = Some(Box::new(port));
        self
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn words(&self) -> &WordList {
        &self.words
    }

    /// Earliest pending timer, so callers can size their wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn view(&self) -> GameView<'_> {
        GameView {
            state: self.state,
            target_word: &self.session.target_word,
            typed_input: &self.session.typed_input,
            score: self.session.score,
            countdown_remaining: self.session.countdown_remaining,
            feedback: self.input_feedback(),
        }
    }

    pub fn input_feedback(&self) -> InputFeedback {
        match self.state {
            GameState::Finished => InputFeedback::Complete,
            GameState::Running => {
                let typed = self.session.typed_input.to_lowercase();
                if typed.is_empty() {
                    InputFeedback::Empty
                } else if self.session.target_word.to_lowercase().starts_with(&typed) {
                    InputFeedback::OnTrack
                } else {
                    InputFeedback::Mismatch
                }
            }
            _ => InputFeedback::Inactive,
        }
    }

    /// Begin a fresh round from any state, superseding whatever was in flight.
    pub fn start_test(&mut self) -> Result<(), GameError> {
        if self.words.is_empty() {
            return Err(GameError::Configuration(
                "word list is empty; nothing to dictate".to_string(),
            ));
        }

        self.abandon_round();
        self.transition(GameState::Countdown);
        info!(generation = ?self.generation, "round started");

        let now = self.clock.now();
        self.countdown_step(now);
        Ok(())
    }

    /// Replace the typed text. Ignored unless a round is running.
    pub fn submit_input(&mut self, value: &str) {
        if self.state != GameState::Running {
            return;
        }
        self.session.typed_input = value.to_string();
        self.check_completion();
    }

    /// Say the current word again. Leaves state, timers and the stopwatch alone.
    pub fn replay_audio(&mut self) {
        if self.session.target_word.is_empty() {
            return;
        }
        debug!("replaying word");
        self.narrate();
    }

    pub fn reset_game(&mut self) {
        self.abandon_round();
        if self.state != GameState::Idle {
            self.transition(GameState::Idle);
        }
    }

    /// Report the current word through the diagnostic port, if one is attached.
    pub fn reveal_word(&self) {
        if let Some(port) = &self.diagnostics {
            let word = Some(self.session.target_word.as_str()).filter(|w| !w.is_empty());
            port.reveal_word(word);
        }
    }

    /// Act on finished narrations and due timers.
    pub fn poll(&mut self) {
        let now = self.clock.now();
        loop {
            if let Ok(signal) = self.speech_rx.try_recv() {
                self.on_speech_signal(signal);
                continue;
            }
            match self.scheduler.take_due(now, self.generation) {
                Some(timer) => self.on_timer(timer),
                None => break,
            }
        }
    }

    fn abandon_round(&mut self) {
        self.narrator.cancel_speech();
        self.scheduler.cancel_all();
        self.generation = self.generation.next();
        self.session = Session::default();
    }

    fn transition(&mut self, to: GameState) {
        let from = self.state;
        self.state = to;
        debug!(%from, %to, "transition");
        if let Some(port) = &self.diagnostics {
            port.state_changed(from, to);
        }
    }

    /// Beep for the current count and arm the next tick, or move on once the count is spent.
    /// `at` is when this step was due, so ticks stay exactly one second apart.
    fn countdown_step(&mut self, at: Instant) {
        let remaining = self.session.countdown_remaining;
        if remaining > 0 {
            self.beep(Tone::countdown(remaining));
            self.scheduler
                .schedule_after(TimerKind::CountdownTick, at, COUNTDOWN_STEP, self.generation);
        } else {
            self.prepare();
        }
    }

    fn on_timer(&mut self, timer: Timer) {
        match timer.kind {
            TimerKind::CountdownTick => {
                if self.state != GameState::Countdown {
                    return;
                }
                self.session.countdown_remaining = self.session.countdown_remaining.saturating_sub(1);
                debug!(remaining = self.session.countdown_remaining, "countdown tick");
                self.countdown_step(timer.deadline);
            }
            TimerKind::AutoReset => {
                if self.state == GameState::Finished {
                    debug!("score display elapsed");
                    self.reset_game();
                }
            }
        }
    }

    fn prepare(&mut self) {
        let word = match self.words.choose(&mut self.rng) {
            Some(word) => word.to_string(),
            None => {
                warn!("word list emptied mid-round");
                self.reset_game();
                return;
            }
        };

        self.session.target_word = word;
        self.transition(GameState::Preparing);
        if let Some(port) = &self.diagnostics {
            port.word_selected(&self.session.target_word);
        }
        self.narrate();
    }

    fn narrate(&mut self) {
        self.narrator.cancel_speech();

        let completion = SpeechCompletion::new(self.generation, self.speech_tx.clone());
        if let Err(e) = self.narrator.speak(&self.session.target_word, completion) {
            warn!(error = %e, "narration unavailable; carrying on without it");
            self.on_narration_ended(self.generation);
        }
    }

    fn on_speech_signal(&mut self, signal: SpeechSignal) {
        if signal.generation != self.generation {
            debug!(signal = ?signal.generation, "ignoring narration from an earlier round");
            return;
        }

        if let SpeechOutcome::Failed(reason) = &signal.outcome {
            if self.state == GameState::Preparing {
                warn!(%reason, "narration failed; starting the clock anyway");
            } else {
                debug!(%reason, "narration ended early");
            }
        }
        self.on_narration_ended(signal.generation);
    }

    fn on_narration_ended(&mut self, generation: Generation) {
        if generation != self.generation || self.state != GameState::Preparing {
            return;
        }
        self.session.started_at = Some(self.clock.now());
        self.transition(GameState::Running);
    }

    fn check_completion(&mut self) {
        let Some(started_at) = self.session.started_at else {
            return;
        };
        if !matches_target(&self.session.typed_input, &self.session.target_word) {
            return;
        }

        let now = self.clock.now();
        let score = Score::compute(
            self.session.target_word.chars().count(),
            now.saturating_duration_since(started_at),
        );
        info!(
            word = %self.session.target_word,
            secs = score.elapsed_seconds,
            wpm = score.wpm,
            "round finished"
        );

        self.session.score = Some(score);
        self.transition(GameState::Finished);
        self.scheduler
            .schedule_after(TimerKind::AutoReset, now, FINISHED_DISPLAY, self.generation);
    }

    fn beep(&mut self, tone: Tone) {
        if let Err(e) = self.narrator.beep(tone) {
            if self.tones_warned {
                debug!(error = %e, "beep skipped");
            } else {
                warn!(error = %e, "countdown beeps unavailable");
                self.tones_warned = true;
            }
        }
    }
}
