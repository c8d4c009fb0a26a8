//! Audio capability used by the game engine: spoken words and countdown beeps.
//!
//! The engine only sees the [`AudioNarrator`] trait. Backends:
//! - [`SystemNarrator`]: external TTS / tone commands, terminal bell fallback
//! - [`SilentNarrator`]: everything unavailable (`--mute`)
//! - [`ScriptedNarrator`]: recording fake for tests

mod scripted;
mod system;

pub use scripted::{ScriptedNarrator, SpeechMode};
pub use system::{find_on_path, SpeechCommand, SystemNarrator, ToneCommand, ToneOutput};

use std::sync::mpsc::Sender;

use crate::error::AudioError;
use crate::scheduler::Generation;

/// Pitch of the countdown beeps before the last one
pub const BASE_TONE_HZ: f64 = 523.25;
/// Pitch of the last countdown beep
pub const FINAL_TONE_HZ: f64 = 783.99;
pub const BEEP_DURATION_MS: u64 = 150;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_ms: u64,
}

impl Tone {
    pub fn new(frequency_hz: f64, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    /// Beep for the countdown showing `remaining`; the final second gets the higher pitch.
    pub fn countdown(remaining: u8) -> Self {
        let frequency_hz = if remaining == 1 {
            FINAL_TONE_HZ
        } else {
            BASE_TONE_HZ
        };
        Self::new(frequency_hz, BEEP_DURATION_MS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    Failed(String),
}

/// Message delivered to the engine when a narration ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSignal {
    pub generation: Generation,
    pub outcome: SpeechOutcome,
}

/// One-shot completion handle handed to [`AudioNarrator::speak`].
///
/// Signals exactly once: explicitly through `finished`/`failed`, or as a
/// failure when dropped unsignalled. Safe to move to another thread.
#[derive(Debug)]
pub struct SpeechCompletion {
    generation: Generation,
    tx: Option<Sender<SpeechSignal>>,
}

impl SpeechCompletion {
    pub fn new(generation: Generation, tx: Sender<SpeechSignal>) -> Self {
        Self {
            generation,
            tx: Some(tx),
        }
    }

    pub fn finished(mut self) {
        self.send(SpeechOutcome::Finished);
    }

    pub fn failed(mut self, reason: impl Into<String>) {
        self.send(SpeechOutcome::Failed(reason.into()));
    }

    fn send(&mut self, outcome: SpeechOutcome) {
        if let Some(tx) = self.tx.take() {
            // receiver gone means the engine is gone; nothing left to notify
            let _ = tx.send(SpeechSignal {
                generation: self.generation,
                outcome,
            });
        }
    }
}

impl Drop for SpeechCompletion {
    fn drop(&mut self) {
        self.send(SpeechOutcome::Failed("narration dropped".to_string()));
    }
}

/// Text-to-speech and tone capability injected into the engine
pub trait AudioNarrator {
    /// Start narrating `text`. The completion must eventually be signalled;
    /// an `Err` return means nothing was started.
    fn speak(&mut self, text: &str, completion: SpeechCompletion) -> Result<(), AudioError>;

    /// Stop the current narration, if any.
    fn cancel_speech(&mut self);

    /// Fire-and-forget tone.
    fn beep(&mut self, tone: Tone) -> Result<(), AudioError>;
}

impl<N: AudioNarrator + ?Sized> AudioNarrator for Box<N> {
    fn speak(&mut self, text: &str, completion: SpeechCompletion) -> Result<(), AudioError> {
        (**self).speak(text, completion)
    }

    fn cancel_speech(&mut self) {
        (**self).cancel_speech()
    }

    fn beep(&mut self, tone: Tone) -> Result<(), AudioError> {
        (**self).beep(tone)
    }
}

/// Narrator with no capabilities at all
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl AudioNarrator for SilentNarrator {
    fn speak(&mut self, _text: &str, _completion: SpeechCompletion) -> Result<(), AudioError> {
        Err(AudioError::Unavailable("speech synthesis"))
    }

    fn cancel_speech(&mut self) {}

    fn beep(&mut self, _tone: Tone) -> Result<(), AudioError> {
        Err(AudioError::Unavailable("tone output"))
    }
}
