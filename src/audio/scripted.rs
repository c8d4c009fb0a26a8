use std::cell::RefCell;
use std::rc::Rc;

use super::{AudioNarrator, SpeechCompletion, Tone};
use crate::error::AudioError;

/// How a [`ScriptedNarrator`] answers `speak`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechMode {
    /// Signal completion as soon as narration starts
    #[default]
    Immediate,
    /// Hold the completion until the test calls `finish_speech` / `fail_speech`
    Manual,
    /// Report speech as unsupported
    Unavailable,
}

/// Everything a scripted narrator was asked to do
#[derive(Debug, Default)]
struct NarratorLog {
    pub spoken: Vec<String>,
    pub beeps: Vec<Tone>,
    pub cancels: usize,
    pending: Option<SpeechCompletion>,
}

/// Deterministic narrator for tests. Clones share one log.
#[derive(Debug, Clone)]
pub struct ScriptedNarrator {
    mode: SpeechMode,
    beeps_available: bool,
    log: Rc<RefCell<NarratorLog>>,
}

impl ScriptedNarrator {
    pub fn new(mode: SpeechMode) -> Self {
        Self {
            mode,
            beeps_available: true,
            log: Rc::default(),
        }
    }

    pub fn without_beeps(mut self) -> Self {
        self.beeps_available = false;
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.log.borrow().spoken.clone()
    }

    pub fn beeps(&self) -> Vec<Tone> {
        self.log.borrow().beeps.clone()
    }

    pub fn cancels(&self) -> usize {
        self.log.borrow().cancels
    }

    pub fn is_speaking(&self) -> bool {
        self.log.borrow().pending.is_some()
    }

    /// Completes the held narration. Returns false when nothing was pending.
    pub fn finish_speech(&self) -> bool {
        let pending = self.log.borrow_mut().pending.take();
        match pending {
            Some(completion) => {
                completion.finished();
                true
            }
            None => false,
        }
    }

    pub fn fail_speech(&self, reason: &str) -> bool {
        let pending = self.log.borrow_mut().pending.take();
        match pending {
            Some(completion) => {
                completion.failed(reason);
                true
            }
            None => false,
        }
    }

    /// Takes the held completion so a test can signal it out of order.
    pub fn take_pending(&self) -> Option<SpeechCompletion> {
        self.log.borrow_mut().pending.take()
    }
}

impl Default for ScriptedNarrator {
    fn default() -> Self {
        Self::new(SpeechMode::default())
    }
}

impl AudioNarrator for ScriptedNarrator {
    fn speak(&mut self, text: &str, completion: SpeechCompletion) -> Result<(), AudioError> {
        if self.mode == SpeechMode::Unavailable {
            return Err(AudioError::Unavailable("speech synthesis"));
        }

        let mut log = self.log.borrow_mut();
        log.spoken.push(text.to_string());
        match self.mode {
            SpeechMode::Immediate => completion.finished(),
            _ => log.pending = Some(completion),
        }
        Ok(())
    }

    fn cancel_speech(&mut self) {
        let mut log = self.log.borrow_mut();
        log.cancels += 1;
        if let Some(completion) = log.pending.take() {
            completion.failed("interrupted");
        }
    }

    fn beep(&mut self, tone: Tone) -> Result<(), AudioError> {
        if !self.beeps_available {
            return Err(AudioError::Unavailable("tone output"));
        }
        self.log.borrow_mut().beeps.push(tone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpeechOutcome, SpeechSignal};
    use crate::scheduler::Generation;
    use std::sync::mpsc;

    fn completion() -> (SpeechCompletion, mpsc::Receiver<SpeechSignal>) {
        let (tx, rx) = mpsc::channel();
        (SpeechCompletion::new(Generation::default(), tx), rx)
    }

    #[test]
    fn immediate_mode_completes_at_once() {
        let mut narrator = ScriptedNarrator::new(SpeechMode::Immediate);
        let (c, rx) = completion();

        narrator.speak("hello", c).unwrap();

        assert_eq!(narrator.spoken(), vec!["hello".to_string()]);
        assert_eq!(rx.try_recv().unwrap().outcome, SpeechOutcome::Finished);
    }

    #[test]
    fn manual_mode_holds_completion() {
        let mut narrator = ScriptedNarrator::new(SpeechMode::Manual);
        let handle = narrator.clone();
        let (c, rx) = completion();

        narrator.speak("hello", c).unwrap();
        assert!(rx.try_recv().is_err());
        assert!(handle.is_speaking());

        assert!(handle.finish_speech());
        assert_eq!(rx.try_recv().unwrap().outcome, SpeechOutcome::Finished);
        assert!(!handle.finish_speech());
    }

    #[test]
    fn cancel_interrupts_pending_speech() {
        let mut narrator = ScriptedNarrator::new(SpeechMode::Manual);
        let (c, rx) = completion();

        narrator.speak("hello", c).unwrap();
        narrator.cancel_speech();

        assert_eq!(narrator.cancels(), 1);
        assert!(matches!(
            rx.try_recv().unwrap().outcome,
            SpeechOutcome::Failed(_)
        ));
    }

    #[test]
    fn unavailable_mode_errors() {
        let mut narrator = ScriptedNarrator::new(SpeechMode::Unavailable);
        let (c, _rx) = completion();

        assert!(narrator.speak("hello", c).is_err());
        assert!(narrator.spoken().is_empty());
    }

    #[test]
    fn beeps_are_recorded() {
        let mut narrator = ScriptedNarrator::new(SpeechMode::Immediate);
        narrator.beep(Tone::countdown(2)).unwrap();

        assert_eq!(narrator.beeps(), vec![Tone::countdown(2)]);

        let mut mute = ScriptedNarrator::new(SpeechMode::Immediate).without_beeps();
        assert!(mute.beep(Tone::countdown(2)).is_err());
    }
}
