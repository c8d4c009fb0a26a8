use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::engine::GameState;

/// Optional observer injected into the engine for debugging.
/// All methods default to doing nothing.
pub trait DiagnosticPort {
    fn state_changed(&self, _from: GameState, _to: GameState) {}

    fn word_selected(&self, _word: &str) {}

    /// Asked for explicitly through `GameEngine::reveal_word`.
    fn reveal_word(&self, _word: Option<&str>) {}
}

/// Writes diagnostics to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticPort for TracingDiagnostics {
    fn state_changed(&self, from: GameState, to: GameState) {
        info!(%from, %to, "state changed");
    }

    fn word_selected(&self, word: &str) {
        info!(word = %word, "word selected");
    }

    fn reveal_word(&self, word: Option<&str>) {
        match word {
            Some(word) => info!("the current word is: \"{word}\""),
            None => info!("no word is active right now; start a round first"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    StateChanged { from: GameState, to: GameState },
    WordSelected(String),
    Revealed(Option<String>),
}

/// Keeps every diagnostic event in memory. Clones share one record.
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    events: Rc<RefCell<Vec<DiagnosticEvent>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.borrow().clone()
    }

    /// Just the state path, in order.
    pub fn transitions(&self) -> Vec<GameState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn last_revealed(&self) -> Option<Option<String>> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            DiagnosticEvent::Revealed(word) => Some(word.clone()),
            _ => None,
        })
    }
}

impl DiagnosticPort for RecordingDiagnostics {
    fn state_changed(&self, from: GameState, to: GameState) {
        self.events
            .borrow_mut()
            .push(DiagnosticEvent::StateChanged { from, to });
    }

    fn word_selected(&self, word: &str) {
        self.events
            .borrow_mut()
            .push(DiagnosticEvent::WordSelected(word.to_string()));
    }

    fn reveal_word(&self, word: Option<&str>) {
        self.events
            .borrow_mut()
            .push(DiagnosticEvent::Revealed(word.map(str::to_string)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order() {
        let diag = RecordingDiagnostics::new();
        diag.state_changed(GameState::Idle, GameState::Countdown);
        diag.word_selected("apple");
        diag.state_changed(GameState::Countdown, GameState::Preparing);

        assert_eq!(
            diag.transitions(),
            vec![GameState::Countdown, GameState::Preparing]
        );
        assert_eq!(
            diag.events()[1],
            DiagnosticEvent::WordSelected("apple".to_string())
        );
    }

    #[test]
    fn last_revealed() {
        let diag = RecordingDiagnostics::new();
        assert_eq!(diag.last_revealed(), None);

        diag.reveal_word(None);
        diag.reveal_word(Some("pear"));
        assert_eq!(diag.last_revealed(), Some(Some("pear".to_string())));
    }

    #[test]
    fn tracing_diagnostics_does_not_panic_without_subscriber() {
        let diag = TracingDiagnostics;
        diag.state_changed(GameState::Idle, GameState::Countdown);
        diag.word_selected("apple");
        diag.reveal_word(None);
    }
}
