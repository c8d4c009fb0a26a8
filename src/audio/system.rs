use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::{AudioNarrator, SpeechCompletion, Tone};
use crate::error::AudioError;

const SPEECH_POLL_MS: u64 = 20;

/// Known TTS programs, tried in order. Each blocks until the text has been spoken.
const SPEECH_CANDIDATES: &[(&str, &[&str])] = &[
    ("espeak-ng", &[]),
    ("espeak", &[]),
    ("say", &[]),
    ("spd-say", &["-w"]),
];

/// sox's `play`; the usual way to get a real sine tone out of a shell
const TONE_CANDIDATE: &str = "play -q -n synth {secs} sine {freq}";

/// Locate `program` either as a path or on `$PATH`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// External text-to-speech command; the spoken text is appended as the last argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SpeechCommand {
    /// Splits a command line on whitespace. Returns None for an empty line.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn detect() -> Option<Self> {
        SPEECH_CANDIDATES
            .iter()
            .find(|(program, _)| find_on_path(program).is_some())
            .map(|(program, args)| Self {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            })
    }

    pub fn command_for(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

/// External tone command template. `{freq}` (Hz), `{secs}` and `{ms}` are substituted per beep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneCommand {
    template: Vec<String>,
}

impl ToneCommand {
    pub fn parse(template: &str) -> Option<Self> {
        let template: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if template.is_empty() {
            None
        } else {
            Some(Self { template })
        }
    }

    pub fn detect() -> Option<Self> {
        find_on_path("play").and_then(|_| Self::parse(TONE_CANDIDATE))
    }

    pub fn program(&self) -> &str {
        &self.template[0]
    }

    pub fn render(&self, tone: Tone) -> Vec<String> {
        let freq = format!("{:.2}", tone.frequency_hz);
        let secs = format!("{:.3}", tone.duration_ms as f64 / 1000.0);
        let ms = tone.duration_ms.to_string();

        self.template
            .iter()
            .map(|part| {
                part.replace("{freq}", &freq)
                    .replace("{secs}", &secs)
                    .replace("{ms}", &ms)
            })
            .collect()
    }
}

/// Where countdown beeps go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToneOutput {
    Command(ToneCommand),
    /// Terminal bell: audible, but carries no pitch
    Bell,
    Off,
}

impl ToneOutput {
    pub fn detect() -> Self {
        ToneCommand::detect()
            .map(ToneOutput::Command)
            .unwrap_or(ToneOutput::Bell)
    }
}

#[derive(Debug)]
struct Utterance {
    child: Arc<Mutex<Child>>,
}

/// Narrator backed by programs installed on the host
#[derive(Debug)]
pub struct SystemNarrator {
    speech: Option<SpeechCommand>,
    tones: ToneOutput,
    current: Option<Utterance>,
}

impl SystemNarrator {
    pub fn new(speech: Option<SpeechCommand>, tones: ToneOutput) -> Self {
        Self {
            speech,
            tones,
            current: None,
        }
    }

    /// Uses whatever speech and tone programs can be found.
    pub fn detect() -> Self {
        Self::new(SpeechCommand::detect(), ToneOutput::detect())
    }

    pub fn speech(&self) -> Option<&SpeechCommand> {
        self.speech.as_ref()
    }

    pub fn tones(&self) -> &ToneOutput {
        &self.tones
    }
}

impl AudioNarrator for SystemNarrator {
    fn speak(&mut self, text: &str, completion: SpeechCompletion) -> Result<(), AudioError> {
        self.cancel_speech();

        let speech = self
            .speech
            .as_ref()
            .ok_or(AudioError::Unavailable("speech synthesis"))?;

        let child = speech
            .command_for(text)
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: speech.program.clone(),
                source,
            })?;
        debug!(program = %speech.program, "narration started");

        let child = Arc::new(Mutex::new(child));
        let watched = Arc::clone(&child);
        thread::spawn(move || watch_utterance(watched, completion));

        self.current = Some(Utterance { child });
        Ok(())
    }

    fn cancel_speech(&mut self) {
        if let Some(utterance) = self.current.take() {
            if let Ok(mut child) = utterance.child.lock() {
                // already exited is fine
                let _ = child.kill();
            }
        }
    }

    fn beep(&mut self, tone: Tone) -> Result<(), AudioError> {
        match &self.tones {
            ToneOutput::Command(template) => {
                let argv = template.render(tone);
                let child = Command::new(&argv[0])
                    .args(&argv[1..])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|source| AudioError::Spawn {
                        program: template.program().to_string(),
                        source,
                    })?;
                reap(child);
                Ok(())
            }
            ToneOutput::Bell => {
                let mut stdout = io::stdout();
                stdout
                    .write_all(b"\x07")
                    .and_then(|_| stdout.flush())
                    .map_err(|source| AudioError::Spawn {
                        program: "terminal bell".to_string(),
                        source,
                    })
            }
            ToneOutput::Off => Err(AudioError::Unavailable("tone output")),
        }
    }
}

impl Drop for SystemNarrator {
    fn drop(&mut self) {
        self.cancel_speech();
    }
}

fn watch_utterance(child: Arc<Mutex<Child>>, completion: SpeechCompletion) {
    loop {
        let status = match child.lock() {
            Ok(mut c) => c.try_wait(),
            Err(_) => {
                completion.failed("speech process lock poisoned");
                return;
            }
        };

        match status {
            Ok(Some(status)) if status.success() => {
                completion.finished();
                return;
            }
            Ok(Some(status)) => {
                completion.failed(format!("speech exited with {status}"));
                return;
            }
            Ok(None) => thread::sleep(Duration::from_millis(SPEECH_POLL_MS)),
            Err(e) => {
                warn!(error = %e, "lost track of speech process");
                completion.failed(e.to_string());
                return;
            }
        }
    }
}

fn reap(mut child: Child) {
    thread::spawn(move || {
        let _ = child.wait();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpeechOutcome, SpeechSignal};
    use crate::scheduler::Generation;
    use std::sync::mpsc;

    #[test]
    fn parse_speech_command() {
        let cmd = SpeechCommand::parse("espeak -s 140 -v en").unwrap();

        assert_eq!(cmd.program, "espeak");
        assert_eq!(cmd.args, vec!["-s", "140", "-v", "en"]);
        assert_eq!(SpeechCommand::parse("   "), None);
    }

    #[test]
    fn speech_command_appends_text() {
        let cmd = SpeechCommand::parse("spd-say -w").unwrap();
        let built = cmd.command_for("hello");
        let args: Vec<_> = built.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(built.get_program(), "spd-say");
        assert_eq!(args, vec!["-w", "hello"]);
    }

    #[test]
    fn tone_template_substitution() {
        let tone = ToneCommand::parse("play -q -n synth {secs} sine {freq}").unwrap();

        assert_eq!(tone.program(), "play");
        assert_eq!(
            tone.render(Tone::new(783.99, 150)),
            vec!["play", "-q", "-n", "synth", "0.150", "sine", "783.99"]
        );
    }

    #[test]
    fn tone_template_ms_placeholder() {
        let tone = ToneCommand::parse("beep -f {freq} -l {ms}").unwrap();

        assert_eq!(
            tone.render(Tone::new(523.25, 150)),
            vec!["beep", "-f", "523.25", "-l", "150"]
        );
        assert_eq!(ToneCommand::parse(""), None);
    }

    #[test]
    fn find_on_path_rejects_missing_program() {
        assert_eq!(find_on_path("definitely-not-a-real-program-hark"), None);
        assert_eq!(find_on_path("/definitely/not/here"), None);
    }

    #[test]
    fn narrator_without_speech_is_unavailable() {
        let (tx, rx) = mpsc::channel::<SpeechSignal>();
        let mut narrator = SystemNarrator::new(None, ToneOutput::Off);

        let result = narrator.speak("hello", SpeechCompletion::new(Generation::default(), tx));
        assert!(matches!(result, Err(AudioError::Unavailable(_))));
        assert!(matches!(
            rx.try_recv().unwrap().outcome,
            SpeechOutcome::Failed(_)
        ));
        assert!(narrator.beep(Tone::countdown(3)).is_err());
    }

    #[test]
    fn narrator_reports_spawn_failure() {
        let (tx, _rx) = mpsc::channel::<SpeechSignal>();
        let mut narrator = SystemNarrator::new(
            SpeechCommand::parse("definitely-not-a-real-program-hark"),
            ToneOutput::Off,
        );

        let result = narrator.speak("hello", SpeechCompletion::new(Generation::default(), tx));
        assert!(matches!(result, Err(AudioError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn narrator_signals_when_process_exits() {
        let (tx, rx) = mpsc::channel::<SpeechSignal>();
        let mut narrator = SystemNarrator::new(SpeechCommand::parse("true"), ToneOutput::Off);

        narrator
            .speak("hello", SpeechCompletion::new(Generation::default(), tx))
            .unwrap();

        let signal = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(signal.outcome, SpeechOutcome::Finished);
    }

    #[cfg(unix)]
    #[test]
    fn cancel_kills_running_narration() {
        let (tx, rx) = mpsc::channel::<SpeechSignal>();
        // the spoken word lands in $0 and is ignored
        let speech = SpeechCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 30".to_string()],
        };
        let mut narrator = SystemNarrator::new(Some(speech), ToneOutput::Off);

        narrator
            .speak("hello", SpeechCompletion::new(Generation::default(), tx))
            .unwrap();
        narrator.cancel_speech();

        let signal = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(signal.outcome, SpeechOutcome::Failed(_)));
    }
}
