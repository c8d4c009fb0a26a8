use serde::Serialize;
use std::time::Duration;

/// Characters per "word" in the standard WPM convention
pub const CHARS_PER_WORD: f64 = 5.0;

/// Result of a completed round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub elapsed_seconds: f64,
    pub wpm: f64,
}

impl Score {
    /// Scores a word of `char_count` characters typed in `elapsed`.
    /// Elapsed time is taken at millisecond resolution and both values are rounded to 2 decimals.
    pub fn compute(char_count: usize, elapsed: Duration) -> Self {
        let elapsed_seconds = elapsed.as_millis() as f64 / 1000.0;

        Self {
            elapsed_seconds: round2(elapsed_seconds),
            wpm: round2(wpm(char_count, elapsed_seconds)),
        }
    }
}

pub fn wpm(char_count: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    let minutes = elapsed_secs / 60.0;
    (char_count as f64 / CHARS_PER_WORD) / minutes
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(20.0), 20.0);
        assert_eq!(round2(-3.14159), -3.14);
    }

    #[test]
    fn test_wpm_one_word_per_three_seconds() {
        assert_eq!(wpm(5, 3.0), 20.0);
    }

    #[test]
    fn test_wpm_zero_elapsed() {
        assert_eq!(wpm(5, 0.0), 0.0);
    }

    #[test]
    fn test_score_hello_in_three_seconds() {
        let score = Score::compute(5, Duration::from_secs(3));

        assert_eq!(score.elapsed_seconds, 3.0);
        assert_eq!(score.wpm, 20.0);
    }

    #[test]
    fn test_score_rounds_to_two_decimals() {
        // 7 chars in 2.34s -> 1.4 words / 0.039 min = 35.897...
        let score = Score::compute(7, Duration::from_millis(2340));

        assert_eq!(score.elapsed_seconds, 2.34);
        assert_eq!(score.wpm, 35.9);
    }

    #[test]
    fn test_score_ignores_sub_millisecond_time() {
        let score = Score::compute(5, Duration::from_micros(1_500_900));

        assert_eq!(score.elapsed_seconds, 1.5);
        assert_eq!(score.wpm, 40.0);
    }
}
