use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::WordListError;

static LANG_DIR: Dir = include_dir!("src/lang");

/// Built-in word sets shipped with the binary
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum WordSet {
    #[default]
    English,
    EnglishHard,
}

impl WordSet {
    fn file_name(&self) -> &'static str {
        match self {
            WordSet::English => "english.json",
            WordSet::EnglishHard => "english_hard.json",
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
struct WordSetFile {
    #[allow(dead_code)]
    name: String,
    #[allow(dead_code)]
    size: u32,
    words: Vec<String>,
}

/// Immutable, ordered pool of candidate words for a round
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Builds a list from arbitrary words, trimming them and dropping blanks.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn builtin(set: WordSet) -> Result<Self, WordListError> {
        let file = LANG_DIR
            .get_file(set.file_name())
            .ok_or_else(|| WordListError::UnknownSet(set.to_string()))?;

        let contents = file
            .contents_utf8()
            .ok_or_else(|| WordListError::Encoding(set.to_string()))?;

        let parsed: WordSetFile = serde_json::from_str(contents)?;
        Ok(Self::new(parsed.words))
    }

    /// Reads one word per line; blank lines and `#` comments are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WordListError> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse_lines(&contents))
    }

    pub fn parse_lines(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Uniform pick; consecutive picks may repeat.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.words.choose(rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_english() {
        let list = WordList::builtin(WordSet::English).unwrap();

        assert!(!list.is_empty());
        assert!(list.contains("window"));
    }

    #[test]
    fn test_builtin_english_hard() {
        let list = WordList::builtin(WordSet::EnglishHard).unwrap();

        assert!(!list.is_empty());
        assert!(list.contains("rhythm"));
    }

    #[test]
    fn test_builtin_words_have_no_whitespace() {
        for set in [WordSet::English, WordSet::EnglishHard] {
            let list = WordList::builtin(set).unwrap();
            assert!(list.words().iter().all(|w| !w.contains(char::is_whitespace)));
        }
    }

    #[test]
    fn test_new_trims_and_drops_blanks() {
        let list = WordList::new(["  apple ", "", "   ", "pear"]);

        assert_eq!(list.words(), &["apple".to_string(), "pear".to_string()]);
    }

    #[test]
    fn test_parse_lines_skips_comments() {
        let list = WordList::parse_lines("# animals\ncat\n\n  dog  \n# end\n");

        assert_eq!(list.len(), 2);
        assert!(list.contains("cat"));
        assert!(list.contains("dog"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "alpha\nbeta\n").unwrap();

        let list = WordList::from_file(&path).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WordList::from_file(dir.path().join("nope.txt"));

        assert!(matches!(result, Err(WordListError::Io(_))));
    }

    #[test]
    fn test_choose_empty() {
        let list = WordList::default();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(list.choose(&mut rng), None);
    }

    #[test]
    fn test_choose_covers_every_word() {
        let list = WordList::new(["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(42);

        let seen: HashSet<&str> = (0..200).filter_map(|_| list.choose(&mut rng)).collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_word_set_display() {
        assert_eq!(WordSet::English.to_string(), "English");
        assert_eq!(WordSet::EnglishHard.to_string(), "EnglishHard");
    }
}
