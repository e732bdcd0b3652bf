use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static PHRASE_DIR: Dir = include_dir!("src/phrases");

/// Target window for generated sentences, in characters.
pub const MIN_SENTENCE_CHARS: usize = 20;
pub const MAX_SENTENCE_CHARS: usize = 60;

/// One embedded phrase set: the pools and connectors for local sentence
/// generation, plus the remote-generation instruction in the same language.
#[derive(Deserialize, Clone, Debug)]
pub struct PhraseSet {
    pub name: String,
    pub subjects: Vec<String>,
    pub actions: Vec<String>,
    pub tails: Vec<String>,
    /// Fragments between subject/action and action/tail in the primary
    /// template.
    pub connectors: [String; 2],
    /// Longer fragments substituted when the primary template comes up
    /// short of the window.
    pub alt_connectors: [String; 2],
    /// Appended after truncating an over-long sentence.
    pub truncation_mark: String,
    pub instruction: String,
    pub theme_hint: String,
}

impl PhraseSet {
    pub fn new(file_name: String) -> Self {
        read_set_from_file(format!("{file_name}.json")).unwrap()
    }
}

fn read_set_from_file(file_name: String) -> Result<PhraseSet, Box<dyn Error>> {
    let file = PHRASE_DIR
        .get_file(file_name)
        .expect("Phrase set file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    let set = from_str(file_as_str).expect("Unable to deserialize phrase set json");

    Ok(set)
}

/// Local prompt source: one random subject, action, and closing phrase,
/// squeezed into the sentence window. Never fails, which makes it the
/// terminal strategy of every fallback chain.
#[derive(Debug, Clone)]
pub struct LocalGenerator {
    set: PhraseSet,
}

impl LocalGenerator {
    pub fn new(set: PhraseSet) -> Self {
        Self { set }
    }

    pub fn set(&self) -> &PhraseSet {
        &self.set
    }

    pub fn sentence(&self) -> String {
        let rng = &mut rand::thread_rng();
        let subject = choose(&self.set.subjects, rng);
        let action = choose(&self.set.actions, rng);
        let tail = choose(&self.set.tails, rng);

        let primary = compose(&self.set.connectors, subject, action, tail);
        let mut sentence = if char_count(&primary) < MIN_SENTENCE_CHARS {
            compose(&self.set.alt_connectors, subject, action, tail)
        } else {
            primary
        };

        // A short subject and tail can leave even the alternate template
        // under the window; extend with further closing phrases.
        while char_count(&sentence) < MIN_SENTENCE_CHARS {
            sentence.push_str(choose(&self.set.tails, rng));
        }

        if char_count(&sentence) > MAX_SENTENCE_CHARS {
            let keep: String = sentence.chars().take(MAX_SENTENCE_CHARS - 4).collect();
            sentence = format!("{keep}{}", self.set.truncation_mark);
        }

        sentence
    }
}

fn choose<'a, R: rand::Rng>(pool: &'a [String], rng: &mut R) -> &'a str {
    pool.choose(rng).expect("phrase pool is empty")
}

fn compose(connectors: &[String; 2], subject: &str, action: &str, tail: &str) -> String {
    format!(
        "{subject}{}{action}{}{tail}",
        connectors[0], connectors[1]
    )
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}
