use serde::Deserialize;
use serde_json::Value;

/// A normalized unit of transcript output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Incremental text (not the full transcript)
    pub text: String,

    /// Whether the upstream considers this utterance complete
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Type tag suffixes that mark a terminal transcript event
const COMPLETION_SUFFIXES: &[&str] = &[".done", ".completed", ".final"];

/// The record shapes we know how to read a transcript from.
///
/// Covers the OpenAI realtime family (`*.delta`, `*.done`, `*.completed`),
/// the local windowed server (`transcript.delta`, `transcript.final`) and
/// conversation items carrying a content list.
#[derive(Debug, Default, Deserialize)]
struct UpstreamEvent {
    #[serde(rename = "type", default)]
    kind: String,
    delta: Option<String>,
    transcript: Option<String>,
    text: Option<String>,
    content: Option<Vec<ContentBlock>>,
    item: Option<ItemBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemBlock {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentBlock {
    transcript: Option<String>,
    text: Option<String>,
}

impl ContentBlock {
    fn body(&self) -> Option<&str> {
        self.transcript
            .as_deref()
            .or(self.text.as_deref())
            .filter(|s| !s.is_empty())
    }
}

enum Shape<'a> {
    Delta(&'a str),
    Terminal(&'a str),
    Content(&'a str),
}

impl UpstreamEvent {
    fn is_transcript(&self) -> bool {
        self.kind.contains("transcript") || self.kind.contains("transcription")
    }

    fn is_completion(&self) -> bool {
        COMPLETION_SUFFIXES.iter().any(|s| self.kind.ends_with(s))
    }

    /// First matching rule wins
    fn shape(&self) -> Option<Shape<'_>> {
        if !self.is_transcript() {
            return None;
        }
        if let Some(delta) = self.delta.as_deref() {
            return Some(Shape::Delta(delta));
        }
        if let Some(text) = self.transcript.as_deref().or(self.text.as_deref()) {
            return Some(Shape::Terminal(text));
        }
        let blocks = self
            .content
            .iter()
            .flatten()
            .chain(self.item.iter().flat_map(|item| item.content.iter()));
        for block in blocks {
            if let Some(body) = block.body() {
                return Some(Shape::Content(body));
            }
        }
        None
    }
}

/// Classify one upstream realtime event.
///
/// Returns `None` for anything that is not a transcript-bearing record.
pub fn extract_event(value: &Value) -> Option<TranscriptEvent> {
    let event = UpstreamEvent::deserialize(value).ok()?;
    match event.shape()? {
        Shape::Delta(delta) => Some(TranscriptEvent::partial(delta)),
        Shape::Terminal(text) => Some(TranscriptEvent {
            text: text.to_string(),
            is_final: event.is_completion(),
        }),
        Shape::Content(text) => Some(TranscriptEvent::final_text(text)),
    }
}

/// Suffix of `current` after its longest common prefix with `previous`
pub fn delta_suffix<'a>(previous: &str, current: &'a str) -> &'a str {
    let matched = previous
        .chars()
        .zip(current.char_indices())
        .take_while(|(old, (_, new))| old == new)
        .last()
        .map(|(_, (idx, ch))| idx + ch.len_utf8())
        .unwrap_or(0);
    &current[matched..]
}

fn word_key(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Words of `current` that follow the longest run of trailing `previous` words
/// it starts with. `None` when the two share no such run.
fn overlap_delta(previous: &str, current: &str) -> Option<String> {
    let prev: Vec<String> = previous.split_whitespace().map(word_key).collect();
    let cur_words: Vec<&str> = current.split_whitespace().collect();
    let cur: Vec<String> = cur_words.iter().map(|w| word_key(w)).collect();

    let longest = prev.len().min(cur.len());
    let overlap = (1..=longest)
        .rev()
        .find(|&k| prev[prev.len() - k..] == cur[..k])?;

    let rest = cur_words[overlap..].join(" ");
    if rest.is_empty() {
        Some(String::new())
    } else {
        Some(format!(" {rest}"))
    }
}

/// Tracks the last emitted full transcript of a re-transcribed window and
/// yields only unseen text.
#[derive(Debug, Default, Clone)]
pub struct TranscriptDiff {
    last_text: String,
}

impl TranscriptDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    /// Diff `current` against the last emitted text.
    ///
    /// `scrolled` says the audio window has dropped its oldest audio, so
    /// `current` may no longer start where the previous result did. In that
    /// case word overlap alignment is tried before the plain prefix diff.
    /// The recorded text only advances when a non-empty delta is produced.
    pub fn advance(&mut self, current: &str, scrolled: bool) -> Option<String> {
        let prefix_delta = delta_suffix(&self.last_text, current);
        let extends = current.len() - prefix_delta.len() >= self.last_text.len();

        let delta = if scrolled && !extends {
            overlap_delta(&self.last_text, current).unwrap_or_else(|| {
                // Unaligned text still has to read as new words
                if self.last_text.is_empty() || prefix_delta.starts_with(char::is_whitespace) {
                    prefix_delta.to_string()
                } else {
                    format!(" {prefix_delta}")
                }
            })
        } else {
            prefix_delta.to_string()
        };

        if delta.is_empty() {
            return None;
        }
        self.last_text = current.to_string();
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_suffix_multibyte() {
        assert_eq!(delta_suffix("café", "café au lait"), " au lait");
        assert_eq!(delta_suffix("naïve", "naive"), "ive");
        assert_eq!(delta_suffix("", "héllo"), "héllo");
    }

    #[test]
    fn test_overlap_delta_ignores_case_and_punctuation() {
        assert_eq!(
            overlap_delta("we went to the Park.", "the park and then home"),
            Some(" and then home".to_string())
        );
        assert_eq!(overlap_delta("alpha beta", "gamma delta"), None);
    }
}
