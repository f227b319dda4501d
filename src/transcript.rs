//! Transcript assembly: merging incrementally-arriving speech fragments into
//! note text without corrupting the cursor or duplicating words.
//!
//! Two handlers implement one [`ResultHandler`] capability, chosen once at
//! session construction:
//!
//! - [`DesktopHandler`] for continuous capture with interim results. The
//!   engine re-reports every finalized slot on every event, so the handler
//!   tracks how much cumulative final text it has already committed and only
//!   inserts the new suffix.
//! - [`MobileHandler`] for segmented capture without interim results. Each
//!   event carries exactly the newly finalized slot(s) for one utterance, so
//!   every final transcript is inserted directly.

use crate::speech::RecognitionEvent;

/// Note text plus the tracked cursor position dictation inserts at
///
/// The cursor is a byte offset kept on a `char` boundary; positions set from
/// outside are clamped down to the nearest boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorBuffer {
    text: String,
    cursor: usize,
}

impl EditorBuffer {
    /// Buffer over existing text with the cursor at the end
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            cursor: text.len(),
        }
    }

    /// Current text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current cursor byte offset
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamping to the text length and down to the nearest
    /// `char` boundary
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = floor_char_boundary(&self.text, offset.min(self.text.len()));
    }

    /// Replace the whole buffer (manual edit path); cursor moves to the end
    pub fn replace(&mut self, text: &str) {
        self.text = text.to_owned();
        self.cursor = self.text.len();
    }

    /// Splice one dictated segment in at the cursor
    ///
    /// Splits the text at the cursor, prepends a single space when the text
    /// before the cursor does not already end in whitespace, appends a
    /// single trailing space, and leaves the cursor right after that
    /// trailing space so the next segment appends instead of interleaving
    /// mid-word. Whitespace-only segments are discarded.
    pub fn insert_segment(&mut self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }

        let before = &self.text[..self.cursor];
        let after = &self.text[self.cursor..];

        let needs_lead = !before.is_empty() && !before.ends_with(char::is_whitespace);
        let mut spliced = String::with_capacity(self.text.len() + segment.len() + 2);
        spliced.push_str(before);
        if needs_lead {
            spliced.push(' ');
        }
        spliced.push_str(segment);
        spliced.push(' ');
        let cursor = spliced.len();
        spliced.push_str(after);

        self.text = spliced;
        self.cursor = cursor;
    }
}

/// Per-device-class result handling, selected once at session construction
pub trait ResultHandler: Send {
    /// Consume one recognition event, mutating the editor as needed
    ///
    /// Returns `true` if any text was committed (the caller then notifies
    /// the autosave coordinator). An event with no final slots is silence,
    /// not an error, and returns `false`.
    fn on_event(&mut self, event: &RecognitionEvent, editor: &mut EditorBuffer) -> bool;

    /// Live interim text for display; never committed to the note
    fn interim(&self) -> &str;

    /// Drop per-capture state; called at capture start and end
    fn reset(&mut self);
}

/// Continuous-capture handler (desktop)
#[derive(Debug, Default)]
pub struct DesktopHandler {
    /// Byte length of cumulative final text already inserted into the note
    committed_len: usize,
    interim: String,
}

impl DesktopHandler {
    /// Fresh handler with nothing committed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultHandler for DesktopHandler {
    fn on_event(&mut self, event: &RecognitionEvent, editor: &mut EditorBuffer) -> bool {
        // The event's slot list is cumulative for the session: rebuild the
        // full final and interim buffers from it every time.
        let mut final_text = String::new();
        self.interim.clear();
        for slot in &event.results {
            if let Some(transcript) = slot.top_transcript() {
                if slot.is_final {
                    final_text.push_str(transcript);
                } else {
                    self.interim.push_str(transcript);
                }
            }
        }

        if final_text.len() <= self.committed_len {
            return false;
        }

        // Finalized prefixes are stable, so committed_len always lands on a
        // boundary; clamp anyway so a misbehaving engine cannot panic us.
        let start = floor_char_boundary(&final_text, self.committed_len);
        let delta = final_text[start..].trim();
        self.committed_len = final_text.len();

        if delta.is_empty() {
            return false;
        }
        editor.insert_segment(delta);
        true
    }

    fn interim(&self) -> &str {
        &self.interim
    }

    fn reset(&mut self) {
        self.committed_len = 0;
        self.interim.clear();
    }
}

/// Segmented-capture handler (mobile)
///
/// No cumulative buffer: the engine segments by pause and each event is a
/// fresh, non-overlapping utterance.
#[derive(Debug, Default)]
pub struct MobileHandler;

impl MobileHandler {
    /// Fresh handler
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ResultHandler for MobileHandler {
    fn on_event(&mut self, event: &RecognitionEvent, editor: &mut EditorBuffer) -> bool {
        let mut inserted = false;
        for slot in &event.results {
            if !slot.is_final {
                continue;
            }
            if let Some(transcript) = slot.top_transcript() {
                let delta = transcript.trim();
                if !delta.is_empty() {
                    editor.insert_segment(delta);
                    inserted = true;
                }
            }
        }
        inserted
    }

    fn interim(&self) -> &str {
        ""
    }

    fn reset(&mut self) {}
}

/// Largest `char` boundary in `text` not exceeding `index`
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
