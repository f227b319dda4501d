use thiserror::Error;

use crate::note::Language;

/// Errors reported by a speech engine, categorized per engine error code
///
/// Some kinds are recoverable via restart; `NotAllowed` and `Network` are
/// terminal for the current session and force a stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// The engine could not reach its recognition service
    #[error("speech service unreachable over the network")]
    Network,
    /// No speech was detected before the engine gave up
    #[error("no speech detected")]
    NoSpeech,
    /// Microphone or recognition permission was denied
    #[error("speech recognition not allowed (permission denied)")]
    NotAllowed,
    /// The capture was aborted before producing a result
    #[error("speech capture aborted")]
    Aborted,
    /// Audio capture failed (no microphone, device busy)
    #[error("audio capture failed")]
    AudioCapture,
    /// The recognition service refused this client
    #[error("speech service not allowed")]
    ServiceNotAllowed,
    /// The requested language is not supported by the engine
    #[error("language not supported by the speech engine")]
    LanguageNotSupported,
    /// Anything the engine reports outside the known categories
    #[error("speech engine error: {0}")]
    Other(String),
}

/// Capture parameters handed to the engine at start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Recognition language
    pub language: Language,
    /// Keep capturing across utterance boundaries (desktop mode)
    pub continuous: bool,
    /// Emit interim (still-revisable) hypotheses (desktop mode)
    pub interim_results: bool,
}

/// One ranked hypothesis inside a result slot
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Recognized text
    pub transcript: String,
    /// Engine confidence in `[0, 1]`
    pub confidence: f32,
}

/// One slot of a recognition event: ranked hypotheses plus finality
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSlot {
    /// Hypotheses ordered best-first; only the top one is consumed
    pub alternatives: Vec<Hypothesis>,
    /// `true` once the engine will not revise this slot further
    pub is_final: bool,
}

impl ResultSlot {
    /// Build a slot with a single hypothesis
    #[must_use]
    pub fn single(transcript: &str, is_final: bool) -> Self {
        Self {
            alternatives: vec![Hypothesis {
                transcript: transcript.to_owned(),
                confidence: 1.0,
            }],
            is_final,
        }
    }

    /// Top-ranked transcript, if the slot carries any hypothesis
    #[must_use]
    pub fn top_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|h| h.transcript.as_str())
    }
}

/// One recognition event: the engine's current slot list
///
/// In continuous (desktop) mode the list is cumulative for the session; in
/// segmented (mobile) mode each event carries only the newly finalized
/// slot(s) for one utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionEvent {
    /// Ordered result slots
    pub results: Vec<ResultSlot>,
}

/// External speech capability consumed by the session
///
/// The core only drives this interface; it never implements recognition
/// itself. Engine notifications (started, result events, ended, errors) are
/// delivered back to the session by whatever hosts the real engine.
///
/// Tests inject `MockSpeechRecognizer` (via `mockall`) to verify gating and
/// restart behavior without a real engine.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechRecognizer: Send {
    /// Begin a capture with the given parameters
    ///
    /// # Errors
    /// Returns [`SpeechError`] if the engine refuses to start.
    fn start(&mut self, config: CaptureConfig) -> Result<(), SpeechError>;

    /// Stop the active capture; stopping an idle engine is a no-op
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_transcript_picks_first_alternative() {
        let slot = ResultSlot {
            alternatives: vec![
                Hypothesis {
                    transcript: "call mom".to_owned(),
                    confidence: 0.9,
                },
                Hypothesis {
                    transcript: "cool mom".to_owned(),
                    confidence: 0.4,
                },
            ],
            is_final: true,
        };
        assert_eq!(slot.top_transcript(), Some("call mom"));
    }

    #[test]
    fn test_top_transcript_empty_slot() {
        let slot = ResultSlot {
            alternatives: Vec::new(),
            is_final: true,
        };
        assert_eq!(slot.top_transcript(), None);
    }
}
