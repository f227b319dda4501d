use std::time::Duration;

/// Artificial latency so the UI's "summarizing…" state is visible
const MOCK_DELAY: Duration = Duration::from_millis(1500);

/// Words of the note quoted in the generated template
const SNIPPET_WORDS: usize = 12;

/// Mock AI summarization: a hard-coded template over the note text behind an
/// artificial delay
///
/// There is no model here and none is planned for this layer; real
/// summarization would replace this function wholesale.
pub async fn summarize(text: &str) -> String {
    tokio::time::sleep(MOCK_DELAY).await;
    render_summary(text)
}

fn render_summary(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return "This note is empty. Nothing to summarize yet.".to_owned();
    }

    let snippet = words[..words.len().min(SNIPPET_WORDS)].join(" ");
    let ellipsis = if words.len() > SNIPPET_WORDS { "…" } else { "" };
    format!(
        "AI Summary: this note contains {} word(s) and begins: \"{snippet}{ellipsis}\"",
        words.len()
    )
}
