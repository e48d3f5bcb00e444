use crate::Transcript;

/// Render transcript as plain text (one segment per line, no timestamps)
pub fn render_text(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render transcript under a Markdown heading carrying the video title
pub fn render_markdown(title: &str, transcript: &Transcript) -> String {
    format!("# {title}\n{}", render_text(transcript))
}
