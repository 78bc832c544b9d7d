//! Prompt assembly for a chat turn.

const SYSTEM_PROMPT: &str = "You are ScreenTalk, an on-device assistant that helps describe the \
current phone screen. Answer concisely and mention when information is not visible.";

/// Build the full prompt from the user's question and the rendered screen
/// context. The language note keeps answers in Arabic when the question is.
pub fn build(user_question: &str, screen_context: &str) -> String {
    let language_note = if contains_arabic(user_question) {
        "Respond in Arabic unless the user switches language."
    } else {
        "Respond in the user's language."
    };
    let context = if screen_context.trim().is_empty() {
        "No visible text captured."
    } else {
        screen_context
    };

    format!(
        "{SYSTEM_PROMPT}\n{language_note}\n\nSCREEN CONTEXT:\n{context}\n\nUSER QUESTION:\n{user_question}\n\nAnswer:\n"
    )
}

fn contains_arabic(text: &str) -> bool {
    text.chars()
        .any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}
