//! Summarization prompt assembly.

/// Build the summarization instruction prompt from a note's title, its
/// plain-text body, and the extracted attachment text.
///
/// Pure function: same inputs always produce the same prompt. The length
/// policy on `plain_text` is enforced by the orchestrator before this is
/// called.
pub fn build_summary_prompt(title: &str, plain_text: &str, attachments_text: &str) -> String {
    let mut prompt = format!(
        "You are a professional note-taking assistant. I need a concise summary of the following note.\n\
         \n\
         TITLE: {title}\n\
         CONTENT: {plain_text}\n"
    );

    if !attachments_text.is_empty() {
        prompt.push_str(&format!(
            "ATTACHED DOCUMENT CONTENT: {attachments_text}\n"
        ));
    }

    prompt.push_str(
        "\nINSTRUCTIONS:\n\
         - Provide a summary in 3-5 bullet points.\n\
         - Pull out any key actions or deadlines if they exist.\n\
         - If there are attached documents, integrate their key information into the summary.\n\
         - Use professional and clear language.\n\
         - Formatting: Use Markdown bullet points.\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_summary_prompt("Title", "body text", "");
        let b = build_summary_prompt("Title", "body text", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_inputs() {
        let prompt = build_summary_prompt("Q3 Planning", "discuss roadmap", "");
        assert!(prompt.contains("TITLE: Q3 Planning"));
        assert!(prompt.contains("CONTENT: discuss roadmap"));
    }

    #[test]
    fn test_attachment_section_only_when_present() {
        let without = build_summary_prompt("T", "body", "");
        assert!(!without.contains("ATTACHED DOCUMENT CONTENT"));

        let with = build_summary_prompt("T", "body", "\n[Content from Attachment: a.pdf]\nhi");
        assert!(with.contains("ATTACHED DOCUMENT CONTENT"));
        assert!(with.contains("a.pdf"));
    }

    #[test]
    fn test_prompt_carries_formatting_instructions() {
        let prompt = build_summary_prompt("T", "body", "");
        assert!(prompt.contains("3-5 bullet points"));
        assert!(prompt.contains("Markdown bullet points"));
        assert!(prompt.contains("actions or deadlines"));
    }
}
