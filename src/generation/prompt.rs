
/// Header written above every retrieved chunk in the generation context
const SECTION_HEADER_PREFIX: &str = "=== Document Section ";

/// Labels some models echo in front of their answer
const ANSWER_PREFIXES: [&str; 3] = ["ANSWER:", "Answer:", "A:"];

/// Assemble retrieved chunk texts, best match first, into the context block
#[inline]
pub fn build_context<'a, I>(sections: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    sections
        .into_iter()
        .enumerate()
        .map(|(i, text)| format!("{}{} ===\n{}\n", SECTION_HEADER_PREFIX, i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the section headers added by [`build_context`]
#[inline]
pub fn strip_section_headers(context: &str) -> String {
    context
        .lines()
        .filter(|line| !(line.starts_with(SECTION_HEADER_PREFIX) && line.ends_with("===")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following information, please provide a detailed and well-structured answer.

CONTEXT INFORMATION:
{context}

QUESTION: {question}

INSTRUCTIONS: Please provide a comprehensive answer that:
1. Directly answers the question based on the context
2. Includes specific details and data from the documents
3. Is well-organized with clear sections if needed
4. Cites relevant information from the source material
5. Is accurate and factual based only on the provided context

ANSWER:"
    )
}

/// Tidy raw model output into the answer shown to the caller
///
/// Some backends return the prompt followed by the completion, so an echoed
/// prompt is removed first. The result may be empty.
#[inline]
pub fn clean_answer(raw: &str, prompt: &str) -> String {
    let mut answer = raw.strip_prefix(prompt).unwrap_or(raw).trim_start();

    for prefix in ANSWER_PREFIXES {
        if let Some(rest) = answer.strip_prefix(prefix) {
            answer = rest.trim_start();
            break;
        }
    }

    answer
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
