//! Grounded answer prompt
//!
//! The generation collaborator is asked to answer strictly from the retrieved
//! context. Nothing checks that it complied.

/// Marker the model is asked to return when the context lacks the answer
pub const NOT_IN_CONTEXT_MARKER: &str = "answer is not available in the context";

/// Fixed instruction sent alongside every question
pub const GROUNDED_ANSWER_INSTRUCTION: &str = "Answer the question in detail using only the context provided. \
If the answer is not in the context, say \"answer is not available in the context.\" \
Do not make up an answer.";

/// Render the full prompt for generators that take a single user message.
pub fn render_grounded_prompt(question: &str, context: &str) -> String {
    format!(
        "{GROUNDED_ANSWER_INSTRUCTION}\n\nContext:\n{context}\n\nQuestion:\n{question}\n\nAnswer:"
    )
}
