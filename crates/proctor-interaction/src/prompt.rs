//! Prompt text sent to the interviewer model.

use crate::assistant::{ChatContext, HintContext};

pub const SYSTEM_PROMPT: &str = "You are a Senior Technical Interviewer conducting a live coding interview.

Your goal: assess the candidate's problem-solving skills while keeping the session supportive and interactive.

Voice:
- Professional, encouraging and conversational, like a senior engineer talking to a junior engineer.
- Write as if speaking. Use short sentences. Do not read out large blocks of code.
- Ask follow-up questions such as \"How would you handle an empty input?\".

Rules:
1. Guide, do not solve. When the candidate is stuck give a conceptual hint. Never write the full solution.
2. When they solve it quickly, discuss time complexity, edge cases or optimizations.
3. Answer their specific questions directly.
4. When reviewing code, point out naming and structure like a mentor would.
5. Keep replies to 1-3 sentences in back-and-forth dialogue. Avoid long markdown lists.";

/// Used when a hint cannot be generated.
pub const CANNED_HINT: &str = "I notice you're encountering the same error repeatedly. Try reviewing \
your logic step by step, and consider testing with a simple example first. You're on the right track!";

/// Builds the user turn for a chat reply.
pub fn chat_prompt(context: &ChatContext, message: &str) -> String {
    let mut prompt = String::new();
    if !context.problem_title.is_empty() {
        prompt.push_str(&format!("Current Problem: {}\n", context.problem_title));
    }
    prompt.push_str(&format!("Candidate says: {}\n\nContext:\n", message));
    if !context.current_code.trim().is_empty() {
        prompt.push_str(&format!(
            "Current Code:\n```javascript\n{}\n```\n",
            context.current_code
        ));
    }
    if let Some(error) = &context.last_error {
        prompt.push_str(&format!("Recent Execution Error: {}\n", error));
    }
    prompt
}

/// Builds the request for a repeated-failure hint.
pub fn hint_prompt(context: &HintContext) -> String {
    format!(
        "The candidate working on \"{title}\" has hit the same error {count} times in a row.\n\n\
         Error:\n{error}\n\n\
         Their code:\n```javascript\n{code}\n```\n\n\
         Give a brief hint (2-3 sentences) that points toward the cause of the error and a general \
         way to fix it, without giving away the solution. End with a word of encouragement.",
        title = context.problem_title,
        count = context.consecutive_errors,
        error = context.error,
        code = context.current_code,
    )
}
