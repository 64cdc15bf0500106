//! Keyword-driven interviewer used when no model endpoint is configured.

use crate::assistant::{Assistant, ChatContext, HintContext};
use crate::error::InteractionError;
use crate::prompt::CANNED_HINT;
use async_trait::async_trait;

/// Answers from a handful of canned replies. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAssistant;

impl OfflineAssistant {
    pub fn new() -> Self {
        Self
    }

    fn canned_reply(context: &ChatContext, message: &str) -> String {
        let msg = message.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| msg.contains(w));

        if has_any(&["hint", "stuck", "help"]) {
            if let Some(error) = &context.last_error {
                return format!(
                    "I see you're running into an error: `{}`.\n\n**Hint:** Check the logic \
                     around where it is thrown. This often comes from an index out of bounds \
                     or a mistyped variable name.",
                    error.lines().next().unwrap_or(error)
                );
            }
            if let Some(hint) = context.problem_hints.first() {
                return format!("Sure! **Hint:** {}.", hint.trim_end_matches('.'));
            }
            return "Sure! **Hint:** Start with the simplest input you can think of and walk \
                    through your code by hand."
                .to_string();
        }

        if has_any(&["solution", "code"]) {
            return "I'd love to help, but I can't write the code for you! Try starting with a \
                    loop over the input. What would you do inside the loop?"
                .to_string();
        }

        "That's a great question. I'm running in **Offline Mode** right now, so I can only give \
         basic hints. Try asking me for a **hint**!"
            .to_string()
    }
}

#[async_trait]
impl Assistant for OfflineAssistant {
    async fn reply(&self, context: &ChatContext, message: &str) -> Result<String, InteractionError> {
        Ok(Self::canned_reply(context, message))
    }

    async fn hint(&self, _context: &HintContext) -> Result<String, InteractionError> {
        Ok(CANNED_HINT.to_string())
    }
}
