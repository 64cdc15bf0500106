//! External collaborators of the coordinator: the interviewer model, the
//! code sandbox and the speech side channel.

pub mod assistant;
pub mod error;
pub mod judge0_sandbox;
pub mod offline_assistant;
pub mod openai_api_assistant;
pub mod prompt;
pub mod sandbox;
pub mod speech;

pub use assistant::{Assistant, ChatContext, HintContext};
pub use error::InteractionError;
pub use judge0_sandbox::Judge0Sandbox;
pub use offline_assistant::OfflineAssistant;
pub use openai_api_assistant::OpenAiApiAssistant;
pub use prompt::CANNED_HINT;
pub use sandbox::{CodeSandbox, PollStatus};
pub use speech::{ClientSideSpeech, SpeechSynthesizer};
