pub mod openai;
pub mod traits;

pub use openai::OpenAiRephraser;
pub use traits::{PromptRephraser, RephraseError, rephrase_messages};
