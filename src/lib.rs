pub mod catalog;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod matcher;
pub mod prompts;
pub mod registry;
pub mod sessions;
pub mod telemetry;

pub use catalog::SurveyCatalog;
pub use conversation::{Conversation, Reply, Survey, SurveyLimits};
pub use error::{ConferenceBotError, Result, TurnError};
pub use sessions::{ExportEnvelope, ExportRecord, SessionRecord};

use std::sync::Arc;

/// Build a survey from loaded configuration.
pub fn survey_from_config(config: &config::Config) -> Result<Survey> {
    let catalog = config.survey.load_catalog()?;
    Ok(Survey::new(
        Arc::new(catalog),
        Arc::new(prompts::ConferencePrompts::new(config.survey.bot_name.clone())),
        config.survey.limits(),
    ))
}
