//! Prompt formatting layer.
//!
//! The state machine decides *what* happened on a turn and describes it as a
//! [`PromptEvent`]; a [`PromptFormatter`] turns that into the text a participant
//! reads. Swapping the formatter (or rephrasing its output downstream) never
//! changes which inputs are valid or where the conversation goes next.

use crate::conversation::MatchStep;
use crate::sessions::{PlanningStage, QuestionId, SCORE_MAX};

/// Something the participant needs to be told.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptEvent<'a> {
    Welcome,
    Greeted {
        name: &'a str,
    },
    NoMatch {
        step: MatchStep,
        name: &'a str,
        valid: &'a [String],
    },
    ConfirmSingle {
        step: MatchStep,
        name: &'a str,
        category: &'a str,
    },
    Disambiguate {
        step: MatchStep,
        name: &'a str,
        options: &'a [String],
    },
    InvalidSelection {
        step: MatchStep,
        name: &'a str,
        options: &'a [String],
    },
    YesNoExpected {
        step: MatchStep,
        name: &'a str,
        category: &'a str,
    },
    Rejected {
        step: MatchStep,
        name: &'a str,
    },
    SectorConfirmed {
        name: &'a str,
        sector: &'a str,
    },
    ChallengeConfirmed {
        name: &'a str,
        challenge: &'a str,
    },
    ScoreOutOfRange,
    DetailPrompt {
        name: &'a str,
        stage: PlanningStage,
        max_chars: usize,
    },
    InsightsPrompt {
        name: &'a str,
    },
    EmptyInput {
        question: QuestionId,
    },
    TooLong {
        question: QuestionId,
        max_chars: usize,
        actual: usize,
    },
    Closing {
        name: &'a str,
    },
    AlreadyClosed,
}

/// Renders prompt events into participant-facing messages.
pub trait PromptFormatter: Send + Sync {
    fn render(&self, event: &PromptEvent<'_>) -> Vec<String>;
}

/// The conference preparation script, in UK English.
#[derive(Debug, Clone)]
pub struct ConferencePrompts {
    bot_name: String,
}

impl Default for ConferencePrompts {
    fn default() -> Self {
        Self::new("ConferenceBot")
    }
}

impl ConferencePrompts {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }

    fn ask_again(step: MatchStep, name: &str) -> String {
        match step {
            MatchStep::Sector => format!(
                "Let me ask again - {} can you tell me which sector you work in?",
                name.to_uppercase()
            ),
            MatchStep::Challenge => {
                "Please can you describe the key challenge you face, we call these headwinds."
                    .to_string()
            }
        }
    }
}

fn question_label(question: QuestionId) -> &'static str {
    match question {
        QuestionId::Name => "your name",
        QuestionId::Sector => "the sector you work in",
        QuestionId::Challenge => "the key challenge you face",
        QuestionId::PlanningScore => "a number between 0 and 10",
        QuestionId::DetailFollowUp => "a description of your challenge",
        QuestionId::AdditionalInsights => "your additional thoughts",
    }
}

fn numbered(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{}. {}", i + 1, o))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PromptFormatter for ConferencePrompts {
    fn render(&self, event: &PromptEvent<'_>) -> Vec<String> {
        match event {
            PromptEvent::Welcome => vec![
                format!(
                    "Hello! Welcome to the Conference Preparation Bot. My name is {}.",
                    self.bot_name
                ),
                "I'm here to help us understand your sector, challenges, and planning status to make our upcoming conference as relevant and valuable as possible for you.".into(),
                "This conversation will be completely confidential - none of what you tell me will be attributable to you personally.".into(),
                "However, the collective feedback will provide valuable insights for all conference attendees.".into(),
                "To get started, could you please tell me your name?".into(),
            ],
            PromptEvent::Greeted { name } => {
                let upper = name.to_uppercase();
                vec![
                    format!("Hi {upper}, it's a pleasure to meet you!"),
                    "There are significant technology and socio-economic challenges ahead that we're all facing.".into(),
                    "You need to prepare and plan to address these challenges, but I recognise you may have already started on this journey.".into(),
                    format!("We want to make the conference real and relevant to you {upper}, and our conversation today will help us to establish where you are on the road."),
                    format!("Don't worry {upper}, none of what you tell me will be attributable, but collective feedback will give you insights to take away and help shape the conference."),
                    format!("Let's start! {upper} can you tell me which sector you work in?"),
                ]
            }
            PromptEvent::NoMatch { step, valid, .. } => {
                let lead = match step {
                    MatchStep::Sector => {
                        "I'm not sure I understand which sector you work in. Here are the sectors I recognise:"
                    }
                    MatchStep::Challenge => {
                        "I'm not sure I understand which challenge you're referring to. Here are the headwinds I recognise:"
                    }
                };
                vec![
                    lead.to_string(),
                    numbered(valid),
                    "Could you describe it in different words, or pick one of these?".into(),
                ]
            }
            PromptEvent::ConfirmSingle {
                step, category, ..
            } => match step {
                MatchStep::Sector => vec![format!(
                    "Thanks, so you work in {category}, correct?"
                )],
                MatchStep::Challenge => vec![format!(
                    "Thanks, so {} is the key challenge you face, correct?",
                    category.to_lowercase()
                )],
            },
            PromptEvent::Disambiguate { name, options, .. } => vec![
                format!("{} could that be one of these?", name.to_uppercase()),
                numbered(options),
                "Reply with a number, or say none if it's not listed.".into(),
            ],
            PromptEvent::InvalidSelection { options, .. } => vec![
                format!(
                    "Sorry, I need one of the numbers 1 to {}, or none if it's not listed.",
                    options.len()
                ),
                numbered(options),
            ],
            PromptEvent::YesNoExpected { category, .. } => vec![format!(
                "Sorry, I didn't follow. Is {category} right? Please answer yes or no."
            )],
            PromptEvent::Rejected { step, name } => vec![Self::ask_again(*step, name)],
            PromptEvent::SectorConfirmed { name, .. } => vec![
                "Wow, tough gig! Thank you for updating me on the sector you work in.".into(),
                "Now let's explore some of the challenges that lie ahead.".into(),
                format!(
                    "Ok thanks {}, please can you describe the key challenge you face, we call these headwinds.",
                    name.to_uppercase()
                ),
            ],
            PromptEvent::ChallengeConfirmed { name, challenge } => vec![
                format!("Thank you for telling me that your key challenge is {challenge}."),
                format!(
                    "{} let's now talk about how advanced you are in planning for the forecast headwind.",
                    name.to_uppercase()
                ),
                "How far down the road are you with planning and implementing a solution to the headwinds identified?".into(),
                format!("On a scale of 0-{SCORE_MAX} where 0-4 is preparation and planning, and 5-{SCORE_MAX} is execution, where are you on your journey?"),
            ],
            PromptEvent::ScoreOutOfRange => vec![format!(
                "Please provide a number between 0 and {SCORE_MAX}, where 0-4 is preparation and planning, and 5-{SCORE_MAX} is execution."
            )],
            PromptEvent::DetailPrompt {
                name,
                stage,
                max_chars,
            } => match stage {
                PlanningStage::Planning => vec![format!(
                    "Thank you, {} can you describe your challenge in more detail (up to {max_chars} characters)?",
                    name.to_uppercase()
                )],
                PlanningStage::Execution => vec![format!(
                    "Thank you, {} can you describe your challenge and your resolution plan in detail (up to {max_chars} characters), including end to end how long it will take to resolve?",
                    name.to_uppercase()
                )],
            },
            PromptEvent::InsightsPrompt { .. } => vec![
                "Thank you very much for talking with me. Whilst we have been talking, is there anything else you have thought of which you think may be relevant? (don't be shy!)".into(),
            ],
            PromptEvent::EmptyInput { question } => vec![format!(
                "I didn't catch that - could you give me {}?",
                question_label(*question)
            )],
            PromptEvent::TooLong {
                max_chars, actual, ..
            } => vec![format!(
                "That's {actual} characters; please keep it to {max_chars} characters or fewer and try again."
            )],
            PromptEvent::Closing { name } => vec![format!(
                "Thank you very much {} again for your time and we look forward to welcoming you at the conference.",
                name.to_uppercase()
            )],
            PromptEvent::AlreadyClosed => vec![
                "Our conversation is complete - thank you again for taking part.".into(),
            ],
        }
    }
}
