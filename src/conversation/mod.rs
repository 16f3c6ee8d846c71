//! Conversation state machine.
//!
//! One [`Conversation`] walks one participant through the fixed question
//! sequence. Each call to [`Conversation::handle`] consumes one utterance and
//! performs exactly one transition; turns that cannot advance leave the state
//! and the session record untouched and explain why in the [`Reply`].

pub mod input;

use crate::catalog::SurveyCatalog;
use crate::error::{ConferenceBotError, Result, TurnError};
use crate::matcher::{MatchCandidate, Matcher};
use crate::prompts::{ConferencePrompts, PromptEvent, PromptFormatter};
use crate::registry::CategoryRegistry;
use crate::sessions::{
    Answer, ExportRecord, FIELD_ADDITIONAL_INSIGHTS, FIELD_CHALLENGE_DETAIL,
    FIELD_RESOLUTION_PLAN, FIELD_TIMELINE, PlanningStage, QuestionId, SessionRecord,
};
use input::Selection;
use serde::Serialize;
use std::sync::Arc;

/// The two steps that resolve free text against a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStep {
    Sector,
    Challenge,
}

impl MatchStep {
    pub fn question(self) -> QuestionId {
        match self {
            MatchStep::Sector => QuestionId::Sector,
            MatchStep::Challenge => QuestionId::Challenge,
        }
    }
}

/// Candidates offered to the participant, plus the text that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMatch {
    pub raw_text: String,
    pub candidates: Vec<MatchCandidate>,
}

impl PendingMatch {
    pub fn names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name().to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Greeting,
    AskSector,
    ConfirmSector(PendingMatch),
    AskChallenge,
    ConfirmChallenge(PendingMatch),
    AskPlanningScore,
    AskDetailFollowUp,
    AskAdditionalInsights,
    Closing,
}

/// Payload-free view of [`Step`] for hosts and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Greeting,
    AskSector,
    ConfirmSector,
    AskChallenge,
    ConfirmChallenge,
    AskPlanningScore,
    AskDetailFollowUp,
    AskAdditionalInsights,
    Closing,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Greeting => StepKind::Greeting,
            Step::AskSector => StepKind::AskSector,
            Step::ConfirmSector(_) => StepKind::ConfirmSector,
            Step::AskChallenge => StepKind::AskChallenge,
            Step::ConfirmChallenge(_) => StepKind::ConfirmChallenge,
            Step::AskPlanningScore => StepKind::AskPlanningScore,
            Step::AskDetailFollowUp => StepKind::AskDetailFollowUp,
            Step::AskAdditionalInsights => StepKind::AskAdditionalInsights,
            Step::Closing => StepKind::Closing,
        }
    }
}

/// Length limits and matching knobs for one survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyLimits {
    pub max_candidates: usize,
    pub short_keyword_len: usize,
    pub name_max_chars: usize,
    pub detail_max_chars: usize,
    pub insights_max_chars: usize,
}

impl Default for SurveyLimits {
    fn default() -> Self {
        Self {
            max_candidates: 3,
            short_keyword_len: crate::matcher::DEFAULT_SHORT_KEYWORD_LEN,
            name_max_chars: 100,
            detail_max_chars: 500,
            insights_max_chars: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedOption {
    pub number: usize,
    pub name: String,
}

/// What the driver renders after a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub messages: Vec<String>,
    /// Numbered choices when the participant must pick between candidates.
    pub options: Vec<NumberedOption>,
    /// Set when the turn did not advance.
    pub error: Option<TurnError>,
    pub step: StepKind,
    pub complete: bool,
}

/// Shared, immutable ingredients for starting conversations.
#[derive(Clone)]
pub struct Survey {
    catalog: Arc<SurveyCatalog>,
    formatter: Arc<dyn PromptFormatter>,
    limits: SurveyLimits,
}

impl Survey {
    pub fn new(
        catalog: Arc<SurveyCatalog>,
        formatter: Arc<dyn PromptFormatter>,
        limits: SurveyLimits,
    ) -> Self {
        Self {
            catalog,
            formatter,
            limits,
        }
    }

    /// Bundled catalog, default script and limits.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(
            Arc::new(SurveyCatalog::bundled()?),
            Arc::new(ConferencePrompts::default()),
            SurveyLimits::default(),
        ))
    }

    pub fn catalog(&self) -> &SurveyCatalog {
        &self.catalog
    }

    pub fn limits(&self) -> SurveyLimits {
        self.limits
    }

    /// A fresh conversation and its opening reply.
    pub fn start(&self) -> (Conversation, Reply) {
        let convo = Conversation::new(
            self.catalog.clone(),
            self.formatter.clone(),
            self.limits,
        );
        let opening = convo.opening();
        (convo, opening)
    }
}

#[derive(Debug, Default)]
struct Turn {
    messages: Vec<String>,
    options: Vec<String>,
    error: Option<TurnError>,
}

impl Turn {
    fn say(messages: Vec<String>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    fn reject(error: TurnError, messages: Vec<String>) -> Self {
        Self {
            messages,
            error: Some(error),
            ..Default::default()
        }
    }

    fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

pub struct Conversation {
    catalog: Arc<SurveyCatalog>,
    formatter: Arc<dyn PromptFormatter>,
    limits: SurveyLimits,
    matcher: Matcher,
    step: Step,
    record: SessionRecord,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("step", &self.step.kind())
            .field("record", &self.record)
            .finish()
    }
}

impl Conversation {
    pub fn new(
        catalog: Arc<SurveyCatalog>,
        formatter: Arc<dyn PromptFormatter>,
        limits: SurveyLimits,
    ) -> Self {
        Self {
            catalog,
            formatter,
            limits,
            matcher: Matcher::new(limits.short_keyword_len),
            step: Step::Greeting,
            record: SessionRecord::new(),
        }
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    /// In-progress view of the record; use [`Conversation::finalize`] for export.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn is_complete(&self) -> bool {
        self.step == Step::Closing
    }

    /// Welcome messages shown before the first utterance.
    pub fn opening(&self) -> Reply {
        self.reply(Turn::say(self.formatter.render(&PromptEvent::Welcome)))
    }

    /// Read-only record, available once the conversation has closed.
    pub fn finalize(&self) -> Result<&SessionRecord> {
        if self.is_complete() {
            Ok(&self.record)
        } else {
            Err(ConferenceBotError::SessionIncomplete {
                message: format!("conversation is at {:?}", self.step.kind()),
            })
        }
    }

    pub fn export(&self) -> Result<ExportRecord> {
        self.finalize().map(SessionRecord::to_exportable)
    }

    /// Consume one utterance and perform one transition.
    pub fn handle(&mut self, utterance: &str) -> Reply {
        let input = utterance.trim();
        let from = self.step.kind();
        let current = std::mem::replace(&mut self.step, Step::Greeting);

        let (next, turn) = match current {
            Step::Greeting => self.on_greeting(input),
            Step::AskSector => self.on_ask(MatchStep::Sector, input),
            Step::ConfirmSector(pending) => self.on_confirm(MatchStep::Sector, pending, input),
            Step::AskChallenge => self.on_ask(MatchStep::Challenge, input),
            Step::ConfirmChallenge(pending) => {
                self.on_confirm(MatchStep::Challenge, pending, input)
            }
            Step::AskPlanningScore => self.on_score(input),
            Step::AskDetailFollowUp => self.on_detail(input),
            Step::AskAdditionalInsights => self.on_insights(input),
            Step::Closing => (
                Step::Closing,
                Turn::reject(
                    TurnError::ConversationClosed,
                    self.render(PromptEvent::AlreadyClosed),
                ),
            ),
        };

        self.step = next;
        match &turn.error {
            Some(err) => tracing::debug!(step = ?from, error = %err, "turn re-prompted"),
            None => tracing::debug!(from = ?from, to = ?self.step.kind(), "turn advanced"),
        }
        if from != StepKind::Closing && self.is_complete() {
            tracing::info!(
                sector = self.record.sector().unwrap_or_default(),
                challenge = self.record.challenge().unwrap_or_default(),
                "conversation closed"
            );
        }
        self.reply(turn)
    }

    fn reply(&self, turn: Turn) -> Reply {
        Reply {
            messages: turn.messages,
            options: turn
                .options
                .into_iter()
                .enumerate()
                .map(|(i, name)| NumberedOption { number: i + 1, name })
                .collect(),
            error: turn.error,
            step: self.step.kind(),
            complete: self.is_complete(),
        }
    }

    fn render(&self, event: PromptEvent<'_>) -> Vec<String> {
        self.formatter.render(&event)
    }

    fn registry(&self, step: MatchStep) -> &CategoryRegistry {
        match step {
            MatchStep::Sector => &self.catalog.sectors,
            MatchStep::Challenge => &self.catalog.headwinds,
        }
    }

    fn ask_step(step: MatchStep) -> Step {
        match step {
            MatchStep::Sector => Step::AskSector,
            MatchStep::Challenge => Step::AskChallenge,
        }
    }

    fn confirm_step(step: MatchStep, pending: PendingMatch) -> Step {
        match step {
            MatchStep::Sector => Step::ConfirmSector(pending),
            MatchStep::Challenge => Step::ConfirmChallenge(pending),
        }
    }

    fn empty(&self, question: QuestionId) -> Turn {
        Turn::reject(
            TurnError::EmptyInput,
            self.render(PromptEvent::EmptyInput { question }),
        )
    }

    fn check_length(&self, question: QuestionId, input: &str, max_chars: usize) -> Option<Turn> {
        let actual = input.chars().count();
        if actual <= max_chars {
            return None;
        }
        Some(Turn::reject(
            TurnError::OutOfRange {
                constraint: format!("{question} must be at most {max_chars} characters"),
            },
            self.render(PromptEvent::TooLong {
                question,
                max_chars,
                actual,
            }),
        ))
    }

    fn on_greeting(&mut self, input: &str) -> (Step, Turn) {
        if input.is_empty() {
            return (Step::Greeting, self.empty(QuestionId::Name));
        }
        if let Some(turn) = self.check_length(QuestionId::Name, input, self.limits.name_max_chars)
        {
            return (Step::Greeting, turn);
        }

        self.record.participant_name = input.to_string();
        self.record.record(Answer::text(QuestionId::Name, input));
        let turn = Turn::say(self.render(PromptEvent::Greeted { name: input }));
        (Step::AskSector, turn)
    }

    fn on_ask(&mut self, step: MatchStep, input: &str) -> (Step, Turn) {
        let name = self.record.participant_name.as_str();
        if input.is_empty() {
            return (Self::ask_step(step), self.empty(step.question()));
        }

        let registry = self.registry(step);
        let ranked = self.matcher.rank(input, registry);
        if ranked.is_empty() {
            let valid = registry.names();
            let turn = Turn::reject(
                TurnError::NoMatch {
                    registry: registry.kind().to_string(),
                },
                self.render(PromptEvent::NoMatch {
                    step,
                    name,
                    valid: &valid,
                }),
            );
            return (Self::ask_step(step), turn);
        }

        // A named category beats any keyword guess, so only exact hits are offered.
        let has_exact = ranked.iter().any(MatchCandidate::is_exact);
        let offered: Vec<MatchCandidate> = ranked
            .into_iter()
            .filter(|c| !has_exact || c.is_exact())
            .take(self.limits.max_candidates.max(1))
            .collect();
        let pending = PendingMatch {
            raw_text: input.to_string(),
            candidates: offered,
        };

        let turn = self.offer(step, &pending);
        (Self::confirm_step(step, pending), turn)
    }

    fn offer(&self, step: MatchStep, pending: &PendingMatch) -> Turn {
        let name = self.record.participant_name.as_str();
        if let [only] = pending.candidates.as_slice() {
            Turn::say(self.render(PromptEvent::ConfirmSingle {
                step,
                name,
                category: only.name(),
            }))
        } else {
            let options = pending.names();
            Turn::say(self.render(PromptEvent::Disambiguate {
                step,
                name,
                options: &options,
            }))
            .with_options(options)
        }
    }

    fn on_confirm(&mut self, step: MatchStep, pending: PendingMatch, input: &str) -> (Step, Turn) {
        if input.is_empty() {
            let turn = self.empty(step.question()).with_options(self.options_for(&pending));
            return (Self::confirm_step(step, pending), turn);
        }

        match input::parse_selection(input, &pending.candidates, &self.matcher) {
            Selection::Chosen(i) => {
                let category = pending.candidates[i].name().to_string();
                self.record.record(Answer::resolved(
                    step.question(),
                    pending.raw_text.as_str(),
                    category.as_str(),
                ));
                let name = self.record.participant_name.as_str();
                let (event, next) = match step {
                    MatchStep::Sector => (
                        PromptEvent::SectorConfirmed {
                            name,
                            sector: &category,
                        },
                        Step::AskChallenge,
                    ),
                    MatchStep::Challenge => (
                        PromptEvent::ChallengeConfirmed {
                            name,
                            challenge: &category,
                        },
                        Step::AskPlanningScore,
                    ),
                };
                (next, Turn::say(self.render(event)))
            }
            Selection::Rejected => {
                let name = self.record.participant_name.as_str();
                let turn = Turn::say(self.render(PromptEvent::Rejected { step, name }));
                (Self::ask_step(step), turn)
            }
            Selection::Unclear => {
                let name = self.record.participant_name.as_str();
                let options = pending.names();
                let messages = if options.len() == 1 {
                    self.render(PromptEvent::YesNoExpected {
                        step,
                        name,
                        category: &options[0],
                    })
                } else {
                    self.render(PromptEvent::InvalidSelection {
                        step,
                        name,
                        options: &options,
                    })
                };
                let turn = Turn::reject(
                    TurnError::InvalidSelection {
                        available: options.len(),
                    },
                    messages,
                )
                .with_options(self.options_for(&pending));
                (Self::confirm_step(step, pending), turn)
            }
        }
    }

    fn options_for(&self, pending: &PendingMatch) -> Vec<String> {
        if pending.candidates.len() > 1 {
            pending.names()
        } else {
            Vec::new()
        }
    }

    fn on_score(&mut self, input: &str) -> (Step, Turn) {
        if input.is_empty() {
            return (Step::AskPlanningScore, self.empty(QuestionId::PlanningScore));
        }
        match input::parse_score(input) {
            Ok(score) => {
                self.record.planning_score = Some(score);
                self.record
                    .record(Answer::text(QuestionId::PlanningScore, input));
                let turn = Turn::say(self.render(PromptEvent::DetailPrompt {
                    name: &self.record.participant_name,
                    stage: PlanningStage::from_score(score),
                    max_chars: self.limits.detail_max_chars,
                }));
                (Step::AskDetailFollowUp, turn)
            }
            Err(err) => (
                Step::AskPlanningScore,
                Turn::reject(err, self.render(PromptEvent::ScoreOutOfRange)),
            ),
        }
    }

    fn on_detail(&mut self, input: &str) -> (Step, Turn) {
        let question = QuestionId::DetailFollowUp;
        if input.is_empty() {
            return (Step::AskDetailFollowUp, self.empty(question));
        }
        if let Some(turn) = self.check_length(question, input, self.limits.detail_max_chars) {
            return (Step::AskDetailFollowUp, turn);
        }

        let stage = self.record.planning_stage();
        let fields = &mut self.record.free_text_fields;
        match stage {
            Some(PlanningStage::Execution) => {
                let parts = input::segment_execution_answer(input);
                fields.insert(FIELD_CHALLENGE_DETAIL.to_string(), parts.detail);
                fields.insert(FIELD_RESOLUTION_PLAN.to_string(), parts.resolution_plan);
                fields.insert(FIELD_TIMELINE.to_string(), parts.timeline);
            }
            _ => {
                fields.insert(FIELD_CHALLENGE_DETAIL.to_string(), input.to_string());
            }
        }
        self.record.record(Answer::text(question, input));

        let turn = Turn::say(self.render(PromptEvent::InsightsPrompt {
            name: &self.record.participant_name,
        }));
        (Step::AskAdditionalInsights, turn)
    }

    fn on_insights(&mut self, input: &str) -> (Step, Turn) {
        let question = QuestionId::AdditionalInsights;
        if let Some(turn) = self.check_length(question, input, self.limits.insights_max_chars) {
            return (Step::AskAdditionalInsights, turn);
        }

        self.record
            .free_text_fields
            .insert(FIELD_ADDITIONAL_INSIGHTS.to_string(), input.to_string());
        self.record.record(Answer::text(question, input));

        let turn = Turn::say(self.render(PromptEvent::Closing {
            name: &self.record.participant_name,
        }));
        (Step::Closing, turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> Conversation {
        Survey::with_defaults().unwrap().start().0
    }

    fn at_score() -> Conversation {
        let mut c = start();
        c.handle("Jo");
        c.handle("Healthcare");
        c.handle("yes");
        c.handle("Regulatory priorities");
        c.handle("yes");
        assert_eq!(c.step(), &Step::AskPlanningScore);
        c
    }

    #[test]
    fn test_opening_is_welcome() {
        let (convo, reply) = Survey::with_defaults().unwrap().start();
        assert_eq!(reply.step, StepKind::Greeting);
        assert!(!reply.complete);
        assert!(reply.messages.last().unwrap().contains("your name"));
        assert_eq!(convo.step(), &Step::Greeting);
    }

    #[test]
    fn test_blank_name_is_empty_input() {
        let mut c = start();
        let reply = c.handle("   ");
        assert_eq!(reply.error, Some(TurnError::EmptyInput));
        assert_eq!(c.step(), &Step::Greeting);
        assert!(!reply.messages.is_empty());
    }

    #[test]
    fn test_name_too_long_rejected() {
        let mut c = start();
        let reply = c.handle(&"n".repeat(101));
        assert!(matches!(reply.error, Some(TurnError::OutOfRange { .. })));
        assert_eq!(c.step(), &Step::Greeting);
        assert!(c.record().participant_name.is_empty());

        let reply = c.handle(&"n".repeat(100));
        assert!(reply.error.is_none());
        assert_eq!(c.step(), &Step::AskSector);
    }

    #[test]
    fn test_blank_input_at_confirm_keeps_candidates() {
        let mut c = start();
        c.handle("Jo");
        c.handle("billing");
        let before = c.step().clone();
        let reply = c.handle("   ");
        assert_eq!(reply.error, Some(TurnError::EmptyInput));
        assert_eq!(reply.step, StepKind::ConfirmSector);
        assert_eq!(reply.options.len(), 2);
        assert_eq!(c.step(), &before);
    }

    #[test]
    fn test_exact_name_offers_single_confirmation() {
        let mut c = start();
        c.handle("Jo");
        let reply = c.handle("financial services");
        assert_eq!(reply.step, StepKind::ConfirmSector);
        assert!(reply.options.is_empty());
        assert!(reply.messages[0].contains("Financial Services, correct?"));
    }

    #[test]
    fn test_rejection_returns_to_ask_with_nothing_recorded() {
        let mut c = start();
        c.handle("Jo");
        c.handle("Healthcare");
        let reply = c.handle("no");
        assert!(reply.error.is_none());
        assert_eq!(c.step(), &Step::AskSector);
        assert!(c.record().answer(QuestionId::Sector).is_none());
    }

    #[test]
    fn test_invalid_selection_keeps_candidates() {
        let mut c = start();
        c.handle("Jo");
        c.handle("billing");
        let before = c.step().clone();
        let reply = c.handle("7");
        assert_eq!(reply.error, Some(TurnError::InvalidSelection { available: 2 }));
        assert_eq!(reply.options.len(), 2);
        assert_eq!(c.step(), &before);
    }

    #[test]
    fn test_unclear_single_confirmation_asks_yes_or_no() {
        let mut c = start();
        c.handle("Jo");
        c.handle("Healthcare");
        let reply = c.handle("perhaps");
        assert_eq!(reply.error, Some(TurnError::InvalidSelection { available: 1 }));
        assert_eq!(reply.step, StepKind::ConfirmSector);
    }

    #[test]
    fn test_candidate_list_capped() {
        let mut c = start();
        c.handle("Jo");
        let reply = c.handle("billing and insurance and tax and debt and water");
        assert_eq!(reply.options.len(), 3);
        assert_eq!(reply.options[0].number, 1);
    }

    #[test]
    fn test_score_boundaries_route_follow_up() {
        let mut planning = at_score();
        let reply = planning.handle("4");
        assert!(reply.messages[0].contains("in more detail"));

        let mut execution = at_score();
        let reply = execution.handle("5");
        assert!(reply.messages[0].contains("resolution plan"));
    }

    #[test]
    fn test_out_of_range_scores_rejected() {
        let mut c = at_score();
        for bad in ["11", "-1", "ten"] {
            let reply = c.handle(bad);
            assert!(matches!(reply.error, Some(TurnError::OutOfRange { .. })));
            assert_eq!(c.step(), &Step::AskPlanningScore);
        }
        assert!(c.record().planning_score.is_none());
    }

    #[test]
    fn test_detail_too_long_rejected_not_truncated() {
        let mut c = at_score();
        c.handle("2");
        let long = "x".repeat(501);
        let reply = c.handle(&long);
        assert!(matches!(reply.error, Some(TurnError::OutOfRange { .. })));
        assert_eq!(c.step(), &Step::AskDetailFollowUp);
        assert!(c.record().free_text(FIELD_CHALLENGE_DETAIL).is_none());
    }

    #[test]
    fn test_insights_too_long_rejected() {
        let mut c = at_score();
        c.handle("3");
        c.handle("We are still scoping the audit trail.");
        let reply = c.handle(&"i".repeat(501));
        assert!(matches!(reply.error, Some(TurnError::OutOfRange { .. })));
        assert!(!reply.complete);
        assert_eq!(c.step(), &Step::AskAdditionalInsights);
        assert!(c.record().free_text(FIELD_ADDITIONAL_INSIGHTS).is_none());
        assert!(c.export().is_err());

        let reply = c.handle(&"i".repeat(500));
        assert!(reply.complete);
    }

    #[test]
    fn test_finalize_only_when_closed() {
        let mut c = at_score();
        assert!(c.finalize().is_err());
        assert!(matches!(
            c.export(),
            Err(ConferenceBotError::SessionIncomplete { .. })
        ));
        c.handle("3");
        c.handle("We are still scoping the audit trail.");
        let reply = c.handle("");
        assert!(reply.complete);
        let record = c.finalize().unwrap();
        assert_eq!(record.free_text(FIELD_ADDITIONAL_INSIGHTS), Some(""));
        assert!(c.export().unwrap().resolution_plan.is_none());
    }

    #[test]
    fn test_input_after_closing_is_refused() {
        let mut c = at_score();
        c.handle("3");
        c.handle("detail");
        c.handle("nothing else");
        let snapshot = c.record().clone();
        let reply = c.handle("one more thing");
        assert_eq!(reply.error, Some(TurnError::ConversationClosed));
        assert!(reply.complete);
        assert_eq!(c.record(), &snapshot);
    }
}
