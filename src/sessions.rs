//! Session record: the answers one conversation accumulates, and the flat
//! export shape produced once the conversation has closed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scores at or below this value are still in preparation and planning.
pub const PLANNING_MAX: u8 = 4;
/// Highest accepted planning score.
pub const SCORE_MAX: u8 = 10;

pub const FIELD_CHALLENGE_DETAIL: &str = "challengeDetail";
pub const FIELD_RESOLUTION_PLAN: &str = "resolutionPlan";
pub const FIELD_TIMELINE: &str = "timeline";
pub const FIELD_ADDITIONAL_INSIGHTS: &str = "additionalInsights";

/// Question steps in the order they are asked. Ord follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    Name,
    Sector,
    Challenge,
    PlanningScore,
    DetailFollowUp,
    AdditionalInsights,
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionId::Name => "name",
            QuestionId::Sector => "sector",
            QuestionId::Challenge => "challenge",
            QuestionId::PlanningScore => "planning_score",
            QuestionId::DetailFollowUp => "detail_follow_up",
            QuestionId::AdditionalInsights => "additional_insights",
        };
        f.write_str(s)
    }
}

/// Which follow-up a planning score routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStage {
    Planning,
    Execution,
}

impl PlanningStage {
    pub fn from_score(score: u8) -> Self {
        if score <= PLANNING_MAX {
            PlanningStage::Planning
        } else {
            PlanningStage::Execution
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanningStage::Planning => "Preparation and Planning",
            PlanningStage::Execution => "Execution",
        }
    }
}

/// One recorded answer. `resolved_category` is only ever set together with
/// `confirmed = true`; construct through [`Answer::text`] or [`Answer::resolved`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub raw_text: String,
    resolved_category: Option<String>,
    confirmed: bool,
}

impl Answer {
    /// A plain answer that needs no category resolution.
    pub fn text(question_id: QuestionId, raw_text: impl Into<String>) -> Self {
        Self {
            question_id,
            raw_text: raw_text.into(),
            resolved_category: None,
            confirmed: false,
        }
    }

    /// A matching-step answer the participant has confirmed.
    pub fn resolved(
        question_id: QuestionId,
        raw_text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            question_id,
            raw_text: raw_text.into(),
            resolved_category: Some(category.into()),
            confirmed: true,
        }
    }

    pub fn resolved_category(&self) -> Option<&str> {
        self.resolved_category.as_deref()
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }
}

/// Everything captured during one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub participant_name: String,
    pub answers: BTreeMap<QuestionId, Answer>,
    pub planning_score: Option<u8>,
    pub free_text_fields: BTreeMap<String, String>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, answer: Answer) {
        self.answers.insert(answer.question_id, answer);
    }

    pub fn answer(&self, id: QuestionId) -> Option<&Answer> {
        self.answers.get(&id)
    }

    pub fn sector(&self) -> Option<&str> {
        self.answer(QuestionId::Sector)
            .and_then(|a| a.resolved_category())
    }

    pub fn challenge(&self) -> Option<&str> {
        self.answer(QuestionId::Challenge)
            .and_then(|a| a.resolved_category())
    }

    pub fn planning_stage(&self) -> Option<PlanningStage> {
        self.planning_score.map(PlanningStage::from_score)
    }

    pub fn free_text(&self, field: &str) -> Option<&str> {
        self.free_text_fields.get(field).map(String::as_str)
    }

    /// Flat export shape. Only reachable through `Conversation::export`, which
    /// refuses records that have not reached Closing.
    pub(crate) fn to_exportable(&self) -> ExportRecord {
        let score = self.planning_score.unwrap_or_default();
        let execution = PlanningStage::from_score(score) == PlanningStage::Execution;
        let field = |name: &str| self.free_text(name).unwrap_or_default().to_string();

        ExportRecord {
            participant_name: self.participant_name.clone(),
            sector: self.sector().unwrap_or_default().to_string(),
            challenge: self.challenge().unwrap_or_default().to_string(),
            planning_score: score,
            challenge_detail: field(FIELD_CHALLENGE_DETAIL),
            resolution_plan: execution.then(|| field(FIELD_RESOLUTION_PLAN)),
            timeline: execution.then(|| field(FIELD_TIMELINE)),
            additional_insights: field(FIELD_ADDITIONAL_INSIGHTS),
        }
    }

    /// Human-readable summary lines for the closing screen.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Name: {}", self.participant_name),
            format!("Sector: {}", self.sector().unwrap_or("Not provided")),
            format!("Key Challenge: {}", self.challenge().unwrap_or("Not provided")),
        ];
        match self.planning_score {
            Some(score) => lines.push(format!(
                "Scale: {}/{} ({})",
                score,
                SCORE_MAX,
                PlanningStage::from_score(score).label()
            )),
            None => lines.push("Scale: Not provided".to_string()),
        }
        lines.push(format!(
            "Planning Details: {}",
            self.free_text(FIELD_CHALLENGE_DETAIL)
                .unwrap_or("Not provided")
        ));
        lines.push(format!(
            "Additional Insights: {}",
            self.free_text(FIELD_ADDITIONAL_INSIGHTS)
                .filter(|s| !s.is_empty())
                .unwrap_or("Not provided")
        ));
        lines
    }
}

/// Flat JSON record handed to the export collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub participant_name: String,
    pub sector: String,
    pub challenge: String,
    pub planning_score: u8,
    pub challenge_detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    pub additional_insights: String,
}

pub const EXPORT_GOAL: &str = "Conference Preparation Survey";

/// Envelope written to disk or returned by the web host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub goal: String,
    pub session_id: String,
    pub completed: bool,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub data: ExportRecord,
}

impl ExportEnvelope {
    pub fn new(session_id: impl Into<String>, data: ExportRecord) -> Self {
        Self {
            goal: EXPORT_GOAL.to_string(),
            session_id: session_id.into(),
            completed: true,
            completed_at: chrono::Utc::now(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(score: u8) -> SessionRecord {
        let mut rec = SessionRecord::new();
        rec.participant_name = "Sam".into();
        rec.record(Answer::text(QuestionId::Name, "Sam"));
        rec.record(Answer::resolved(QuestionId::Sector, "we bill", "Telecommunications"));
        rec.record(Answer::resolved(QuestionId::Challenge, "carbon", "Sustainability agenda"));
        rec.planning_score = Some(score);
        rec.free_text_fields
            .insert(FIELD_CHALLENGE_DETAIL.into(), "detail".into());
        rec.free_text_fields
            .insert(FIELD_RESOLUTION_PLAN.into(), "plan".into());
        rec.free_text_fields
            .insert(FIELD_TIMELINE.into(), "6 months".into());
        rec.free_text_fields
            .insert(FIELD_ADDITIONAL_INSIGHTS.into(), String::new());
        rec
    }

    #[test]
    fn test_planning_stage_boundary() {
        assert_eq!(PlanningStage::from_score(0), PlanningStage::Planning);
        assert_eq!(PlanningStage::from_score(4), PlanningStage::Planning);
        assert_eq!(PlanningStage::from_score(5), PlanningStage::Execution);
        assert_eq!(PlanningStage::from_score(10), PlanningStage::Execution);
    }

    #[test]
    fn test_answer_resolution_implies_confirmation() {
        let plain = Answer::text(QuestionId::Name, "Sam");
        assert!(plain.resolved_category().is_none());
        assert!(!plain.confirmed());

        let resolved = Answer::resolved(QuestionId::Sector, "bank", "Financial Services");
        assert_eq!(resolved.resolved_category(), Some("Financial Services"));
        assert!(resolved.confirmed());
    }

    #[test]
    fn test_answers_iterate_in_question_order() {
        let rec = filled(7);
        let order: Vec<_> = rec.answers.keys().copied().collect();
        assert_eq!(
            order,
            vec![QuestionId::Name, QuestionId::Sector, QuestionId::Challenge]
        );
    }

    #[test]
    fn test_export_omits_plan_fields_when_planning() {
        let json = serde_json::to_value(filled(3).to_exportable()).unwrap();
        assert_eq!(json["planningScore"], 3);
        assert!(json.get("resolutionPlan").is_none());
        assert!(json.get("timeline").is_none());
        assert_eq!(json["sector"], "Telecommunications");
    }

    #[test]
    fn test_export_includes_plan_fields_when_executing() {
        let json = serde_json::to_value(filled(5).to_exportable()).unwrap();
        assert_eq!(json["resolutionPlan"], "plan");
        assert_eq!(json["timeline"], "6 months");
        assert_eq!(json["challengeDetail"], "detail");
        assert_eq!(json["additionalInsights"], "");
    }

    #[test]
    fn test_summary_lines_label_stage() {
        let lines = filled(8).summary_lines();
        assert!(lines.iter().any(|l| l == "Scale: 8/10 (Execution)"));
        assert!(lines.iter().any(|l| l == "Additional Insights: Not provided"));
    }
}
