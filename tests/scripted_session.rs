use conference_bot::conversation::{Step, StepKind};
use conference_bot::{Conversation, ExportEnvelope, Survey, TurnError};

fn start() -> Conversation {
    Survey::with_defaults().unwrap().start().0
}

fn through_challenge(name: &str) -> Conversation {
    let mut c = start();
    c.handle(name);
    c.handle("we handle billing queries and broadband issues");
    c.handle("1");
    c.handle("automation and recruitment challenges");
    c.handle("1");
    assert_eq!(c.step(), &Step::AskPlanningScore);
    c
}

#[test]
fn test_full_session_exports_record() {
    let mut c = start();

    let reply = c.handle("Alex");
    assert!(reply.messages[0].contains("ALEX"));
    assert_eq!(reply.step, StepKind::AskSector);

    let reply = c.handle("we handle billing queries and broadband issues");
    assert_eq!(reply.step, StepKind::ConfirmSector);
    let names: Vec<_> = reply.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Telecommunications", "Utilities"]);

    let reply = c.handle("1");
    assert_eq!(reply.step, StepKind::AskChallenge);
    assert_eq!(c.record().sector(), Some("Telecommunications"));

    let reply = c.handle("automation and recruitment challenges");
    assert_eq!(reply.options[0].name, "Shifting workplace realities");
    c.handle("1");

    let reply = c.handle("7");
    assert!(reply.messages[0].contains("resolution plan"));

    c.handle("Recruitment is slow. We plan to automate screening. It will take six months.");
    let reply = c.handle("Hybrid working has changed our coaching model.");
    assert!(reply.complete);
    assert_eq!(c.step(), &Step::Closing);

    let export = c.export().unwrap();
    assert_eq!(export.participant_name, "Alex");
    assert_eq!(export.sector, "Telecommunications");
    assert_eq!(export.challenge, "Shifting workplace realities");
    assert_eq!(export.planning_score, 7);
    assert_eq!(export.challenge_detail, "Recruitment is slow.");
    assert_eq!(export.resolution_plan.as_deref(), Some("We plan to automate screening."));
    assert_eq!(export.timeline.as_deref(), Some("It will take six months."));

    let envelope = serde_json::to_value(ExportEnvelope::new("s-1", export)).unwrap();
    assert_eq!(envelope["goal"], "Conference Preparation Survey");
    assert_eq!(envelope["completed"], true);
    assert_eq!(envelope["data"]["planningScore"], 7);
    assert!(envelope["data"]["resolutionPlan"].is_string());
}

#[test]
fn test_score_boundary_four_and_five() {
    let mut c = through_challenge("Sam");
    let reply = c.handle("4");
    assert_eq!(reply.step, StepKind::AskDetailFollowUp);
    assert!(!reply.messages[0].contains("resolution plan"));

    let mut c = through_challenge("Sam");
    let reply = c.handle("5");
    assert!(reply.messages[0].contains("resolution plan"));
}

#[test]
fn test_scores_outside_range_rejected() {
    let mut c = through_challenge("Sam");
    for bad in ["11", "-1"] {
        let reply = c.handle(bad);
        assert!(matches!(reply.error, Some(TurnError::OutOfRange { .. })));
        assert_eq!(c.step(), &Step::AskPlanningScore);
    }
}

#[test]
fn test_unrecognised_sector_is_idempotent() {
    let mut c = start();
    c.handle("Alex");
    let before = c.record().clone();

    for _ in 0..2 {
        let reply = c.handle("zxqv blorp");
        assert_eq!(
            reply.error,
            Some(TurnError::NoMatch {
                registry: "sector".into()
            })
        );
        assert!(reply.messages.iter().any(|m| m.starts_with("1. Retail & E-commerce")));
        assert_eq!(c.step(), &Step::AskSector);
        assert_eq!(c.record(), &before);
    }
}

#[test]
fn test_rejected_sector_can_be_retried() {
    let mut c = start();
    c.handle("Alex");
    c.handle("Healthcare");
    c.handle("no");
    let reply = c.handle("we run a bank");
    assert_eq!(reply.step, StepKind::ConfirmSector);
    c.handle("yes");
    assert_eq!(c.record().sector(), Some("Financial Services"));
}

#[test]
fn test_export_refused_before_closing() {
    let c = through_challenge("Sam");
    assert!(c.export().is_err());
}
