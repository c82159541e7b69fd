use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Args;
use recruit_pipeline::error::AppError;
use recruit_pipeline::pipeline::{ActorId, CandidateId, JobId, PipelineEngine};
use serde_json::Value;

use crate::infra::InMemoryPipelineStore;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Actor recorded on the audit trail for every demo transition
    #[arg(long, default_value = "demo-recruiter")]
    pub(crate) actor: String,
    /// Skip the rejection branch of the demo
    #[arg(long)]
    pub(crate) skip_rejection: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryPipelineStore::default());
    let engine = PipelineEngine::new(store);
    let actor = Some(ActorId(args.actor.clone()));

    println!("Recruitment pipeline demo");

    let opened = engine.open_application(
        CandidateId("demo-candidate-1".to_string()),
        JobId("backend-engineer".to_string()),
        Some(82),
        BTreeMap::new(),
    )?;
    println!(
        "\nOpened {} for demo-candidate-1 / backend-engineer",
        opened.application.id.0
    );

    let moves = [
        ("phone_screen", "Strong CV, moving to phone screen"),
        ("onsite", "Phone screen passed"),
        ("offer", "Onsite panel voted to extend an offer"),
        ("hired", "Offer signed"),
    ];
    for (status, note) in moves {
        let updated =
            engine.transition(&opened.application.id, status, note, None, actor.clone())?;
        println!("  -> {} ({note})", updated.application.stage);
    }

    let hired = engine.application(&opened.application.id)?;
    println!(
        "Hired after {} day(s); {} history entries",
        hired.application.days_to_hire().unwrap_or_default(),
        hired.history.len()
    );

    if !args.skip_rejection {
        let second = engine.open_application(
            CandidateId("demo-candidate-2".to_string()),
            JobId("backend-engineer".to_string()),
            None,
            BTreeMap::new(),
        )?;
        engine.transition(
            &second.application.id,
            "phone_screen",
            "Screening call booked",
            None,
            actor.clone(),
        )?;
        engine.transition(
            &second.application.id,
            "rejected",
            "Not enough systems experience",
            Some("technical_skills"),
            actor.clone(),
        )?;
        println!(
            "\nRejected {} with reason technical_skills",
            second.application.id.0
        );
    }

    println!("\nAudit trail (newest first):");
    for entry in engine.audit_trail()? {
        let actor = entry
            .actor
            .map(|actor| actor.0)
            .unwrap_or_else(|| "anonymous".to_string());
        let old_status = entry
            .data
            .get("old_status")
            .and_then(Value::as_str)
            .unwrap_or("?");
        let new_status = entry
            .data
            .get("new_status")
            .and_then(Value::as_str)
            .unwrap_or("?");
        println!(
            "  {} {} {} {}:{} {} -> {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            actor,
            entry.verb,
            entry.target_type,
            entry.target_id,
            old_status,
            new_status
        );
    }

    Ok(())
}
