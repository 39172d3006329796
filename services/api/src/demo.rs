use crate::infra::{in_memory_store, parse_choice};
use clap::Args;
use lead_funnel::config::FunnelConfig;
use lead_funnel::error::AppError;
use lead_funnel::workflows::registration::{
    score_draft, AdvanceOutcome, AdvanceReport, ClientContext, CompanySize, FormFlow,
    MasterclassFlow, MemoryRecordStore, RegistrationDraft, RegistrationInput,
    RegistrationService, RoleType, TechnicalLevel, Tool,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Registrant name
    #[arg(long, default_value = "Ada Lovelace")]
    pub(crate) name: String,
    /// Registrant email
    #[arg(long, default_value = "ada@example.com")]
    pub(crate) email: String,
    /// student, professional, career_changer or entrepreneur
    #[arg(long, value_parser = parse_choice::<RoleType>, default_value = "professional")]
    pub(crate) role: RoleType,
    /// non_technical, beginner, intermediate or advanced
    #[arg(long, value_parser = parse_choice::<TechnicalLevel>, default_value = "non_technical")]
    pub(crate) technical_level: TechnicalLevel,
    /// Tool currently in use, by catalog label (repeatable)
    #[arg(long = "tool", value_parser = parse_tool)]
    pub(crate) tools: Vec<Tool>,
    /// solo, small, medium or large
    #[arg(long, value_parser = parse_choice::<CompanySize>)]
    pub(crate) company_size: Option<CompanySize>,
    /// Free-text answer to the biggest data challenge question
    #[arg(long)]
    pub(crate) challenge: Option<String>,
    /// Free-text answer to the learning goal question
    #[arg(long)]
    pub(crate) goal: Option<String>,
    /// utm_source to attach to the simulated landing page
    #[arg(long)]
    pub(crate) utm_source: Option<String>,
    /// Register a second time with the same email to show the duplicate path
    #[arg(long)]
    pub(crate) resubmit: bool,
}

fn parse_tool(raw: &str) -> Result<Tool, String> {
    Tool::catalog()
        .into_iter()
        .find(|tool| tool.label().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| {
            let known: Vec<&str> = Tool::catalog().iter().map(|tool| tool.label()).collect();
            format!("unknown tool '{raw}' (expected one of: {})", known.join(", "))
        })
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let funnel = FunnelConfig::default();
    let store = Arc::new(in_memory_store(&funnel));
    let service = RegistrationService::new(
        Arc::new(MasterclassFlow::from_config(&funnel)),
        store.clone(),
        funnel.session_ttl,
    );

    let page_url = match &args.utm_source {
        Some(source) => format!("/masterclass?utm_source={source}"),
        None => "/masterclass".to_string(),
    };
    let context = ClientContext {
        page_url: Some(page_url),
        referrer: None,
        user_agent: None,
    }
    .with_user_agent(Some("lead-funnel-demo".to_string()));

    println!("Masterclass registration demo (event {})", funnel.event_date);
    let report = register(&service, &answers(&args), &context).await?;
    render_outcome(&report);
    render_score(&report.session.draft);
    if let Some(row) = store.rows(service.flow().collection()).last() {
        let pretty = serde_json::to_string_pretty(row).unwrap_or_else(|_| row.to_string());
        println!("\nStored row\n{pretty}");
    }

    if args.resubmit {
        println!("\nSecond registration with the same email");
        let report = register(&service, &answers(&args), &context).await?;
        render_outcome(&report);
    }

    Ok(())
}

fn answers(args: &DemoArgs) -> Vec<RegistrationInput> {
    let mut inputs = vec![
        RegistrationInput::Name(args.name.clone()),
        RegistrationInput::Email(args.email.clone()),
        RegistrationInput::RoleType(args.role),
        RegistrationInput::TechnicalLevel(args.technical_level),
        RegistrationInput::CompanySize(args.company_size),
    ];
    inputs.extend(args.tools.iter().copied().map(RegistrationInput::ToggleTool));
    if let Some(challenge) = &args.challenge {
        inputs.push(RegistrationInput::BiggestChallenge(challenge.clone()));
    }
    if let Some(goal) = &args.goal {
        inputs.push(RegistrationInput::LearningGoal(goal.clone()));
    }
    inputs
}

async fn register(
    service: &RegistrationService<MasterclassFlow, MemoryRecordStore>,
    inputs: &[RegistrationInput],
    context: &ClientContext,
) -> Result<AdvanceReport<RegistrationDraft>, AppError> {
    let view = service.open(Default::default());
    let id = view.session_id;
    for input in inputs {
        service.apply(id, input.clone())?;
    }

    let mut step = view.step;
    loop {
        println!("  [{}] {}", step.key, step.question);
        let report = service.advance(id, context).await?;
        if report.outcome != AdvanceOutcome::Moved {
            return Ok(report);
        }
        step = report.session.step;
    }
}

fn render_outcome(report: &AdvanceReport<RegistrationDraft>) {
    match report.outcome {
        AdvanceOutcome::Submitted => println!(
            "Registered {} (lead score {})",
            report.session.draft.email,
            report.lead_score.unwrap_or_default()
        ),
        _ => println!(
            "Not registered ({:?}): {}",
            report.outcome,
            report
                .session
                .message
                .as_ref()
                .map(|message| message.text.as_str())
                .unwrap_or("no message")
        ),
    }
}

fn render_score(draft: &RegistrationDraft) {
    let score = score_draft(draft);
    println!("\nLead score breakdown ({} raw, {} stored)", score.raw_total(), score.total);
    for component in &score.components {
        println!("- {:?}: +{} ({})", component.factor, component.score, component.notes);
    }
}
