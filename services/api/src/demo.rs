use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::infra::{build_advisor, build_catalog, Advisor};
use card_advisor::advisor::{
    format_rupees, CardEvaluation, ChatMessage, ComparisonView, CreditScoreBand,
    RecommendationRequest, RecommendationResults, SessionStage, SessionView, Speaker,
    SpendingCategory, StartSession, UserProfile,
};
use card_advisor::config::CatalogConfig;
use card_advisor::error::AppError;
use chrono::Local;
use clap::Args;

const DEMO_ANSWERS: [&str; 7] = [
    "₹50,000",
    "4000",
    "2000",
    "3500",
    "2500",
    "Cashback on all purchases",
    "Good (700-749)",
];

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Approximate monthly income in rupees
    #[arg(long)]
    pub(crate) income: Option<f64>,
    /// Monthly fuel spend
    #[arg(long)]
    pub(crate) fuel: Option<f64>,
    /// Monthly travel spend
    #[arg(long)]
    pub(crate) travel: Option<f64>,
    /// Monthly grocery spend
    #[arg(long)]
    pub(crate) groceries: Option<f64>,
    /// Monthly dining spend
    #[arg(long)]
    pub(crate) dining: Option<f64>,
    /// Monthly shopping spend
    #[arg(long)]
    pub(crate) shopping: Option<f64>,
    /// Preferred benefit, e.g. "Airport lounge access" (repeatable)
    #[arg(long = "benefit")]
    pub(crate) benefits: Vec<String>,
    /// Credit score band, e.g. "good" or "Excellent (750+)"
    #[arg(long, value_parser = parse_credit_score)]
    pub(crate) credit_score: Option<CreditScoreBand>,
    /// Catalog file (.json or .csv). Defaults to the bundled sample catalog.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Print the per-card score breakdown, including cards below the income gate
    #[arg(long)]
    pub(crate) explain: bool,
    /// Emit the results as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ChatArgs {
    /// Catalog file (.json or .csv). Defaults to the bundled sample catalog.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Record the finished run for this user
    #[arg(long)]
    pub(crate) user_id: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Catalog file (.json or .csv). Defaults to the bundled sample catalog.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Skip the side-by-side comparison of the top two cards.
    #[arg(long)]
    pub(crate) skip_comparison: bool,
}

fn parse_credit_score(raw: &str) -> Result<CreditScoreBand, String> {
    CreditScoreBand::parse_loose(raw).ok_or_else(|| "credit score must not be empty".to_string())
}

fn advisor_for(catalog: Option<PathBuf>) -> Result<Advisor, AppError> {
    let catalog = build_catalog(&CatalogConfig { path: catalog })?;
    let (advisor, _) = build_advisor(catalog, None);
    Ok(advisor)
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let spending = [
        (SpendingCategory::Fuel, args.fuel),
        (SpendingCategory::Travel, args.travel),
        (SpendingCategory::Groceries, args.groceries),
        (SpendingCategory::Dining, args.dining),
        (SpendingCategory::Shopping, args.shopping),
    ];
    let profile = spending.into_iter().fold(
        UserProfile::default()
            .with_monthly_income(args.income)
            .with_preferred_benefits(args.benefits)
            .with_credit_score(args.credit_score),
        |profile, (category, amount)| profile.with_spending(category, amount),
    );

    let advisor = advisor_for(args.catalog)?;
    let results = advisor.recommend(RecommendationRequest {
        user_id: None,
        profile: profile.clone(),
    })?;

    if args.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Results unavailable as JSON: {err}"),
        }
    } else {
        render_results(&results);
    }

    if args.explain {
        let evaluations = advisor.explain(&profile)?;
        render_explanation(&evaluations);
    }

    Ok(())
}

pub(crate) async fn run_chat(args: ChatArgs) -> Result<(), AppError> {
    let advisor = advisor_for(args.catalog)?;
    let view = advisor.start_session(StartSession {
        user_id: args.user_id,
        ..StartSession::default()
    })?;
    let id = view.session_id.clone();
    print_bot_messages(&view.messages);
    prompt_marker();

    let mut seen = view.messages.len();
    for line in io::stdin().lock().lines() {
        let line = line?;
        let view = match advisor.handle_message(&id, &line).await {
            Ok(view) => view,
            Err(err) => {
                println!("  ({err})");
                prompt_marker();
                continue;
            }
        };

        print_bot_messages(&view.messages[seen..]);
        seen = view.messages.len();

        if view.stage != SessionStage::Chat {
            if let Some(results) = &view.results {
                println!();
                render_results(results);
            }
            return Ok(());
        }
        prompt_marker();
    }

    println!("\nQuestionnaire ended before all questions were answered.");
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog,
        skip_comparison,
    } = args;

    let catalog = build_catalog(&CatalogConfig { path: catalog })?;
    let (advisor, sink) = build_advisor(catalog, None);

    println!("Card advisor demo ({})", Local::now().format("%Y-%m-%d %H:%M"));
    let mut view = advisor.start_session(StartSession {
        user_id: Some("demo-user".to_string()),
        ..StartSession::default()
    })?;
    let id = view.session_id.clone();

    for answer in DEMO_ANSWERS {
        if let Some(question) = last_bot_message(&view) {
            println!("\nQ: {}", question.content);
        }
        println!("A: {answer}");
        view = advisor.handle_message(&id, answer).await?;
    }

    let Some(results) = view.results.clone() else {
        println!("\nQuestionnaire did not produce results.");
        return Ok(());
    };
    println!();
    render_results(&results);

    let recorded = sink.records();
    println!("\nRecorded runs: {}", recorded.len());

    if skip_comparison {
        return Ok(());
    }

    let top_two: Vec<_> = results.card_ids().into_iter().take(2).collect();
    match advisor.compare(&id, &top_two) {
        Ok(view) => {
            if let Some(comparison) = &view.comparison {
                println!();
                render_comparison(comparison);
            }
        }
        Err(err) => println!("\nComparison unavailable: {err}"),
    }

    Ok(())
}

fn last_bot_message(view: &SessionView) -> Option<&ChatMessage> {
    view.messages
        .iter()
        .rev()
        .find(|message| message.speaker == Speaker::Bot)
}

fn print_bot_messages(messages: &[ChatMessage]) {
    for message in messages.iter().filter(|m| m.speaker == Speaker::Bot) {
        println!("{}", message.content);
        for (index, option) in message.options.iter().enumerate() {
            println!("  {}. {option}", index + 1);
        }
    }
}

fn prompt_marker() {
    print!("> ");
    io::stdout().flush().ok();
}

pub(crate) fn render_results(results: &RecommendationResults) {
    if let Some(message) = &results.empty_state {
        println!("{message}");
        return;
    }

    println!(
        "Top {} recommendations (estimated annual rewards {})",
        results.recommendations.len(),
        format_rupees(results.estimated_annual_rewards as f64)
    );
    for entry in &results.recommendations {
        let marker = if entry.top_pick { " - top pick" } else { "" };
        println!(
            "{}. {} by {} (score {}){marker}",
            entry.rank, entry.card.name, entry.card.issuer, entry.score
        );
        println!(
            "   Annual fee: {} | {} ({})",
            entry.annual_fee_label, entry.card.reward_type, entry.card.reward_rate
        );
        if !entry.perk_preview.is_empty() {
            let more = if entry.more_perks > 0 {
                format!(" +{} more", entry.more_perks)
            } else {
                String::new()
            };
            println!("   Perks: {}{more}", entry.perk_preview.join(", "));
        }
    }

    if let Some(first) = results.recommendations.first() {
        println!("Why these cards:");
        for highlight in &first.highlights {
            println!("  - {highlight}");
        }
    }
}

pub(crate) fn render_comparison(view: &ComparisonView) {
    let names: Vec<&str> = view.cards.iter().map(|card| card.name.as_str()).collect();
    println!("Comparing {}", names.join(" vs "));
    for row in &view.rows {
        println!("  {:<12} {}", row.label, row.values.join(" | "));
    }
    for card in &view.cards {
        println!("  {}: {}", card.name, card.perks.join(", "));
        println!("    Apply: {}", card.apply_link);
    }
    println!("{}", view.disclaimer);
}

fn render_explanation(evaluations: &[CardEvaluation]) {
    println!("\nScore breakdown:");
    for evaluation in evaluations {
        if !evaluation.eligibility.is_eligible() {
            println!("- {}: 0 (below minimum income)", evaluation.card_id);
            continue;
        }
        println!("- {}: {}", evaluation.card_id, evaluation.score);
        for component in &evaluation.components {
            println!(
                "    {:?} +{} ({})",
                component.award, component.points, component.notes
            );
        }
    }
}
