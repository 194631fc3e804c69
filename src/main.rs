//! ticket-agent CLI binary entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::{fmt, EnvFilter};

use ticket_agent::agent_loop::{
    ConversationController, FinalAnswerPolicy, LoopEventEnvelope, StdinInput,
};
use ticket_agent::cli::{
    jira_opening_state, render_execution_event, render_loop_event, Cli, Commands, FetchArgs, JiraArgs,
};
use ticket_agent::config::AgentConfig;
use ticket_agent::error::Result;
use ticket_agent::executor::{ExecutionEvent, ToolExecutor};
use ticket_agent::provider::create_chat_model;
use ticket_agent::stop::CompletionSignature;
use ticket_agent::tools::builtin::{fetch_data_tool, jira_tools, HttpDataSource, CREATE_JIRA_TICKET};
use ticket_agent::tools::ToolContext;
use ticket_agent::types::ModelSettings;

const JIRA_SYSTEM_PROMPT: &str = "\
You are a Jira assistant. Help the user file a well-formed Jira issue.
- Collect enough detail to call 'create_jira_ticket': project key, summary, description and issue type.
- After every change, show the user the current issue so they can correct it.
- Use 'update_issue' to record changes. Only call 'create_jira_ticket' once the user confirms the issue.";

const USER_PROMPT: &str = "\nWhat would you like me to do?\n> ";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ticket_agent=info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        eprintln!("Hint: {}", e.recovery_suggestion().hint());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AgentConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Jira(args) => handle_jira(config, args).await,
        Commands::Fetch(args) => handle_fetch(config, args).await,
    }
}

async fn handle_jira(mut config: AgentConfig, args: JiraArgs) -> Result<()> {
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    let model = create_chat_model(&config)?;

    let sink = Arc::new(|envelope: LoopEventEnvelope| {
        if let Some(line) = render_loop_event(&envelope) {
            println!("{line}");
        }
    });

    let controller = ConversationController::new(Arc::from(model), jira_tools(&config))
        .with_executor(ToolExecutor::new(config.execution_policy()))
        .with_system_prompt(JIRA_SYSTEM_PROMPT)
        .with_settings(ModelSettings {
            temperature: args.temperature,
            ..ModelSettings::default()
        })
        .with_predicate(CompletionSignature::default().for_tools([CREATE_JIRA_TICKET]))
        .with_final_answer_policy(FinalAnswerPolicy::AwaitUser)
        .with_max_iterations(config.max_iterations)
        .with_input(StdinInput::new().with_prompt(USER_PROMPT))
        .with_event_sink(sink);

    println!("\n===== JIRA ASSISTANT =====");
    let outcome = controller.run(jira_opening_state()).await;
    if let Some(reason) = outcome.reason() {
        tracing::info!(%reason, iterations = outcome.iterations, "session ended");
    }
    if !outcome.state.draft().is_empty() {
        println!("\nLast issue draft:\n{}", outcome.state.draft().content);
    }
    println!("\n===== JIRA ASSISTANT FINISHED =====");

    outcome.into_result()?;
    Ok(())
}

async fn handle_fetch(config: AgentConfig, args: FetchArgs) -> Result<()> {
    let mut policy = config.execution_policy();
    if let Some(retries) = args.retries {
        policy.retry_budget = retries;
    }
    if let Some(secs) = args.timeout_secs {
        policy.timeout = Duration::from_secs(secs);
    }

    let tool = fetch_data_tool(Arc::new(HttpDataSource::new(config.data_api_key.clone())));
    let executor = ToolExecutor::new(policy);
    let arguments = serde_json::json!({ "query": args.query, "api_url": args.api_url });

    if args.stream {
        let events = executor.stream(tool, arguments, ToolContext::default());
        futures::pin_mut!(events);
        let mut failed = None;
        while let Some(event) = events.next().await {
            println!("{}", render_execution_event(&event));
            if let ExecutionEvent::Finished(Err(err)) = event {
                failed = Some(err);
            }
        }
        if let Some(err) = failed {
            return Err(err.into());
        }
        return Ok(());
    }

    let output = executor.run(&tool, &arguments, ToolContext::default()).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
