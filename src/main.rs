use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use local_ai_chat::client::GenerationClient;
use local_ai_chat::config::Config;
use local_ai_chat::models::ConversationId;
use local_ai_chat::registry;
use local_ai_chat::session::{SessionController, SessionEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_ai_chat=info".into()),
        )
        .init();

    let config = Config::from_env();
    info!("chat session targeting {} (default model {})", config.base_url, config.default_model);

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let backend = Arc::new(GenerationClient::new(&config));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(backend, config.default_model.clone(), events_tx);

    // First launch: open a conversation so the user can type right away.
    if controller.state().conversations.is_empty() {
        controller.new_chat();
    }

    println!("Connected to {}. Type a message, or /help for commands.", config.base_url);

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_line(&mut controller, line.trim()) {
                            break;
                        }
                    }
                    None => break, // stdin closed
                }
            }
            Some(event) = events_rx.recv() => {
                render_event(&event, &controller);
                controller.apply(event);
            }
        }
    }

    Ok(())
}

/// Dispatch one input line. Returns false when the session should end.
fn handle_line(controller: &mut SessionController, line: &str) -> bool {
    match line {
        "" => {}
        "/quit" | "/exit" => return false,
        "/help" => print_help(),
        "/new" => {
            controller.new_chat();
            println!("(new conversation)");
        }
        "/list" => print_conversations(controller),
        "/models" => print_models(controller),
        _ if line.starts_with("/open") => open_conversation(controller, line),
        _ if line.starts_with("/model") => change_model(controller, line),
        _ if line.starts_with('/') => println!("Unknown command {line}. Try /help."),
        message => {
            if controller.send(message).is_none() {
                println!("Open a conversation first (/new).");
            }
        }
    }
    true
}

/// Print a resolution before it is folded into the state. Stale resolutions
/// are skipped here the same way `apply` skips them.
fn render_event(event: &SessionEvent, controller: &SessionController) {
    match event {
        SessionEvent::GenerationFinished { token, result, .. }
            if controller.inflight_token() == Some(*token) =>
        {
            match result {
                Ok(text) => println!("\n{text}\n"),
                Err(e) if e.is_cancelled() => println!("({e})"),
                Err(e) => println!("Error: {e}"),
            }
        }
        SessionEvent::TitleResolved { result: Ok(title), .. } => {
            println!("(conversation titled: {title})");
        }
        _ => {}
    }
}

fn open_conversation(controller: &mut SessionController, line: &str) {
    let arg = line.strip_prefix("/open").map(str::trim).unwrap_or("");
    match arg.parse::<ConversationId>() {
        Ok(id) => match controller.switch_conversation(id) {
            Ok(()) => print_history(controller),
            Err(e) => println!("{e}"),
        },
        Err(_) => println!("Usage: /open <conversation-id> (see /list)"),
    }
}

fn change_model(controller: &mut SessionController, line: &str) {
    let arg = line.strip_prefix("/model").map(str::trim).unwrap_or("");
    if arg.is_empty() {
        print_models(controller);
        return;
    }
    if controller.state().current_conversation_id.is_none() {
        println!("Open a conversation first (/new).");
        return;
    }
    controller.change_model(arg);
    match registry::find_model(arg) {
        Some(model) => {
            println!(
                "Model set to {} ({}, {} context).",
                model.name, model.description, model.context_length
            );
        }
        None => {
            println!("Model set to {arg}. Not in the built-in list; the service may reject it.");
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /new           start a new conversation");
    println!("  /list          list conversations");
    println!("  /open <id>     switch to a conversation");
    println!("  /model [id]    change the current conversation's model (no id: list models)");
    println!("  /quit          exit");
    println!("Anything else is sent to the model.");
}

fn print_conversations(controller: &SessionController) {
    let state = controller.state();
    if state.conversations.is_empty() {
        println!("No conversations yet. /new starts one.");
        return;
    }
    for conversation in &state.conversations {
        let current = Some(conversation.id) == state.current_conversation_id;
        let marker = if current { "*" } else { " " };
        println!(
            "{marker} {}  {}  [{}] {} message(s), updated {}",
            conversation.id,
            conversation.title,
            conversation.model,
            conversation.messages.len(),
            conversation.updated_at.format("%H:%M:%S"),
        );
    }
}

fn print_models(controller: &SessionController) {
    let current = controller.state().current_conversation().map(|c| c.model.clone());
    for model in registry::available_models() {
        let marker = if current.as_deref() == Some(model.id) { "*" } else { " " };
        println!(
            "{marker} {}  {}: {} ({} context)",
            model.id, model.name, model.description, model.context_length
        );
    }
}

fn print_history(controller: &SessionController) {
    if let Some(conversation) = controller.state().current_conversation() {
        println!("{} [{}]", conversation.title, conversation.model);
        for message in &conversation.messages {
            println!("{}: {}", message.role, message.content);
        }
    }
}
