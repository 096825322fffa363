//! Interactive terminal front end: one session, line commands, and the
//! flashcard trigger after long answers.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use sahayak::agent::travel_tools::{default_registry, http_client};
use sahayak::rag::generate_flashcards;
use sahayak::{
    ApiProvider, AssistantConfig, ChatEngine, ChatRole, ExternalProvider, HostedRetriever, Session,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match std::env::var("SAHAYAK_CONFIG") {
        Ok(path) => AssistantConfig::from_file(Path::new(&path))
            .map_err(|e| anyhow::anyhow!("invalid config file {}: {}", path, e))?,
        Err(_) => AssistantConfig::default(),
    };

    // Both providers share one key; construction fails fast when it is absent.
    let api_key = std::env::var("GROQ_API_KEY").unwrap_or_default();
    let chat_provider = Arc::new(ExternalProvider::new(
        ApiProvider::Groq,
        api_key.clone(),
        config.chat.model.clone(),
    )?);
    let card_provider =
        ExternalProvider::new(ApiProvider::Groq, api_key, config.flashcards.model.clone())?;

    let google_api_key = std::env::var("GOOGLE_API_KEY").ok();
    let client = http_client()?;
    let tools = Arc::new(default_registry(client, google_api_key.clone()));

    let mut engine = ChatEngine::new(chat_provider, tools).with_config(config.engine_config());
    match build_retriever(&config, google_api_key) {
        Some(retriever) => {
            engine = engine.with_retriever(Arc::new(retriever));
            tracing::info!("document retrieval enabled");
        }
        None => tracing::info!(
            "document retrieval disabled; set GOOGLE_API_KEY, PINECONE_API_KEY and PINECONE_INDEX_HOST to enable it"
        ),
    }

    let mut session = Session::with_memory_capacity(config.memory.capacity);

    println!("\n{}", "═".repeat(60));
    println!("  📚 Sahayak - Study Assistant");
    println!("{}", "═".repeat(60));
    println!("  Ask anything. Tools and document retrieval run on their own.");
    println!("  Commands: history, clear, cards, next, prev, export, quit");
    println!("{}\n", "═".repeat(60));

    loop {
        print!("🎓 You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            println!("\n👋 Goodbye!");
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => {
                println!("👋 Goodbye!");
                break;
            }
            "clear" => {
                session.reset();
                println!("🧹 Conversation cleared!");
            }
            "history" => print_history(&session),
            "cards" => print_current_card(&session),
            "next" => {
                session.flashcards.next_card();
                print_current_card(&session);
            }
            "prev" => {
                session.flashcards.prev_card();
                print_current_card(&session);
            }
            "export" => {
                if session.flashcards.is_empty() {
                    println!("📭 No flashcards to export yet.");
                } else {
                    match session.flashcards.export(&config.flashcards.export_dir) {
                        Ok(path) => println!("💾 Flashcards saved to {}", path.display()),
                        Err(e) => println!("⚠️ Export failed: {}", e),
                    }
                }
            }
            _ => {
                let Some(answer) = engine.process_turn(&mut session, input).await else {
                    continue;
                };
                println!("🤖 Assistant:");
                println!("{}", "─".repeat(50));
                println!("{}", answer);
                println!("{}", "─".repeat(50));

                maybe_generate_flashcards(&card_provider, &config, &mut session, input, &answer)
                    .await;
            }
        }
    }

    Ok(())
}

/// Wire the hosted retriever when all three credentials are present.
/// A partial set logs a warning and leaves retrieval off.
fn build_retriever(
    config: &AssistantConfig,
    google_api_key: Option<String>,
) -> Option<HostedRetriever> {
    let embed_key = google_api_key?;
    let index_key = std::env::var("PINECONE_API_KEY").ok()?;
    let index_host = std::env::var("PINECONE_INDEX_HOST").ok()?;

    match HostedRetriever::new(embed_key, index_key, index_host) {
        Ok(retriever) => Some(retriever.with_embedding_model(
            config.retrieval.embedding_model.clone(),
            config.retrieval.embedding_dimension,
        )),
        Err(e) => {
            tracing::warn!("could not configure retrieval: {}", e);
            None
        }
    }
}

/// Generate a fresh deck when the answer is long enough to be worth studying.
/// Failures warn and leave the existing deck as it was.
async fn maybe_generate_flashcards(
    provider: &ExternalProvider,
    config: &AssistantConfig,
    session: &mut Session,
    question: &str,
    answer: &str,
) {
    if answer.trim().chars().count() < config.flashcards.min_answer_chars {
        return;
    }

    println!("📚 Creating flashcards...");
    match generate_flashcards(provider, &config.flashcard_generation(), question, answer).await {
        Ok(cards) => {
            session.flashcards.replace_all(cards);
            println!(
                "✅ Generated {} flashcards! Use 'cards' to browse them.",
                session.flashcards.len()
            );
        }
        Err(e) => println!("⚠️ Could not generate flashcards: {}", e),
    }
}

fn print_history(session: &Session) {
    let history = session.memory.history();
    if history.is_empty() {
        println!("📜 No conversation yet.");
        return;
    }

    println!("📜 Conversation ({} messages):", history.len());
    for message in history {
        let role = match message.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        };
        match (&message.content, &message.tool_calls) {
            (Some(content), _) => println!("  [{}] {}", role, content),
            (None, Some(calls)) => {
                let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
                println!("  [{}] requested tools: {}", role, names.join(", "));
            }
            (None, None) => println!("  [{}]", role),
        }
    }
}

fn print_current_card(session: &Session) {
    match session.flashcards.current() {
        Some(card) => {
            println!(
                "🃏 Card {} of {}",
                session.flashcards.position(),
                session.flashcards.len()
            );
            println!("   Front: {}", card.front);
            println!("   Back:  {}", card.back);
        }
        None => println!("📭 No flashcards yet. Longer answers generate them automatically."),
    }
}
