use drafting_assistant::{
    config::AppConfig,
    memory::build_transcript_store,
    models::{Message, Presentation, UserInput},
    records::{HttpRecordStore, InMemoryRecordStore, Navigator, RecordStore},
    session::SessionFactory,
    DraftingError,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Terminal stand-in for switching dashboard views
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: &str) {
        println!("  (switching view to {})", route);
    }
}

enum Line {
    Input(UserInput),
    Quit,
    Skip,
}

fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Skip;
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => Line::Quit,
        "/menu" if rest.is_empty() => Line::Input(UserInput::Menu("menu".to_string())),
        "/menu" => Line::Input(UserInput::Menu(rest.to_string())),
        "/pick" => Line::Input(UserInput::Choice(
            rest.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        "/confirm" => Line::Input(UserInput::Confirm),
        "/cancel" => Line::Input(UserInput::Cancel),
        _ => Line::Input(UserInput::Text(line.to_string())),
    }
}

fn render(message: &Message) {
    println!("assistant> {}", message.text);

    let options = message.options();
    if options.is_empty() {
        return;
    }
    let command = match message.presentation {
        Presentation::MenuPrompt => "/menu",
        _ => "/pick",
    };
    for option in options {
        match &option.description {
            Some(description) => {
                println!("    {} {:<12} {} ({})", command, option.value, option.label, description)
            }
            None => println!("    {} {:<12} {}", command, option.value, option.label),
        }
    }
    if message.payload.get("multi").and_then(|m| m.as_bool()) == Some(true) {
        println!("    (pick several with commas, e.g. /pick Mon,Wed)");
    }
}

async fn run(factory: SessionFactory) -> Result<(), DraftingError> {
    let mut session = factory.create(Uuid::new_v4());
    for message in session.start().await {
        render(&message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Line::Quit => break,
            Line::Skip => continue,
            Line::Input(input) => {
                for message in session.handle(input).await {
                    render(&message);
                }
            }
        }
    }

    session.close();
    info!(session_id = %session.id(), "Session closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Logs go to stderr so they do not interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    let records: Arc<dyn RecordStore> = match &config.records_base_url {
        Some(url) => Arc::new(HttpRecordStore::new(url)?),
        None => Arc::new(InMemoryRecordStore::new()),
    };
    let transcripts = build_transcript_store(config.database_url.as_deref());

    let factory = SessionFactory::new(records, Arc::new(PrintNavigator), transcripts)
        .with_pacing(config.reply_delay, config.menu_delay);

    println!("Drafting assistant. Type freely, or use /menu, /pick, /confirm, /cancel, /quit.");
    run(factory).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_line("/confirm"), Line::Input(UserInput::Confirm)));
        assert!(matches!(parse_line("  "), Line::Skip));
        assert!(matches!(parse_line("/quit"), Line::Quit));

        match parse_line("/pick Mon, Wed") {
            Line::Input(UserInput::Choice(values)) => assert_eq!(values, vec!["Mon", "Wed"]),
            _ => panic!("expected a choice"),
        }
        match parse_line("/menu class") {
            Line::Input(UserInput::Menu(value)) => assert_eq!(value, "class"),
            _ => panic!("expected a menu pick"),
        }
        match parse_line("I spent $4 on coffee") {
            Line::Input(UserInput::Text(text)) => assert_eq!(text, "I spent $4 on coffee"),
            _ => panic!("expected text"),
        }
    }
}
