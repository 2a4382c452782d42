use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use pdf_chat::application::SessionManager;
use pdf_chat::domain::DomainError;
use pdf_chat::infrastructure::{init_tracing, ApiClient, JsonHistoryStore};
use pdf_chat::ui::{self, render, Command};

/// Terminal chat over PDFs served by the `api` binary.
#[derive(Parser, Debug)]
#[command(name = "chat", version, about)]
struct Args {
    /// Base URL of the question-answering service
    #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// JSON file holding conversation history
    #[arg(long, env = "CHAT_HISTORY_FILE", default_value = "chat_history.json")]
    history_file: PathBuf,

    /// Delay between streamed words of an answer, in milliseconds
    #[arg(long, default_value_t = 20)]
    stream_delay_ms: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("warn");
    let args = Args::parse();

    let backend = ApiClient::new(&args.api_url, Duration::from_secs(args.timeout_seconds))?;
    let store = JsonHistoryStore::new(&args.history_file);
    let mut manager = SessionManager::open(Arc::new(store), Arc::new(backend))?;
    let delay = Duration::from_millis(args.stream_delay_ms);

    println!("PDF chat ({}). Type /help for commands.", args.api_url);
    print_lines(&render::transcript(manager.active()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ui::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", user_message(&e));
                continue;
            }
        };

        match run(&mut manager, command, delay).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(DomainError::NoDocument) => {
                println!("No PDF is linked to this conversation. Use /upload <path> first.");
            }
            Err(e) => println!("error: {}", user_message(&e)),
        }
    }

    Ok(())
}

/// Executes one command; `Ok(false)` ends the session.
async fn run(
    manager: &mut SessionManager,
    command: Command,
    delay: Duration,
) -> Result<bool, DomainError> {
    match command {
        Command::New => {
            manager.create()?;
            println!("Started a new conversation.");
        }
        Command::List => print_lines(&render::session_list(manager.state())),
        Command::Switch(target) => {
            let id = manager.resolve(&target)?;
            manager.switch(&id)?;
            print_lines(&render::transcript(manager.active()));
        }
        Command::Delete(target) => {
            let id = match target {
                Some(target) => manager.resolve(&target)?,
                None => manager.active_id().to_string(),
            };
            let title = manager.state().sessions()[&id].title.clone();
            manager.delete(&id)?;
            println!("Deleted \"{title}\". Active: \"{}\"", manager.active().title);
        }
        Command::Upload(path) => {
            println!("Uploading {} ...", path.display());
            let doc_id = manager.upload(&path).await?;
            println!("Linked \"{}\" (document {doc_id}).", manager.active().title);
        }
        Command::Unlink => {
            manager.unlink_document()?;
            println!("Document unlinked.");
        }
        Command::Show => print_lines(&render::transcript(manager.active())),
        Command::Help => println!("{}", ui::HELP),
        Command::Quit => return Ok(false),
        Command::Ask(question) => {
            let answer = manager.ask(&question).await?;
            stream_answer(&answer.answer, delay).await?;
            print_lines(&render::sources(&answer.sources));
        }
    }
    Ok(true)
}

async fn stream_answer(text: &str, delay: Duration) -> Result<(), DomainError> {
    let mut stdout = std::io::stdout();
    let mut words = std::pin::pin!(render::word_stream(text, delay));
    while let Some(word) = words.next().await {
        stdout
            .write_all(word.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| DomainError::internal(e.to_string()))?;
    }
    println!();
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn user_message(error: &DomainError) -> String {
    match error {
        DomainError::Validation(msg) | DomainError::NotFound(msg) => msg.clone(),
        other => other.to_string(),
    }
}
