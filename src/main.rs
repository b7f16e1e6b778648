use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;

use pocket_assist::calendar::{EventSource, JsonCalendar, StaticCalendar};
use pocket_assist::chat::{Bubble, ChatAction, ChatEffects, ChatReducer, ChatState, ChatView};
use pocket_assist::config::AppConfig;
use pocket_assist::llm::create_provider;
use pocket_assist::store::Store;
use pocket_assist::summary::{
    SummaryAction, SummaryEffects, SummaryReducer, SummaryState, SummaryView,
};
use pocket_assist::tools::ToolRegistry;
use pocket_assist::tools::builtin::FindFreeTimeTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🤖 Pocket Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);

    // ── Tools ────────────────────────────────────────────────────────────
    let calendar: Arc<dyn EventSource> = match &config.calendar_path {
        Some(path) => {
            eprintln!("   Calendar: {}", path.display());
            Arc::new(JsonCalendar::new(path))
        }
        None => {
            eprintln!("   Calendar: empty (set CALENDAR_PATH)");
            Arc::new(StaticCalendar::new(Vec::new()))
        }
    };
    let tools = Arc::new(ToolRegistry::new());
    tools.register_sync(Arc::new(FindFreeTimeTool::new(calendar)));
    eprintln!("   Tools: {} registered", tools.count());

    // ── Chat ─────────────────────────────────────────────────────────────
    let chat_llm = create_provider(&config.llm, Some(tools))?;
    let chat = Store::spawn(
        ChatReducer,
        ChatState::default(),
        ChatEffects::new(chat_llm),
    );
    tokio::spawn(render_chat(chat.subscribe()));

    // ── Mail summary ─────────────────────────────────────────────────────
    let summary = match &config.mail {
        Some(mail) => {
            let http = reqwest::Client::new();
            let auth = mail.token_provider(http.clone());
            let client = Arc::new(mail.client(http, Arc::clone(&auth)));
            let summary_llm = create_provider(&config.llm, None)?;
            let has_credential = auth.has_credential();
            let handle = Store::spawn(
                SummaryReducer,
                SummaryState::default(),
                SummaryEffects::new(
                    auth,
                    client,
                    summary_llm,
                    mail.query.clone(),
                    mail.fetch_limit,
                ),
            );
            tokio::spawn(render_summary(handle.subscribe()));
            handle.send(SummaryAction::Resumed { has_credential });
            eprintln!("   Mail: enabled (query: {:?})", mail.query);
            Some(handle)
        }
        None => {
            eprintln!("   Mail: disabled (set GOOGLE_ACCESS_TOKEN or GOOGLE_REFRESH_TOKEN)");
            None
        }
    };

    eprintln!("   Commands: /summarize /retry /signout /clear /quit\n");
    eprint!("> ");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => eprint!("> "),
            "/quit" => break,
            "/clear" => {
                chat.send(ChatAction::ClearConversation);
                eprint!("> ");
            }
            "/summarize" | "/retry" | "/signout" => {
                let Some(summary) = &summary else {
                    eprintln!("Mail is not configured.");
                    eprint!("> ");
                    continue;
                };
                let action = match line {
                    "/summarize" => SummaryAction::SignInTapped,
                    "/retry" => SummaryAction::RetryTapped,
                    _ => SummaryAction::SignOutTapped,
                };
                summary.send(action);
            }
            text => {
                if !chat.state().can_send(text) {
                    eprintln!("(still answering, wait a moment)");
                    eprint!("> ");
                    continue;
                }
                chat.send(ChatAction::SendMessage(text.to_string()));
            }
        }
    }

    chat.shutdown();
    if let Some(summary) = summary {
        summary.shutdown();
    }
    Ok(())
}

/// Log to stderr, or to a daily rolling file when a log directory is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pocket-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// Print the newest reply as it streams in.
async fn render_chat(mut rx: watch::Receiver<Arc<ChatState>>) {
    let mut current: Option<u64> = None;
    let mut printed = 0usize;

    while rx.changed().await.is_ok() {
        let view = ChatView::from(&**rx.borrow_and_update());
        let Some((id, bubble)) = view.bubbles.last() else {
            continue;
        };
        if current != Some(*id) {
            current = Some(*id);
            printed = 0;
        }
        match bubble {
            Bubble::Streaming(text) => printed = print_delta(text, printed),
            Bubble::Reply(text) => {
                if printed <= text.len() {
                    print_delta(text, printed);
                    println!("\n");
                    eprint!("> ");
                }
                printed = usize::MAX;
            }
            Bubble::Failed { message, .. } => {
                if printed != usize::MAX {
                    println!("\n[error: {}]\n", message);
                    eprint!("> ");
                }
                printed = usize::MAX;
            }
            Bubble::User(_) | Bubble::Typing => {}
        }
    }
}

/// Print the part of `text` past `printed`; returns the new printed length.
fn print_delta(text: &str, printed: usize) -> usize {
    use std::io::Write;

    match text.get(printed..) {
        Some(rest) => print!("{}", rest),
        None => print!("\n{}", text),
    }
    std::io::stdout().flush().ok();
    text.len()
}

async fn render_summary(mut rx: watch::Receiver<Arc<SummaryState>>) {
    let mut last: Option<SummaryView> = None;
    let mut printed = 0usize;

    while rx.changed().await.is_ok() {
        let view = SummaryView::from(&**rx.borrow_and_update());
        if last.as_ref() == Some(&view) {
            continue;
        }
        match &view {
            SummaryView::SignIn { pending: true } => eprintln!("[mail] Signing in…"),
            SummaryView::SignIn { pending: false } => {
                eprintln!("[mail] Signed out. /summarize to start.");
                eprint!("> ");
            }
            SummaryView::Working { label } => eprintln!("[mail] {}", label),
            SummaryView::Summary {
                text,
                sources,
                streaming,
            } => {
                if !matches!(last, Some(SummaryView::Summary { .. })) {
                    printed = 0;
                    println!("\n── Mail summary ──");
                }
                printed = print_delta(text, printed);
                if !streaming {
                    println!("\n\nSources:");
                    for source in sources {
                        println!("  • {}", source);
                    }
                    println!();
                    eprint!("> ");
                }
            }
            SummaryView::Failure { message } => {
                eprintln!("[mail] Failed: {} (/retry)", message);
                eprint!("> ");
            }
        }
        last = Some(view);
    }
}
