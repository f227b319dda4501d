//! Line-oriented demo driver: wires config, telemetry, the note store, and a
//! session together, then runs a command loop with a periodic tick that
//! drives the autosave and restart deadlines.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use voicenote::config::Config;
use voicenote::export;
use voicenote::note::Language;
use voicenote::session::{Session, SessionOptions};
use voicenote::speech::{CaptureConfig, SpeechError, SpeechRecognizer};
use voicenote::store::NoteStore;
use voicenote::{summary, telemetry};

/// Placeholder engine for hosts without a speech capability wired in; every
/// start is refused so the session surfaces its status path instead
struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn start(&mut self, _config: CaptureConfig) -> Result<(), SpeechError> {
        Err(SpeechError::ServiceNotAllowed)
    }

    fn stop(&mut self) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voicenote starting");

    // Open the note store
    let db_path = Config::expand_path(&config.store.path)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = NoteStore::open(&db_path)?;
    println!("✓ Note store opened: {}", db_path.display());

    // Build the session
    let platform_identity = if config.speech.platform_identity.is_empty() {
        std::env::consts::OS.to_owned()
    } else {
        config.speech.platform_identity.clone()
    };
    let language = Language::parse(&config.speech.language).unwrap_or_default();
    let options = SessionOptions {
        platform_identity,
        language,
        autosave_delay: Duration::from_millis(config.autosave.debounce_ms),
        restart_delay: Duration::from_millis(config.speech.restart_delay_ms),
    };
    let mut session = Session::new(store, Box::new(UnavailableRecognizer), &options)?;
    println!(
        "✓ Session ready ({:?}, {})",
        session.device(),
        session.language()
    );
    println!("\nType to append to the current note. Commands: :new :list :open <id> :delete <id> :save :export :lang <tag> :summarize :record :stop :offline :online :quit\n");

    let export_dir = db_path
        .parent()
        .map_or_else(|| std::path::PathBuf::from("."), |p| p.join("exports"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                // Drive autosave and restart deadlines.
                session.tick(Instant::now());
                if let Some(status) = session.take_status() {
                    println!("[{status}]");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_line(&mut session, &export_dir, line.trim()).await? {
                    break;
                }
            }
        }
    }

    // Flush the open note before exiting.
    if !session.note().text.is_empty() || !session.note().title.is_empty() {
        session.save_now()?;
    }
    println!("Goodbye.");
    Ok(())
}

/// Process one input line; returns `true` to quit
async fn handle_line(
    session: &mut Session,
    export_dir: &std::path::Path,
    line: &str,
) -> Result<bool> {
    let now = Instant::now();
    if line.is_empty() {
        return Ok(false);
    }

    if !line.starts_with(':') {
        // Plain text appends to the current note body.
        let mut body = session.note().text.clone();
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(line);
        session.edit_text(&body, now);
        return Ok(false);
    }

    match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest)) {
        (":quit", _) => return Ok(true),
        (":new", _) => {
            session.new_note();
            println!("New note.");
        }
        (":list", _) => {
            for note in session.store().list()? {
                println!(
                    "{:>4}  {}  [{}]",
                    note.id.unwrap_or(0),
                    note.title,
                    note.language
                );
            }
        }
        (":open", arg) => match arg.parse::<i64>() {
            Ok(id) if session.open_note(id)? => println!("Opened note {id}."),
            Ok(id) => println!("No note with id {id}."),
            Err(_) => println!("Usage: :open <id>"),
        },
        (":delete", arg) => match arg.parse::<i64>() {
            Ok(id) => {
                session.delete_note(id)?;
                println!("Deleted note {id}.");
            }
            Err(_) => println!("Usage: :delete <id>"),
        },
        (":save", _) => {
            let id = session.save_now()?;
            println!("Saved as note {id}.");
        }
        (":export", _) => {
            let path = export::export_notes(session.store(), export_dir)?;
            println!("Exported to {}.", path.display());
        }
        (":lang", arg) => match Language::parse(arg) {
            Some(lang) => {
                session.set_language(lang);
                println!("Language set to {lang}.");
            }
            None => println!("Unknown language tag '{arg}'."),
        },
        (":summarize", _) => {
            let text = session.note().text.clone();
            println!("Summarizing…");
            let summary = summary::summarize(&text).await;
            println!("{summary}");
            session.set_summary(summary, now);
        }
        (":record", _) => session.start_recording(),
        (":stop", _) => session.stop_recording(),
        (":offline", _) => session.set_online(false),
        (":online", _) => session.set_online(true),
        (":title", arg) => session.edit_title(arg, now),
        (cmd, _) => println!("Unknown command '{cmd}'."),
    }

    if let Some(status) = session.take_status() {
        println!("[{status}]");
    }
    Ok(false)
}
