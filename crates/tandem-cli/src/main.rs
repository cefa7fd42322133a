use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use smol_str::SmolStr;
use tandem_editor_core::{
    Completion, DocPosition, Document, EditorSession, OperationStatus, OverlayRow, RequestState,
    Selection, Staleness, ToggleAction, TranslateError, Translator, translatable_spans,
};
use tandem_services::{
    DeeplConfig, DeeplTranslator, DummyTranslator, FileDocumentStore, ServiceError, telemetry,
};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Tandem - translation overlay for block documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding saved documents
    #[arg(long, global = true, env = "TANDEM_DOCUMENT_DIR", default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document from paragraphs and save it
    New {
        /// Document name (file name under --dir)
        name: String,

        /// One argument per block
        #[arg(required = true)]
        paragraphs: Vec<String>,
    },
    /// Print a saved document's blocks and translatable spans
    Show { name: String },
    /// Toggle a translatable span and save the document back
    Mark {
        name: String,

        /// Block index, starting at 0
        #[arg(long)]
        block: usize,

        /// First character of the span
        #[arg(long)]
        start: usize,

        /// One past the last character of the span
        #[arg(long)]
        end: usize,
    },
    /// Translate every block and span of a document and print the overlay
    TranslateBlocks {
        name: String,

        /// Use the placeholder translator instead of DeepL
        #[arg(long)]
        offline: bool,
    },
    /// Translate a single phrase
    Phrase {
        text: String,

        /// Use the placeholder translator instead of DeepL
        #[arg(long)]
        offline: bool,
    },
}

/// Either backend behind one [`Translator`].
enum AnyTranslator {
    Deepl(DeeplTranslator),
    Dummy(DummyTranslator),
}

impl AnyTranslator {
    fn from_env(offline: bool) -> Result<Self> {
        if offline {
            return Ok(Self::Dummy(DummyTranslator::new()));
        }
        let config = DeeplConfig::from_env().map_err(ServiceError::from)?;
        Ok(Self::Deepl(DeeplTranslator::new(config)?))
    }
}

impl Translator for AnyTranslator {
    async fn translate(&self, phrase: &str) -> Result<SmolStr, TranslateError> {
        match self {
            Self::Deepl(t) => t.translate(phrase).await,
            Self::Dummy(t) => t.translate(phrase).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_miette();
    telemetry::init("tandem");

    let cli = Cli::parse();
    let store = FileDocumentStore::new(&cli.dir);

    match cli.command {
        Commands::New { name, paragraphs } => new_document(&store, &name, &paragraphs).await,
        Commands::Show { name } => {
            let session = open(&store, &name).await?;
            print_session(&session);
            Ok(())
        }
        Commands::Mark {
            name,
            block,
            start,
            end,
        } => mark(&store, &name, block, start, end).await,
        Commands::TranslateBlocks { name, offline } => {
            let translator = AnyTranslator::from_env(offline)?;
            translate_blocks(&store, &translator, &name).await
        }
        Commands::Phrase { text, offline } => {
            let translator = AnyTranslator::from_env(offline)?;
            let mut session = EditorSession::default();
            let ticket = session.begin_phrase(text.as_str());
            let result = translator.translate(&ticket.phrase).await;
            session.finish_hover(ticket, result);
            match &session.phrase_detail().status {
                OperationStatus::Succeeded(translated) => {
                    println!("{text} -> {translated}");
                    Ok(())
                }
                status => Err(miette::miette!(
                    "translation failed: {}",
                    status.error_message().unwrap_or("no result")
                )),
            }
        }
    }
}

async fn new_document(store: &FileDocumentStore, name: &str, paragraphs: &[String]) -> Result<()> {
    let mut session = EditorSession::new(Document::from_paragraphs(paragraphs));
    save(&mut session, store, name).await?;
    println!("✓ Saved {} blocks to {}", session.document().len(), name);
    Ok(())
}

async fn mark(
    store: &FileDocumentStore,
    name: &str,
    block: usize,
    start: usize,
    end: usize,
) -> Result<()> {
    let mut session = open(store, name).await?;
    let key = session
        .document()
        .block_at(block)
        .map(|b| b.key().clone())
        .ok_or_else(|| {
            miette::miette!(
                "document has {} blocks, no block at index {block}",
                session.document().len()
            )
        })?;

    let action = session
        .toggle_translatable(&Selection::within(key, start..end))
        .map_err(ServiceError::from)?;
    save(&mut session, store, name).await?;

    match action {
        ToggleAction::Applied(_) => println!("✓ Marked {start}..{end} in block {block}"),
        ToggleAction::Removed => println!("✓ Unmarked {start}..{end} in block {block}"),
    }
    Ok(())
}

async fn translate_blocks(
    store: &FileDocumentStore,
    translator: &AnyTranslator,
    name: &str,
) -> Result<()> {
    let mut session = open(store, name).await?;
    let keys: Vec<_> = session
        .document()
        .content_blocks()
        .iter()
        .map(|b| b.key().clone())
        .collect();

    let mut failed = 0usize;
    for key in &keys {
        let completion = session
            .translate_block(translator, key)
            .await
            .map_err(ServiceError::from)?;
        if completion == Completion::Failed {
            failed += 1;
        }
    }
    info!(blocks = keys.len(), failed, "translated blocks");
    print_session(&session);

    for key in &keys {
        for span in translatable_spans(session.document(), key) {
            let position = DocPosition::new(span.block.clone(), span.range.start);
            if session.hover_translate(translator, &position).await.is_none() {
                continue;
            }
            let detail = session.phrase_detail();
            match &detail.status {
                OperationStatus::Succeeded(translated) => {
                    println!("  \"{}\" -> {}", detail.phrase, translated)
                }
                status => println!(
                    "  \"{}\" !! {}",
                    detail.phrase,
                    status.error_message().unwrap_or("no result")
                ),
            }
        }
    }

    if failed > 0 {
        return Err(miette::miette!("{failed} of {} blocks failed to translate", keys.len()));
    }
    Ok(())
}

/// Load `name` into a fresh session, whose empty document always accepts a load.
async fn open(store: &FileDocumentStore, name: &str) -> Result<EditorSession> {
    let mut session = EditorSession::new(Document::without_blocks());
    let completion = session.load(store, name).await.map_err(ServiceError::from)?;
    if completion != Completion::Applied {
        return Err(miette::miette!(
            "failed to load {name}: {}",
            session.load_status().error_message().unwrap_or("unknown error")
        ));
    }
    Ok(session)
}

async fn save(session: &mut EditorSession, store: &FileDocumentStore, name: &str) -> Result<()> {
    let completion = session.save(store, name).await.map_err(ServiceError::from)?;
    if completion != Completion::Applied {
        return Err(miette::miette!(
            "failed to save {name}: {}",
            session.save_status().error_message().unwrap_or("unknown error")
        ));
    }
    Ok(())
}

fn print_session(session: &EditorSession) {
    for (idx, row) in session.overlay().rows.iter().enumerate() {
        println!("{}", describe_row(idx, row));
        for span in translatable_spans(session.document(), &row.block.key) {
            println!(
                "    [{}..{}] \"{}\"",
                span.range.start, span.range.end, span.text
            );
        }
    }
}

fn describe_row(idx: usize, row: &OverlayRow) -> String {
    let state = match row.staleness {
        Staleness::NeverTranslated => "untranslated",
        Staleness::Current => "current",
        Staleness::Stale => "stale",
    };
    let mut line = format!("{idx:>3} {:<6} {state:<12} {}", row.block.key.as_str(), row.block.text);
    if !row.translated_text.is_empty() {
        line.push_str(&format!("\n    => {}", row.translated_text));
    }
    if let RequestState::Failed { reason } = &row.request {
        line.push_str(&format!("\n    !! {reason}"));
    }
    line
}

fn init_miette() {
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
