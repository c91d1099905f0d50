//! vnest CLI: manage words and allowed subject-verb-object combinations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use vnest_graph::api::{WordView, combination_views};
use vnest_graph::config::Settings;
use vnest_graph::engine::Engine;
use vnest_graph::export::{self, SentenceRecord};
use vnest_graph::graph::CombinationId;
use vnest_graph::word::{WordId, WordRole};

#[derive(Parser)]
#[command(name = "vnest", version, about = "Word-compatibility graph for VNeST exercises")]
struct Cli {
    /// Data directory for persistent storage. Overrides the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a TOML settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vnest data directory.
    Init,

    /// Show engine info and statistics.
    Info,

    /// Manage words.
    Word {
        #[command(subcommand)]
        action: WordAction,
    },

    /// Manage allowed combinations.
    Combo {
        #[command(subcommand)]
        action: ComboAction,
    },

    /// Print verb-centric exercise suggestions as JSON.
    Suggest {
        /// Accepted for parity with the HTTP API; does not truncate.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Check whether a sentence is allowed.
    Validate {
        subject: u64,
        verb: u64,
        object: u64,
    },

    /// Allow sentences from a JSON file of `{"subject","verb","object"}` texts.
    Ingest {
        /// Path to JSON file with sentences.
        #[arg(long)]
        file: PathBuf,
    },

    /// Export all words and combinations as JSON.
    Export,
}

#[derive(Subcommand)]
enum WordAction {
    /// List words, optionally only one role.
    List {
        /// SUBJECT, VERB or OBJECT (case-insensitive).
        #[arg(long)]
        role: Option<WordRole>,
    },
    /// Add a word.
    Add { text: String, role: WordRole },
    /// Change a word's text and role.
    Update { id: u64, text: String, role: WordRole },
    /// Delete a word and every combination using it.
    Delete { id: u64 },
}

#[derive(Subcommand)]
enum ComboAction {
    /// List combinations, optionally only those with one verb.
    List {
        #[arg(long)]
        verb: Option<u64>,
    },
    /// Allow one subject/verb/object triple.
    Add { subject: u64, verb: u64, object: u64 },
    /// Allow a verb with every subject × object pair.
    Batch {
        #[arg(long)]
        verb: u64,
        /// Comma-separated subject IDs.
        #[arg(long, value_delimiter = ',', required = true)]
        subjects: Vec<u64>,
        /// Comma-separated object IDs.
        #[arg(long, value_delimiter = ',', required = true)]
        objects: Vec<u64>,
    },
    /// Delete one combination.
    Delete { id: u64 },
    /// Delete every combination with the given verb.
    DeleteByVerb { verb: u64 },
}

fn word_id(raw: u64) -> Result<WordId> {
    WordId::new(raw).ok_or_else(|| miette::miette!("word IDs start at 1, got {raw}"))
}

fn word_ids(raw: &[u64]) -> Result<Vec<WordId>> {
    raw.iter().map(|r| word_id(*r)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => Settings::load_or_default(path)?,
        None => Settings::default(),
    };
    if cli.data_dir.is_some() {
        settings.data_dir = cli.data_dir.clone();
    }

    match cli.command {
        Commands::Init => {
            let data_dir = settings
                .data_dir
                .get_or_insert_with(|| PathBuf::from(".vnest"))
                .clone();
            let engine = Engine::new(settings.to_engine_config())?;
            if let Some(ref path) = cli.config {
                if !path.exists() {
                    settings.save(path)?;
                    println!("Wrote settings to {}", path.display());
                }
            }
            println!("Initialized vnest at {}", data_dir.display());
            println!("{}", engine.info()?);
        }

        Commands::Info => {
            let engine = Engine::new(settings.to_engine_config())?;
            println!("{}", engine.info()?);
        }

        Commands::Word { action } => {
            let engine = Engine::new(settings.to_engine_config())?;

            match action {
                WordAction::List { role } => {
                    let words = engine.list_words(role)?;
                    if words.is_empty() {
                        println!("No words.");
                    } else {
                        println!("Words ({}):", words.len());
                        for w in &words {
                            println!("  {} \"{}\" [{}]", w.id, w.text, w.role.as_wire());
                        }
                    }
                }
                WordAction::Add { text, role } => {
                    let word = engine.create_word(&text, role)?;
                    print_json(&WordView::from(&word))?;
                }
                WordAction::Update { id, text, role } => {
                    let word = engine.update_word(word_id(id)?, &text, role)?;
                    print_json(&WordView::from(&word))?;
                }
                WordAction::Delete { id } => {
                    let removed = engine.delete_word(word_id(id)?)?;
                    println!("Deleted word {id} ({removed} combination(s) removed)");
                }
            }
        }

        Commands::Combo { action } => {
            let engine = Engine::new(settings.to_engine_config())?;

            match action {
                ComboAction::List { verb } => {
                    let verb = verb.map(word_id).transpose()?;
                    let combos = engine.list_combinations(verb)?;
                    let views = combination_views(&engine, &combos)?;
                    if views.is_empty() {
                        println!("No combinations.");
                    } else {
                        println!("Combinations ({}):", views.len());
                        for v in &views {
                            println!("  {:>5}  {}", v.id, v.sentence);
                        }
                    }
                }
                ComboAction::Add {
                    subject,
                    verb,
                    object,
                } => {
                    let combo =
                        engine.create_combination(word_id(subject)?, word_id(verb)?, word_id(object)?)?;
                    print_json(&combination_views(&engine, &[combo])?)?;
                }
                ComboAction::Batch {
                    verb,
                    subjects,
                    objects,
                } => {
                    let outcome =
                        engine.create_batch(word_id(verb)?, &word_ids(&subjects)?, &word_ids(&objects)?)?;
                    println!(
                        "Created {} combination(s), {} already present",
                        outcome.created_count(),
                        outcome.already_present
                    );
                    if !outcome.skipped_subjects.is_empty() {
                        println!("  skipped subjects: {:?}", outcome.skipped_subjects);
                    }
                    if !outcome.skipped_objects.is_empty() {
                        println!("  skipped objects:  {:?}", outcome.skipped_objects);
                    }
                }
                ComboAction::Delete { id } => {
                    let cid = CombinationId::new(id)
                        .ok_or_else(|| miette::miette!("combination IDs start at 1, got {id}"))?;
                    engine.delete_combination(cid)?;
                    println!("Deleted combination {id}");
                }
                ComboAction::DeleteByVerb { verb } => {
                    let removed = engine.delete_by_verb(word_id(verb)?)?;
                    println!("Deleted {removed} combination(s) for verb {verb}");
                }
            }
        }

        Commands::Suggest { limit } => {
            let engine = Engine::new(settings.to_engine_config())?;
            print_json(&engine.suggestions(limit)?)?;
        }

        Commands::Validate {
            subject,
            verb,
            object,
        } => {
            let engine = Engine::new(settings.to_engine_config())?;
            let result = engine.validate(word_id(subject)?, word_id(verb)?, word_id(object)?)?;
            println!("{}", result.sentence);
            println!("{} ({})", result.message, if result.valid { "valid" } else { "invalid" });
        }

        Commands::Ingest { file } => {
            let engine = Engine::new(settings.to_engine_config())?;
            let content = std::fs::read_to_string(&file).into_diagnostic()?;

            // [{"subject": "kissa", "verb": "syö", "object": "kalaa"}, ...]
            let records: Vec<SentenceRecord> = serde_json::from_str(&content).into_diagnostic()?;
            let report = export::ingest(&engine, &records)?;
            println!(
                "Ingested {} sentence(s) from {}: {} word(s) and {} combination(s) created, {} already present",
                records.len(),
                file.display(),
                report.words_created,
                report.combinations_created,
                report.already_present
            );
            println!("{}", engine.info()?);
        }

        Commands::Export => {
            let engine = Engine::new(settings.to_engine_config())?;
            print_json(&export::snapshot(&engine)?)?;
        }
    }

    Ok(())
}
