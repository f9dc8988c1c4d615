use std::error::Error;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use jeopardy_rs::{
    Board, CategorySource, DEFAULT_API_URL, DEFAULT_ID_SPACE, GameConfig, HttpCategorySource,
    Session, SourceConfig, build_category, filter_valid, row_display_value,
};
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const MAX_TITLE_WIDTH: usize = 22;

#[derive(Parser, Debug)]
#[command(name = "jeopardy-rs", about = "Build trivia boards from a jService-style API", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Log every fetch and rejection.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the category API.
    #[arg(long, global = true, env = "JEOPARDY_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble one full board.
    Board {
        #[command(flatten)]
        game: GameArgs,
        /// Print every question and answer instead of the face-down grid.
        #[arg(long)]
        reveal: bool,
    },
    /// Fetch one category and report whether it would make the board.
    Category {
        /// Source category ID.
        id: u32,
        /// Clues required per category.
        #[arg(short, long, default_value_t = 5)]
        clues: usize,
        /// RNG seed for row assignment.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Serve the board over HTTP.
    #[cfg(feature = "web")]
    Serve {
        #[command(flatten)]
        game: GameArgs,
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Keep consumed categories excluded across restarts.
        #[arg(long)]
        persist_registry: bool,
    },
}

#[derive(Args, Debug)]
struct GameArgs {
    /// Board columns.
    #[arg(short = 'n', long, default_value_t = 6)]
    categories: usize,
    /// Board rows.
    #[arg(short = 'k', long, default_value_t = 5)]
    clues: usize,
    /// Highest valid category ID.
    #[arg(long, default_value_t = DEFAULT_ID_SPACE)]
    id_space: u32,
    /// Give up after this many fetches (0 retries forever).
    #[arg(long, default_value_t = 200)]
    max_attempts: usize,
    /// Never re-sample an ID rejected earlier in the same assembly.
    #[arg(long)]
    exclude_rejected: bool,
    /// RNG seed for a reproducible board.
    #[arg(long)]
    seed: Option<u64>,
}

impl GameArgs {
    fn to_config(&self) -> GameConfig {
        GameConfig {
            num_categories: self.categories,
            clues_per_category: self.clues,
            id_space_max: self.id_space,
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            exclude_rejected: self.exclude_rejected,
            seed: self.seed,
            ..GameConfig::default()
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let source = SourceConfig {
        base_url: cli.api_url.clone(),
        timeout: Duration::from_secs(cli.timeout.max(1)),
        ..SourceConfig::default()
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match cli.command {
        Command::Board { game, reveal } => {
            runtime.block_on(handle_board(source, game.to_config(), reveal, cli.json))
        }
        Command::Category { id, clues, seed } => {
            runtime.block_on(handle_category(source, id, clues, seed, cli.json))
        }
        #[cfg(feature = "web")]
        Command::Serve {
            game,
            addr,
            persist_registry,
        } => {
            let mut config = game.to_config();
            if persist_registry {
                config.registry_policy = jeopardy_rs::RegistryPolicy::Persist;
            }
            let web = jeopardy_rs::web::WebConfig {
                addr,
                game: config,
                source,
            };
            runtime.block_on(jeopardy_rs::web::serve(web))?;
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "jeopardy_rs=debug"
    } else {
        "jeopardy_rs=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn handle_board(
    source: SourceConfig,
    config: GameConfig,
    reveal: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let source = HttpCategorySource::new(&source)?;
    let session = Session::new(source, config)?;
    session.start().await?;
    let board = session.board().ok_or("assembly finished without a board")?;

    if as_json {
        let payload = json!({
            "board": board,
            "stats": session.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if reveal {
        print_clue_sheet(&board);
    } else {
        print_grid(&board, session.config().max_clue_value);
    }
    Ok(())
}

async fn handle_category(
    source: SourceConfig,
    id: u32,
    clues: usize,
    seed: Option<u64>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let config = GameConfig {
        clues_per_category: clues,
        ..GameConfig::default()
    };
    config.validate()?;
    let source = HttpCategorySource::new(&source)?;
    let fetched = source.fetch(id).await;
    let summary = fetched
        .as_ref()
        .ok()
        .map(|raw| (raw.title.clone(), raw.clues.len(), filter_valid(&raw.clues).len()));
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let outcome = build_category(id, fetched, &config, &mut rng);

    if as_json {
        let payload = match &outcome {
            Ok(category) => json!({ "id": id, "accepted": true, "category": category }),
            Err((stage, err)) => json!({
                "id": id,
                "accepted": false,
                "stage": stage,
                "reason": err.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if let Some((title, total, valid)) = summary {
        println!("Category #{id}: {title}");
        println!("Clues: {total} total, {valid} usable before cleanup");
    }
    match outcome {
        Ok(category) => {
            println!("Accepted as \"{}\":", category.title);
            for (row, clue) in category.clues.iter().enumerate() {
                println!(
                    "  {row}. [{}] {} => {}",
                    clue.value, clue.question, clue.answer
                );
            }
        }
        Err((stage, err)) => println!("Rejected while {stage}: {err}"),
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn print_grid(board: &Board, max_value: u32) {
    if board.is_empty() {
        println!("Board is empty.");
        return;
    }
    let titles: Vec<String> = board
        .categories()
        .iter()
        .map(|c| truncate(&c.title, MAX_TITLE_WIDTH))
        .collect();
    let width = titles
        .iter()
        .map(|t| t.chars().count())
        .max()
        .unwrap_or(6)
        .max(6);
    let header: Vec<String> = titles.iter().map(|t| format!("{t:<width$}")).collect();
    println!("{}", header.join(" | "));
    println!("{}", vec!["-".repeat(width); titles.len()].join("-+-"));
    for row in 0..board.rows() {
        let label = format!("${}", row_display_value(row, board.rows(), max_value));
        let cells: Vec<String> = board.row(row).map(|_| format!("{label:<width$}")).collect();
        println!("{}", cells.join(" | "));
    }
}

fn print_clue_sheet(board: &Board) {
    for category in board.categories() {
        println!("\n{} (#{})", category.title, category.id);
        for clue in &category.clues {
            println!("  [{}] {}", clue.value, clue.question);
            println!("        {}", clue.answer);
        }
    }
}
