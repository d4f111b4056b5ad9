use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use poketale::canon::Canonicalizer;
use poketale::effect::Effect;
use poketale::image::AssetCatalog;
use poketale::payload::{self, Intake, PartialCreature, PartialItem, PartialNpc};
use poketale::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "poketale")]
#[command(about = "Canonicalize generated entities and replay scripted battles")]
struct Args {
    /// RON asset catalog used for image resolution (defaults to the bundled one)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Canonicalize a raw generator payload and print it as JSON
    Canon {
        #[arg(value_enum)]
        kind: EntityKind,
        path: PathBuf,
        /// Image URL supplied alongside the payload (creatures only)
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Replay a scripted battle and print its log and result
    Replay { path: PathBuf },
    /// Print the JSON schema generated payloads should follow
    Schema {
        #[arg(value_enum)]
        kind: EntityKind,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EntityKind {
    Creature,
    Item,
    Npc,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let catalog = match &args.catalog {
        Some(path) => AssetCatalog::load(path).await.map_err(other_error)?,
        None => AssetCatalog::builtin(),
    };
    let canon = Canonicalizer::new(catalog);

    match args.command {
        Command::Canon {
            kind,
            path,
            image_url,
        } => canonicalize(&canon, kind, &path, image_url.as_deref()).await,
        Command::Replay { path } => replay(&canon, &path).await,
        Command::Schema { kind } => {
            let schema = match kind {
                EntityKind::Creature => payload::creature_schema_string(),
                EntityKind::Item => payload::item_schema_string(),
                EntityKind::Npc => payload::npc_schema_string(),
            };
            println!("{schema}");
            Ok(())
        }
    }
}

async fn canonicalize(
    canon: &Canonicalizer,
    kind: EntityKind,
    path: &Path,
    image_url: Option<&str>,
) -> io::Result<()> {
    let raw = tokio::fs::read_to_string(path).await?;
    let rendered = match kind {
        EntityKind::Creature => {
            let creature = canon.creature(&PartialCreature::from_text(&raw), image_url);
            serde_json::to_string_pretty(&creature)
        }
        EntityKind::Item => {
            serde_json::to_string_pretty(&canon.item(&PartialItem::from_text(&raw)))
        }
        EntityKind::Npc => serde_json::to_string_pretty(&canon.npc(&PartialNpc::from_text(&raw))),
    }
    .map_err(other_error)?;
    println!("{rendered}");
    Ok(())
}

async fn replay(canon: &Canonicalizer, path: &Path) -> io::Result<()> {
    let scenario = Scenario::load(path).await.map_err(other_error)?;
    let report = scenario.replay(canon);

    println!("== {} ==", scenario.name);
    for entry in &report.log {
        println!("[{}] {}", entry.speaker, entry.text);
    }
    for effect in &report.effects {
        match effect {
            Effect::InterpretCommand { text, .. } => println!("-> interpret command: {text}"),
            Effect::SuggestItems { .. } => println!("-> suggest items"),
            Effect::BattleEnded(_) => println!("-> battle ended"),
        }
    }
    println!(
        "{} actions applied, {} ignored",
        report.applied, report.ignored
    );
    if let Some(result) = &report.result {
        let rendered = serde_json::to_string_pretty(result).map_err(other_error)?;
        println!("{rendered}");
    }
    Ok(())
}

fn other_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}
