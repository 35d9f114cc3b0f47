use anyhow::{Context, Result};
use clap::Parser;
use rusty_savant::args::{self, Cli, Command, LookupTarget};
use rusty_savant::controller::lookup::write_records;
use rusty_savant::{LookupTable, Savant, Settings};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = args::load_config(&cli)?;
    init_tracing(&settings);

    match cli.command {
        Command::Search(search) => {
            let (query, options) = args::search_query(&search);
            let savant = Savant::connect(settings)
                .await
                .context("setting up client")?;
            let result = savant.search(query, options).await.context("search")?;
            for advisory in &result.advisories {
                eprintln!("{advisory}");
            }
            let out = open_output(search.output.as_deref())?;
            result.table.write_csv(out).context("writing search results")?;
        }
        Command::Leaderboard(board) => {
            let savant = Savant::connect(settings)
                .await
                .context("setting up client")?;
            let table = savant
                .leaderboard(&board.name, args::params_to_args(&board.params))
                .await
                .with_context(|| format!("leaderboard {}", board.name))?;
            let out = open_output(board.output.as_deref())?;
            table.write_csv(out).context("writing leaderboard")?;
        }
        Command::Lookup(lookup) => {
            let target = args::lookup_target(&lookup)?;
            let table = LookupTable::load(&settings, lookup.refresh)
                .await
                .context("loading lookup table")?;
            let out = open_output(lookup.output.as_deref())?;
            match target {
                LookupTarget::Id(id) => {
                    write_records(out, table.lookup_id(&id, lookup.mlb_only)?)?;
                }
                LookupTarget::Name(name) => {
                    write_records(out, table.lookup_name(&name, lookup.mlb_only)?)?;
                }
                LookupTarget::IdOf {
                    name,
                    source,
                    start_year,
                } => {
                    let id = table.get_id(&name, source, start_year)?;
                    let mut out = out;
                    writeln!(out, "{id}").context("writing id")?;
                }
                LookupTarget::Table => write_records(out, table.players(lookup.mlb_only))?,
            }
        }
    }
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create output {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
