use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grand_prix::report::{render_text, write_csv_file, write_json_file};
use grand_prix::GrandPrix;

const USAGE: &str = "usage: grand-prix <season.json> [--csv <out.csv>] [--json <out.json>]";

struct Args {
    season: PathBuf,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut season = None;
    let mut csv = None;
    let mut json = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => match args.next() {
                Some(path) => csv = Some(PathBuf::from(path)),
                None => bail!("--csv needs a path\n{}", USAGE),
            },
            "--json" => match args.next() {
                Some(path) => json = Some(PathBuf::from(path)),
                None => bail!("--json needs a path\n{}", USAGE),
            },
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if season.is_none() => season = Some(PathBuf::from(other)),
            other => bail!("unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    match season {
        Some(season) => Ok(Args { season, csv, json }),
        None => bail!("{}", USAGE),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grand_prix=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;

    println!("🏁 Grand Prix Standings v{}", grand_prix::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let grand_prix = GrandPrix::from_file(&args.season)?;
    let report = grand_prix.run()?;

    println!("{}", render_text(&report));

    if let Some(path) = &args.csv {
        write_csv_file(&report.standings, path)?;
        println!("✓ Standings CSV written to {}", path.display());
    }
    if let Some(path) = &args.json {
        write_json_file(&report, path)?;
        println!("✓ Season report JSON written to {}", path.display());
    }

    Ok(())
}
