use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use season_projector::elo::Outcome;
use season_projector::league_params::LeagueParams;
use season_projector::logging::init_logging;
use season_projector::match_sim::{SimMode, simulate_head_to_head};
use season_projector::season_input::parse_season_json;

const VALUE_FLAGS: [&str; 2] = ["--trials", "--seed"];

// Usage: head_to_head <season.json> <home> <away> [--trials N] [--seed N] [--discrete]
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let positional = positional_args(&args);
    let (path, home, away) = match positional.as_slice() {
        [path, home, away, ..] => (PathBuf::from(path), home.clone(), away.clone()),
        _ => bail!("usage: head_to_head <season.json> <home> <away> [--trials N] [--seed N]"),
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input = parse_season_json(&raw)?;
    let home_rating = input
        .ratings
        .rating(&home)
        .with_context(|| format!("no rating for {home}"))?;
    let away_rating = input
        .ratings
        .rating(&away)
        .with_context(|| format!("no rating for {away}"))?;

    let trials = parse_u64_arg("--trials").unwrap_or(10_000) as usize;
    let seed = parse_u64_arg("--seed").unwrap_or(42);
    let mode = if has_flag("--discrete") {
        SimMode::Discrete
    } else {
        SimMode::Scoreline
    };

    let params = LeagueParams::from_env();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let h2h = simulate_head_to_head(
        home_rating,
        away_rating,
        (input.tilts.get(&home), input.tilts.get(&away)),
        &params,
        mode,
        trials,
        &mut rng,
    )?;

    println!("{home} ({home_rating:.1}) vs {away} ({away_rating:.1}), {trials} trials");
    println!("  home win {:>5.1}%", h2h.share(Outcome::Home));
    println!("  draw     {:>5.1}%", h2h.share(Outcome::Draw));
    println!("  away win {:>5.1}%", h2h.share(Outcome::Away));

    if mode == SimMode::Scoreline {
        println!();
        println!("Most likely scorelines:");
        for ((hg, ag), pct) in h2h.top_scorelines(10) {
            println!("  {hg}-{ag}  {pct:>5.1}%");
        }
    }
    Ok(())
}

/// Arguments that are neither flags nor the value of a `--flag value` pair.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        out.push(arg.clone());
    }
    out
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u64>()
        {
            return Some(v);
        }
    }
    None
}
