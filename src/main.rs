use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use season_projector::elo_update::update_ratings_with_fixtures;
use season_projector::logging::init_logging;
use season_projector::match_sim::SimMode;
use season_projector::season::{ProjectionConfig, RatingPolicy, SeasonProjector};
use season_projector::season_input::{parse_season_json, parse_timestamp};
use season_projector::summary::{
    SeasonSummary, Statistic, Zone, compare_with_current, season_report, summarize,
};
use season_projector::table::{TableRow, build_league_table};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let path = positional_args(&args)
        .into_iter()
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/season_small.json"));

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let input = parse_season_json(&raw)?;

    let mut config = ProjectionConfig::from_env();
    if let Some(n) = parse_usize_arg("--iterations") {
        config.iterations = n;
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        config.seed = seed;
    }
    if let Some(threads) = parse_usize_arg("--threads") {
        config.parallelism = threads;
    }
    if let Some(season) = parse_i32_arg("--season") {
        config.season = Some(season);
    }
    if let Some(raw) = parse_str_arg("--cutoff") {
        let cutoff = parse_timestamp(&raw).with_context(|| format!("bad --cutoff `{raw}`"))?;
        config.cutoff = Some(cutoff);
    }
    if has_flag("--discrete") {
        config.mode = SimMode::Discrete;
    }
    if has_flag("--fixed-ratings") {
        config.rating_policy = RatingPolicy::Fixed;
    }
    let statistic = if has_flag("--median") {
        Statistic::Median
    } else {
        Statistic::Mean
    };

    let (ratings, update) = update_ratings_with_fixtures(
        &input.ratings,
        &input.fixtures,
        Some(&input.tilts),
        config.params.elo_config(),
    );
    info!(
        applied = update.applied,
        stale = update.skipped_stale,
        unknown = update.skipped_unknown_club,
        "history replayed"
    );

    let in_season = input
        .fixtures
        .iter()
        .filter(|f| config.season.is_none_or(|s| f.season == s))
        .cloned()
        .collect::<Vec<_>>();
    let current = build_league_table(&in_season);

    let projector = SeasonProjector::new(&input.fixtures, &ratings, &input.tilts, config)?;
    let projection = projector.run(None);
    let summary = summarize(&projection.accumulator, statistic)?;

    println!(
        "Season projection: {} iterations ({} played, {} to simulate){}",
        projection.completed(),
        projection.played,
        projection.projected,
        if projection.aborted { " [stopped early]" } else { "" }
    );
    println!();
    print_expected_table(&summary);
    println!();
    print_position_matrix(&summary);

    let zones = default_zones(summary.table.len())?;
    let report = season_report(&summary, &projection.accumulator, &ratings, &zones);
    println!();
    println!("{:<4} {:<22} {:>7} {:>7} {:>6}", "Rank", "Club", "Rating", "xPts", "Diff");
    for row in &report {
        let zones = row
            .zones
            .iter()
            .map(|(label, pct)| format!("{label} {pct:.1}%"))
            .collect::<Vec<_>>()
            .join("  ");
        println!(
            "{:<4} {:<22} {:>7.1} {:>7.2} {:>+6}  sd {:.2}  {}",
            row.rank,
            row.club,
            row.rating,
            row.expected_points,
            row.position_diff,
            row.uncertainty,
            zones
        );
    }

    if !current.is_empty() {
        println!();
        print_current_vs_expected(&current, &summary);
    }

    if let Some(out) = parse_str_arg("--export") {
        let json = serde_json::to_string_pretty(&projection.accumulator)?;
        fs::write(&out, json).with_context(|| format!("failed to write {out}"))?;
        info!(path = %out, "accumulator exported");
    }

    Ok(())
}

fn default_zones(clubs: usize) -> Result<Vec<Zone>> {
    let mut zones = vec![
        Zone::new("CL", 1, 2.min(clubs.max(1)))?,
        Zone::new("Europe", 1, 3.min(clubs.max(1)))?,
        Zone::new("Conf", 1, 4.min(clubs.max(1)))?,
    ];
    if clubs > 4 {
        zones.push(Zone::bottom("Releg", 2, clubs)?);
    }
    Ok(zones)
}

fn print_expected_table(summary: &SeasonSummary) {
    println!(
        "{:>3} {:<22} {:>6} {:>6} {:>6} {:>6} {:>13} {:>7}",
        "Pos", "Club", "P", "W", "D", "L", "Goals", "Pts"
    );
    for row in &summary.table {
        println!(
            "{:>3} {:<22} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>13} {:>7.2}",
            row.position,
            row.club,
            row.games,
            row.wins,
            row.draws,
            row.losses,
            row.goals_label(),
            row.points
        );
    }
}

fn print_position_matrix(summary: &SeasonSummary) {
    let width = summary
        .positions
        .iter()
        .map(|r| r.by_position.len())
        .max()
        .unwrap_or(0);
    let header = (1..=width).map(|p| format!("{p:>6}")).collect::<String>();
    println!("{:<22}{header}", "Club");
    for row in &summary.positions {
        let cells = row
            .by_position
            .values()
            .map(|pct| format!("{pct:>6.1}"))
            .collect::<String>();
        println!("{:<22}{cells}", row.club);
    }
}

fn print_current_vs_expected(current: &[TableRow], summary: &SeasonSummary) {
    println!(
        "{:<22} {:>4} {:>4} {:>4} {:>5} {:>7} {:>7}",
        "Club", "Now", "Exp", "Chg", "Pts", "xPts", "+/-"
    );
    for row in compare_with_current(current, summary) {
        println!(
            "{:<22} {:>4} {:>4} {:>+4} {:>5} {:>7.2} {:>+7.2}",
            row.club,
            row.current_position,
            row.expected_position,
            row.position_change,
            row.current_points,
            row.expected_points,
            row.points_above_expected
        );
    }
}

const VALUE_FLAGS: [&str; 6] = [
    "--iterations",
    "--seed",
    "--threads",
    "--season",
    "--cutoff",
    "--export",
];

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

fn parse_str_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_str_arg(name).and_then(|v| v.parse::<usize>().ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_str_arg(name).and_then(|v| v.parse::<u64>().ok())
}

fn parse_i32_arg(name: &str) -> Option<i32> {
    parse_str_arg(name).and_then(|v| v.parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn season_path_found_after_value_flags() {
        let found = positional_args(&args(&["--iterations", "500", "path.json"]));
        assert_eq!(found, vec!["path.json"]);
        let found = positional_args(&args(&["--seed=7", "--discrete", "a.json", "--threads", "2"]));
        assert_eq!(found, vec!["a.json"]);
        assert!(positional_args(&args(&["--median", "--cutoff", "2025-06-01"])).is_empty());
    }
}
