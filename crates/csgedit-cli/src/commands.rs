//! Command implementations.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csgedit::{identitize, pull, push_all, world_solids, xpush, EditConfig, RunCounters};
use csgedit_db::{Database, EntryId, ObjectStore};
use tracing::{info, warn};

use crate::{Cli, Commands};

pub fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut db = Database::load(&cli.db)
        .with_context(|| format!("cannot open database {}", cli.db.display()))?;
    let before = db.to_document();

    let result = match &cli.command {
        Commands::Push {
            parallel, objects, ..
        } => {
            if let Some(n) = parallel {
                info!(requested = n, "ignoring -P, push is single-threaded");
            }
            let summary = push_all(&mut db, objects, &config);
            for outcome in &summary.outcomes {
                match &outcome.result {
                    Ok(report) => {
                        println!(
                            "{}: {} solid(s), {} combination(s) rewritten",
                            report.object, report.solids_rewritten, report.combinations_rewritten
                        );
                        for name in &report.missing {
                            println!("  missing member {name}");
                        }
                    }
                    Err(e) => println!("{}: failed: {e}", outcome.object),
                }
            }
            let failed = summary.failed().count();
            if failed > 0 {
                Err(anyhow!("{failed} of {} object(s) failed", summary.outcomes.len()))
            } else {
                Ok(())
            }
        }
        Commands::Xpush { object } => {
            let id = lookup(&db, object)?;
            xpush(&mut db, id, &config)
                .map(|report| {
                    println!(
                        "{}: {} created, {} rewritten, {} unused name(s) discarded",
                        report.object, report.created, report.rewritten, report.discarded
                    );
                    for name in &report.removed {
                        println!("  removed {name}");
                    }
                })
                .with_context(|| format!("xpush {object}"))
        }
        Commands::Pull { object, .. } => {
            let id = lookup(&db, object)?;
            pull(&mut db, id, &config)
                .map(|report| {
                    println!(
                        "{}: {} solid(s) moved to their frames, {} combination(s) rewritten",
                        report.object, report.solids_canonicalized, report.combinations_rewritten
                    );
                })
                .with_context(|| format!("pull {object}"))
        }
        Commands::Identitize { object } => {
            let id = lookup(&db, object)?;
            identitize(&mut db, id, &config)
                .map(|n| println!("{object}: {n} combination(s) rewritten"))
                .with_context(|| format!("identitize {object}"))
        }
        Commands::Tree { object } => {
            let id = lookup(&db, object)?;
            print_tree(&db, id, 0, &mut Vec::new(), &config);
            Ok(())
        }
        Commands::Solids { object } => {
            let id = lookup(&db, object)?;
            for (path, solid) in world_solids(&db, id, &config)? {
                let v = solid.vertex();
                println!("{path}  {} at ({:.4}, {:.4}, {:.4})", solid.kind_name(), v.x, v.y, v.z);
            }
            Ok(())
        }
        Commands::Info => show_info(&db, &cli.db),
    };

    if db.to_document() != before {
        db.save(&cli.db)
            .with_context(|| format!("cannot write database {}", cli.db.display()))?;
        info!(path = %cli.db.display(), "saved");
    }
    result
}

fn load_config(cli: &Cli) -> Result<EditConfig> {
    let config = match &cli.config {
        Some(path) => EditConfig::load(path)?,
        None => EditConfig::load_or_default(default_config_path(&cli.db))?,
    };
    Ok(config)
}

fn default_config_path(db: &Path) -> PathBuf {
    db.with_file_name("csgedit.toml")
}

fn lookup(db: &Database, name: &str) -> Result<EntryId> {
    db.lookup(name)
        .ok_or_else(|| anyhow!("{name} does not exist"))
}

fn print_tree(
    db: &Database,
    id: EntryId,
    depth: usize,
    path: &mut Vec<EntryId>,
    config: &EditConfig,
) {
    let Some(entry) = db.entry(id) else {
        return;
    };
    if entry.kind.is_solid() {
        return;
    }
    if path.contains(&id) || path.len() >= config.max_depth {
        warn!(object = %entry.name, "cycle, not descending");
        return;
    }
    let Ok(comb) = db.read_comb(id) else {
        return;
    };
    path.push(id);
    for leaf in &comb.leaves {
        let marker = match db.lookup(&leaf.name) {
            Some(child) if db.entry(child).is_some_and(|e| e.kind.is_combination()) => "/",
            Some(_) => "",
            None => " (missing)",
        };
        println!(
            "{}{} {}{}",
            "  ".repeat(depth + 1),
            leaf.op.symbol(),
            leaf.name,
            marker
        );
        if let Some(m) = &leaf.matrix {
            for row in m.to_row_major().chunks(4) {
                println!(
                    "{}    [{:>10.4} {:>10.4} {:>10.4} {:>10.4}]",
                    "  ".repeat(depth + 1),
                    row[0],
                    row[1],
                    row[2],
                    row[3]
                );
            }
        }
        if let Some(child) = db.lookup(&leaf.name) {
            print_tree(db, child, depth + 1, path, config);
        }
    }
    path.pop();
}

fn show_info(db: &Database, file: &Path) -> Result<()> {
    let ids = db.ids();
    let solids = ids
        .iter()
        .filter(|id| db.entry(**id).is_some_and(|e| e.kind.is_solid()))
        .count();
    let regions = ids
        .iter()
        .filter(|id| {
            matches!(
                db.entry(**id).map(|e| e.kind),
                Some(csgedit_db::ObjectKind::Combination { region: true })
            )
        })
        .count();

    println!("csgedit database: {}", file.display());
    println!("  Objects: {}", ids.len());
    println!("  Solids: {solids}");
    println!("  Combinations: {} ({regions} regions)", ids.len() - solids);
    if let Some(limit) = db.name_limit() {
        println!("  Name limit: {limit}");
    }

    let mut counters = RunCounters::new();
    let tops = counters.find_tree_tops(db)?;
    if tops.is_empty() {
        println!("\nNo tree tops");
        return Ok(());
    }
    println!("\nTree tops:");
    for id in tops {
        println!("  {}", db.name(id).unwrap_or("?"));
    }
    Ok(())
}
