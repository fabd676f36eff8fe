use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::{OutputMode, emit_success, open_existing};
use mediasync::config::{self, MediaSyncConfig};
use mediasync::report::{self, Auditor};
use mediasync::scenario::{self, ScenarioRunner};
use mediasync::ui::{self, Icons, banner, section, success};
use mediasync::{ContentHost, MemoryTree, RelationKind, RelationStore, SqliteStore, SyncEngine, TreeKind, TreeStore};
use owo_colors::OwoColorize;

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        banner(
            &format!("{}", "Mediasync".bold().style(ui::theme().info.clone())),
            &format!("Version {}", env!("CARGO_PKG_VERSION").bold()),
        );
    } else {
        let data = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        });
        emit_success(output_mode, "version", data)?;
    }
    Ok(())
}

pub fn run_init(output_mode: OutputMode, config_path: &Path, force: bool) -> anyhow::Result<()> {
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(std::env::current_dir()?);
    let database = config::default_database_path_in(&base);

    let config = MediaSyncConfig {
        database: Some(database.display().to_string()),
        ..MediaSyncConfig::default()
    };
    config::write_config(config_path, &config, force)?;
    config::ensure_db_dir(&database)?;
    SqliteStore::open(&database)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", config_path.display()));
        ui::status(Icons::DATABASE, "Database", &database.display().to_string());
    } else {
        let data = serde_json::json!({
            "config": config_path.display().to_string(),
            "database": database.display().to_string(),
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_simulate(
    output_mode: OutputMode,
    config: &MediaSyncConfig,
    script: &Path,
    database: Option<&Path>,
    reset: bool,
) -> anyhow::Result<()> {
    let scenario = scenario::load_scenario(script)?;

    let relations = Arc::new(match database {
        Some(path) => open_for_simulation(path, reset)?,
        None => SqliteStore::open_in_memory()?,
    });
    let content = Arc::new(MemoryTree::new(TreeKind::Content));
    let media = Arc::new(MemoryTree::new(TreeKind::Media));
    let engine = SyncEngine::start(config, content.clone(), media.clone(), relations.clone())?;
    let host = ContentHost::new(content.clone(), Arc::new(engine));

    let mut runner = ScenarioRunner::new(&host, &*media);
    let outcomes = runner.run(&scenario)?;

    let used_media: BTreeSet<i64> = relations
        .get_by_kind(RelationKind::UsageLink)?
        .into_iter()
        .map(|r| r.child_id)
        .collect();
    let mut usage = Vec::new();
    for media_id in used_media {
        usage.push((media_id, report::media_usage(&*relations, &*content, media_id)?));
    }
    let audit = Auditor::new(&*relations)
        .with_trees(&*content, &*media)
        .run()?;

    if !output_mode.is_human() {
        let data = serde_json::json!({
            "scenario": scenario.name,
            "steps": outcomes,
            "keys": runner.keys(),
            "relations": relations.all_relations()?,
            "usage": usage
                .iter()
                .map(|(id, nodes)| serde_json::json!({ "media_id": id, "content": nodes }))
                .collect::<Vec<_>>(),
            "audit": audit,
        });
        return emit_success(output_mode, "simulate", data);
    }

    ui::header(&format!(
        "Scenario {}",
        scenario.name.as_deref().unwrap_or(&script.display().to_string())
    ));
    println!("{}", ui::steps_table(&outcomes));

    section("Media folders");
    for node in content.all()? {
        let folder = match relations
            .get_by_parent_and_kind(node.id, RelationKind::StructuralMirror)?
            .first()
        {
            Some(mirror) => media.get_by_id(mirror.child_id)?,
            None => None,
        };
        let target = match folder {
            Some(folder) => format!("{} {} ({})", Icons::FOLDER, folder.name, folder.id),
            None => ui::muted("no folder"),
        };
        ui::summary_row(&format!("{} ({})", node.name, node.id), &target);
    }

    section("Media usage");
    if usage.is_empty() {
        println!("{} No media references.", Icons::EMPTY);
    }
    for (media_id, nodes) in &usage {
        let name = media
            .get_by_id(*media_id)?
            .map(|m| m.name)
            .unwrap_or_else(|| "(missing)".to_string());
        println!("{} {} ({})", Icons::IMAGE, name, media_id);
        println!("{}", ui::usage_table(nodes));
    }

    section("Audit");
    if audit.is_clean() {
        success("Relations are consistent");
    } else {
        println!("{}", ui::audit_table(&audit));
    }
    println!();
    println!("{}", relations.stats()?);
    Ok(())
}

/// Open a file database for a scenario run. The scenario starts from empty
/// trees, so relations left by an earlier run would claim the new node ids.
fn open_for_simulation(path: &Path, reset: bool) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(path)?;
    let store = SqliteStore::open(path)?;
    let existing = store.count_relations()?;
    if existing > 0 {
        if !reset {
            anyhow::bail!(
                "{} already holds {} relations (pass --reset to clear them before simulating)",
                path.display(),
                existing
            );
        }
        let cleared = store.clear_relations()?;
        tracing::info!(database = %path.display(), cleared, "cleared relations before simulating");
    }
    Ok(store)
}

pub fn run_relations(output_mode: OutputMode, database: &Path, kind: Option<&str>) -> anyhow::Result<()> {
    let store = open_existing(database)?;
    let relations = match kind {
        Some(kind) => store.get_by_kind(kind.parse::<RelationKind>()?)?,
        None => store.all_relations()?,
    };

    if output_mode.is_human() {
        ui::status(Icons::LINK, "Relations", &relations.len().to_string());
        if relations.is_empty() {
            println!("{} No relations found.", Icons::EMPTY);
        } else {
            println!("{}", ui::relations_table(&relations));
        }
    } else {
        emit_success(output_mode, "relations", serde_json::to_value(&relations)?)?;
    }
    Ok(())
}

pub fn run_usage(output_mode: OutputMode, database: &Path, media_id: i64) -> anyhow::Result<()> {
    let store = open_existing(database)?;
    let links = store.get_by_child_and_kind(media_id, RelationKind::UsageLink)?;
    let content_ids: BTreeSet<i64> = links.iter().map(|r| r.parent_id).collect();

    if output_mode.is_human() {
        println!("{} Content referencing media {}:", Icons::MAG, media_id);
        if content_ids.is_empty() {
            println!("{} Not referenced.", Icons::EMPTY);
        }
        for id in &content_ids {
            println!("- {}", id);
        }
    } else {
        let data = serde_json::json!({
            "media_id": media_id,
            "content_ids": content_ids,
        });
        emit_success(output_mode, "usage", data)?;
    }
    Ok(())
}

pub fn run_audit(output_mode: OutputMode, database: &Path) -> anyhow::Result<()> {
    let store = open_existing(database)?;
    let audit = Auditor::new(&store).run()?;

    if output_mode.is_human() {
        if audit.is_clean() {
            success("No duplicate or shared folders");
        } else {
            ui::warn(&format!(
                "{} duplicate, {} shared",
                audit.duplicate_mirrors.len(),
                audit.shared_folders.len()
            ));
            println!("{}", ui::audit_table(&audit));
        }
    } else {
        emit_success(output_mode, "audit", serde_json::to_value(&audit)?)?;
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, database: &Path) -> anyhow::Result<()> {
    let store = open_existing(database)?;
    let stats = store.stats()?;

    if output_mode.is_human() {
        println!("{} Mediasync Statistics ({})", Icons::STATS, database.display());
        let relation_types = stats.relation_types.to_string();
        let structural = stats.structural.to_string();
        let usage = stats.usage.to_string();
        println!(
            "{}",
            ui::stats_table(&[
                ("Relation types", relation_types.as_str()),
                ("Folder relations", structural.as_str()),
                ("Usage relations", usage.as_str()),
            ])
        );
    } else {
        let data = serde_json::json!({
            "relation_types": stats.relation_types,
            "structural": stats.structural,
            "usage": stats.usage,
        });
        emit_success(output_mode, "stats", data)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "name": "two pages",
        "steps": [
            { "op": "create", "key": "home", "name": "Home", "type": "page" },
            { "op": "create", "key": "about", "name": "About", "type": "page", "parent": "home" }
        ]
    }"#;

    fn mirror_count(path: &Path) -> usize {
        SqliteStore::open(path)
            .unwrap()
            .count_by_kind(RelationKind::StructuralMirror)
            .unwrap()
    }

    #[test]
    fn test_simulate_twice_into_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("site.json");
        std::fs::write(&script, SCENARIO).unwrap();
        let database = dir.path().join("relations.db");
        let config = MediaSyncConfig::default();

        run_simulate(OutputMode::Json, &config, &script, Some(&database), false).unwrap();
        assert_eq!(mirror_count(&database), 2);

        let err = run_simulate(OutputMode::Json, &config, &script, Some(&database), false).unwrap_err();
        assert!(err.to_string().contains("--reset"));
        assert_eq!(mirror_count(&database), 2);

        run_simulate(OutputMode::Json, &config, &script, Some(&database), true).unwrap();
        let store = SqliteStore::open(&database).unwrap();
        let mirrors = store.get_by_kind(RelationKind::StructuralMirror).unwrap();
        let pairs: Vec<(i64, i64)> = mirrors.iter().map(|r| (r.parent_id, r.child_id)).collect();
        assert_eq!(pairs, vec![(1000, 1), (1001, 2)]);
    }
}
