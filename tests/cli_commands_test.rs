#![cfg(feature = "cli")]

use ai4scr_data_utility::app::commands::{hash_file, load_catalog, CommandContext};
use ai4scr_data_utility::config::{CatalogConfig, Command};
use ai4scr_data_utility::utils::monitor::ResourceMonitor;
use ai4scr_data_utility::{DatasetError, DownloadSettings, HashMethod, HttpDownloader};
use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn context(server: &MockServer, cache: &TempDir) -> CommandContext {
    let catalog = CatalogConfig::from_toml_str(&format!(
        r#"
[[datasets]]
name = "DB"
module = "drug"
url = "{}"
delimiter = ";"
description = "Drug interaction table"

[[datasets]]
name = "other"
module = "drug"
url = "{}"
"#,
        server.url("/db.csv"),
        server.url("/other.csv")
    ))
    .unwrap();
    let fetcher = Arc::new(HttpDownloader::new(DownloadSettings::default()).unwrap());
    CommandContext::new(catalog, cache.path(), fetcher)
}

fn fetch(name: &str, recipe: Option<&str>, args: Vec<(String, serde_json::Value)>) -> Command {
    Command::Fetch {
        name: name.to_string(),
        recipe: recipe.map(str::to_string),
        args,
        path: None,
        force_download: false,
        force_process: false,
    }
}

#[tokio::test]
async fn test_list_fetch_info_clean() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    let db_mock = server.mock(|when, then| {
        when.method(GET).path("/db.csv");
        then.status(200).body("id;age\n1;30\n2;40\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/other.csv");
        then.status(200).body("x\n1\n");
    });
    let ctx = context(&server, &cache);

    let listing = ctx.execute(&Command::List).await?;
    assert!(listing.lines().next().unwrap().starts_with("db "));
    assert!(listing.lines().all(|l| l.ends_with("not cached")));

    let report = ctx
        .execute(&fetch(
            "db",
            Some("increment"),
            vec![("column".to_string(), json!("age"))],
        ))
        .await?;
    assert!(report.starts_with("Dataset(\"db\")\nDrug interaction table\n"));
    assert!(report.contains("2 samples"));
    assert!(report.contains("recipe output:"));
    db_mock.assert_hits(1);

    ctx.execute(&fetch("other", None, vec![])).await?;

    let listing = ctx.execute(&Command::List).await?;
    assert!(listing.lines().all(|l| l.ends_with("processed")));

    let info = ctx
        .execute(&Command::Info {
            name: "DB".to_string(),
        })
        .await?;
    assert!(info.contains("module: drug"));
    assert!(info.contains("format: .csv"));
    assert!(info.contains("db_raw"));
    assert!(info.contains("db.json"));
    assert!(!info.contains("other_raw"));

    let cleaned = ctx
        .execute(&Command::Clean {
            name: Some("db".to_string()),
        })
        .await?;
    assert_eq!(cleaned, "Removed 3 cache entries");
    assert!(cache.path().join("drug").join("other.json").is_file());

    let cleaned = ctx.execute(&Command::Clean { name: None }).await?;
    assert_eq!(cleaned, "Removed 2 cache entries");

    Ok(())
}

#[tokio::test]
async fn test_clean_keeps_underscore_sibling() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/db.csv");
        then.status(200).body("id;age\n1;30\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/db_v2.csv");
        then.status(200).body("id,age\n1,31\n");
    });
    let catalog = CatalogConfig::from_toml_str(&format!(
        r#"
[[datasets]]
name = "db"
module = "drug"
url = "{}"
delimiter = ";"

[[datasets]]
name = "db_v2"
module = "drug"
url = "{}"
"#,
        server.url("/db.csv"),
        server.url("/db_v2.csv")
    ))?;
    let fetcher = Arc::new(HttpDownloader::new(DownloadSettings::default())?);
    let ctx = CommandContext::new(catalog, cache.path(), fetcher);

    ctx.execute(&fetch("db", None, vec![])).await?;
    ctx.execute(&fetch(
        "db_v2",
        Some("increment"),
        vec![("column".to_string(), json!("age"))],
    ))
    .await?;

    let info = ctx
        .execute(&Command::Info {
            name: "db".to_string(),
        })
        .await?;
    assert!(info.contains("db_raw"));
    assert!(!info.contains("db_v2"));

    let cleaned = ctx
        .execute(&Command::Clean {
            name: Some("db".to_string()),
        })
        .await?;
    assert_eq!(cleaned, "Removed 2 cache entries");

    let dir = cache.path().join("drug");
    assert!(!dir.join("db_raw").exists());
    assert!(dir.join("db_v2_raw").is_file());
    assert!(dir.join("db_v2.json").is_file());
    let recipe_outputs = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("db_v2_increment_"))
        .count();
    assert_eq!(recipe_outputs, 1);

    Ok(())
}

#[tokio::test]
async fn test_fetch_records_monitor_phases() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/db.csv");
        then.status(200).body("id;age\n1;30\n");
    });
    let ctx = context(&server, &cache).with_monitor(ResourceMonitor::new(true));

    ctx.execute(&fetch("db", None, vec![])).await?;

    if ctx.monitor().is_enabled() {
        let phases: Vec<String> = ctx.monitor().phases().into_iter().map(|p| p.phase).collect();
        assert_eq!(phases, vec!["resolve", "download", "process"]);
    }

    Ok(())
}

#[tokio::test]
async fn test_recipes_and_unknown_dataset() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    let ctx = context(&server, &cache);

    let recipes = ctx
        .execute(&Command::Recipes {
            name: "db".to_string(),
        })
        .await?;
    assert_eq!(recipes, "drop_missing\nincrement\nrename\nselect");

    let missing = ctx
        .execute(&Command::Info {
            name: "nope".to_string(),
        })
        .await;
    assert!(matches!(missing, Err(DatasetError::DatasetNotFound { .. })));

    let bad_recipe = ctx.execute(&fetch("db", Some("shuffle"), vec![])).await;
    assert!(matches!(bad_recipe, Err(DatasetError::RecipeNotFound { .. })));

    Ok(())
}

#[test]
fn test_hash_json_and_toml_agree() -> Result<()> {
    let dir = TempDir::new()?;
    let json_path = dir.path().join("config.json");
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&json_path, r#"{"model": {"layers": 4, "name": "gnn"}, "seed": 42}"#)?;
    std::fs::write(
        &toml_path,
        "seed = 42\n\n[model]\nname = \"gnn\"\nlayers = 4\n",
    )?;

    let from_json = hash_file(&json_path, HashMethod::Sha256)?;
    let from_toml = hash_file(&toml_path, HashMethod::Sha256)?;

    let digest = |line: &str| line.split_whitespace().next().unwrap_or_default().to_string();
    assert_eq!(digest(&from_json), digest(&from_toml));
    assert_eq!(digest(&from_json).len(), 64);

    let sha512 = hash_file(&json_path, "SHA-512".parse()?)?;
    assert_eq!(digest(&sha512).len(), 128);

    assert!(matches!(
        hash_file(&dir.path().join("missing.json"), HashMethod::Sha256),
        Err(DatasetError::FileNotFound { .. })
    ));

    Ok(())
}

#[test]
fn test_load_catalog() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "[[datasets]]\nname = \"db\"\nmodule = \"m\"\nurl = \"https://example.com/db.csv\"\n",
    )?;

    let catalog = load_catalog(Some(path.as_path()))?;
    assert_eq!(catalog.datasets.len(), 1);

    assert!(matches!(
        load_catalog(Some(dir.path().join("missing.toml").as_path())),
        Err(DatasetError::FileNotFound { .. })
    ));

    Ok(())
}
