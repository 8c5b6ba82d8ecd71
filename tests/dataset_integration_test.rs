use ai4scr_data_utility::{
    CsvSource, Dataset, DatasetError, DatasetOptions, DatasetSource, DownloadSettings, Fetcher,
    HttpDownloader, ManagedDataset, RecipeArgs, RecipeRegistry, Samples,
};
use anyhow::Result;
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CSV_BODY: &str = "id,age,name\n1,30,ann\n2,,bob\n3,45,cleo\n";

fn fetcher() -> Arc<dyn Fetcher> {
    let settings = DownloadSettings {
        retry_attempts: 0,
        retry_delay: Duration::from_millis(10),
        ..DownloadSettings::default()
    };
    Arc::new(HttpDownloader::new(settings).unwrap())
}

fn options(cache: &TempDir) -> DatasetOptions {
    DatasetOptions::default().with_cache_root(cache.path())
}

#[tokio::test]
async fn test_download_process_and_cache() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/data.csv")
            .header("user-agent", "dataset-user");
        then.status(200).body(CSV_BODY);
    });

    let source = CsvSource::new("DB", "Drug", &server.url("/data.csv"));
    let dataset = ManagedDataset::open_with(source, options(&cache), fetcher()).await?;

    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.get(0)?.get("age"), Some(&json!(30)));
    assert_eq!(dataset.get(1)?.get("age"), Some(&json!(null)));
    assert_eq!(dataset.get(2)?.get("name"), Some(&json!("cleo")));
    assert!(matches!(
        dataset.get(3),
        Err(DatasetError::IndexOutOfRange { index: 3, len: 3 })
    ));

    let module_dir = cache.path().join("drug");
    assert_eq!(dataset.cache_dir(), module_dir.as_path());
    assert!(module_dir.join("db_raw").is_file());
    assert!(module_dir.join("db.json").is_file());
    assert!(!module_dir.join("db_raw.part").exists());

    // 第二次開啟使用快取，不再下載
    let source = CsvSource::new("db", "drug", &server.url("/data.csv"));
    let reopened = ManagedDataset::open_with(source, options(&cache), fetcher()).await?;
    assert_eq!(reopened.len(), 3);
    api_mock.assert_hits(1);

    Ok(())
}

#[tokio::test]
async fn test_force_flags() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });
    let url = server.url("/data.csv");

    ManagedDataset::open_with(CsvSource::new("db", "m", &url), options(&cache), fetcher()).await?;

    // 修改原始檔：沒有強制時仍讀取已處理的快取
    let raw = cache.path().join("m").join("db_raw");
    std::fs::write(&raw, "id,age,name\n9,99,zed\n")?;
    let cached =
        ManagedDataset::open_with(CsvSource::new("db", "m", &url), options(&cache), fetcher())
            .await?;
    assert_eq!(cached.len(), 3);

    let reprocessed = ManagedDataset::open_with(
        CsvSource::new("db", "m", &url),
        options(&cache).force_process(true),
        fetcher(),
    )
    .await?;
    assert_eq!(reprocessed.len(), 1);
    assert_eq!(reprocessed.get(0)?.get("id"), Some(&json!(9)));
    api_mock.assert_hits(1);

    let redownloaded = ManagedDataset::open_with(
        CsvSource::new("db", "m", &url),
        options(&cache).force_download(true),
        fetcher(),
    )
    .await?;
    assert_eq!(redownloaded.len(), 3);
    api_mock.assert_hits(2);

    Ok(())
}

#[tokio::test]
async fn test_recipe_output_is_cached_per_arguments() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });
    let url = server.url("/data.csv");

    let incremented = ManagedDataset::open_with(
        CsvSource::new("db", "m", &url),
        options(&cache)
            .with_recipe("increment")
            .with_recipe_arg("column", json!("age"))
            .with_recipe_arg("by", json!(5)),
        fetcher(),
    )
    .await?;
    assert_eq!(incremented.get(0)?.get("age"), Some(&json!(35)));
    assert_eq!(incremented.get(1)?.get("age"), Some(&json!(null)));

    let recipe_file = incremented
        .current_recipe_filename()?
        .expect("recipe file name");
    assert!(recipe_file.starts_with("db_increment_"));
    assert!(cache.path().join("m").join(&recipe_file).is_file());
    assert!(cache.path().join("m").join("db.json").is_file());

    let cleaned = ManagedDataset::open_with(
        CsvSource::new("db", "m", &url),
        options(&cache).with_recipe("drop_missing"),
        fetcher(),
    )
    .await?;
    assert_eq!(cleaned.len(), 2);
    assert!(cache.path().join("m").join("db_drop_missing.json").is_file());

    Ok(())
}

#[tokio::test]
async fn test_unknown_recipe_fails_before_download() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });

    let result = ManagedDataset::open_with(
        CsvSource::new("db", "m", &server.url("/data.csv")),
        options(&cache).with_recipe("shuffle"),
        fetcher(),
    )
    .await;

    match result {
        Err(DatasetError::RecipeNotFound { recipe, available }) => {
            assert_eq!(recipe, "shuffle");
            assert!(available.contains("increment"));
        }
        other => panic!("expected RecipeNotFound, got {:?}", other),
    }
    api_mock.assert_hits(0);
    assert!(!cache.path().join("m").exists());

    Ok(())
}

#[tokio::test]
async fn test_failing_recipe_reports_recipe_error() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });

    let result = ManagedDataset::open_with(
        CsvSource::new("db", "m", &server.url("/data.csv")),
        options(&cache)
            .with_recipe("increment")
            .with_recipe_arg("column", json!("name")),
        fetcher(),
    )
    .await;

    assert!(matches!(result, Err(DatasetError::RecipeFailed { .. })));
    assert!(cache.path().join("m").join("db.json").is_file());

    Ok(())
}

#[tokio::test]
async fn test_explicit_path_skips_download() -> Result<()> {
    let cache = TempDir::new()?;
    let input = TempDir::new()?;
    let raw = input.path().join("local.csv");
    std::fs::write(&raw, "id;score\n1;0.5\n")?;

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });

    let source = CsvSource::new("db", "m", &server.url("/data.csv")).with_delimiter(b';');
    let dataset =
        ManagedDataset::open_with(source, options(&cache).with_path(&raw), fetcher()).await?;

    assert_eq!(dataset.raw_path(), raw.as_path());
    assert_eq!(dataset.get(0)?.get("score"), Some(&json!(0.5)));
    api_mock.assert_hits(0);

    let missing = ManagedDataset::open_with(
        CsvSource::new("db", "m", &server.url("/data.csv")),
        options(&cache).with_path(input.path().join("missing.csv")),
        fetcher(),
    )
    .await;
    assert!(matches!(missing, Err(DatasetError::FileNotFound { .. })));

    Ok(())
}

#[tokio::test]
async fn test_failed_download_leaves_no_raw_file() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing.csv");
        then.status(404);
    });

    let result = ManagedDataset::open_with(
        CsvSource::new("db", "m", &server.url("/missing.csv")),
        options(&cache),
        fetcher(),
    )
    .await;

    assert!(matches!(
        result,
        Err(DatasetError::DownloadFailed { status: 404, .. })
    ));
    assert!(!cache.path().join("m").join("db_raw").exists());
    assert!(!cache.path().join("m").join("db_raw.part").exists());

    Ok(())
}

#[tokio::test]
async fn test_clear_cache_keeps_other_datasets() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });
    let url = server.url("/data.csv");

    let db =
        ManagedDataset::open_with(CsvSource::new("db", "m", &url), options(&cache), fetcher())
            .await?;
    ManagedDataset::open_with(CsvSource::new("db2", "m", &url), options(&cache), fetcher())
        .await?;
    ManagedDataset::open_with(
        CsvSource::new("db_v2", "m", &url),
        options(&cache).with_recipe("drop_missing"),
        fetcher(),
    )
    .await?;

    let mut removed = db.clear_cache().await?;
    removed.sort();
    assert_eq!(removed, vec!["db.json", "db_raw"]);
    let dir = cache.path().join("m");
    assert!(dir.join("db2.json").is_file());
    assert!(dir.join("db2_raw").is_file());
    assert!(dir.join("db_v2_raw").is_file());
    assert!(dir.join("db_v2.json").is_file());
    assert!(dir.join("db_v2_drop_missing.json").is_file());

    Ok(())
}

#[tokio::test]
async fn test_display() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data.csv");
        then.status(200).body(CSV_BODY);
    });

    let source = CsvSource::new("DB", "m", &server.url("/data.csv"))
        .with_description("Drug interactions");
    let dataset = ManagedDataset::open_with(source, options(&cache), fetcher()).await?;

    let expected = format!(
        "Dataset(\"db\")\nDrug interactions\ncached at {}",
        cache.path().join("m").display()
    );
    assert_eq!(dataset.to_string(), expected);

    Ok(())
}

/// 自訂資料來源：每行一個樣本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Lines(Vec<String>);

impl Samples for Lines {
    type Item = String;

    fn sample_count(&self) -> usize {
        self.0.len()
    }

    fn sample(&self, index: usize) -> ai4scr_data_utility::Result<String> {
        Ok(self.0[index].clone())
    }
}

struct LinesSource {
    url: String,
}

impl DatasetSource for LinesSource {
    type Data = Lines;

    fn name(&self) -> &str {
        "words"
    }

    fn module(&self) -> &str {
        "custom"
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn process_raw_data(&self, raw_path: &Path) -> ai4scr_data_utility::Result<Lines> {
        let content = std::fs::read_to_string(raw_path)?;
        Ok(Lines(content.lines().map(str::to_string).collect()))
    }

    fn recipes(&self) -> RecipeRegistry<Lines> {
        let mut registry = RecipeRegistry::new();
        registry
            .register("uppercase", |lines: Lines, _args: &RecipeArgs| {
                Ok(Lines(lines.0.iter().map(|l| l.to_uppercase()).collect()))
            })
            .unwrap();
        registry
    }
}

#[tokio::test]
async fn test_custom_source_with_own_recipe() -> Result<()> {
    let cache = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/words.txt");
        then.status(200).body("alpha\nbeta\n");
    });

    let source = LinesSource {
        url: server.url("/words.txt"),
    };
    let mut dataset =
        ManagedDataset::open_with(source, options(&cache).with_recipe("uppercase"), fetcher())
            .await?;

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.get(1)?, "BETA");
    assert!(cache.path().join("custom").join("words_uppercase.json").is_file());

    // setup 可重複呼叫，結果來自快取
    dataset.setup().await?;
    assert_eq!(dataset.into_data(), Some(Lines(vec!["ALPHA".into(), "BETA".into()])));

    Ok(())
}
