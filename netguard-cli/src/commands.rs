//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use netguard_ml::config::{CONFIG_FILE_NAME, NetguardConfig, load_config};
use netguard_ml::data::CsvSource;
use netguard_ml::data::synthetic::generate_traffic;
use netguard_ml::pipeline::{PushOutcome, TrainingPipeline, predict_file, push_records};
use anyhow::Context;
use netguard_ml::store::{RetryPolicy, open_store};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Train => handle_train(&load(workspace, config_file)?).await,
        Commands::Predict {
            input,
            model,
            output,
        } => handle_predict(
            &resolve(workspace, &model),
            &resolve(workspace, &input),
            &resolve(workspace, &output),
        ),
        Commands::Push { input } => {
            handle_push(&load(workspace, config_file)?, &resolve(workspace, &input)).await
        }
        Commands::GenerateSample { rows, seed, output } => {
            handle_generate_sample(rows, seed, &resolve(workspace, &output))
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

/// Canonicalize the workspace directory. Every artifact path is anchored here, so a
/// missing directory is an error rather than a silent fallback.
pub fn resolve_workspace(workspace: &Path) -> anyhow::Result<PathBuf> {
    let resolved = workspace
        .canonicalize()
        .with_context(|| format!("Workspace {} is not accessible", workspace.display()))?;
    if !resolved.is_dir() {
        anyhow::bail!("Workspace {} is not a directory", workspace.display());
    }
    Ok(resolved)
}

/// Load the layered configuration and anchor its relative paths at `workspace`.
fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<NetguardConfig> {
    let config_file = config_file.map(|p| resolve(workspace, p));
    let mut config = load_config(workspace, config_file.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.pipeline.artifact_dir = resolve(workspace, &config.pipeline.artifact_dir);
    config.pipeline.final_model_dir = resolve(workspace, &config.pipeline.final_model_dir);
    config.validation.schema_path = resolve(workspace, &config.validation.schema_path);
    if let Some(url) = config.store.url.take() {
        config.store.url = Some(resolve_store_url(workspace, &url));
    }
    Ok(config)
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

fn resolve_store_url(workspace: &Path, url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, location)) if !location.is_empty() => {
            let anchored = resolve(workspace, Path::new(location));
            format!("{scheme}://{}", anchored.display())
        }
        _ => url.to_string(),
    }
}

async fn handle_train(config: &NetguardConfig) -> anyhow::Result<()> {
    let pipeline = TrainingPipeline::from_config(config.clone())?;
    let artifact = pipeline.run().await?;
    println!("Training completed");
    println!("  model:          {}", artifact.model_name);
    println!("  test accuracy:  {:.4}", artifact.test_metrics.accuracy);
    println!("  test f1:        {:.4}", artifact.test_metrics.f1_score);
    println!("  run artifact:   {}", artifact.model_path.display());
    println!(
        "  published to:   {}",
        config.pipeline.final_model_dir.join("model.json").display()
    );
    Ok(())
}

fn handle_predict(model: &Path, input: &Path, output: &Path) -> anyhow::Result<()> {
    let rows = predict_file(model, input, output)?;
    println!("Wrote {} predictions to {}", rows, output.display());
    Ok(())
}

async fn handle_push(config: &NetguardConfig, input: &Path) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    let outcome = push_records(
        store.as_ref(),
        &RetryPolicy::from_config(&config.store),
        &config.store.database,
        &config.store.collection,
        input,
    )
    .await?;
    match outcome {
        PushOutcome::Inserted(n) => println!(
            "Inserted {} records into {}.{}",
            n, config.store.database, config.store.collection
        ),
        PushOutcome::AlreadyPopulated(n) => println!(
            "{}.{} already holds {} records; nothing inserted",
            config.store.database, config.store.collection, n
        ),
    }
    Ok(())
}

fn handle_generate_sample(rows: usize, seed: u64, output: &Path) -> anyhow::Result<()> {
    if rows == 0 {
        anyhow::bail!("--rows must be at least 1");
    }
    CsvSource::write(output, &generate_traffic(rows, seed))?;
    println!("Wrote {} synthetic records to {}", rows, output.display());
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = config_file
                .map(|p| resolve(workspace, p))
                .unwrap_or_else(|| workspace.join(CONFIG_FILE_NAME));
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml_str = toml::to_string_pretty(&NetguardConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SCHEMA: &str = "\
columns:
  src_ip: object
  dst_ip: object
  protocol: object
  label: object
  bytes: int64
  packets: int64
target_column: label
positive_label: attack
";

    #[tokio::test]
    async fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let config_path = workspace.join(CONFIG_FILE_NAME);
        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: NetguardConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, NetguardConfig::default());
    }

    #[tokio::test]
    async fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        let config_path = workspace.join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[store]\nmax_retries = 7\n").unwrap();

        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, workspace, None).await.unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "[store]\nmax_retries = 7\n");
    }

    #[test]
    fn test_load_anchors_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[store]\nurl = \"jsonl://records\"\n",
        )
        .unwrap();
        let config = load(dir.path(), None).unwrap();
        assert_eq!(config.pipeline.artifact_dir, dir.path().join("Artifacts"));
        assert_eq!(
            config.validation.schema_path,
            dir.path().join("data_schema").join("schema.yaml")
        );
        assert_eq!(
            config.store.url,
            Some(format!("jsonl://{}", dir.path().join("records").display()))
        );
    }

    #[tokio::test]
    async fn test_train_with_missing_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = handle_command(Commands::Train, dir.path(), Some(Path::new("typo.toml")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
        assert!(!dir.path().join("Artifacts").exists());
    }

    #[test]
    fn test_resolve_workspace_rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_workspace(dir.path()).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());

        let missing = dir.path().join("no_such_workspace");
        let err = resolve_workspace(&missing).unwrap_err();
        assert!(err.to_string().contains("no_such_workspace"));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(resolve_workspace(&file).is_err());
    }

    #[test]
    fn test_store_url_without_location_is_untouched() {
        assert_eq!(resolve_store_url(Path::new("/ws"), "jsonl://"), "jsonl://");
        assert_eq!(resolve_store_url(Path::new("/ws"), "records"), "records");
        assert_eq!(
            resolve_store_url(Path::new("/ws"), "sqlite:///abs/net.db"),
            "sqlite:///abs/net.db"
        );
    }

    #[tokio::test]
    async fn test_generate_push_train_predict() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path();
        std::fs::create_dir_all(workspace.join("data_schema")).unwrap();
        std::fs::write(workspace.join("data_schema").join("schema.yaml"), SCHEMA).unwrap();
        std::fs::write(
            workspace.join(CONFIG_FILE_NAME),
            "[store]\nurl = \"jsonl://records\"\nbackoff_base_ms = 1\n",
        )
        .unwrap();

        let sample = PathBuf::from("Network_Data/phishingData.csv");
        handle_command(
            Commands::GenerateSample {
                rows: 200,
                seed: 42,
                output: sample.clone(),
            },
            workspace,
            None,
        )
        .await
        .unwrap();
        assert!(workspace.join(&sample).exists());

        handle_command(
            Commands::Push {
                input: sample.clone(),
            },
            workspace,
            None,
        )
        .await
        .unwrap();
        assert!(
            workspace
                .join("records")
                .join("NETWORK")
                .join("NetworkData.jsonl")
                .exists()
        );

        handle_command(Commands::Train, workspace, None).await.unwrap();
        let model = workspace.join("final_model").join("model.json");
        assert!(model.exists());

        let output = PathBuf::from("prediction_output/output.csv");
        handle_command(
            Commands::Predict {
                input: sample,
                model,
                output: output.clone(),
            },
            workspace,
            None,
        )
        .await
        .unwrap();
        let predictions = CsvSource::read(&workspace.join(output)).unwrap();
        assert_eq!(predictions.row_count(), 200);
        assert_eq!(
            predictions.columns.last().map(String::as_str),
            Some("predicted_column")
        );
    }

    #[tokio::test]
    async fn test_generate_sample_rejects_zero_rows() {
        let dir = TempDir::new().unwrap();
        let command = Commands::GenerateSample {
            rows: 0,
            seed: 1,
            output: PathBuf::from("sample.csv"),
        };
        assert!(handle_command(command, dir.path(), None).await.is_err());
        assert!(!dir.path().join("sample.csv").exists());
    }
}
