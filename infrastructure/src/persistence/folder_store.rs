//! Folder-backed report store
//!
//! Each saved batch becomes one pretty-printed JSON file named
//! `Forecasts-for-<UTC timestamp>-<N>-questions.json`. Existing files are
//! never replaced: a name already taken gets a `_<n>` suffix after the
//! timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forecast_application::{ReportStore, StoreError};
use forecast_domain::{ForecastReport, RunType, artifact_file_name_with_sequence};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Contents of one saved batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact {
    pub run_type: RunType,
    pub saved_at: DateTime<Utc>,
    pub reports: Vec<ForecastReport>,
}

/// Writes batches into a folder
///
/// The folder passed to [`ReportStore::save_reports`] wins over the
/// store's own default folder.
#[derive(Debug, Clone, Default)]
pub struct FolderReportStore {
    default_folder: Option<PathBuf>,
}

impl FolderReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_folder(folder: impl Into<PathBuf>) -> Self {
        Self {
            default_folder: Some(folder.into()),
        }
    }
}

#[async_trait]
impl ReportStore for FolderReportStore {
    async fn save_reports(
        &self,
        reports: &[ForecastReport],
        run_type: RunType,
        folder: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let Some(folder) = folder.or(self.default_folder.as_deref()) else {
            debug!("No report folder configured, skipping save");
            return Ok(None);
        };
        if reports.is_empty() {
            return Ok(None);
        }

        let saved_at = Utc::now();
        let artifact = ForecastArtifact {
            run_type,
            saved_at,
            reports: reports.to_vec(),
        };
        let json = serde_json::to_string_pretty(&artifact)?;

        tokio::fs::create_dir_all(folder).await?;
        let path = write_new_artifact(folder, saved_at, reports.len(), json.as_bytes()).await?;

        info!(
            "Wrote {} {} report(s) to {}",
            reports.len(),
            run_type,
            path.display()
        );
        Ok(Some(path))
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Create the artifact under the first free name
async fn write_new_artifact(
    folder: &Path,
    saved_at: DateTime<Utc>,
    question_count: usize,
    contents: &[u8],
) -> std::io::Result<PathBuf> {
    let mut last_err = None;
    for sequence in 0..MAX_NAME_ATTEMPTS {
        let path = folder.join(artifact_file_name_with_sequence(
            saved_at,
            sequence,
            question_count,
            "json",
        ));
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match opened {
            Ok(mut file) => {
                file.write_all(contents).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", path.display());
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| ErrorKind::AlreadyExists.into()))
}

/// Errors reading a saved artifact back
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactFile {
    Artifact(ForecastArtifact),
    Reports(Vec<ForecastReport>),
}

/// Read the reports of a saved artifact
///
/// Accepts both the artifact envelope and a bare JSON array of reports.
pub fn load_reports(path: &Path) -> Result<Vec<ForecastReport>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ArtifactFile =
        serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(match file {
        ArtifactFile::Artifact(artifact) => artifact.reports,
        ArtifactFile::Reports(reports) => reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_application::{
        BotConfig, ForecastBatchUseCase, ForecastQuestionUseCase, Metered, Predictor,
        ProviderError, QuotaRegistry, Researcher,
    };
    use forecast_domain::{
        ARTIFACT_PREFIX, AggregationMethod, Model, Question, ReasonedPrediction, ResearchRecord,
    };
    use std::sync::Arc;

    fn report(id: u64, probability: f64) -> ForecastReport {
        ForecastReport::aggregate(
            Question::binary(id, format!("Question {id}?")).unwrap(),
            vec![ResearchRecord::new("research")],
            vec![ReasonedPrediction::binary(probability, "because")],
            vec![],
            &AggregationMethod::Median,
        )
        .unwrap()
    }

    fn artifact_names(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_two_report_batch_writes_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderReportStore::new();
        let reports = vec![report(1, 0.2), report(2, 0.7)];

        let path = store
            .save_reports(&reports, RunType::UnitTest, Some(dir.path()))
            .await
            .unwrap()
            .unwrap();

        let names = artifact_names(dir.path());
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(ARTIFACT_PREFIX));
        assert!(names[0].ends_with("-2-questions.json"));
        assert_eq!(path.file_name().unwrap().to_string_lossy(), names[0]);

        let loaded = load_reports(&path).unwrap();
        assert_eq!(loaded, reports);
    }

    #[tokio::test]
    async fn test_back_to_back_saves_keep_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderReportStore::new();

        let first = store
            .save_reports(&[report(1, 0.3)], RunType::UnitTest, Some(dir.path()))
            .await
            .unwrap()
            .unwrap();
        let second = store
            .save_reports(&[report(2, 0.6)], RunType::UnitTest, Some(dir.path()))
            .await
            .unwrap()
            .unwrap();

        assert_ne!(first, second);
        let names = artifact_names(dir.path());
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with("-1-questions.json")));

        assert_eq!(load_reports(&first).unwrap()[0].question().id(), 1);
        assert_eq!(load_reports(&second).unwrap()[0].question().id(), 2);
    }

    struct FixedResearcher;

    #[async_trait]
    impl Researcher for FixedResearcher {
        fn model(&self) -> Model {
            Model::O3Mini
        }

        async fn run_research(&self, _question: &Question) -> Result<Metered<String>, ProviderError> {
            Ok(Metered::new("research".to_string()))
        }
    }

    struct FixedPredictor;

    #[async_trait]
    impl Predictor for FixedPredictor {
        fn model(&self) -> Model {
            Model::O3Mini
        }

        async fn predict(
            &self,
            _question: &Question,
            _research: &str,
        ) -> Result<Metered<ReasonedPrediction>, ProviderError> {
            Ok(Metered::new(ReasonedPrediction::binary(0.25, "steady")))
        }
    }

    #[tokio::test]
    async fn test_batch_run_saves_one_artifact_into_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::default()
            .with_save_folder(dir.path())
            .with_run_type(RunType::UnitTest);
        let pipeline = ForecastQuestionUseCase::new(
            Arc::new(FixedResearcher),
            Arc::new(FixedPredictor),
            Arc::new(QuotaRegistry::new()),
            config,
        );
        let batch = ForecastBatchUseCase::new(pipeline, Arc::new(FolderReportStore::new()));
        let questions = vec![
            Question::binary(1, "First?").unwrap(),
            Question::binary(2, "Second?").unwrap(),
        ];

        let result = batch.forecast_questions(questions, false).await.unwrap();

        let names = artifact_names(dir.path());
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(ARTIFACT_PREFIX));
        assert!(names[0].ends_with("-2-questions.json"));

        let saved = result.saved_to().unwrap();
        let ids: Vec<_> = load_reports(saved)
            .unwrap()
            .iter()
            .map(|r| r.question().id())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs").join("today");
        let store = FolderReportStore::with_default_folder(&nested);

        let path = store
            .save_reports(&[report(1, 0.5)], RunType::RegularForecast, None)
            .await
            .unwrap();

        assert!(path.unwrap().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_nothing_written_without_folder_or_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderReportStore::new();

        assert!(
            store
                .save_reports(&[report(1, 0.5)], RunType::UnitTest, None)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .save_reports(&[], RunType::UnitTest, Some(dir.path()))
                .await
                .unwrap()
                .is_none()
        );
        assert!(artifact_names(dir.path()).is_empty());
    }

    #[test]
    fn test_load_accepts_bare_report_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");
        let reports = vec![report(3, 0.4)];
        std::fs::write(&path, serde_json::to_string(&reports).unwrap()).unwrap();

        assert_eq!(load_reports(&path).unwrap(), reports);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_reports(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));

        let missing = load_reports(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, LoadError::Io { .. }));
    }
}
