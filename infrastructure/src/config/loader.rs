//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "forecast-bot";
const PROJECT_FILES: [&str; 2] = ["forecast-bot.toml", ".forecast-bot.toml"];
const ENV_PREFIX: &str = "FORECAST_BOT_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `FORECAST_BOT_*` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./forecast-bot.toml` or `./.forecast-bot.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/forecast-bot/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Merged provider chain, exposed for callers that need provenance
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Self::files(
            Self::global_config_path().filter(|p| p.exists()).as_deref(),
            Self::project_config_path().as_deref(),
            config_path,
        );
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment
    }

    /// Defaults plus the given files, lowest priority first
    fn files(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(path));
        }
        figment
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns `$XDG_CONFIG_HOME/forecast-bot/config.toml` if set,
    /// otherwise the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe each configuration source and whether it was found
    pub fn config_sources(config_path: Option<&Path>) -> Vec<(String, String, bool)> {
        let mut sources = Vec::new();

        if let Some(path) = config_path {
            sources.push(("Explicit".to_string(), path.display().to_string(), path.exists()));
        }

        match Self::project_config_path() {
            Some(path) => sources.push(("Project".to_string(), path.display().to_string(), true)),
            None => sources.push((
                "Project".to_string(),
                PROJECT_FILES
                    .iter()
                    .map(|f| format!("./{}", f))
                    .collect::<Vec<_>>()
                    .join(" or "),
                false,
            )),
        }

        if let Some(path) = Self::global_config_path() {
            let exists = path.exists();
            sources.push(("Global".to_string(), path.display().to_string(), exists));
        }

        let env_set = std::env::vars().any(|(k, _)| k.starts_with(ENV_PREFIX));
        sources.push(("Env".to_string(), format!("{}*", ENV_PREFIX), env_set));

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_domain::AggregationMethod;
    use std::io::Write;

    fn write_toml(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.bot.research_reports_per_question, 1);
        assert!(config.quotas.models.is_empty());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("forecast-bot"));
    }

    #[test]
    fn test_later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_toml(
            dir.path(),
            "global.toml",
            "[bot]\nresearch_reports_per_question = 4\naggregation = \"mean\"\n",
        );
        let explicit = write_toml(
            dir.path(),
            "explicit.toml",
            "[bot]\nresearch_reports_per_question = 2\n",
        );

        let config: FileConfig = ConfigLoader::files(Some(&global), None, Some(&explicit))
            .extract()
            .unwrap();

        assert_eq!(config.bot.research_reports_per_question, 2);
        assert_eq!(
            config.bot_config().aggregation,
            AggregationMethod::Mean
        );
        assert_eq!(config.bot.predictions_per_research_report, 1);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write_toml(dir.path(), "broken.toml", "[bot\nresearch = ");

        let result: Result<FileConfig, _> =
            ConfigLoader::files(None, None, Some(&broken)).extract();
        assert!(result.is_err());
    }
}
