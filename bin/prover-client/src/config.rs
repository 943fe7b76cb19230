use std::{fs, path::Path};

use format_serde_error::SerdeError;
use rollup_prover_orchestrator::OrchestratorConfig;
use serde::Deserialize;

use crate::{args::Args, errors::InitError};

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// OpenTelemetry collector to export spans to.
    pub otlp_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Overrides config values with the ones passed over the command line.
    pub fn update_from_args(&mut self, args: &Args) {
        if let Some(max_concurrent_jobs) = args.max_concurrent_jobs {
            self.orchestrator.max_concurrent_jobs = max_concurrent_jobs;
        }
    }
}

pub fn get_config(args: &Args) -> Result<Config, InitError> {
    let mut config = match &args.config {
        Some(path) => load_configuration(path)?,
        None => Config::default(),
    };
    config.update_from_args(args);
    Ok(config)
}

fn load_configuration(path: &Path) -> Result<Config, InitError> {
    let config_str = fs::read_to_string(path)?;
    let conf =
        toml::from_str::<Config>(&config_str).map_err(|err| SerdeError::new(config_str, err))?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rollup_prover_orchestrator::config::DEFAULT_MAX_CONCURRENT_JOBS;

    use super::*;

    fn args(config: Option<&Path>, max_concurrent_jobs: Option<usize>) -> Args {
        Args {
            config: config.map(Path::to_path_buf),
            num_txs: 4,
            txs: 2,
            public_calls: 1,
            l1_to_l2_messages: 4,
            blocks: 1,
            max_concurrent_jobs,
        }
    }

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
                [orchestrator]
                max_concurrent_jobs = 8

                [logging]
                otlp_url = "http://localhost:4317"
            "#
        )
        .unwrap();

        let config = get_config(&args(Some(file.path()), None)).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_jobs, 8);
        assert_eq!(
            config.logging.otlp_url.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn test_defaults_and_arg_override() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = get_config(&args(Some(file.path()), None)).unwrap();
        assert_eq!(
            config.orchestrator.max_concurrent_jobs,
            DEFAULT_MAX_CONCURRENT_JOBS
        );
        assert!(config.logging.otlp_url.is_none());

        let config = get_config(&args(None, Some(3))).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_jobs, 3);
    }

    #[test]
    fn test_malformed_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[orchestrator]\nmax_concurrent_jobs = \"many\"\n").unwrap();
        assert!(matches!(
            get_config(&args(Some(file.path()), None)),
            Err(InitError::MalformedConfig(_))
        ));
    }
}
