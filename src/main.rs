mod acquire;
mod color;
mod config;
mod data;
mod report;

use anyhow::Result;
use log::error;

use acquire::{DatasetHost, KaggleApi};
use config::PipelineConfig;
use report::ReportSummary;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(&PipelineConfig::default(), &mut KaggleApi::new())?;
    Ok(())
}

/// Acquire the configured dataset and report on it.
///
/// `Ok(None)` means acquisition failed (already logged) and the report was
/// skipped. Errors from the report itself are returned.
fn run<H: DatasetHost>(config: &PipelineConfig, host: &mut H) -> Result<Option<ReportSummary>> {
    let Ok(loaded) = acquire::load_dataset(host, &config.dataset, &config.download_dir) else {
        error!("Failed to load the dataset.");
        return Ok(None);
    };

    let summary = report::run_report(&loaded.table, &config.results_dir)?;
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use acquire::{AcquireError, DatasetRef};
    use tempfile::TempDir;

    struct LocalHost {
        csv: Option<&'static str>,
    }

    impl DatasetHost for LocalHost {
        fn authenticate(&mut self) -> Result<(), AcquireError> {
            match self.csv {
                Some(_) => Ok(()),
                None => Err(AcquireError::MissingCredentials),
            }
        }

        fn download_and_unpack(&self, _: &DatasetRef, target: &Path) -> Result<(), AcquireError> {
            let contents = self.csv.unwrap_or_default();
            std::fs::write(target.join("heart_attack_risk_dataset.csv"), contents).map_err(|source| {
                AcquireError::Io {
                    path: target.to_path_buf(),
                    source,
                }
            })
        }
    }

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            dataset: DatasetRef::new("someone", "heart"),
            download_dir: root.join("data"),
            results_dir: root.join("analysis_results"),
        }
    }

    #[test]
    fn test_full_run() {
        let dir = TempDir::new().unwrap();
        let mut host = LocalHost {
            csv: Some(
                "age,sex,systolic_bp,diastolic_bp,total_cholesterol\n\
                 30,M,130,80,190\n\
                 50,F,150,95,210\n\
                 61,M,142,88,240\n\
                 45,F,118,76,170\n",
            ),
        };

        let summary = run(&config(dir.path()), &mut host).unwrap().unwrap();
        assert_eq!(summary.hypertension_rows, 2);
        assert_eq!(summary.high_cholesterol_rows, 2);
        assert_eq!(summary.outputs.len(), 5);
        assert!(dir.path().join("data/heart_attack_risk_dataset.csv").is_file());
        assert!(dir.path().join("analysis_results/correlation_matrix.png").is_file());
    }

    #[test]
    fn test_failed_acquisition_skips_report() {
        let dir = TempDir::new().unwrap();
        let mut host = LocalHost { csv: None };

        let outcome = run(&config(dir.path()), &mut host).unwrap();
        assert!(outcome.is_none());
        assert!(!dir.path().join("analysis_results").exists());
    }

    #[test]
    fn test_missing_analysis_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut host = LocalHost {
            csv: Some("age,systolic_bp\n30,130\n"),
        };
        assert!(run(&config(dir.path()), &mut host).is_err());
    }
}
