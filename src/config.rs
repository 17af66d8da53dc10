use std::path::PathBuf;

use crate::acquire::DatasetRef;

/// Dataset analysed by the default run.
pub const DATASET_OWNER: &str = "shriyashjagtap";
pub const DATASET_NAME: &str = "heart-attack-risk-assessment-dataset";

/// Where downloaded files are unpacked.
pub const DOWNLOAD_DIR: &str = "data";

/// Where subset tables and plots are written.
pub const RESULTS_DIR: &str = "analysis_results";

/// Kaggle REST API root.
pub const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";

/// Fonts tried, in order, for plot captions and labels.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dataset: DatasetRef,
    pub download_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetRef::new(DATASET_OWNER, DATASET_NAME),
            download_dir: PathBuf::from(DOWNLOAD_DIR),
            results_dir: PathBuf::from(RESULTS_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dataset_matches_constant() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.dataset.to_string(),
            "shriyashjagtap/heart-attack-risk-assessment-dataset"
        );
        assert_eq!(config.results_dir, PathBuf::from("analysis_results"));
    }
}
