//! CLI subcommands

pub mod health;
pub mod predict;

use clap::ValueEnum;

/// Model selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Attrition,
    Performance,
    Retention,
}

impl ModelKind {
    /// Single-record endpoint path
    pub fn single_path(self) -> &'static str {
        match self {
            ModelKind::Attrition => "predict_attrition",
            ModelKind::Performance => "predict_performance",
            ModelKind::Retention => "predict_retention",
        }
    }

    /// CSV upload endpoint path
    pub fn bulk_path(self) -> &'static str {
        match self {
            ModelKind::Attrition => "predict_attrition_bulk",
            ModelKind::Performance => "predict_performance_bulk",
            ModelKind::Retention => "predict_retention_bulk",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(ModelKind::Retention.single_path(), "predict_retention");
        assert_eq!(ModelKind::Attrition.bulk_path(), "predict_attrition_bulk");
    }
}
