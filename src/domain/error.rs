//! Domain error types.

/// Top-level error type for portsim.
#[derive(Debug, thiserror::Error)]
pub enum PortsimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error in {source_name}: {reason}")]
    Data { source_name: String, reason: String },

    #[error("no data: {what}")]
    NoData { what: String },

    #[error(
        "allocation shortfall for class {class} in portfolio {portfolio}: assigned {assigned:.4} of {target:.4}"
    )]
    AllocationShortfall {
        class: String,
        portfolio: usize,
        assigned: f64,
        target: f64,
    },

    #[error("portfolio table is empty")]
    EmptyPortfolioTable,

    #[error("no asset could be simulated")]
    NoSimulatedAssets,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortsimError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PortsimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        PortsimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&PortsimError> for std::process::ExitCode {
    fn from(err: &PortsimError) -> Self {
        let code: u8 = match err {
            PortsimError::Io(_) => 1,
            PortsimError::ConfigParse { .. }
            | PortsimError::ConfigMissing { .. }
            | PortsimError::ConfigInvalid { .. } => 2,
            PortsimError::Data { .. } | PortsimError::Csv(_) => 3,
            PortsimError::AllocationShortfall { .. } | PortsimError::EmptyPortfolioTable => 4,
            PortsimError::NoData { .. } | PortsimError::NoSimulatedAssets => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message_names_section_and_key() {
        let err = PortsimError::invalid("portfolios", "min_weight", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [portfolios] min_weight: must be positive"
        );
    }

    #[test]
    fn shortfall_message_formats_weights() {
        let err = PortsimError::AllocationShortfall {
            class: "Bonds".into(),
            portfolio: 3,
            assigned: 0.38,
            target: 0.4,
        };
        assert_eq!(
            err.to_string(),
            "allocation shortfall for class Bonds in portfolio 3: assigned 0.3800 of 0.4000"
        );
    }

    #[test]
    fn exit_codes_group_by_family() {
        use std::process::ExitCode;
        let config = PortsimError::missing("data", "prices");
        let data = PortsimError::Data {
            source_name: "prices.csv".into(),
            reason: "bad".into(),
        };
        let code = |e: &PortsimError| format!("{:?}", ExitCode::from(e));
        assert_eq!(code(&config), format!("{:?}", ExitCode::from(2u8)));
        assert_eq!(code(&data), format!("{:?}", ExitCode::from(3u8)));
        assert_eq!(
            code(&PortsimError::NoSimulatedAssets),
            format!("{:?}", ExitCode::from(5u8))
        );
    }
}
