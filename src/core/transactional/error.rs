use thiserror::Error;

use crate::core::domain::propagation::Propagation;
use crate::core::domain::transaction::TransactionError;

#[derive(Debug, Error)]
pub enum TransactionalError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No transactional context defined in your app ... please call initialize_transactional_context() before application start.")]
    NotInitialized,

    #[error("No data source named \"{0}\" ... please call add_transactional_data_source() before application start.")]
    DataSourceNotFound(String),

    #[error("DataSource with name \"{0}\" has already been added.")]
    DuplicateDataSource(String),

    #[error("No hook manager found in context. Are you running inside run_in_transaction()?")]
    NoHookScope,
}

/// A call violated the contract of its declared propagation mode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropagationError {
    #[error("No existing transaction found for transaction marked with propagation 'MANDATORY'")]
    MandatoryWithoutTransaction,

    #[error("Found an existing transaction, transaction marked with propagation 'NEVER'")]
    NeverWithTransaction,
}

impl PropagationError {
    pub fn mode(&self) -> Propagation {
        match self {
            PropagationError::MandatoryWithoutTransaction => Propagation::Mandatory,
            PropagationError::NeverWithTransaction => Propagation::Never,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("Data source \"{data_source}\" exposes interface version {found}, ambient routing supports {expected}; register it with patch disabled or update the adapter")]
    IncompatibleInterface {
        data_source: String,
        expected: u32,
        found: u32,
    },
}

impl TransactionalError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, TransactionalError::Configuration(_))
    }

    pub fn is_propagation_violation(&self) -> bool {
        matches!(self, TransactionalError::Propagation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_carry_their_mode() {
        let err = TransactionalError::from(PropagationError::NeverWithTransaction);
        assert!(err.is_propagation_violation());
        assert!(!err.is_configuration());
        match err {
            TransactionalError::Propagation(violation) => {
                assert_eq!(violation.mode(), Propagation::Never)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            PropagationError::MandatoryWithoutTransaction.mode(),
            Propagation::Mandatory
        );
    }

    #[test]
    fn configuration_errors_name_the_data_source() {
        let err = TransactionalError::from(ConfigurationError::DataSourceNotFound("audit".into()));
        assert!(err.is_configuration());
        assert!(err.to_string().contains("audit"));
    }
}
