use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Normalization error: {message}")]
    Normalization { message: String },

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Generation error: {model} - {message}")]
    Generation { model: String, message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Query execution error: {message}")]
    QueryExecution { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn normalization(message: impl Into<String>) -> Self {
        Self::Normalization {
            message: message.into(),
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    pub fn generation(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn query_execution(message: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a failed LLM call should be retried against the fallback model
    pub fn is_retryable_with_fallback(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::Parse { .. })
    }

    /// Short machine-readable code for API responses and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normalization { .. } => "normalization_error",
            Self::Analysis { .. } => "analysis_error",
            Self::Generation { .. } => "generation_error",
            Self::Parse { .. } => "parse_error",
            Self::QueryExecution { .. } => "query_execution_error",
            Self::Store { .. } => "store_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Validation { .. } => "validation_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Message suitable for showing to the person asking the question
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Normalization { .. } | Self::Analysis { .. } => {
                "No pude entender completamente tu consulta. ¿Podrías reformularla de otra manera?"
            }
            Self::Generation { .. } | Self::Parse { .. } => {
                "Hubo un problema al procesar tu consulta. Por favor, intenta de nuevo o reformula tu pregunta."
            }
            Self::QueryExecution { .. } => {
                "Hubo un problema al buscar la información solicitada. Por favor, intenta con una consulta más específica."
            }
            Self::Store { .. } => {
                "Hubo un problema al acceder a los datos. Por favor, verifica que la información que buscas existe."
            }
            Self::Configuration { .. } => {
                "Hay un problema con la configuración del sistema. Por favor, contacta al administrador."
            }
            Self::Validation { .. } => "La consulta no es válida. Por favor, revisa el texto enviado.",
            Self::Internal { .. } => {
                "Ocurrió un error inesperado. Por favor, intenta de nuevo más tarde."
            }
        }
    }
}
