use thiserror::Error;

use crate::keys::KeyError;

/// Broad classification of a [`CoreError`], used to pick the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client input is malformed or incomplete.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The request touches something the access policy forbids.
    Policy,
    /// Store, crypto or runtime failure.
    Internal,
}

/// Canonical error type for catalog operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required request parameter is absent.
    #[error("missing required parameter `{0}`")]
    MissingParameters(&'static str),

    /// Supplied key material is not a usable public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(#[source] KeyError),

    /// Request body is not valid JSON for the endpoint.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// Document body is empty or not a JSON object.
    #[error("no document data provided")]
    NoDataProvided,

    /// A pattern predicate carries an invalid expression.
    #[error("invalid pattern for field `{field}`: {message}")]
    InvalidPattern {
        /// Field the pattern was supplied for.
        field: String,
        /// Parser error reported for the pattern.
        message: String,
    },

    /// Referenced consumer does not exist.
    #[error("consumer `{0}` was not found")]
    InvalidConsumerId(String),

    /// Key is not one of the consumer's access keys.
    #[error("key `{0}` is not an access key of this consumer")]
    InvalidKeyId(String),

    /// Referenced document does not exist in the collection.
    #[error("document `{0}` was not found")]
    InvalidDocumentId(String),

    /// Collection lies under a reserved namespace.
    #[error("collection `{0}` is restricted")]
    RestrictedCollection(String),

    /// Primary api key could not be generated or persisted.
    #[error("error creating api key: {0}")]
    ApiKeyCreation(String),

    /// Access key could not be persisted.
    #[error("error storing access key: {0}")]
    StoringAccessKey(String),

    /// Access key record could not be removed.
    #[error("error removing key: {0}")]
    RemovingKey(String),

    /// Consumer record could not be updated.
    #[error("error updating consumer record: {0}")]
    UpdatingConsumerRecord(String),

    /// Consumer record could not be created.
    #[error("error registering consumer: {0}")]
    RegisteringConsumer(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable wire code reported to API callers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingParameters(_) => "MISSING_PARAMETERS",
            Self::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
            Self::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
            Self::NoDataProvided => "NO_DATA_PROVIDED",
            Self::InvalidPattern { .. } => "INVALID_FILTER_PATTERN",
            Self::InvalidConsumerId(_) => "INVALID_CONSUMER_ID",
            Self::InvalidKeyId(_) => "INVALID_KEY_ID",
            Self::InvalidDocumentId(_) => "INVALID_DOCUMENT_ID",
            Self::RestrictedCollection(_) => "RESTRICTED_DATA_COLLECTION",
            Self::ApiKeyCreation(_) => "ERROR_CREATING_API_KEY",
            Self::StoringAccessKey(_) => "ERROR_STORING_ACCESS_KEY",
            Self::RemovingKey(_) => "ERROR_REMOVING_KEY",
            Self::UpdatingConsumerRecord(_) => "ERROR_UPDATING_CONSUMER_RECORD",
            Self::RegisteringConsumer(_) => "ERROR_REGISTERING_CONSUMER",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classification of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameters(_)
            | Self::InvalidPublicKey(_)
            | Self::InvalidRequestBody(_)
            | Self::NoDataProvided
            | Self::InvalidPattern { .. } => ErrorKind::Validation,
            Self::InvalidConsumerId(_) | Self::InvalidKeyId(_) | Self::InvalidDocumentId(_) => {
                ErrorKind::NotFound
            }
            Self::RestrictedCollection(_) => ErrorKind::Policy,
            Self::ApiKeyCreation(_)
            | Self::StoringAccessKey(_)
            | Self::RemovingKey(_)
            | Self::UpdatingConsumerRecord(_)
            | Self::RegisteringConsumer(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Creates a `Storage` variant.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
