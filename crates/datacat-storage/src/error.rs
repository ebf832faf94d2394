use datacat_core::CoreError;

/// Maps an object store failure to the shared storage error, keeping context.
pub(crate) fn storage_error(context: &str, err: object_store::Error) -> CoreError {
    CoreError::storage(format!("failed to {context}: {err}"))
}
