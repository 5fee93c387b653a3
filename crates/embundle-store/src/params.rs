//! Parameter file (`model_weights.json`) I/O.

use std::fs;
use std::path::Path;

use embundle_core::{ModelParams, WriteMode};
use tracing::info;

use crate::StoreError;
use crate::bundle::write_artifact;

pub const PARAMS_FILE: &str = "model_weights.json";

/// Validate and write compact JSON parameters.
pub fn write_params(path: &Path, params: &ModelParams, mode: WriteMode) -> Result<(), StoreError> {
    params.validate()?;
    let json = serde_json::to_vec(params).map_err(StoreError::json(path))?;
    write_artifact(path, &json, mode)?;
    info!(
        path = %path.display(),
        classes = params.num_classes,
        features = params.num_features,
        "wrote model parameters"
    );
    Ok(())
}

/// Read parameters, rejecting documents whose shapes or encoding disagree.
pub fn read_params(path: &Path) -> Result<ModelParams, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(StoreError::io(path))?;
    let params: ModelParams = serde_json::from_slice(&bytes).map_err(StoreError::json(path))?;
    params.validate()?;
    Ok(params)
}
