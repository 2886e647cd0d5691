//! Hardhat compilation artifacts

use std::{fs, path::Path};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid artifact json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("artifact {0} has no creation bytecode")]
    MissingBytecode(String),
    #[error("constructor expects {expected} arguments, got {given}")]
    ArgumentCount { expected: usize, given: usize },
    #[error("invalid constructor argument {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },
}

/// ABI and creation bytecode of one compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub contract_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let artifact = Self::from_json(&raw)?;
        tracing::debug!(path = %path.as_ref().display(), name = %artifact.contract_name, "loaded artifact");
        Ok(artifact)
    }

    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(raw)?;
        // abstract contracts and interfaces compile to `0x`
        if artifact.bytecode.is_empty() {
            return Err(ArtifactError::MissingBytecode(artifact.contract_name));
        }
        Ok(artifact)
    }

    /// Number of declared constructor inputs.
    pub fn constructor_arity(&self) -> usize {
        self.abi.constructor.as_ref().map_or(0, |c| c.inputs.len())
    }

    /// Like [`Self::constructor_args`], falling back to `default` when no
    /// argument was given and `default` fits the constructor.
    pub fn constructor_args_or_default(
        &self,
        raw: &[String],
        default: &[&str],
    ) -> Result<Vec<DynSolValue>, ArtifactError> {
        if raw.is_empty() && !default.is_empty() && default.len() == self.constructor_arity() {
            return self.constructor_args(default);
        }
        self.constructor_args(raw)
    }

    /// Parse textual constructor arguments against the declared constructor inputs.
    pub fn constructor_args<S: AsRef<str>>(
        &self,
        raw: &[S],
    ) -> Result<Vec<DynSolValue>, ArtifactError> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();
        if inputs.len() != raw.len() {
            return Err(ArtifactError::ArgumentCount {
                expected: inputs.len(),
                given: raw.len(),
            });
        }
        inputs
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(index, (param, value))| {
                let ty: DynSolType = param
                    .resolve()
                    .map_err(|err| ArtifactError::InvalidArgument {
                        index,
                        reason: err.to_string(),
                    })?;
                ty.coerce_str(value.as_ref())
                    .map_err(|err| ArtifactError::InvalidArgument {
                        index,
                        reason: err.to_string(),
                    })
            })
            .collect()
    }
}
