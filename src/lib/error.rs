// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    NotSupported,
    Bug,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NmMatchError {
    kind: ErrorKind,
    msg: String,
}

impl NmMatchError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self { kind, msg }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }
}

impl std::fmt::Display for NmMatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for NmMatchError {}

impl From<serde_json::Error> for NmMatchError {
    fn from(e: serde_json::Error) -> Self {
        NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid property : {e}"),
        )
    }
}

impl From<serde_yaml::Error> for NmMatchError {
    fn from(e: serde_yaml::Error) -> Self {
        NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid YAML string: {e}"),
        )
    }
}

impl From<std::net::AddrParseError> for NmMatchError {
    fn from(e: std::net::AddrParseError) -> Self {
        NmMatchError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address: {e}"),
        )
    }
}
