// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! External document store and validation collaborators.
//!
//! The store is reached through [`DiagramStore`]; [`HttpDiagramApi`] is the REST implementation.
//! Every call is scoped by a [`SessionScope`].

mod http;
pub mod types;

use std::fmt;

use crate::model::{DiagramId, IdError, ProjectId, SessionId};

pub use http::HttpDiagramApi;
pub use types::{
    ClientMessage, DiagramDocument, PatchSpec, SaveRequest, SaveResponse, ServerMessage,
    ValidateRequest, ValidateResponse,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The `(project, session)` pair was incomplete. Caller error, never sent over the wire.
    MissingScope { field: &'static str },
    InvalidScope { field: &'static str, reason: IdError },
    /// The configured base url cannot carry a path.
    InvalidUrl { url: String },
    Network { message: String },
    Status { status: u16 },
    Decode { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScope { field } => write!(f, "missing {field} for scoped request"),
            Self::InvalidScope { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::InvalidUrl { url } => write!(f, "invalid base url {url:?}"),
            Self::Network { message } => write!(f, "network error: {message}"),
            Self::Status { status } => write!(f, "unexpected http status {status}"),
            Self::Decode { message } => write!(f, "failed to decode response: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// The `(project, session)` pair qualifying every REST call and the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScope {
    project: ProjectId,
    session: SessionId,
}

impl SessionScope {
    pub fn new(project: Option<&str>, session: Option<&str>) -> Result<Self, ApiError> {
        let project = require_segment("project", project)?;
        let session = require_segment("session", session)?;
        Ok(Self {
            project: ProjectId::new(project)
                .map_err(|reason| ApiError::InvalidScope { field: "project", reason })?,
            session: SessionId::new(session)
                .map_err(|reason| ApiError::InvalidScope { field: "session", reason })?,
        })
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn query(&self) -> [(&'static str, &str); 2] {
        [("project", self.project.as_str()), ("session", self.session.as_str())]
    }
}

fn require_segment<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::MissingScope { field }),
    }
}

/// Reads and writes diagram documents held by the backend.
#[allow(async_fn_in_trait)]
pub trait DiagramStore {
    async fn get_diagram(&self, id: &DiagramId) -> Result<DiagramDocument, ApiError>;

    async fn save_diagram(
        &self,
        id: &DiagramId,
        content: &str,
        patch: Option<&PatchSpec>,
    ) -> Result<SaveResponse, ApiError>;
}
