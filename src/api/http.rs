// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use reqwest::Url;
use serde::de::DeserializeOwned;

use super::types::{
    DiagramDocument, PatchSpec, SaveRequest, SaveResponse, ValidateRequest, ValidateResponse,
};
use super::{ApiError, DiagramStore, SessionScope};
use crate::model::DiagramId;
use crate::validate::{Validator, Verdict};

/// REST client for the diagram routes of the backend.
#[derive(Debug, Clone)]
pub struct HttpDiagramApi {
    client: reqwest::Client,
    base_url: String,
    scope: SessionScope,
}

impl HttpDiagramApi {
    pub fn new(base_url: impl Into<String>, scope: SessionScope) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, scope)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        scope: SessionScope,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, scope }
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    /// The id is percent-encoded as a single path segment.
    fn diagram_url(&self, id: &DiagramId) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidUrl { url: self.base_url.clone() };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(["api", "diagram", id.as_str()]);
        Ok(url)
    }

    fn validate_url(&self) -> String {
        format!("{}/api/validate", self.base_url)
    }

    pub async fn validate_content(&self, content: &str) -> Result<ValidateResponse, ApiError> {
        let response = self
            .client
            .post(self.validate_url())
            .query(&self.scope.query())
            .json(&ValidateRequest { content })
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

fn network(err: reqwest::Error) -> ApiError {
    ApiError::Network { message: err.to_string() }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status { status: status.as_u16() });
    }
    response.json::<T>().await.map_err(|err| ApiError::Decode { message: err.to_string() })
}

impl DiagramStore for HttpDiagramApi {
    async fn get_diagram(&self, id: &DiagramId) -> Result<DiagramDocument, ApiError> {
        let response = self
            .client
            .get(self.diagram_url(id)?)
            .query(&self.scope.query())
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn save_diagram(
        &self,
        id: &DiagramId,
        content: &str,
        patch: Option<&PatchSpec>,
    ) -> Result<SaveResponse, ApiError> {
        let response = self
            .client
            .post(self.diagram_url(id)?)
            .query(&self.scope.query())
            .json(&SaveRequest { content, patch })
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

impl Validator for HttpDiagramApi {
    async fn validate(&self, content: &str) -> Result<Verdict, ApiError> {
        let response = self.validate_content(content).await?;
        if response.valid {
            return Ok(Verdict::Valid);
        }
        Ok(Verdict::Invalid {
            message: response.error.unwrap_or_else(|| "diagram failed to parse".to_owned()),
            line: response.line,
        })
    }
}
