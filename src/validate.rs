// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Syntax-only acceptance check for candidate sources.
//!
//! Every structural mutation passes its complete post-state through a [`ValidationGate`] before it
//! is committed. The parse itself is delegated to a [`Validator`]: the backend's `validate` route
//! ([`crate::api::HttpDiagramApi`]) or the in-crate [`LocalValidator`].

use tracing::debug;

use crate::api::ApiError;
use crate::format::mermaid::check_source;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// `line` is 1-based when the parser reported one.
    Invalid { message: String, line: Option<usize> },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[allow(async_fn_in_trait)]
pub trait Validator {
    async fn validate(&self, content: &str) -> Result<Verdict, ApiError>;
}

/// Validates with the permissive built-in Mermaid checker. Never fails with a network error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalValidator;

impl LocalValidator {
    pub fn verdict(content: &str) -> Verdict {
        match check_source(content) {
            Ok(_) => Verdict::Valid,
            Err(err) => Verdict::Invalid { line: err.line_no(), message: err.to_string() },
        }
    }
}

impl Validator for LocalValidator {
    async fn validate(&self, content: &str) -> Result<Verdict, ApiError> {
        Ok(Self::verdict(content))
    }
}

impl<V: Validator> Validator for &V {
    async fn validate(&self, content: &str) -> Result<Verdict, ApiError> {
        (**self).validate(content).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationGate<V> {
    validator: V,
}

impl<V: Validator> ValidationGate<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub async fn check(&self, candidate: &str) -> Result<Verdict, ApiError> {
        let verdict = self.validator.validate(candidate).await?;
        match &verdict {
            Verdict::Valid => debug!(bytes = candidate.len(), "candidate accepted"),
            Verdict::Invalid { message, line } => {
                debug!(bytes = candidate.len(), ?line, %message, "candidate rejected")
            }
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_gate_accepts_valid_flowchart() {
        let gate = ValidationGate::new(LocalValidator);
        let verdict = gate.check("flowchart TD\n    A[Start] --> B[End]\n").await.expect("check");
        assert_eq!(verdict, Verdict::Valid);
    }

    #[tokio::test]
    async fn local_gate_reports_line_numbers() {
        let gate = ValidationGate::new(LocalValidator);
        let verdict =
            gate.check("flowchart TD\n    A --> B\n    C[Start --> D\n").await.expect("check");
        match verdict {
            Verdict::Invalid { line, .. } => assert_eq!(line, Some(3)),
            Verdict::Valid => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn missing_declaration_has_no_line() {
        let verdict = LocalValidator.validate("A --> B").await.expect("check");
        assert!(matches!(verdict, Verdict::Invalid { line: None, .. }));
    }
}
