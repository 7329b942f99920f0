// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram source handling: Mermaid-ish line classification, syntax checking and the
//! canonicalizing formatter.

pub mod autoformat;
pub mod mermaid;

pub use autoformat::{autoformat, FormatError};
