// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DagParams {
    pub layers: usize,
    pub nodes_per_layer: usize,
    pub fanout: usize,
    pub label_len: usize,
}

impl DagParams {
    pub const fn new(
        layers: usize,
        nodes_per_layer: usize,
        fanout: usize,
        label_len: usize,
    ) -> Self {
        Self { layers, nodes_per_layer, fanout, label_len }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Small,
    MediumDense,
    LargeLongLabels,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::MediumDense, Case::LargeLongLabels];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::MediumDense => "medium_dense",
            Self::LargeLongLabels => "large_long_labels",
        }
    }

    pub const fn params(self) -> DagParams {
        match self {
            Self::Small => DagParams::new(6, 10, 2, 12),
            Self::MediumDense => DagParams::new(12, 20, 4, 12),
            Self::LargeLongLabels => DagParams::new(24, 35, 4, 64),
        }
    }
}

pub fn node_id(layer: usize, idx: usize) -> String {
    format!("l{layer:02}_n{idx:04}")
}

fn label_for(id: &str, len: usize) -> String {
    let mut label = format!("Node {id} ");
    while label.len() < len {
        label.push('x');
    }
    label.truncate(len.max(1));
    label
}

/// Layered DAG flowchart source, written in "authoring order" (interleaved definitions and
/// connections, reverse layer order) so the formatter has real work to do.
pub fn flowchart(params: DagParams) -> String {
    assert!(params.layers >= 2, "layers must be >= 2");
    assert!(params.nodes_per_layer >= 1, "nodes_per_layer must be >= 1");

    let fanout = params.fanout.clamp(1, params.nodes_per_layer);
    let mut out = String::from("flowchart TD\n");
    for layer in (0..params.layers - 1).rev() {
        for idx in 0..params.nodes_per_layer {
            let from = node_id(layer, idx);
            for k in 0..fanout {
                let to = node_id(layer + 1, (idx + k) % params.nodes_per_layer);
                if k == 0 {
                    let label = label_for(&from, params.label_len);
                    let _ = writeln!(out, "    {from}[\"{label}\"] --> {to}");
                } else {
                    let _ = writeln!(out, "    {from} --> {to}");
                }
            }
        }
    }
    for idx in 0..params.nodes_per_layer {
        let id = node_id(params.layers - 1, idx);
        let label = label_for(&id, params.label_len);
        let _ = writeln!(out, "    {id}{{\"{label}\"}}");
    }
    out
}

pub fn fixture(case: Case) -> String {
    flowchart(case.params())
}

pub fn checksum_text(text: &str) -> u64 {
    text.bytes().fold(0u64, |acc, byte| acc.wrapping_mul(131).wrapping_add(u64::from(byte)))
}
