// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use halimede::locate::{locate_edge, locate_node};
use halimede::model::{EdgeKey, NodeIdent, ShapeKind};
use halimede::ops::{apply_edit, apply_edits, EditOp};

mod fixtures;
mod profiler;

// Benchmark identity (keep stable):
// - Group names: `ops.apply`, `ops.locate`
// - Case IDs (the string after the `/`) must remain stable across refactors.
fn ident(value: &str) -> NodeIdent {
    NodeIdent::new(value).expect("node ident")
}

fn relabel_ops(params: fixtures::DagParams, count: usize) -> Vec<EditOp> {
    (0..count)
        .map(|idx| {
            let layer = idx % (params.layers - 1);
            let node = idx % params.nodes_per_layer;
            EditOp::RelabelEdge {
                edge: EdgeKey::new(
                    ident(&fixtures::node_id(layer, node)),
                    ident(&fixtures::node_id(layer + 1, node)),
                ),
                label: format!("step {idx}"),
            }
        })
        .collect()
}

fn benches_ops(c: &mut Criterion) {
    let case = fixtures::Case::MediumDense;
    let params = case.params();
    let source = fixtures::fixture(case);
    let last_layer = params.layers - 1;

    let mut group = c.benchmark_group("ops.apply");

    let create = EditOp::CreateNode {
        id: "bench_new".to_owned(),
        kind: ShapeKind::Decision,
        label: "Bench".to_owned(),
    };
    group.throughput(Throughput::Elements(1));
    group.bench_function("create_node", |b| {
        b.iter(|| black_box(apply_edit(black_box(&source), &create).expect("create").len()))
    });

    let delete = EditOp::DeleteNode { id: ident(&fixtures::node_id(last_layer / 2, 0)) };
    group.bench_function("delete_node", |b| {
        b.iter(|| black_box(apply_edit(black_box(&source), &delete).expect("delete").len()))
    });

    let reroute = EditOp::RerouteDestination {
        edge: EdgeKey::new(ident(&fixtures::node_id(0, 0)), ident(&fixtures::node_id(1, 0))),
        new_target: ident(&fixtures::node_id(last_layer, 1)),
        new_node: None,
    };
    group.bench_function("reroute_destination", |b| {
        b.iter(|| black_box(apply_edit(black_box(&source), &reroute).expect("reroute").len()))
    });

    for count in [10usize, 50] {
        let ops = relabel_ops(params, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("relabel_batch_{count}"), |b| {
            b.iter(|| black_box(apply_edits(black_box(&source), &ops).expect("relabel").len()))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("ops.locate");
    let deep = fixtures::node_id(last_layer, params.nodes_per_layer - 1);
    group.bench_function("node_last_layer", |b| {
        b.iter(|| black_box(locate_node(black_box(&source), &deep).map(|found| found.line)))
    });
    let from = fixtures::node_id(0, params.nodes_per_layer - 1);
    let to = fixtures::node_id(1, params.nodes_per_layer - 1);
    group.bench_function("edge_first_layer", |b| {
        b.iter(|| black_box(locate_edge(black_box(&source), &from, &to).map(|found| found.line)))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_ops
}
criterion_main!(benches);
