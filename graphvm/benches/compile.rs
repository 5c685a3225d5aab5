use criterion::{
    BenchmarkId, Criterion, black_box, criterion_group, criterion_main,
};
use graphvm::{compiler::Compiler, graph::NodeGraph, nodes::NodeLibrary};

/// Builds a balanced tree of `ADD_FLOAT` nodes over `n` constants
fn sum_tree(n: usize) -> NodeGraph {
    let lib = NodeLibrary::builtin();
    let value = lib.get("VALUE_FLOAT").unwrap();
    let add = lib.get("ADD_FLOAT").unwrap();

    let mut g = NodeGraph::new();
    let mut layer = (0..n)
        .map(|i| {
            let id = g.add_node(&format!("v{i}"), value.clone()).unwrap();
            g.set_value(id, "value", i as f32).unwrap();
            id
        })
        .collect::<Vec<_>>();
    let mut k = 0;
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                if let [a, b] = pair {
                    let id = g.add_node(&format!("s{k}"), add.clone()).unwrap();
                    k += 1;
                    g.link(*a, "value", id, "value_a").unwrap();
                    g.link(*b, "value", id, "value_b").unwrap();
                    id
                } else {
                    pair[0]
                }
            })
            .collect();
    }
    g.add_output("result", layer[0], "value").unwrap();
    g
}

pub fn compile_sum_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum tree");
    for n in [4, 16, 64] {
        let g = sum_tree(n);
        let mut compiler = Compiler::new();
        group.bench_function(BenchmarkId::new("compile", n), |b| {
            b.iter(|| black_box(compiler.compile(&g).unwrap()))
        });
    }
}

criterion_group!(benches, compile_sum_tree);
criterion_main!(benches);
