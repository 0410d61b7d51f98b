//! Property/fuzz-style invariants for layout mutation.
//!
//! Random operation streams run against the public `Layout` API. After each
//! step every grid must validate, hold no prunable part, and keep view ids
//! unique across grids; the final layout must survive persistence.

use std::collections::BTreeSet;

use proptest::prelude::*;
use workbench_layout::{
    Align, ElementId, ElementKind, Layout, MAIN_AREA, PartGrid, PartOptions, PartPlacement, PartSpec,
    Region, ViewOptions, deserialize_layout, serialize_layout,
};

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state >> 11
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }

    fn ratio(&mut self) -> f64 {
        0.05 + (self.next_u64() % 90) as f64 / 100.0
    }

    fn pick<T: Clone>(&mut self, items: &[T]) -> T {
        items[self.choose_index(items.len())].clone()
    }
}

#[derive(Debug, Clone)]
enum Op {
    AddPart {
        id: String,
        relative_to: ElementId,
        align: Align,
        ratio: f64,
    },
    RemovePart(ElementId),
    AddView {
        part: ElementId,
        activate: bool,
    },
    RemoveView(String),
    ActivateView(String),
    Drop {
        view: String,
        target: ElementId,
        region: Region,
    },
    SetRatio {
        node: ElementId,
        ratio: f64,
    },
}

fn part_ids(layout: &Layout) -> Vec<ElementId> {
    layout.parts().map(|(_, id, _)| id.clone()).collect()
}

fn host_part_ids(layout: &Layout) -> Vec<ElementId> {
    part_ids(layout)
        .into_iter()
        .filter(|id| !id.is_main_area())
        .collect()
}

fn view_ids(layout: &Layout) -> Vec<String> {
    layout.views().map(|view| view.id.to_string()).collect()
}

fn node_ids(layout: &Layout) -> Vec<ElementId> {
    layout
        .grids()
        .flat_map(|(_, grid)| {
            grid.depth_first()
                .into_iter()
                .filter(|id| grid.node(id.as_str()).is_some())
                .collect::<Vec<_>>()
        })
        .collect()
}

const ALIGNS: [Align; 4] = [Align::Left, Align::Right, Align::Top, Align::Bottom];
const REGIONS: [Region; 5] = [
    Region::Center,
    Region::North,
    Region::South,
    Region::East,
    Region::West,
];

fn random_operation(layout: &Layout, rng: &mut Lcg, sequence: usize) -> Op {
    let parts = part_ids(layout);
    let hosts = host_part_ids(layout);
    let views = view_ids(layout);
    let nodes = node_ids(layout);

    let mut candidates = vec![0usize]; // AddPart
    if !hosts.is_empty() {
        candidates.push(1); // RemovePart
        candidates.push(2); // AddView
        candidates.push(2);
    }
    if !views.is_empty() {
        candidates.push(3); // RemoveView
        candidates.push(4); // ActivateView
        candidates.push(5); // Drop
        candidates.push(5);
    }
    if !nodes.is_empty() {
        candidates.push(6); // SetRatio
    }

    match candidates[rng.choose_index(candidates.len())] {
        1 => Op::RemovePart(rng.pick(&hosts)),
        2 => Op::AddView {
            part: rng.pick(&hosts),
            activate: rng.choose_bool(),
        },
        3 => Op::RemoveView(rng.pick(&views)),
        4 => Op::ActivateView(rng.pick(&views)),
        5 if !hosts.is_empty() => Op::Drop {
            view: rng.pick(&views),
            target: rng.pick(&hosts),
            region: rng.pick(&REGIONS),
        },
        6 => Op::SetRatio {
            node: rng.pick(&nodes),
            ratio: rng.ratio(),
        },
        _ => Op::AddPart {
            id: format!("part.fuzz-{sequence}"),
            relative_to: rng.pick(&parts),
            align: rng.pick(&ALIGNS),
            ratio: rng.ratio(),
        },
    }
}

fn apply(layout: &Layout, op: &Op) -> Layout {
    let outcome = match op {
        Op::AddPart {
            id,
            relative_to,
            align,
            ratio,
        } => layout.add_part(
            id.as_str(),
            &PartPlacement::Relative(
                PartSpec::new(*align)
                    .relative_to(relative_to.clone())
                    .ratio(*ratio),
            ),
            &PartOptions::default(),
        ),
        Op::RemovePart(id) => layout.remove_part(id.as_str()),
        Op::AddView { part, activate } => layout.add_view(
            layout.compute_next_view_id(),
            part.as_str(),
            &ViewOptions {
                activate: *activate,
                ..ViewOptions::default()
            },
        ),
        Op::RemoveView(id) => layout.remove_view(id),
        Op::ActivateView(id) => layout.activate_view(id),
        Op::Drop {
            view,
            target,
            region,
        } => layout.move_view_to_region(view, target.as_str(), *region, None, None),
        Op::SetRatio { node, ratio } => layout.set_split_ratio(node.as_str(), *ratio),
    };
    match outcome {
        Ok(next) => next,
        Err(error) => panic!("operation {op:?} failed: {error}"),
    }
}

/// The reference part and its ancestors, which stay visible when the root
/// would otherwise collapse.
fn reference_chain(grid: &PartGrid) -> BTreeSet<ElementId> {
    let mut chain = BTreeSet::new();
    let mut cursor = grid.reference_part_id().cloned();
    while let Some(id) = cursor {
        cursor = grid.element(id.as_str()).and_then(|element| element.parent.clone());
        let _ = chain.insert(id);
    }
    chain
}

fn assert_layout_invariants(layout: &Layout) {
    let mut views = BTreeSet::new();
    for (name, grid) in layout.grids() {
        grid.validate()
            .unwrap_or_else(|error| panic!("grid {name} invalid: {error}"));
        let reference_chain = reference_chain(grid);
        for id in grid.depth_first() {
            let element = grid.element(id.as_str()).expect("listed element exists");
            match &element.kind {
                ElementKind::Node(node) => {
                    assert!(node.ratio > 0.0 && node.ratio < 1.0);
                    assert_ne!(node.child1, node.child2);
                    let either_child = grid.is_visible(node.child1.as_str())
                        || grid.is_visible(node.child2.as_str());
                    assert!(
                        element.visible == either_child
                            || (element.visible && reference_chain.contains(&id)),
                        "node {id} visibility is not derived from its children"
                    );
                }
                ElementKind::Part(part) => {
                    assert!(
                        !part.views.is_empty()
                            || part.navigation.is_some()
                            || part.structural
                            || id.as_str() == MAIN_AREA,
                        "prunable part {id} survived in grid {name}"
                    );
                    for view in &part.views {
                        assert!(views.insert(view.id.clone()), "view {} duplicated", view.id);
                    }
                }
            }
        }
    }
}

fn run_sequence(seed: u64, steps: usize) -> Layout {
    let mut layout = Layout::new();
    let mut rng = Lcg::new(seed);
    for step in 0..steps {
        let op = random_operation(&layout, &mut rng, step);
        layout = apply(&layout, &op);
        assert_layout_invariants(&layout);
    }
    layout
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_operation_streams_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..120,
    ) {
        let layout = run_sequence(seed, steps);
        assert_layout_invariants(&layout);
    }

    #[test]
    fn random_layouts_survive_persistence(
        seed in any::<u64>(),
        steps in 10usize..60,
    ) {
        let layout = run_sequence(seed, steps);
        let encoded = serialize_layout(&layout).expect("serializable");
        let restored = deserialize_layout(&encoded).expect("deserializable");
        assert_layout_invariants(&restored);
        prop_assert_eq!(serialize_layout(&restored).expect("serializable"), encoded);
    }
}

#[test]
fn seed_corpus_preserves_invariants() {
    let seeds = [
        0_u64,
        1,
        2,
        3,
        5,
        8,
        13,
        21,
        34,
        55,
        89,
        144,
        u32::MAX as u64,
        u64::MAX,
    ];
    for seed in seeds {
        let layout = run_sequence(seed, 150);
        assert_layout_invariants(&layout);
    }
}
