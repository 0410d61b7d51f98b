#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use workbench_layout::{
    Align, DockingArea, Layout, NewPart, PartOptions, PartPlacement, PartSpec, Region,
    ViewOptions,
};

#[derive(Debug, Arbitrary)]
enum Op {
    AddPart { target: u8, align: u8, ratio: u8, structural: bool },
    DockPart { area: u8 },
    RemovePart { target: u8 },
    AddView { target: u8 },
    RemoveView { view: u8 },
    ActivateView { view: u8 },
    Drop { view: u8, target: u8, region: u8, new_part: bool, position: Option<u8> },
    Rename { view: u8 },
    SetRatio { node: u8, ratio: u8 },
    MarkForRemoval { view: u8 },
    RemoveMarked,
}

const ALIGNS: [Align; 4] = [Align::Left, Align::Right, Align::Top, Align::Bottom];
const REGIONS: [Region; 5] = [
    Region::Center,
    Region::North,
    Region::South,
    Region::East,
    Region::West,
];

fn pick<T: Clone>(items: &[T], index: u8) -> Option<T> {
    (!items.is_empty()).then(|| items[index as usize % items.len()].clone())
}

fn ratio(raw: u8) -> f64 {
    // Includes 0.0 so invalid ratios are exercised too.
    f64::from(raw) / 255.0
}

fuzz_target!(|ops: Vec<Op>| {
    let mut layout = Layout::new();
    for (sequence, op) in ops.into_iter().take(64).enumerate() {
        let parts: Vec<String> = layout.parts().map(|(_, id, _)| id.to_string()).collect();
        let views: Vec<String> = layout.views().map(|view| view.id.to_string()).collect();
        let nodes: Vec<String> = layout
            .grids()
            .flat_map(|(_, grid)| {
                grid.depth_first()
                    .into_iter()
                    .filter(|id| grid.node(id.as_str()).is_some())
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        let result = match op {
            Op::AddPart { target, align, ratio: r, structural } => pick(&parts, target)
                .map(|target| {
                    layout.add_part(
                        format!("part.fuzz-{sequence}").as_str(),
                        &PartPlacement::Relative(
                            PartSpec::new(ALIGNS[align as usize % 4])
                                .relative_to(target)
                                .ratio(ratio(r)),
                        ),
                        &PartOptions {
                            structural,
                            ..PartOptions::default()
                        },
                    )
                }),
            Op::DockPart { area } => Some(layout.add_part(
                format!("part.dock-{sequence}").as_str(),
                &PartPlacement::Docked {
                    dock_to: DockingArea::ALL[area as usize % DockingArea::ALL.len()],
                },
                &PartOptions::default(),
            )),
            Op::RemovePart { target } => pick(&parts, target).map(|id| layout.remove_part(&id)),
            Op::AddView { target } => pick(&parts, target).map(|id| {
                layout.add_view(layout.compute_next_view_id(), &id, &ViewOptions::default())
            }),
            Op::RemoveView { view } => pick(&views, view).map(|id| layout.remove_view(&id)),
            Op::ActivateView { view } => pick(&views, view).map(|id| layout.activate_view(&id)),
            Op::Drop { view, target, region, new_part, position } => {
                match (pick(&views, view), pick(&parts, target)) {
                    (Some(view), Some(target)) => Some(layout.move_view_to_region(
                        &view,
                        &target,
                        REGIONS[region as usize % 5],
                        new_part.then(NewPart::default).as_ref(),
                        position.map(usize::from),
                    )),
                    _ => None,
                }
            }
            Op::Rename { view } => pick(&views, view)
                .map(|id| layout.rename_view(&id, format!("view.renamed-{sequence}"))),
            Op::SetRatio { node, ratio: r } => {
                pick(&nodes, node).map(|id| layout.set_split_ratio(&id, ratio(r)))
            }
            Op::MarkForRemoval { view } => {
                pick(&views, view).map(|id| layout.mark_view_for_removal(&id))
            }
            Op::RemoveMarked => Some(layout.remove_views_marked_for_removal()),
        };

        // Rejected operations are fine; accepted ones must leave valid grids.
        if let Some(Ok(next)) = result {
            for (name, grid) in next.grids() {
                if let Err(error) = grid.validate() {
                    panic!("grid {name} invalid after {sequence}: {error}");
                }
            }
            layout = next;
        }
    }
});
