use criterion::{criterion_group, criterion_main, Criterion};
use glam::{Mat4, Vec3};

use esvo_render::config::{OctreeConfig, TraversalLimits};
use esvo_render::svo::brick::UncompressedBrick;
use esvo_render::svo::descriptor::{NodeDescriptor, NO_BRICK};
use esvo_render::traversal::kernel::{traverse, FlatScene};
use esvo_render::traversal::ray::{Ray, RaySetup};

/// Builds a flat node buffer for a full octree of `levels` internal
/// levels, every leaf pointing at brick 0. Each internal node's 8
/// children are laid out breadth-first right after it, so a node at
/// flat index `i` on level `d` has its children starting at
/// `children_start(d) + i * 8` — this mirrors the packed-child-array
/// convention `svo::builder` uses for irregular trees, specialized for
/// the regular case a synthetic benchmark scene needs.
fn full_octree(levels: u32) -> Vec<NodeDescriptor> {
    let mut level_sizes = vec![1usize];
    for _ in 0..levels {
        level_sizes.push(level_sizes.last().unwrap() * 8);
    }
    let total: usize = level_sizes.iter().sum();
    let mut nodes = vec![NodeDescriptor::leaf(0, false, 0, 0, 0, 0); total];

    let mut level_start = vec![0usize];
    for size in &level_sizes[..level_sizes.len() - 1] {
        level_start.push(level_start.last().unwrap() + size);
    }

    for level in 0..levels as usize {
        let this_start = level_start[level];
        let this_size = level_sizes[level];
        let next_start = level_start[level + 1];
        let is_bottom = level + 1 == levels as usize;
        for i in 0..this_size {
            let child_pointer = (next_start + i * 8 - (this_start + i)) as u32;
            let leaf_mask = if is_bottom { 0xFFu8 } else { 0 };
            nodes[this_start + i] = NodeDescriptor::internal(child_pointer, false, 0xFF, leaf_mask, 0, 0);
        }
    }

    nodes
}

fn criterion_benchmark(c: &mut Criterion) {
    let nodes = full_octree(4);
    let brick = UncompressedBrick::filled(7);
    let palette = esvo_render::svo::MaterialPalette::default();

    let scene = FlatScene {
        nodes: &nodes,
        uncompressed: std::slice::from_ref(&brick),
        palette: &palette,
    };

    let config = OctreeConfig::new(
        5,
        0,
        1,
        Vec3::ZERO,
        Vec3::ONE,
        Mat4::IDENTITY,
        Mat4::IDENTITY,
    );
    let limits = TraversalLimits::default();

    let width = 64u32;
    let height = 64u32;
    let rays: Vec<RaySetup> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter_map(|(x, y)| {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            RaySetup::new(
                Ray {
                    origin: Vec3::new(u, v, -1.0),
                    direction: Vec3::new(0.0, 0.0, 1.0),
                },
                &config,
                limits.dir_epsilon,
            )
        })
        .collect();

    c.bench_function("traverse full-res 64x64 grid", |b| {
        b.iter(|| {
            for ray in &rays {
                std::hint::black_box(traverse(
                    &scene,
                    &config,
                    &limits,
                    ray,
                    None,
                    None,
                ));
            }
        });
    });

    c.bench_function("traverse single ray, empty root", |b| {
        let empty_nodes = vec![NodeDescriptor::leaf(0, false, 0, 0, NO_BRICK, 0)];
        let empty_scene = FlatScene {
            nodes: &empty_nodes,
            uncompressed: &[],
            palette: &palette,
        };
        let ray = &rays[rays.len() / 2];
        b.iter(|| std::hint::black_box(traverse(&empty_scene, &config, &limits, ray, None, None)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
