//! Octree construction and mass aggregation.
//!
//! The tree is rebuilt from scratch every step on top of the recycled
//! [`NodeArena`]: fit a cubical bounding region, insert every particle,
//! then run the upward pass that fills in each node's monopole (total
//! mass and mass-weighted centroid). Traversal for forces lives in
//! [`crate::simulation::forces`].
//!
//! The octant partition is half-open: a coordinate equal to the node
//! centre goes to the high child (`>=`). The bounds padding below keeps
//! the extremal-max particle inside the upper boundary under that
//! convention. Changing either side of this reshuffles boundary
//! particles and changes force results bitwise.

use std::fmt::Write as _;

use log::warn;

use crate::error::{SimError, SimResult};
use crate::simulation::arena::{Node, NodeArena, NodeIndex, NodeKind};
use crate::simulation::states::{NVec3, Particle, NDIM, NSUB};

/// Deepest level at which a full leaf may still split. Distinct
/// positions separate long before this (halving the cell ~52 times
/// resolves one ulp at the cluster's scale); past it the child centres
/// stop moving and promotion cannot make progress.
const MAX_SPLIT_DEPTH: u32 = 100;

/// Compute the cubical bounding region of the particle set.
///
/// Returns `(center, size)` with `size = ceil(extent) + 1`, where
/// `extent` is the largest axis-wise spread. For an empty input returns
/// the sentinel `(origin, 1)`.
pub fn fit_bounds(particles: &[Particle]) -> (NVec3, f64) {
    if particles.is_empty() {
        return (NVec3::zeros(), 1.0);
    }

    let mut min = particles[0].x;
    let mut max = particles[0].x;
    for p in &particles[1..] {
        for k in 0..NDIM {
            min[k] = min[k].min(p.x[k]);
            max[k] = max[k].max(p.x[k]);
        }
    }

    let mut center = NVec3::zeros();
    let mut extent = 0.0f64;
    for k in 0..NDIM {
        center[k] = (min[k] + max[k]) * 0.5;
        extent = extent.max(max[k] - min[k]);
    }

    (center, extent.ceil() + 1.0)
}

/// Octant of `p` relative to `center`: bit k is set iff `p[k] >= center[k]`.
#[inline]
pub fn octant_index(p: &NVec3, center: &NVec3) -> usize {
    let mut octant = 0;
    for k in 0..NDIM {
        if p[k] >= center[k] {
            octant |= 1 << k;
        }
    }
    octant
}

/// Centre of the child cube in `octant` of a node at `center` with edge
/// `size`. The offset is a quarter edge on each axis, toward the high
/// side where the octant bit is set.
#[inline]
fn child_center(center: &NVec3, size: f64, octant: usize) -> NVec3 {
    let offset = size / 4.0;
    let mut c = *center;
    for k in 0..NDIM {
        if (octant >> k) & 1 == 1 {
            c[k] += offset;
        } else {
            c[k] -= offset;
        }
    }
    c
}

/// The Barnes-Hut octree over a particle slice.
///
/// Leaf buckets store particle indices into the slice the tree was built
/// from. The tree holds no borrow of the particles; callers pass the same
/// slice to `build`, `aggregate_mass` and the force evaluation.
#[derive(Debug)]
pub struct Octree {
    arena: NodeArena,
    root: Option<NodeIndex>,
    max_particles_per_leaf: usize,
    max_depth: u32,
    colocated_overflows: u64,
}

impl Octree {
    pub fn new(max_particles_per_leaf: usize) -> Self {
        Self {
            arena: NodeArena::new(),
            root: None,
            max_particles_per_leaf: max_particles_per_leaf.max(1),
            max_depth: 0,
            colocated_overflows: 0,
        }
    }

    /// Drop the whole tree. Arena slots are rewound, not freed, so the
    /// next build reuses their allocations.
    pub fn clear(&mut self) {
        self.arena.reset();
        self.root = None;
        self.max_depth = 0;
        self.colocated_overflows = 0;
    }

    /// Build the tree over `particles`, fitting the bounds first.
    pub fn build(&mut self, particles: &[Particle]) -> SimResult<()> {
        let (center, size) = fit_bounds(particles);
        self.build_with_bounds(center, size, particles)
    }

    /// Build the tree over `particles` inside an already-fitted cube.
    /// Any previous tree is cleared first.
    pub fn build_with_bounds(
        &mut self,
        center: NVec3,
        size: f64,
        particles: &[Particle],
    ) -> SimResult<()> {
        self.clear();

        let root = self.arena.allocate()?;
        {
            let node = self.arena.node_mut(root);
            node.geo_center = center;
            node.size = size;
            node.level = 0;
        }
        self.root = Some(root);

        for i in 0..particles.len() {
            self.insert_from(root, i as u32, particles)?;
        }
        Ok(())
    }

    /// Upward pass: fill in `mass` and `mass_center` for every node.
    ///
    /// Leaves sum their bucket's monopole; internal nodes sum their
    /// children's. Subtrees with zero total mass keep their reset
    /// defaults.
    pub fn aggregate_mass(&mut self, particles: &[Particle]) {
        if let Some(root) = self.root {
            self.aggregate_node(root, particles);
        }
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.map(|idx| self.arena.node(idx))
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Live nodes of the current tree, in allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.live()
    }

    /// Deepest leaf level reached by the last build.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of aborted leaf splits caused by co-located particles
    /// since the last clear.
    pub fn colocated_overflows(&self) -> u64 {
        self.colocated_overflows
    }

    /// Insert one particle, walking down from `start`.
    ///
    /// Every node the particle passes through gets its `particle_count`
    /// bumped exactly once, so after a full build each node's count is
    /// the number of particles in its subtree.
    fn insert_from(&mut self, start: NodeIndex, pid: u32, particles: &[Particle]) -> SimResult<()> {
        let pos = particles[pid as usize].x;
        let mut current = start;

        loop {
            let (center, size, level) = {
                let node = self.arena.node(current);
                (node.geo_center, node.size, node.level)
            };
            if size == 0.0 {
                return Err(SimError::InvalidGeometry { level });
            }

            let octant = octant_index(&pos, &center);
            let child = self.arena.node(current).children[octant]
                .filter(|&ci| self.arena.node(ci).kind != NodeKind::Empty);

            let Some(ci) = child else {
                // Vacant octant: hang a fresh leaf off it.
                let leaf = self.new_leaf(current, octant, pid)?;
                let node = self.arena.node_mut(current);
                node.children[octant] = Some(leaf);
                node.kind = NodeKind::Internal;
                node.particle_count += 1;
                return Ok(());
            };

            if self.arena.node(ci).kind == NodeKind::Leaf {
                if self.arena.node(ci).bucket.len() < self.max_particles_per_leaf {
                    self.append_to_leaf(ci, pid);
                    self.arena.node_mut(current).particle_count += 1;
                    return Ok(());
                }

                // Full leaf: split it and push its particles one level
                // down, then keep walking into it.
                if !self.promote_leaf(ci, pid, particles)? {
                    // Splitting can never separate these particles.
                    // Keep the leaf over capacity.
                    self.colocated_overflows += 1;
                    warn!(
                        "leaf at level {} cannot split (co-located particles); \
                         bucket grows to {}",
                        self.arena.node(ci).level,
                        self.arena.node(ci).bucket.len() + 1
                    );
                    self.append_to_leaf(ci, pid);
                    self.arena.node_mut(current).particle_count += 1;
                    return Ok(());
                }
            }

            // Descend into the (possibly just promoted) internal child.
            self.arena.node_mut(current).particle_count += 1;
            current = ci;
        }
    }

    /// Allocate a leaf for `octant` of `parent`, seeded with one particle.
    fn new_leaf(&mut self, parent: NodeIndex, octant: usize, pid: u32) -> SimResult<NodeIndex> {
        let (center, size, level) = {
            let node = self.arena.node(parent);
            (node.geo_center, node.size, node.level)
        };

        let leaf = self.arena.allocate()?;
        let node = self.arena.node_mut(leaf);
        node.kind = NodeKind::Leaf;
        node.size = size / 2.0;
        node.geo_center = child_center(&center, size, octant);
        node.level = level + 1;
        node.particle_count = 1;
        node.bucket.push(pid);

        self.max_depth = self.max_depth.max(level + 1);
        Ok(leaf)
    }

    fn append_to_leaf(&mut self, leaf: NodeIndex, pid: u32) {
        let node = self.arena.node_mut(leaf);
        node.bucket.push(pid);
        node.particle_count += 1;
    }

    /// Turn a full leaf into an internal node, redistributing its bucket
    /// one level down.
    ///
    /// Returns `Ok(false)` without mutating anything when no amount of
    /// splitting could separate the occupants: the bucket and the
    /// incoming particle share one exact position, or the leaf sits so
    /// deep that the octant test has run out of resolution. Promoting in
    /// either case would recurse forever on the same full bucket.
    fn promote_leaf(
        &mut self,
        leaf: NodeIndex,
        incoming: u32,
        particles: &[Particle],
    ) -> SimResult<bool> {
        {
            let node = self.arena.node(leaf);
            debug_assert_eq!(node.kind, NodeKind::Leaf);
            if node.level >= MAX_SPLIT_DEPTH {
                return Ok(false);
            }
            let pos0 = particles[node.bucket[0] as usize].x;
            let all_colocated = node
                .bucket
                .iter()
                .all(|&q| particles[q as usize].x == pos0);
            if all_colocated && particles[incoming as usize].x == pos0 {
                return Ok(false);
            }
        }

        // Pull the bucket out before touching the node, then re-insert
        // from the local copy.
        let bucket = {
            let node = self.arena.node_mut(leaf);
            node.kind = NodeKind::Internal;
            node.particle_count = 0;
            std::mem::take(&mut node.bucket)
        };
        for &q in &bucket {
            self.insert_from(leaf, q, particles)?;
        }
        Ok(true)
    }

    fn aggregate_node(&mut self, idx: NodeIndex, particles: &[Particle]) {
        match self.arena.node(idx).kind {
            NodeKind::Empty => {}
            NodeKind::Leaf => {
                let node = self.arena.node(idx);
                let mut mass = 0.0;
                let mut weighted = NVec3::zeros();
                for &q in &node.bucket {
                    let p = &particles[q as usize];
                    mass += p.m;
                    weighted += p.m * p.x;
                }
                if mass > 0.0 {
                    let node = self.arena.node_mut(idx);
                    node.mass = mass;
                    node.mass_center = weighted / mass;
                }
            }
            NodeKind::Internal => {
                let children = self.arena.node(idx).children;
                let mut mass = 0.0;
                let mut weighted = NVec3::zeros();
                for ci in children.iter().flatten() {
                    self.aggregate_node(*ci, particles);
                    let child = self.arena.node(*ci);
                    if child.mass > 0.0 {
                        mass += child.mass;
                        weighted += child.mass * child.mass_center;
                    }
                }
                if mass > 0.0 {
                    let node = self.arena.node_mut(idx);
                    node.mass = mass;
                    node.mass_center = weighted / mass;
                }
            }
        }
    }

    /// Render the tree as indented text, one node per line. Debug aid.
    pub fn format_tree(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.format_node(root, &mut out);
        } else {
            out.push_str("tree is empty\n");
        }
        out
    }

    fn format_node(&self, idx: NodeIndex, out: &mut String) {
        let node = self.arena.node(idx);
        let indent = "  ".repeat(node.level as usize);
        let kind = match node.kind {
            NodeKind::Empty => "Empty",
            NodeKind::Leaf => "Leaf",
            NodeKind::Internal => "Internal",
        };
        let _ = writeln!(
            out,
            "{indent}L={} M={:.2} N={} Geo=({:.2}, {:.2}, {:.2}) Size={:.2} \
             CMS=({:.2}, {:.2}, {:.2}) Type={kind}",
            node.level,
            node.mass,
            node.particle_count,
            node.geo_center.x,
            node.geo_center.y,
            node.geo_center.z,
            node.size,
            node.mass_center.x,
            node.mass_center.y,
            node.mass_center.z,
        );
        if node.kind == NodeKind::Leaf {
            for &q in &node.bucket {
                let _ = writeln!(out, "{indent}  particle id={q}");
            }
        }
        for ci in node.children.iter().flatten() {
            if self.arena.node(*ci).kind != NodeKind::Empty {
                self.format_node(*ci, out);
            }
        }
    }
}

// NSUB stays in sync with the octant encoding above.
const _: () = assert!(NSUB == 8);

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64, z: f64) -> Particle {
        Particle::new(1.0, NVec3::new(x, y, z), NVec3::zeros())
    }

    #[test]
    fn bounds_of_empty_input_are_the_sentinel() {
        let (center, size) = fit_bounds(&[]);
        assert_eq!(center, NVec3::zeros());
        assert_eq!(size, 1.0);
    }

    #[test]
    fn bounds_cover_the_extremes() {
        let particles = vec![at(-1.0, 0.0, 0.0), at(3.5, 2.0, -2.0)];
        let (center, size) = fit_bounds(&particles);
        assert_eq!(center.x, 1.25);
        assert_eq!(center.y, 1.0);
        assert_eq!(center.z, -1.0);
        // largest extent is 4.5 along x; ceil + 1
        assert_eq!(size, 6.0);

        // every particle strictly inside the half-open cube
        for p in &particles {
            for k in 0..NDIM {
                assert!(p.x[k] >= center[k] - size / 2.0);
                assert!(p.x[k] < center[k] + size / 2.0);
            }
        }
    }

    #[test]
    fn octant_test_sends_boundary_points_high() {
        let center = NVec3::zeros();
        assert_eq!(octant_index(&NVec3::new(0.0, 0.0, 0.0), &center), 0b111);
        assert_eq!(octant_index(&NVec3::new(-1.0, 0.0, 0.0), &center), 0b110);
        assert_eq!(octant_index(&NVec3::new(1.0, -1.0, -1.0), &center), 0b001);
        assert_eq!(octant_index(&NVec3::new(-1.0, -1.0, -1.0), &center), 0b000);
    }

    #[test]
    fn child_centers_offset_a_quarter_edge() {
        let center = NVec3::new(0.0, 0.0, 0.0);
        let lo = child_center(&center, 8.0, 0b000);
        let hi = child_center(&center, 8.0, 0b111);
        assert_eq!(lo, NVec3::new(-2.0, -2.0, -2.0));
        assert_eq!(hi, NVec3::new(2.0, 2.0, 2.0));
        let mixed = child_center(&center, 8.0, 0b101);
        assert_eq!(mixed, NVec3::new(2.0, -2.0, 2.0));
    }

    #[test]
    fn single_particle_builds_root_plus_one_leaf() {
        let particles = vec![at(0.5, 0.5, 0.5)];
        let mut tree = Octree::new(8);
        tree.build(&particles).unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.kind, NodeKind::Internal);
        assert_eq!(root.particle_count, 1);

        let leaves: Vec<_> = tree.nodes().filter(|n| n.kind == NodeKind::Leaf).collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].bucket, vec![0]);
        assert_eq!(leaves[0].level, 1);
    }

    #[test]
    fn full_leaf_promotes_into_internal() {
        // bounds are the cube at (2.5, 2.5, 2.5) with edge 4; the first,
        // third and fourth particle crowd the low octant, capacity 2
        let particles = vec![
            at(1.0, 1.0, 1.0),
            at(4.0, 4.0, 4.0),
            at(2.0, 2.0, 2.0),
            at(1.4, 1.4, 1.4),
        ];
        let mut tree = Octree::new(2);
        tree.build(&particles).unwrap();

        assert_eq!(tree.root().unwrap().particle_count, 4);
        assert!(tree
            .nodes()
            .any(|n| n.kind == NodeKind::Internal && n.level >= 1));
        let bucketed: usize = tree
            .nodes()
            .filter(|n| n.kind == NodeKind::Leaf)
            .map(|n| n.bucket.len())
            .sum();
        assert_eq!(bucketed, 4);
        assert_eq!(tree.colocated_overflows(), 0);
    }

    #[test]
    fn colocated_particles_keep_an_over_capacity_bucket() {
        let particles = vec![at(2.0, 2.0, 2.0), at(2.0, 2.0, 2.0), at(2.0, 2.0, 2.0)];
        let mut tree = Octree::new(2);
        tree.build(&particles).unwrap();

        assert!(tree.colocated_overflows() >= 1);
        let leaf = tree
            .nodes()
            .find(|n| n.kind == NodeKind::Leaf)
            .expect("leaf survives");
        assert_eq!(leaf.bucket.len(), 3);
        assert_eq!(tree.root().unwrap().particle_count, 3);
    }

    #[test]
    fn near_duplicates_separate_through_a_promotion_chain() {
        // two exact duplicates pair up in one leaf; the close third
        // particle forces splits down several levels before its octant
        // differs from theirs. The far particle keeps the root cube from
        // centring exactly between the cluster and the newcomer.
        let particles = vec![
            at(1.0, 1.0, 1.0),
            at(1.0, 1.0, 1.0),
            at(1.01, 1.0, 1.0),
            at(3.0, 1.0, 1.0),
        ];
        let mut tree = Octree::new(2);
        tree.build(&particles).unwrap();

        assert_eq!(tree.colocated_overflows(), 0);
        assert_eq!(tree.root().unwrap().particle_count, 4);
        let bucketed: usize = tree
            .nodes()
            .filter(|n| n.kind == NodeKind::Leaf)
            .map(|n| n.bucket.len())
            .sum();
        assert_eq!(bucketed, 4);
        assert!(tree.max_depth() >= 3);
    }

    #[test]
    fn tree_dump_lists_every_kind_of_node() {
        let mut tree = Octree::new(1);
        assert_eq!(tree.format_tree(), "tree is empty\n");

        let particles = vec![at(0.0, 0.0, 0.0), at(4.0, 4.0, 4.0)];
        tree.build(&particles).unwrap();
        tree.aggregate_mass(&particles);

        let dump = tree.format_tree();
        assert!(dump.contains("Type=Internal"));
        assert!(dump.contains("Type=Leaf"));
        assert!(dump.contains("particle id=1"));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let particles = vec![at(0.0, 0.0, 0.0), at(4.0, 0.0, 0.0), at(0.0, 4.0, 0.0)];
        let mut tree = Octree::new(1);
        tree.build(&particles).unwrap();
        tree.aggregate_mass(&particles);

        let root = tree.root().unwrap();
        let (mass, center) = (root.mass, root.mass_center);
        tree.aggregate_mass(&particles);
        let root = tree.root().unwrap();
        assert_eq!(mass.to_bits(), root.mass.to_bits());
        for k in 0..NDIM {
            assert_eq!(center[k].to_bits(), root.mass_center[k].to_bits());
        }
    }
}
