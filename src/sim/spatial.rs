//! Quadtree spatial index for collision candidates
//!
//! Rebuilt from scratch every tick: the driver calls [`SpatialIndex::clear`],
//! inserts every live entity's bounds, then queries with the player's box.
//! Nothing is ever removed or rebalanced, which keeps insertion trivial.
//!
//! Nodes live in an arena and refer to their children by index. Once a
//! node is full it subdivides into four equal quadrants and every later item
//! is offered to all four children. An item that straddles a quadrant
//! boundary is therefore stored once per child it touches, and a query can
//! return it more than once. Callers that need each entity exactly once must
//! deduplicate by entity.
//!
//! Depth is capped at [`MAX_DEPTH`]; the deepest nodes simply grow.

use glam::Vec2;

/// Items a node holds before it subdivides
pub const DEFAULT_NODE_CAPACITY: usize = 8;

/// Nodes at this depth never subdivide and hold any number of items.
/// Stops runaway fan-out when many items pile onto the same spot.
pub const MAX_DEPTH: u8 = 8;

/// Depth-first query stack bound: three pending siblings per level plus the
/// four children pushed at the deepest split
const QUERY_STACK_LEN: usize = 3 * MAX_DEPTH as usize + 4;

/// Axis-aligned rectangle with its origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundedRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundedRegion {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region of `size` centred on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let min = center - size * 0.5;
        Self::new(min.x, min.y, size.x, size.y)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Negative or NaN extent, or a non-finite origin
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite() && self.y.is_finite() && self.width >= 0.0 && self.height >= 0.0)
    }

    /// Strict overlap: regions that only share an edge do not overlap
    #[inline]
    pub fn overlaps(&self, other: &BoundedRegion) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Closed-edge intersection, used to decide which nodes an item belongs
    /// to and which subtrees a query has to visit
    #[inline]
    fn touches(&self, other: &BoundedRegion) -> bool {
        !(other.right() < self.x
            || other.x > self.right()
            || other.bottom() < self.y
            || other.y > self.bottom())
    }

    /// NW, NE, SW, SE quadrants
    fn quadrants(&self) -> [BoundedRegion; 4] {
        let w = self.width / 2.0;
        let h = self.height / 2.0;
        [
            BoundedRegion::new(self.x, self.y, w, h),
            BoundedRegion::new(self.x + w, self.y, w, h),
            BoundedRegion::new(self.x, self.y + h, w, h),
            BoundedRegion::new(self.x + w, self.y + h, w, h),
        ]
    }
}

/// A region tagged with a non-owning handle to the entity it belongs to
///
/// The handle is only meaningful for the index generation it was inserted
/// into; it is never dereferenced by the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedItem<T> {
    pub bounds: BoundedRegion,
    pub entity: T,
}

impl<T> IndexedItem<T> {
    pub fn new(bounds: BoundedRegion, entity: T) -> Self {
        Self { bounds, entity }
    }
}

/// Arena handle of a quadtree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node<T> {
    region: BoundedRegion,
    depth: u8,
    items: Vec<IndexedItem<T>>,
    children: Option<[NodeId; 4]>,
}

/// Quadtree over a fixed world region
#[derive(Debug)]
pub struct SpatialIndex<T> {
    nodes: Vec<Node<T>>,
    capacity: usize,
    stored: usize,
    /// Item buffers of discarded nodes, reused by the next subdivisions
    spare: Vec<Vec<IndexedItem<T>>>,
    scratch: Vec<NodeId>,
}

impl<T: Copy> SpatialIndex<T> {
    pub fn new(bounds: BoundedRegion) -> Self {
        Self::with_capacity(bounds, DEFAULT_NODE_CAPACITY)
    }

    /// `capacity` is clamped to at least 1
    pub fn with_capacity(bounds: BoundedRegion, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            nodes: vec![Node {
                region: bounds,
                depth: 0,
                items: Vec::with_capacity(capacity),
                children: None,
            }],
            capacity,
            stored: 0,
            spare: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// World region covered by the root
    pub fn bounds(&self) -> BoundedRegion {
        self.nodes[NodeId::ROOT.index()].region
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Stored entries, counting every copy of a straddling item
    pub fn len(&self) -> usize {
        self.stored
    }

    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// Insert an item. Items that miss the world region are dropped and
    /// `false` is returned.
    pub fn insert(&mut self, item: IndexedItem<T>) -> bool {
        if item.bounds.is_degenerate() || !self.bounds().touches(&item.bounds) {
            log::trace!("Dropping item outside index bounds: {:?}", item.bounds);
            return false;
        }

        let mut stack = std::mem::take(&mut self.scratch);
        stack.clear();
        stack.push(NodeId::ROOT);

        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.index()];
            if !node.region.touches(&item.bounds) {
                continue;
            }
            if node.items.len() < self.capacity || node.depth >= MAX_DEPTH {
                node.items.push(item);
                self.stored += 1;
                continue;
            }
            let existing = node.children;
            let children = match existing {
                Some(children) => children,
                None => self.subdivide(id),
            };
            stack.extend(children.iter().rev());
        }

        self.scratch = stack;
        true
    }

    /// Every stored item whose bounds overlap `region`
    pub fn query(&self, region: &BoundedRegion) -> Vec<IndexedItem<T>> {
        let mut found = Vec::new();
        self.query_into(region, &mut found);
        found
    }

    /// Like [`query`](Self::query) but appends into a caller-owned buffer
    pub fn query_into(&self, region: &BoundedRegion, found: &mut Vec<IndexedItem<T>>) {
        if region.is_degenerate() {
            return;
        }

        let mut stack = [NodeId::ROOT; QUERY_STACK_LEN];
        let mut len = 1;
        while len > 0 {
            len -= 1;
            let node = &self.nodes[stack[len].index()];
            if !node.region.touches(region) {
                continue;
            }
            found.extend(node.items.iter().filter(|it| region.overlaps(&it.bounds)));
            if let Some(children) = node.children {
                for child in children.iter().rev() {
                    stack[len] = *child;
                    len += 1;
                }
            }
        }
    }

    /// Drop every item and child node, leaving a single empty root
    pub fn clear(&mut self) {
        for node in self.nodes.drain(1..) {
            let mut items = node.items;
            items.clear();
            self.spare.push(items);
        }
        let root = &mut self.nodes[NodeId::ROOT.index()];
        root.items.clear();
        root.children = None;
        self.stored = 0;
    }

    /// Clear, then insert every item
    pub fn rebuild(&mut self, items: impl IntoIterator<Item = IndexedItem<T>>) {
        self.clear();
        for item in items {
            self.insert(item);
        }
    }

    fn subdivide(&mut self, id: NodeId) -> [NodeId; 4] {
        let parent = &self.nodes[id.index()];
        let quadrants = parent.region.quadrants();
        let depth = parent.depth + 1;
        let first = self.nodes.len() as u32;
        let children = [
            NodeId(first),
            NodeId(first + 1),
            NodeId(first + 2),
            NodeId(first + 3),
        ];
        for region in quadrants {
            let items = self.spare.pop().unwrap_or_default();
            self.nodes.push(Node {
                region,
                depth,
                items,
                children: None,
            });
        }
        self.nodes[id.index()].children = Some(children);
        children
    }
}
