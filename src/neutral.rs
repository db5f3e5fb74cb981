//! Neutral units: mineral patches, vespene geysers, and static buildings.
//!
//! Mirrors the teacher crate's `TerrainFlags` bitflag style for the small
//! enum payload, but `Neutral` itself needs per-instance data (footprint,
//! amount) so it is a tagged struct rather than a bitflag. The "stacked
//! neutrals" list (spec 3, 9) is a single-linked intrusive list rooted at
//! the registry entry, addressed by index rather than pointer -- consistent
//! with the arena-plus-index storage used for Area/ChokePoint (spec 9).

use crate::position::{TilePosition, WalkPosition};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeutralKind {
    Mineral,
    Geyser,
    StaticBuilding,
}

/// A mineral patch, geyser, or static building occupying a fixed tile
/// footprint. `next_stacked` threads an intrusive singly-linked list of
/// neutrals sharing the same footprint (spec 3, 9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Neutral {
    pub kind: NeutralKind,
    pub unit_type: String,
    pub top_left: TilePosition,
    pub size: TilePosition,
    /// `initialAmount`, minerals/geysers only.
    pub initial_amount: Option<i32>,
    pub next_stacked: Option<usize>,
    pub blocking: bool,
    /// Walk positions of this neutral's "true doors" once it has been
    /// examined by the blocking detector (spec 4.4 step 4).
    pub blocked_areas: Vec<WalkPosition>,
}

impl Neutral {
    pub fn new(
        kind: NeutralKind,
        unit_type: impl Into<String>,
        top_left: TilePosition,
        size: TilePosition,
        initial_amount: Option<i32>,
    ) -> Self {
        Neutral {
            kind,
            unit_type: unit_type.into(),
            top_left,
            size,
            initial_amount,
            next_stacked: None,
            blocking: false,
            blocked_areas: Vec::new(),
        }
    }

    #[inline]
    pub fn is_mineral(&self) -> bool {
        self.kind == NeutralKind::Mineral
    }

    #[inline]
    pub fn is_geyser(&self) -> bool {
        self.kind == NeutralKind::Geyser
    }

    #[inline]
    pub fn is_resource(&self) -> bool {
        self.is_mineral() || self.is_geyser()
    }

    /// Tile-space footprint, inclusive.
    pub fn footprint(&self) -> impl Iterator<Item = TilePosition> + '_ {
        let tl = self.top_left;
        (0..self.size.y).flat_map(move |dy| {
            (0..self.size.x).map(move |dx| TilePosition::new(tl.x + dx, tl.y + dy))
        })
    }

    /// Centre of the footprint, in pixels.
    pub fn center_position(&self) -> crate::position::Position {
        let tl = self.top_left.to_position();
        let sz = self.size.to_position();
        crate::position::Position::new(tl.x + sz.x / 2, tl.y + sz.y / 2)
    }
}

/// Owns every neutral on the map, keyed by a stable index (the arena
/// convention of spec 9). Handles stacking validation (spec 7.2): a
/// candidate is rejected -- logged, not returned as an error -- when its
/// footprint/type mismatches the existing stack root, or when it would
/// stack atop a geyser.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NeutralRegistry {
    neutrals: Vec<Neutral>,
    /// Maps a tile footprint's top-left (x, then y) to the index of the
    /// bottom of its stack. Nested rather than `(i32, i32)`-keyed so the
    /// registry stays representable as JSON (a tuple has no JSON object-key
    /// encoding).
    by_top_left: fnv::FnvHashMap<i32, fnv::FnvHashMap<i32, usize>>,
}

impl NeutralRegistry {
    pub fn new() -> Self {
        NeutralRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.neutrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neutrals.is_empty()
    }

    pub fn get(&self, index: usize) -> &Neutral {
        &self.neutrals[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Neutral {
        &mut self.neutrals[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Neutral)> {
        self.neutrals.iter().enumerate()
    }

    /// Add a neutral, stacking it atop any existing neutral at the same
    /// top-left if compatible. Returns `Some(index)` of the newly-added
    /// entry, or `None` if the candidate was rejected as a stacking
    /// mismatch (spec 7.2) -- in which case the caller should `warn!`.
    pub fn add(&mut self, neutral: Neutral) -> Option<usize> {
        let (kx, ky) = (neutral.top_left.x, neutral.top_left.y);

        if let Some(&root_index) = self.by_top_left.get(&kx).and_then(|by_y| by_y.get(&ky)) {
            let root = &self.neutrals[root_index];
            if root.size != neutral.size || root.kind != neutral.kind {
                log::warn!(
                    "rejected stacked neutral at {:?}: footprint/type mismatch with existing stack",
                    neutral.top_left
                );
                return None;
            }
            if root.is_geyser() {
                log::warn!(
                    "rejected stacked neutral at {:?}: cannot stack atop a geyser",
                    neutral.top_left
                );
                return None;
            }

            // Walk to the tail of the stack and append.
            let mut tail = root_index;
            while let Some(next) = self.neutrals[tail].next_stacked {
                tail = next;
            }
            let new_index = self.neutrals.len();
            self.neutrals.push(neutral);
            self.neutrals[tail].next_stacked = Some(new_index);
            Some(new_index)
        } else {
            let new_index = self.neutrals.len();
            self.by_top_left.entry(kx).or_default().insert(ky, new_index);
            self.neutrals.push(neutral);
            Some(new_index)
        }
    }

    /// Indices of every neutral that is the bottom of its stack (i.e. every
    /// footprint, regardless of how many neutrals are stacked on it).
    pub fn stack_roots(&self) -> Vec<usize> {
        self.by_top_left
            .values()
            .flat_map(|by_y| by_y.values().copied())
            .collect()
    }

    /// Whether any neutral still occupies the given top-left footprint.
    /// Checks the registry's own stack-root index rather than any single
    /// neutral's `next_stacked`, since a non-root stack member's own pointer
    /// says nothing about whether the footprint as a whole is still occupied.
    pub fn has_any_at(&self, top_left: TilePosition) -> bool {
        self.by_top_left
            .get(&top_left.x)
            .is_some_and(|by_y| by_y.contains_key(&top_left.y))
    }

    /// Every neutral stacked at `root_index`, starting with the root itself.
    pub fn stack_from(&self, root_index: usize) -> Vec<usize> {
        let mut out = vec![root_index];
        let mut cur = root_index;
        while let Some(next) = self.neutrals[cur].next_stacked {
            out.push(next);
            cur = next;
        }
        out
    }

    /// Remove a neutral entirely (spec 4.9: `OnMineralDestroyed`). Unlinks it
    /// from its stack; does not compact indices (other entries keep stable
    /// ids, spec 9).
    pub fn remove_from_stack(&mut self, index: usize) {
        let (kx, ky) = {
            let n = &self.neutrals[index];
            (n.top_left.x, n.top_left.y)
        };

        let root = self.by_top_left.get(&kx).and_then(|by_y| by_y.get(&ky)).copied();

        if root == Some(index) {
            if let Some(next) = self.neutrals[index].next_stacked {
                self.by_top_left.entry(kx).or_default().insert(ky, next);
            } else if let Some(by_y) = self.by_top_left.get_mut(&kx) {
                by_y.remove(&ky);
                if by_y.is_empty() {
                    self.by_top_left.remove(&kx);
                }
            }
        } else if let Some(root) = root {
            let mut cur = root;
            while let Some(next) = self.neutrals[cur].next_stacked {
                if next == index {
                    self.neutrals[cur].next_stacked = self.neutrals[index].next_stacked;
                    break;
                }
                cur = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mineral(tl: TilePosition, amount: i32) -> Neutral {
        Neutral::new(
            NeutralKind::Mineral,
            "Resource_Mineral_Field",
            tl,
            TilePosition::new(2, 1),
            Some(amount),
        )
    }

    #[test]
    fn stacking_same_footprint_links_list() {
        let mut reg = NeutralRegistry::new();
        let a = reg.add(mineral(TilePosition::new(5, 5), 500)).unwrap();
        let b = reg.add(mineral(TilePosition::new(5, 5), 750)).unwrap();
        assert_eq!(reg.get(a).next_stacked, Some(b));
        assert_eq!(reg.stack_from(a), vec![a, b]);
    }

    #[test]
    fn mismatched_footprint_rejected() {
        let mut reg = NeutralRegistry::new();
        reg.add(mineral(TilePosition::new(5, 5), 500)).unwrap();
        let mismatched = Neutral::new(
            NeutralKind::Mineral,
            "Resource_Mineral_Field",
            TilePosition::new(5, 5),
            TilePosition::new(1, 1),
            Some(500),
        );
        assert!(reg.add(mismatched).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn cannot_stack_atop_geyser() {
        let mut reg = NeutralRegistry::new();
        reg.add(Neutral::new(
            NeutralKind::Geyser,
            "Resource_Vespene_Geyser",
            TilePosition::new(5, 5),
            TilePosition::new(4, 2),
            Some(5000),
        ))
        .unwrap();
        let candidate = Neutral::new(
            NeutralKind::Geyser,
            "Resource_Vespene_Geyser",
            TilePosition::new(5, 5),
            TilePosition::new(4, 2),
            Some(5000),
        );
        assert!(reg.add(candidate).is_none());
    }
}
