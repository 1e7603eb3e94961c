#![forbid(unsafe_code)]

use super::{GoalForest, GoalTreeNode, NodeIndex};
use crate::error::GoalError;
use crate::ids::GoalId;
use crate::model::GoalRecord;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Result of one assembly pass: the forest plus everything that had to be
/// dropped or repaired to build it.
#[derive(Debug, Default)]
pub struct Assembly {
    pub forest: GoalForest,
    /// `MalformedTree` for orphans, `Cycle` for broken loops.
    pub diagnostics: Vec<GoalError>,
}

enum Ancestry {
    Orphaned,
    Loop(GoalId),
}

struct Builder {
    slots: Vec<Option<GoalRecord>>,
    slot_of: HashMap<GoalId, usize>,
    groups: HashMap<Option<GoalId>, Vec<usize>>,
    forest: GoalForest,
}

impl Builder {
    fn new(records: Vec<GoalRecord>) -> Self {
        let mut slots = Vec::with_capacity(records.len());
        let mut slot_of = HashMap::with_capacity(records.len());
        for record in records {
            if slot_of.contains_key(&record.id) {
                warn!(goal = %record.id, "duplicate goal id in snapshot; keeping the first");
                continue;
            }
            slot_of.insert(record.id, slots.len());
            slots.push(Some(record));
        }

        let mut groups: HashMap<Option<GoalId>, Vec<usize>> = HashMap::new();
        for (slot, record) in slots.iter().enumerate() {
            if let Some(record) = record {
                groups.entry(record.parent_id).or_default().push(slot);
            }
        }
        for siblings in groups.values_mut() {
            siblings.sort_by_key(|slot| {
                let record = slots[*slot].as_ref();
                record.map(|r| (r.created_at_ms, r.id))
            });
        }

        Self {
            slots,
            slot_of,
            groups,
            forest: GoalForest::default(),
        }
    }

    fn record(&self, id: GoalId) -> Option<&GoalRecord> {
        self.slot_of
            .get(&id)
            .and_then(|slot| self.slots[*slot].as_ref())
    }

    fn is_placed(&self, id: GoalId) -> bool {
        self.slot_of
            .get(&id)
            .is_some_and(|slot| self.slots[*slot].is_none())
    }

    /// Pre-order descent from `slot`, pulling each node's children from the
    /// parent grouping built once up front.
    fn attach_root(&mut self, slot: usize) {
        let mut stack: Vec<(usize, Option<NodeIndex>, usize)> = vec![(slot, None, 0)];
        while let Some((slot, parent, depth)) = stack.pop() {
            let Some(record) = self.slots[slot].take() else {
                continue;
            };
            let id = record.id;
            let idx = NodeIndex(self.forest.nodes.len());
            self.forest.nodes.push(GoalTreeNode {
                record,
                parent,
                children: Vec::new(),
                depth,
                progress: 0,
                descendant_count: 0,
            });
            self.forest.by_id.insert(id, idx);
            match parent {
                Some(parent) => self.forest.nodes[parent.0].children.push(idx),
                None => self.forest.roots.push(idx),
            }
            if let Some(children) = self.groups.get(&Some(id)) {
                for child in children.iter().rev() {
                    stack.push((*child, Some(idx), depth + 1));
                }
            }
        }
    }

    fn trace_ancestry(&self, start: GoalId, excluded: &HashSet<GoalId>) -> Ancestry {
        let mut seen = HashSet::new();
        let mut current = start;
        loop {
            if excluded.contains(&current) {
                return Ancestry::Orphaned;
            }
            if !seen.insert(current) {
                return Ancestry::Loop(current);
            }
            match self.record(current).and_then(|r| r.parent_id) {
                Some(parent) if self.slot_of.contains_key(&parent) => current = parent,
                _ => return Ancestry::Orphaned,
            }
        }
    }

    /// Smallest id on the loop that passes through `entry`.
    fn loop_anchor(&self, entry: GoalId) -> GoalId {
        let mut anchor = entry;
        let mut current = self.record(entry).and_then(|r| r.parent_id);
        while let Some(id) = current {
            if id == entry {
                break;
            }
            anchor = anchor.min(id);
            current = self.record(id).and_then(|r| r.parent_id);
        }
        anchor
    }

    fn finish(mut self) -> GoalForest {
        for i in (0..self.forest.nodes.len()).rev() {
            let count = self.forest.nodes[i]
                .children
                .iter()
                .map(|child| self.forest.nodes[child.0].descendant_count + 1)
                .sum();
            self.forest.nodes[i].descendant_count = count;
        }
        self.forest
    }
}

impl GoalForest {
    /// Builds the forest from a flat snapshot in time linear in the record count.
    ///
    /// Records whose parent is missing are dropped together with everything
    /// below them and reported as `MalformedTree`. Records caught in a parent
    /// loop are kept: the smallest id on the loop becomes a root and a `Cycle`
    /// diagnostic is reported. Neither case aborts the pass.
    pub fn assemble(records: Vec<GoalRecord>) -> Assembly {
        let mut builder = Builder::new(records);
        let mut diagnostics = Vec::new();

        let mut orphans: Vec<(GoalId, GoalId)> = builder
            .slots
            .iter()
            .flatten()
            .filter_map(|r| {
                let parent = r.parent_id?;
                (!builder.slot_of.contains_key(&parent)).then_some((r.id, parent))
            })
            .collect();
        orphans.sort();
        for (id, parent) in &orphans {
            warn!(goal = %id, parent = %parent, "dropping goal with missing parent");
            diagnostics.push(GoalError::MalformedTree {
                id: *id,
                parent: *parent,
            });
        }

        let roots = builder.groups.get(&None).cloned().unwrap_or_default();
        for slot in roots {
            builder.attach_root(slot);
        }

        // Whatever is still unplaced either hangs below an orphan or sits on a loop.
        let mut pending: Vec<GoalId> = builder.slots.iter().flatten().map(|r| r.id).collect();
        pending.sort();
        let mut excluded: HashSet<GoalId> = orphans.iter().map(|(id, _)| *id).collect();
        for id in pending {
            if builder.is_placed(id) || excluded.contains(&id) {
                continue;
            }
            match builder.trace_ancestry(id, &excluded) {
                Ancestry::Orphaned => {
                    debug!(goal = %id, "goal sits below a dropped orphan");
                    excluded.insert(id);
                }
                Ancestry::Loop(entry) => {
                    let anchor = builder.loop_anchor(entry);
                    warn!(goal = %anchor, "breaking parent cycle by treating goal as a root");
                    diagnostics.push(GoalError::Cycle { id: anchor });
                    if let Some(slot) = builder.slot_of.get(&anchor).copied() {
                        builder.attach_root(slot);
                    }
                }
            }
        }

        let forest = builder.finish();
        debug!(
            nodes = forest.len(),
            roots = forest.roots.len(),
            diagnostics = diagnostics.len(),
            "assembled goal forest"
        );
        Assembly {
            forest,
            diagnostics,
        }
    }
}
