//! Write-state data flow within one instruction
//!
//! For every microcode offset the map records which registers may have been
//! written on entry (along at least one path) and which have definitely been
//! written (along every path). `Skip`/`SkipIf` contribute two successors,
//! terminal microcodes none. Every edge points forward, so a single pass in
//! offset order reaches the fixpoint.

use bit_set::BitSet;

use crate::code::Code;
use crate::register::RegisterId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteState {
    pub maybe: BitSet,
    pub definitely: BitSet,
}

impl WriteState {
    /// Combine the states of two incoming paths
    fn join(&mut self, other: &WriteState) {
        self.maybe.union_with(&other.maybe);
        self.definitely.intersect_with(&other.definitely);
    }

    fn record(&mut self, writes: &[RegisterId]) {
        for w in writes {
            self.maybe.insert(w.index());
            self.definitely.insert(w.index());
        }
    }

    /// Written on some paths but not all
    pub fn is_ambiguous(&self, id: RegisterId) -> bool {
        self.maybe.contains(id.index()) && !self.definitely.contains(id.index())
    }

    pub fn maybe_written(&self, id: RegisterId) -> bool {
        self.maybe.contains(id.index())
    }
}

/// Entry state per microcode offset; `None` marks unreachable microcode.
#[derive(Clone, Debug)]
pub struct WriteMap {
    states: Vec<Option<WriteState>>,
}

impl WriteMap {
    pub fn new(codes: &[Code]) -> Self {
        let mut states: Vec<Option<WriteState>> = vec![None; codes.len()];
        if let Some(first) = states.first_mut() {
            *first = Some(WriteState::default());
        }

        for (offset, code) in codes.iter().enumerate() {
            let Some(entry) = states[offset].clone() else {
                continue;
            };
            let mut exit = entry;
            exit.record(&code.writes());

            for succ in code.successors(offset) {
                if succ <= offset || succ >= codes.len() {
                    continue;
                }
                match &mut states[succ] {
                    Some(state) => state.join(&exit),
                    slot @ None => *slot = Some(exit.clone()),
                }
            }
        }

        Self { states }
    }

    pub fn get(&self, offset: usize) -> Option<&WriteState> {
        self.states.get(offset).and_then(Option::as_ref)
    }

    pub fn is_reachable(&self, offset: usize) -> bool {
        self.get(offset).is_some()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
