//! The ribbon: a doubly linked list of live call/return entries.
//!
//! Nodes live in an arena and link to each other by index, with a sentinel
//! head at index 0. Each call node records the index of its matching return.
//! The search removes an accepted call together with its return (`lift`) and
//! restores both on backtrack (`unlift`); both are O(1) splices.
//!
//! Invariant: the live list always contains exactly the calls and returns
//! whose ids are not in the active linearized bitset.

use crate::history::{Entry, EntryKind};

pub(crate) const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    /// Operation id; unused for the sentinel.
    id: usize,
    prev: u32,
    next: u32,
    /// Index of the matching return for call nodes, NIL for returns and
    /// the sentinel.
    matching: u32,
}

pub(crate) struct Ribbon {
    nodes: Vec<Node>,
}

const HEAD: u32 = 0;

impl Ribbon {
    /// Build the list from a normalized entry stream over `n` operations.
    /// The list preserves the stream's interleaving of calls and returns.
    pub fn new(entries: &[Entry], n: usize) -> Self {
        let mut nodes = Vec::with_capacity(entries.len() + 1);
        nodes.push(Node {
            id: usize::MAX,
            prev: NIL,
            next: NIL,
            matching: NIL,
        });
        let mut call_at = vec![NIL; n];
        let mut return_at = vec![NIL; n];
        let mut prev = HEAD;
        for entry in entries {
            let ix = nodes.len() as u32;
            nodes.push(Node {
                id: entry.id,
                prev,
                next: NIL,
                matching: NIL,
            });
            nodes[prev as usize].next = ix;
            match entry.kind {
                EntryKind::Call => call_at[entry.id] = ix,
                EntryKind::Return => return_at[entry.id] = ix,
            }
            prev = ix;
        }
        for id in 0..n {
            nodes[call_at[id] as usize].matching = return_at[id];
        }
        Self { nodes }
    }

    /// First live node after the sentinel, or NIL when the list is empty.
    #[inline]
    pub fn front(&self) -> u32 {
        self.nodes[HEAD as usize].next
    }

    #[inline]
    pub fn next(&self, ix: u32) -> u32 {
        self.nodes[ix as usize].next
    }

    #[inline]
    pub fn id(&self, ix: u32) -> usize {
        self.nodes[ix as usize].id
    }

    /// The matching return of a call node, or NIL if `ix` is a return.
    #[inline]
    pub fn matching(&self, ix: u32) -> u32 {
        self.nodes[ix as usize].matching
    }

    /// Splice a call and its return out of the list.
    pub fn lift(&mut self, call: u32) {
        let Node { prev, next, matching, .. } = self.nodes[call as usize];
        self.nodes[prev as usize].next = next;
        // A call is always followed by at least its own return.
        self.nodes[next as usize].prev = prev;
        // Re-read: if the return was adjacent, its prev just changed.
        let ret = self.nodes[matching as usize];
        self.nodes[ret.prev as usize].next = ret.next;
        if ret.next != NIL {
            self.nodes[ret.next as usize].prev = ret.prev;
        }
    }

    /// Reinsert a lifted pair, return first, then the call. Only valid as
    /// the exact inverse of the most recent `lift` of this pair across which
    /// no neighbor was spliced.
    pub fn unlift(&mut self, call: u32) {
        let matching = self.nodes[call as usize].matching;
        let ret = self.nodes[matching as usize];
        self.nodes[ret.prev as usize].next = matching;
        if ret.next != NIL {
            self.nodes[ret.next as usize].prev = matching;
        }
        let node = self.nodes[call as usize];
        self.nodes[node.prev as usize].next = call;
        self.nodes[node.next as usize].prev = call;
    }

    /// Snapshot of the live list as (id, is_call) pairs, for tests.
    #[cfg(test)]
    pub fn live(&self) -> Vec<(usize, bool)> {
        let mut out = Vec::new();
        let mut ix = self.front();
        while ix != NIL {
            out.push((self.id(ix), self.matching(ix) != NIL));
            ix = self.next(ix);
        }
        out
    }
}
