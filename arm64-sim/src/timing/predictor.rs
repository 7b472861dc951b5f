//! Direct-mapped branch target buffer with 2-bit saturating confidence
//! counters.
//!
//! Indexed by the low bits of the word-aligned PC (`pc / 4 % entries`);
//! the remaining bits are kept as a tag so two aliasing PCs don't pass
//! off each other's predictions as confident hits.

/// One predicted outcome for a branch about to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub taken: bool,
    pub target: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    StronglyNotTaken,
    WeaklyNotTaken,
    WeaklyTaken,
    StronglyTaken,
}

impl Counter {
    fn is_taken(self) -> bool {
        matches!(self, Counter::WeaklyTaken | Counter::StronglyTaken)
    }

    fn update(self, taken: bool) -> Self {
        use Counter::*;
        match (self, taken) {
            (StronglyNotTaken, false) => StronglyNotTaken,
            (StronglyNotTaken, true) => WeaklyNotTaken,
            (WeaklyNotTaken, false) => StronglyNotTaken,
            (WeaklyNotTaken, true) => WeaklyTaken,
            (WeaklyTaken, false) => WeaklyNotTaken,
            (WeaklyTaken, true) => StronglyTaken,
            (StronglyTaken, false) => WeaklyTaken,
            (StronglyTaken, true) => StronglyTaken,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u64,
    target: u64,
    counter: Counter,
    valid: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            tag: 0,
            target: 0,
            counter: Counter::WeaklyNotTaken,
            valid: false,
        }
    }
}

/// A fixed-size direct-mapped BTB.
#[derive(Debug, Clone)]
pub struct BranchPredictor {
    entries: Vec<Entry>,
}

impl BranchPredictor {
    pub fn new(num_entries: u32) -> Self {
        Self {
            entries: vec![Entry::default(); num_entries.max(1) as usize],
        }
    }

    fn index_and_tag(&self, pc: u64) -> (usize, u64) {
        let n = self.entries.len() as u64;
        let word = pc / 4;
        ((word % n) as usize, word / n)
    }

    /// Predict the outcome of a branch fetched at `pc`. An absent or
    /// tag-mismatched entry predicts not-taken, falling through to
    /// `pc + 4`.
    pub fn predict(&self, pc: u64) -> Prediction {
        let (index, tag) = self.index_and_tag(pc);
        let entry = &self.entries[index];
        if entry.valid && entry.tag == tag && entry.counter.is_taken() {
            Prediction {
                taken: true,
                target: entry.target,
            }
        } else {
            Prediction {
                taken: false,
                target: pc.wrapping_add(4),
            }
        }
    }

    /// Update the entry for `pc` once the branch resolves in EX.
    pub fn update(&mut self, pc: u64, taken: bool, target: u64) {
        let (index, tag) = self.index_and_tag(pc);
        let entry = &mut self.entries[index];
        if entry.valid && entry.tag == tag {
            entry.counter = entry.counter.update(taken);
            if taken {
                entry.target = target;
            }
        } else if taken {
            *entry = Entry {
                tag,
                target,
                counter: Counter::WeaklyTaken,
                valid: true,
            };
        }
        // A not-taken branch that merely aliases this slot's tag leaves
        // the resident entry alone rather than evicting it.
    }
}
