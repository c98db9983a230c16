use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::core::types::{segment_of, segment_to_signed, Placement};

/// Ranks stay below `2^RANK_BITS`
const RANK_BITS: u32 = 62;
const RANK_LIMIT: u64 = 1 << RANK_BITS;

/// Rank distance between neighbours in a fresh or relabelled interval, and
/// the step by which an end stub moves outward to make room at that end
const RANK_SPACING: u64 = 1 << 32;

/// A rank window of width `2^level` may be respaced once it holds at most
/// `(2 / DENSITY_BASE)^level` nodes
const DENSITY_BASE: f64 = 1.5;

#[inline]
fn slot_index(id: u64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    {
        id as usize
    }
}

/// Arena record for one placed segment
#[derive(Debug, Clone)]
struct Slot {
    placement: Placement,
    prev: Option<u64>,
    next: Option<u64>,

    /// Key into `Reference::intervals`
    interval: usize,

    /// Strictly increasing along an interval; drives [`Reference::compare`]
    rank: u64,
}

/// Anchor record for one interval
#[derive(Debug, Clone, Copy)]
struct Interval {
    first: u64,
    last: u64,

    /// Creation order, used to order segments of different intervals
    ordinal: u64,
}

/// An ordering of oriented segments partitioned into independent intervals.
///
/// Each interval is a doubly-linked run of placements bounded by two stub
/// nodes supplied at creation. Slots live in an arena indexed by segment id and
/// link to each other by id, so unlinking and neighbour queries are O(1).
///
/// Every slot carries a rank that increases along its interval. Insertion
/// takes the midpoint rank between its neighbours. Inserting next to an end
/// stub moves the stub outward when the gap is used up, so extending an
/// interval at either end is O(1). Elsewhere a full gap respaces the smallest
/// sparse enough rank window around it, which is amortised O(log n).
/// Splitting and merging move the shorter side to the other interval key and
/// cost O(shorter side) plus a scan of the interval list.
///
/// Queries accept either sign of a segment; results report the signed value the
/// segment was inserted under.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    slots: Vec<Option<Slot>>,

    /// Interval slab; keys are never reused
    intervals: Vec<Option<Interval>>,

    /// Live interval keys in listing order
    order: Vec<usize>,

    next_ordinal: u64,
    maximum_node: u64,
    node_count: usize,
}

impl Reference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reference with room for segments `1..=segments`
    #[must_use]
    pub fn with_capacity(segments: usize) -> Self {
        Self {
            slots: Vec::with_capacity(segments + 1),
            ..Self::default()
        }
    }

    // === Queries ===

    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.order.len()
    }

    /// Number of segments currently placed, stubs included
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Largest segment id ever placed; never decreases, so `maximum_node() + 1`
    /// is always a fresh id
    #[must_use]
    pub fn maximum_node(&self) -> i64 {
        segment_to_signed(self.maximum_node)
    }

    /// Whether the segment of `side` is placed. Zero is never placed.
    #[must_use]
    pub fn contains(&self, side: i64) -> bool {
        side != 0 && self.slot(side.unsigned_abs()).is_some()
    }

    /// Placement of the segment of `side`.
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn placement(&self, side: i64) -> Placement {
        self.expect_slot(side).placement
    }

    /// True if `side` carries the sign its segment was inserted under
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn orientation(&self, side: i64) -> bool {
        self.placement(side).signed() == side
    }

    /// First node of the interval holding `side`
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn first(&self, side: i64) -> i64 {
        let interval = self.interval_of(side);
        self.signed(interval.first)
    }

    /// Last node of the interval holding `side`
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn last(&self, side: i64) -> i64 {
        let interval = self.interval_of(side);
        self.signed(interval.last)
    }

    /// Successor of `side` within its interval, `None` for the last node
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn next(&self, side: i64) -> Option<i64> {
        self.expect_slot(side).next.map(|id| self.signed(id))
    }

    /// Predecessor of `side` within its interval, `None` for the first node
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn previous(&self, side: i64) -> Option<i64> {
        self.expect_slot(side).prev.map(|id| self.signed(id))
    }

    /// Whether `side` is the first or last node of its interval
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn is_endpoint(&self, side: i64) -> bool {
        let slot = self.expect_slot(side);
        slot.prev.is_none() || slot.next.is_none()
    }

    /// First node of the `index`-th interval in listing order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= interval_count()`.
    #[must_use]
    pub fn first_of_interval(&self, index: usize) -> i64 {
        let interval = self.interval_at(index);
        self.signed(interval.first)
    }

    /// Last node of the `index`-th interval in listing order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= interval_count()`.
    #[must_use]
    pub fn last_of_interval(&self, index: usize) -> i64 {
        let interval = self.interval_at(index);
        self.signed(interval.last)
    }

    /// `(first, last)` of every interval in listing order
    pub fn intervals(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.order.iter().map(move |&key| {
            let interval = self.intervals[key]
                .as_ref()
                .expect("listed interval is live");
            (self.signed(interval.first), self.signed(interval.last))
        })
    }

    /// Number of nodes that follow `side` in its interval
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn remaining_interval_length(&self, side: i64) -> usize {
        self.walk(side).count() - 1
    }

    /// Orders two segments by position, ignoring orientation.
    ///
    /// Segments of the same interval compare by position; segments of different
    /// intervals compare by interval creation order.
    ///
    /// # Panics
    ///
    /// Panics if either segment is not in the reference.
    #[must_use]
    pub fn compare(&self, a: i64, b: i64) -> Ordering {
        let key = |side: i64| {
            let slot = self.expect_slot(side);
            let ordinal = self.intervals[slot.interval]
                .as_ref()
                .expect("slot interval is live")
                .ordinal;
            (ordinal, slot.rank)
        };
        key(a).cmp(&key(b))
    }

    /// Whether sides `m` and `n` face each other across a gap in the reference
    #[must_use]
    pub fn is_consistent(&self, m: i64, n: i64) -> bool {
        if !self.contains(m) || !self.contains(n) {
            return false;
        }
        let placement = self.placement(m);
        if placement.right_side() == m {
            self.next(m)
                .is_some_and(|next| Placement::from_signed(next).left_side() == n)
        } else {
            self.previous(m)
                .is_some_and(|prev| Placement::from_signed(prev).right_side() == n)
        }
    }

    /// Signed nodes from `side` to the end of its interval, `side`'s node first
    ///
    /// # Panics
    ///
    /// Panics if the segment is not in the reference.
    #[must_use]
    pub fn walk(&self, side: i64) -> Walk<'_> {
        let _ = self.expect_slot(side);
        Walk {
            reference: self,
            current: Some(side.unsigned_abs()),
        }
    }

    /// Every pair of consecutive placements, interval by interval
    #[must_use]
    pub fn adjacencies(&self) -> Adjacencies<'_> {
        Adjacencies {
            reference: self,
            interval: 0,
            current: None,
        }
    }

    // === Mutation ===

    /// Open a new interval holding only its two stubs, listed last.
    ///
    /// # Panics
    ///
    /// Panics if either stub is zero, already placed, or both name one segment.
    pub fn make_new_interval(&mut self, left: i64, right: i64) {
        assert!(
            segment_of(left) != segment_of(right),
            "interval stubs {left} and {right} name the same segment"
        );
        let key = self.intervals.len();
        let ordinal = self.take_ordinal();
        self.intervals.push(Some(Interval {
            first: left.unsigned_abs(),
            last: right.unsigned_abs(),
            ordinal,
        }));
        self.order.push(key);
        // start mid-range so both stubs can move outward
        let base = RANK_LIMIT / 2;
        self.occupy(left, key, None, Some(right.unsigned_abs()), base);
        self.occupy(right, key, Some(left.unsigned_abs()), None, base + RANK_SPACING);
    }

    /// Place `node` directly after `after`, oriented by its sign.
    ///
    /// # Panics
    ///
    /// Panics if `node` is zero or already placed, if `after` is not placed, or
    /// if `after` is the last node of its interval.
    pub fn insert_node(&mut self, after: i64, node: i64) {
        let (interval, next) = {
            let slot = self.expect_slot(after);
            let next = slot.next.unwrap_or_else(|| {
                panic!("cannot insert {node} after {after}: it ends its interval")
            });
            (slot.interval, next)
        };
        let after_id = after.unsigned_abs();
        let rank = self.make_room(interval, after_id, next);
        self.occupy(node, interval, Some(after_id), Some(next), rank);
        let id = node.unsigned_abs();
        self.slot_mut(after_id).next = Some(id);
        self.slot_mut(next).prev = Some(id);
    }

    /// Detach a non-stub node from its interval.
    ///
    /// # Panics
    ///
    /// Panics if the segment is not placed or is an interval endpoint.
    pub(crate) fn remove_node(&mut self, side: i64) {
        let slot = self.expect_slot(side);
        let (prev, next) = match (slot.prev, slot.next) {
            (Some(prev), Some(next)) => (prev, next),
            _ => panic!("cannot remove interval endpoint {side}"),
        };
        self.slot_mut(prev).next = Some(next);
        self.slot_mut(next).prev = Some(prev);
        self.slots[slot_index(side.unsigned_abs())] = None;
        self.node_count -= 1;
    }

    /// Split the interval holding `at` after `at`: the old interval now ends with
    /// `stub1`, and a new interval, listed last, starts with `stub2` and holds the
    /// remainder.
    ///
    /// # Panics
    ///
    /// Panics if `at` is not placed or ends its interval, or if the stubs are
    /// zero, already placed, or name one segment.
    pub fn split_interval(&mut self, at: i64, stub1: i64, stub2: i64) {
        assert!(
            segment_of(stub1) != segment_of(stub2),
            "split stubs {stub1} and {stub2} name the same segment"
        );
        let (key, next, at_rank) = {
            let slot = self.expect_slot(at);
            let next = slot
                .next
                .unwrap_or_else(|| panic!("cannot split after {at}: it ends its interval"));
            (slot.interval, next, slot.rank)
        };
        let at_id = at.unsigned_abs();
        let next_rank = self.linked(next).rank;
        let old = *self.interval_by_key(key);
        let ordinal = self.take_ordinal();
        let new_key = self.intervals.len();

        // each stub takes the rank of the neighbour it replaces across the cut
        self.occupy(stub1, key, Some(at_id), None, next_rank);
        self.occupy(stub2, key, None, Some(next), at_rank);
        let (stub1_id, stub2_id) = (stub1.unsigned_abs(), stub2.unsigned_abs());
        self.slot_mut(at_id).next = Some(stub1_id);
        self.slot_mut(next).prev = Some(stub2_id);

        let head = Interval {
            first: old.first,
            last: stub1_id,
            ordinal: old.ordinal,
        };
        let tail = Interval {
            first: stub2_id,
            last: old.last,
            ordinal,
        };
        // the shorter side moves to the new key; the tail is always listed last
        let (head_shorter, count) = self.shorter_run(stub1_id, stub2_id);
        if head_shorter {
            self.rekey(old.first, count, new_key);
            self.intervals[key] = Some(tail);
            self.intervals.push(Some(head));
            if let Some(entry) = self.order.iter_mut().find(|entry| **entry == key) {
                *entry = new_key;
            }
            self.order.push(key);
        } else {
            self.rekey(stub2_id, count, new_key);
            self.intervals[key] = Some(head);
            self.intervals.push(Some(tail));
            self.order.push(new_key);
        }
    }

    /// Join the interval ending with `last_stub` to the interval starting with
    /// `first_stub`, dropping both stubs. Inverse of
    /// [`split_interval`](Self::split_interval).
    ///
    /// # Panics
    ///
    /// Panics if the stubs are not the last and first nodes of two different
    /// intervals.
    pub fn merge_intervals(&mut self, last_stub: i64, first_stub: i64) {
        let left = self.expect_slot(last_stub).clone();
        let right = self.expect_slot(first_stub).clone();
        assert!(
            left.next.is_none(),
            "{last_stub} does not end its interval"
        );
        assert!(
            right.prev.is_none(),
            "{first_stub} does not start its interval"
        );
        assert!(
            left.interval != right.interval,
            "{last_stub} and {first_stub} bound the same interval"
        );
        let (Some(prev), Some(next)) = (left.prev, right.next) else {
            unreachable!("intervals always hold two stubs");
        };

        self.slots[slot_index(last_stub.unsigned_abs())] = None;
        self.slots[slot_index(first_stub.unsigned_abs())] = None;
        self.node_count -= 2;
        self.slot_mut(prev).next = Some(next);
        self.slot_mut(next).prev = Some(prev);

        let joined = Interval {
            first: self.interval_by_key(left.interval).first,
            last: self.interval_by_key(right.interval).last,
            ordinal: self.interval_by_key(left.interval).ordinal,
        };
        let (prev_rank, next_rank) = (self.linked(prev).rank, self.linked(next).rank);
        let (head_shorter, count) = self.shorter_run(prev, next);

        // the shorter side joins the other key, re-ranked past the kept side
        // when the two rank ranges overlap
        let mut ranked = prev_rank < next_rank;
        let (kept, moved) = if head_shorter {
            if !ranked {
                let step = next_rank / (count + 1);
                if step > 0 {
                    self.spread(joined.first, count, step, step);
                    ranked = true;
                }
            }
            self.rekey(joined.first, count, right.interval);
            (right.interval, left.interval)
        } else {
            if !ranked {
                let step = (RANK_LIMIT - 1 - prev_rank) / (count + 1);
                if step > 0 {
                    self.spread(next, count, prev_rank + step, step);
                    ranked = true;
                }
            }
            self.rekey(next, count, left.interval);
            (left.interval, right.interval)
        };
        self.intervals[kept] = Some(joined);
        self.intervals[moved] = None;

        // the joined interval keeps the left interval's place in the listing
        self.order.retain(|&key| key != right.interval);
        if let Some(entry) = self
            .order
            .iter_mut()
            .find(|entry| **entry == left.interval)
        {
            *entry = kept;
        }
        if !ranked {
            self.relabel(kept);
        }
    }

    /// Remove every interval containing one of `nodes`, together with all of
    /// its members. Intended to be called with interval first nodes.
    ///
    /// # Panics
    ///
    /// Panics if any of `nodes` is not in the reference.
    pub fn remove_intervals<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = i64>,
    {
        let keys: BTreeSet<usize> = nodes
            .into_iter()
            .map(|side| self.expect_slot(side).interval)
            .collect();
        for &key in &keys {
            let mut current = Some(self.interval_by_key(key).first);
            while let Some(id) = current {
                current = self.slot_mut(id).next;
                self.slots[slot_index(id)] = None;
                self.node_count -= 1;
            }
            self.intervals[key] = None;
        }
        self.order.retain(|key| !keys.contains(key));
    }

    // === Internals ===

    fn slot(&self, id: u64) -> Option<&Slot> {
        self.slots.get(slot_index(id)).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: u64) -> &mut Slot {
        self.slots
            .get_mut(slot_index(id))
            .and_then(Option::as_mut)
            .expect("linked slot is live")
    }

    fn expect_slot(&self, side: i64) -> &Slot {
        assert!(side != 0, "zero is not a valid segment side");
        self.slot(side.unsigned_abs())
            .unwrap_or_else(|| panic!("node {side} is not in the reference"))
    }

    fn signed(&self, id: u64) -> i64 {
        self.linked(id).placement.signed()
    }

    fn interval_by_key(&self, key: usize) -> &Interval {
        self.intervals[key].as_ref().expect("interval is live")
    }

    fn interval_by_key_mut(&mut self, key: usize) -> &mut Interval {
        self.intervals[key].as_mut().expect("interval is live")
    }

    fn interval_of(&self, side: i64) -> &Interval {
        let key = self.expect_slot(side).interval;
        self.interval_by_key(key)
    }

    fn interval_at(&self, index: usize) -> &Interval {
        let key = *self.order.get(index).unwrap_or_else(|| {
            panic!(
                "interval index {index} out of range ({} intervals)",
                self.order.len()
            )
        });
        self.interval_by_key(key)
    }

    fn take_ordinal(&mut self) -> u64 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }

    /// Claim the slot for `side`, validating it is fresh
    fn occupy(&mut self, side: i64, interval: usize, prev: Option<u64>, next: Option<u64>, rank: u64) {
        let id = segment_of(side);
        assert!(
            self.slot(id).is_none(),
            "segment {id} is already in the reference"
        );
        let index = slot_index(id);
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(Slot {
            placement: Placement::from_signed(side),
            prev,
            next,
            interval,
            rank,
        });
        self.maximum_node = self.maximum_node.max(id);
        self.node_count += 1;
    }

    /// Slot of a segment reached through a link
    fn linked(&self, id: u64) -> &Slot {
        self.slot(id).expect("linked slot is live")
    }

    fn midpoint(&self, left: u64, right: u64) -> Option<u64> {
        let low = self.linked(left).rank;
        let high = self.linked(right).rank;
        (high - low >= 2).then(|| low + (high - low) / 2)
    }

    /// Free rank strictly between `left` and its successor `right`
    fn make_room(&mut self, key: usize, left: u64, right: u64) -> u64 {
        if let Some(rank) = self.midpoint(left, right) {
            return rank;
        }
        let (left_rank, opens) = {
            let slot = self.linked(left);
            (slot.rank, slot.prev.is_none())
        };
        let (right_rank, closes) = {
            let slot = self.linked(right);
            (slot.rank, slot.next.is_none())
        };
        // next to an end stub, move the stub outward
        if closes && right_rank < RANK_LIMIT - RANK_SPACING {
            self.slot_mut(right).rank = right_rank + RANK_SPACING;
        } else if opens && left_rank >= RANK_SPACING {
            self.slot_mut(left).rank = left_rank - RANK_SPACING;
        } else {
            self.respace(key, left);
        }
        self.midpoint(left, right)
            .expect("respaced ranks leave room between neighbours")
    }

    /// Respace the smallest aligned rank window around `left` that reaches its
    /// successor and is sparse enough, falling back to the whole interval.
    fn respace(&mut self, key: usize, left: u64) {
        let rank = self.linked(left).rank;
        let (mut low_id, mut high_id, mut count) = (left, left, 1u64);
        for level in 1..RANK_BITS {
            let width = 1u64 << level;
            let low = rank & !(width - 1);
            let high = low + (width - 1);
            while let Some(prev) = self
                .linked(low_id)
                .prev
                .filter(|&id| self.linked(id).rank >= low)
            {
                low_id = prev;
                count += 1;
            }
            while let Some(next) = self
                .linked(high_id)
                .next
                .filter(|&id| self.linked(id).rank <= high)
            {
                high_id = next;
                count += 1;
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
            let capacity = (2.0 / DENSITY_BASE).powi(level as i32);
            #[allow(clippy::cast_precision_loss)]
            let sparse = count as f64 <= capacity;
            if high_id != left && sparse {
                self.spread(low_id, count, low, width / count);
                return;
            }
        }
        self.relabel(key);
    }

    /// Give `count` nodes from `start` the ranks `first_rank + i * step`
    fn spread(&mut self, start: u64, count: u64, first_rank: u64, step: u64) {
        let mut current = Some(start);
        let mut rank = first_rank;
        for _ in 0..count {
            let Some(id) = current else { break };
            let slot = self.slot_mut(id);
            slot.rank = rank;
            current = slot.next;
            rank += step;
        }
    }

    /// Move `count` nodes from `start` to interval `key`
    fn rekey(&mut self, start: u64, count: u64, key: usize) {
        let mut current = Some(start);
        for _ in 0..count {
            let Some(id) = current else { break };
            let slot = self.slot_mut(id);
            slot.interval = key;
            current = slot.next;
        }
    }

    /// Walks back from `left` and forward from `right` in step; reports whether
    /// the run ending at `left` is the shorter one, and that run's length
    fn shorter_run(&self, left: u64, right: u64) -> (bool, u64) {
        let (mut back, mut forward) = (Some(left), Some(right));
        let mut count = 0;
        loop {
            match (back, forward) {
                (None, _) => return (true, count),
                (_, None) => return (false, count),
                (Some(b), Some(f)) => {
                    back = self.linked(b).prev;
                    forward = self.linked(f).next;
                    count += 1;
                }
            }
        }
    }

    /// Reassign evenly spaced ranks, centred in the rank range, along an interval
    fn relabel(&mut self, key: usize) {
        let first = self.interval_by_key(key).first;
        let mut count = 0u64;
        let mut current = Some(first);
        while let Some(id) = current {
            current = self.linked(id).next;
            count += 1;
        }
        let step = (RANK_LIMIT / (count + 2)).min(RANK_SPACING);
        assert!(step >= 2, "interval of {count} nodes is too long to rank");
        let start = (RANK_LIMIT - step * (count - 1)) / 2;
        self.spread(first, count, start, step);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reference: {} intervals, {} nodes",
            self.interval_count(),
            self.node_count()
        )?;
        for (index, (first, _)) in self.intervals().enumerate() {
            write!(f, "  Interval {index}:")?;
            for node in self.walk(first) {
                write!(f, " {node}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over signed nodes to the end of an interval; see [`Reference::walk`]
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    reference: &'a Reference,
    current: Option<u64>,
}

impl Iterator for Walk<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let id = self.current?;
        let slot = self.reference.slot(id)?;
        self.current = slot.next;
        Some(slot.placement.signed())
    }
}

/// Iterator over consecutive placements; see [`Reference::adjacencies`]
#[derive(Debug, Clone)]
pub struct Adjacencies<'a> {
    reference: &'a Reference,

    /// Position in listing order of the next interval to enter
    interval: usize,
    current: Option<u64>,
}

impl Iterator for Adjacencies<'_> {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        loop {
            if let Some(id) = self.current {
                let slot = self.reference.slot(id)?;
                if let Some(next) = slot.next {
                    self.current = Some(next);
                    return Some((slot.placement.signed(), self.reference.signed(next)));
                }
                self.current = None;
            }
            let key = *self.reference.order.get(self.interval)?;
            self.interval += 1;
            self.current = Some(self.reference.interval_by_key(key).first);
        }
    }
}
