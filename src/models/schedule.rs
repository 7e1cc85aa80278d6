//! Cached time information of a tour, indexed by position.

use super::TourSequence;

/// Earliest arrivals, waiting times and forward slack of a sequence.
///
/// With `A_p` the earliest arrival at position `p`, `W_p` the waiting time
/// there and `cw[p] = W_0 + ... + W_p`, the waiting time strictly between
/// two positions is `cw[b-1] - cw[a]` and the forward slack
///
/// ```text
/// F(a, b) = min over a < p <= b of (due_p - A_p + W(a, p))
/// ```
///
/// reduces to a range minimum over `key[p] = due_p - A_p + cw[p-1]`,
/// answered by a sparse table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Schedule {
    arrival: Vec<f64>,
    waiting: Vec<f64>,
    cum_waiting: Vec<f64>,
    slack: SparseMin,
}

impl Schedule {
    /// Recomputes every position from `from` onwards. Positions before
    /// `from` are assumed to be current.
    pub(crate) fn rebuild_from(&mut self, seq: &dyn TourSequence, from: usize) {
        let nodes = seq.nodes();
        let from = from.min(self.arrival.len()).min(nodes.len());
        self.arrival.truncate(from);
        self.waiting.truncate(from);
        self.cum_waiting.truncate(from);

        for p in from..nodes.len() {
            let node = nodes[p];
            let arrival = if p == 0 {
                seq.start_time()
            } else {
                seq.arrival_after(nodes[p - 1], self.arrival[p - 1], node)
            };
            let wait = seq.time_window(node).waiting_time(arrival);
            let cw = if p == 0 {
                wait
            } else {
                self.cum_waiting[p - 1] + wait
            };
            self.arrival.push(arrival);
            self.waiting.push(wait);
            self.cum_waiting.push(cw);
        }

        let keys = nodes
            .iter()
            .enumerate()
            .map(|(p, &node)| {
                if p == 0 {
                    f64::INFINITY
                } else {
                    seq.time_window(node).due() - self.arrival[p] + self.cum_waiting[p - 1]
                }
            })
            .collect();
        self.slack = SparseMin::build(keys);
    }

    /// `D_last - (start + min(F(first, last), W(first, last) + W_last))`.
    ///
    /// Waiting at the last node counts as absorbable: a later start only
    /// shortens it as long as the arrival stays within the window.
    pub(crate) fn minimal_duration(&self, seq: &dyn TourSequence) -> f64 {
        let nodes = seq.nodes();
        let n = nodes.len();
        if n == 0 {
            return 0.0;
        }
        let start = seq.start_time();
        let completion = seq.departure_after(nodes[n - 1], self.arrival[n - 1]);
        let shift = self
            .slack_between(0, n - 1)
            .min(self.waiting_between(0, n - 1) + self.waiting[n - 1]);
        completion - (start + shift)
    }

    pub(crate) fn len(&self) -> usize {
        self.arrival.len()
    }

    pub(crate) fn arrival(&self, pos: usize) -> f64 {
        self.arrival[pos]
    }

    pub(crate) fn waiting(&self, pos: usize) -> f64 {
        self.waiting[pos]
    }

    /// Total waiting strictly between positions `a` and `b`.
    pub(crate) fn waiting_between(&self, a: usize, b: usize) -> f64 {
        if b <= a + 1 {
            0.0
        } else {
            self.cum_waiting[b - 1] - self.cum_waiting[a]
        }
    }

    /// Forward slack of position `a` relative to the positions up to `b`.
    pub(crate) fn slack_between(&self, a: usize, b: usize) -> f64 {
        if b <= a {
            f64::INFINITY
        } else {
            self.slack.min(a + 1, b) - self.cum_waiting[a]
        }
    }
}

/// Shortest possible duration of any tour representation, computed from
/// scratch.
///
/// The start of the tour is postponed as far as the downstream forward slack
/// and the waiting time allow, so idle time before the first window that can
/// be absorbed is not counted.
pub fn minimal_duration(seq: &dyn TourSequence) -> f64 {
    let mut schedule = Schedule::default();
    schedule.rebuild_from(seq, 0);
    schedule.minimal_duration(seq)
}

/// Range-minimum table over a fixed array.
#[derive(Debug, Clone, Default)]
struct SparseMin {
    levels: Vec<Vec<f64>>,
}

impl SparseMin {
    fn build(keys: Vec<f64>) -> Self {
        let n = keys.len();
        let mut levels = vec![keys];
        let mut width = 1;
        while width * 2 <= n {
            let prev = &levels[levels.len() - 1];
            let next = (0..=n - width * 2)
                .map(|i| prev[i].min(prev[i + width]))
                .collect();
            levels.push(next);
            width *= 2;
        }
        Self { levels }
    }

    /// Minimum over the inclusive range `lo..=hi`.
    fn min(&self, lo: usize, hi: usize) -> f64 {
        let len = hi - lo + 1;
        let k = (usize::BITS - 1 - len.leading_zeros()) as usize;
        let row = &self.levels[k];
        row[lo].min(row[hi + 1 - (1 << k)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_min_matches_scan() {
        let keys = vec![5.0, 3.0, 8.0, 1.0, 9.0, 2.0, 7.0];
        let table = SparseMin::build(keys.clone());
        for lo in 0..keys.len() {
            for hi in lo..keys.len() {
                let expected = keys[lo..=hi].iter().copied().fold(f64::INFINITY, f64::min);
                assert_eq!(table.min(lo, hi), expected, "range {}..={}", lo, hi);
            }
        }
    }

    #[test]
    fn test_sparse_min_single() {
        let table = SparseMin::build(vec![4.0]);
        assert_eq!(table.min(0, 0), 4.0);
    }
}
