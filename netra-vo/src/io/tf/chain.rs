//! Transform history of a single child→parent edge.

use std::collections::VecDeque;

use super::LookupError;
use crate::core::types::{RigidTransform, Stamp};

/// Data for one edge of the frame tree.
#[derive(Debug, Clone)]
pub(crate) enum EdgeData {
    /// Valid at every time.
    Static(RigidTransform),
    /// Time-sorted samples, oldest first.
    Dynamic(VecDeque<(Stamp, RigidTransform)>),
}

/// One edge: the child's parent frame and the transforms between them.
#[derive(Debug, Clone)]
pub(crate) struct TransformChain {
    pub parent: String,
    data: EdgeData,
}

impl TransformChain {
    pub fn new_static(parent: String, transform: RigidTransform) -> Self {
        Self {
            parent,
            data: EdgeData::Static(transform),
        }
    }

    pub fn new_dynamic(parent: String) -> Self {
        Self {
            parent,
            data: EdgeData::Dynamic(VecDeque::new()),
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        matches!(self.data, EdgeData::Static(_))
    }

    /// Number of stored samples (1 for a static edge).
    pub fn len(&self) -> usize {
        match &self.data {
            EdgeData::Static(_) => 1,
            EdgeData::Dynamic(history) => history.len(),
        }
    }

    /// Insert a sample keeping time order. A sample at an existing stamp
    /// replaces it. Samples older than `cache_ns` before the newest one are
    /// dropped.
    pub fn insert(&mut self, stamp: Stamp, transform: RigidTransform, cache_ns: u64) {
        if self.is_static() {
            self.data = EdgeData::Dynamic(VecDeque::new());
        }
        let EdgeData::Dynamic(history) = &mut self.data else {
            return;
        };

        match history.binary_search_by(|(s, _)| s.cmp(&stamp)) {
            Ok(i) => history[i] = (stamp, transform),
            Err(i) => history.insert(i, (stamp, transform)),
        }

        if let Some(&(newest, _)) = history.back() {
            let horizon = newest.as_nanos().saturating_sub(cache_ns);
            while history.len() > 1 && history.front().is_some_and(|(s, _)| s.as_nanos() < horizon) {
                history.pop_front();
            }
        }
    }

    /// Transform at `stamp`; a zero stamp selects the newest sample.
    pub fn sample(&self, stamp: Stamp, child: &str) -> Result<RigidTransform, LookupError> {
        let history = match &self.data {
            EdgeData::Static(transform) => return Ok(*transform),
            EdgeData::Dynamic(history) => history,
        };

        let (Some(&(first, first_tf)), Some(&(last, last_tf))) = (history.front(), history.back())
        else {
            return Err(LookupError::Lookup(format!(
                "no transform data between \"{}\" and \"{}\"",
                child, self.parent
            )));
        };

        if stamp.is_zero() {
            return Ok(last_tf);
        }
        if stamp < first || stamp > last {
            return Err(LookupError::Extrapolation(format!(
                "requested {:.6} for \"{}\" -> \"{}\", data covers [{:.6}, {:.6}]",
                stamp.as_secs_f64(),
                child,
                self.parent,
                first.as_secs_f64(),
                last.as_secs_f64()
            )));
        }
        if stamp == first {
            return Ok(first_tf);
        }

        let i = match history.binary_search_by(|(s, _)| s.cmp(&stamp)) {
            Ok(i) => return Ok(history[i].1),
            Err(i) => i,
        };
        let (t0, before) = history[i - 1];
        let (t1, after) = history[i];
        let ratio = (stamp.as_nanos() - t0.as_nanos()) as f64 / (t1.as_nanos() - t0.as_nanos()) as f64;

        before
            .interpolate(&after, ratio)
            .map_err(|e| LookupError::Lookup(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CACHE_NS: u64 = 100_000_000_000;

    fn at(secs: u32) -> Stamp {
        Stamp::new(secs, 0)
    }

    #[test]
    fn test_empty_chain_is_lookup_error() {
        let chain = TransformChain::new_dynamic("world".into());
        assert!(matches!(chain.sample(at(1), "cam"), Err(LookupError::Lookup(_))));
    }

    #[test]
    fn test_exact_and_interpolated_samples() {
        let mut chain = TransformChain::new_dynamic("world".into());
        chain.insert(at(4), RigidTransform::from_translation(0.0, 0.0, 0.0), CACHE_NS);
        chain.insert(at(6), RigidTransform::from_translation(2.0, 4.0, 0.0), CACHE_NS);

        let exact = chain.sample(at(6), "cam").unwrap();
        assert_relative_eq!(exact.translation.x, 2.0);

        let mid = chain.sample(at(5), "cam").unwrap();
        assert_relative_eq!(mid.translation.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mid.translation.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_extrapolation_outside_range() {
        let mut chain = TransformChain::new_dynamic("world".into());
        chain.insert(at(4), RigidTransform::identity(), CACHE_NS);
        chain.insert(at(6), RigidTransform::identity(), CACHE_NS);

        assert!(matches!(chain.sample(at(3), "cam"), Err(LookupError::Extrapolation(_))));
        assert!(matches!(chain.sample(at(7), "cam"), Err(LookupError::Extrapolation(_))));
        assert!(chain.sample(Stamp::ZERO, "cam").is_ok());
    }

    #[test]
    fn test_out_of_order_insert_and_replace() {
        let mut chain = TransformChain::new_dynamic("world".into());
        chain.insert(at(6), RigidTransform::from_translation(6.0, 0.0, 0.0), CACHE_NS);
        chain.insert(at(2), RigidTransform::from_translation(2.0, 0.0, 0.0), CACHE_NS);
        chain.insert(at(6), RigidTransform::from_translation(7.0, 0.0, 0.0), CACHE_NS);

        assert_eq!(chain.len(), 2);
        assert_relative_eq!(chain.sample(at(2), "cam").unwrap().translation.x, 2.0);
        assert_relative_eq!(chain.sample(Stamp::ZERO, "cam").unwrap().translation.x, 7.0);
    }

    #[test]
    fn test_cache_pruning() {
        let mut chain = TransformChain::new_dynamic("world".into());
        for secs in 0..10 {
            chain.insert(at(secs), RigidTransform::identity(), 3_000_000_000);
        }
        // Keeps [6, 9]
        assert_eq!(chain.len(), 4);
        assert!(chain.sample(at(5), "cam").is_err());
        assert!(chain.sample(at(6), "cam").is_ok());
    }

    #[test]
    fn test_static_valid_at_any_time() {
        let chain = TransformChain::new_static("base".into(), RigidTransform::from_translation(1.0, 0.0, 0.0));
        assert!(chain.is_static());
        assert!(chain.sample(at(1_000), "cam").is_ok());
        assert!(chain.sample(Stamp::ZERO, "cam").is_ok());
    }
}
