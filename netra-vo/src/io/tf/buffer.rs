//! Time-indexed frame tree.

use std::collections::HashMap;
use std::time::Duration;

use super::chain::TransformChain;
use super::{LookupError, TransformProvider};
use crate::core::frames::GeometryError;
use crate::core::types::{RigidTransform, Stamp, TransformStamped};

/// Default history kept per edge.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(100);

/// Longest parent chain followed before assuming a loop.
const MAX_GRAPH_DEPTH: usize = 1000;

/// Tree of coordinate frames with a transform history on every edge.
///
/// Every frame has at most one parent. An edge stores the transform mapping
/// points in the child frame into the parent frame, either as a static
/// value or as time-stamped samples covering `cache_duration`.
#[derive(Debug, Clone)]
pub struct TransformBuffer {
    /// child frame → edge to its parent
    chains: HashMap<String, TransformChain>,
    cache_ns: u64,
}

impl TransformBuffer {
    pub fn new(cache_duration: Duration) -> Self {
        Self {
            chains: HashMap::new(),
            cache_ns: cache_duration.as_nanos().min(u64::MAX as u128) as u64,
        }
    }

    /// Add a time-stamped transform.
    pub fn set_transform(&mut self, msg: &TransformStamped) -> Result<(), GeometryError> {
        Self::check(msg)?;
        let chain = self
            .chains
            .entry(msg.child_frame_id.clone())
            .or_insert_with(|| TransformChain::new_dynamic(msg.frame_id.clone()));

        if chain.parent != msg.frame_id {
            log::debug!(
                "Frame \"{}\" reparented from \"{}\" to \"{}\"",
                msg.child_frame_id,
                chain.parent,
                msg.frame_id
            );
            *chain = TransformChain::new_dynamic(msg.frame_id.clone());
        }
        chain.insert(msg.stamp, msg.transform, self.cache_ns);
        Ok(())
    }

    /// Add a transform valid at every time. Replaces any history of the edge.
    pub fn set_static_transform(&mut self, msg: &TransformStamped) -> Result<(), GeometryError> {
        Self::check(msg)?;
        self.chains.insert(
            msg.child_frame_id.clone(),
            TransformChain::new_static(msg.frame_id.clone(), msg.transform),
        );
        Ok(())
    }

    fn check(msg: &TransformStamped) -> Result<(), GeometryError> {
        if msg.frame_id.is_empty() || msg.child_frame_id.is_empty() {
            return Err(GeometryError::InvalidArgument("empty frame id".to_string()));
        }
        if msg.frame_id == msg.child_frame_id {
            return Err(GeometryError::InvalidArgument(format!(
                "frame \"{}\" cannot be its own parent",
                msg.frame_id
            )));
        }
        msg.transform.validate()
    }

    /// Whether `frame` appears anywhere in the tree.
    pub fn has_frame(&self, frame: &str) -> bool {
        self.chains.contains_key(frame) || self.chains.values().any(|c| c.parent == frame)
    }

    /// All known frame names, sorted.
    pub fn frames(&self) -> Vec<String> {
        let mut frames: Vec<String> = self
            .chains
            .iter()
            .flat_map(|(child, chain)| [child.clone(), chain.parent.clone()])
            .collect();
        frames.sort();
        frames.dedup();
        frames
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn clear(&mut self) {
        self.chains.clear();
    }

    /// `frame` and each ancestor, paired with the transform from `frame`
    /// into that ancestor.
    fn ancestors(&self, frame: &str, stamp: Stamp) -> Result<Vec<(String, RigidTransform)>, LookupError> {
        let mut path = vec![(frame.to_string(), RigidTransform::identity())];
        let mut current = frame;
        let mut acc = RigidTransform::identity();

        while let Some(chain) = self.chains.get(current) {
            if path.len() > MAX_GRAPH_DEPTH {
                return Err(LookupError::Lookup(format!(
                    "frame tree above \"{}\" exceeds depth {}, likely a loop",
                    frame, MAX_GRAPH_DEPTH
                )));
            }
            let edge = chain.sample(stamp, current)?;
            acc = edge
                .compose(&acc)
                .map_err(|e| LookupError::Lookup(e.to_string()))?;
            path.push((chain.parent.clone(), acc));
            current = &chain.parent;
        }
        Ok(path)
    }
}

impl Default for TransformBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DURATION)
    }
}

impl TransformProvider for TransformBuffer {
    fn can_transform(&self, target: &str, source: &str) -> bool {
        self.lookup_transform(target, source, Stamp::ZERO).is_ok()
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        stamp: Stamp,
    ) -> Result<RigidTransform, LookupError> {
        for frame in [target, source] {
            if !self.has_frame(frame) {
                return Err(LookupError::Lookup(format!(
                    "frame \"{}\" does not exist",
                    frame
                )));
            }
        }
        if target == source {
            return Ok(RigidTransform::identity());
        }

        let from_source = self.ancestors(source, stamp)?;
        let from_target = self.ancestors(target, stamp)?;

        // First ancestor of the target that is also above the source
        for (frame, target_to_common) in &from_target {
            if let Some((_, source_to_common)) = from_source.iter().find(|(f, _)| f == frame) {
                return target_to_common
                    .inverse()
                    .and_then(|common_to_target| common_to_target.compose(source_to_common))
                    .map_err(|e| LookupError::Lookup(e.to_string()));
            }
        }

        Err(LookupError::Connectivity(format!(
            "\"{}\" and \"{}\" are not part of the same tree",
            target, source
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Quaternion, Vector3};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn msg(parent: &str, child: &str, secs: u32, transform: RigidTransform) -> TransformStamped {
        TransformStamped::new(Stamp::new(secs, 0), parent, child, transform)
    }

    #[test]
    fn test_unknown_frame() {
        let buffer = TransformBuffer::default();
        assert!(!buffer.can_transform("world_frame", "camera_frame"));
        assert!(matches!(
            buffer.lookup_transform("world_frame", "camera_frame", Stamp::ZERO),
            Err(LookupError::Lookup(_))
        ));
    }

    #[test]
    fn test_direct_edge() {
        let mut buffer = TransformBuffer::default();
        buffer
            .set_transform(&msg("world_frame", "camera_frame", 5, RigidTransform::from_translation(1.0, 2.0, 0.0)))
            .unwrap();

        assert!(buffer.can_transform("world_frame", "camera_frame"));
        let t = buffer
            .lookup_transform("world_frame", "camera_frame", Stamp::new(5, 0))
            .unwrap();
        assert_relative_eq!(t.translation.x, 1.0);

        // Reverse direction is the inverse
        let back = buffer
            .lookup_transform("camera_frame", "world_frame", Stamp::new(5, 0))
            .unwrap();
        assert_relative_eq!(back.translation.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(back.translation.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_through_common_ancestor() {
        let mut buffer = TransformBuffer::default();
        // world <- base (rotated 90°, at (1, 0)) <- camera (0.5 ahead of base)
        buffer
            .set_transform(&msg("world_frame", "base_link", 5, RigidTransform::planar(1.0, 0.0, FRAC_PI_2)))
            .unwrap();
        buffer
            .set_static_transform(&msg("base_link", "camera_frame", 0, RigidTransform::from_translation(0.5, 0.0, 0.0)))
            .unwrap();
        buffer
            .set_static_transform(&msg("world_frame", "map", 0, RigidTransform::from_translation(0.0, 10.0, 0.0)))
            .unwrap();

        let t = buffer
            .lookup_transform("world_frame", "camera_frame", Stamp::new(5, 0))
            .unwrap();
        let (x, y) = t.apply(0.0, 0.0).unwrap();
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.5, epsilon = 1e-12);

        // Sibling subtree: camera origin seen from map
        let t = buffer
            .lookup_transform("map", "camera_frame", Stamp::new(5, 0))
            .unwrap();
        let (x, y) = t.apply(0.0, 0.0).unwrap();
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(y, -9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_disconnected_trees() {
        let mut buffer = TransformBuffer::default();
        buffer
            .set_transform(&msg("world_frame", "base_link", 1, RigidTransform::identity()))
            .unwrap();
        buffer
            .set_transform(&msg("odom", "camera_frame", 1, RigidTransform::identity()))
            .unwrap();

        assert!(matches!(
            buffer.lookup_transform("world_frame", "camera_frame", Stamp::new(1, 0)),
            Err(LookupError::Connectivity(_))
        ));
    }

    #[test]
    fn test_extrapolation_at_untracked_time() {
        let mut buffer = TransformBuffer::default();
        buffer
            .set_transform(&msg("world_frame", "camera_frame", 5, RigidTransform::identity()))
            .unwrap();

        assert!(buffer.can_transform("world_frame", "camera_frame"));
        assert!(matches!(
            buffer.lookup_transform("world_frame", "camera_frame", Stamp::new(6, 0)),
            Err(LookupError::Extrapolation(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let mut buffer = TransformBuffer::default();
        let bad_rotation = RigidTransform::new(Vector3::zero(), Quaternion::new(0.0, 0.0, 0.0, 3.0));

        assert!(buffer.set_transform(&msg("world_frame", "cam", 1, bad_rotation)).is_err());
        assert!(buffer.set_transform(&msg("", "cam", 1, RigidTransform::identity())).is_err());
        assert!(buffer.set_transform(&msg("cam", "cam", 1, RigidTransform::identity())).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reparenting_discards_history() {
        let mut buffer = TransformBuffer::default();
        buffer
            .set_transform(&msg("world_frame", "cam", 1, RigidTransform::identity()))
            .unwrap();
        buffer
            .set_transform(&msg("odom", "cam", 2, RigidTransform::identity()))
            .unwrap();

        assert_eq!(buffer.frames(), vec!["cam", "odom"]);
        assert!(buffer.lookup_transform("odom", "cam", Stamp::new(1, 0)).is_err());
        assert!(buffer.lookup_transform("odom", "cam", Stamp::new(2, 0)).is_ok());
    }

    #[test]
    fn test_same_frame_is_identity() {
        let mut buffer = TransformBuffer::default();
        buffer
            .set_transform(&msg("world_frame", "cam", 1, RigidTransform::planar(3.0, 3.0, 1.0)))
            .unwrap();
        let t = buffer.lookup_transform("cam", "cam", Stamp::new(9, 0)).unwrap();
        assert_eq!(t, RigidTransform::identity());
    }
}
