use serde::Serialize;

use crate::track_item::TrackItem;

/// Decoded road database (`.rdb`) file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RdbFile {
    pub road_track_db: RoadTrackDb,
}

impl RdbFile {
    pub fn junction_node(
        &self,
        tile_x: i32,
        tile_z: i32,
        uid: i32,
    ) -> Result<&TrackNode, JunctionNotFound> {
        self.road_track_db.junction_node(tile_x, tile_z, uid)
    }
}

/// Road track database (`trackdb` block of an `.rdb` file).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoadTrackDb {
    /// 1-indexed: slot 0 is reserved and always `None`.
    pub track_nodes: Vec<Option<TrackNode>>,
    pub tr_items: Vec<Option<TrackItem>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("could not find junction (tile_x = {tile_x}, tile_z = {tile_z}, uid = {uid})")]
pub struct JunctionNotFound {
    pub tile_x: i32,
    pub tile_z: i32,
    pub uid: i32,
}

impl RoadTrackDb {
    /// Find the junction node placed by world object `uid` on tile
    /// (`tile_x`, `tile_z`).
    ///
    /// Linear scan over the node table; callers querying a switch always
    /// expect a hit, so a miss is an error rather than `None`.
    pub fn junction_node(
        &self,
        tile_x: i32,
        tile_z: i32,
        uid: i32,
    ) -> Result<&TrackNode, JunctionNotFound> {
        self.track_nodes
            .iter()
            .flatten()
            .find(|node| {
                node.junction().is_some()
                    && node
                        .uid
                        .as_ref()
                        .is_some_and(|u| u.matches_world(tile_x, tile_z, uid))
            })
            .ok_or(JunctionNotFound {
                tile_x,
                tile_z,
                uid,
            })
    }

    /// Slot of `node` in `track_nodes`, compared by identity.
    pub fn track_node_index(&self, node: &TrackNode) -> Option<usize> {
        self.track_nodes
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|n| std::ptr::eq(n, node)))
    }

    pub fn track_node(&self, index: usize) -> Option<&TrackNode> {
        self.track_nodes.get(index).and_then(Option::as_ref)
    }

    pub fn tr_item(&self, index: usize) -> Option<&TrackItem> {
        self.tr_items.get(index).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackNode {
    /// Index the file declares for this node; normally equal to its slot.
    pub index: u32,
    pub uid: Option<UiD>,
    pub kind: Option<TrackNodeKind>,
    pub pins: TrPins,
}

impl TrackNode {
    pub fn junction(&self) -> Option<&TrJunctionNode> {
        match &self.kind {
            Some(TrackNodeKind::Junction(j)) => Some(j),
            _ => None,
        }
    }

    pub fn vector(&self) -> Option<&TrVectorNode> {
        match &self.kind {
            Some(TrackNodeKind::Vector(v)) => Some(v),
            _ => None,
        }
    }

    pub fn end(&self) -> Option<&TrEndNode> {
        match &self.kind {
            Some(TrackNodeKind::End(e)) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrackNodeKind {
    Junction(TrJunctionNode),
    Vector(TrVectorNode),
    End(TrEndNode),
}

/// World placement of a track node (`uid` block).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UiD {
    pub world_tile_x: i32,
    pub world_tile_z: i32,
    pub world_id: i32,
    pub tile_x: i32,
    pub tile_z: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

impl UiD {
    pub fn matches_world(&self, tile_x: i32, tile_z: i32, world_id: i32) -> bool {
        self.world_tile_x == tile_x && self.world_tile_z == tile_z && self.world_id == world_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrJunctionNode {
    /// Slot of the owning node in the node table.
    pub node_index: usize,
    pub shape_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrVectorNode {
    pub sections: Vec<TrVectorSection>,
    /// Indices into the item table; counted, so unfilled slots are `None`.
    pub tr_item_refs: Vec<Option<u32>>,
}

/// One positional 16-value group of `trvectorsections`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrVectorSection {
    pub section_index: u32,
    pub shape_index: u32,
    pub wf_name_x: i32,
    pub wf_name_z: i32,
    pub world_file_uid: u32,
    pub flag1: i32,
    pub flag2: i32,
    pub tile_x: i32,
    pub tile_z: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrEndNode {
    pub length: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrPins {
    pub in_pins: u32,
    pub out_pins: u32,
    /// `in_pins + out_pins` slots.
    pub pins: Vec<Option<TrPin>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrPin {
    pub link: u32,
    pub direction: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junction(tile_x: i32, tile_z: i32, world_id: i32) -> TrackNode {
        TrackNode {
            index: 0,
            uid: Some(UiD {
                world_tile_x: tile_x,
                world_tile_z: tile_z,
                world_id,
                ..UiD::default()
            }),
            kind: Some(TrackNodeKind::Junction(TrJunctionNode::default())),
            pins: TrPins::default(),
        }
    }

    fn db() -> RoadTrackDb {
        let mut end = junction(-5, 14, 3);
        end.kind = Some(TrackNodeKind::End(TrEndNode { length: 1.0 }));
        RoadTrackDb {
            track_nodes: vec![None, Some(end), Some(junction(-5, 14, 3)), None],
            tr_items: Vec::new(),
        }
    }

    #[test]
    fn junction_lookup_skips_non_junctions() {
        let db = db();
        let node = db.junction_node(-5, 14, 3).expect("junction");
        assert_eq!(db.track_node_index(node), Some(2));
    }

    #[test]
    fn junction_lookup_miss() {
        let err = db().junction_node(-5, 14, 4).unwrap_err();
        assert_eq!(
            err,
            JunctionNotFound {
                tile_x: -5,
                tile_z: 14,
                uid: 4
            }
        );
        assert_eq!(
            err.to_string(),
            "could not find junction (tile_x = -5, tile_z = 14, uid = 4)"
        );
    }

    #[test]
    fn node_index_is_by_identity() {
        let db = db();
        let lookalike = junction(-5, 14, 3);
        assert_eq!(db.track_node_index(&lookalike), None);
    }

    #[test]
    fn kind_accessors() {
        let db = db();
        assert!(db.track_node(1).and_then(TrackNode::end).is_some());
        assert!(db.track_node(1).and_then(TrackNode::junction).is_none());
        assert!(db.track_node(0).is_none());
        assert!(db.track_node(9).is_none());
    }
}
