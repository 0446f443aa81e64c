//! Decoder for road database (`.rdb`) files.

use std::path::Path;

use msts_types::{
    CarSpawnerItem, EmptyItem, LevelCrossingItem, RdbFile, RoadTrackDb, TrEndNode,
    TrItemHeader, TrItemPData, TrItemRData, TrItemSData, TrJunctionNode, TrPin, TrPins,
    TrVectorNode, TrVectorSection, TrackItem, TrackNode, TrackNodeKind, UiD, UnitClass,
};

use crate::counted_list::{CountedList, ListGate, MAX_DECLARED_COUNT};
use crate::dispatch::{BlockVisitor, DispatchTable, Visit};
use crate::stf_reader::{StfError, StfReader};

/// Decode the road database file at `path`.
pub fn read_rdb_file(path: impl AsRef<Path>) -> Result<RdbFile, StfError> {
    decode(&mut StfReader::open(path)?)
}

/// Decode a road database document held in memory.
pub fn parse_rdb(name: &str, input: &str) -> Result<RdbFile, StfError> {
    decode(&mut StfReader::from_source(name, input)?)
}

fn decode(r: &mut StfReader) -> Result<RdbFile, StfError> {
    let mut rdb = RdbFile::default();
    r.parse_file(&mut DispatchTable::new().on("trackdb", |r| {
        rdb.road_track_db = read_road_track_db(r)?;
        Ok(())
    }))?;
    Ok(rdb)
}

fn read_road_track_db(r: &mut StfReader) -> Result<RoadTrackDb, StfError> {
    let mut db = RoadTrackDb::default();
    r.parse_block(
        false,
        &mut DispatchTable::new()
            .on("tracknodes", |r| {
                // slot 0 is never used; node n lives at slot n
                db.track_nodes = r.read_counted_list(|n| {
                    CountedList::with_reserved_head(n, 1).item("tracknode", read_track_node)
                })?;
                Ok(())
            })
            .on("tritemtable", |r| {
                db.tr_items = r.read_counted_list(|n| {
                    CountedList::new(n)
                        .gate(ListGate::FirstItemAlwaysProcessed)
                        .item("levelcritem", |r, slot| {
                            let mut item = LevelCrossingItem::new(slot);
                            read_item_header(r, &mut item.header)?;
                            Ok(TrackItem::LevelCrossing(item))
                        })
                        .item("emptyitem", |r, slot| {
                            let mut item = EmptyItem::new(slot);
                            read_item_header(r, &mut item.header)?;
                            Ok(TrackItem::Empty(item))
                        })
                        .item("carspawneritem", |r, slot| {
                            let mut item = CarSpawnerItem::new(slot);
                            read_item_header(r, &mut item.header)?;
                            Ok(TrackItem::CarSpawner(item))
                        })
                })?;
                Ok(())
            }),
    )?;
    Ok(db)
}

/// Fills one `tracknode` block. The kind sub-records all land in the same
/// field, so this is a visitor of its own rather than a table of closures.
struct TrackNodeVisitor {
    slot: usize,
    node: TrackNode,
}

impl BlockVisitor for TrackNodeVisitor {
    fn visit(&mut self, r: &mut StfReader, keyword: &str) -> Result<Visit, StfError> {
        match keyword.to_ascii_lowercase().as_str() {
            "uid" => self.node.uid = Some(read_uid(r)?),
            "trjunctionnode" => {
                self.node.kind = Some(TrackNodeKind::Junction(read_junction_node(r, self.slot)?))
            }
            "trvectornode" => self.node.kind = Some(TrackNodeKind::Vector(read_vector_node(r)?)),
            "trendnode" => {
                r.expect_open()?;
                let length = r.read_number(UnitClass::None, None)?;
                r.skip_rest_of_block()?;
                self.node.kind = Some(TrackNodeKind::End(TrEndNode { length }));
            }
            "trpins" => self.node.pins = read_pins(r)?,
            _ => return Ok(Visit::Unknown),
        }
        Ok(Visit::Handled)
    }
}

/// `tracknode ( <index> uid ( ... ) <kind> ( ... ) trpins ( ... ) )`
fn read_track_node(r: &mut StfReader, slot: usize) -> Result<TrackNode, StfError> {
    r.expect_open()?;
    let index = r.read_uint(None)?;
    if index as usize != slot {
        log::warn!(
            "{}:{}: tracknode {index} stored in slot {slot}",
            r.file_name(),
            r.line()
        );
    }
    let mut visitor = TrackNodeVisitor {
        slot,
        node: TrackNode {
            index,
            ..TrackNode::default()
        },
    };
    r.parse_block(true, &mut visitor)?;
    Ok(visitor.node)
}

fn read_uid(r: &mut StfReader) -> Result<UiD, StfError> {
    r.expect_open()?;
    let world_tile_x = r.read_int(None)?;
    let world_tile_z = r.read_int(None)?;
    let world_id = r.read_int(None)?;
    r.read_int(None)?;
    let uid = UiD {
        world_tile_x,
        world_tile_z,
        world_id,
        tile_x: r.read_int(None)?,
        tile_z: r.read_int(None)?,
        x: r.read_number(UnitClass::Distance, None)?,
        y: r.read_number(UnitClass::Distance, None)?,
        z: r.read_number(UnitClass::Distance, None)?,
        ax: r.read_number(UnitClass::None, None)?,
        ay: r.read_number(UnitClass::None, None)?,
        az: r.read_number(UnitClass::None, None)?,
    };
    r.skip_rest_of_block()?;
    Ok(uid)
}

fn read_junction_node(r: &mut StfReader, slot: usize) -> Result<TrJunctionNode, StfError> {
    r.expect_open()?;
    r.read_string()?;
    let shape_index = r.read_uint(None)?;
    r.skip_rest_of_block()?;
    Ok(TrJunctionNode {
        node_index: slot,
        shape_index,
    })
}

fn read_vector_node(r: &mut StfReader) -> Result<TrVectorNode, StfError> {
    let mut vector = TrVectorNode::default();
    r.parse_block(
        false,
        &mut DispatchTable::new()
            .on("trvectorsections", |r| {
                vector.sections = read_vector_sections(r)?;
                Ok(())
            })
            .on("tritemrefs", |r| {
                vector.tr_item_refs = r.read_counted_list(|n| {
                    CountedList::new(n).item("tritemref", |r, _| r.read_uint_block(None))
                })?;
                Ok(())
            }),
    )?;
    Ok(vector)
}

/// `trvectorsections ( <n> <16 values> * n )`. The groups are positional,
/// without keywords of their own.
fn read_vector_sections(r: &mut StfReader) -> Result<Vec<TrVectorSection>, StfError> {
    r.expect_open()?;
    let count = r.read_count()?;
    let mut sections = Vec::new();
    while sections.len() < count && !r.at_block_end() {
        sections.push(read_vector_section(r)?);
    }
    if sections.len() < count {
        log::debug!(
            "{}:{}: trvectorsections declared {count}, found {}",
            r.file_name(),
            r.line(),
            sections.len()
        );
    }
    r.skip_rest_of_block()?;
    Ok(sections)
}

fn read_vector_section(r: &mut StfReader) -> Result<TrVectorSection, StfError> {
    let section_index = r.read_uint(None)?;
    let shape_index = r.read_uint(None)?;
    let wf_name_x = r.read_int(None)?;
    let wf_name_z = r.read_int(None)?;
    let world_file_uid = r.read_uint(None)?;
    let flag1 = r.read_int(None)?;
    let flag2 = r.read_int(None)?;
    // hex flag word, unused
    r.read_string()?;
    Ok(TrVectorSection {
        section_index,
        shape_index,
        wf_name_x,
        wf_name_z,
        world_file_uid,
        flag1,
        flag2,
        tile_x: r.read_int(None)?,
        tile_z: r.read_int(None)?,
        x: r.read_number(UnitClass::Distance, None)?,
        y: r.read_number(UnitClass::Distance, None)?,
        z: r.read_number(UnitClass::Distance, None)?,
        ax: r.read_number(UnitClass::None, None)?,
        ay: r.read_number(UnitClass::None, None)?,
        az: r.read_number(UnitClass::None, None)?,
    })
}

/// `trpins ( <in> <out> trpin ( <link> <dir> ) ... )`, one pin slot per
/// declared in and out pin.
fn read_pins(r: &mut StfReader) -> Result<TrPins, StfError> {
    r.expect_open()?;
    let in_pins = r.read_uint(None)?;
    let out_pins = r.read_uint(None)?;
    let slots = (in_pins as usize)
        .checked_add(out_pins as usize)
        .filter(|n| *n <= MAX_DECLARED_COUNT)
        .ok_or_else(|| {
            r.err_before(&format!(
                "trpins declares {in_pins} in and {out_pins} out pins, over the limit of {MAX_DECLARED_COUNT}"
            ))
        })?;
    let mut list = CountedList::new(slots).item("trpin", |r, _| {
        r.expect_open()?;
        let pin = TrPin {
            link: r.read_uint(None)?,
            direction: r.read_uint(None)?,
        };
        r.skip_rest_of_block()?;
        Ok(pin)
    });
    r.parse_block(true, &mut list)?;
    Ok(TrPins {
        in_pins,
        out_pins,
        pins: list.into_slots(),
    })
}

/// The sub-blocks shared by every item variant.
fn read_item_header(r: &mut StfReader, header: &mut TrItemHeader) -> Result<(), StfError> {
    let slot = header.index;
    r.parse_block(
        false,
        &mut DispatchTable::new()
            .on("tritemid", |r| {
                header.item_id = r.read_uint_block(None)?;
                if header.item_id as usize != slot {
                    log::warn!(
                        "{}:{}: tritemid {} stored in slot {slot}",
                        r.file_name(),
                        r.line(),
                        header.item_id
                    );
                }
                Ok(())
            })
            .on("tritemrdata", |r| {
                r.expect_open()?;
                header.rdata = Some(TrItemRData {
                    x: r.read_number(UnitClass::Distance, None)?,
                    y: r.read_number(UnitClass::Distance, None)?,
                    z: r.read_number(UnitClass::Distance, None)?,
                    tile_x: r.read_int(None)?,
                    tile_z: r.read_int(None)?,
                });
                r.skip_rest_of_block()
            })
            .on("tritemsdata", |r| {
                r.expect_open()?;
                header.sdata = Some(TrItemSData {
                    sdata1: r.read_number(UnitClass::None, None)?,
                    sdata2: r.read_string()?,
                });
                r.skip_rest_of_block()
            })
            .on("tritempdata", |r| {
                r.expect_open()?;
                header.pdata = Some(TrItemPData {
                    pdata1: r.read_int(None)?,
                    pdata2: r.read_int(None)?,
                });
                r.skip_rest_of_block()
            }),
    )
}

#[cfg(test)]
mod tests {
    use msts_types::ItemType;

    use super::*;

    fn junction_node(idx: u32, tile_x: i32, tile_z: i32, world_id: i32) -> String {
        format!(
            "tracknode ( {idx} uid ( {tile_x} {tile_z} {world_id} 0 {tile_x} {tile_z} 10 20 30 0 0 0 ) \
             trjunctionnode ( 0 37 0 ) trpins ( 1 2 trpin ( 2 1 ) trpin ( 3 1 ) trpin ( 4 0 ) ) )"
        )
    }

    fn rdb(body: &str) -> RdbFile {
        parse_rdb("test.rdb", body).expect("parse")
    }

    #[test]
    fn node_table_reserves_slot_zero() {
        let file = rdb(&format!(
            "trackdb ( tracknodes ( 2 {} tracknode ( 2 trendnode ( 0 ) ) ) )",
            junction_node(1, -5, 14, 3)
        ));
        let nodes = &file.road_track_db.track_nodes;
        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_none());
        assert!(nodes[1].as_ref().and_then(TrackNode::junction).is_some());
        assert!(nodes[2].as_ref().and_then(TrackNode::end).is_some());
    }

    #[test]
    fn junction_node_contents() {
        let file = rdb(&format!(
            "trackdb ( tracknodes ( 1 {} ) )",
            junction_node(1, -5, 14, 3)
        ));
        let node = file.road_track_db.track_node(1).expect("node");
        let uid = node.uid.expect("uid");
        assert_eq!((uid.world_tile_x, uid.world_tile_z, uid.world_id), (-5, 14, 3));
        assert_eq!((uid.x, uid.y, uid.z), (10.0, 20.0, 30.0));
        assert_eq!(
            node.junction(),
            Some(&TrJunctionNode {
                node_index: 1,
                shape_index: 37
            })
        );
        assert_eq!(node.pins.in_pins, 1);
        assert_eq!(node.pins.out_pins, 2);
        assert_eq!(
            node.pins.pins,
            vec![
                Some(TrPin { link: 2, direction: 1 }),
                Some(TrPin { link: 3, direction: 1 }),
                Some(TrPin { link: 4, direction: 0 }),
            ]
        );
    }

    #[test]
    fn junction_lookup() {
        let file = rdb(&format!(
            "trackdb ( tracknodes ( 2 tracknode ( 1 trendnode ( 0 ) ) {} ) )",
            junction_node(2, -5, 14, 3)
        ));
        let node = file.junction_node(-5, 14, 3).expect("hit");
        assert_eq!(file.road_track_db.track_node_index(node), Some(2));
        assert_eq!(node.junction().map(|j| j.node_index), Some(2));

        let miss = file.junction_node(-5, 14, 99).unwrap_err();
        assert_eq!(miss.uid, 99);
    }

    #[test]
    fn vector_node_sections_and_item_refs() {
        let file = rdb(
            "trackdb ( tracknodes ( 1 tracknode ( 1 trvectornode (
                trvectorsections ( 2
                    1 100 -11 14 1234 0 0 00000000 -11 14 100 50 200 0 1.57 0
                    2 101 -11 14 1235 1 0 00000000 -11 14 110 50 210 0 1.6 0 )
                tritemrefs ( 2 tritemref ( 0 ) tritemref ( 1 ) tritemref ( 7 ) ) ) ) ) )",
        );
        let vector = file
            .road_track_db
            .track_node(1)
            .and_then(TrackNode::vector)
            .expect("vector");
        assert_eq!(vector.sections.len(), 2);
        assert_eq!(vector.sections[0].shape_index, 100);
        assert_eq!(vector.sections[1].world_file_uid, 1235);
        assert_eq!(vector.sections[1].flag1, 1);
        assert_eq!(vector.sections[0].tile_x, -11);
        assert_eq!(vector.sections[1].x, 110.0);
        assert!((vector.sections[0].ay - 1.57).abs() < 1e-6);
        assert_eq!(vector.tr_item_refs, vec![Some(0), Some(1)]);
    }

    #[test]
    fn short_vector_sections_are_tolerated() {
        let file = rdb(
            "trackdb ( tracknodes ( 1 tracknode ( 1 trvectornode (
                trvectorsections ( 3 1 100 -11 14 1234 0 0 00000000 -11 14 100 50 200 0 1.57 0 ) ) ) ) )",
        );
        let vector = file
            .road_track_db
            .track_node(1)
            .and_then(TrackNode::vector)
            .expect("vector");
        assert_eq!(vector.sections.len(), 1);
    }

    #[test]
    fn pin_counts_that_overflow_are_structural() {
        let err = parse_rdb(
            "test.rdb",
            "trackdb ( tracknodes ( 1 tracknode ( 1 trpins ( 4294967295 1 ) ) ) )",
        )
        .unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }), "{err}");
        assert!(err.to_string().contains("trpins declares"), "{err}");
    }

    #[test]
    fn huge_vector_section_count_is_structural() {
        let err = parse_rdb(
            "test.rdb",
            "trackdb ( tracknodes ( 1 tracknode ( 1 trvectornode ( trvectorsections ( 4000000000 ) ) ) ) )",
        )
        .unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }), "{err}");
    }

    #[test]
    fn large_vector_section_count_with_few_sections() {
        let file = rdb(
            "trackdb ( tracknodes ( 1 tracknode ( 1 trvectornode (
                trvectorsections ( 1000000 1 100 -11 14 1234 0 0 00000000 -11 14 100 50 200 0 1.57 0 ) ) ) ) )",
        );
        let vector = file
            .road_track_db
            .track_node(1)
            .and_then(TrackNode::vector)
            .expect("vector");
        assert_eq!(vector.sections.len(), 1);
    }

    #[test]
    fn huge_node_count_is_structural() {
        let err = parse_rdb("test.rdb", "trackdb ( tracknodes ( 4294967295 ) )").unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }), "{err}");
    }

    #[test]
    fn node_index_mismatch_still_parses() {
        let file = rdb("trackdb ( tracknodes ( 1 tracknode ( 7 trendnode ( 2.5 ) ) ) )");
        let node = file.road_track_db.track_node(1).expect("node");
        assert_eq!(node.index, 7);
        assert_eq!(node.end(), Some(&TrEndNode { length: 2.5 }));
    }

    #[test]
    fn level_crossing_item() {
        let file = rdb(
            r#"trackdb ( tritemtable ( 1 levelcritem (
                tritemid ( 0 )
                tritemrdata ( 10 20 30 -5 14 )
                tritemsdata ( 4.5 "00000002" )
                tritempdata ( 1 2 ) ) ) )"#,
        );
        let items = &file.road_track_db.tr_items;
        assert_eq!(items.len(), 1);
        let item = items[0].as_ref().expect("item");
        assert_eq!(item.item_type(), ItemType::LevelCrossing);
        assert_eq!(item.rev_dir(), Some(1));
        assert_eq!(item.sig_obj(), None);

        let header = item.header();
        assert_eq!(header.index, 0);
        assert_eq!(header.item_id, 0);
        assert_eq!(
            header.rdata,
            Some(TrItemRData {
                x: 10.0,
                y: 20.0,
                z: 30.0,
                tile_x: -5,
                tile_z: 14
            })
        );
        assert_eq!(
            header.sdata.as_ref().map(|s| s.sdata2.as_str()),
            Some("00000002")
        );
        assert_eq!(header.pdata, Some(TrItemPData { pdata1: 1, pdata2: 2 }));
    }

    #[test]
    fn item_variants_follow_their_keyword() {
        let file = rdb(
            "trackdb ( tritemtable ( 3
                emptyitem ( tritemid ( 0 ) )
                carspawneritem ( tritemid ( 1 ) tritemrdata ( 1 2 3 0 0 ) )
                levelcritem ( tritemid ( 2 ) ) ) )",
        );
        let types: Vec<_> = file
            .road_track_db
            .tr_items
            .iter()
            .map(|item| item.as_ref().map(TrackItem::item_type))
            .collect();
        assert_eq!(
            types,
            vec![
                Some(ItemType::Empty),
                Some(ItemType::CarSpawner),
                Some(ItemType::LevelCrossing)
            ]
        );
        assert_eq!(file.road_track_db.tr_item(1).map(|i| i.header().index), Some(1));
    }

    #[test]
    fn item_table_always_decodes_its_first_item() {
        let file = rdb("trackdb ( tritemtable ( 0 emptyitem ( tritemid ( 0 ) ) ) )");
        assert!(file.road_track_db.tr_items.is_empty());

        let err = parse_rdb(
            "test.rdb",
            "trackdb ( tritemtable ( 0 emptyitem ( tritemid ( bad ) ) ) )",
        )
        .unwrap_err();
        assert!(matches!(err, StfError::Structural { .. }));
    }

    #[test]
    fn extra_items_are_discarded() {
        let file = rdb(
            "trackdb ( tritemtable ( 1 emptyitem ( tritemid ( 0 ) ) emptyitem ( tritemid ( 1 ) ) ) )",
        );
        assert_eq!(file.road_track_db.tr_items.len(), 1);
    }

    #[test]
    fn empty_document() {
        assert_eq!(rdb(""), RdbFile::default());
    }
}
