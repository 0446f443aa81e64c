pub mod env;
pub mod track_db;
pub mod track_item;
pub mod units;

pub use env::{AnimShader, EnvFile, SkyLayer, SkySatellite, WaterLayer};
pub use track_db::{
    JunctionNotFound, RdbFile, RoadTrackDb, TrEndNode, TrJunctionNode, TrPin, TrPins, TrVectorNode,
    TrVectorSection, TrackNode, TrackNodeKind, UiD,
};
pub use track_item::{
    CarSpawnerItem, EmptyItem, ItemType, LevelCrossingItem, TrItemHeader, TrItemPData,
    TrItemRData, TrItemSData, TrackItem,
};
pub use units::{Unit, UnitClass, UnitMismatch};
