use serde::Serialize;
use strum::{EnumCount, EnumIter, FromRepr};

/// Item type tag matching MSTS's `trItemType` ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount, FromRepr,
)]
#[repr(u8)]
pub enum ItemType {
    #[default]
    Empty = 0,
    Crossover = 1,
    Signal = 2,
    SpeedPost = 3,
    MilePost = 4,
    Hazard = 5,
    Pickup = 6,
    Platform = 7,
    SoundRegion = 8,
    LevelCrossing = 9,
    Siding = 10,
    CarSpawner = 11,
}

/// Fields every track item carries, whatever its variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrItemHeader {
    pub item_type: ItemType,
    /// Slot in the item table this item was decoded into.
    pub index: usize,
    /// Id from `tritemid`; normally equal to `index`.
    pub item_id: u32,
    pub rdata: Option<TrItemRData>,
    pub sdata: Option<TrItemSData>,
    pub pdata: Option<TrItemPData>,
}

impl TrItemHeader {
    pub fn new(item_type: ItemType, index: usize) -> Self {
        Self {
            item_type,
            index,
            ..Self::default()
        }
    }
}

/// World position (`tritemrdata`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrItemRData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub tile_x: i32,
    pub tile_z: i32,
}

/// `tritemsdata`: a distance and a hex flag string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrItemSData {
    pub sdata1: f32,
    pub sdata2: String,
}

/// `tritempdata`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrItemPData {
    pub pdata1: i32,
    pub pdata2: i32,
}

/// A decoded entry of the item table.
///
/// The variant is chosen by the keyword that introduced the item; there is
/// no runtime type discovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrackItem {
    LevelCrossing(LevelCrossingItem),
    Empty(EmptyItem),
    CarSpawner(CarSpawnerItem),
}

impl TrackItem {
    pub fn header(&self) -> &TrItemHeader {
        match self {
            Self::LevelCrossing(item) => &item.header,
            Self::Empty(item) => &item.header,
            Self::CarSpawner(item) => &item.header,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.header().item_type
    }

    /// Facing direction, for items that have one.
    pub fn direction(&self) -> Option<u32> {
        match self {
            Self::LevelCrossing(item) => Some(item.direction),
            _ => None,
        }
    }

    pub fn rev_dir(&self) -> Option<u32> {
        match self {
            Self::LevelCrossing(item) => Some(item.rev_dir()),
            _ => None,
        }
    }

    /// Index into the signal object table, for items linked to one.
    pub fn sig_obj(&self) -> Option<usize> {
        match self {
            Self::LevelCrossing(item) => item.sig_obj,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCrossingItem {
    pub header: TrItemHeader,
    /// 0 or 1 depending on which way the crossing faces.
    pub direction: u32,
    pub sig_obj: Option<usize>,
}

impl LevelCrossingItem {
    pub fn new(index: usize) -> Self {
        Self {
            header: TrItemHeader::new(ItemType::LevelCrossing, index),
            direction: 0,
            sig_obj: None,
        }
    }

    pub fn rev_dir(&self) -> u32 {
        if self.direction == 0 { 1 } else { 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyItem {
    pub header: TrItemHeader,
}

impl EmptyItem {
    pub fn new(index: usize) -> Self {
        Self {
            header: TrItemHeader::new(ItemType::Empty, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarSpawnerItem {
    pub header: TrItemHeader,
}

impl CarSpawnerItem {
    pub fn new(index: usize) -> Self {
        Self {
            header: TrItemHeader::new(ItemType::CarSpawner, index),
        }
    }
}
