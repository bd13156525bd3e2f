//! Partition types, communication interfaces and directions.

/// Which entities of a level an iteration visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartitionType {
    /// Entities owned and updated exclusively by this process.
    Interior,
    /// Interior plus the border shared with neighbors.
    InteriorBorder,
    /// Interior, border and ghost layers without the outermost front.
    Overlap,
    /// Everything stored on this process.
    OverlapFront,
    /// Same as [`PartitionType::OverlapFront`].
    All,
    /// Structured grids have no ghost entities; always empty.
    Ghost,
}

/// Which pairs of partitions exchange data in a halo communication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    InteriorBorderInteriorBorder,
    InteriorBorderAll,
    OverlapOverlapFront,
    OverlapAll,
    AllAll,
}

/// Forward sends along the interface as declared; backward swaps the roles
/// of the send and receive lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommDirection {
    Forward,
    Backward,
}

/// The four send/receive list pairs stored on every grid level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// overlap-front sends to overlap-front
    FrontFront = 0,
    /// overlap sends to overlap-front
    OverlapFront = 1,
    /// interior-border sends to interior-border
    BorderBorder = 2,
    /// interior-border sends to overlap-front
    BorderFront = 3,
}

impl LinkClass {
    pub const ALL: [LinkClass; 4] = [
        LinkClass::FrontFront,
        LinkClass::OverlapFront,
        LinkClass::BorderBorder,
        LinkClass::BorderFront,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LinkClass::FrontFront => "of_of",
            LinkClass::OverlapFront => "o_of",
            LinkClass::BorderBorder => "ib_ib",
            LinkClass::BorderFront => "ib_of",
        }
    }
}

impl From<InterfaceType> for LinkClass {
    fn from(iface: InterfaceType) -> Self {
        match iface {
            InterfaceType::InteriorBorderInteriorBorder => LinkClass::BorderBorder,
            InterfaceType::InteriorBorderAll => LinkClass::BorderFront,
            InterfaceType::OverlapOverlapFront | InterfaceType::OverlapAll => LinkClass::OverlapFront,
            InterfaceType::AllAll => LinkClass::FrontFront,
        }
    }
}
