use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

/// Who a storage request is coming from. External parties (pipes, adjacent
/// machines) and the owning player UI see different permissions on the same
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    External,
    Player,
}

/// How a slot participates in resource movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferType {
    /// External: insertion only. Player: insertion and extraction.
    Input,
    /// External: extraction only. Player: extraction only.
    Output,
    /// External and player: insertion and extraction.
    Storage,
    /// External: immutable. Player: insertion and extraction. e.g. battery slots
    Transfer,
    /// External and player: insertion and extraction. e.g. bucket slots
    Processing,
}

impl TransferType {
    pub const VALUES: [TransferType; 5] = [
        TransferType::Input,
        TransferType::Output,
        TransferType::Storage,
        TransferType::Transfer,
        TransferType::Processing,
    ];

    pub fn external_insertion(self) -> bool {
        matches!(
            self,
            TransferType::Input | TransferType::Storage | TransferType::Processing
        )
    }

    pub fn external_extraction(self) -> bool {
        matches!(
            self,
            TransferType::Output | TransferType::Storage | TransferType::Processing
        )
    }

    pub fn player_insertion(self) -> bool {
        !matches!(self, TransferType::Output)
    }

    pub fn player_extraction(self) -> bool {
        true
    }

    pub fn allows_insertion(self, accessor: Accessor) -> bool {
        match accessor {
            Accessor::External => self.external_insertion(),
            Accessor::Player => self.player_insertion(),
        }
    }

    pub fn allows_extraction(self, accessor: Accessor) -> bool {
        match accessor {
            Accessor::External => self.external_extraction(),
            Accessor::Player => self.player_extraction(),
        }
    }

    /// The widest flow an external face can be configured to, or `None` for
    /// slots external parties may never touch.
    pub fn external_flow(self) -> Option<ResourceFlow> {
        match (self.external_insertion(), self.external_extraction()) {
            (true, true) => Some(ResourceFlow::Both),
            (true, false) => Some(ResourceFlow::Input),
            (false, true) => Some(ResourceFlow::Output),
            (false, false) => None,
        }
    }

    pub fn is_input(self) -> bool {
        self == TransferType::Input
    }

    pub fn is_output(self) -> bool {
        self == TransferType::Output
    }
}

impl Serde for TransferType {
    fn ser(&self, writer: &mut ByteWriter) {
        let ordinal = Self::VALUES.iter().position(|v| v == self).unwrap() as u8;
        writer.write_u8(ordinal);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let ordinal = reader.read_u8()? as usize;
        Self::VALUES
            .get(ordinal)
            .copied()
            .ok_or(SerdeErr::InvalidValue("transfer type"))
    }
}

/// Which way resources may move through a configured external face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFlow {
    Input,
    Output,
    Both,
}

impl ResourceFlow {
    pub fn can_flow_in(self) -> bool {
        matches!(self, ResourceFlow::Input | ResourceFlow::Both)
    }

    pub fn can_flow_out(self) -> bool {
        matches!(self, ResourceFlow::Output | ResourceFlow::Both)
    }
}

impl Serde for ResourceFlow {
    fn ser(&self, writer: &mut ByteWriter) {
        let ordinal = match self {
            ResourceFlow::Input => 0u8,
            ResourceFlow::Output => 1,
            ResourceFlow::Both => 2,
        };
        writer.write_u8(ordinal);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_u8()? {
            0 => Ok(ResourceFlow::Input),
            1 => Ok(ResourceFlow::Output),
            2 => Ok(ResourceFlow::Both),
            _ => Err(SerdeErr::InvalidValue("resource flow")),
        }
    }
}
