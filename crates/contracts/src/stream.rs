//! StreamDescriptor - identity of one device output channel.

use serde::{Deserialize, Serialize};

use crate::StreamName;

/// Identity of one producer channel on the device.
///
/// Immutable once created. The `id` is the origin tag assigned by whichever
/// pipeline stage declared the output; `name` is the stable stream name
/// carried by every packet of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Origin tag of the declaring pipeline stage
    pub id: u32,

    /// Stable stream name
    pub name: StreamName,
}

impl StreamDescriptor {
    /// Create a descriptor with the device-side naming convention
    /// `"<id>_<output>"`, matching how stage outputs are labelled on the wire.
    pub fn for_stage(id: u32, output: &str) -> Self {
        Self {
            id,
            name: StreamName::from(format!("{id}_{output}")),
        }
    }

    /// Create a descriptor with an explicit name (replay streams, tests).
    pub fn named(id: u32, name: impl Into<StreamName>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
