use serde::{Deserialize, Serialize};

use crate::board::rules::NetClassId;

pub type NetId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    pub id: NetId,
    pub name: String,
    pub net_class: Option<NetClassId>,
    pub contains_conductive_plane: bool,
}

impl Net {
    pub fn new(id: NetId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), net_class: None, contains_conductive_plane: false }
    }
}
