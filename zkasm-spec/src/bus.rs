//! Buses connect a call site to the function or peripheral it talks to.

use serde::{Deserialize, Serialize};

use crate::register::RegisterId;

/// A named group of address and data lines
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bus {
    name: String,
    /// Global bus identifier, assigned by the linker
    id: Option<usize>,
    address: Vec<RegisterId>,
    data: Vec<RegisterId>,
}

impl Bus {
    /// A linked bus with a known global identifier
    pub fn new(
        name: impl Into<String>,
        id: usize,
        address: Vec<RegisterId>,
        data: Vec<RegisterId>,
    ) -> Self {
        Self {
            name: name.into(),
            id: Some(id),
            address,
            data,
        }
    }

    /// A bus whose global identifier has not been assigned yet
    pub fn unlinked(name: impl Into<String>, address: Vec<RegisterId>, data: Vec<RegisterId>) -> Self {
        Self {
            name: name.into(),
            id: None,
            address,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn is_linked(&self) -> bool {
        self.id.is_some()
    }

    /// Assign the global identifier
    pub fn link(&mut self, id: usize) {
        self.id = Some(id);
    }

    pub fn address(&self) -> &[RegisterId] {
        &self.address
    }

    pub fn data(&self) -> &[RegisterId] {
        &self.data
    }

    /// Address lines followed by data lines
    pub fn address_data(&self) -> Vec<RegisterId> {
        self.address.iter().chain(self.data.iter()).copied().collect()
    }

    /// Same bus with every line rewritten by `f`, which may expand one line
    /// into several (used when lines are split into limbs).
    pub fn map_lines<F>(&self, mut f: F) -> Self
    where
        F: FnMut(RegisterId) -> Vec<RegisterId>,
    {
        Self {
            name: self.name.clone(),
            id: self.id,
            address: self.address.iter().flat_map(|&r| f(r)).collect(),
            data: self.data.iter().flat_map(|&r| f(r)).collect(),
        }
    }
}
