use serde::{Deserialize, Serialize};

use crate::entity::PrimaryMap;

use super::func::{FuncId, Function};

/// The top-level compilation unit, one per Bril program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub functions: PrimaryMap<FuncId, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            functions: PrimaryMap::new(),
        }
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.values().find(|f| f.name == name)
    }
}
