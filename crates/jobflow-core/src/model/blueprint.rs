use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BlueprintId, ExecutionTable};

/// Definición estática y reutilizable de un workflow.
///
/// La tabla queda vacía hasta el único `set_steps`; un blueprint sin tabla
/// no puede arrancar jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub name: String,
    pub execution_table: ExecutionTable,
    pub created_at: DateTime<Utc>,
}

impl Blueprint {
    pub fn is_defined(&self) -> bool {
        !self.execution_table.is_empty()
    }
}
