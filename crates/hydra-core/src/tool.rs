//! Tool descriptor data model (spec §3 "Tool", §4.10).

use schemars::Schema;
use serde::{Deserialize, Serialize};

/// Permission tier gating a tool invocation (spec §3, §4.10). Critical
/// tools are never auto-approved, regardless of any matching pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Safe,
    RequiresApproval,
    Critical,
}

/// A typed tool descriptor. The handler itself is not part of the data
/// model; it is invoked through the `Tool` trait in `hydra-tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Schema,
    pub permission: Permission,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_permission_serializes_snake_case() {
        let json = serde_json::to_string(&Permission::RequiresApproval).unwrap();
        assert_eq!(json, "\"requires_approval\"");
    }
}
