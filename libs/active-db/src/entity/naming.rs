//! Table naming policy.

use convert_case::{Case, Casing};

/// Underscored, lowercase form of a model name: `DeviceType` -> `device_type`.
///
/// Acronyms stay together (`HTTPServer` -> `http_server`) and dashes become
/// underscores.
#[must_use]
pub fn underscore(name: &str) -> String {
    name.to_case(Case::Snake)
}
