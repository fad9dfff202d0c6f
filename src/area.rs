// Administrative-area tree flattening and hierarchical code resolution
//
// The area source is a JSON array of province-level trees, depth <= 3
// (province -> prefecture -> county). Every node is indexed by its own
// 6-digit code so identity numbers carrying coarser codes still resolve.

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{RegistryError, Result};

/// Sentinel returned when no fallback level matches a code.
pub const UNKNOWN_AREA: &str = "未知地区";

/// Structural level-2 marker for a municipality's directly governed
/// districts. Never meaningful in a display string.
const DISTRICT_MARKER: &str = "市辖区";

/// Level-1 name suffixes that anchor a fresh parent chain.
const PROVINCE_SUFFIXES: [&str; 3] = ["市", "省", "自治区"];

/// Flat code -> full-location-name table. Built once at startup and
/// read-only afterward.
pub type AreaIndex = HashMap<String, String>;

// ============================================================================
// AREA TREE
// ============================================================================

/// One node of the administrative-area tree, as found in the source JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaNode {
    /// Numeric area code. The source mixes JSON numbers and strings, so
    /// both are accepted; only the first 6 characters are significant.
    #[serde(deserialize_with = "code_as_string")]
    pub code: String,

    pub name: String,

    /// 1 = province/municipality, 2 = prefecture, 3 = county.
    pub level: u8,

    #[serde(default)]
    pub children: Vec<AreaNode>,
}

impl AreaNode {
    /// The node's code truncated to its first 6 characters.
    fn truncated_code(&self) -> String {
        self.code.chars().take(6).collect()
    }
}

fn code_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "area code must be a number or string, got {}",
            other
        ))),
    }
}

// ============================================================================
// INDEX BUILDER
// ============================================================================

/// Reads and parses the area source file, then flattens it.
///
/// Any failure (missing file, malformed JSON, wrong structure) is a
/// [`RegistryError::DataLoad`]: the caller must not proceed without a
/// usable index.
pub fn load_area_index(path: &Path) -> Result<AreaIndex> {
    let provinces = load_area_tree(path).map_err(|e| RegistryError::DataLoad(format!("{:#}", e)))?;
    Ok(build_area_index(&provinces))
}

fn load_area_tree(path: &Path) -> anyhow::Result<Vec<AreaNode>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let provinces: Vec<AreaNode> =
        serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(provinces)
}

/// Flattens the province trees into the code -> name table.
///
/// Depth-first pre-order. The accumulated parent-name chain is threaded
/// through the recursion as an explicit value; a level-1 node whose name
/// ends with 市/省/自治区 resets the chain to itself, which drops any
/// stale parents a malformed tree might carry. The 市辖区 marker is
/// stripped from every stored name; it only shapes the chain.
pub fn build_area_index(provinces: &[AreaNode]) -> AreaIndex {
    let mut index = AreaIndex::new();
    for province in provinces {
        flatten_node(province, &[], &mut index);
    }
    index
}

fn flatten_node(node: &AreaNode, parents: &[String], index: &mut AreaIndex) {
    let anchors_chain = node.level == 1
        && PROVINCE_SUFFIXES
            .iter()
            .any(|suffix| node.name.ends_with(suffix));
    let chain: Vec<String> = if anchors_chain {
        vec![node.name.clone()]
    } else {
        parents.to_vec()
    };

    let full_name = format!("{}{}", chain.concat(), node.name);
    index.insert(node.truncated_code(), full_name.replace(DISTRICT_MARKER, ""));

    let child_chain: Vec<String> = if node.level == 1 {
        vec![node.name.clone()]
    } else if node.level == 2 && node.name != DISTRICT_MARKER {
        let mut extended = chain;
        extended.push(node.name.clone());
        extended
    } else {
        chain
    };

    for child in &node.children {
        flatten_node(child, &child_chain, index);
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves a 6-digit area code with hierarchical fallback.
///
/// Most specific first: exact code, then prefecture (first 4 digits +
/// "00"), then province (first 2 digits + "0000"), then [`UNKNOWN_AREA`].
/// Coarser codes are common on numbers issued before the full county
/// table existed. Never fails.
pub fn resolve_area(index: &AreaIndex, code: &str) -> String {
    if let Some(name) = index.get(code) {
        return name.clone();
    }
    let chars: Vec<char> = code.chars().collect();
    if chars.len() >= 4 {
        let prefecture = chars[..4].iter().collect::<String>() + "00";
        if let Some(name) = index.get(&prefecture) {
            return name.clone();
        }
    }
    if chars.len() >= 2 {
        let province = chars[..2].iter().collect::<String>() + "0000";
        if let Some(name) = index.get(&province) {
            return name.clone();
        }
    }
    UNKNOWN_AREA.to_string()
}

// ============================================================================
// TESTS
// ============================================================================
