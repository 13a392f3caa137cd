//! Identifier resolution prefetched once per generator run.
//!
//! Controller objects refer to fabrics by id; playbooks refer to them by
//! site name and fabric type. The table is filled before any component is
//! rendered so transforms stay synchronous and make no calls.

use ccc_orch_common::{FabricType, OrchResult, RunContext, SiteInfo};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, warn};

/// A fabric as a playbook names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFabric {
    pub site_name_hierarchy: String,
    pub fabric_type: FabricType,
}

impl ResolvedFabric {
    /// `{site_name_hierarchy, fabric_type}` mapping.
    pub fn to_value(&self) -> Value {
        json!({
            "site_name_hierarchy": self.site_name_hierarchy,
            "fabric_type": self.fabric_type.as_str(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FabricRecord {
    id: String,
    site_id: String,
}

/// Fabric id to site name mapping for one run.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    fabrics: HashMap<String, ResolvedFabric>,
}

impl ResolutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every site, fabric site, and fabric zone once.
    pub async fn prefetch(ctx: &RunContext) -> OrchResult<Self> {
        let raw_sites = ctx.paginate("site_design", "get_sites", &json!({})).await?;
        let sites: HashMap<String, String> = ctx
            .decode_items::<SiteInfo>(&raw_sites, "site_design.get_sites")?
            .into_iter()
            .map(|s| (s.id, s.name_hierarchy))
            .collect();

        let mut table = Self::new();
        for (function, fabric_type) in [
            ("get_fabric_sites", FabricType::FabricSite),
            ("get_fabric_zones", FabricType::FabricZone),
        ] {
            let raw = ctx.paginate("sda", function, &json!({})).await?;
            for record in ctx.decode_items::<FabricRecord>(&raw, function)? {
                match sites.get(&record.site_id) {
                    Some(name) => table.insert(&record.id, name, fabric_type),
                    None => warn!(fabric_id = %record.id, site_id = %record.site_id, "Fabric site has no matching site"),
                }
            }
        }
        info!(sites = sites.len(), fabrics = table.len(), "Resolution table ready");
        Ok(table)
    }

    pub fn insert(&mut self, fabric_id: &str, site_name_hierarchy: &str, fabric_type: FabricType) {
        self.fabrics.insert(
            fabric_id.to_string(),
            ResolvedFabric {
                site_name_hierarchy: site_name_hierarchy.to_string(),
                fabric_type,
            },
        );
    }

    pub fn fabric(&self, fabric_id: &str) -> Option<&ResolvedFabric> {
        self.fabrics.get(fabric_id)
    }

    /// True if `fabric_id` is built on one of `sites`.
    pub fn fabric_on_any_site(&self, fabric_id: &str, sites: &[String]) -> bool {
        self.fabric(fabric_id)
            .is_some_and(|f| sites.iter().any(|s| *s == f.site_name_hierarchy))
    }

    pub fn len(&self) -> usize {
        self.fabrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fabrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_workflow_test::{fabric, module_args, run_context, serve_fabrics, serve_sites, site, MockCcc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_prefetch_reads_sites_and_fabrics_once() {
        let mock = Arc::new(MockCcc::default());
        serve_sites(
            &mock,
            vec![
                site("s1", "Global/USA/SJC", "building"),
                site("s2", "Global/USA/SJC/Floor1", "floor"),
            ],
        );
        serve_fabrics(&mock, vec![fabric("f1", "s1")], vec![fabric("z1", "s2"), fabric("z9", "missing")]);
        let (ctx, _clock) = run_context(mock.clone(), module_args("merged", vec![]));

        let table = ResolutionTable::prefetch(&ctx).await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.fabric("z1").unwrap().to_value(),
            json!({"site_name_hierarchy": "Global/USA/SJC/Floor1", "fabric_type": "fabric_zone"})
        );
        assert!(table.fabric("z9").is_none());
        assert_eq!(mock.call_count("site_design", "get_sites"), 1);
        assert_eq!(mock.call_count("sda", "get_fabric_sites"), 1);
        assert_eq!(mock.call_count("sda", "get_fabric_zones"), 1);
    }

    #[test]
    fn test_fabric_on_any_site() {
        let mut table = ResolutionTable::new();
        table.insert("f1", "Global/USA/SJC", FabricType::FabricSite);
        assert!(table.fabric_on_any_site("f1", &["Global/USA/SJC".to_string()]));
        assert!(!table.fabric_on_any_site("f1", &["Global/USA/NYC".to_string()]));
        assert!(!table.fabric_on_any_site("f2", &["Global/USA/SJC".to_string()]));
    }
}
