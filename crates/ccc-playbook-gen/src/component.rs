//! Components: the configuration domains a generator can render.

use crate::resolve::ResolutionTable;
use crate::temp_spec::TempSpec;
use async_trait::async_trait;
use ccc_orch_common::{ArgSpec, OrchResult, RunContext};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// One renderable domain, e.g. virtual networks.
#[async_trait]
pub trait Component: Send + Sync {
    /// Key used for the component in filters and in the playbook.
    fn name(&self) -> &'static str;

    /// Keys accepted in one filter entry for this component.
    fn filter_spec(&self) -> ArgSpec;

    fn temp_spec(&self) -> &TempSpec;

    /// Fetches raw controller objects matching any of `filters`, or all
    /// objects when there are none.
    async fn fetch(&self, ctx: &RunContext, filters: &[Value]) -> OrchResult<Vec<Value>>;

    /// Applies the module's global filters to one raw object.
    fn matches_global(&self, _raw: &Value, _global: &Value, _table: &ResolutionTable) -> bool {
        true
    }
}

/// Query parameters for one filter entry.
///
/// Each filter gets its own parameter set, built from scratch, so one
/// filter never narrows the next. `mapping` pairs filter keys with
/// controller query keys; unmapped filter keys are ignored here.
pub fn query_params(filter: &Value, mapping: &[(&str, &str)]) -> Value {
    let mut params = Map::new();
    for (filter_key, query_key) in mapping {
        if let Some(v) = filter.get(*filter_key).filter(|v| !v.is_null()) {
            params.insert(query_key.to_string(), v.clone());
        }
    }
    Value::Object(params)
}

/// Pages through `family.function` once per query and merges the results,
/// keeping first-seen order and dropping objects already returned.
pub async fn fetch_all(
    ctx: &RunContext,
    family: &str,
    function: &str,
    queries: &[Value],
) -> OrchResult<Vec<Value>> {
    let default_query = [Value::Object(Map::new())];
    let queries = if queries.is_empty() { &default_query[..] } else { queries };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for query in queries {
        let items = ctx.paginate(family, function, query).await?;
        debug!(family, function, query = %query, count = items.len(), "Fetched component objects");
        for item in items {
            let key = item
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| item.to_string());
            if seen.insert(key) {
                out.push(item);
            }
        }
    }
    Ok(out)
}
