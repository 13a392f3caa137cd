//! Offset/limit iteration over Catalyst Center list endpoints.

use crate::error::{OrchError, OrchResult};
use ccc_client::api::response_items;
use ccc_client::CccApi;
use serde_json::{Map, Value};
use tracing::debug;

/// Paging knobs. Catalyst Center offsets are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub offset: u64,
    pub limit: u64,
    /// Send `offset`/`limit` as strings for endpoints that reject numbers.
    pub use_strings: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            offset: 1,
            limit: 500,
            use_strings: false,
        }
    }
}

impl PageOptions {
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_strings(mut self) -> Self {
        self.use_strings = true;
        self
    }
}

/// Fetches every page of `family.function`.
///
/// Stops on an empty or missing `response`, or on a page shorter than
/// `limit`. A final page of exactly `limit` items costs one extra call.
/// `params` is never modified; each request gets its own copy.
pub async fn paginate(
    client: &dyn CccApi,
    family: &str,
    function: &str,
    params: &Value,
    options: PageOptions,
) -> OrchResult<Vec<Value>> {
    let base = match params {
        Value::Object(obj) => obj.clone(),
        Value::Null => Map::new(),
        _ => {
            return Err(OrchError::internal(format!(
                "{}.{}: pagination params must be a mapping",
                family, function
            )))
        }
    };

    let limit = options.limit.max(1);
    let mut offset = options.offset;
    let mut items = Vec::new();

    loop {
        let mut page_params = base.clone();
        let (o, l) = if options.use_strings {
            (Value::from(offset.to_string()), Value::from(limit.to_string()))
        } else {
            (Value::from(offset), Value::from(limit))
        };
        page_params.insert("offset".to_string(), o);
        page_params.insert("limit".to_string(), l);

        let response = client
            .invoke(family, function, &Value::Object(page_params), false)
            .await
            .map_err(|e| {
                OrchError::transport_with_context(family, function, format!("offset={}", offset), e.to_string())
            })?;

        let page = response_items(&response);
        let count = page.len() as u64;
        debug!(family, function, offset, count, "Fetched page");
        items.extend(page);

        if count == 0 || count < limit {
            break;
        }
        offset += limit;
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ccc_client::{CccError, CccResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `total` numbered items in pages, recording each request.
    struct Pager {
        total: u64,
        fail_at: Option<u64>,
        requests: Mutex<Vec<Value>>,
    }

    impl Pager {
        fn new(total: u64) -> Self {
            Self {
                total,
                fail_at: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CccApi for Pager {
        async fn invoke(&self, family: &str, function: &str, params: &Value, _: bool) -> CccResult<Value> {
            self.requests.lock().unwrap().push(params.clone());
            let offset = match &params["offset"] {
                Value::String(s) => s.parse::<u64>().unwrap(),
                other => other.as_u64().unwrap(),
            };
            let limit = match &params["limit"] {
                Value::String(s) => s.parse::<u64>().unwrap(),
                other => other.as_u64().unwrap(),
            };
            if self.fail_at == Some(offset) {
                return Err(CccError::transport(family, function, "connection reset"));
            }
            let end = (offset - 1 + limit).min(self.total);
            let items: Vec<Value> = (offset..=end).map(|i| json!({ "n": i })).collect();
            Ok(json!({ "response": items }))
        }
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let api = Pager::new(1200);
        let items = paginate(&api, "devices", "get_device_list", &json!({"family": "Switches"}), PageOptions::default())
            .await
            .unwrap();
        assert_eq!(items.len(), 1200);
        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2]["offset"], json!(1001));
        assert_eq!(requests[2]["family"], json!("Switches"));
    }

    #[tokio::test]
    async fn test_exact_page_forces_extra_call() {
        let api = Pager::new(500);
        let items = paginate(&api, "devices", "get_device_list", &json!({}), PageOptions::default())
            .await
            .unwrap();
        assert_eq!(items.len(), 500);
        assert_eq!(api.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_string_offsets() {
        let api = Pager::new(3);
        let items = paginate(&api, "sda", "get_fabric_sites", &Value::Null, PageOptions::default().with_strings())
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(api.requests.lock().unwrap()[0]["limit"], json!("500"));
    }

    #[tokio::test]
    async fn test_error_names_offset() {
        let mut api = Pager::new(2000);
        api.fail_at = Some(501);
        let err = paginate(&api, "devices", "get_device_list", &json!({}), PageOptions::default())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("devices.get_device_list"));
        assert!(msg.contains("offset=501"));
    }
}
