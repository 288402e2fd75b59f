use serde::Deserialize;

use crate::config::HTTP_TIMEOUT;
use crate::error::AppError;
use crate::items::record::RawItem;

pub const DEFAULT_API_BASE: &str = "https://prod-quickbooks.api.intuit.com";
pub const DEFAULT_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(rename = "QueryResponse")]
    query_response: Option<QueryResponse>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Item")]
    item: Option<Vec<serde_json::Value>>,
}

/// Everything fetched before pagination stopped. A failed page does not
/// discard earlier pages; the failure is carried alongside them.
#[derive(Debug)]
pub struct ItemFetch {
    pub items: Vec<RawItem>,
    pub requests: u32,
    pub error: Option<AppError>,
}

/// Company-scoped client for the QBO v3 query endpoint.
pub struct QboClient {
    http: reqwest::Client,
    api_base: String,
    realm_id: String,
    access_token: String,
}

/// Query for one page of items. Both inputs are integers, so nothing
/// user-controlled reaches the statement.
pub fn item_query(start_position: u32, max_results: u32) -> String {
    format!("SELECT * FROM Item STARTPOSITION {start_position} MAXRESULTS {max_results}")
}

impl QboClient {
    pub fn new(http: reqwest::Client, api_base: &str, realm_id: &str, access_token: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            realm_id: realm_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn query_url(&self) -> String {
        format!("{}/v3/company/{}/query", self.api_base, self.realm_id)
    }

    /// Fetches one page. `Ok(None)` means the response had no item
    /// collection, which the API uses for "nothing past this point".
    pub async fn query_page(
        &self,
        start_position: u32,
        page_size: u32,
    ) -> Result<Option<Vec<RawItem>>, AppError> {
        let query = item_query(start_position, page_size);
        let response = self
            .http
            .get(self.query_url())
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("query", query.as_str())])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VendorRejection {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: QueryEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::InvalidResponse(e.to_string()))?;
        // Entries stay one-to-one with the vendor page so the short-page
        // check still sees the real page length.
        Ok(envelope.query_response.and_then(|r| r.item).map(|batch| {
            batch
                .into_iter()
                .map(|value| {
                    serde_json::from_value::<RawItem>(value).unwrap_or_else(|e| {
                        log::warn!("Item entry is not an object, exporting it empty: {e}");
                        RawItem::default()
                    })
                })
                .collect()
        }))
    }

    /// Pages through every item. A page shorter than `page_size` ends the
    /// walk; a full last page costs one extra request that comes back
    /// without an item collection.
    pub async fn fetch_all_items<F>(&self, page_size: u32, mut on_page: F) -> ItemFetch
    where
        F: FnMut(u32, usize),
    {
        let page_size = page_size.max(1);
        let mut items = Vec::new();
        let mut requests = 0;
        let mut start_position = 1;

        loop {
            requests += 1;
            log::debug!("Querying items from position {start_position}");
            let batch = match self.query_page(start_position, page_size).await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Item query stopped at position {start_position}: {e}");
                    return ItemFetch {
                        items,
                        requests,
                        error: Some(e),
                    };
                }
            };

            let count = batch.len();
            on_page(start_position, count);
            items.extend(batch);

            if count < page_size as usize {
                break;
            }
            start_position += page_size;
        }

        ItemFetch {
            items,
            requests,
            error: None,
        }
    }
}
