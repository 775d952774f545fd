//! Match API methods for [`MatchApiClient`].
//!
//! # What this module handles:
//! - Paging match ids for a player (identity-bound)
//! - Fetching match and timeline payloads by id (rotatable)
//!
//! # What this module does NOT handle:
//! - Interpreting payload contents (callers treat them as opaque records)

use reqwest::Method;
use serde_json::Value;

use crate::client::{Fetch, MatchApiClient};
use crate::error::{ClientError, Result};

impl MatchApiClient {
    /// Fetch one page of match ids for a player within a category.
    ///
    /// Identity-bound: player ids are opaque per-credential tokens, so this
    /// always uses the primary key. A 404 maps to an empty page.
    pub async fn list_match_ids(
        &self,
        player_id: &str,
        category: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let url = format!(
            "{}/match/v1/ids/by-player/{}?category={}&start={}&count={}",
            self.base_url, player_id, category, start, count
        );

        match self.request_json(Method::GET, url, true).await? {
            Fetch::Found(body) => serde_json::from_value(body).map_err(|e| {
                ClientError::InvalidResponse(format!("match id page is not a string array: {e}"))
            }),
            Fetch::NotFound => Ok(Vec::new()),
        }
    }

    /// Fetch one match payload by id. Rotatable; bound to the credential
    /// slot granted by the limiter.
    pub async fn get_match(&self, match_id: &str) -> Result<Fetch<Value>> {
        let url = format!("{}/match/v1/matches/{}", self.base_url, match_id);
        self.request_json(Method::GET, url, false).await
    }

    /// Fetch one timeline payload by id. Rotatable.
    pub async fn get_timeline(&self, match_id: &str) -> Result<Fetch<Value>> {
        let url = format!("{}/match/v1/timelines/{}", self.base_url, match_id);
        self.request_json(Method::GET, url, false).await
    }
}
