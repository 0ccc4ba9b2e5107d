//! Concurrent fan-out over source adapters
//!
//! Every requested adapter runs at the same time under the query's API-call
//! timeout. Whatever happens to one adapter (error, timeout, panic) ends up
//! in its own [`SourceOutcome`]; nothing escapes to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use log::{debug, warn};

use crate::core::config::Credentials;
use crate::core::error::SearchErrorKind;
use crate::core::item::SourceOutcome;
use crate::core::query::Query;
use crate::core::source::{SearchRequest, SourceAdapter};

/// Drives a set of adapters for one query at a time
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    credentials: Credentials,
}

impl Aggregator {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Query every adapter concurrently.
    ///
    /// Returns exactly one outcome per adapter, in the order given,
    /// regardless of which adapter finished first.
    pub async fn search(&self, query: &Query, sources: &[Arc<dyn SourceAdapter>]) -> Vec<SourceOutcome> {
        let calls = sources.iter().map(|adapter| self.search_one(query, adapter.as_ref()));
        join_all(calls).await
    }

    async fn search_one(&self, query: &Query, adapter: &dyn SourceAdapter) -> SourceOutcome {
        let source = adapter.id().to_string();
        let credential = self.credentials.get(&source);

        if adapter.requires_credential() && credential.is_none() {
            let hint = Credentials::env_var_for(&source)
                .map(|var| format!("set {var} to enable this source"))
                .unwrap_or_else(|| "no credential configured".to_string());
            warn!("{source}: missing credential, {hint}");
            return SourceOutcome::error(source, SearchErrorKind::AuthError, format!("missing API credential ({hint})"));
        }

        let request = SearchRequest {
            query: query.text(),
            media_type: query.media_type(),
            limit: query.limit(),
            timeout: query.api_timeout(),
            credential,
        };

        debug!("{source}: searching for '{}'", query.text());
        let call = AssertUnwindSafe(adapter.search(&request)).catch_unwind();
        let outcome = match tokio::time::timeout(query.api_timeout(), call).await {
            Ok(Ok(result)) => SourceOutcome::from_result(source, result),
            Ok(Err(_panic)) => {
                SourceOutcome::error(source, SearchErrorKind::Unknown, "source adapter panicked")
            }
            Err(_elapsed) => SourceOutcome::error(
                source,
                SearchErrorKind::Timeout,
                format!("no response within {:?}", query.api_timeout()),
            ),
        };

        if outcome.is_error() {
            warn!("{}: search failed: {:?}", outcome.source, outcome.body);
        } else {
            debug!("{}: {} raw item(s)", outcome.source, outcome.items().len());
        }
        outcome
    }
}
