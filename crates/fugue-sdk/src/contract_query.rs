//! Contract query helper
//!
//! Some contract functions answer with fewer bytes than their declared
//! output size while the node is still assembling state. The helper
//! re-issues the query until the response is full-size or the retry budget
//! runs out; the short response is returned as-is in that case.

use std::time::Duration;

use base64::Engine as _;
use tokio_util::sync::CancellationToken;

use crate::rpc::RpcClient;
use crate::SdkError;

/// Default number of re-issues after a short response
pub const DEFAULT_QUERY_RETRIES: u32 = 2;
/// Default delay between re-issues
pub const DEFAULT_QUERY_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A raw contract query.
#[derive(Debug, Clone)]
pub struct RawQuery {
    /// Contract index on the live surface
    pub contract_index: u32,
    /// Entry input type
    pub input_type: u16,
    /// Input payload
    pub input: Vec<u8>,
    /// Re-issue the query while the response is shorter than this
    pub expected_output_size: Option<u32>,
    /// Retry budget for short responses
    pub retries: u32,
    /// Delay between retries
    pub retry_delay: Duration,
    /// Cancels the retry loop
    pub cancel: Option<CancellationToken>,
}

impl RawQuery {
    /// A query with default retry tuning and no expected size.
    pub fn new(contract_index: u32, input_type: u16, input: Vec<u8>) -> Self {
        Self {
            contract_index,
            input_type,
            input,
            expected_output_size: None,
            retries: DEFAULT_QUERY_RETRIES,
            retry_delay: DEFAULT_QUERY_RETRY_DELAY,
            cancel: None,
        }
    }

    /// Use base64 input instead of raw bytes.
    pub fn with_input_base64(mut self, encoded: &str) -> Result<Self, SdkError> {
        self.input = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| SdkError::Serialization(format!("invalid base64 input: {e}")))?;
        Ok(self)
    }

    /// Set the expected output size.
    pub fn expected_output_size(mut self, size: u32) -> Self {
        self.expected_output_size = Some(size);
        self
    }
}

/// Result of a raw contract query.
#[derive(Debug, Clone)]
pub struct RawQueryResult {
    /// Response payload
    pub response: Vec<u8>,
    /// Number of attempts issued (starts at 1)
    pub attempts: u32,
}

impl RawQueryResult {
    /// The response as base64.
    pub fn response_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.response)
    }
}

/// Issue a contract query, re-issuing while the response is short.
pub async fn query_contract_raw(
    rpc: &RpcClient,
    query: &RawQuery,
) -> Result<RawQueryResult, SdkError> {
    let cancel = query.cancel.clone().unwrap_or_default();
    let mut attempts = 1u32;

    loop {
        if cancel.is_cancelled() {
            return Err(SdkError::ContractQueryAborted);
        }

        let response = tokio::select! {
            r = rpc.query_smart_contract(query.contract_index, query.input_type, &query.input) => r?,
            _ = cancel.cancelled() => return Err(SdkError::ContractQueryAborted),
        };

        let short = query
            .expected_output_size
            .is_some_and(|expected| (response.len() as u64) < u64::from(expected));

        if short && attempts <= query.retries {
            tracing::debug!(
                contract_index = query.contract_index,
                got = response.len(),
                expected = ?query.expected_output_size,
                attempts,
                "short contract response, retrying"
            );
            tokio::select! {
                _ = tokio::time::sleep(query.retry_delay) => {}
                _ = cancel.cancelled() => return Err(SdkError::ContractQueryAborted),
            }
            attempts += 1;
            continue;
        }

        return Ok(RawQueryResult { response, attempts });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use crate::rpc::RpcClient;
    use crate::transport::MockResponse;
    use serde_json::json;

    fn contract_response(bytes: &[u8]) -> MockResponse {
        MockResponse::json(json!({
            "responseData": base64::engine::general_purpose::STANDARD.encode(bytes)
        }))
    }

    #[tokio::test]
    async fn test_full_response_first_try() {
        let (client, mock) = RpcClient::new_mock();
        mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 16]));

        let query = RawQuery::new(1, 1, vec![]).expected_output_size(16);
        let result = query_contract_raw(&client, &query).await.unwrap();
        assert_eq!(result.attempts, 1);
        assert_eq!(result.response.len(), 16);
    }

    #[tokio::test]
    async fn test_retries_on_short_response() {
        let (client, mock) = RpcClient::new_mock();
        mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 4]));
        mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 16]));

        let mut query = RawQuery::new(1, 1, vec![]).expected_output_size(16);
        query.retry_delay = Duration::from_millis(1);
        let result = query_contract_raw(&client, &query).await.unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.response.len(), 16);
    }

    #[tokio::test]
    async fn test_returns_short_after_budget() {
        let (client, mock) = RpcClient::new_mock();
        mock.push_response("/live/v1/querySmartContract", contract_response(&[1u8; 4]));

        let mut query = RawQuery::new(1, 1, vec![]).expected_output_size(16);
        query.retries = 1;
        query.retry_delay = Duration::from_millis(1);
        let result = query_contract_raw(&client, &query).await.unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.response.len(), 4); // short response handed back

        assert_eq!(mock.requests_for("/live/v1/querySmartContract").len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (client, _mock) = RpcClient::new_mock();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut query = RawQuery::new(1, 1, vec![]);
        query.cancel = Some(cancel);
        let err = query_contract_raw(&client, &query).await.unwrap_err();
        assert!(matches!(err, SdkError::ContractQueryAborted));
    }

    #[tokio::test]
    async fn test_no_expected_size_never_retries() {
        let (client, mock) = RpcClient::new_mock();
        mock.push_response("/live/v1/querySmartContract", contract_response(&[]));

        let query = RawQuery::new(1, 1, vec![]);
        let result = query_contract_raw(&client, &query).await.unwrap();
        assert_eq!(result.attempts, 1);
        assert!(result.response.is_empty());
        assert_eq!(mock.requests().len(), 1);
    }
}
