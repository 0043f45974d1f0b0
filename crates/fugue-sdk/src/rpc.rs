//! Typed RPC client for the live and archive surfaces

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use fugue_primitives::{Epoch, Identity, Tick};
use serde_json::json;

use crate::transport::{HttpTransport, MockTransport, RpcRequest, RpcResponse, Transport};
use crate::types::{
    Balance, BalanceEnvelope, BroadcastResult, ComputorList, ComputorListsEnvelope,
    IdentityTransactionsRequest, LastProcessedTickEnvelope, ProcessedTickIntervals,
    ProcessedTickIntervalsEnvelope, QueryTransaction, SmartContractEnvelope, TickData,
    TickDataEnvelope, TickInfo, TickInfoEnvelope, TransactionEnvelope, TransactionsPage,
};
use crate::SdkError;

/// Optional observability callbacks fired around every RPC exchange.
///
/// Callbacks have no effect on semantics and may fire from any worker.
#[derive(Clone, Default)]
pub struct RpcHooks {
    /// Fired before a request is sent
    pub on_request: Option<Arc<dyn Fn(&str, &str) + Send + Sync>>,
    /// Fired after a response arrives: duration in ms, status, 2xx flag
    pub on_response: Option<Arc<dyn Fn(u64, u16, bool) + Send + Sync>>,
    /// Fired when an exchange raises an error
    pub on_error: Option<Arc<dyn Fn(&SdkError) + Send + Sync>>,
}

impl std::fmt::Debug for RpcHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcHooks")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// RPC client over a pluggable transport.
///
/// The live surface serves current state; the archive ("query") surface
/// serves confirmed history. Both share the transport's base URL.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    hooks: RpcHooks,
}

impl RpcClient {
    /// Create a client with HTTP transport for the given base URL.
    pub fn connect(base_url: &str) -> Self {
        Self::with_transport(HttpTransport::new(base_url))
    }

    /// Create a client with a mock transport (for testing).
    pub fn new_mock() -> (Self, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let client = Self {
            transport: mock.clone(),
            hooks: RpcHooks::default(),
        };
        (client, mock)
    }

    /// Create a client with a custom transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            hooks: RpcHooks::default(),
        }
    }

    /// Attach observability hooks.
    pub fn with_hooks(mut self, hooks: RpcHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Execute a request, firing hooks, without interpreting the status.
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, SdkError> {
        if let Some(hook) = &self.hooks.on_request {
            hook(request.method, &request.path);
        }
        let started = Instant::now();

        match self.transport.execute(request).await {
            Ok(response) => {
                if let Some(hook) = &self.hooks.on_response {
                    hook(
                        started.elapsed().as_millis() as u64,
                        response.status,
                        response.is_ok(),
                    );
                }
                Ok(response)
            }
            Err(e) => {
                if let Some(hook) = &self.hooks.on_error {
                    hook(&e);
                }
                Err(e)
            }
        }
    }

    /// Execute and decode a 2xx JSON response; non-2xx becomes a structured
    /// error (also reported to the error hook).
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        request: RpcRequest,
    ) -> Result<T, SdkError> {
        let method = request.method;
        let response = self.execute(request).await?;

        if !response.is_ok() {
            let err = request_failed(method, response);
            if let Some(hook) = &self.hooks.on_error {
                hook(&err);
            }
            return Err(err);
        }

        decode_json(&response)
    }

    // ==================== Live surface ====================

    /// Current tick report.
    pub async fn tick_info(&self) -> Result<TickInfo, SdkError> {
        let envelope: TickInfoEnvelope =
            self.request(RpcRequest::get("/live/v1/tick-info")).await?;
        Ok(envelope.tick_info)
    }

    /// Current tick, unwrapped.
    pub async fn current_tick(&self) -> Result<Tick, SdkError> {
        Ok(self.tick_info().await?.tick)
    }

    /// Balance of one identity.
    pub async fn balance(&self, identity: &Identity) -> Result<Balance, SdkError> {
        let envelope: BalanceEnvelope = self
            .request(RpcRequest::get(format!("/live/v1/balances/{identity}")))
            .await?;
        Ok(envelope.balance)
    }

    /// Broadcast signed transaction bytes.
    pub async fn broadcast_transaction(&self, bytes: &[u8]) -> Result<BroadcastResult, SdkError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.broadcast_transaction_base64(&encoded).await
    }

    /// Broadcast a transaction already encoded as base64.
    pub async fn broadcast_transaction_base64(
        &self,
        encoded: &str,
    ) -> Result<BroadcastResult, SdkError> {
        self.request(RpcRequest::post(
            "/live/v1/broadcast-transaction",
            json!({ "encodedTransaction": encoded }),
        ))
        .await
    }

    /// Execute a read-only contract function and return the raw response
    /// bytes.
    pub async fn query_smart_contract(
        &self,
        contract_index: u32,
        input_type: u16,
        input: &[u8],
    ) -> Result<Vec<u8>, SdkError> {
        let request_data = base64::engine::general_purpose::STANDARD.encode(input);
        let envelope: SmartContractEnvelope = self
            .request(RpcRequest::post(
                "/live/v1/querySmartContract",
                json!({
                    "contractIndex": contract_index,
                    "inputType": input_type,
                    "inputSize": input.len(),
                    "requestData": request_data,
                }),
            ))
            .await?;

        base64::engine::general_purpose::STANDARD
            .decode(envelope.response_data.as_bytes())
            .map_err(|e| SdkError::Serialization(format!("invalid base64 responseData: {e}")))
    }

    // ==================== Archive surface ====================

    /// The archive's high-water mark.
    pub async fn last_processed_tick(&self) -> Result<Tick, SdkError> {
        let envelope: LastProcessedTickEnvelope = self
            .request(RpcRequest::get("/query/v1/getLastProcessedTick"))
            .await?;
        Ok(envelope.last_processed_tick)
    }

    /// Look up a confirmed transaction by hash.
    ///
    /// A 404 is a distinguished signal (the archive does not know the hash
    /// yet, or never will) and returns `Ok(None)` rather than an error.
    pub async fn transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<QueryTransaction>, SdkError> {
        let response = self
            .execute(RpcRequest::post(
                "/query/v1/getTransactionByHash",
                json!({ "hash": hash }),
            ))
            .await?;

        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_ok() {
            let err = request_failed("POST", response);
            if let Some(hook) = &self.hooks.on_error {
                hook(&err);
            }
            return Err(err);
        }

        let envelope: TransactionEnvelope = decode_json(&response)?;
        Ok(Some(envelope.transaction))
    }

    /// List confirmed transactions for one identity.
    pub async fn transactions_for_identity(
        &self,
        request: &IdentityTransactionsRequest,
    ) -> Result<TransactionsPage, SdkError> {
        self.request(RpcRequest::post(
            "/query/v1/getTransactionsForIdentity",
            serde_json::to_value(request)?,
        ))
        .await
    }

    /// List the transactions included at one tick.
    pub async fn transactions_for_tick(&self, tick: Tick) -> Result<TransactionsPage, SdkError> {
        self.request(RpcRequest::post(
            "/query/v1/getTransactionsForTick",
            json!({ "tickNumber": tick }),
        ))
        .await
    }

    /// Per-tick metadata; `None` when the archive has no data for the tick.
    pub async fn tick_data(&self, tick: Tick) -> Result<Option<TickData>, SdkError> {
        let envelope: TickDataEnvelope = self
            .request(RpcRequest::post(
                "/query/v1/getTickData",
                json!({ "tickNumber": tick }),
            ))
            .await?;
        Ok(envelope.tick_data)
    }

    /// The archive's processed tick intervals, per epoch.
    pub async fn processed_tick_intervals(
        &self,
    ) -> Result<Vec<ProcessedTickIntervals>, SdkError> {
        let envelope: ProcessedTickIntervalsEnvelope = self
            .request(RpcRequest::get("/query/v1/getProcessedTickIntervals"))
            .await?;
        Ok(envelope.processed_tick_intervals_per_epoch)
    }

    /// Computor lists published for one epoch.
    pub async fn computor_lists_for_epoch(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<ComputorList>, SdkError> {
        let envelope: ComputorListsEnvelope = self
            .request(RpcRequest::post(
                "/query/v1/getComputorListsForEpoch",
                json!({ "epoch": epoch }),
            ))
            .await?;
        Ok(envelope.computors)
    }
}

fn request_failed(method: &str, response: RpcResponse) -> SdkError {
    SdkError::RpcRequestFailed {
        url: response.url,
        method: method.to_string(),
        status: response.status,
        status_text: response.status_text,
        body: response.body,
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(response: &RpcResponse) -> Result<T, SdkError> {
    serde_json::from_str(&response.body).map_err(|e| SdkError::RpcInvalidJson {
        url: response.url.clone(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_identity() -> Identity {
        Identity::parse("ABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGHIJKLMNOPQRSTUVWXYZABCDEFGH").unwrap()
    }

    #[tokio::test]
    async fn test_tick_info() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_json(
            "/live/v1/tick-info",
            json!({ "tickInfo": { "tick": 15923820, "epoch": 154, "initialTick": 15900000 } }),
        );

        let info = client.tick_info().await.unwrap();
        assert_eq!(info.tick, Tick::new(15_923_820));
        assert_eq!(info.epoch, 154);
    }

    #[tokio::test]
    async fn test_balance_path() {
        let (client, mock) = RpcClient::new_mock();
        let id = sample_identity();
        mock.set_json(
            &format!("/live/v1/balances/{id}"),
            json!({ "balance": { "id": id.as_str(), "balance": "42" } }),
        );

        let balance = client.balance(&id).await.unwrap();
        assert_eq!(balance.balance, 42);
    }

    #[tokio::test]
    async fn test_broadcast_encodes_base64() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_json(
            "/live/v1/broadcast-transaction",
            json!({
                "peersBroadcasted": 7,
                "encodedTransaction": "AAEC",
                "transactionId": "abc"
            }),
        );

        let result = client.broadcast_transaction(&[0, 1, 2]).await.unwrap();
        assert_eq!(result.peers_broadcast, 7);

        let sent = mock.requests_for("/live/v1/broadcast-transaction");
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["encodedTransaction"], "AAEC");
    }

    #[tokio::test]
    async fn test_transaction_by_hash_404_is_none() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_status("/query/v1/getTransactionByHash", 404, "not found");

        let result = client.transaction_by_hash("tx").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_is_structured_error() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_status("/query/v1/getLastProcessedTick", 500, "boom");

        let err = client.last_processed_tick().await.unwrap_err();
        match err {
            SdkError::RpcRequestFailed { status, body, method, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
                assert_eq!(method, "GET");
            }
            other => panic!("expected RpcRequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_distinct_error() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_status("/live/v1/tick-info", 200, "not json");

        let err = client.tick_info().await.unwrap_err();
        assert!(matches!(err, SdkError::RpcInvalidJson { .. }));
    }

    #[tokio::test]
    async fn test_hooks_fire_on_error_and_success() {
        static REQUESTS: AtomicU32 = AtomicU32::new(0);
        static RESPONSES: AtomicU32 = AtomicU32::new(0);
        static ERRORS: AtomicU32 = AtomicU32::new(0);

        let (client, mock) = RpcClient::new_mock();
        let client = client.with_hooks(RpcHooks {
            on_request: Some(Arc::new(|_, _| {
                REQUESTS.fetch_add(1, Ordering::SeqCst);
            })),
            on_response: Some(Arc::new(|_, _, _| {
                RESPONSES.fetch_add(1, Ordering::SeqCst);
            })),
            on_error: Some(Arc::new(|_| {
                ERRORS.fetch_add(1, Ordering::SeqCst);
            })),
        });

        mock.set_json(
            "/live/v1/tick-info",
            json!({ "tickInfo": { "tick": 1 } }),
        );
        client.tick_info().await.unwrap();
        mock.set_status("/live/v1/tick-info", 500, "down");
        client.tick_info().await.unwrap_err();

        assert_eq!(REQUESTS.load(Ordering::SeqCst), 2);
        assert_eq!(RESPONSES.load(Ordering::SeqCst), 2); // fired even for the 500
        assert_eq!(ERRORS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_smart_contract_round_trip() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_json(
            "/live/v1/querySmartContract",
            json!({ "responseData": base64::engine::general_purpose::STANDARD.encode([9u8; 16]) }),
        );

        let bytes = client.query_smart_contract(1, 1, &[]).await.unwrap();
        assert_eq!(bytes, vec![9u8; 16]);

        let sent = mock.requests_for("/live/v1/querySmartContract");
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["contractIndex"], 1);
        assert_eq!(body["inputSize"], 0);
    }
}
