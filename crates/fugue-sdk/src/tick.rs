//! Target-tick suggestion with offset guardrails

use fugue_primitives::Tick;

use crate::rpc::RpcClient;
use crate::SdkError;

/// Guardrails for target-tick offsets.
///
/// A target tick is `current + offset`; the offset must stay within
/// `[min, max]` so callers can neither target the current tick (which the
/// network would drop) nor schedule unreasonably far ahead.
#[derive(Debug, Clone, Copy)]
pub struct TickOffsets {
    /// Smallest allowed offset
    pub min: u64,
    /// Offset used when the caller does not specify one
    pub default: u64,
    /// Largest allowed offset
    pub max: u64,
}

impl Default for TickOffsets {
    fn default() -> Self {
        Self {
            min: 1,
            default: 5,
            max: 100,
        }
    }
}

impl TickOffsets {
    /// Validate internal consistency (`min <= default <= max`).
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.min > self.max || self.default < self.min || self.default > self.max {
            return Err(SdkError::TickOffsetOutOfRange {
                offset: self.default,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Check a requested offset against the guardrails, substituting the
    /// default when absent. This never touches the network.
    pub fn resolve(&self, offset: Option<u64>) -> Result<u64, SdkError> {
        let offset = offset.unwrap_or(self.default);
        if offset < self.min || offset > self.max {
            return Err(SdkError::TickOffsetOutOfRange {
                offset,
                min: self.min,
                max: self.max,
            });
        }
        Ok(offset)
    }
}

/// Suggest a target tick: clamp-check the offset first, then read the
/// current tick and add.
pub async fn suggested_target_tick(
    rpc: &RpcClient,
    offsets: &TickOffsets,
    offset: Option<u64>,
) -> Result<Tick, SdkError> {
    // Offset validation happens before any RPC call.
    let offset = offsets.resolve(offset)?;
    let current = rpc.current_tick().await?;
    Ok(current + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_default() {
        let offsets = TickOffsets::default();
        assert_eq!(offsets.resolve(None).unwrap(), 5);
        assert_eq!(offsets.resolve(Some(10)).unwrap(), 10);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let offsets = TickOffsets {
            min: 2,
            default: 5,
            max: 20,
        };
        assert!(matches!(
            offsets.resolve(Some(1)),
            Err(SdkError::TickOffsetOutOfRange { offset: 1, .. })
        ));
        assert!(matches!(
            offsets.resolve(Some(21)),
            Err(SdkError::TickOffsetOutOfRange { offset: 21, .. })
        ));
    }

    #[tokio::test]
    async fn test_suggested_target_tick() {
        let (client, mock) = RpcClient::new_mock();
        mock.set_json("/live/v1/tick-info", json!({ "tickInfo": { "tick": 1000 } }));

        let offsets = TickOffsets::default();
        let target = suggested_target_tick(&client, &offsets, Some(7)).await.unwrap();
        assert_eq!(target, Tick::new(1007));
    }

    #[tokio::test]
    async fn test_out_of_range_skips_rpc() {
        let (client, mock) = RpcClient::new_mock();
        let offsets = TickOffsets::default();

        let err = suggested_target_tick(&client, &offsets, Some(0)).await.unwrap_err();
        assert!(matches!(err, SdkError::TickOffsetOutOfRange { .. }));
        assert!(mock.requests().is_empty());
    }
}
