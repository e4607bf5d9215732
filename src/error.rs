use std::fmt::Display;

use alloy::{
    contract,
    providers::{MulticallError, PendingTransactionError},
    sol_types, transports,
};

use crate::types;

/// Error returned by the RPC provider or raised by the session logic.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// RPC `-32601`. Suppressed by transaction submission as
    /// non-actionable (some wallet providers raise it spuriously).
    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out")]
    Timeout,

    #[error("pair already exists")]
    PairExists,

    #[error("no valid route found to complete swap")]
    NoRoute,

    #[error("unknown pair: {0}")]
    PairNotFound(alloy::primitives::Address),

    #[error("vest position {0} has not expired yet")]
    VestNotExpired(types::TokenId),

    #[error("illegal step transition: {0:?} -> {1:?}")]
    StepTransition(types::TxStepStatus, types::TxStepStatus),

    #[error("wrap/unwrap assets are wrong")]
    WrapAssets,
}

impl DexError {
    /// True for the error class that transaction submission swallows
    /// instead of reporting a rejected step.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::MethodNotFound(_))
    }
}

impl From<contract::Error> for DexError {
    fn from(value: contract::Error) -> Self {
        match value {
            contract::Error::UnknownFunction(_) => Self::Fatal(value.to_string()),
            contract::Error::UnknownSelector(_) => Self::Fatal(value.to_string()),
            contract::Error::NotADeploymentTransaction => Self::Fatal(value.to_string()),
            contract::Error::ContractNotDeployed => Self::Fatal(value.to_string()),
            contract::Error::ZeroData(_, _) => Self::Fatal(value.to_string()),
            contract::Error::AbiError(_) => Self::Fatal(value.to_string()),
            contract::Error::TransportError(rpc_err) => Self::from(rpc_err),
            contract::Error::PendingTransactionError(err) => err.into(),
        }
    }
}

impl From<PendingTransactionError> for DexError {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            PendingTransactionError::FailedToRegister => Self::Fatal(value.to_string()),
            PendingTransactionError::TransportError(rpc_err) => Self::from(rpc_err),
            PendingTransactionError::Recv(_) => Self::Transport(value.to_string()),
            PendingTransactionError::TxWatcher(err) => match err {
                alloy::providers::WatchTxError::Timeout => Self::Timeout,
            },
        }
    }
}

impl<E: Display> From<transports::RpcError<E>> for DexError {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Heuristic to determine if eth_call failed due to OutOfGas or
                // if transaction was reverted during the gas estimation
                let msg = resp.message.to_ascii_lowercase();
                if resp.code == -32601 {
                    Self::MethodNotFound(msg)
                } else if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if ((resp.code == -32600 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found")))
                    || (resp.code == -32603
                        && (msg.contains("block by number") || msg.contains("getting block")))
                {
                    Self::InvalidRequest(msg)
                } else if resp.code == 3 && msg.contains("reverted") {
                    Self::Reverted(value.to_string())
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl From<sol_types::Error> for DexError {
    fn from(value: sol_types::Error) -> Self {
        Self::Fatal(value.to_string())
    }
}

impl From<MulticallError> for DexError {
    fn from(value: MulticallError) -> Self {
        match value {
            MulticallError::ValueTx => Self::InvalidRequest(value.to_string()),
            MulticallError::DecodeError(_) => Self::Fatal(value.to_string()),
            MulticallError::NoReturnData => Self::NullResp,
            MulticallError::CallFailed(bytes) => Self::Reverted(bytes.to_string()),
            MulticallError::TransportError(rpc_err) => Self::from(rpc_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_is_suppressed() {
        let err = DexError::MethodNotFound("method not found".to_string());
        assert!(err.is_suppressed());
        assert!(!DexError::Timeout.is_suppressed());
        assert!(!DexError::Reverted("x".to_string()).is_suppressed());
    }
}
