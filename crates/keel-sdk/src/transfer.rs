//! Plain ether transfers

use keel_crypto::PrivateKey;
use keel_primitives::Address;
use serde::Deserialize;

use crate::tx_builder::{TransactionIntent, TxBuilder};
use crate::types::SentTransaction;
use crate::units::parse_ether;
use crate::SdkError;

/// A transfer as entered by a user: every field is text and every field is
/// required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransferRequest {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in ether, e.g. `0.02`
    pub amount: String,
    /// Gas limit
    pub gas: String,
}

impl TransferRequest {
    /// Create a request
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
        gas: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            gas: gas.into(),
        }
    }

    /// Check presence and format of every field and turn the request into an
    /// intent. No network access.
    pub fn to_intent(&self) -> Result<TransactionIntent, SdkError> {
        let missing: Vec<&str> = [
            ("from", &self.from),
            ("to", &self.to),
            ("amount", &self.amount),
            ("gas", &self.gas),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(SdkError::Validation(format!(
                "all fields are required; missing {}",
                missing.join(", ")
            )));
        }

        let from = Address::from_hex(self.from.trim())?;
        let to = Address::from_hex(self.to.trim())?;
        let value = parse_ether(&self.amount)?;
        let gas: u64 = self
            .gas
            .trim()
            .parse()
            .map_err(|_| SdkError::Validation(format!("invalid gas: {:?}", self.gas)))?;
        if gas == 0 {
            return Err(SdkError::Validation("gas must be positive".to_string()));
        }

        Ok(TransactionIntent::new(from).to(to).value(value).gas_limit(gas))
    }
}

/// Sign and broadcast an ether transfer.
///
/// All validation happens before any network call. The sender must be the
/// key's address. Nonce and gas price come from the node; the receipt is not
/// awaited.
pub async fn transfer(
    builder: &TxBuilder<'_>,
    request: &TransferRequest,
    key: &PrivateKey,
) -> Result<SentTransaction, SdkError> {
    let intent = request.to_intent()?;
    if *intent.sender() != key.address() {
        return Err(SdkError::Validation(format!(
            "from address {} does not match the signing key",
            intent.sender()
        )));
    }

    let signed = builder.build(intent, key).await?;
    let hash = builder.client().send_raw_transaction(signed.raw()).await?;
    tracing::info!("transferred {} ether to {}", request.amount.trim(), request.to.trim());
    Ok(SentTransaction { hash, signed })
}
