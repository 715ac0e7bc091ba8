//! Transaction builder
//!
//! A [`TransactionIntent`] says what the caller wants; [`TxBuilder`] fills in
//! nonce, gas limit and gas price from the node and signs, producing a
//! [`SignedTransaction`]. Broadcasting is left to the caller.

use bytes::Bytes;
use keel_crypto::PrivateKey;
use keel_primitives::{Address, U256};
use keel_types::{LegacyTx, SignedTransaction};

use crate::nonce::{NonceManager, NonceReservation};
use crate::types::{BlockId, CallRequest};
use crate::{ChainClient, SdkError};

/// What the caller wants to send, with optional pinned fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    from: Address,
    to: Option<Address>,
    value: U256,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<U256>,
    data: Bytes,
}

impl TransactionIntent {
    /// Create an intent from `from` with no recipient, value or data
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: None,
            value: U256::zero(),
            nonce: None,
            gas_limit: None,
            gas_price: None,
            data: Bytes::new(),
        }
    }

    /// Set the recipient address
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the value to transfer (in wei)
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Pin the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Pin the gas limit
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Pin the gas price (in wei)
    pub fn gas_price(mut self, price: U256) -> Self {
        self.gas_price = Some(price);
        self
    }

    /// Set the input data
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Sender
    pub fn sender(&self) -> &Address {
        &self.from
    }

    /// Recipient, `None` for contract creation
    pub fn recipient(&self) -> Option<&Address> {
        self.to.as_ref()
    }

    /// Value in wei
    pub fn amount(&self) -> U256 {
        self.value
    }

    /// Input data
    pub fn input(&self) -> &Bytes {
        &self.data
    }

    /// Turn a fully pinned intent into a resolved transaction without
    /// touching the network.
    pub fn resolve_offline(self, chain_id: u64) -> Result<ResolvedTransaction, SdkError> {
        let nonce = self.nonce.ok_or_else(|| missing("nonce"))?;
        let gas_limit = self.gas_limit.ok_or_else(|| missing("gas_limit"))?;
        let gas_price = self.gas_price.ok_or_else(|| missing("gas_price"))?;
        ResolvedTransaction::from_intent(self, nonce, gas_limit, gas_price, chain_id)
    }

    fn call_request(&self) -> CallRequest {
        CallRequest {
            from: Some(self.from),
            to: self.to,
            gas: None,
            gas_price: self.gas_price,
            value: Some(self.value),
            data: Some(self.data.clone()),
        }
    }
}

fn missing(field: &str) -> SdkError {
    SdkError::Validation(format!("{} is required for offline signing", field))
}

/// A transaction with every field decided, ready to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransaction {
    from: Address,
    chain_id: u64,
    tx: LegacyTx,
}

impl ResolvedTransaction {
    /// Combine an intent with the resolved fields. Pinned fields of the
    /// intent are ignored in favor of the arguments.
    pub fn from_intent(
        intent: TransactionIntent,
        nonce: u64,
        gas_limit: u64,
        gas_price: U256,
        chain_id: u64,
    ) -> Result<Self, SdkError> {
        if chain_id == 0 {
            return Err(SdkError::Validation(
                "chain id 0 has no replay protection".to_string(),
            ));
        }
        Ok(Self {
            from: intent.from,
            chain_id,
            tx: LegacyTx {
                nonce,
                gas_price,
                gas_limit,
                to: intent.to,
                value: intent.value,
                data: intent.data,
            },
        })
    }

    /// Sender
    pub fn sender(&self) -> &Address {
        &self.from
    }

    /// Chain id the signature will commit to
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Transaction body
    pub fn tx(&self) -> &LegacyTx {
        &self.tx
    }

    /// Sign with `key`, which must belong to the sender
    pub fn sign(&self, key: &PrivateKey) -> Result<SignedTransaction, SdkError> {
        check_key(&self.from, key)?;
        Ok(self.tx.clone().sign(self.chain_id, key)?)
    }
}

fn check_key(from: &Address, key: &PrivateKey) -> Result<(), SdkError> {
    if key.address() != *from {
        return Err(SdkError::Validation(format!(
            "signing key belongs to {}, not sender {}",
            key.address(),
            from
        )));
    }
    Ok(())
}

/// Resolves and signs transactions against one client
#[derive(Clone, Copy)]
pub struct TxBuilder<'a> {
    client: &'a ChainClient,
    nonce_manager: Option<&'a NonceManager>,
    chain_id: Option<u64>,
}

impl<'a> TxBuilder<'a> {
    /// Create a builder that reads nonces straight from the chain
    pub fn new(client: &'a ChainClient) -> Self {
        Self {
            client,
            nonce_manager: None,
            chain_id: None,
        }
    }

    /// Sequence nonces through `manager`
    pub fn with_nonce_manager(mut self, manager: &'a NonceManager) -> Self {
        self.nonce_manager = Some(manager);
        self
    }

    /// Sign for `chain_id` instead of the client's chain
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Client used for lookups
    pub fn client(&self) -> &'a ChainClient {
        self.client
    }

    /// Resolve nonce, gas limit and gas price, without signing.
    ///
    /// A nonce reserved through the manager counts as issued once this
    /// returns.
    pub async fn resolve(&self, intent: TransactionIntent) -> Result<ResolvedTransaction, SdkError> {
        let (resolved, reservation) = self.resolve_reserved(intent).await?;
        if let Some(reservation) = reservation {
            reservation.commit();
        }
        Ok(resolved)
    }

    /// Resolve and sign.
    ///
    /// Steps run in order (nonce, gas limit, gas price, signature) and the
    /// first failure aborts the build. A failed build releases its nonce.
    pub async fn build(
        &self,
        intent: TransactionIntent,
        key: &PrivateKey,
    ) -> Result<SignedTransaction, SdkError> {
        check_key(&intent.from, key)?;

        let (resolved, reservation) = self.resolve_reserved(intent).await?;
        let signed = resolved.sign(key)?;

        if let Some(reservation) = reservation {
            reservation.commit();
        }
        tracing::debug!(
            "signed transaction {} from {} nonce {}",
            signed.hash(),
            resolved.sender(),
            resolved.tx().nonce
        );
        Ok(signed)
    }

    pub(crate) async fn resolve_reserved(
        &self,
        intent: TransactionIntent,
    ) -> Result<(ResolvedTransaction, Option<NonceReservation>), SdkError> {
        // 1. nonce
        let (nonce, reservation) = match (intent.nonce, self.nonce_manager) {
            (Some(nonce), _) => (nonce, None),
            (None, Some(manager)) => {
                let reservation = manager.reserve(self.client, &intent.from).await?;
                (reservation.nonce(), Some(reservation))
            }
            (None, None) => (
                self.client.get_nonce(&intent.from, BlockId::Pending).await?,
                None,
            ),
        };

        // 2. gas limit
        let gas_limit = match intent.gas_limit {
            Some(limit) => limit,
            None => self.client.estimate_gas(&intent.call_request()).await?,
        };

        // 3. gas price
        let gas_price = match intent.gas_price {
            Some(price) => price,
            None => self.client.gas_price().await?,
        };

        let chain_id = match self.chain_id {
            Some(id) => id,
            None => self.client.chain_id().await?,
        };

        let resolved = ResolvedTransaction::from_intent(intent, nonce, gas_limit, gas_price, chain_id)?;
        Ok((resolved, reservation))
    }
}
