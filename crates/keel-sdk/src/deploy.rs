//! Compile-and-deploy pipeline
//!
//! ```text
//! Idle -> Compiling -> Compiled -> Estimating -> Signing -> Broadcasting -> Deployed
//!   \________\___________\____________\____________\____________\-------> Failed
//! ```
//!
//! Nothing touches the chain until compilation has produced the requested
//! contract.

use std::fmt;
use std::time::Duration;

use keel_crypto::PrivateKey;
use keel_primitives::{Address, H256, U256};
use keel_types::{SignedTransaction, TransactionReceipt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::abi::Token;
use crate::compiler::{CompilerService, ContractDescriptor, Sources};
use crate::contract::Contract;
use crate::nonce::NonceReservation;
use crate::tx_builder::{ResolvedTransaction, TransactionIntent, TxBuilder};
use crate::types::PollConfig;
use crate::SdkError;

/// Stage of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployStage {
    /// Not started
    Idle,
    /// Compiler running
    Compiling,
    /// Contract selected from the compiler output
    Compiled,
    /// Nonce, gas limit and gas price being resolved
    Estimating,
    /// Creation transaction being signed
    Signing,
    /// Payload sent, waiting for the receipt
    Broadcasting,
    /// Contract address known
    Deployed,
    /// Stopped with an error
    Failed,
}

impl DeployStage {
    /// Whether the pipeline may move from `self` to `next`
    pub fn can_transition_to(&self, next: DeployStage) -> bool {
        use DeployStage::*;
        match (self, next) {
            (Deployed | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Compiling)
            | (Compiling, Compiled)
            | (Compiled, Estimating)
            | (Estimating, Signing)
            | (Signing, Broadcasting)
            | (Broadcasting, Deployed) => true,
            _ => false,
        }
    }

    /// Deployed and Failed are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployStage::Deployed | DeployStage::Failed)
    }
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStage::Idle => "idle",
            DeployStage::Compiling => "compiling",
            DeployStage::Compiled => "compiled",
            DeployStage::Estimating => "estimating",
            DeployStage::Signing => "signing",
            DeployStage::Broadcasting => "broadcasting",
            DeployStage::Deployed => "deployed",
            DeployStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A deployment that stopped, and where
#[derive(Debug, Error)]
#[error("deployment failed while {stage}: {error}")]
pub struct DeployError {
    /// Stage that was running when the error occurred
    pub stage: DeployStage,
    /// The underlying error
    #[source]
    pub error: SdkError,
}

/// What to compile and deploy
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Compiler version, e.g. `0.8.19`
    pub compiler_version: String,
    /// Source files by name
    pub sources: Sources,
    /// Contract to deploy from the compiler output
    pub contract_name: String,
    /// Constructor arguments
    pub constructor_args: Vec<Token>,
    /// Value sent with the creation transaction
    pub value: U256,
    /// Bound on the compile step
    pub compile_timeout: Duration,
    /// Receipt polling bounds
    pub poll: PollConfig,
}

impl DeployRequest {
    /// Deploy `contract_name` from `sources`, with no constructor arguments
    pub fn new(
        compiler_version: impl Into<String>,
        sources: Sources,
        contract_name: impl Into<String>,
    ) -> Self {
        Self {
            compiler_version: compiler_version.into(),
            sources,
            contract_name: contract_name.into(),
            constructor_args: Vec::new(),
            value: U256::zero(),
            compile_timeout: Duration::from_secs(60),
            poll: PollConfig::default(),
        }
    }

    /// Set constructor arguments
    pub fn with_args(mut self, args: Vec<Token>) -> Self {
        self.constructor_args = args;
        self
    }

    /// Send value to a payable constructor
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Bound the compile step
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    /// Receipt polling bounds
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// A deployed contract and how it got there
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Address of the new contract
    pub address: Address,
    /// Hash of the creation transaction
    pub transaction_hash: H256,
    /// Signed creation transaction
    pub signed: SignedTransaction,
    /// Receipt of the creation transaction
    pub receipt: TransactionReceipt,
    /// The compiled contract that was deployed
    pub descriptor: ContractDescriptor,
}

impl Deployment {
    /// Handle for calling the deployed contract
    pub fn contract(&self) -> Contract {
        Contract::new(self.address, self.descriptor.abi.clone())
    }
}

struct StageTracker {
    stage: DeployStage,
    contract: String,
}

impl StageTracker {
    fn advance(&mut self, next: DeployStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid transition {} -> {}",
            self.stage,
            next
        );
        tracing::info!("deploy {}: {} -> {}", self.contract, self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, error: SdkError) -> DeployError {
        let stage = self.stage;
        tracing::warn!("deploy {} failed while {}: {}", self.contract, stage, error);
        self.stage = DeployStage::Failed;
        DeployError { stage, error }
    }
}

/// Compiles, signs, broadcasts and confirms contract creations
pub struct DeployPipeline<'a> {
    builder: TxBuilder<'a>,
    compiler: &'a dyn CompilerService,
}

impl<'a> DeployPipeline<'a> {
    /// Create a pipeline over a transaction builder and a compiler
    pub fn new(builder: TxBuilder<'a>, compiler: &'a dyn CompilerService) -> Self {
        Self { builder, compiler }
    }

    /// Run every stage for `request`, signing with `key`.
    ///
    /// `cancel` stops the receipt wait; the transaction may still be mined.
    pub async fn deploy(
        &self,
        request: &DeployRequest,
        key: &PrivateKey,
        cancel: &CancellationToken,
    ) -> Result<Deployment, DeployError> {
        let mut tracker = StageTracker {
            stage: DeployStage::Idle,
            contract: request.contract_name.clone(),
        };

        tracker.advance(DeployStage::Compiling);
        let descriptor = self.compile(request).await.map_err(|e| tracker.fail(e))?;
        tracker.advance(DeployStage::Compiled);

        tracker.advance(DeployStage::Estimating);
        let (resolved, reservation) = self
            .prepare(request, &descriptor, key)
            .await
            .map_err(|e| tracker.fail(e))?;

        tracker.advance(DeployStage::Signing);
        let signed = resolved.sign(key).map_err(|e| tracker.fail(e))?;
        if let Some(reservation) = reservation {
            reservation.commit();
        }

        tracker.advance(DeployStage::Broadcasting);
        let client = self.builder.client();
        let transaction_hash = client
            .send_raw_transaction(signed.raw())
            .await
            .map_err(|e| tracker.fail(e))?;
        let receipt = client
            .wait_for_receipt(&transaction_hash, &request.poll, cancel)
            .await
            .map_err(|e| tracker.fail(e))?;
        let address = check_receipt(&receipt).map_err(|e| tracker.fail(e))?;

        tracker.advance(DeployStage::Deployed);
        tracing::info!("deployed {} at {}", request.contract_name, address);
        Ok(Deployment {
            address,
            transaction_hash,
            signed,
            receipt,
            descriptor,
        })
    }

    async fn prepare(
        &self,
        request: &DeployRequest,
        descriptor: &ContractDescriptor,
        key: &PrivateKey,
    ) -> Result<(ResolvedTransaction, Option<NonceReservation>), SdkError> {
        let data = match &descriptor.abi.constructor {
            Some(constructor) => {
                constructor.encode_input(&descriptor.bytecode, &request.constructor_args)?
            }
            None if request.constructor_args.is_empty() => descriptor.bytecode.clone(),
            None => {
                return Err(SdkError::Abi(format!(
                    "{} has no constructor but {} arguments were given",
                    request.contract_name,
                    request.constructor_args.len()
                )))
            }
        };
        let intent = TransactionIntent::new(key.address())
            .value(request.value)
            .data(data);
        self.builder.resolve_reserved(intent).await
    }

    async fn compile(&self, request: &DeployRequest) -> Result<ContractDescriptor, SdkError> {
        let compile = self
            .compiler
            .compile(&request.compiler_version, &request.sources);
        let mut artifact = tokio::time::timeout(request.compile_timeout, compile)
            .await
            .map_err(|_| {
                SdkError::Compile(format!(
                    "compiler did not finish within {:?}",
                    request.compile_timeout
                ))
            })??;

        let descriptor = artifact.take(&request.contract_name).ok_or_else(|| {
            SdkError::Compile(format!(
                "contract {} not found in compiler output",
                request.contract_name
            ))
        })?;
        if descriptor.bytecode.is_empty() {
            return Err(SdkError::Compile(format!(
                "contract {} has no bytecode (abstract or interface?)",
                request.contract_name
            )));
        }
        Ok(descriptor)
    }
}

fn check_receipt(receipt: &TransactionReceipt) -> Result<Address, SdkError> {
    if receipt.is_reverted() {
        return Err(SdkError::Deployment(format!(
            "creation transaction {} reverted",
            receipt.transaction_hash
        )));
    }
    receipt.contract_address.ok_or_else(|| {
        SdkError::Deployment(format!(
            "receipt for {} has no contract address",
            receipt.transaction_hash
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions() {
        use DeployStage::*;
        let path = [Idle, Compiling, Compiled, Estimating, Signing, Broadcasting, Deployed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Idle.can_transition_to(Compiled));
        assert!(!Compiled.can_transition_to(Compiling));
        assert!(!Estimating.can_transition_to(Broadcasting));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        use DeployStage::*;
        for stage in [Idle, Compiling, Compiled, Estimating, Signing, Broadcasting] {
            assert!(stage.can_transition_to(Failed));
            assert!(!stage.is_terminal());
        }
        assert!(!Deployed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));
        assert!(Deployed.is_terminal());
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_deploy_error_display() {
        let err = DeployError {
            stage: DeployStage::Compiling,
            error: SdkError::Compile("boom".into()),
        };
        assert_eq!(err.to_string(), "deployment failed while compiling: compile error: boom");
    }
}
