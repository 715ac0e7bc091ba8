//! Functions and constructors of a contract interface

use bytes::Bytes;

use super::decode::decode;
use super::encode::{encode, function_selector};
use super::types::{ParamType, Token};
use crate::SdkError;

/// A named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name, possibly empty
    pub name: String,
    /// ABI type
    pub kind: ParamType,
    /// Indexed (event parameters only)
    pub indexed: bool,
}

impl Param {
    /// Create a non-indexed parameter
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
        }
    }

    /// Create an indexed event parameter
    pub fn indexed(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: true,
        }
    }
}

impl From<ParamType> for Param {
    fn from(kind: ParamType) -> Self {
        Param::new("", kind)
    }
}

/// Declared state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMutability {
    /// Reads nothing
    Pure,
    /// Reads state
    View,
    /// Writes state, rejects value
    #[default]
    NonPayable,
    /// Writes state, accepts value
    Payable,
}

impl StateMutability {
    pub(crate) fn from_json_str(s: &str) -> Option<Self> {
        match s {
            "pure" => Some(StateMutability::Pure),
            "view" => Some(StateMutability::View),
            "nonpayable" => Some(StateMutability::NonPayable),
            "payable" => Some(StateMutability::Payable),
            _ => None,
        }
    }
}

pub(crate) fn types_of(params: &[Param]) -> Vec<ParamType> {
    params.iter().map(|p| p.kind.clone()).collect()
}

/// Contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<Param>,
    /// Outputs in declaration order
    pub outputs: Vec<Param>,
    /// State mutability
    pub state_mutability: StateMutability,
}

impl Function {
    /// Create a function with unnamed parameters
    pub fn new(name: impl Into<String>, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(Param::from).collect(),
            outputs: outputs.into_iter().map(Param::from).collect(),
            state_mutability: StateMutability::NonPayable,
        }
    }

    /// Set the state mutability
    pub fn with_mutability(mut self, state_mutability: StateMutability) -> Self {
        self.state_mutability = state_mutability;
        self
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First 4 bytes of the Keccak hash of the signature
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// True for `view` and `pure` functions
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Selector followed by the encoded arguments
    pub fn encode_input(&self, args: &[Token]) -> Result<Bytes, SdkError> {
        if args.len() != self.inputs.len() {
            return Err(SdkError::Abi(format!(
                "{} expects {} arguments, got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }
        let mut data = self.selector().to_vec();
        data.extend(encode(&types_of(&self.inputs), args)?);
        Ok(Bytes::from(data))
    }

    /// Decode call data produced by [`Function::encode_input`]
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        if data.len() < 4 || data[..4] != self.selector() {
            return Err(SdkError::Abi(format!(
                "call data does not start with the selector of {}",
                self.signature()
            )));
        }
        decode(&types_of(&self.inputs), &data[4..])
    }

    /// Decode return data
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        decode(&types_of(&self.outputs), data)
    }
}

/// Contract constructor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Constructor {
    /// Inputs in declaration order
    pub inputs: Vec<Param>,
    /// State mutability (`NonPayable` or `Payable`)
    pub state_mutability: StateMutability,
}

impl Constructor {
    /// Create a constructor with unnamed parameters
    pub fn new(inputs: Vec<ParamType>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Param::from).collect(),
            state_mutability: StateMutability::NonPayable,
        }
    }

    /// Creation payload: bytecode followed by the encoded arguments
    pub fn encode_input(&self, bytecode: &[u8], args: &[Token]) -> Result<Bytes, SdkError> {
        if args.len() != self.inputs.len() {
            return Err(SdkError::Abi(format!(
                "constructor expects {} arguments, got {}",
                self.inputs.len(),
                args.len()
            )));
        }
        let mut data = bytecode.to_vec();
        data.extend(encode(&types_of(&self.inputs), args)?);
        Ok(Bytes::from(data))
    }
}
