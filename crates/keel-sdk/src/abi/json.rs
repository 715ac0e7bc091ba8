//! Contract interface loaded from the standard JSON ABI

use serde::Deserialize;
use serde_json::Value;

use super::event::Event;
use super::function::{Constructor, Function, Param, StateMutability};
use super::parse::{apply_array_suffixes, parse_type};
use super::types::ParamType;
use crate::SdkError;

/// Functions, events and constructor of one contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    /// Constructor, if declared
    pub constructor: Option<Constructor>,
    /// Functions in declaration order (overloads share a name)
    pub functions: Vec<Function>,
    /// Events in declaration order
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonItem {
    #[serde(rename = "type", default = "default_item_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Vec<JsonParam>,
    #[serde(default)]
    indexed: bool,
}

fn default_item_type() -> String {
    "function".to_string()
}

impl JsonParam {
    fn param_type(&self) -> Result<ParamType, SdkError> {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let components = self
                    .components
                    .iter()
                    .map(JsonParam::param_type)
                    .collect::<Result<Vec<_>, _>>()?;
                apply_array_suffixes(ParamType::Tuple(components), suffix)
            }
            None => parse_type(&self.kind),
        }
    }

    fn to_param(&self) -> Result<Param, SdkError> {
        Ok(Param {
            name: self.name.clone(),
            kind: self.param_type()?,
            indexed: self.indexed,
        })
    }
}

impl JsonItem {
    fn mutability(&self) -> StateMutability {
        if let Some(m) = self
            .state_mutability
            .as_deref()
            .and_then(StateMutability::from_json_str)
        {
            return m;
        }
        match (self.constant, self.payable) {
            (Some(true), _) => StateMutability::View,
            (_, Some(true)) => StateMutability::Payable,
            _ => StateMutability::NonPayable,
        }
    }

    fn params(list: &[JsonParam]) -> Result<Vec<Param>, SdkError> {
        list.iter().map(JsonParam::to_param).collect()
    }
}

impl Abi {
    /// Parse a JSON ABI document (an array of items)
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SdkError::Abi(format!("invalid ABI JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Build from an already parsed JSON ABI array
    pub fn from_value(value: Value) -> Result<Self, SdkError> {
        let items: Vec<JsonItem> = serde_json::from_value(value)
            .map_err(|e| SdkError::Abi(format!("invalid ABI JSON: {}", e)))?;

        let mut abi = Abi::default();
        for item in items {
            match item.kind.as_str() {
                "function" => abi.functions.push(Function {
                    name: item.name.clone(),
                    inputs: JsonItem::params(&item.inputs)?,
                    outputs: JsonItem::params(&item.outputs)?,
                    state_mutability: item.mutability(),
                }),
                "constructor" => {
                    abi.constructor = Some(Constructor {
                        inputs: JsonItem::params(&item.inputs)?,
                        state_mutability: item.mutability(),
                    })
                }
                "event" => abi.events.push(Event {
                    name: item.name.clone(),
                    inputs: JsonItem::params(&item.inputs)?,
                    anonymous: item.anonymous,
                }),
                // fallback, receive and custom errors have no call surface here
                _ => {}
            }
        }
        Ok(abi)
    }

    /// Look up a function by name, or by full signature for overloads.
    ///
    /// A bare name shared by several overloads is ambiguous and fails.
    pub fn function(&self, name_or_signature: &str) -> Result<&Function, SdkError> {
        if name_or_signature.contains('(') {
            let wanted = normalize_signature(name_or_signature)?;
            return self
                .functions
                .iter()
                .find(|f| f.signature() == wanted)
                .ok_or_else(|| SdkError::Abi(format!("unknown function {}", name_or_signature)));
        }

        let mut matches = self.functions.iter().filter(|f| f.name == name_or_signature);
        match (matches.next(), matches.next()) {
            (Some(f), None) => Ok(f),
            (None, _) => Err(SdkError::Abi(format!("unknown function {}", name_or_signature))),
            (Some(_), Some(_)) => Err(SdkError::Abi(format!(
                "{} is overloaded; use the full signature",
                name_or_signature
            ))),
        }
    }

    /// Look up an event by name
    pub fn event(&self, name: &str) -> Result<&Event, SdkError> {
        self.events
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SdkError::Abi(format!("unknown event {}", name)))
    }

    /// Whether a function with this name exists
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }
}

/// Canonicalize a user-written signature, e.g. `foo(uint, address)` into `foo(uint256,address)`
fn normalize_signature(signature: &str) -> Result<String, SdkError> {
    let open = signature
        .find('(')
        .ok_or_else(|| SdkError::Abi(format!("invalid signature {}", signature)))?;
    let name = signature[..open].trim();
    let params = parse_type(&signature[open..])?;
    match params {
        ParamType::Tuple(types) => {
            let types: Vec<String> = types.iter().map(ParamType::to_string).collect();
            Ok(format!("{}({})", name, types.join(",")))
        }
        _ => Err(SdkError::Abi(format!("invalid signature {}", signature))),
    }
}
