//! In-crate connector double for gateway and transaction tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connector::{Connection, Connector, FunctionResponse};
use crate::destination::DestinationConfig;
use crate::error::{RfcError, RfcResult};
use crate::models::{FunctionCall, FunctionSignature, Message};
use crate::transaction::{COMMIT_FUNCTION, ROLLBACK_FUNCTION};

const RETURN_FIELDS: &[&str] = &["TYPE", "ID", "NUMBER", "MESSAGE"];

/// Scripted reply for the next execution of a function
#[derive(Clone)]
pub enum Reply {
    Ok(FunctionResponse),
    Runtime(String),
    Connection(String),
}

#[derive(Default)]
struct Recorded {
    executed: Vec<FunctionCall>,
    lookups: usize,
    replies: HashMap<String, VecDeque<Reply>>,
}

#[derive(Clone, Default)]
pub struct RecordingConnector {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingConnector {
    pub fn reply(&self, function: &str, reply: Reply) {
        self.state
            .lock()
            .replies
            .entry(function.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn executed(&self) -> Vec<FunctionCall> {
        self.state.lock().executed.clone()
    }

    pub fn executed_names(&self) -> Vec<String> {
        self.executed()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().lookups
    }
}

pub fn messages_response(messages: &[Message]) -> FunctionResponse {
    let mut response = FunctionResponse::default();
    response.tables.insert(
        "RETURN".to_string(),
        messages.iter().map(Message::to_return_row).collect(),
    );
    response
}

pub fn return_structure(message: &Message) -> FunctionResponse {
    let mut response = FunctionResponse::default();
    response
        .structures
        .insert("RETURN".to_string(), message.to_return_row());
    response
}

fn signature(function: &str) -> Option<FunctionSignature> {
    let sig = match function {
        "Z_CREATE" => FunctionSignature::new(function)
            .import_structure("DATA", &["NAME", "CITY"])
            .export_scalar("ID")
            .table("RETURN", RETURN_FIELDS),
        "Z_READ" => FunctionSignature::new(function)
            .import_scalar("ID")
            .export_structure("DATA", &["NAME", "CITY"])
            .table("RETURN", RETURN_FIELDS),
        COMMIT_FUNCTION => FunctionSignature::new(function)
            .import_scalar("WAIT")
            .export_structure("RETURN", RETURN_FIELDS),
        ROLLBACK_FUNCTION => {
            FunctionSignature::new(function).export_structure("RETURN", RETURN_FIELDS)
        }
        _ => return None,
    };
    Some(sig)
}

struct RecordingConnection {
    state: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, _config: &DestinationConfig) -> RfcResult<Box<dyn Connection>> {
        Ok(Box::new(RecordingConnection {
            state: self.state.clone(),
        }))
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn lookup(&mut self, function: &str) -> RfcResult<FunctionSignature> {
        self.state.lock().lookups += 1;
        signature(function)
            .ok_or_else(|| RfcError::mismatch(function, "function not found in repository"))
    }

    async fn execute(&mut self, call: &FunctionCall) -> RfcResult<FunctionResponse> {
        let mut state = self.state.lock();
        state.executed.push(call.clone());
        let reply = state
            .replies
            .get_mut(call.name())
            .and_then(VecDeque::pop_front);

        match reply {
            None => Ok(FunctionResponse::default()),
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Runtime(msg)) => Err(RfcError::RemoteRuntime(msg)),
            Some(Reply::Connection(msg)) => Err(RfcError::Connection(msg)),
        }
    }
}
