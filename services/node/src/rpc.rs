//! Line-oriented JSON RPC surface.
//!
//! One request per line, one response per line. Requests carry an
//! `id`, a `method`, and optional `params`; responses echo the id with
//! either a `result` or an `error` of `{code, message}`. Codes follow
//! the JSON-RPC convention: -32700 parse error, -32600 invalid
//! request, -32601 method not found, -32602 invalid params, -32603
//! internal error, -32000 miner busy.

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use weft_miner::{Miner, MinerError};

use crate::state::NodeState;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const MINER_BUSY: i32 = -32000;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl Response {
    fn result(id: Value, result: Value) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, error: RpcError) -> Self {
        Response {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// An RPC failure sent back to the client.
#[derive(Debug, Serialize)]
pub struct RpcError {
    code: i32,
    message: String,
}

impl RpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    fn internal(err: impl Display) -> Self {
        Self::new(INTERNAL_ERROR, err.to_string())
    }

    fn from_miner(err: MinerError) -> Self {
        match err {
            MinerError::ZeroDifficulty => Self::invalid_params(err.to_string()),
            MinerError::AlreadyRunning => Self::new(MINER_BUSY, err.to_string()),
            MinerError::WorkerSpawn { .. } => Self::internal(err),
        }
    }
}

/// Accepts RPC clients until the task is dropped.
pub async fn serve(listener: TcpListener, state: Arc<NodeState>) -> anyhow::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("rpc client connected from {}", peer_addr);
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, state).await {
                        error!("rpc connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("failed to accept rpc connection: {}", e);
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<NodeState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatch_line(&line, &state);
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }

    info!("rpc client {} disconnected", peer_addr);
    Ok(())
}

/// Parses one request line and runs it. Syntax errors come back with a
/// null id; shape errors echo the id when one can be dug out.
fn dispatch_line(line: &str, state: &NodeState) -> Response {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Response::error(Value::Null, RpcError::new(PARSE_ERROR, e.to_string()));
        }
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Response::error(id, RpcError::new(INVALID_REQUEST, e.to_string()));
        }
    };
    dispatch(request, state)
}

fn dispatch(request: Request, state: &NodeState) -> Response {
    debug!(method = %request.method, "rpc request");
    let result = match request.method.as_str() {
        "miner.start" => handle_miner_start(&request.params, state),
        "miner.stop" => handle_miner_stop(state),
        "miner.status" => handle_miner_status(state),
        "node.info" => handle_node_info(state),
        "node.memory" => handle_node_memory(state),
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("unknown method {other}"),
        )),
    };
    match result {
        Ok(value) => Response::result(request.id, value),
        Err(error) => Response::error(request.id, error),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MinerStartParams {
    difficulty: Option<u64>,
    threads: Option<usize>,
    payload_hex: Option<String>,
}

fn parse_params<T: serde::de::DeserializeOwned + Default>(params: &Value) -> Result<T, RpcError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn handle_miner_start(params: &Value, state: &NodeState) -> Result<Value, RpcError> {
    let params: MinerStartParams = parse_params(params)?;
    let payload = match &params.payload_hex {
        Some(hex_str) => hex::decode(hex_str)
            .map_err(|e| RpcError::invalid_params(format!("payload_hex: {e}")))?,
        None => state.config().name.clone().into_bytes(),
    };

    let mut miner = state.miner();
    // A solution the recorder has not collected yet would be dropped by
    // the restart; persist it first.
    if let Some(pending) = miner.take_solution() {
        state.record_solution(&pending).map_err(RpcError::internal)?;
    }

    let difficulty = params.difficulty.unwrap_or_else(|| miner.difficulty());
    let threads = params.threads.unwrap_or_else(|| miner.threads());
    if difficulty != miner.difficulty() || threads != miner.threads() {
        // Overrides replace the engine, so the current round must be over.
        if miner.is_running() {
            return Err(RpcError::from_miner(MinerError::AlreadyRunning));
        }
        *miner = Miner::new(threads, difficulty).map_err(RpcError::from_miner)?;
    }
    miner.start(payload).map_err(RpcError::from_miner)?;

    Ok(json!({
        "running": true,
        "difficulty": miner.difficulty(),
        "target": miner.target().to_hex(),
    }))
}

fn handle_miner_stop(state: &NodeState) -> Result<Value, RpcError> {
    let mut miner = state.miner();
    let was_running = miner.is_running();
    miner.stop();
    Ok(json!({ "stopped": was_running }))
}

fn handle_miner_status(state: &NodeState) -> Result<Value, RpcError> {
    let mut status = serde_json::to_value(state.miner().status()).map_err(RpcError::internal)?;
    status["recorded_solutions"] = json!(state.recorded_solutions());
    Ok(status)
}

fn handle_node_info(state: &NodeState) -> Result<Value, RpcError> {
    let config = state.config();
    Ok(json!({
        "name": config.name,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "rpc_addr": config.rpc_addr,
        "data_dir": config.data_dir.display().to_string(),
    }))
}

fn handle_node_memory(state: &NodeState) -> Result<Value, RpcError> {
    serde_json::to_value(state.sample_memory()).map_err(RpcError::internal)
}
