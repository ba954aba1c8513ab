use serde_json::{json, Value};
use tracing::{debug, info};

use relaysim_loader::ScenarioCatalog;

use crate::config::HarnessConfig;
use crate::store::RunStore;

/// Server state shared across request handling.
pub struct ApiState {
    pub catalog: ScenarioCatalog,
    pub store: RunStore,
    pub config: HarnessConfig,
}

impl ApiState {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            catalog: config.catalog(),
            store: RunStore::new(),
            config,
        }
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

/// Handle one newline-delimited request line.
pub fn handle_line(line: &str, state: &ApiState) -> Value {
    match serde_json::from_str::<Value>(line) {
        Ok(req) => handle_request(&req, state),
        Err(e) => {
            debug!(error = %e, "unparseable request");
            json_rpc_error(Value::Null, -32700, "Parse error")
        }
    }
}

/// Handle a single JSON-RPC request and return a JSON-RPC response.
pub fn handle_request(req: &Value, state: &ApiState) -> Value {
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");

    match method {
        "initialize" => json_rpc_result(id, handle_initialize()),
        "tools/list" => json_rpc_result(id, handle_tools_list()),
        "tools/call" => {
            let params = req.get("params").cloned().unwrap_or(json!({}));
            json_rpc_result(id, handle_tools_call(&params, state))
        }
        _ => json_rpc_error(id, -32601, "Method not found"),
    }
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "serverInfo": {
            "name": "relaysim",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {}
        }
    })
}

fn handle_tools_list() -> Value {
    let run_id_schema = json!({
        "type": "object",
        "properties": {
            "run_id": { "type": "string", "description": "Id returned by relaysim_run" }
        },
        "required": ["run_id"]
    });
    let empty_schema = json!({ "type": "object", "properties": {} });

    json!({
        "tools": [
            {
                "name": "relaysim_list_scenarios",
                "description": "List the scenarios available in the scenarios directory",
                "inputSchema": empty_schema
            },
            {
                "name": "relaysim_run",
                "description": "Run a scenario by name on a fresh simulated relay and store the result",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "scenario": {
                            "type": "string",
                            "description": "Scenario name, with or without extension"
                        }
                    },
                    "required": ["scenario"]
                }
            },
            {
                "name": "relaysim_get_run",
                "description": "Get a stored scenario result",
                "inputSchema": run_id_schema
            },
            {
                "name": "relaysim_list_runs",
                "description": "Summaries of every stored run, oldest first",
                "inputSchema": empty_schema
            },
            {
                "name": "relaysim_delete_run",
                "description": "Delete a stored run",
                "inputSchema": run_id_schema
            },
            {
                "name": "relaysim_clear_runs",
                "description": "Delete every stored run",
                "inputSchema": empty_schema
            },
            {
                "name": "relaysim_device_status",
                "description": "Status snapshot of a freshly initialized simulated relay",
                "inputSchema": empty_schema
            }
        ]
    })
}

fn handle_tools_call(params: &Value, state: &ApiState) -> Value {
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    match tool_name {
        "relaysim_list_scenarios" => tool_list_scenarios(state),
        "relaysim_run" => tool_run(&arguments, state),
        "relaysim_get_run" => tool_get_run(&arguments, state),
        "relaysim_list_runs" => tool_list_runs(state),
        "relaysim_delete_run" => tool_delete_run(&arguments, state),
        "relaysim_clear_runs" => tool_clear_runs(state),
        "relaysim_device_status" => tool_device_status(state),
        _ => tool_error(format!("Unknown tool: {tool_name}")),
    }
}

fn tool_list_scenarios(state: &ApiState) -> Value {
    let scenarios = state.catalog.list();
    tool_text(json!({
        "count": scenarios.len(),
        "scenarios": scenarios,
    }))
}

fn tool_run(args: &Value, state: &ApiState) -> Value {
    let name = args.get("scenario").and_then(|v| v.as_str()).unwrap_or("");

    let scenario = match state.catalog.load(name) {
        Ok(scenario) => scenario,
        Err(e) => return tool_error(e.to_string()),
    };

    let result = state.config.runner().run_scenario(&scenario);
    info!(run_id = result.run_id(), status = %result.overall_status(), "run finished");
    let report = result.snapshot();
    if let Err(e) = state.store.insert(result) {
        return tool_error(e.to_string());
    }
    tool_text(json!(report))
}

fn tool_get_run(args: &Value, state: &ApiState) -> Value {
    let run_id = args.get("run_id").and_then(|v| v.as_str()).unwrap_or("");
    match state.store.get(run_id) {
        Some(result) => tool_text(json!(result.snapshot())),
        None => tool_error(format!("Run not found: {run_id}")),
    }
}

fn tool_list_runs(state: &ApiState) -> Value {
    let runs: Vec<Value> = state
        .store
        .list()
        .iter()
        .map(|r| {
            json!({
                "run_id": r.run_id(),
                "scenario_name": r.scenario_name(),
                "overall_status": r.overall_status(),
                "total_steps": r.total_steps(),
                "passed_steps": r.passed_steps(),
            })
        })
        .collect();
    tool_text(json!({ "count": runs.len(), "runs": runs }))
}

fn tool_delete_run(args: &Value, state: &ApiState) -> Value {
    let run_id = args.get("run_id").and_then(|v| v.as_str()).unwrap_or("");
    match state.store.remove(run_id) {
        Ok(_) => tool_text(json!({ "deleted": run_id })),
        Err(e) => tool_error(e.to_string()),
    }
}

fn tool_clear_runs(state: &ApiState) -> Value {
    tool_text(json!({ "cleared": state.store.clear() }))
}

fn tool_device_status(state: &ApiState) -> Value {
    tool_text(json!(state.config.device().get_status()))
}

fn tool_text(payload: Value) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": payload.to_string()
        }]
    })
}

fn tool_error(message: String) -> Value {
    json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": json!({ "error": message }).to_string()
        }]
    })
}

fn json_rpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        }
    })
}
