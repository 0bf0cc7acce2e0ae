use crate::domain::models::{CheckItem, DoctorReport};
use crate::services::context::StepContext;
use crate::services::shell::tool_available;
use crate::services::storage::StateManager;

fn item(name: &str, status: impl Into<String>) -> CheckItem {
    CheckItem {
        name: name.to_string(),
        status: status.into(),
    }
}

pub fn run_doctor(ctx: &StepContext, sm: &StateManager) -> DoctorReport {
    let mut checks = vec![item(
        "deployment_json",
        if sm.exists() { "ok" } else { "missing" },
    )];

    let tools = [
        ("npx", ctx.config.tools.deploy_command.first().map(String::as_str).unwrap_or("npx")),
        ("cast", ctx.config.tools.cast.as_str()),
        ("git", ctx.config.tools.git.as_str()),
        ("docker", ctx.config.tools.docker.as_str()),
    ];
    for (name, program) in tools {
        let ok = tool_available(ctx.runner, program, ctx.project);
        checks.push(item(&format!("tool_{}", name), if ok { "ok" } else { "missing" }));
    }

    match ctx.chain.chain_id() {
        Ok(id) => {
            checks.push(item("rpc_reachable", "ok"));
            checks.push(item(
                "chain_id",
                if id == ctx.config.network.chain_id {
                    "ok".to_string()
                } else {
                    format!("mismatch ({})", id)
                },
            ));
        }
        Err(e) => {
            tracing::warn!(error = %e, "rpc unreachable");
            checks.push(item("rpc_reachable", "unreachable"));
        }
    }

    if let Some(address) = &sm.state.address {
        let status = match ctx.chain.balance(address) {
            Ok(0) => "empty".to_string(),
            Ok(_) => "ok".to_string(),
            Err(_) => "unknown".to_string(),
        };
        checks.push(item("wallet_balance", status));
    }

    let overall = if checks.iter().all(|c| c.status == "ok") {
        "ok"
    } else {
        "needs_attention"
    }
    .to_string();
    DoctorReport { overall, checks }
}
