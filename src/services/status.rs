use crate::domain::models::{StatusReport, Step, StepStatus};
use crate::services::storage::{mask, StateManager};
use std::collections::BTreeMap;

pub fn build_status(sm: &StateManager) -> StatusReport {
    let s = &sm.state;
    let steps = Step::ORDER
        .iter()
        .map(|step| StepStatus {
            step: step.name().to_string(),
            done: sm.is_done(step.completion_flag()),
            flags: step
                .flags()
                .iter()
                .map(|f| (f.key().to_string(), sm.is_done(*f)))
                .collect(),
            error: s.errors.get(step.name()).cloned(),
        })
        .collect();

    let mut values = BTreeMap::new();
    let mut put = |k: &str, v: Option<String>| {
        if let Some(v) = v {
            values.insert(k.to_string(), v);
        }
    };
    put("dlpName", s.dlp_name.clone());
    put("tokenName", s.token_name.clone());
    put("tokenSymbol", s.token_symbol.clone());
    put("address", s.address.clone());
    put("tokenAddress", s.token_address.clone());
    put("proxyAddress", s.proxy_address.clone());
    put("vestingAddress", s.vesting_address.clone());
    put("dlpId", s.dlp_id.map(|v| v.to_string()));
    put("refinerId", s.refiner_id.map(|v| v.to_string()));
    put("proofRepo", s.proof_repo.clone());
    put("refinerRepo", s.refiner_repo.clone());
    put("proofUrl", s.proof_url.clone());
    put("refinerUrl", s.refiner_url.clone());
    put("schemaUrl", s.schema_url.clone());
    put("privateKey", s.private_key.as_deref().map(mask));
    put("pinataApiSecret", s.pinata_api_secret.as_deref().map(mask));
    put("googleClientSecret", s.google_client_secret.as_deref().map(mask));
    put("refinementEncryptionKey", s.refinement_encryption_key.as_deref().map(mask));

    let next = if !sm.exists() {
        Some("datadao setup".to_string())
    } else {
        sm.next_step().map(|s| s.command().to_string())
    };

    StatusReport {
        project: sm
            .path()
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        steps,
        values,
        warnings: sm.validate(),
        next,
    }
}

pub fn render_status(r: &StatusReport) -> String {
    let mut out = vec![format!("project: {}", r.project)];
    for st in &r.steps {
        out.push(format!("{}\t{}", st.step, if st.done { "done" } else { "pending" }));
        if let Some(e) = &st.error {
            out.push(format!("  error ({}): {}", e.timestamp, e.message));
            if let Some(h) = &e.hint {
                out.push(format!("  hint: {}", h));
            }
        }
    }
    for (k, v) in &r.values {
        out.push(format!("{}: {}", k, v));
    }
    for w in &r.warnings {
        out.push(format!("warning: {}", w));
    }
    match &r.next {
        Some(n) => out.push(format!("next: {}", n)),
        None => out.push("all steps complete".to_string()),
    }
    out.join("\n")
}
