use clap::ValueEnum;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use rein_autonomy::ScriptedResponder;
use rein_config::ReinConfig;
use rein_runtime::hooks::{
    self, PostCheckResponse, PreCheckResponse, PromptContext, parse_event,
};

use super::build_engine;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(super) enum HookStage {
    /// Before a tool runs: may it proceed?
    Pre,
    /// After a tool ran: record the outcome
    Post,
    /// On prompt submit: automation context
    Prompt,
}

fn read_input(input: &Path) -> std::io::Result<String> {
    if input == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        std::fs::read_to_string(input)
    }
}

fn emit<T: Serialize>(response: &T) -> rein_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

/// Hooks never fail the calling tool: every problem is reported inside the
/// JSON response and the command exits successfully.
pub(super) async fn cmd_hook(
    config: Arc<ReinConfig>,
    root: &Path,
    stage: HookStage,
    input: &Path,
) -> rein_core::Result<()> {
    let engine = build_engine(config, root, Arc::new(ScriptedResponder::new()));

    if let HookStage::Prompt = stage {
        return emit(&hooks::prompt_context(&engine));
    }

    let event = read_input(input)
        .map_err(|e| e.to_string())
        .and_then(|raw| parse_event(&raw).map_err(|e| e.to_string()));
    let event = match event {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, ?stage, "unusable hook input");
            return match stage {
                HookStage::Pre => emit(&PreCheckResponse {
                    allowed: true,
                    reason: Some("hook failed, allowing".into()),
                    error: Some(error),
                    ..PreCheckResponse::default()
                }),
                HookStage::Post => emit(&PostCheckResponse {
                    processed: false,
                    error: Some(error),
                    ..PostCheckResponse::default()
                }),
                HookStage::Prompt => emit(&PromptContext::default()),
            };
        }
    };

    match stage {
        HookStage::Pre => emit(&hooks::pre_check(&engine, &event)),
        HookStage::Post => emit(&hooks::post_check(&engine, &event).await),
        HookStage::Prompt => emit(&hooks::prompt_context(&engine)),
    }
}
