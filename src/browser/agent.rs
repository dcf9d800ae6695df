//! Page agent: the script injected into the tab that observes the page and
//! performs overlay writes on behalf of the engine.

use crate::error::{OverlayError, Result};
use crate::events::PageEvent;
use crate::overlay::{ContainerKey, OverlayPatch};
use headless_chrome::Tab;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const AGENT_JS: &str = include_str!("page_agent.js");

/// Install the agent unless it is already present; returns true on a fresh install
pub fn install(tab: &Arc<Tab>) -> Result<bool> {
    let status = evaluate(tab, AGENT_JS)?;
    match status.as_str() {
        Some("installed") => {
            log::debug!("Page agent installed");
            Ok(true)
        }
        Some("present") => Ok(false),
        _ => Err(OverlayError::EvaluationFailed(format!(
            "Unexpected agent install status: {}",
            status
        ))),
    }
}

/// Take every queued page event; `None` if the agent is gone (the page reloaded)
pub fn drain(tab: &Arc<Tab>) -> Result<Option<Vec<PageEvent>>> {
    let value = evaluate(tab, "window.__ocrOverlay ? window.__ocrOverlay.drain() : null")?;
    let Some(json_str) = value.as_str() else {
        return Ok(None);
    };

    let raw: Vec<Value> = serde_json::from_str(json_str)
        .map_err(|e| OverlayError::EvaluationFailed(format!("Failed to parse agent events: {}", e)))?;

    let events = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<PageEvent>(value.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                log::debug!("Ignoring malformed agent event {}: {}", value, e);
                None
            }
        })
        .collect();
    Ok(Some(events))
}

/// What the agent did with an overlay patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The anchor element is gone
    AnchorMissing,
    /// A position-only patch found its container or blocks removed from the page
    NeedsRebuild,
}

impl ApplyOutcome {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(ApplyOutcome::Applied),
            Value::Bool(false) => Some(ApplyOutcome::AnchorMissing),
            Value::String(s) if s == "rebuild" => Some(ApplyOutcome::NeedsRebuild),
            _ => None,
        }
    }
}

pub fn apply(tab: &Arc<Tab>, patch: &OverlayPatch) -> Result<ApplyOutcome> {
    let value = evaluate(tab, &script_for("apply", patch)?)?;
    if value.is_null() {
        return Err(OverlayError::EvaluationFailed("Page agent is not installed".to_string()));
    }
    ApplyOutcome::from_value(&value)
        .ok_or_else(|| OverlayError::EvaluationFailed(format!("Unexpected result from apply: {}", value)))
}

/// Remove a container; false if it did not exist
pub fn remove(tab: &Arc<Tab>, container: &ContainerKey) -> Result<bool> {
    call(tab, "remove", container)
}

/// Show a transient message in the page
pub fn toast(tab: &Arc<Tab>, message: &str) -> Result<bool> {
    call(tab, "toast", message)
}

/// Path of the element the agent sees at `selector`, for checking that both sides agree
pub fn path_of(tab: &Arc<Tab>, selector: &str) -> Result<Option<String>> {
    let selector_json = to_js(selector)?;
    let value = evaluate(
        tab,
        &format!(
            "window.__ocrOverlay ? window.__ocrOverlay.getPath(document.querySelector({})) : null",
            selector_json
        ),
    )?;
    Ok(value.as_str().map(str::to_string))
}

fn script_for<T: Serialize + ?Sized>(method: &str, arg: &T) -> Result<String> {
    Ok(format!(
        "window.__ocrOverlay ? window.__ocrOverlay.{}({}) : null",
        method,
        to_js(arg)?
    ))
}

fn call<T: Serialize + ?Sized>(tab: &Arc<Tab>, method: &str, arg: &T) -> Result<bool> {
    let value = evaluate(tab, &script_for(method, arg)?)?;
    match value {
        Value::Bool(done) => Ok(done),
        Value::Null => Err(OverlayError::EvaluationFailed("Page agent is not installed".to_string())),
        other => Err(OverlayError::EvaluationFailed(format!(
            "Unexpected result from {}: {}",
            method, other
        ))),
    }
}

/// JSON is a valid JavaScript expression, so arguments are passed as literals
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| OverlayError::EvaluationFailed(format!("Failed to encode argument: {}", e)))
}

fn evaluate(tab: &Arc<Tab>, script: &str) -> Result<Value> {
    let result = tab
        .evaluate(script, false)
        .map_err(|e| OverlayError::EvaluationFailed(e.to_string()))?;
    Ok(result.value.unwrap_or(Value::Null))
}
