//! Command-context snapshot and response formatting.

use std::{collections::HashMap, fmt::Write as _, sync::Arc};

use crate::{
    engine::IncidentEngine,
    models::{EntityKind, Incident, IncidentState},
    persistence::{error::PersistenceError, traits::GuardianRepository},
};

use super::macros::fix_content;

/// Last-known status of one RPC provider.
#[derive(Debug, Clone, Default)]
pub struct RpcStatus {
    /// Provider name.
    pub name: String,
    /// Whether the most recent check succeeded.
    pub healthy: bool,
    /// Latency of the most recent successful check.
    pub latency_ms: i64,
    /// Error category of the most recent failed check.
    pub last_error: String,
}

/// Last-known status of one dApp.
#[derive(Debug, Clone, Default)]
pub struct DappStatus {
    /// dApp name.
    pub name: String,
    /// Whether the most recent check succeeded.
    pub healthy: bool,
    /// Latency of the most recent successful check.
    pub latency_ms: i64,
}

/// A point-in-time snapshot of everything the slash commands can answer from.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Currently recommended RPC provider, empty when unknown.
    pub recommended_rpc: String,
    /// Per-provider statuses, in configuration order.
    pub rpc_statuses: Vec<RpcStatus>,
    /// Per-dApp statuses, in configuration order.
    pub dapp_statuses: Vec<DappStatus>,
    /// Names of the configured dApps, for usage hints.
    pub dapp_names: Vec<String>,
    /// Open incidents at snapshot time.
    pub open_incidents: Vec<Incident>,
}

impl CommandContext {
    /// Builds a snapshot by reading the latest check per entity, the open
    /// incidents, and the current recommendation.
    pub async fn build(
        repo: &Arc<dyn GuardianRepository>,
        engine: &IncidentEngine,
        rpc_names: &[String],
        dapp_names: &[String],
    ) -> Result<Self, PersistenceError> {
        let mut context = CommandContext {
            recommended_rpc: engine.recommend_rpc(rpc_names, 50).await,
            dapp_names: dapp_names.to_vec(),
            ..CommandContext::default()
        };

        for name in rpc_names {
            let mut status = RpcStatus { name: name.clone(), ..RpcStatus::default() };
            if let Some(check) =
                repo.recent_checks(EntityKind::Rpc, name, 1).await?.into_iter().next()
            {
                status.healthy = check.success;
                status.latency_ms = check.latency_ms.unwrap_or_default();
                status.last_error = check.error_category.unwrap_or_default();
            }
            context.rpc_statuses.push(status);
        }

        for name in dapp_names {
            let mut status = DappStatus { name: name.clone(), ..DappStatus::default() };
            if let Some(check) =
                repo.recent_checks(EntityKind::Dapp, name, 1).await?.into_iter().next()
            {
                status.healthy = check.success;
                status.latency_ms = check.latency_ms.unwrap_or_default();
            }
            context.dapp_statuses.push(status);
        }

        context.open_incidents = repo.list_incidents(Some(IncidentState::Open), 20).await?;
        Ok(context)
    }

    /// Formats the `/status` response.
    pub fn status_response(&self) -> String {
        let mut out = String::from("**Aptos Guardian – Status**\n\n");
        if !self.recommended_rpc.is_empty() {
            let _ = writeln!(out, "**Recommended RPC:** {}\n", self.recommended_rpc);
        }
        out.push_str("**RPC providers:**\n");
        for provider in &self.rpc_statuses {
            let status = if provider.healthy {
                format!("✅ {} ms", provider.latency_ms)
            } else if !provider.last_error.is_empty() {
                format!("❌ {}", provider.last_error)
            } else {
                "❌ Down".to_string()
            };
            let _ = writeln!(out, "- {}: {}", provider.name, status);
        }
        out.push_str("\n**dApps:**\n");
        for dapp in &self.dapp_statuses {
            let status = if dapp.healthy {
                format!("✅ {} ms", dapp.latency_ms)
            } else {
                "❌ Down".to_string()
            };
            let _ = writeln!(out, "- {}: {}", dapp.name, status);
        }
        if !self.open_incidents.is_empty() {
            out.push_str("\n**Open incidents:**\n");
            for incident in &self.open_incidents {
                let _ = writeln!(
                    out,
                    "- [{}] {}: {}",
                    incident.severity, incident.entity_name, incident.summary
                );
            }
        }
        out
    }

    /// Formats the `/rpc` response.
    pub fn rpc_response(&self) -> String {
        let mut out = String::from("**RPC health**\n\n");
        if !self.recommended_rpc.is_empty() {
            let _ = writeln!(out, "**Recommended:** {}\n", self.recommended_rpc);
        }
        for provider in &self.rpc_statuses {
            let status = if provider.healthy {
                format!("✅ {} ms", provider.latency_ms)
            } else if !provider.last_error.is_empty() {
                format!("❌ {}", provider.last_error)
            } else {
                "❌".to_string()
            };
            let _ = writeln!(out, "- **{}:** {}", provider.name, status);
        }
        out
    }

    /// Formats the `/dapp <name>` response. Name matching is
    /// case-insensitive.
    pub fn dapp_response(&self, dapp_name: &str) -> String {
        let dapp_name = dapp_name.trim().to_lowercase();
        if dapp_name.is_empty() {
            return "Usage: `/dapp <name>`. Example: `/dapp aptos-explorer`.".to_string();
        }
        for dapp in &self.dapp_statuses {
            if dapp.name.to_lowercase() != dapp_name {
                continue;
            }
            let status = if dapp.healthy {
                format!("✅ Up ({} ms)", dapp.latency_ms)
            } else {
                "❌ Down".to_string()
            };
            let mut out = format!("**{}:** {}\n", dapp.name, status);
            if let Some(incident) = self.open_incidents.iter().find(|i| {
                i.entity_kind == EntityKind::Dapp && i.entity_name.eq_ignore_ascii_case(&dapp.name)
            }) {
                let _ = write!(out, "\n**Incident:** {}", incident.summary);
            }
            return out;
        }
        format!("Unknown dApp: `{}`. Known: {}.", dapp_name, self.dapp_names.join(", "))
    }

    /// Acknowledgement for a submitted report.
    pub fn report_ack(&self) -> &'static str {
        "Thanks for your report. The team will look into it. For urgent issues, post in the \
         support channel."
    }
}

/// Dispatches a slash command against a snapshot. Returns the response text
/// and whether it should only be visible to the invoking user.
pub fn run_command(
    cmd: &str,
    options: &HashMap<String, String>,
    context: &CommandContext,
) -> (String, bool) {
    match cmd {
        "status" => (context.status_response(), false),
        "rpc" => (context.rpc_response(), false),
        "dapp" => {
            (context.dapp_response(options.get("name").map(String::as_str).unwrap_or("")), false)
        }
        "fix" => {
            (fix_content(options.get("topic").map(String::as_str).unwrap_or("")).to_string(), false)
        }
        "report" => (context.report_ack().to_string(), true),
        _ => ("Unknown command.".to_string(), true),
    }
}
