//! Credential CLI commands: list, history, revoke.
//!
//! Output is metadata only; no command prints a decrypted credential.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use credsync_types::credential::{CredentialMetadata, CredentialType};

use crate::state::AppState;

/// List credential metadata for a tenant.
pub async fn list_credentials(state: &AppState, tenant: &str, json: bool) -> Result<()> {
    let records = state.vault.list(tenant).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!(
            "  {} No credentials stored for tenant '{}'.",
            style("i").blue().bold(),
            style(tenant).bold()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", metadata_table(&records));
    println!();
    let active = records.iter().filter(|r| r.is_active).count();
    println!(
        "  {} active, {} total",
        style(active).bold(),
        style(records.len()).bold()
    );
    println!();

    Ok(())
}

/// Every stored version of one credential type, newest first.
pub async fn credential_history(
    state: &AppState,
    tenant: &str,
    credential_type: CredentialType,
    json: bool,
) -> Result<()> {
    let history = state.vault.history(tenant, credential_type).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!();
        println!(
            "  {} No {} credentials for tenant '{}'.",
            style("i").blue().bold(),
            style(credential_type).cyan(),
            style(tenant).bold()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", metadata_table(&history));
    println!();
    Ok(())
}

/// Revoke the active credential of one type. Succeeds when nothing was active.
pub async fn revoke_credential(
    state: &AppState,
    tenant: &str,
    credential_type: CredentialType,
    json: bool,
) -> Result<()> {
    let revoked = state.vault.revoke(tenant, credential_type).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "tenant_id": tenant,
                "credential_type": credential_type,
                "revoked": revoked,
            })
        );
    } else if revoked {
        println!(
            "  {} Revoked {} for tenant '{}'",
            style("✓").green().bold(),
            style(credential_type).cyan(),
            style(tenant).bold()
        );
    } else {
        println!(
            "  {} No active {} for tenant '{}'",
            style("i").blue().bold(),
            style(credential_type).cyan(),
            style(tenant).bold()
        );
    }

    Ok(())
}

fn metadata_table(records: &[CredentialMetadata]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Type").fg(Color::White),
        Cell::new("Active").fg(Color::White),
        Cell::new("Description").fg(Color::White),
        Cell::new("Rotated").fg(Color::White),
        Cell::new("Expires").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    for record in records {
        let active = if record.is_active {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(record.credential_type.to_string()).fg(Color::Cyan),
            active,
            Cell::new(&record.description),
            Cell::new(date(record.last_rotated_at)),
            Cell::new(date(record.expires_at)),
            Cell::new(record.updated_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }

    table
}
