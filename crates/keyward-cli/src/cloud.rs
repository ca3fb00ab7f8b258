//! API-backed commands: projects, keys, attestation, billing, account.
//!
//! Projects are addressed by id or name; names are resolved through the
//! shared [`ProjectStore`] so a command issues at most one list request.

use anyhow::{Context, Result, bail};

use keyward_client::{Keyward, ProjectStore};
use keyward_core::models::{
    CreateKeyRequest, CreateProjectRequest, Project, UpdateDeviceCheck, UpdatePlayIntegrity,
};

use super::{
    AttestationCommands, BOLD, BillingCommands, CYAN, DIM, DeviceCheckCommands, GREEN,
    KeyCommands, PlayIntegrityCommands, ProjectCommands, RESET, YELLOW, flow, header, kv_line,
    success, warning, yes_no,
};

async fn resolve(store: &ProjectStore, id_or_name: &str) -> Result<Project> {
    store
        .find(id_or_name)
        .await?
        .with_context(|| format!("no project matches '{id_or_name}'"))
}

fn limit_label(limit: u32) -> String {
    if limit == u32::MAX {
        "unlimited".to_owned()
    } else {
        limit.to_string()
    }
}

// ── Projects ─────────────────────────────────────────────────────────

/// `keyward projects …`
pub async fn cmd_projects(store: &ProjectStore, action: ProjectCommands) -> Result<()> {
    match action {
        ProjectCommands::List => {
            let projects = store.projects().await?;

            println!();
            header("📁", "Projects");
            println!();
            if projects.is_empty() {
                println!("  {DIM}(no projects){RESET}");
            }
            for p in &projects {
                println!(
                    "  {CYAN}●{RESET} {BOLD}{}{RESET} {DIM}({} keys){RESET}",
                    p.name, p.key_count
                );
                println!("    {DIM}{}{RESET}", p.id);
            }
            println!();
            Ok(())
        }
        ProjectCommands::Create { name, description } => {
            let req = CreateProjectRequest { name, description };
            let project = store.create_project(&req).await?;
            success(&format!("Created project {BOLD}{}{RESET}", project.name));
            kv_line("Id", &project.id.to_string());
            Ok(())
        }
        ProjectCommands::Delete { project } => {
            let project = resolve(store, &project).await?;
            store.delete_project(project.id).await?;
            success(&format!(
                "Deleted project {BOLD}{}{RESET} and its {} keys",
                project.name, project.key_count
            ));
            Ok(())
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────

/// `keyward keys …`
pub async fn cmd_keys(store: &ProjectStore, action: KeyCommands) -> Result<()> {
    match action {
        KeyCommands::List { project } => {
            let project = resolve(store, &project).await?;
            let keys = store.client().list_keys(project.id).await?;

            println!();
            header("🔑", &format!("Keys — {}", project.name));
            println!();
            if keys.is_empty() {
                println!("  {DIM}(no keys){RESET}");
            }
            for k in &keys {
                let web = if k.allows_web {
                    format!(" {YELLOW}web{RESET}")
                } else {
                    String::new()
                };
                println!(
                    "  {CYAN}├─{RESET} {BOLD}{}{RESET} {DIM}{}{RESET}{web}",
                    k.name, k.partial_key
                );
                let rate = k
                    .rate_limit
                    .get()
                    .map_or_else(|| "no rate limit".to_owned(), |n| format!("{n} req/min"));
                println!(
                    "  {CYAN}│{RESET}  {DIM}{} · {rate} · {}{RESET}",
                    k.id,
                    k.whitelisted_urls.join(", ")
                );
            }
            println!();
            Ok(())
        }
        KeyCommands::Create {
            project,
            from_url,
            fields,
        } => {
            let source = from_url.as_deref().unwrap_or_default();
            let resumed = keyward_core::resume(source);
            let intent = flow::merge_overrides(resumed.intent, &fields.to_draft());
            if !intent.has_content() {
                bail!("nothing to create: pass --from-url or key fields such as --name and --key");
            }
            let req = CreateKeyRequest::try_from(intent).context("incomplete key")?;

            let target = project.or_else(|| {
                flow::project_from_url(source).map(|id| id.to_string())
            });
            let Some(target) = target else {
                bail!("no project given and none found in --from-url");
            };
            let project = resolve(store, &target).await?;

            let key = store.client().create_key(project.id, &req).await?;
            store.invalidate().await;

            success(&format!(
                "Created key {BOLD}{}{RESET} in {BOLD}{}{RESET}",
                key.name, project.name
            ));
            kv_line("Id", &key.id.to_string());
            kv_line("Key", &key.partial_key);
            kv_line("Allows web", &yes_no(key.allows_web));
            kv_line("Whitelisted URLs", &key.whitelisted_urls.join(", "));
            kv_line("Rate limit", &key.rate_limit.to_string());
            Ok(())
        }
        KeyCommands::Delete { project, key_id } => {
            let project = resolve(store, &project).await?;
            store.client().delete_key(project.id, key_id).await?;
            store.invalidate().await;
            success(&format!("Deleted key {key_id}"));
            Ok(())
        }
    }
}

// ── Attestation ──────────────────────────────────────────────────────

/// `keyward attestation …`
pub async fn cmd_attestation(store: &ProjectStore, action: AttestationCommands) -> Result<()> {
    match action {
        AttestationCommands::DeviceCheck { action } => device_check(store, action).await,
        AttestationCommands::PlayIntegrity { action } => play_integrity(store, action).await,
    }
}

async fn device_check(store: &ProjectStore, action: DeviceCheckCommands) -> Result<()> {
    match action {
        DeviceCheckCommands::Get { project } => {
            let project = resolve(store, &project).await?;
            let settings = store.client().get_device_check(project.id).await?;

            println!();
            header("🍎", &format!("DeviceCheck — {}", project.name));
            println!();
            match settings {
                Some(s) => {
                    kv_line("Enabled", &yes_no(s.enabled));
                    kv_line("Team id", &s.team_id);
                    kv_line("Key id", &s.key_id);
                    kv_line("Bundle ids", &s.bundle_ids.join(", "));
                }
                None => println!("  {DIM}(not configured){RESET}"),
            }
            println!();
            Ok(())
        }
        DeviceCheckCommands::Set {
            project,
            team_id,
            key_id,
            private_key_file,
            bundle_ids,
            disabled,
        } => {
            let private_key = std::fs::read_to_string(&private_key_file)
                .with_context(|| format!("failed to read {private_key_file}"))?;
            let req = UpdateDeviceCheck {
                team_id,
                key_id,
                private_key,
                bundle_ids,
                enabled: !disabled,
            };
            req.validate()?;
            if req.bundle_ids.is_empty() {
                warning("no --bundle-id given; requests from any app will be accepted");
            }

            let project = resolve(store, &project).await?;
            let settings = store.client().put_device_check(project.id, &req).await?;
            success(&format!("DeviceCheck updated for {BOLD}{}{RESET}", project.name));
            kv_line("Enabled", &yes_no(settings.enabled));
            Ok(())
        }
    }
}

async fn play_integrity(store: &ProjectStore, action: PlayIntegrityCommands) -> Result<()> {
    match action {
        PlayIntegrityCommands::Get { project } => {
            let project = resolve(store, &project).await?;
            let settings = store.client().get_play_integrity(project.id).await?;

            println!();
            header("🤖", &format!("Play Integrity — {}", project.name));
            println!();
            match settings {
                Some(s) => {
                    kv_line("Enabled", &yes_no(s.enabled));
                    kv_line("Package", &s.package_name);
                    kv_line("Service account", &yes_no(s.has_service_account));
                }
                None => println!("  {DIM}(not configured){RESET}"),
            }
            println!();
            Ok(())
        }
        PlayIntegrityCommands::Set {
            project,
            package,
            service_account,
            disabled,
        } => {
            let service_account_json = std::fs::read_to_string(&service_account)
                .with_context(|| format!("failed to read {service_account}"))?;
            let req = UpdatePlayIntegrity {
                package_name: package,
                service_account_json,
                enabled: !disabled,
            };
            req.validate()?;

            let project = resolve(store, &project).await?;
            let settings = store.client().put_play_integrity(project.id, &req).await?;
            success(&format!("Play Integrity updated for {BOLD}{}{RESET}", project.name));
            kv_line("Enabled", &yes_no(settings.enabled));
            Ok(())
        }
    }
}

// ── Billing and account ──────────────────────────────────────────────

/// `keyward billing status`
pub async fn cmd_billing(client: &Keyward, action: &BillingCommands) -> Result<()> {
    match action {
        BillingCommands::Status => {
            let sub = client.subscription().await?;
            let projects = client.list_projects().await?;
            let tier = sub.effective_tier();

            println!();
            header("💳", "Subscription");
            println!();
            kv_line("Tier", &sub.tier.to_string());
            kv_line("Status", &sub.status.to_string());
            if tier != sub.tier {
                kv_line("Limits applied", &format!("{YELLOW}{tier}{RESET}"));
            }
            if let Some(end) = sub.current_period_end {
                let label = if sub.cancel_at_period_end {
                    "Ends"
                } else {
                    "Renews"
                };
                kv_line(label, &end.format("%Y-%m-%d").to_string());
            }
            kv_line(
                "Projects",
                &format!("{} / {}", projects.len(), limit_label(tier.max_projects())),
            );
            kv_line("Keys per project", &limit_label(tier.max_keys_per_project()));
            println!();
            Ok(())
        }
    }
}

/// `keyward whoami`
pub async fn cmd_whoami(client: &Keyward) -> Result<()> {
    let user = client.me().await?;
    println!();
    header("👤", "Signed in");
    println!();
    if !user.name.is_empty() {
        kv_line("Name", &user.name);
    }
    kv_line("Email", &user.email);
    kv_line("Id", &user.id);
    kv_line("API", &format!("{GREEN}{}{RESET}", client.base_url()));
    println!();
    Ok(())
}
