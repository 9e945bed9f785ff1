use crate::exec::ExecTask;
use crate::features::feature_enabled;
use crate::logging::Logger;
use crate::plan::Plan;
use base64::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

/// Runs each tool invocation (a version check) and requires a clean exit
/// with non-empty standard output. The first failure aborts with the tool
/// name attached, before anything touches the cluster.
pub fn validate_tools(tools: &[&str], log: &Logger) -> Result<(), String> {
    for tool in tools {
        tool_gives_stdout(tool, log)?;
    }
    Ok(())
}

fn tool_gives_stdout(tool: &str, log: &Logger) -> Result<(), String> {
    let mut parts = tool.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let res = ExecTask::new(command, &args)
        .execute(log)
        .map_err(|e| format!("could not run {:?}: {}", tool, e))?;
    if !res.success() {
        return Err(format!(
            "{:?} exited with code {}, is the tool installed?",
            tool, res.exit_code
        ));
    }
    if res.stdout.is_empty() {
        return Err(format!(
            "no output from {:?}, is the tool available in PATH?",
            tool
        ));
    }
    Ok(())
}

/// Verifies that every local file referenced by a feature-relevant secret
/// exists before any destructive action is taken. File entries that declare
/// a value_command are skipped since the file can be generated later.
pub fn validate_plan(plan: &Plan) -> Result<(), String> {
    for secret in &plan.secrets {
        if !feature_enabled(&plan.features, &secret.filters) {
            continue;
        }
        for file in &secret.files {
            if !file.value_command.is_empty() {
                continue;
            }
            let path = file.expand_value_from();
            if !std::path::Path::new(&path).exists() {
                return Err(format!(
                    "file {:?} required by secret {:?} not found",
                    path, secret.name
                ));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AuthConfig {
    #[serde(default)]
    auth: String,
}

#[derive(Debug, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthConfig>,
}

/// Checks the local registry credentials file against the plan's registry:
/// the endpoint must be present and carry base64 credentials. Not needed
/// when ECR is enabled, where credentials come from the cloud provider.
pub fn validate_registry_auth(plan: &Plan) -> Result<(), String> {
    if plan.enable_ecr {
        return Ok(());
    }

    let Some(registry_secret) = plan.secrets.iter().find(|s| s.name == "registry-secret") else {
        return Ok(());
    };
    let Some(file) = registry_secret.files.first() else {
        return Ok(());
    };

    let path = file.expand_value_from();
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("reading registry credentials {:?}: {}", path, e))?;
    check_registry_config(&plan.registry, &content)
}

fn check_registry_config(endpoint: &str, content: &str) -> Result<(), String> {
    let config: DockerConfig = serde_json::from_str(content)
        .map_err(|e| format!("parsing registry credentials file: {}", e))?;

    // docker login stores Docker Hub credentials under the index URL.
    let file_endpoint = if endpoint.starts_with("docker.io") {
        "https://index.docker.io/v1/"
    } else {
        endpoint
    };

    let Some(auth_config) = config.auths.get(file_endpoint) else {
        return Err(format!(
            "registry credentials file has no entry for {:?}, run docker login first",
            endpoint
        ));
    };
    if auth_config.auth.is_empty() {
        return Err("registry credentials file has no base64 credentials, re-create it with docker login".into());
    }
    BASE64_STANDARD
        .decode(auth_config.auth.as_bytes())
        .map_err(|e| format!("registry credentials are not valid base64: {}", e))?;
    Ok(())
}
