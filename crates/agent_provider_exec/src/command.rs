use std::collections::BTreeMap;
use std::ffi::OsString;
use std::process::Stdio;

use agent_provider::{config_overrides, TurnArguments};
use tokio::process::Command;

use crate::ExecConfig;

pub const ORIGINATOR_OVERRIDE_ENV: &str = "CODEX_INTERNAL_ORIGINATOR_OVERRIDE";
pub const DEFAULT_ORIGINATOR: &str = "codex_sdk_rs";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const API_KEY_ENV: &str = "CODEX_API_KEY";

/// Argument vector for one `codex exec` invocation, in the order the CLI expects.
pub fn build_exec_args(args: &TurnArguments) -> Vec<OsString> {
    let options = &args.options;
    let mut argv: Vec<OsString> = vec!["exec".into(), "--experimental-json".into()];

    if let Some(model) = &options.model {
        argv.push("--model".into());
        argv.push(model.into());
    }
    if let Some(mode) = options.sandbox_mode {
        argv.push("--sandbox".into());
        argv.push(mode.as_str().into());
    }
    if let Some(dir) = &options.working_directory {
        argv.push("--cd".into());
        argv.push(dir.into());
    }
    for dir in &options.additional_directories {
        argv.push("--add-dir".into());
        argv.push(dir.into());
    }
    if options.skip_git_repo_check {
        argv.push("--skip-git-repo-check".into());
    }
    if let Some(schema) = &args.output_schema_file {
        argv.push("--output-schema".into());
        argv.push(schema.into());
    }
    for entry in config_overrides(options) {
        argv.push("--config".into());
        argv.push(entry.to_cli_arg().into());
    }
    for image in &args.images {
        argv.push("--image".into());
        argv.push(image.into());
    }
    if let Some(thread_id) = &args.thread_id {
        argv.push("resume".into());
        argv.push(thread_id.into());
    }

    argv
}

/// Variables layered over the child's base environment.
///
/// The originator is only defaulted when neither the configured map nor, absent
/// one, the inherited environment already carries it.
pub fn exec_environment(config: &ExecConfig, args: &TurnArguments) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    let originator_set = match &config.env {
        Some(env) => env.contains_key(ORIGINATOR_OVERRIDE_ENV),
        None => std::env::var_os(ORIGINATOR_OVERRIDE_ENV).is_some(),
    };
    if !originator_set {
        vars.insert(
            ORIGINATOR_OVERRIDE_ENV.to_owned(),
            DEFAULT_ORIGINATOR.to_owned(),
        );
    }

    if let Some(base_url) = config.base_url.as_deref().filter(|value| !value.trim().is_empty()) {
        vars.insert(BASE_URL_ENV.to_owned(), base_url.to_owned());
    }
    if let Some(api_key) = args
        .api_key
        .as_deref()
        .or(config.api_key.as_deref())
        .filter(|value| !value.trim().is_empty())
    {
        vars.insert(API_KEY_ENV.to_owned(), api_key.to_owned());
    }

    vars
}

/// Fully configured child command with piped stdio.
pub fn build_command(config: &ExecConfig, args: &TurnArguments) -> Command {
    let mut command = Command::new(&config.executable);
    command.args(build_exec_args(args));

    if let Some(env) = &config.env {
        command.env_clear();
        command.envs(env);
    }
    command.envs(exec_environment(config, args));

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use agent_provider::{ApprovalMode, SandboxMode, ThreadOptions};
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(argv: Vec<OsString>) -> Vec<String> {
        argv.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn minimal_invocation() {
        let args = TurnArguments::new("hi");
        assert_eq!(
            strings(build_exec_args(&args)),
            vec!["exec", "--experimental-json"]
        );
    }

    #[test]
    fn full_invocation_keeps_flag_order() {
        let mut args = TurnArguments::new("hi");
        args.thread_id = Some("thread-9".to_owned());
        args.images = vec![PathBuf::from("/tmp/a.png"), PathBuf::from("/tmp/b.png")];
        args.output_schema_file = Some(PathBuf::from("/tmp/schema.json"));
        args.options = ThreadOptions::default()
            .with_model("gpt-test")
            .with_sandbox_mode(SandboxMode::WorkspaceWrite)
            .with_working_directory("/work")
            .with_additional_directory("/extra")
            .skip_git_repo_check(true)
            .with_network_access(true)
            .with_approval_policy(ApprovalMode::Never);

        assert_eq!(
            strings(build_exec_args(&args)),
            vec![
                "exec",
                "--experimental-json",
                "--model",
                "gpt-test",
                "--sandbox",
                "workspace-write",
                "--cd",
                "/work",
                "--add-dir",
                "/extra",
                "--skip-git-repo-check",
                "--output-schema",
                "/tmp/schema.json",
                "--config",
                "sandbox_workspace_write.network_access=true",
                "--config",
                "approval_policy=\"never\"",
                "--image",
                "/tmp/a.png",
                "--image",
                "/tmp/b.png",
                "resume",
                "thread-9",
            ]
        );
    }

    #[test]
    fn environment_defaults_originator_and_forwards_credentials() {
        let config = ExecConfig {
            env: Some(BTreeMap::new()),
            base_url: Some("http://proxy.local".to_owned()),
            api_key: Some("config-key".to_owned()),
            ..ExecConfig::default()
        };
        let mut args = TurnArguments::new("hi");
        args.api_key = Some("turn-key".to_owned());

        let vars = exec_environment(&config, &args);
        assert_eq!(
            vars.get(ORIGINATOR_OVERRIDE_ENV).map(String::as_str),
            Some(DEFAULT_ORIGINATOR)
        );
        assert_eq!(
            vars.get(BASE_URL_ENV).map(String::as_str),
            Some("http://proxy.local")
        );
        assert_eq!(vars.get(API_KEY_ENV).map(String::as_str), Some("turn-key"));
    }

    #[test]
    fn configured_originator_is_left_alone() {
        let config = ExecConfig {
            env: Some(BTreeMap::from([(
                ORIGINATOR_OVERRIDE_ENV.to_owned(),
                "custom".to_owned(),
            )])),
            ..ExecConfig::default()
        };

        let vars = exec_environment(&config, &TurnArguments::new("hi"));
        assert!(!vars.contains_key(ORIGINATOR_OVERRIDE_ENV));
        assert!(!vars.contains_key(BASE_URL_ENV));
        assert!(!vars.contains_key(API_KEY_ENV));
    }
}
