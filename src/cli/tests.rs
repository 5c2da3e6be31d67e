//! Unit tests for CLI commands

use crate::cli::{execute, Cli, Commands};
use clap::Parser;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

fn run(args: &[&str]) -> Value {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    execute(&cli, &mut out).unwrap();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn test_route_command_parses() {
    let cli = Cli::try_parse_from(["mvcore", "route", "--uri", "/users/edit/7"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Route {
            uri: "/users/edit/7".to_string(),
            config: None,
        }
    );
}

#[test]
fn test_check_config_requires_config() {
    assert!(Cli::try_parse_from(["mvcore", "check-config"]).is_err());
}

#[test]
fn test_route_without_config() {
    let report = run(&["mvcore", "route", "--uri", "/users/edit/7"]);
    assert_eq!(report["controller"], "users");
    assert_eq!(report["action"], "edit");
    assert_eq!(report["params"], serde_json::json!(["7"]));
    assert_eq!(report["controller_key"], "UsersController");
    assert_eq!(report["action_method"], "editAction");
    assert!(report["module"].is_null());
}

#[test]
fn test_route_with_module_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "app:\n  default_namespace: shop\nmodules:\n  admin:\n    path: /nonexistent\n    class_name: Admin"
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let report = run(&["mvcore", "route", "--uri", "/admin/users", "--config", &path]);
    assert_eq!(report["module"], "admin");
    assert_eq!(report["controller"], "users");
    assert_eq!(report["action"], "index");
    assert_eq!(report["controller_key"], "shop::UsersController");
}

#[test]
fn test_check_config_redacts_password() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "database:\n  host: db\n  username: app\n  password: hunter2\n  db: shop"
    )
    .unwrap();
    let cli = Cli {
        command: Commands::CheckConfig {
            config: PathBuf::from(file.path()),
        },
    };
    let mut out = Vec::new();
    execute(&cli, &mut out).unwrap();
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["database"]["dsn"], "mongodb://app:****@db");
    assert_eq!(report["database"]["db"], "shop");
    assert_eq!(report["cookie_encryption"], false);
    assert_eq!(report["logging"]["level"], "INFO");
    assert_eq!(report["logging"]["format"], "json");
}

#[test]
fn test_check_config_missing_file() {
    let cli = Cli {
        command: Commands::CheckConfig {
            config: PathBuf::from("/definitely/not/here.yaml"),
        },
    };
    let mut out = Vec::new();
    assert!(execute(&cli, &mut out).is_err());
}
