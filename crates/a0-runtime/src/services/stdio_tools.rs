//! The four built-in tools: `fs.read`, `fs.write`, `http.get`, `sh.exec`.
//! Each validates its own argument record at call time — argument *shape*
//! is a runtime concern, never statically checked.

use crate::tools::ToolExecutor;
use a0_core::Value;
use a0_diagnostics::{Diagnostic, ErrorCode};
use std::io::Read as _;
use std::process::Command;
use std::time::Duration;

fn require_str(args: &Value, field: &str) -> Result<String, Diagnostic> {
    args.as_record()
        .and_then(|r| r.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Diagnostic::error(
                ErrorCode::EToolArgs,
                format!("expected a string field `{field}`"),
                None,
            )
        })
}

fn optional_list_of_str(args: &Value, field: &str) -> Vec<String> {
    args.as_record()
        .and_then(|r| r.get(field))
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

pub struct FsReadTool;

impl ToolExecutor for FsReadTool {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
        let path = require_str(args, "path")?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Diagnostic::error(ErrorCode::EIo, format!("fs.read {path}: {e}"), None)
        })?;
        Ok(Value::record(vec![
            ("content".to_string(), Value::String(content.clone())),
            ("bytes".to_string(), Value::Number(content.len() as f64)),
        ]))
    }
}

pub struct FsWriteTool;

impl ToolExecutor for FsWriteTool {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
        let path = require_str(args, "path")?;
        let content = require_str(args, "content")?;
        std::fs::write(&path, &content).map_err(|e| {
            Diagnostic::error(ErrorCode::EIo, format!("fs.write {path}: {e}"), None)
        })?;
        Ok(Value::record(vec![(
            "bytesWritten".to_string(),
            Value::Number(content.len() as f64),
        )]))
    }
}

pub struct HttpGetTool;

impl ToolExecutor for HttpGetTool {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
        let url = require_str(args, "url")?;
        let mut request = ureq::get(&url).timeout(Duration::from_secs(30));
        if let Some(Value::Record(headers)) = args.as_record().and_then(|r| r.get("headers")) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.set(key, v);
                }
            }
        }
        let response = request
            .call()
            .map_err(|e| Diagnostic::error(ErrorCode::ETool, format!("http.get {url}: {e}"), None))?;
        let status = response.status();
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| Diagnostic::error(ErrorCode::EIo, format!("http.get {url}: {e}"), None))?;
        Ok(Value::record(vec![
            ("status".to_string(), Value::Number(status as f64)),
            ("body".to_string(), Value::String(body)),
        ]))
    }
}

pub struct ShExecTool;

impl ToolExecutor for ShExecTool {
    fn execute(&self, args: &Value) -> Result<Value, Diagnostic> {
        let cmd = require_str(args, "cmd")?;
        let argv = optional_list_of_str(args, "args");
        let output = Command::new(&cmd).args(&argv).output().map_err(|e| {
            Diagnostic::error(ErrorCode::ETool, format!("sh.exec {cmd}: {e}"), None)
        })?;
        Ok(Value::record(vec![
            (
                "stdout".to_string(),
                Value::String(String::from_utf8_lossy(&output.stdout).into_owned()),
            ),
            (
                "stderr".to_string(),
                Value::String(String::from_utf8_lossy(&output.stderr).into_owned()),
            ),
            (
                "exitCode".to_string(),
                Value::Number(output.status.code().unwrap_or(-1) as f64),
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fs_write_then_fs_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_str = path.to_str().unwrap().to_string();

        let write_args = Value::record(vec![
            ("path".to_string(), Value::String(path_str.clone())),
            ("content".to_string(), Value::String("hello".to_string())),
        ]);
        let write_result = FsWriteTool.execute(&write_args).unwrap();
        assert_eq!(
            write_result.as_record().unwrap().get("bytesWritten"),
            Some(&Value::Number(5.0))
        );

        let read_args = Value::record(vec![("path".to_string(), Value::String(path_str))]);
        let read_result = FsReadTool.execute(&read_args).unwrap();
        assert_eq!(
            read_result.as_record().unwrap().get("content"),
            Some(&Value::String("hello".to_string()))
        );
    }

    #[test]
    fn fs_read_missing_path_argument_is_tool_args_error() {
        let err = FsReadTool.execute(&Value::Null).unwrap_err();
        assert_eq!(err.code, ErrorCode::EToolArgs);
    }

    #[test]
    fn sh_exec_runs_and_captures_exit_code() {
        let args = Value::record(vec![
            ("cmd".to_string(), Value::String("true".to_string())),
            ("args".to_string(), Value::List(vec![])),
        ]);
        let result = ShExecTool.execute(&args).unwrap();
        assert_eq!(
            result.as_record().unwrap().get("exitCode"),
            Some(&Value::Number(0.0))
        );
    }
}
