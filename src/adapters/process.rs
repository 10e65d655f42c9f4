use crate::utils::error::{OcrError, Result};
use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// stderr 保留的最大字元數，避免把整份工具輸出塞進錯誤訊息
const MAX_STDERR_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 執行外部命令；非零結束碼、找不到執行檔、逾時皆回傳錯誤。
///
/// 逾時時 future 被丟棄，子行程因 `kill_on_drop` 被終止。
pub async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    tracing::debug!("▶️ {} {}", program, render_args(&args));

    let started = Instant::now();
    let child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OcrError::ToolNotFound {
                program: program.to_string(),
            },
            _ => OcrError::IoError(e),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!("⏱️ {} timed out after {:?}", program, timeout);
            return Err(OcrError::ToolTimeout {
                program: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::debug!(
        "{} finished with {} in {:?}",
        program,
        output.status,
        started.elapsed()
    );

    if !output.status.success() {
        return Err(OcrError::ToolFailed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: truncate_tail(stderr.trim(), MAX_STDERR_CHARS),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// 把參數串成可讀的命令列（dry run 與 debug 日誌用）
pub fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| {
            let s = a.to_string_lossy();
            if s.is_empty() || s.contains(char::is_whitespace) {
                format!("'{}'", s)
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max_chars).collect();
    format!("...{}", tail)
}
