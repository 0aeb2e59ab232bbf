//! HTML to PDF conversion through an external command.
//!
//! The command reads HTML on stdin and writes the PDF on stdout, which is how
//! `weasyprint - -` behaves.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::{io::AsyncWriteExt, process::Command};

pub async fn html_to_pdf(command: &[String], html: &str) -> Result<Vec<u8>> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("no PDF converter configured"))?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("cannot run the PDF converter {program:?}"))?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("no stdin for {program:?}"))?;
    // Feed stdin while stdout is drained, the converter may not buffer the whole input.
    let html = html.to_string();
    let writer = tokio::spawn(async move {
        stdin.write_all(html.as_bytes()).await?;
        stdin.shutdown().await
    });
    let output = child.wait_with_output().await?;
    writer.await??;
    if !output.status.success() {
        return Err(anyhow!(
            "PDF converter {program:?} exited with status {}",
            output.status
        ));
    }
    Ok(output.stdout)
}
