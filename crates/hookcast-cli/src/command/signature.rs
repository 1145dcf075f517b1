use anyhow::{Context, bail};
use hookcast_webhook::{WebhookSecret, WebhookSigner};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use super::print_json;
use crate::TRACING_TARGET_COMMAND;
use crate::config::{InputArgs, SignArgs, VerifyArgs};

#[derive(Debug, Serialize)]
struct SignatureReport {
    signature: String,
    payload_size: usize,
}

#[derive(Debug, Serialize)]
struct VerificationReport {
    valid: bool,
    payload_size: usize,
}

pub async fn sign(args: &SignArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.input).await?;
    let signer = WebhookSigner::new(WebhookSecret::new(args.input.secret.as_str()));

    print_json(&SignatureReport {
        signature: signer.sign(&payload),
        payload_size: payload.len(),
    })
}

pub async fn verify(args: &VerifyArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args.input).await?;
    let signer = WebhookSigner::new(WebhookSecret::new(args.input.secret.as_str()));
    let valid = signer.verify(&payload, args.signature.trim());

    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        valid,
        payload_size = payload.len(),
        "Verified payload signature"
    );

    print_json(&VerificationReport {
        valid,
        payload_size: payload.len(),
    })?;

    if !valid {
        bail!("signature does not match payload");
    }
    Ok(())
}

/// Reads the payload bytes from the given file, or stdin.
async fn read_payload(input: &InputArgs) -> anyhow::Result<Vec<u8>> {
    match &input.file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read payload from {}", path.display())),
        None => {
            let mut payload = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut payload)
                .await
                .context("failed to read payload from stdin")?;
            Ok(payload)
        }
    }
}
