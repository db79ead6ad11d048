// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::io;
use std::process::ExitCode;
use tee_verifier::nitro::SignedAttestation;
use tee_verifier::policy::{ResponseDigest, ValidateOptions};
use tee_verifier::report::{Report, Response};
use tee_verifier::transport;
use tracing_subscriber::EnvFilter;

const NONCE_HEADER: &str = "x-attestation-nonce";
const DOCUMENT_HEADER: &str = "x-attestation-document";

#[derive(Debug, Parser)]
#[command(author, version, long_about = None,
    about = "Verify the supplied Nitro attestation document: signature, \
    certificate chain against the pinned AWS root, and optionally PCR0, nonce \
    and response binding")]
struct VerifyArgs {
    /// Base64 attestation document: a file, "-" for standard input, or an
    /// http(s) URL returning it in the x-attestation-document header
    input: String,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Expected PCR0 value (hex)
    #[arg(long)]
    pcr0: Option<String>,

    /// Expected nonce, also sent to the server in the x-attestation-nonce header
    #[arg(long)]
    nonce: Option<String>,

    /// HTTP POST data
    #[arg(short, long)]
    data: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = VerifyArgs::parse();

    match verify(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn verify(args: &VerifyArgs) -> Result<bool, Box<dyn Error>> {
    let nonce = non_empty(&args.nonce);

    let (doc, response) = if args.input.starts_with("http") {
        let (doc, resp) = fetch_from_url(&args.input, nonce, non_empty(&args.data))
            .map_err(|e| format!("failed to read attestation from URL: {e}"))?;
        (doc, Some(resp))
    } else if args.input == "-" {
        let doc = io::read_to_string(io::stdin())
            .map_err(|e| format!("failed to read attestation from stdin: {e}"))?;
        (doc, None)
    } else {
        let doc = fs::read_to_string(&args.input)
            .map_err(|e| format!("failed to read attestation from file: {e}"))?;
        (doc, None)
    };

    let buf = transport::decode_document(&doc)
        .map_err(|e| format!("failed to decode attestation document: {e}"))?;

    let att = SignedAttestation::parse(&buf)
        .map_err(|e| format!("failed to parse attestation document: {e}"))?;

    let mut opts = ValidateOptions::new();
    if let Some(pcr0) = non_empty(&args.pcr0) {
        opts = opts.with_expected_pcrs(BTreeMap::from([(0, pcr0)]));
    }
    if let Some(n) = nonce {
        opts = opts.with_expected_nonce(n.as_bytes());
    }

    let report = Report::from_attestation(&att, response.as_ref(), &opts);

    let stdout = io::stdout().lock();
    if args.json {
        report.write_json(stdout)?;
    } else {
        report.write_table(stdout)?;
    }

    Ok(report.is_valid())
}

fn fetch_from_url(
    url: &str,
    nonce: Option<&str>,
    data: Option<&str>,
) -> Result<(String, Response), Box<dyn Error>> {
    let url = reqwest::Url::parse(url)?;
    let path = request_path(&url)?;

    let client = reqwest::blocking::Client::new();

    let (method, mut req) = match data {
        Some(d) => (
            "POST",
            client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(d.to_string()),
        ),
        None => ("GET", client.get(url.clone())),
    };

    if let Some(n) = nonce {
        req = req.header(NONCE_HEADER, n);
    }

    tracing::debug!(method, %url, "fetching attestation document");

    let resp = req.send()?;
    let status = resp.status().as_u16();

    let doc = document_header(resp.headers())?;

    let body = resp.bytes()?;

    let digest = ResponseDigest::compute(method, &path, data.map(str::as_bytes), &body);

    Ok((
        doc,
        Response {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
            digest,
        },
    ))
}

// The server binds the decoded path of the request line it received, which
// is "/" for a bare host.
fn request_path(url: &reqwest::Url) -> Result<String, Box<dyn Error>> {
    Ok(urlencoding::decode(url.path())?.into_owned())
}

fn document_header(headers: &HeaderMap) -> Result<String, Box<dyn Error>> {
    let doc = headers
        .get(DOCUMENT_HEADER)
        .filter(|v| !v.is_empty())
        .ok_or("no attestation document found")?
        .to_str()?;

    Ok(doc.to_string())
}
