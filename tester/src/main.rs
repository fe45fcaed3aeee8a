use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use clap::Parser;
use registry::Nupcan;
use serde::Deserialize;
use serde_json::json;

/// Fires concurrent registrations and checks the issued numbers.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:1111")]
    url: String,

    #[arg(long, default_value_t = 50)]
    count: usize,
}

#[derive(Deserialize)]
struct Registered {
    nupcan: Nupcan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/registrations", args.url.trim_end_matches('/'));

    let handles: Vec<_> = (0..args.count)
        .map(|i| {
            let client = client.clone();
            let endpoint = endpoint.clone();

            tokio::spawn(async move {
                let body = json!({
                    "name": format!("Tester {i}"),
                    "email": format!("tester{i}@example.ga"),
                    "examName": "Smoke Test",
                });

                client
                    .post(&endpoint)
                    .json(&body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Registered>()
                    .await
            })
        })
        .collect();

    let mut issued = Vec::with_capacity(args.count);
    for handle in handles {
        let registered = handle.await?.context("Registration failed")?;
        issued.push(registered.nupcan);
    }

    let sequences: BTreeSet<u64> = issued.iter().map(|nupcan| nupcan.sequence).collect();
    println!("Issued: {}", issued.len());
    println!("Distinct: {}", sequences.len());

    if sequences.len() != issued.len() {
        bail!("Duplicate NUPCANs issued");
    }

    if let (Some(first), Some(last)) = (sequences.first(), sequences.last()) {
        let contiguous = last - first + 1 == sequences.len() as u64;
        println!("Range: {first}..={last} (contiguous: {contiguous})");
    }

    Ok(())
}
