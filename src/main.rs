// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use clap::Parser;
use mdoctrust::asn1::{self, TimeFormat};
use mdoctrust::mso::IssuerAuth;
use mdoctrust::store::MemoTrustAnchorStore;
use mdoctrust::trust::{TrustManager, TrustResult};
use mdoctrust::vical::SignedVical;
use std::error::Error;
use std::fs;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about = "mdoc trust layer tools", long_about = None)]
struct MdocTrustCli {
    /// Log chain building and signature checks
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    Vical(VicalArgs),
    Mso(MsoArgs),
    Time(TimeArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Authenticate the supplied signed VICAL and list its issuers, \
    optionally checking the provider chain against trusted roots")]
struct VicalArgs {
    #[arg(short = 'i', long, default_value = "vical.cbor")]
    vical: String,

    /// PEM bundle of trusted roots
    #[arg(short, long, conflicts_with = "tastore")]
    roots: Option<String>,

    /// JSON trust anchor store
    #[arg(short, long)]
    tastore: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the supplied issuerAuth and print its Mobile Security \
    Object, optionally checking the document signer chain against trusted \
    roots")]
struct MsoArgs {
    #[arg(short, long, default_value = "issuerauth.cbor")]
    issuer_auth: String,

    /// PEM bundle of trusted roots
    #[arg(short, long)]
    roots: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Convert between ASN.1 time strings and RFC 3339")]
struct TimeArgs {
    /// UTCTime or GeneralizedTime string
    #[arg(short, long, conflicts_with = "encode_now")]
    decode: Option<String>,

    /// Print the current time in ASN.1 form
    #[arg(short, long)]
    encode_now: bool,

    /// Use UTCTime instead of GeneralizedTime with --encode-now
    #[arg(short, long, requires = "encode_now")]
    utc: bool,
}

fn main() {
    let cli = MdocTrustCli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("logging disabled: {e}");
    }

    match cli.command {
        Command::Vical(args) => match vical(&args) {
            Ok(()) => println!("VICAL verification successful"),
            Err(e) => eprintln!("VICAL verification failed: {e}"),
        },

        Command::Mso(args) => match mso(&args) {
            Ok(()) => println!("issuerAuth verification successful"),
            Err(e) => eprintln!("issuerAuth verification failed: {e}"),
        },

        Command::Time(args) => {
            if let Err(e) = time(&args) {
                eprintln!("time conversion failed: {e}")
            }
        }
    }
}

fn trust_manager(
    roots: Option<&str>,
    tastore: Option<&str>,
) -> Result<Option<TrustManager>, Box<dyn Error>> {
    let store = MemoTrustAnchorStore::new();

    match (roots, tastore) {
        (Some(pem), _) => store.load_pem(&fs::read_to_string(pem)?)?,
        (None, Some(j)) => store.load_json(&fs::read_to_string(j)?)?,
        (None, None) => return Ok(None),
    }

    Ok(Some(TrustManager::new(store)))
}

fn report_trust(r: &TrustResult) -> Result<(), Box<dyn Error>> {
    for (i, c) in r.trust_chain.iter().enumerate() {
        println!("  [{i}] {}", c.subject());
    }

    match &r.error {
        None => Ok(()),
        Some(e) => Err(format!("untrusted chain: {e}").into()),
    }
}

fn vical(args: &VicalArgs) -> Result<(), Box<dyn Error>> {
    let tm = trust_manager(args.roots.as_deref(), args.tastore.as_deref())?;

    let buf = fs::read(&args.vical)?;
    let sv = SignedVical::parse(&buf)?;
    let v = &sv.vical;

    println!("provider: {} (version {})", v.provider, v.version);
    println!("date: {}", v.date.to_rfc3339());
    if let Some(t) = &v.next_update {
        println!("next update: {}", t.to_rfc3339());
    }
    if let Some(id) = v.issue_id {
        println!("issue id: {id}");
    }

    for info in v.certificate_infos.iter() {
        let doc_types: Vec<&str> = info.doc_types.iter().map(String::as_str).collect();
        let c = mdoctrust::store::Certificate::from_der(&info.certificate)?;

        println!("- {} [{}]", c.subject(), doc_types.join(", "));
    }

    if let Some(tm) = tm {
        println!("provider chain:");
        report_trust(&tm.verify(&sv.provider_chain, &[]))?;
    }

    Ok(())
}

fn mso(args: &MsoArgs) -> Result<(), Box<dyn Error>> {
    let tm = trust_manager(args.roots.as_deref(), None)?;

    let buf = fs::read(&args.issuer_auth)?;
    let ia = IssuerAuth::decode(&buf)?;

    ia.verify_signature()?;

    let m = ia.mobile_security_object();

    println!("docType: {}", m.doc_type);
    println!("digest algorithm: {}", m.digest_algorithm.name());
    println!(
        "valid from {} until {}",
        m.valid_from.to_rfc3339(),
        m.valid_until.to_rfc3339()
    );

    for (ns, ids) in m.value_digests.iter() {
        let ids: Vec<String> = ids.keys().map(u64::to_string).collect();
        println!("{ns}: [{}]", ids.join(", "));
    }

    if let Some(tm) = tm {
        println!("document signer chain:");
        report_trust(&tm.verify(ia.certificate_chain(), &[]))?;
    }

    Ok(())
}

fn time(args: &TimeArgs) -> Result<(), Box<dyn Error>> {
    if let Some(s) = &args.decode {
        let format = if s.len() == 13 {
            TimeFormat::UtcTime
        } else {
            TimeFormat::GeneralizedTime
        };

        println!("{}", asn1::decode(s, format)?.to_rfc3339());
        return Ok(());
    }

    if args.encode_now {
        let now = Utc::now();
        let format = if args.utc {
            TimeFormat::UtcTime
        } else {
            TimeFormat::GeneralizedTime
        };
        let s = asn1::encode(&now, format)?;

        println!("{s}");
        return Ok(());
    }

    Err("one of --decode or --encode-now is required".into())
}
