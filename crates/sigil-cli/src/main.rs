use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sigil_contracts::{
    BINDINGS_REPORT_SCHEMA_VERSION, CAPABILITY_TABLE_SCHEMA_VERSION, OFFSET_AUDIT_SCHEMA_VERSION,
    SIGIL_REPORT_SCHEMA_VERSION,
};
use sigil_core::accumulator;
use sigil_core::bootstrap;
use sigil_core::diagnostics::{render_diagnostics_md, Diagnostic, DiagnosticCode, Report};
use sigil_core::error::RuntimeError;
use sigil_core::language::LANG_ID;
use sigil_core::library::Library;
use sigil_core::offsets::OffsetTable;
use sigil_core::runtime::{Runtime, RuntimeOptions};
use sigil_core::textops::TextOps;
use sigil_core::value::{TypeKind, Value};
use sigil_hosts::ProfileId;

#[derive(Parser, Debug)]
#[command(name = "sigil")]
#[command(about = "Capability-offset runtime: probe, decode and evaluate sigil payloads.", long_about = None)]
struct Cli {
    #[command(flatten)]
    host: HostArgs,
    /// On runtime failure, print a JSON diagnostics report to stdout.
    #[arg(long, global = true, default_value_t = false)]
    report_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct HostArgs {
    /// Host profile (defaults to the offsets file's profile, then v2).
    #[arg(long, global = true, value_enum)]
    profile: Option<ProfileId>,
    /// Offset table JSON overriding the profile defaults.
    #[arg(long, global = true)]
    offsets: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the runtime language id.
    LangId,
    /// Print the capability table of one type kind.
    Probe {
        #[arg(long)]
        kind: String,
    },
    /// Check every configured offset against the selected profile.
    Audit,
    /// Decode a hex payload to program text without evaluating it.
    Decode {
        #[arg(long)]
        payload: String,
    },
    /// Hex-encode program text as a payload.
    Encode {
        #[arg(long)]
        text: String,
    },
    /// Evaluate a payload or program text after loading the combinator library.
    Eval {
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        payload: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Build a string from code points through the accumulator.
    Assemble {
        #[arg(required = true, allow_negative_numbers = true)]
        code_points: Vec<i64>,
        /// Reverse the assembled string with the `Reverse` combinator.
        #[arg(long, default_value_t = false)]
        reverse: bool,
        /// Evaluate the assembled string as program text.
        #[arg(long, default_value_t = false)]
        eval: bool,
    },
    /// Load the combinator library and list the environment's bindings.
    Bindings,
    /// Print the diagnostics catalog as markdown.
    DiagCatalog,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let report_json = cli.report_json;
    match cli.command {
        Command::LangId => {
            println!("{LANG_ID}");
            Ok(())
        }
        Command::DiagCatalog => {
            print!("{}", render_diagnostics_md());
            Ok(())
        }
        Command::Encode { text } => {
            println!("{}", bootstrap::encode_program(&text));
            Ok(())
        }
        Command::Probe { kind } => {
            let (profile, _) = resolve_host(&cli.host)?;
            cmd_probe(profile, &kind)
        }
        Command::Audit => {
            let (profile, offsets) = resolve_host(&cli.host)?;
            cmd_audit(profile, offsets)
        }
        Command::Decode { payload } => {
            with_runtime(&cli.host, report_json, |rt| cmd_decode(rt, &payload))
        }
        Command::Eval { payload, text } => {
            with_runtime(&cli.host, report_json, |rt| cmd_eval(rt, payload, text))
        }
        Command::Assemble {
            code_points,
            reverse,
            eval,
        } => with_runtime(&cli.host, report_json, |rt| {
            cmd_assemble(rt, &code_points, reverse, eval)
        }),
        Command::Bindings => with_runtime(&cli.host, report_json, cmd_bindings),
    }
}

fn with_runtime(
    host: &HostArgs,
    report_json: bool,
    run: impl FnOnce(&Runtime) -> Result<()>,
) -> Result<()> {
    let (profile, offsets) = resolve_host(host)?;
    let rt = Runtime::new(RuntimeOptions {
        profile,
        offsets: Some(offsets),
    });
    run(&rt).or_else(|err| report_failure(err, report_json))
}

fn resolve_host(host: &HostArgs) -> Result<(ProfileId, OffsetTable)> {
    let Some(path) = host.offsets.as_deref() else {
        let profile = host.profile.unwrap_or_default();
        return Ok((profile, OffsetTable::for_profile(profile)));
    };
    let (file_profile, offsets) = OffsetTable::load(path)?;
    Ok((host.profile.or(file_profile).unwrap_or_default(), offsets))
}

fn print_json(v: &serde_json::Value) -> Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize JSON output")?;
    println!("{s}");
    Ok(())
}

fn report_failure(err: anyhow::Error, report_json: bool) -> Result<()> {
    if report_json {
        if let Some(rt_err) = err.downcast_ref::<RuntimeError>() {
            let report = Report::ok().with_diagnostics(vec![Diagnostic::from(rt_err)]);
            let v = serde_json::to_value(&report).context("serialize diagnostics report")?;
            print_json(&v)?;
        }
    }
    Err(err)
}

fn cmd_probe(profile: ProfileId, kind: &str) -> Result<()> {
    let Some(kind) = TypeKind::parse(kind) else {
        let known: Vec<&str> = TypeKind::all().iter().map(|k| k.as_str()).collect();
        anyhow::bail!("unknown type kind {kind:?} (expected one of: {})", known.join(", "));
    };
    let table = sigil_core::capability::probe(profile, kind);
    print_json(&json!({
        "schema_version": CAPABILITY_TABLE_SCHEMA_VERSION,
        "profile": profile.as_str(),
        "kind": kind.as_str(),
        "capabilities": table.entries(),
    }))
}

fn cmd_audit(profile: ProfileId, offsets: OffsetTable) -> Result<()> {
    let host = sigil_core::capability::HostProfile::new(profile);
    let mismatches = offsets.audit(&host);
    let diagnostics: Vec<Diagnostic> = mismatches
        .iter()
        .map(|m| {
            Diagnostic::warning(
                DiagnosticCode::SGL0102OffsetMismatch,
                format!(
                    "{} offset {} on {} resolves to {:?}, expected {:?}",
                    m.slot,
                    m.offset,
                    m.kind,
                    m.found.unwrap_or("<out of range>"),
                    m.expected
                ),
            )
            .with_data("slot", json!(m.slot))
        })
        .collect();
    print_json(&json!({
        "schema_version": OFFSET_AUDIT_SCHEMA_VERSION,
        "profile": profile.as_str(),
        "offsets": offsets,
        "ok": mismatches.is_empty(),
        "mismatches": mismatches,
        "diagnostics": diagnostics,
    }))?;
    if !mismatches.is_empty() {
        anyhow::bail!(
            "offset audit found {} mismatch(es) for profile {}",
            mismatches.len(),
            profile.as_str()
        );
    }
    Ok(())
}

fn cmd_decode(rt: &Runtime, payload: &str) -> Result<()> {
    let text = TextOps::new(rt)?
        .decode_hex(payload.trim())
        .context("decode payload")?;
    println!("{text}");
    Ok(())
}

fn value_report(rt: &Runtime, value: &Value, bound: Vec<String>) -> serde_json::Value {
    json!({
        "schema_version": SIGIL_REPORT_SCHEMA_VERSION,
        "profile": rt.host().id().as_str(),
        "ok": true,
        "kind": value.kind().as_str(),
        "value": value.to_string(),
        "bound": bound,
    })
}

fn cmd_eval(rt: &Runtime, payload: Option<String>, text: Option<String>) -> Result<()> {
    Library::load(rt).context("load combinator library")?;
    let before = rt.environment().names();
    let value = match (payload, text) {
        (Some(payload), _) => {
            let text = TextOps::new(rt)?
                .decode_hex(payload.trim())
                .context("decode payload")?;
            rt.eval_text(&text).context("evaluate payload")?
        }
        (None, Some(text)) => rt.eval_text(&text).context("evaluate text")?,
        (None, None) => anyhow::bail!("one of --payload or --text is required"),
    };
    let bound = rt
        .environment()
        .names()
        .into_iter()
        .filter(|n| !before.contains(n))
        .collect();
    print_json(&value_report(rt, &value, bound))
}

fn cmd_assemble(rt: &Runtime, code_points: &[i64], reverse: bool, eval: bool) -> Result<()> {
    let builder = accumulator::build_string(rt)?;
    let mut text = accumulator::feed(&builder, code_points.iter().map(|&c| Value::Int(c)))
        .context("assemble code points")?;
    if reverse || eval {
        let lib = Library::load(rt).context("load combinator library")?;
        if reverse {
            text = lib.reverse(text)?;
        }
    }
    if !eval {
        println!("{text}");
        return Ok(());
    }
    let program = text.as_str().context("assembled value is not a string")?;
    let value = rt.eval_text(program).context("evaluate assembled text")?;
    print_json(&value_report(rt, &value, Vec::new()))
}

fn cmd_bindings(rt: &Runtime) -> Result<()> {
    rt.seed_capability_bindings()?;
    Library::load(rt).context("load combinator library")?;
    let names = rt.environment().names();
    print_json(&json!({
        "schema_version": BINDINGS_REPORT_SCHEMA_VERSION,
        "profile": rt.host().id().as_str(),
        "payloads": rt.loaded_payloads(),
        "names": names,
    }))
}
