use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::cli::{Cli, Commands, ProbeArgs};
use range_hunter::build_id::resolve_build_id;
use range_hunter::classify::PatternCountClassifier;
use range_hunter::config::ProbeConfig;
use range_hunter::http_client::create_probe_client;
use range_hunter::prober::Prober;
use range_hunter::transport::{HttpTransport, Transport};

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep external crates (reqwest/hyper) at INFO to avoid flooding the CLI.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "range_hunter={crate},reqwest=info,hyper=info,h2=info",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::BuildId { page, config } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(page) = page {
                cfg.build_id_page = page;
            }
            let transport = HttpTransport::new(create_probe_client(&cfg)?);
            let id = resolve_build_id(&transport, &cfg.build_id_page).await?;
            println!("{}", id);
        }
        Commands::Probe(args) => {
            let no_progress = args.no_progress;
            let mut cfg = load_config(args.config.as_deref())?;
            apply_overrides(&mut cfg, args)?;
            cfg.validate()?;
            run_probe(cfg, no_progress).await?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&str>) -> anyhow::Result<ProbeConfig> {
    match path {
        Some(p) => ProbeConfig::from_json_file(Path::new(p)),
        None => Ok(ProbeConfig::default()),
    }
}

/// Flags win over the config file, which wins over defaults.
fn apply_overrides(cfg: &mut ProbeConfig, args: ProbeArgs) -> anyhow::Result<()> {
    if let Some(v) = args.start {
        cfg.range_start = v;
    }
    if let Some(v) = args.end {
        cfg.range_end = v;
    }
    if let Some(v) = args.concurrency {
        cfg.concurrency_limit = v;
    }
    if let Some(v) = args.url_template {
        cfg.url_template = v;
    }
    if let Some(v) = args.pattern {
        cfg.match_pattern = v;
    }
    if let Some(v) = args.label_prefix {
        cfg.label_prefix = v;
    }
    if let Some(v) = args.label_suffix {
        cfg.label_suffix = v;
    }
    if let Some(v) = args.expected_status {
        cfg.expected_status = v;
    }
    if let Some(v) = args.expected_count {
        cfg.expected_count = v;
    }
    if let Some(v) = args.timeout {
        cfg.timeout_secs = v;
    }
    if let Some(v) = args.build_id {
        cfg.build_id = Some(v);
    }
    if let Some(v) = args.build_id_page {
        cfg.build_id_page = v;
    }
    if args.verify_tls {
        cfg.verify_tls = true;
    }
    for raw in &args.headers {
        cfg.set_header(raw)?;
    }
    Ok(())
}

async fn run_probe(mut cfg: ProbeConfig, no_progress: bool) -> anyhow::Result<()> {
    let client = create_probe_client(&cfg)?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client));

    if cfg.needs_build_id() && cfg.build_id.is_none() {
        let id = resolve_build_id(transport.as_ref(), &cfg.build_id_page)
            .await
            .context("url template needs {build_id}; pass --build-id or a reachable --build-id-page")?;
        tracing::info!(build_id = %id, "resolved build id");
        cfg.build_id = Some(id);
    }

    tracing::info!(
        start = cfg.range_start,
        end = cfg.range_end,
        concurrency = cfg.concurrency_limit,
        timeout = cfg.timeout_secs,
        "Starting probe"
    );

    let pb = progress_bar(cfg.target_count(), no_progress);
    let classifier = Arc::new(PatternCountClassifier::from_config(&cfg));
    let prober = Prober::new(cfg, transport, classifier);

    let report = prober
        .run_with(|event| {
            if let Some(line) = event.progress_line() {
                pb.suspend(|| println!("{}", line));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    println!();
    print!("{}", report);
    eprintln!("[*] {}", report.summary());
    Ok(())
}

fn progress_bar(len: u64, disabled: bool) -> ProgressBar {
    if disabled || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    if let Ok(style) = ProgressStyle::with_template(":: Probing [{pos}/{len}] :: {per_sec} :: [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut cfg = ProbeConfig { range_end: 50, concurrency_limit: 7, ..Default::default() };
        let args = ProbeArgs {
            start: Some(10),
            concurrency: Some(3),
            verify_tls: true,
            headers: vec!["X-Nextjs-Data:".to_string()],
            ..Default::default()
        };
        apply_overrides(&mut cfg, args).unwrap();
        assert_eq!(cfg.range_start, 10);
        assert_eq!(cfg.range_end, 50);
        assert_eq!(cfg.concurrency_limit, 3);
        assert!(cfg.verify_tls);
        assert!(!cfg.headers.contains_key("X-Nextjs-Data"));
    }
}
