// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Mustekala CLI - automated web-application exerciser
//!
//! `run` drives a full crawl-and-test session, `routes` previews route-seed
//! expansion, `smoke` checks a single page for console errors.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use colored::Colorize;

use mustekala::{ExerciserConfig, RouteSet, VERSION};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mustekala=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "run" => run_session(args.get(2).map(String::as_str)).await,
        "routes" => {
            if args.len() < 4 {
                eprintln!("Usage: mustekala routes <routes-file> <origin>");
                return ExitCode::from(1);
            }
            preview_routes(&args[2], &args[3])
        }
        "smoke" => {
            if args.len() < 3 {
                eprintln!("Usage: mustekala smoke <url>");
                return ExitCode::from(1);
            }
            smoke_test(&args[2]).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("mustekala {}", VERSION);
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Mustekala - Automated Web-Application Exerciser

USAGE:
    mustekala <COMMAND> [OPTIONS]

COMMANDS:
    run [config.json]          Crawl and exercise the configured site
    routes <file> <origin>     Preview route-seed expansion from a route table
    smoke <url>                Load one page and report console errors
    help                       Show this help message
    version                    Show version information

EXAMPLES:
    mustekala run mustekala.json
    mustekala routes frontend/src/routes.tsx https://devapp.example.com
    mustekala smoke https://devapp.example.com

The run and smoke commands drive a real browser and require a build with
the `chrome` feature and a Chrome/Chromium binary on this machine.

For more information, see: https://github.com/bountyyfi/mustekala
"#
    );
}

fn print_banner(config: &ExerciserConfig) {
    println!("{}", "Mustekala - automated UI exerciser".magenta().bold());
    println!("{} {}", "Target:".white(), config.website_url.cyan());
    if let Some(ref module) = config.single_module {
        println!("{} {}", "Module:".white(), module.cyan());
    }
}

fn load_config(config_path: Option<&str>) -> anyhow::Result<ExerciserConfig> {
    use anyhow::Context;

    let config = match config_path {
        Some(path) => ExerciserConfig::from_file(path)
            .with_context(|| format!("failed to load config file {}", path))?,
        None => ExerciserConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn run_session(config_path: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(1);
        }
    };
    print_banner(&config);

    let output_dir = PathBuf::from(&config.output.dir)
        .join(format!("run_{}", Local::now().format("%Y%m%d_%H%M%S")));
    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        eprintln!("Cannot create output folder {}: {}", output_dir.display(), e);
        return ExitCode::from(1);
    }
    println!("{} {}", "Output:".white(), output_dir.display());

    run_with_chrome(config, output_dir).await
}

#[cfg(feature = "chrome")]
async fn run_with_chrome(config: ExerciserConfig, output_dir: PathBuf) -> ExitCode {
    use std::sync::Arc;

    use mustekala::driver::chrome::ChromeDriver;
    use mustekala::report::write_html_report;
    use mustekala::Exerciser;

    let driver = match ChromeDriver::launch(&config.browser).await {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            eprintln!("Failed to launch browser: {}", e);
            return ExitCode::from(1);
        }
    };

    let report_filename = config.output.report_filename.clone();
    let engine = match Exerciser::new(config, driver) {
        Ok(engine) => engine.with_output_dir(output_dir.clone()),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let session = match engine.run().await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            return ExitCode::from(1);
        }
    };

    match write_html_report(&session, &output_dir, &report_filename) {
        Ok(path) => println!("{} {}", "Report:".green(), path.display()),
        Err(e) => eprintln!("Report generation failed: {}", e),
    }
    match session.save_json(&output_dir) {
        Ok(path) => println!("{} {}", "Data:".green(), path.display()),
        Err(e) => eprintln!("Session dump failed: {}", e),
    }

    if session.pages_with_errors() > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(not(feature = "chrome"))]
async fn run_with_chrome(_config: ExerciserConfig, _output_dir: PathBuf) -> ExitCode {
    eprintln!(
        "This build has no browser backend. Rebuild with: cargo build --release --features chrome"
    );
    ExitCode::from(1)
}

fn preview_routes(file: &str, origin: &str) -> ExitCode {
    use mustekala::crawl::ParamValues;

    let origin = match url::Url::parse(origin) {
        Ok(origin) => origin,
        Err(e) => {
            eprintln!("Invalid origin {}: {}", origin, e);
            return ExitCode::from(1);
        }
    };
    let routes = match RouteSet::from_file(file) {
        Ok(routes) => routes,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    println!("Paths ({}):", routes.paths().len());
    for path in routes.paths() {
        println!("  {}", path);
    }

    let options = mustekala::config::RouteOptions::default();
    let (urls, stats) = routes.expand(&origin, &ParamValues::new(), &options);
    println!(
        "\nExpansion: {} static, {} dynamic ({} expanded without parameter values)",
        stats.static_paths, stats.dynamic_paths, stats.dynamic_expanded
    );
    println!("Seed URLs ({}):", urls.len());
    for url in urls {
        println!("  {}", url);
    }
    ExitCode::SUCCESS
}

#[cfg(feature = "chrome")]
async fn smoke_test(target: &str) -> ExitCode {
    use std::time::Duration;

    use mustekala::config::BrowserOptions;
    use mustekala::driver::chrome::ChromeDriver;
    use mustekala::driver::PageDriver;

    println!("Smoke testing: {}", target);
    let driver = match ChromeDriver::launch(&BrowserOptions::default()).await {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("Failed to launch browser: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = driver.navigate(target, Duration::from_secs(30)).await {
        eprintln!("Navigation failed: {}", e);
        return ExitCode::from(1);
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    let errors: Vec<_> = driver
        .drain_console_events()
        .await
        .into_iter()
        .filter(|event| event.kind == "error" || event.kind == "pageerror")
        .collect();

    if errors.is_empty() {
        println!("{}", "Smoke test passed. No console errors found.".green());
        ExitCode::SUCCESS
    } else {
        println!("{}", "Smoke test failed. Console errors found:".red());
        for error in errors {
            println!("- {}: {}", error.kind, error.text);
        }
        ExitCode::from(1)
    }
}

#[cfg(not(feature = "chrome"))]
async fn smoke_test(_target: &str) -> ExitCode {
    eprintln!(
        "This build has no browser backend. Rebuild with: cargo build --release --features chrome"
    );
    ExitCode::from(1)
}
