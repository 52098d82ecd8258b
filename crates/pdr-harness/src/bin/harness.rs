use clap::{Parser, ValueEnum};
use pdr_harness::{run_all_scenarios, Report};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Run the PDR repository/codec/manager scenario suite.
#[derive(Debug, Parser)]
#[command(name = "harness", about = "PDR subsystem scenario runner")]
struct Args {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let report = Report::from_results(run_all_scenarios());

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).expect("report is always valid JSON");
            println!("{json}");
        }
        OutputFormat::Text => {
            for s in &report.scenarios {
                let mark = if s.passed { "PASS" } else { "FAIL" };
                println!("[{mark}] {}: {}", s.name, s.detail);
            }
            println!("{}/{} scenarios passed", report.passed, report.total);
        }
    }

    if report.all_passed() {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}
