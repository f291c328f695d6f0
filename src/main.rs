use colored::Colorize;

use plan_pipeline::{Orchestrator, PipelineConfig};

fn main() {
    env_logger::init();

    let config = PipelineConfig::from_env();
    println!(
        "{}",
        format!(
            "pipeline demo (ai: {}, fallback: {}, model: {})",
            config.ai_enabled, config.fallback_enabled, config.model
        )
        .dimmed()
    );

    let orchestrator = Orchestrator::new(config);

    let requests = [
        "I want to plan a birthday party for my 8-year-old daughter. We'll have about 12 kids.",
        "We need to fix the flaky deployment problem before the release.",
        "Organize a two-day workshop for the data team.",
    ];

    for request in requests {
        println!("\n{}", format!("--- REQUEST: {request} ---").bold());
        let report = orchestrator.run(request);
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("{}", format!("failed to render report: {err}").red()),
        }
    }
}
