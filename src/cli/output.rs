use crate::engine::{PipelineReport, ResultStatus};

/// Print the per-module outcome of a pipeline run
pub fn print_pipeline_report(report: &PipelineReport) {
    println!("Pipeline: {}", report.pipeline);
    println!("================================================");

    for module in &report.modules {
        let marker = match module.result.status() {
            ResultStatus::Success => "✅",
            ResultStatus::Skipped => "⏭️ ",
            ResultStatus::Failed => "❌",
            ResultStatus::Pending => "⏳",
        };

        let duration = module
            .result
            .end_time()
            .map(|end| end - module.result.start_time())
            .map(|d| format!(" ({}ms)", d.num_milliseconds()))
            .unwrap_or_default();

        println!(
            "  {} {} [{}] {}{}",
            marker,
            module.module,
            module.kind,
            module.result.message(),
            duration
        );

        for error in module.result.errors() {
            println!("      • {}", error);
        }
        if let Some(hook_error) = &module.hook_error {
            println!("      ⚠️  {}", hook_error);
        }
    }

    println!();
    let failed = report.failed_modules().count();
    if failed == 0 {
        println!("✅ {} modules completed", report.modules.len());
    } else {
        println!("❌ {} of {} modules failed", failed, report.modules.len());
    }
}

pub fn print_pipeline_list(names: &[&str]) {
    println!("Available pipelines:");
    for name in names {
        println!("  • {}", name);
    }
}
