use anyhow::Result;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use veil_config::Config;
use veil_core::Violation;

use super::build_pipeline;
use crate::cli::IssuesCommands;

pub async fn handle(cmd: IssuesCommands, config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let issues = pipeline.issues();

    match cmd {
        IssuesCommands::List { all } => {
            if all {
                let state = issues.get_all_issues().await?;
                print_issues("History", &state.history)
            } else {
                print_issues("Active issues", &issues.get_active_issues().await?)
            }
        }
        IssuesCommands::Dismiss { id } => {
            issues.dismiss_issue(&id).await?;
            println!("✓ Dismissed issue {}", id);
            Ok(())
        }
    }
}

fn print_issues(title: &str, violations: &[Violation]) -> Result<()> {
    if violations.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    println!("{} ({}):", title, violations.len());
    for violation in violations {
        println!("  [{}] {} {}", violation.id, violation.kind, violation.payload);
        println!("    Detected: {}", format_time(violation.detected_at)?);
        if let Some(until) = violation.dismissed_until {
            println!("    Dismissed until: {}", format_time(until)?);
        }
        if let Some(context) = &violation.context {
            println!("    Context: {}", context);
        }
    }

    Ok(())
}

fn format_time(at: OffsetDateTime) -> Result<String> {
    Ok(at.format(&Rfc3339)?)
}
