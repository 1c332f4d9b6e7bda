//! Templates command - list the error templates.

use colored::Colorize;
use chartguard::validation::registry;

pub fn run(json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json_output {
        let templates: Vec<serde_json::Value> = registry()
            .iter()
            .map(|(key, template)| {
                serde_json::json!({
                    "key": key.as_str(),
                    "message": template.message,
                    "details": template.details,
                    "suggestions": template.suggestions,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    for (key, template) in registry() {
        println!("{}", key.as_str().yellow().bold());
        println!("  message: {}", template.message);
        println!("  details: {}", template.details);
        for suggestion in template.suggestions {
            println!("  {} {}", "•".cyan(), suggestion);
        }
        println!();
    }
    Ok(())
}
