use colored::Colorize;
use declarative::Phase;
use edgeconf::handler::PlannedStep;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print one planned step, removals in red and creations in green
pub fn step(step: &PlannedStep) {
    match step.phase {
        Phase::Remove => println!("  {} {}", "-".red(), step.key.red()),
        Phase::Create => println!("  {} {}", "+".green(), step.key.green()),
    }
}

/// Print a key that is both removed and created as a replacement
pub fn replacement(key: &str) {
    println!("  {} {}", "~".yellow(), key.yellow());
}
