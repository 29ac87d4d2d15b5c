use colored::Colorize;
use userschema::SchemaProperty;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
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

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Render the managed fields of a property, one `key: value` per line
pub fn property_lines(property: &SchemaProperty) -> String {
    let pattern = match property.pattern.as_deref() {
        None => "(none)".to_string(),
        Some("") => "\"\" (cleared)".to_string(),
        Some(p) => p.to_string(),
    };
    format!(
        "title: {}\ntype: {}\nrequired: {}\npermissions: {}\npattern: {}\n",
        property.title, property.kind, property.required, property.permissions, pattern
    )
}

/// Print a property as a key-value block
pub fn property(property: &SchemaProperty) {
    for line in property_lines(property).lines() {
        if let Some((key, value)) = line.split_once(": ") {
            kv(key, value);
        }
    }
}
