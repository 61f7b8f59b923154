/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Animate Configuration ===\n");

    println!("Animate Settings:");
    println!("  Enabled: {}", config.animate.enabled);
    println!("  Animate Class: {}", config.animate.animate_class);
    println!("  Prepare Suffix: {}", config.animate.prepare_suffix);
    println!("  Reserved Prefix: {}", config.animate.reserved_prefix);
    println!("  Anchor Attribute: {}", config.animate.anchor_attribute);
    println!();

    println!("Demo Settings:");
    println!("  Scenario: {:?}", config.demo.scenario);
    println!("  Pretty: {}", config.demo.pretty);
    println!();

    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
