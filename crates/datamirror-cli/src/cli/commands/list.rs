//! `datamirror list` – show registered datasets.

use datamirror_core::DatasetRegistry;

pub fn run_list(registry: &DatasetRegistry) {
    if registry.is_empty() {
        println!("No datasets registered.");
        return;
    }
    println!("{:<20} {:<8} {:<20} {}", "NAME", "FORMAT", "DIRECTORY", "URL");
    for spec in registry.iter() {
        println!(
            "{:<20} {:<8} {:<20} {}",
            spec.name,
            spec.archive_format.as_str(),
            spec.extracted_subdir_name,
            spec.source_url
        );
        if let Some(description) = &spec.description {
            println!("{:<20} {}", "", description);
        }
    }
}
