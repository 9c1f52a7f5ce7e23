use clap::{Parser, Subcommand};
use std::sync::Arc;
use submap_core::{
    config::data_dir_from_env_value, CoreConfig, FsSubjectMappingStore, MappingId,
    NewSubjectMapping, SubjectMapping, SubjectMappingService,
};

#[derive(Parser)]
#[command(name = "submap")]
#[command(about = "Subject mapping service CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all subject mappings
    List,
    /// Create a subject mapping
    Create {
        /// Internal subject identifier
        subject_id: String,
        /// Record identifier in the source system
        record_id: String,
        /// Source system identifier
        source: String,
    },
    /// Find the mapping for an internal subject ID
    FindSubject {
        /// Internal subject identifier
        subject_id: String,
    },
    /// Find the mapping for a record ID within a source system
    FindRecord {
        /// Record identifier in the source system
        record_id: String,
        /// Source system identifier
        source: String,
    },
    /// List all mappings from a source system
    FindSource {
        /// Source system identifier
        source: String,
    },
    /// Delete a mapping by its storage ID
    Delete {
        /// Mapping storage ID (32 lowercase hex characters)
        id: String,
    },
}

fn print_mapping(mapping: &SubjectMapping) {
    println!(
        "ID: {}, Subject: {}, Record: {} ({}), Updated: {}",
        mapping.id, mapping.subject_id, mapping.record_id, mapping.source, mapping.updated
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let data_dir = data_dir_from_env_value(std::env::var("SUBMAP_DATA_DIR").ok());
    let cfg = CoreConfig::new(data_dir)?;
    let store = FsSubjectMappingStore::new(&cfg)?;
    let service = SubjectMappingService::new(Arc::new(store));

    match cli.command {
        Some(Commands::List) | None => {
            let mappings = service.list()?;
            if mappings.is_empty() {
                println!("No mappings found.");
            } else {
                for mapping in mappings {
                    print_mapping(&mapping);
                }
            }
        }
        Some(Commands::Create {
            subject_id,
            record_id,
            source,
        }) => {
            match service.create(NewSubjectMapping {
                subject_id,
                record_id,
                source,
            }) {
                Ok(mapping) => println!("Created mapping with ID: {}", mapping.id),
                Err(e) => eprintln!("Error creating mapping: {}", e),
            }
        }
        Some(Commands::FindSubject { subject_id }) => {
            match service.find_by_subject_id(&subject_id)? {
                Some(mapping) => print_mapping(&mapping),
                None => println!("No mapping for subject {}.", subject_id),
            }
        }
        Some(Commands::FindRecord { record_id, source }) => {
            match service.find_by_record_id(&record_id, &source)? {
                Some(mapping) => print_mapping(&mapping),
                None => println!("No mapping for record {} in {}.", record_id, source),
            }
        }
        Some(Commands::FindSource { source }) => {
            let mappings = service.find_by_source(&source)?;
            if mappings.is_empty() {
                println!("No mappings from {}.", source);
            } else {
                for mapping in mappings {
                    print_mapping(&mapping);
                }
            }
        }
        Some(Commands::Delete { id }) => {
            let id = MappingId::parse(&id)?;
            match service.delete(&id) {
                Ok(()) => println!("Deleted mapping {}.", id),
                Err(e) => eprintln!("Error deleting mapping: {}", e),
            }
        }
    }

    Ok(())
}
