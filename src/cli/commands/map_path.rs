//! Map-path command: show where a raw key lands in the processed zone

use crate::cli::error::CliError;
use crate::path::{PathMapper, partition_of};

/// Map-path command arguments
#[derive(Debug, Clone)]
pub struct MapPathArgs {
    pub keys: Vec<String>,
    pub input_suffix: String,
    pub output_suffix: String,
}

/// Handle the map-path command
pub fn handle_map_path(args: &MapPathArgs) -> Result<(), CliError> {
    let mapper = PathMapper::new(&args.input_suffix, &args.output_suffix);

    for key in &args.keys {
        let destination = mapper.map_path(key).ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "'{}' does not end in '{}'",
                key,
                mapper.input_suffix()
            ))
        })?;

        match partition_of(key) {
            Some(partition) => println!("{} -> {} (partition {})", key, destination, partition),
            None => println!("{} -> {}", key, destination),
        }
    }

    Ok(())
}
