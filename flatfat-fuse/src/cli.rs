use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create (or overwrite) the image with an empty volume
    Format {
        /// Image size in MiB
        #[arg(long, short, default_value_t = 16)]
        size: u64,
    },
    /// Print volume geometry and free space
    Info,
    /// List files in the root directory
    Ls,
    /// Copy a host file into the volume
    Add {
        host_file: PathBuf,

        /// Name inside the volume, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// Print a file to stdout
    Cat { name: String },
    /// Delete a file
    Rm { name: String },
    /// Print the size of a file
    Stat { name: String },
}
