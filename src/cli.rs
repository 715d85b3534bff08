use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP daemon
    Daemon {
        /// Bind address, overriding listen_addr from config.yaml
        #[clap(long)]
        listen: Option<String>,
    },

    /// Create (or replace) a text sensor
    Create {
        /// Sensor nameId (letters, numbers, hyphens, underscores)
        name_id: String,

        /// Sensor text, one paragraph per line. Read from stdin when omitted
        text: Option<String>,
    },

    /// Check how similar a text is to a sensor
    Check {
        /// Sensor nameId
        name_id: String,

        /// Input text to score against the sensor's paragraphs
        text: String,
    },

    /// List all sensors
    List,

    /// Delete a sensor
    Delete {
        /// Sensor nameId
        name_id: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },
}
